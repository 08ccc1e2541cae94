use crate::{
    configuration::{ClassifierBackend, QdrantSettings, RabbitMQSettings, Settings},
    domain::services::{
        collaborative::CollaborativeAggregator, huggingface_embedding::HuggingFaceEmbeddingsService,
        ingestion::IngestionPipeline, keyword_classifier::KeywordContentClassifier,
        moderation::ContentModerator, retrieval::RetrievalEngine,
        zero_shot_classifier::ZeroShotContentClassifier,
    },
    handlers::{
        handler_admin_request::{self, RegisterHandlerAdminRequestError},
        handler_entity_deleted::{self, RegisterHandlerEntityDeletedError},
        handler_entity_upserted::{self, RegisterHandlerEntityUpsertedError},
        handler_moderate_text::{self, RegisterHandlerModerateTextError},
        handler_recommendation_request::{self, RegisterHandlerRecommendationRequestError},
    },
    ports::{
        content_classifier::ContentClassifier, embedder::Embedder, record_store::RecordStore,
        vector_index::{VectorIndex, VectorIndexError},
    },
    repositories::{
        entity_point_qdrant_repository::EntityPointQdrantRepository,
        rabbitmq_message_repository::RabbitMQMessageRepository,
        record_postgres_repository::RecordPostgresRepository,
    },
};
use futures::{future::join_all, TryFutureExt};
use lapin::Connection as RabbitMQConnection;
use qdrant_client::prelude::{QdrantClient, QdrantClientConfig};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Composition root: builds every adapter and domain service from the settings,
/// wires them together, and spawns the message handlers.
pub struct Application {
    // RabbitMQ
    _rabbitmq_publishing_connection: Arc<RabbitMQConnection>,
    rabbitmq_exchange_name: String,
    rabbitmq_queue_name_prefix: String,

    handlers: Vec<JoinHandle<Result<(), ApplicationError>>>,
}

impl Application {
    #[tracing::instrument(name = "Building worker application")]
    pub async fn build(settings: Settings) -> Result<Self, ApplicationError> {
        // TODO: handle connections with a re-connection strategy
        // One connection for consuming messages, one for publishing messages
        let rabbitmq_consuming_connection =
            Arc::new(get_rabbitmq_connection(&settings.rabbitmq).await?);
        let rabbitmq_publishing_connection =
            Arc::new(get_rabbitmq_connection(&settings.rabbitmq).await?);

        let rabbitmq_exchange_name = format!(
            "{}_{}",
            settings.rabbitmq.exchange_name_prefix, settings.rabbitmq.exchange
        );

        let message_repository = RabbitMQMessageRepository::new(
            rabbitmq_publishing_connection.clone(),
            &rabbitmq_exchange_name,
        );

        let qdrant_client = get_qdrant_client(&settings.qdrant)?;
        let vector_index: Arc<dyn VectorIndex> = Arc::new(
            EntityPointQdrantRepository::try_new(
                qdrant_client,
                &settings.qdrant.collection_distance,
                settings.embeddings.dimension as u64,
            )
            .await?,
        );

        // Lazy pool: connections are only established on first use
        let pg_pool = PgPoolOptions::new()
            .acquire_timeout(std::time::Duration::from_secs(2))
            .connect_lazy_with(settings.database.with_db());
        let record_store: Arc<dyn RecordStore> = Arc::new(RecordPostgresRepository::new(pg_pool));

        let embedder: Arc<dyn Embedder> = Arc::new(HuggingFaceEmbeddingsService::new(
            settings.embeddings.dimension,
        ));

        let classifier: Arc<dyn ContentClassifier> =
            match settings.moderation.classifier_backend {
                ClassifierBackend::Keyword => Arc::new(KeywordContentClassifier::new()),
                ClassifierBackend::ZeroShot => Arc::new(ZeroShotContentClassifier::new()),
            };

        let retrieval_engine = Arc::new(RetrievalEngine::new(
            embedder.clone(),
            vector_index.clone(),
            record_store.clone(),
        ));
        let collaborative_aggregator = Arc::new(CollaborativeAggregator::new(
            retrieval_engine.clone(),
            record_store.clone(),
        ));
        let ingestion_pipeline = Arc::new(IngestionPipeline::new(
            record_store,
            embedder,
            vector_index,
        ));
        let content_moderator = Arc::new(ContentModerator::new(classifier));

        let mut app = Self {
            _rabbitmq_publishing_connection: rabbitmq_publishing_connection,
            rabbitmq_exchange_name,
            rabbitmq_queue_name_prefix: settings.rabbitmq.queue_name_prefix,
            handlers: vec![],
        };

        app.prepare_message_handlers(
            rabbitmq_consuming_connection,
            message_repository,
            ingestion_pipeline,
            retrieval_engine,
            collaborative_aggregator,
            content_moderator,
        )
        .await?;

        Ok(app)
    }

    /// Prepares the asynchronous tasks on which our message handlers will run.
    ///
    /// A "message handler" consumes messages from a (generated) queue bound to with a specific binding key to the given exchange
    #[tracing::instrument(
        name = "Preparing the messages handlers",
        skip(
            self,
            rabbitmq_consuming_connection,
            message_repository,
            ingestion_pipeline,
            retrieval_engine,
            collaborative_aggregator,
            content_moderator
        )
    )]
    pub async fn prepare_message_handlers(
        &mut self,
        rabbitmq_consuming_connection: Arc<RabbitMQConnection>,
        // Not an `Arc` shared reference as we want to initialize a new repository for each thread (or at least for each handler)
        message_repository: RabbitMQMessageRepository,
        ingestion_pipeline: Arc<IngestionPipeline>,
        retrieval_engine: Arc<RetrievalEngine>,
        collaborative_aggregator: Arc<CollaborativeAggregator>,
        content_moderator: Arc<ContentModerator>,
    ) -> Result<(), ApplicationError> {
        let exchange_name = self.rabbitmq_exchange_name.clone();
        let queue_name_prefix = self.rabbitmq_queue_name_prefix.clone();

        let handler = tokio::spawn(
            handler_entity_upserted::register_handler(
                rabbitmq_consuming_connection.clone(),
                exchange_name.clone(),
                queue_name_prefix.clone(),
                ingestion_pipeline.clone(),
            )
            .map_err(|e| e.into()),
        );
        self.handlers.push(handler);

        let handler = tokio::spawn(
            handler_entity_deleted::register_handler(
                rabbitmq_consuming_connection.clone(),
                exchange_name.clone(),
                queue_name_prefix.clone(),
                ingestion_pipeline.clone(),
            )
            .map_err(|e| e.into()),
        );
        self.handlers.push(handler);

        let handler = tokio::spawn(
            handler_admin_request::register_handler(
                rabbitmq_consuming_connection.clone(),
                exchange_name.clone(),
                queue_name_prefix.clone(),
                message_repository.clone(),
                ingestion_pipeline,
            )
            .map_err(|e| e.into()),
        );
        self.handlers.push(handler);

        let handler = tokio::spawn(
            handler_recommendation_request::register_handler(
                rabbitmq_consuming_connection.clone(),
                exchange_name.clone(),
                queue_name_prefix.clone(),
                message_repository.clone(),
                retrieval_engine,
                collaborative_aggregator,
            )
            .map_err(|e| e.into()),
        );
        self.handlers.push(handler);

        let handler = tokio::spawn(
            handler_moderate_text::register_handler(
                rabbitmq_consuming_connection,
                exchange_name,
                queue_name_prefix,
                message_repository,
                content_moderator,
            )
            .map_err(|e| e.into()),
        );
        self.handlers.push(handler);

        Ok(())
    }

    /// Runs the application until stopped
    ///
    /// self is moved in order for the application not to drop out of scope
    /// and move into a thread for ex
    pub async fn run_until_stopped(self) -> Result<(), ApplicationError> {
        let handler_results = join_all(self.handlers).await;

        info!(
            "Application stopped with the following results: {:?}",
            handler_results
        );

        info!("👋 Bye!");
        Ok(())
    }
}

/// Creates a connection to RabbitMQ
pub async fn get_rabbitmq_connection(
    config: &RabbitMQSettings,
) -> Result<RabbitMQConnection, lapin::Error> {
    RabbitMQConnection::connect(&config.get_uri(), config.get_connection_properties()).await
}

/// Set up a client to Qdrant
pub fn get_qdrant_client(config: &QdrantSettings) -> Result<QdrantClient, ApplicationError> {
    let qdrant_config = QdrantClientConfig::from_url(&config.get_grpc_base_url());
    QdrantClient::new(Some(qdrant_config)).map_err(|e| ApplicationError::QdrantError(e.to_string()))
}

#[derive(thiserror::Error, Debug)]
pub enum ApplicationError {
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    #[error(transparent)]
    RabbitMQError(#[from] lapin::Error),
    #[error(transparent)]
    RegisterHandlerEntityUpsertedError(#[from] RegisterHandlerEntityUpsertedError),
    #[error(transparent)]
    RegisterHandlerEntityDeletedError(#[from] RegisterHandlerEntityDeletedError),
    #[error(transparent)]
    RegisterHandlerAdminRequestError(#[from] RegisterHandlerAdminRequestError),
    #[error(transparent)]
    RegisterHandlerRecommendationRequestError(#[from] RegisterHandlerRecommendationRequestError),
    #[error(transparent)]
    RegisterHandlerModerateTextError(#[from] RegisterHandlerModerateTextError),
    #[error("Error from Qdrant: {0}")]
    QdrantError(String),
    #[error(transparent)]
    VectorIndexError(#[from] VectorIndexError),
}
