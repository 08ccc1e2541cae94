use std::sync::Arc;

use futures::StreamExt;
use lapin::{
    message::Delivery,
    options::{
        BasicAckOptions, BasicConsumeOptions, BasicNackOptions, ExchangeDeclareOptions,
        QueueBindOptions, QueueDeclareOptions,
    },
    types::FieldTable,
    Connection as RabbitMQConnection, ExchangeKind,
};
use tracing::{error, info, info_span, Instrument};

use crate::{
    domain::{
        entities::{entity_kind::EntityKind, search_hit::SearchHit},
        services::{
            collaborative::CollaborativeAggregator,
            retrieval::{RetrievalEngine, RetrievalError},
        },
    },
    dtos::{
        recommendation_request::RecommendationRequestDto,
        recommendation_response::{RecommendationResponseData, RecommendationResponseDto},
        templates::rpc_response::{RpcErrorStatus, RpcResponse},
    },
    helper::error_chain_fmt,
    repositories::rabbitmq_message_repository::{
        RabbitMQMessageRepository, RabbitMQMessageRepositoryError,
    },
};

pub const ROUTING_KEY: &str = "recommendation_request.v1";

/// Maximum `limit` accepted from a request before it is rejected as invalid.
pub const MAX_LIMIT: u64 = 100;

#[derive(thiserror::Error)]
pub enum RegisterHandlerRecommendationRequestError {
    #[error(transparent)]
    RabbitMQError(#[from] lapin::Error),
    #[error(transparent)]
    MessageRepositoryError(#[from] RabbitMQMessageRepositoryError),
}

impl std::fmt::Debug for RegisterHandlerRecommendationRequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[derive(thiserror::Error)]
pub enum ExecuteHandlerRecommendationRequestError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    RetrievalError(#[from] RetrievalError),
}

impl std::fmt::Debug for ExecuteHandlerRecommendationRequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ExecuteHandlerRecommendationRequestError {
    fn rpc_status(&self) -> RpcErrorStatus {
        match self {
            Self::InvalidRequest(_) => RpcErrorStatus::BadRequest,
            Self::RetrievalError(_) => RpcErrorStatus::InternalServerError,
        }
    }
}

/// Registers the RPC handler answering recommendation and semantic search requests.
///
/// It declares a queue and binds it to the given exchange.
/// The incoming messages are expected to carry a `reply_to` property
/// naming the queue on which the response should be published.
#[tracing::instrument(
    name = "Register recommendation request handler",
    skip(
        rabbitmq_consuming_connection,
        message_repository,
        retrieval_engine,
        collaborative_aggregator
    )
)]
pub async fn register_handler(
    rabbitmq_consuming_connection: Arc<RabbitMQConnection>,
    exchange_name: String,
    queue_name_prefix: String,
    // Not an `Arc` shared reference as we want to initialize a new repository for each thread (or at least for each handler)
    message_repository: RabbitMQMessageRepository,
    retrieval_engine: Arc<RetrievalEngine>,
    collaborative_aggregator: Arc<CollaborativeAggregator>,
) -> Result<(), RegisterHandlerRecommendationRequestError> {
    let channel = rabbitmq_consuming_connection.create_channel().await?;

    channel
        .exchange_declare(
            &exchange_name,
            ExchangeKind::Topic,
            ExchangeDeclareOptions {
                durable: true,
                ..ExchangeDeclareOptions::default()
            },
            FieldTable::default(),
        )
        .await?;

    let queue_name = queue_name(&queue_name_prefix);

    channel
        .queue_declare(
            &queue_name,
            QueueDeclareOptions::default(),
            FieldTable::default(),
        )
        .await?;

    channel
        .queue_bind(
            &queue_name,
            &exchange_name,
            ROUTING_KEY,
            QueueBindOptions::default(),
            FieldTable::default(),
        )
        .await?;

    info!(
        "Declared queue {} on exchange {}, binding on {}",
        queue_name, exchange_name, ROUTING_KEY
    );

    // Inits for this specific handler
    let message_repository = message_repository.try_init().await?;

    let consumer_options = BasicConsumeOptions {
        no_ack: false,
        ..BasicConsumeOptions::default()
    };

    let mut consumer = channel
        .basic_consume(&queue_name, "", consumer_options, FieldTable::default())
        .await?;

    info!(
        "📡 Handler consuming from queue {}, bound to {} with {}, waiting for messages ...",
        queue_name, exchange_name, ROUTING_KEY,
    );

    while let Some(delivery) = consumer.next().await {
        async {
            let delivery = match delivery {
                Ok(delivery) => delivery,
                Err(error) => {
                    error!(
                        ?error,
                        "Failed to consume queue message on queue {}", queue_name
                    );
                    return;
                }
            };

            let reply_to = match delivery.properties.reply_to() {
                Some(reply_to) => reply_to.to_string(),
                None => {
                    error!("The message has no `reply_to` property, cannot respond");

                    if let Err(error) = delivery
                        .nack(BasicNackOptions {
                            requeue: false,
                            ..BasicNackOptions::default()
                        })
                        .await
                    {
                        error!(?error, "Failed to nack message");
                    }
                    return;
                }
            };

            let response = match execute_handler(
                &delivery,
                retrieval_engine.clone(),
                collaborative_aggregator.clone(),
            )
            .await
            {
                Ok(data) => RecommendationResponseDto::Ok { data },
                Err(error) => {
                    error!(?error, "Failed to handle recommendation request");
                    RpcResponse::Error {
                        status: error.rpc_status(),
                        message: error.to_string(),
                    }
                }
            };

            let response = match response.try_serializing() {
                Ok(response) => response,
                Err(error) => {
                    error!(?error, "Failed to serialize response");
                    if let Err(error) = delivery
                        .nack(BasicNackOptions {
                            requeue: false,
                            ..BasicNackOptions::default()
                        })
                        .await
                    {
                        error!(?error, "Failed to nack message");
                    }
                    return;
                }
            };

            if let Err(error) = message_repository
                .rpc_respond(&reply_to, response.as_bytes())
                .await
            {
                error!(?error, "Failed to respond to the queue {}", reply_to);
            }

            if let Err(error) = delivery.ack(BasicAckOptions::default()).await {
                error!(?error, "Failed to ack recommendation request message");
            }
        }
        .instrument(info_span!(
            "Handling consumed message",
            routing_key = ROUTING_KEY,
            exchange = exchange_name,
            queue = queue_name,
            message_id = %uuid::Uuid::new_v4(),
        ))
        .await
    }

    Ok(())
}

/// Parses the request, runs the matching retrieval operation,
/// and shapes the ranked results into a response payload.
#[tracing::instrument(
    name = "Executing recommendation request handler",
    skip(delivery, retrieval_engine, collaborative_aggregator)
)]
pub async fn execute_handler(
    delivery: &Delivery,
    retrieval_engine: Arc<RetrievalEngine>,
    collaborative_aggregator: Arc<CollaborativeAggregator>,
) -> Result<RecommendationResponseData, ExecuteHandlerRecommendationRequestError> {
    let request = RecommendationRequestDto::try_parsing(&delivery.data).map_err(|error| {
        ExecuteHandlerRecommendationRequestError::InvalidRequest(format!(
            "Failed to parse message data: {}",
            error
        ))
    })?;

    info!(?request, "Received recommendation request");

    let limit = request.limit();
    if limit == 0 || limit > MAX_LIMIT {
        return Err(ExecuteHandlerRecommendationRequestError::InvalidRequest(
            format!("limit must be between 1 and {}, got {}", MAX_LIMIT, limit),
        ));
    }

    let ranked = match request {
        RecommendationRequestDto::RecommendUsers {
            user_id,
            limit,
            exclude_following,
        } => ranked_from_hits(
            retrieval_engine
                .recommend_users(&user_id, limit, exclude_following)
                .await?,
        ),
        RecommendationRequestDto::RecommendPosts { user_id, limit } => {
            ranked_from_hits(retrieval_engine.recommend_posts(&user_id, limit).await?)
        }
        RecommendationRequestDto::RecommendPostsCollaborative { user_id, limit } => {
            let recommendation = collaborative_aggregator
                .recommend_posts_collaborative(&user_id, limit)
                .await?;

            let skipped = recommendation
                .neighbor_outcomes
                .iter()
                .filter(|outcome| outcome.is_skipped())
                .count();
            if skipped > 0 {
                info!(
                    skipped,
                    "Some neighbors could not contribute to the aggregation"
                );
            }

            recommendation.posts
        }
        RecommendationRequestDto::SearchUsers { query, limit } => {
            search(&retrieval_engine, EntityKind::User, &query, limit).await?
        }
        RecommendationRequestDto::SearchPosts { query, limit } => {
            search(&retrieval_engine, EntityKind::Post, &query, limit).await?
        }
    };

    Ok(RecommendationResponseData::from_ranked(ranked))
}

async fn search(
    retrieval_engine: &RetrievalEngine,
    kind: EntityKind,
    query: &str,
    limit: u64,
) -> Result<Vec<(String, f32)>, ExecuteHandlerRecommendationRequestError> {
    if query.trim().is_empty() {
        return Err(ExecuteHandlerRecommendationRequestError::InvalidRequest(
            "query must not be empty".into(),
        ));
    }

    Ok(ranked_from_hits(
        retrieval_engine.search(kind, query, limit).await?,
    ))
}

fn ranked_from_hits(hits: Vec<SearchHit>) -> Vec<(String, f32)> {
    hits.into_iter()
        .map(|hit| (hit.entity_id, hit.score))
        .collect()
}

pub fn queue_name(queue_name_prefix: &str) -> String {
    format!("{}_{}", queue_name_prefix, ROUTING_KEY)
}
