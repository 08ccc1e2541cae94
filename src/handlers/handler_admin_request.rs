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
    domain::services::ingestion::{IngestionError, IngestionPipeline},
    dtos::{
        admin_request::AdminRequestDto,
        admin_response::{AdminResponseData, AdminResponseDto},
        templates::rpc_response::{RpcErrorStatus, RpcResponse},
    },
    helper::error_chain_fmt,
    repositories::rabbitmq_message_repository::{
        RabbitMQMessageRepository, RabbitMQMessageRepositoryError,
    },
};

pub const ROUTING_KEY: &str = "admin_request.v1";

#[derive(thiserror::Error)]
pub enum RegisterHandlerAdminRequestError {
    #[error(transparent)]
    RabbitMQError(#[from] lapin::Error),
    #[error(transparent)]
    MessageRepositoryError(#[from] RabbitMQMessageRepositoryError),
}

impl std::fmt::Debug for RegisterHandlerAdminRequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[derive(thiserror::Error)]
pub enum ExecuteHandlerAdminRequestError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    IngestionError(#[from] IngestionError),
}

impl std::fmt::Debug for ExecuteHandlerAdminRequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ExecuteHandlerAdminRequestError {
    fn rpc_status(&self) -> RpcErrorStatus {
        match self {
            Self::InvalidRequest(_) => RpcErrorStatus::BadRequest,
            Self::IngestionError(_) => RpcErrorStatus::InternalServerError,
        }
    }
}

/// Registers the RPC handler answering administrative requests: the bulk
/// embedding backfill and the index status report.
#[tracing::instrument(
    name = "Register admin request handler",
    skip(rabbitmq_consuming_connection, message_repository, ingestion_pipeline)
)]
pub async fn register_handler(
    rabbitmq_consuming_connection: Arc<RabbitMQConnection>,
    exchange_name: String,
    queue_name_prefix: String,
    message_repository: RabbitMQMessageRepository,
    ingestion_pipeline: Arc<IngestionPipeline>,
) -> Result<(), RegisterHandlerAdminRequestError> {
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

            let response = match execute_handler(&delivery, ingestion_pipeline.clone()).await {
                Ok(data) => AdminResponseDto::Ok { data },
                Err(error) => {
                    error!(?error, "Failed to handle admin request");
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
                error!(?error, "Failed to ack admin request message");
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

#[tracing::instrument(
    name = "Executing admin request handler",
    skip(delivery, ingestion_pipeline)
)]
pub async fn execute_handler(
    delivery: &Delivery,
    ingestion_pipeline: Arc<IngestionPipeline>,
) -> Result<AdminResponseData, ExecuteHandlerAdminRequestError> {
    let request = AdminRequestDto::try_parsing(&delivery.data).map_err(|error| {
        ExecuteHandlerAdminRequestError::InvalidRequest(format!(
            "Failed to parse message data: {}",
            error
        ))
    })?;

    info!(?request, "Received admin request");

    match request {
        AdminRequestDto::InitializeEmbeddings { user_ids, post_ids } => {
            let report = ingestion_pipeline
                .backfill(user_ids.as_deref(), post_ids.as_deref())
                .await?;

            Ok(AdminResponseData::Backfill(report))
        }
        AdminRequestDto::Status => {
            let status = ingestion_pipeline.index_status().await?;

            Ok(AdminResponseData::Status(status))
        }
    }
}

pub fn queue_name(queue_name_prefix: &str) -> String {
    format!("{}_{}", queue_name_prefix, ROUTING_KEY)
}
