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
        entities::moderation_verdict::ModerationVerdict,
        services::moderation::{ContentModerator, ModerationError},
    },
    dtos::{
        moderate_text::{ModerateTextRequestDto, ModerateTextResponseDto},
        templates::rpc_response::{RpcErrorStatus, RpcResponse},
    },
    helper::error_chain_fmt,
    repositories::rabbitmq_message_repository::{
        RabbitMQMessageRepository, RabbitMQMessageRepositoryError,
    },
};

pub const ROUTING_KEY: &str = "moderate_text.v1";

#[derive(thiserror::Error)]
pub enum RegisterHandlerModerateTextError {
    #[error(transparent)]
    RabbitMQError(#[from] lapin::Error),
    #[error(transparent)]
    MessageRepositoryError(#[from] RabbitMQMessageRepositoryError),
}

impl std::fmt::Debug for RegisterHandlerModerateTextError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[derive(thiserror::Error)]
pub enum ExecuteHandlerModerateTextError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    ModerationError(#[from] ModerationError),
}

impl std::fmt::Debug for ExecuteHandlerModerateTextError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ExecuteHandlerModerateTextError {
    fn rpc_status(&self) -> RpcErrorStatus {
        match self {
            Self::InvalidRequest(_) => RpcErrorStatus::BadRequest,
            Self::ModerationError(_) => RpcErrorStatus::InternalServerError,
        }
    }
}

/// Registers the RPC handler answering text moderation requests.
#[tracing::instrument(
    name = "Register moderate text handler",
    skip(rabbitmq_consuming_connection, message_repository, content_moderator)
)]
pub async fn register_handler(
    rabbitmq_consuming_connection: Arc<RabbitMQConnection>,
    exchange_name: String,
    queue_name_prefix: String,
    message_repository: RabbitMQMessageRepository,
    content_moderator: Arc<ContentModerator>,
) -> Result<(), RegisterHandlerModerateTextError> {
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

            let response = match execute_handler(&delivery, content_moderator.clone()).await {
                Ok(verdict) => ModerateTextResponseDto::Ok { data: verdict },
                Err(error) => {
                    error!(?error, "Failed to handle moderate text request");
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
                error!(?error, "Failed to ack moderate text message");
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
    name = "Executing moderate text handler",
    skip(delivery, content_moderator)
)]
pub async fn execute_handler(
    delivery: &Delivery,
    content_moderator: Arc<ContentModerator>,
) -> Result<ModerationVerdict, ExecuteHandlerModerateTextError> {
    let request = ModerateTextRequestDto::try_parsing(&delivery.data).map_err(|error| {
        ExecuteHandlerModerateTextError::InvalidRequest(format!(
            "Failed to parse message data: {}",
            error
        ))
    })?;

    info!(
        check_toxicity = request.check_toxicity,
        check_spam = request.check_spam,
        "Received moderate text request"
    );

    let verdict = content_moderator
        .moderate(&request.text, request.check_toxicity, request.check_spam)
        .await?;

    Ok(verdict)
}

pub fn queue_name(queue_name_prefix: &str) -> String {
    format!("{}_{}", queue_name_prefix, ROUTING_KEY)
}
