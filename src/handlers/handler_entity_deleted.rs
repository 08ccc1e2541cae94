use std::sync::Arc;

use futures::StreamExt;
use lapin::{
    options::{
        BasicAckOptions, BasicConsumeOptions, BasicNackOptions, ExchangeDeclareOptions,
        QueueBindOptions, QueueDeclareOptions,
    },
    types::FieldTable,
    Connection as RabbitMQConnection, ExchangeKind,
};
use tracing::{error, info, info_span, Instrument};

use crate::{
    domain::services::ingestion::IngestionPipeline, dtos::entity_deleted::EntityDeletedDto,
    helper::error_chain_fmt,
};

pub const ROUTING_KEY: &str = "entity_deleted.v1";

#[derive(thiserror::Error)]
pub enum RegisterHandlerEntityDeletedError {
    #[error(transparent)]
    RabbitMQError(#[from] lapin::Error),
}

impl std::fmt::Debug for RegisterHandlerEntityDeletedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Registers the entity deletion event handler: the deleted entity's
/// point is removed from the vector index.
#[tracing::instrument(
    name = "Register entity deleted handler",
    skip(rabbitmq_consuming_connection, ingestion_pipeline)
)]
pub async fn register_handler(
    rabbitmq_consuming_connection: Arc<RabbitMQConnection>,
    exchange_name: String,
    queue_name_prefix: String,
    ingestion_pipeline: Arc<IngestionPipeline>,
) -> Result<(), RegisterHandlerEntityDeletedError> {
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

            let event = match EntityDeletedDto::try_parsing(&delivery.data) {
                Ok(event) => event,
                Err(error) => {
                    error!(?error, "Failed to parse entity deleted message data");

                    // A message that cannot be parsed will never succeed, do not requeue
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

            info!(?event, "Received entity deleted event");

            match ingestion_pipeline
                .remove(event.entity_kind, &event.entity_id)
                .await
            {
                Ok(()) => {
                    info!(
                        "Acknowledging message with delivery tag {}",
                        delivery.delivery_tag
                    );
                    if let Err(error) = delivery.ack(BasicAckOptions::default()).await {
                        error!(?error, ?event, "Failed to ack entity deleted message");
                    }
                }
                Err(error) => {
                    error!(?error, ?event, "Failed to handle entity deleted message");

                    // Index failures are transient, the deletion is worth a retry
                    if let Err(error) = delivery
                        .nack(BasicNackOptions {
                            requeue: true,
                            ..BasicNackOptions::default()
                        })
                        .await
                    {
                        error!(?error, ?event, "Failed to nack entity deleted message");
                    }
                }
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

pub fn queue_name(queue_name_prefix: &str) -> String {
    format!("{}_{}", queue_name_prefix, ROUTING_KEY)
}
