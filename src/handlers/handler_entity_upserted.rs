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
    domain::services::ingestion::{IngestionError, IngestionPipeline},
    dtos::entity_upserted::EntityUpsertedDto,
    helper::error_chain_fmt,
};

pub const ROUTING_KEY: &str = "entity_upserted.v1";

#[derive(thiserror::Error)]
pub enum RegisterHandlerEntityUpsertedError {
    #[error(transparent)]
    RabbitMQError(#[from] lapin::Error),
}

impl std::fmt::Debug for RegisterHandlerEntityUpsertedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Registers the entity lifecycle event handler: every upserted entity is
/// run through the ingestion pipeline.
///
/// It declares a queue and binds it to the given exchange.
/// It handles messages one by one, there is no handling messages in parallel.
#[tracing::instrument(
    name = "Register entity upserted handler",
    skip(rabbitmq_consuming_connection, ingestion_pipeline)
)]
pub async fn register_handler(
    rabbitmq_consuming_connection: Arc<RabbitMQConnection>,
    exchange_name: String,
    queue_name_prefix: String,
    ingestion_pipeline: Arc<IngestionPipeline>,
) -> Result<(), RegisterHandlerEntityUpsertedError> {
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

    // In order to have several nodes of this service as consumers of the same queue: use a specific queue name
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
                // Carries the delivery alongside its channel
                Ok(delivery) => delivery,
                // Carries the error and is always followed by Ok(None)
                Err(error) => {
                    error!(
                        ?error,
                        "Failed to consume queue message on queue {}", queue_name
                    );
                    return;
                }
            };

            let event = match EntityUpsertedDto::try_parsing(&delivery.data) {
                Ok(event) => event,
                Err(error) => {
                    error!(?error, "Failed to parse entity upserted message data");

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

            info!(?event, "Received entity upserted event");

            match ingestion_pipeline
                .ingest(event.entity_kind, &event.entity_id)
                .await
            {
                Ok(dimension) => {
                    info!(
                        dimension,
                        "Acknowledging message with delivery tag {}", delivery.delivery_tag
                    );
                    if let Err(error) = delivery.ack(BasicAckOptions::default()).await {
                        error!(?error, ?event, "Failed to ack entity upserted message");
                    }
                }
                Err(error) => {
                    error!(?error, ?event, "Failed to handle entity upserted message");

                    // An entity missing from the record store will still be missing
                    // on redelivery; transient upstream failures are worth a retry
                    let requeue = !matches!(error, IngestionError::EntityNotFound { .. });

                    if let Err(error) = delivery
                        .nack(BasicNackOptions {
                            requeue,
                            ..BasicNackOptions::default()
                        })
                        .await
                    {
                        error!(?error, ?event, "Failed to nack entity upserted message");
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
