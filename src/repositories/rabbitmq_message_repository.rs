use std::sync::Arc;

use chrono::Utc;
use lapin::{
    options::{BasicPublishOptions, ExchangeDeclareOptions},
    types::FieldTable,
    BasicProperties, Channel, Connection, ExchangeKind,
};
use tracing::info;
use uuid::Uuid;

use crate::helper::error_chain_fmt;

/// Message repository implemented with RabbitMQ
///
/// To publish messages from the service to its exchange, and to respond
/// to RPC requests on their `reply-to` queue.
///
/// The enum definition gatekeeps functionalities if the repository is not ready (not initialized).
pub enum RabbitMQMessageRepository {
    Ready {
        /// RabbitMQ connection shared with other objects in different threads
        connection: Arc<Connection>,
        /// RabbitMQ channel should not be shared between threads, one is created for each handler
        channel: Channel,
        exchange_name: String,
    },
    Idle {
        connection: Arc<Connection>,
        exchange_name: String,
    },
}

/// Clones only the thread safe part of the repository
///
/// The channel is not cloned because it is not thread safe: the cloned
/// repository is idle, waiting for an initialization.
impl Clone for RabbitMQMessageRepository {
    fn clone(&self) -> Self {
        match self {
            Self::Idle {
                connection,
                exchange_name,
                ..
            }
            | Self::Ready {
                connection,
                exchange_name,
                ..
            } => Self::Idle {
                connection: connection.clone(),
                exchange_name: exchange_name.clone(),
            },
        }
    }
}

impl RabbitMQMessageRepository {
    /// Builds a RabbitMQ message repository from a RabbitMQ connection
    ///
    /// This constructor does not create a RabbitMQ channel or declare the
    /// associated exchange: `try_init` should be called after, inside each
    /// handler using this repository.
    pub fn new(connection: Arc<Connection>, exchange_name: &str) -> Self {
        Self::Idle {
            connection,
            exchange_name: exchange_name.to_string(),
        }
    }

    /// Initializes the repository: creates a RabbitMQ channel and declares
    /// the exchange this repository is associated to.
    ///
    /// Called inside each handler because a channel should not be shared
    /// between threads.
    #[tracing::instrument(name = "🏗️ Initializing RabbitMQMessageRepository", skip(self))]
    pub async fn try_init(self) -> Result<Self, RabbitMQMessageRepositoryError> {
        match self {
            Self::Ready { .. } => {
                info!("Already initialized");
                Ok(self)
            }

            Self::Idle {
                connection,
                exchange_name,
            } => {
                let channel = connection.create_channel().await?;

                let exchange_declare_options = ExchangeDeclareOptions {
                    durable: true,
                    ..ExchangeDeclareOptions::default()
                };

                // Idempotent
                channel
                    .exchange_declare(
                        exchange_name.as_str(),
                        ExchangeKind::Topic,
                        exchange_declare_options,
                        FieldTable::default(),
                    )
                    .await?;

                info!(
                    "Successfully declared exchange {} with properties: {:?}",
                    exchange_name, exchange_declare_options
                );

                Ok(Self::Ready {
                    connection,
                    channel,
                    exchange_name,
                })
            }
        }
    }

    /// Publishes a message to the repository exchange with a given routing key
    #[tracing::instrument(name = "Publishing message", skip(self, data))]
    pub async fn publish(
        &self,
        routing_key: &str,
        data: &[u8],
    ) -> Result<(), RabbitMQMessageRepositoryError> {
        match self {
            Self::Idle { .. } => Err(RabbitMQMessageRepositoryError::NotInitialized(
                "Cannot publish message, repository is not initialized".to_string(),
            )),

            Self::Ready { channel, exchange_name, .. } => {
                let current_time_ms = Utc::now().timestamp_millis() as u64;

                // Not using publisher confirmation
                channel
                    .basic_publish(
                        exchange_name,
                        routing_key,
                        BasicPublishOptions::default(),
                        data,
                        BasicProperties::default()
                            .with_timestamp(current_time_ms)
                            .with_message_id(Uuid::new_v4().to_string().into()),
                    )
                    .await?;

                Ok(())
            }
        }
    }

    /// Responds to an RPC request on its `reply-to` queue, going through
    /// the default exchange
    #[tracing::instrument(name = "Responding to RPC request", skip(self, data))]
    pub async fn rpc_respond(
        &self,
        reply_to: &str,
        data: &[u8],
    ) -> Result<(), RabbitMQMessageRepositoryError> {
        match self {
            Self::Idle { .. } => Err(RabbitMQMessageRepositoryError::NotInitialized(
                "Cannot respond to RPC request, repository is not initialized".to_string(),
            )),

            Self::Ready { channel, .. } => {
                let current_time_ms = Utc::now().timestamp_millis() as u64;

                channel
                    .basic_publish(
                        // Default exchange, routing directly to the reply-to queue
                        "",
                        reply_to,
                        BasicPublishOptions::default(),
                        data,
                        BasicProperties::default()
                            .with_timestamp(current_time_ms)
                            .with_message_id(Uuid::new_v4().to_string().into()),
                    )
                    .await?;

                Ok(())
            }
        }
    }
}

#[derive(thiserror::Error)]
pub enum RabbitMQMessageRepositoryError {
    #[error(transparent)]
    RabbitMQError(#[from] lapin::Error),
    #[error("{0}")]
    NotInitialized(String),
}

impl std::fmt::Debug for RabbitMQMessageRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
