//! Event publisher
//!
//! Domain events go to a durable fan-out exchange on the AMQP broker. The
//! broker connection and channel are opened on first use and then shared by
//! every request for the lifetime of the process.

use async_trait::async_trait;
use lapin::{
    BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind,
    options::{BasicPublishOptions, ExchangeDeclareOptions},
    types::FieldTable,
};
use tokio::sync::OnceCell;
use tracing::info;

use crate::constants::CONTEST_EVENTS_EXCHANGE;

/// AMQP persistent delivery mode
const PERSISTENT: u8 = 2;

/// Publishing failures
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("AMQP error: {0}")]
    Amqp(#[from] lapin::Error),
}

/// Sink for serialized domain events
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Hand a payload to the broker without waiting for a confirm
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: &[u8],
    ) -> Result<(), PublishError>;
}

/// Connection and channel kept together; dropping the connection closes the channel
struct AmqpLink {
    _connection: Connection,
    channel: Channel,
}

/// Publisher backed by a lazily opened AMQP channel
pub struct AmqpPublisher {
    url: String,
    link: OnceCell<AmqpLink>,
}

impl AmqpPublisher {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            link: OnceCell::new(),
        }
    }

    /// Shared channel, connecting and declaring the exchange on first call.
    ///
    /// Concurrent first callers wait on a single initialization; a failed
    /// attempt leaves the cell empty so the next call retries.
    pub async fn channel(&self) -> Result<&Channel, PublishError> {
        let link = self
            .link
            .get_or_try_init(|| async {
                info!("Connecting to message broker...");
                let connection =
                    Connection::connect(&self.url, ConnectionProperties::default()).await?;
                let channel = connection.create_channel().await?;

                channel
                    .exchange_declare(
                        CONTEST_EVENTS_EXCHANGE,
                        ExchangeKind::Fanout,
                        ExchangeDeclareOptions {
                            durable: true,
                            ..ExchangeDeclareOptions::default()
                        },
                        FieldTable::default(),
                    )
                    .await?;

                info!(exchange = CONTEST_EVENTS_EXCHANGE, "Broker channel ready");
                Ok::<_, PublishError>(AmqpLink {
                    _connection: connection,
                    channel,
                })
            })
            .await?;

        Ok(&link.channel)
    }

    pub fn is_connected(&self) -> bool {
        self.link.initialized()
    }
}

#[async_trait]
impl EventPublisher for AmqpPublisher {
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: &[u8],
    ) -> Result<(), PublishError> {
        let channel = self.channel().await?;

        // The returned confirm is dropped: publishing is fire-and-forget
        let _confirm = channel
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default()
                    .with_content_type("application/json".into())
                    .with_delivery_mode(PERSISTENT),
            )
            .await?;

        Ok(())
    }
}
