// src/core/bus/publisher.rs

//! The coordinator's outbound interface to the bus.

use crate::core::bus::EXCHANGE_NAME;
use crate::core::CoordinatorError;
use async_trait::async_trait;
use lapin::options::{BasicPublishOptions, ExchangeDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use tracing::{debug, warn};

/// Thread-safe publish interface, held by the coordinator as `Arc<dyn Publisher>`.
///
/// A publish failure is reported, never fatal: the coordinator logs and
/// continues, relying on the next round to retry implicitly.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, routing_key: &str, payload: serde_json::Value) -> Result<(), CoordinatorError>;
}

/// Production publisher backed by a real AMQP connection via `lapin`.
pub struct AmqpPublisher {
    channel: Channel,
}

impl AmqpPublisher {
    pub async fn connect(amqp_url: &str) -> Result<Self, CoordinatorError> {
        let connection = Connection::connect(amqp_url, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;
        channel
            .exchange_declare(
                EXCHANGE_NAME,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;
        Ok(Self { channel })
    }
}

#[async_trait]
impl Publisher for AmqpPublisher {
    async fn publish(&self, routing_key: &str, payload: serde_json::Value) -> Result<(), CoordinatorError> {
        let body = serde_json::to_vec(&payload)?;
        let confirm = self
            .channel
            .basic_publish(
                EXCHANGE_NAME,
                routing_key,
                BasicPublishOptions::default(),
                &body,
                BasicProperties::default().with_content_type("application/json".into()),
            )
            .await
            .map_err(|e| CoordinatorError::BusPublish {
                routing_key: routing_key.to_string(),
                reason: e.to_string(),
            })?;

        match confirm.await {
            Ok(_) => {
                debug!(routing_key, "published");
                Ok(())
            }
            Err(e) => {
                warn!(routing_key, error = %e, "publish confirmation failed");
                Err(CoordinatorError::BusPublish {
                    routing_key: routing_key.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}
