// src/core/bus/dispatcher.rs

//! Consumes inbound bus deliveries and translates them into
//! `CoordinatorCommand`s. Owns the AMQP consumer; never touches coordinator
//! state directly.

use crate::core::bus::EXCHANGE_NAME;
use crate::core::coordinator::command::{CoordinatorCommand, InboundMessage};
use crate::core::token::Token;
use crate::core::CoordinatorError;
use futures::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{Connection, ConnectionProperties, ExchangeKind};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct PongPayload {
    id: String,
    token: Token,
}

#[derive(Debug, Deserialize)]
struct ClientInvalidatedPayload {
    id: String,
    token: Token,
}

#[derive(Debug, Deserialize)]
struct ClientStartedPayload {
    id: String,
}

#[derive(Debug, Deserialize)]
struct HeartbeatPayload {
    id: String,
}

/// Routing keys the dispatcher subscribes to.
pub struct RoutingKeyNames {
    pub pong: String,
    pub client_invalidated: String,
    pub client_started: String,
    pub heartbeat: String,
}

pub struct Dispatcher {
    amqp_url: String,
    routing_keys: RoutingKeyNames,
}

impl Dispatcher {
    pub fn new(amqp_url: String, routing_keys: RoutingKeyNames) -> Self {
        Self { amqp_url, routing_keys }
    }

    /// Connects, declares an exclusive queue bound to each control routing
    /// key, and forwards decoded commands to `tx` until the connection drops.
    pub async fn run(self, tx: mpsc::Sender<CoordinatorCommand>) -> Result<(), CoordinatorError> {
        let connection = Connection::connect(&self.amqp_url, ConnectionProperties::default()).await?;
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

        let queue = channel
            .queue_declare(
                "",
                QueueDeclareOptions {
                    exclusive: true,
                    auto_delete: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;
        let queue_name = queue.name().as_str().to_string();

        for routing_key in [
            &self.routing_keys.pong,
            &self.routing_keys.client_invalidated,
            &self.routing_keys.client_started,
            &self.routing_keys.heartbeat,
        ] {
            channel
                .queue_bind(
                    &queue_name,
                    EXCHANGE_NAME,
                    routing_key,
                    QueueBindOptions::default(),
                    FieldTable::default(),
                )
                .await?;
        }

        let mut consumer = channel
            .basic_consume(
                &queue_name,
                "beetle-coordinator-dispatcher",
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        while let Some(delivery) = consumer.next().await {
            let delivery = match delivery {
                Ok(d) => d,
                Err(err) => {
                    warn!(error = %err, "consumer stream error");
                    continue;
                }
            };

            let routing_key = delivery.routing_key.as_str();
            match self.decode(routing_key, &delivery.data) {
                Some(msg) => {
                    if tx.send(CoordinatorCommand::Inbound(msg)).await.is_err() {
                        break;
                    }
                }
                None => {
                    warn!(routing_key, "dropped malformed or unrecognized delivery");
                }
            }

            if let Err(err) = delivery.ack(BasicAckOptions::default()).await {
                warn!(error = %err, "failed to ack delivery");
            }
        }

        Ok(())
    }

    fn decode(&self, routing_key: &str, body: &[u8]) -> Option<InboundMessage> {
        let rk = &self.routing_keys;
        if routing_key == rk.pong {
            let payload: PongPayload = serde_json::from_slice(body).inspect_err(Self::log_decode_error).ok()?;
            Some(InboundMessage::Pong {
                id: payload.id,
                token: payload.token,
            })
        } else if routing_key == rk.client_invalidated {
            let payload: ClientInvalidatedPayload =
                serde_json::from_slice(body).inspect_err(Self::log_decode_error).ok()?;
            Some(InboundMessage::ClientInvalidated {
                id: payload.id,
                token: payload.token,
            })
        } else if routing_key == rk.client_started {
            let payload: ClientStartedPayload =
                serde_json::from_slice(body).inspect_err(Self::log_decode_error).ok()?;
            Some(InboundMessage::ClientStarted { id: payload.id })
        } else if routing_key == rk.heartbeat {
            let payload: HeartbeatPayload = serde_json::from_slice(body).inspect_err(Self::log_decode_error).ok()?;
            Some(InboundMessage::Heartbeat { id: payload.id })
        } else {
            debug!(routing_key, "unrecognized routing key");
            None
        }
    }

    fn log_decode_error(err: &serde_json::Error) {
        debug!(error = %err, "malformed payload");
    }
}
