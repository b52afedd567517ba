// src/core/bus/mod.rs

//! The AMQP control plane: a `Publisher` collaborator the coordinator calls
//! out to, and a `Dispatcher` that turns inbound deliveries into commands.

pub mod dispatcher;
pub mod publisher;

pub use dispatcher::Dispatcher;
pub use publisher::{AmqpPublisher, Publisher};

/// Topic exchange every coordinator routing key is published and bound on.
pub const EXCHANGE_NAME: &str = "beetle.coordinator";
