// src/core/errors.rs

//! Defines the primary error type for the coordinator.

use thiserror::Error;

/// The main error enum, representing all possible failures within the coordinator.
/// Using `thiserror` allows for clean error definitions and automatic `From` trait implementations.
#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("no redis master: master file is empty and auto-detection found {found} masters")]
    NoRedisMaster { found: usize },

    #[error("probe failure for {addr}: {reason}")]
    Probe { addr: String, reason: String },

    #[error("failed to publish '{routing_key}': {reason}")]
    BusPublish { routing_key: String, reason: String },

    #[error("failed to persist master file {path}: {reason}")]
    Persistence { path: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("redis protocol error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("AMQP error: {0}")]
    Amqp(#[from] lapin::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config loading error: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CoordinatorError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}
