// src/core/testing.rs

//! Hand-written fakes shared by this crate's unit and integration tests, in
//! place of a mocking framework.

use crate::core::bus::Publisher;
use crate::core::redis_probe::{RedisNode, RedisRole};
use crate::core::CoordinatorError;
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// A `Publisher` that records every publish for assertions instead of
/// talking to a real broker.
#[derive(Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<(String, serde_json::Value)>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<(String, serde_json::Value)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, routing_key: &str, payload: serde_json::Value) -> Result<(), CoordinatorError> {
        self.published.lock().unwrap().push((routing_key.to_string(), payload));
        Ok(())
    }
}

/// A `RedisNode` driven by a fixed, scripted sequence of roles: each call to
/// `probe` consumes the next scripted role, holding on the last one once
/// exhausted.
pub struct FakeRedisNode {
    address: String,
    script: Vec<RedisRole>,
    cursor: usize,
    role: RedisRole,
    pub promotions: usize,
    pub followed: Vec<String>,
}

impl FakeRedisNode {
    pub fn new(address: impl Into<String>, script: Vec<RedisRole>) -> Self {
        Self {
            address: address.into(),
            script,
            cursor: 0,
            role: RedisRole::Unknown,
            promotions: 0,
            followed: Vec::new(),
        }
    }

    pub fn with_role(address: impl Into<String>, role: RedisRole) -> Self {
        Self::new(address, vec![role])
    }
}

#[async_trait]
impl RedisNode for FakeRedisNode {
    fn address(&self) -> &str {
        &self.address
    }

    fn role(&self) -> RedisRole {
        self.role
    }

    async fn probe(&mut self, _timeout: Duration) -> RedisRole {
        let role = self
            .script
            .get(self.cursor)
            .copied()
            .unwrap_or_else(|| *self.script.last().unwrap_or(&RedisRole::Unknown));
        self.cursor += 1;
        self.role = role;
        role
    }

    async fn promote_to_master(&mut self) -> Result<(), CoordinatorError> {
        self.promotions += 1;
        self.role = RedisRole::Master;
        Ok(())
    }

    async fn follow(&mut self, master_address: &str) -> Result<(), CoordinatorError> {
        self.followed.push(master_address.to_string());
        self.role = RedisRole::Slave;
        Ok(())
    }
}
