// src/core/redis_probe.rs

//! The "duck-typed redis" collaborator: a small trait abstracting over a
//! single Redis endpoint, plus the pool snapshot built by probing all of them
//! in parallel.

use crate::core::CoordinatorError;
use async_trait::async_trait;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum RedisRole {
    Master,
    Slave,
    Unknown,
}

/// A single Redis endpoint, reachable and commandable.
///
/// Implementations answer `role`/`address`/`probe` the way a duck-typed
/// redis client answers `role`/`server`/`available?`. Production code talks
/// to a real server over the `redis` crate; tests substitute a scripted fake.
#[async_trait]
pub trait RedisNode: Send + Sync {
    fn address(&self) -> &str;

    /// Last role observed by `probe`. Does not perform I/O.
    fn role(&self) -> RedisRole;

    /// Issues `ROLE` (and `PING` as a liveness check) against the endpoint,
    /// updating and returning the observed role. Timeout or error classifies
    /// the endpoint as `Unknown` rather than failing the caller.
    async fn probe(&mut self, timeout: Duration) -> RedisRole;

    async fn promote_to_master(&mut self) -> Result<(), CoordinatorError>;

    async fn follow(&mut self, master_address: &str) -> Result<(), CoordinatorError>;
}

/// A snapshot of the configured Redis endpoints, classified by role.
pub struct RedisPool {
    pub nodes: Vec<Box<dyn RedisNode>>,
}

impl RedisPool {
    pub fn new(nodes: Vec<Box<dyn RedisNode>>) -> Self {
        Self { nodes }
    }

    /// Probes every node in parallel with the given per-node timeout.
    pub async fn refresh(&mut self, timeout: Duration) {
        let futures = self.nodes.iter_mut().map(|node| node.probe(timeout));
        futures::future::join_all(futures).await;
    }

    pub fn masters(&self) -> Vec<&dyn RedisNode> {
        self.nodes
            .iter()
            .filter(|n| n.role() == RedisRole::Master)
            .map(|n| n.as_ref())
            .collect()
    }

    pub fn by_address(&self, addr: &str) -> Option<&dyn RedisNode> {
        self.nodes.iter().find(|n| n.address() == addr).map(|n| n.as_ref())
    }

    pub fn by_address_mut(&mut self, addr: &str) -> Option<&mut Box<dyn RedisNode>> {
        self.nodes.iter_mut().find(|n| n.address() == addr)
    }

    /// Returns the single master in the pool, iff exactly one exists.
    pub fn auto_detect_master(&self) -> Option<&dyn RedisNode> {
        let masters = self.masters();
        if masters.len() == 1 {
            Some(masters[0])
        } else {
            None
        }
    }
}

/// Production `RedisNode` backed by a real connection via the `redis` crate.
pub struct TcpRedisNode {
    address: String,
    client: redis::Client,
    role: RedisRole,
}

impl TcpRedisNode {
    pub fn connect(address: &str) -> Result<Self, CoordinatorError> {
        let client = redis::Client::open(format!("redis://{address}")).map_err(|err| CoordinatorError::Probe {
            addr: address.to_string(),
            reason: err.to_string(),
        })?;
        Ok(Self {
            address: address.to_string(),
            client,
            role: RedisRole::Unknown,
        })
    }
}

#[async_trait]
impl RedisNode for TcpRedisNode {
    fn address(&self) -> &str {
        &self.address
    }

    fn role(&self) -> RedisRole {
        self.role
    }

    async fn probe(&mut self, timeout: Duration) -> RedisRole {
        let observed = tokio::time::timeout(timeout, self.fetch_role()).await;
        self.role = match observed {
            Ok(Ok(role)) => role,
            Ok(Err(err)) => {
                debug!(address = %self.address, error = %err, "probe failed");
                RedisRole::Unknown
            }
            Err(_) => {
                debug!(address = %self.address, "probe timed out");
                RedisRole::Unknown
            }
        };
        self.role
    }

    async fn promote_to_master(&mut self) -> Result<(), CoordinatorError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = redis::cmd("REPLICAOF")
            .arg("NO")
            .arg("ONE")
            .query_async(&mut conn)
            .await?;
        self.role = RedisRole::Master;
        Ok(())
    }

    async fn follow(&mut self, master_address: &str) -> Result<(), CoordinatorError> {
        let (host, port) = master_address
            .split_once(':')
            .ok_or_else(|| CoordinatorError::configuration(format!("malformed address {master_address}")))?;
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = redis::cmd("REPLICAOF")
            .arg(host)
            .arg(port)
            .query_async(&mut conn)
            .await?;
        self.role = RedisRole::Slave;
        Ok(())
    }
}

impl TcpRedisNode {
    async fn fetch_role(&self) -> Result<RedisRole, CoordinatorError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: String = conn.ping().await?;

        let reply: Vec<redis::Value> = redis::cmd("ROLE").query_async(&mut conn).await?;
        let role = match reply.first() {
            Some(redis::Value::BulkString(bytes)) if bytes == b"master" => RedisRole::Master,
            Some(redis::Value::BulkString(bytes)) if bytes == b"slave" => RedisRole::Slave,
            _ => RedisRole::Unknown,
        };
        Ok(role)
    }
}
