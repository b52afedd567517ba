// src/core/coordinator/mod.rs

//! The coordinator actor: the single task that owns all mutable failover
//! state. Every other task only ever holds a `Sender` into it.

pub mod command;
pub mod state;

use crate::core::bus::Publisher;
use crate::core::master_file;
use crate::core::metrics;
use crate::core::redis_probe::{RedisPool, RedisRole};
use crate::core::registry::ClientRegistry;
use crate::core::token::{Token, TokenMint};
use crate::core::watcher::WatcherControl;
use crate::core::CoordinatorError;
use command::{CoordinatorCommand, InboundMessage};
use state::{CoordinatorState, CoordinatorStatus};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// The outbound routing key names (overridable for multi-tenant deployments).
pub struct OutboundRoutingKeys {
    pub invalidate: String,
    pub reconfigure: String,
    pub system_notification: String,
}

pub struct Coordinator {
    pool: RedisPool,
    current_master: Option<String>,
    token: TokenMint,
    state: CoordinatorState,
    registry: ClientRegistry,
    pong_received: HashSet<String>,
    invalidated_received: HashSet<String>,
    publisher: Arc<dyn Publisher>,
    routing_keys: OutboundRoutingKeys,
    master_file_path: String,
    invalidation_timeout: Duration,
    probe_timeout: Duration,
    client_dead_threshold: Duration,
    watcher_tx: mpsc::Sender<WatcherControl>,
    self_tx: mpsc::Sender<CoordinatorCommand>,
}

#[allow(clippy::too_many_arguments)]
impl Coordinator {
    /// Performs startup determination of the initial master and returns a
    /// coordinator ready to be driven by `run`.
    pub async fn startup(
        mut pool: RedisPool,
        probe_timeout: Duration,
        master_file_path: String,
        expected_client_ids: Vec<String>,
        unknown_client_capacity: usize,
        invalidation_timeout: Duration,
        client_dead_threshold: Duration,
        publisher: Arc<dyn Publisher>,
        routing_keys: OutboundRoutingKeys,
        watcher_tx: mpsc::Sender<WatcherControl>,
        self_tx: mpsc::Sender<CoordinatorCommand>,
    ) -> Result<Self, CoordinatorError> {
        pool.refresh(probe_timeout).await;

        let mut coordinator = Self {
            pool,
            current_master: None,
            token: TokenMint::new(),
            state: CoordinatorState::Undecided,
            registry: ClientRegistry::new(expected_client_ids, unknown_client_capacity),
            pong_received: HashSet::new(),
            invalidated_received: HashSet::new(),
            publisher,
            routing_keys,
            master_file_path,
            invalidation_timeout,
            probe_timeout,
            client_dead_threshold,
            watcher_tx,
            self_tx,
        };

        coordinator.determine_initial_master().await?;
        Ok(coordinator)
    }

    async fn determine_initial_master(&mut self) -> Result<(), CoordinatorError> {
        match master_file::read(&self.master_file_path)? {
            Some(file_master) => match self.pool.by_address(&file_master).map(|n| n.role()) {
                Some(RedisRole::Master) => {
                    self.current_master = Some(file_master);
                    self.state = CoordinatorState::Running;
                    self.rearm_watcher().await;
                }
                Some(RedisRole::Slave) | None | Some(RedisRole::Unknown) => {
                    // The file names an endpoint that is demoted, unknown, or
                    // unreachable: enter PAUSED and switch away from it using
                    // the pool minus that endpoint as the candidate set. No
                    // clients are connected yet at process startup, so this
                    // bypasses the invalidate/ack round entirely rather than
                    // waiting on acks nobody can send.
                    self.state = CoordinatorState::Paused;
                    let token = self.token.advance();
                    self.startup_switch(&file_master, token).await?;
                }
            },
            None => match self.pool.auto_detect_master().map(|n| n.address().to_string()) {
                Some(addr) => {
                    self.current_master = Some(addr.clone());
                    self.state = CoordinatorState::Running;
                    master_file::write_best_effort(&self.master_file_path, &addr);
                    self.rearm_watcher().await;
                }
                None => {
                    return Err(CoordinatorError::NoRedisMaster {
                        found: self.pool.masters().len(),
                    });
                }
            },
        }
        Ok(())
    }

    /// Picks a replacement for `old_master_hint` from the rest of the pool:
    /// prefer a node already reporting as master, else promote the first
    /// reachable slave. Used only during startup, before any clients have
    /// connected.
    async fn startup_switch(&mut self, old_master_hint: &str, _token: Token) -> Result<(), CoordinatorError> {
        self.pool.refresh(self.probe_timeout).await;

        let already_master = self
            .pool
            .nodes
            .iter()
            .find(|n| n.address() != old_master_hint && n.role() == RedisRole::Master)
            .map(|n| n.address().to_string());
        let candidate_addr = match already_master {
            Some(addr) => Some(addr),
            None => self
                .pool
                .nodes
                .iter()
                .find(|n| n.address() != old_master_hint && n.role() == RedisRole::Slave)
                .map(|n| n.address().to_string()),
        };

        let Some(candidate_addr) = candidate_addr else {
            return Err(CoordinatorError::NoRedisMaster {
                found: self.pool.masters().len(),
            });
        };

        if self.pool.by_address(&candidate_addr).map(|n| n.role()) != Some(RedisRole::Master) {
            if let Some(node) = self.pool.by_address_mut(&candidate_addr) {
                if let Err(err) = node.promote_to_master().await {
                    warn!(address = %candidate_addr, error = %err, "promotion failed during startup switch");
                }
            }
        }

        self.current_master = Some(candidate_addr.clone());
        master_file::write_best_effort(&self.master_file_path, &candidate_addr);
        self.state = CoordinatorState::Running;
        self.rearm_watcher().await;
        Ok(())
    }

    /// The master address determined at startup, for wiring the watcher
    /// before handing the actor's ownership over to `run`.
    pub fn current_master(&self) -> Option<String> {
        self.current_master.clone()
    }

    /// Drives the actor loop until `rx` is closed (all senders dropped).
    pub async fn run(mut self, mut rx: mpsc::Receiver<CoordinatorCommand>) {
        while let Some(cmd) = rx.recv().await {
            self.handle_command(cmd).await;
        }
    }

    async fn handle_command(&mut self, cmd: CoordinatorCommand) {
        match cmd {
            CoordinatorCommand::Inbound(msg) => self.handle_inbound(msg).await,
            CoordinatorCommand::WatcherMasterAvailable => self.master_available().await,
            CoordinatorCommand::WatcherMasterUnavailable => self.initiate_master_switch().await,
            CoordinatorCommand::InvalidationTimeoutExpired { token } => self.handle_invalidation_timeout(token).await,
            CoordinatorCommand::GetStatus(reply) => {
                let _ = reply.send(self.status());
            }
        }
    }

    async fn handle_inbound(&mut self, msg: InboundMessage) {
        match msg {
            InboundMessage::Pong { id, token } => self.handle_pong(id, token).await,
            InboundMessage::ClientInvalidated { id, token } => self.handle_client_invalidated(id, token).await,
            InboundMessage::ClientStarted { id } => self.handle_client_started(id).await,
            InboundMessage::Heartbeat { id } => self.handle_heartbeat(id).await,
        }
    }

    async fn handle_client_started(&mut self, id: String) {
        self.track_liveness(id, "client_started").await;
    }

    async fn handle_heartbeat(&mut self, id: String) {
        self.track_liveness(id, "heartbeat").await;
    }

    async fn track_liveness(&mut self, id: String, kind: &str) {
        if self.registry.known(&id) {
            self.registry.seen(&id, Instant::now());
        } else if self.registry.note_unknown(&id, Instant::now()) {
            self.notify_unknown(&id, kind).await;
        }
    }

    async fn handle_pong(&mut self, id: String, token: Token) {
        if !self.token.redeem(token) {
            debug!(id, token, "dropping stale pong");
            return;
        }

        if self.registry.known(&id) {
            self.registry.seen(&id, Instant::now());
        } else if self.registry.note_unknown(&id, Instant::now()) {
            self.notify_unknown(&id, "pong").await;
        }

        if self.state == CoordinatorState::Paused {
            self.pong_received.insert(id);
            if self.is_expected_subset(&self.pong_received) {
                // Idempotent: the round is already open, so this is a no-op
                // re-entry.
                self.initiate_master_switch().await;
            }
        }
    }

    async fn handle_client_invalidated(&mut self, id: String, token: Token) {
        if !self.token.redeem(token) {
            debug!(id, token, "dropping stale client_invalidated");
            return;
        }

        self.invalidated_received.insert(id);
        if self.is_expected_subset(&self.invalidated_received) {
            self.perform_switch(token).await;
        }
    }

    fn is_expected_subset(&self, acks: &HashSet<String>) -> bool {
        self.registry.expected_clients().iter().all(|c| acks.contains(c))
    }

    /// Enters PAUSED and opens a new invalidation round. Idempotent: a
    /// second call while already PAUSED is a no-op.
    async fn initiate_master_switch(&mut self) {
        if self.state == CoordinatorState::Paused {
            return;
        }

        self.state = CoordinatorState::Paused;
        metrics::COORDINATOR_PAUSED.set(1.0);
        let token = self.token.advance();
        metrics::CURRENT_TOKEN.set(token as f64);
        self.pong_received.clear();
        self.invalidated_received.clear();

        if self.registry.expected_clients().is_empty() {
            self.perform_switch(token).await;
            return;
        }

        if let Err(err) = self
            .publisher
            .publish(&self.routing_keys.invalidate, serde_json::json!({ "token": token }))
            .await
        {
            warn!(error = %err, "failed to publish invalidate");
            metrics::PUBLISH_FAILURES_TOTAL.inc();
        }

        self.arm_invalidation_timeout(token);
    }

    fn arm_invalidation_timeout(&self, token: Token) {
        let tx = self.self_tx.clone();
        let timeout = self.invalidation_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let _ = tx.send(CoordinatorCommand::InvalidationTimeoutExpired { token }).await;
        });
    }

    async fn handle_invalidation_timeout(&mut self, token: Token) {
        if self.state != CoordinatorState::Paused || !self.token.redeem(token) {
            return; // stale generation or round already closed: no-op
        }

        warn!(token, "invalidation round timed out; reverting to RUNNING with existing master");
        metrics::INVALIDATION_TIMEOUTS_TOTAL.inc();
        self.pong_received.clear();
        self.invalidated_received.clear();
        self.state = CoordinatorState::Running;
        metrics::COORDINATOR_PAUSED.set(0.0);
        self.rearm_watcher().await;
    }

    /// Carries out a master switch. `token` is the round that authorized it.
    async fn perform_switch(&mut self, token: Token) {
        if self.state != CoordinatorState::Paused || !self.token.redeem(token) {
            return;
        }

        self.pool.refresh(self.probe_timeout).await;

        let old_master = self.current_master.clone();
        let candidate_addr = self
            .pool
            .nodes
            .iter()
            .find(|n| n.role() == RedisRole::Slave && Some(n.address().to_string()) != old_master)
            .map(|n| n.address().to_string());

        let Some(candidate_addr) = candidate_addr else {
            warn!("no promotion candidate found during master switch");
            let _ = self
                .publisher
                .publish(
                    &self.routing_keys.system_notification,
                    serde_json::json!({ "message": "failed to find a promotion candidate during master switch" }),
                )
                .await;
            self.state = CoordinatorState::Running;
            metrics::COORDINATOR_PAUSED.set(0.0);
            self.rearm_watcher().await;
            return;
        };

        if let Some(node) = self.pool.by_address_mut(&candidate_addr) {
            if let Err(err) = node.promote_to_master().await {
                warn!(address = %candidate_addr, error = %err, "promotion failed");
            }
        }

        self.current_master = Some(candidate_addr.clone());
        metrics::SWITCHES_TOTAL.inc();

        if let Some(err) = master_file::write_best_effort(&self.master_file_path, &candidate_addr) {
            let _ = self
                .publisher
                .publish(
                    &self.routing_keys.system_notification,
                    serde_json::json!({ "message": format!("failed to persist master file: {err}") }),
                )
                .await;
        }

        let other_masters: Vec<String> = self
            .pool
            .nodes
            .iter()
            .filter(|n| n.address() != candidate_addr && n.role() == RedisRole::Master)
            .map(|n| n.address().to_string())
            .collect();
        for addr in other_masters {
            if let Some(node) = self.pool.by_address_mut(&addr) {
                if let Err(err) = node.follow(&candidate_addr).await {
                    warn!(address = %addr, error = %err, "failed to demote former master");
                }
            }
        }

        if let Err(err) = self
            .publisher
            .publish(
                &self.routing_keys.reconfigure,
                serde_json::json!({ "server": candidate_addr, "token": token }),
            )
            .await
        {
            warn!(error = %err, "failed to publish reconfigure");
            metrics::PUBLISH_FAILURES_TOTAL.inc();
        }

        self.state = CoordinatorState::Running;
        metrics::COORDINATOR_PAUSED.set(0.0);
        self.rearm_watcher().await;
    }

    /// Called when the watcher reports the master reachable again.
    async fn master_available(&mut self) {
        match self.state {
            CoordinatorState::Running => {
                // Deliberately sources the server from the pool's current
                // master list rather than the authoritative `current_master`
                // (see DESIGN.md); if the pool briefly reports more than one
                // master this can name an unintended address.
                let server = self
                    .pool
                    .masters()
                    .first()
                    .map(|n| n.address().to_string())
                    .or_else(|| self.current_master.clone());

                if let Some(server) = server {
                    let token = self.token.current();
                    if let Err(err) = self
                        .publisher
                        .publish(&self.routing_keys.reconfigure, serde_json::json!({ "server": server, "token": token }))
                        .await
                    {
                        warn!(error = %err, "failed to publish reconfigure");
                        metrics::PUBLISH_FAILURES_TOTAL.inc();
                    }
                }
            }
            CoordinatorState::Paused => {
                self.pong_received.clear();
                self.invalidated_received.clear();
                self.state = CoordinatorState::Running;
                metrics::COORDINATOR_PAUSED.set(0.0);
                self.rearm_watcher().await;
            }
            CoordinatorState::Undecided => {
                // The watcher only starts after `startup` resolves this, so
                // this arm is unreachable in practice; handled for
                // exhaustiveness rather than a wildcard.
                debug!("watcher reported master available before startup resolved a master");
            }
        }
    }

    async fn notify_unknown(&self, id: &str, kind: &str) {
        metrics::UNKNOWN_CLIENTS.set(self.registry.unknown_count() as f64);
        let _ = self
            .publisher
            .publish(
                &self.routing_keys.system_notification,
                serde_json::json!({ "message": format!("unknown client '{id}' reported via {kind}") }),
            )
            .await;
    }

    async fn rearm_watcher(&self) {
        if let Some(addr) = &self.current_master {
            let _ = self
                .watcher_tx
                .send(WatcherControl::Rearm {
                    master_address: addr.clone(),
                })
                .await;
        }
    }

    fn status(&self) -> CoordinatorStatus {
        CoordinatorStatus {
            configured_client_ids: self.registry.expected_clients().iter().cloned().collect(),
            unseen_client_ids: self.registry.unseen_clients(),
            unknown_client_ids: self.registry.unknown_client_ids(),
            unresponsive_clients: self.registry.unresponsive(Instant::now(), self.client_dead_threshold),
            current_master: self.current_master.clone(),
            current_token: self.token.current(),
            state: self.state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::redis_probe::RedisRole;
    use crate::core::testing::{FakeRedisNode, RecordingPublisher};
    use tempfile::tempdir;

    fn routing_keys() -> OutboundRoutingKeys {
        OutboundRoutingKeys {
            invalidate: "invalidate".to_string(),
            reconfigure: "reconfigure".to_string(),
            system_notification: "system_notification".to_string(),
        }
    }

    fn build(
        nodes: Vec<Box<dyn crate::core::redis_probe::RedisNode>>,
        expected: &[&str],
        master_file_path: String,
    ) -> (Coordinator, Arc<RecordingPublisher>, mpsc::Receiver<WatcherControl>) {
        let publisher = Arc::new(RecordingPublisher::new());
        let (watcher_tx, watcher_rx) = mpsc::channel(8);
        let (self_tx, _self_rx) = mpsc::channel(8);
        let coordinator = Coordinator {
            pool: RedisPool::new(nodes),
            current_master: None,
            token: TokenMint::new(),
            state: CoordinatorState::Running,
            registry: ClientRegistry::new(expected.iter().map(|s| s.to_string()), 100),
            pong_received: HashSet::new(),
            invalidated_received: HashSet::new(),
            publisher: publisher.clone() as Arc<dyn Publisher>,
            routing_keys: routing_keys(),
            master_file_path,
            invalidation_timeout: Duration::from_millis(50),
            probe_timeout: Duration::from_millis(50),
            client_dead_threshold: Duration::from_secs(30),
            watcher_tx,
            self_tx,
        };
        (coordinator, publisher, watcher_rx)
    }

    fn published_keys(publisher: &RecordingPublisher) -> Vec<String> {
        publisher.published().into_iter().map(|(k, _)| k).collect()
    }

    /// A pong tagged with a stale token must not be recorded.
    #[tokio::test]
    async fn stale_pong_is_dropped() {
        let (mut coordinator, _pub, _wrx) = build(vec![], &["c1", "c2"], "/tmp/does-not-matter".to_string());
        let stale = coordinator.token.current();
        coordinator.token.advance();
        let current = coordinator.token.advance();
        coordinator.state = CoordinatorState::Paused;

        coordinator.handle_pong("c1".to_string(), current).await;
        coordinator.handle_pong("c2".to_string(), stale).await;

        assert_eq!(coordinator.pong_received, HashSet::from(["c1".to_string()]));
    }

    /// A full invalidation round completes with a switch.
    #[tokio::test]
    async fn full_invalidation_round_completes_switch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("master").to_str().unwrap().to_string();

        let nodes: Vec<Box<dyn crate::core::redis_probe::RedisNode>> = vec![
            Box::new(FakeRedisNode::with_role("A:1", RedisRole::Master)),
            Box::new(FakeRedisNode::with_role("B:1", RedisRole::Slave)),
        ];
        let (mut coordinator, publisher, mut watcher_rx) = build(nodes, &["c1", "c2"], path);
        coordinator.current_master = Some("A:1".to_string());
        let seed = coordinator.token.current();

        coordinator.initiate_master_switch().await;
        assert_eq!(coordinator.state, CoordinatorState::Paused);
        let token = coordinator.token.current();
        assert_eq!(token, seed + 1);

        coordinator.handle_pong("c1".to_string(), token).await;
        coordinator.handle_pong("c2".to_string(), token).await;
        assert_eq!(coordinator.state, CoordinatorState::Paused);

        coordinator.handle_client_invalidated("c1".to_string(), token).await;
        coordinator.handle_client_invalidated("c2".to_string(), token).await;

        assert_eq!(coordinator.state, CoordinatorState::Running);
        assert_eq!(coordinator.current_master, Some("B:1".to_string()));

        let keys = published_keys(&publisher);
        assert!(keys.contains(&"invalidate".to_string()));
        assert!(keys.contains(&"reconfigure".to_string()));

        assert!(matches!(
            watcher_rx.try_recv(),
            Ok(WatcherControl::Rearm { master_address }) if master_address == "B:1"
        ));
    }

    /// An invalidation round that never gathers all acks times out and
    /// reverts to RUNNING without switching; the token is not rolled back.
    #[tokio::test]
    async fn invalidation_timeout_reverts_without_switch() {
        let nodes: Vec<Box<dyn crate::core::redis_probe::RedisNode>> = vec![
            Box::new(FakeRedisNode::with_role("A:1", RedisRole::Master)),
            Box::new(FakeRedisNode::with_role("B:1", RedisRole::Slave)),
        ];
        let (mut coordinator, _pub, _wrx) = build(nodes, &["c1", "c2"], "/tmp/does-not-matter".to_string());
        coordinator.current_master = Some("A:1".to_string());

        coordinator.initiate_master_switch().await;
        let token = coordinator.token.current();
        coordinator.handle_pong("c1".to_string(), token).await;

        coordinator.handle_invalidation_timeout(token).await;

        assert_eq!(coordinator.state, CoordinatorState::Running);
        assert_eq!(coordinator.current_master, Some("A:1".to_string()));
        assert_eq!(coordinator.token.current(), token);
    }

    /// With no clients configured, a switch proceeds immediately, without
    /// publishing `invalidate` or waiting for acks.
    #[tokio::test]
    async fn no_clients_configured_switches_immediately() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("master").to_str().unwrap().to_string();
        let nodes: Vec<Box<dyn crate::core::redis_probe::RedisNode>> = vec![
            Box::new(FakeRedisNode::with_role("A:1", RedisRole::Master)),
            Box::new(FakeRedisNode::with_role("B:1", RedisRole::Slave)),
        ];
        let (mut coordinator, publisher, _wrx) = build(nodes, &[], path);
        coordinator.current_master = Some("A:1".to_string());

        coordinator.initiate_master_switch().await;

        assert_eq!(coordinator.state, CoordinatorState::Running);
        assert_eq!(coordinator.current_master, Some("B:1".to_string()));
        let keys = published_keys(&publisher);
        assert!(!keys.contains(&"invalidate".to_string()));
        assert!(keys.contains(&"reconfigure".to_string()));
    }

    /// At startup, a master file naming a now-demoted endpoint triggers an
    /// immediate switch to the pool's actual master.
    #[tokio::test]
    async fn startup_with_file_naming_demoted_master() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("master");
        std::fs::write(&path, "A:0").unwrap();

        let nodes: Vec<Box<dyn crate::core::redis_probe::RedisNode>> = vec![
            Box::new(FakeRedisNode::with_role("A:0", RedisRole::Slave)),
            Box::new(FakeRedisNode::with_role("B:0", RedisRole::Master)),
        ];
        let publisher = Arc::new(RecordingPublisher::new());
        let (watcher_tx, _watcher_rx) = mpsc::channel(8);
        let (self_tx, _self_rx) = mpsc::channel(8);

        let coordinator = Coordinator::startup(
            RedisPool::new(nodes),
            Duration::from_millis(50),
            path.to_str().unwrap().to_string(),
            vec![],
            100,
            Duration::from_millis(50),
            Duration::from_secs(30),
            publisher.clone() as Arc<dyn Publisher>,
            routing_keys(),
            watcher_tx,
            self_tx,
        )
        .await
        .unwrap();

        assert_eq!(coordinator.state, CoordinatorState::Running);
        assert_eq!(coordinator.current_master, Some("B:0".to_string()));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "B:0");
    }

    /// An unrecognized client id is tracked as unknown and reported.
    #[tokio::test]
    async fn unknown_client_is_tracked_and_reported() {
        let (mut coordinator, publisher, _wrx) = build(vec![], &["c1", "c2"], "/tmp/does-not-matter".to_string());

        coordinator.handle_heartbeat("x".to_string()).await;

        assert!(coordinator.registry.unknown_client_ids().contains(&"x".to_string()));
        let published = publisher.published();
        assert!(published.iter().any(|(key, payload)| key == "system_notification"
            && payload
                .get("message")
                .and_then(|m| m.as_str())
                .is_some_and(|m| m.contains('x'))));
    }

    /// Tokens are strictly monotonic and stale messages never mutate state.
    #[tokio::test]
    async fn stale_messages_never_mutate_state() {
        let (mut coordinator, _pub, _wrx) = build(vec![], &["c1"], "/tmp/does-not-matter".to_string());
        coordinator.token.advance();
        coordinator.state = CoordinatorState::Paused;
        let before = coordinator.pong_received.clone();

        coordinator.handle_pong("c1".to_string(), 0).await;

        assert_eq!(coordinator.pong_received, before);
    }

    /// Re-entering PAUSED while already PAUSED is a no-op.
    #[tokio::test]
    async fn double_pause_entry_is_noop() {
        let nodes: Vec<Box<dyn crate::core::redis_probe::RedisNode>> = vec![
            Box::new(FakeRedisNode::with_role("A:1", RedisRole::Master)),
            Box::new(FakeRedisNode::with_role("B:1", RedisRole::Slave)),
        ];
        let (mut coordinator, publisher, _wrx) = build(nodes, &["c1"], "/tmp/does-not-matter".to_string());
        coordinator.current_master = Some("A:1".to_string());

        coordinator.initiate_master_switch().await;
        let token_after_first = coordinator.token.current();
        coordinator.initiate_master_switch().await;

        assert_eq!(coordinator.token.current(), token_after_first);
        let invalidate_count = publisher.published().iter().filter(|(k, _)| k == "invalidate").count();
        assert_eq!(invalidate_count, 1);
    }
}
