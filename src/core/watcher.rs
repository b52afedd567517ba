// src/core/watcher.rs

//! Periodically probes the current master and tells the coordinator when it
//! goes away, or comes back, via a bounded retry budget.

use crate::core::coordinator::command::CoordinatorCommand;
use crate::core::redis_probe::{RedisNode, RedisRole};
use crate::core::CoordinatorError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Signals sent by the coordinator back to the watcher.
pub enum WatcherControl {
    /// A switch completed (or the watcher should resume after dormancy):
    /// reset the retry budget and start watching the named address.
    Rearm { master_address: String },
}

/// Connects (or reconnects) a live `RedisNode` handle for a given address.
pub type NodeConnector = Arc<dyn Fn(&str) -> Result<Box<dyn RedisNode>, CoordinatorError> + Send + Sync>;

pub struct MasterWatcher {
    retry_budget: u32,
    remaining: u32,
    check_interval: Duration,
    probe_timeout: Duration,
    dormant: bool,
}

impl MasterWatcher {
    pub fn new(retry_budget: u32, check_interval: Duration, probe_timeout: Duration) -> Self {
        Self {
            retry_budget,
            remaining: retry_budget,
            check_interval,
            probe_timeout,
            dormant: false,
        }
    }

    /// Runs until `command_tx` is closed. `node` is the live handle for the
    /// address currently believed to be master; it is replaced wholesale
    /// whenever the coordinator rearms the watcher after a switch.
    pub async fn run(
        mut self,
        mut node: Box<dyn RedisNode>,
        mut control_rx: mpsc::Receiver<WatcherControl>,
        command_tx: mpsc::Sender<CoordinatorCommand>,
        connect: NodeConnector,
    ) {
        let mut ticker = tokio::time::interval(self.check_interval);
        ticker.tick().await; // first tick fires immediately; skip it

        loop {
            tokio::select! {
                _ = ticker.tick(), if !self.dormant => {
                    let role = node.probe(self.probe_timeout).await;
                    if role == RedisRole::Master {
                        self.remaining = self.retry_budget;
                        if command_tx.send(CoordinatorCommand::WatcherMasterAvailable).await.is_err() {
                            break;
                        }
                    } else {
                        self.remaining = self.remaining.saturating_sub(1);
                        if self.remaining == 0 {
                            warn!(address = node.address(), "retry budget exhausted, declaring master unavailable");
                            self.dormant = true;
                            if command_tx.send(CoordinatorCommand::WatcherMasterUnavailable).await.is_err() {
                                break;
                            }
                        }
                    }
                }
                control = control_rx.recv() => {
                    match control {
                        Some(WatcherControl::Rearm { master_address }) => {
                            match connect(&master_address) {
                                Ok(n) => node = n,
                                Err(err) => warn!(error = %err, "watcher failed to reconnect to new master"),
                            }
                            info!(address = node.address(), "watcher rearmed");
                            self.remaining = self.retry_budget;
                            self.dormant = false;
                        }
                        None => break,
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::redis_probe::RedisRole;
    use async_trait::async_trait;

    struct ScriptedNode {
        address: String,
        script: Vec<RedisRole>,
        cursor: usize,
    }

    #[async_trait]
    impl RedisNode for ScriptedNode {
        fn address(&self) -> &str {
            &self.address
        }
        fn role(&self) -> RedisRole {
            *self.script.get(self.cursor.saturating_sub(1)).unwrap_or(&RedisRole::Unknown)
        }
        async fn probe(&mut self, _timeout: Duration) -> RedisRole {
            let role = *self.script.get(self.cursor).unwrap_or(&RedisRole::Unknown);
            self.cursor += 1;
            role
        }
        async fn promote_to_master(&mut self) -> Result<(), CoordinatorError> {
            Ok(())
        }
        async fn follow(&mut self, _master_address: &str) -> Result<(), CoordinatorError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn exhausting_retry_budget_reports_unavailable() {
        let node = Box::new(ScriptedNode {
            address: "a:1".into(),
            script: vec![RedisRole::Unknown; 5],
            cursor: 0,
        });
        let (_ctrl_tx, ctrl_rx) = mpsc::channel(1);
        let (cmd_tx, mut cmd_rx) = mpsc::channel(8);
        let watcher = MasterWatcher::new(2, Duration::from_millis(5), Duration::from_millis(5));

        tokio::spawn(watcher.run(
            node,
            ctrl_rx,
            cmd_tx,
            Arc::new(|addr: &str| {
                Ok(Box::new(ScriptedNode {
                    address: addr.to_string(),
                    script: vec![],
                    cursor: 0,
                }) as Box<dyn RedisNode>)
            }),
        ));

        let mut saw_unavailable = false;
        for _ in 0..4 {
            if let Some(CoordinatorCommand::WatcherMasterUnavailable) = cmd_rx.recv().await {
                saw_unavailable = true;
                break;
            }
        }
        assert!(saw_unavailable);
    }
}
