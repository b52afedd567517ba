// src/config.rs

//! Manages coordinator configuration: loading, defaults, and validation.

use crate::core::CoordinatorError;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// The routing keys used on the bus, overridable for multi-tenant deployments
/// that namespace several coordinators onto one broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingKeys {
    #[serde(default = "default_rk_invalidate")]
    pub invalidate: String,
    #[serde(default = "default_rk_reconfigure")]
    pub reconfigure: String,
    #[serde(default = "default_rk_system_notification")]
    pub system_notification: String,
    #[serde(default = "default_rk_pong")]
    pub pong: String,
    #[serde(default = "default_rk_client_invalidated")]
    pub client_invalidated: String,
    #[serde(default = "default_rk_client_started")]
    pub client_started: String,
    #[serde(default = "default_rk_heartbeat")]
    pub heartbeat: String,
}

fn default_rk_invalidate() -> String {
    "invalidate".to_string()
}
fn default_rk_reconfigure() -> String {
    "reconfigure".to_string()
}
fn default_rk_system_notification() -> String {
    "system_notification".to_string()
}
fn default_rk_pong() -> String {
    "pong".to_string()
}
fn default_rk_client_invalidated() -> String {
    "client_invalidated".to_string()
}
fn default_rk_client_started() -> String {
    "client_started".to_string()
}
fn default_rk_heartbeat() -> String {
    "heartbeat".to_string()
}

impl Default for RoutingKeys {
    fn default() -> Self {
        Self {
            invalidate: default_rk_invalidate(),
            reconfigure: default_rk_reconfigure(),
            system_notification: default_rk_system_notification(),
            pong: default_rk_pong(),
            client_invalidated: default_rk_client_invalidated(),
            client_started: default_rk_client_started(),
            heartbeat: default_rk_heartbeat(),
        }
    }
}

/// Represents the final, validated coordinator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// `host:port` list of the Redis pool this coordinator arbitrates over.
    pub redis_servers: Vec<String>,

    /// Client IDs the coordinator expects to hear from. May be empty, in
    /// which case a switch never waits on client acknowledgements.
    #[serde(default)]
    pub redis_configuration_client_ids: Vec<String>,

    /// Consecutive master-probe failures tolerated before escalating to `master_unavailable!`.
    #[serde(default = "default_master_retries")]
    pub redis_configuration_master_retries: u32,

    /// Interval between master watcher ticks.
    #[serde(with = "humantime_serde", default = "default_watcher_interval")]
    pub redis_watcher_interval: std::time::Duration,

    /// How long an invalidation round is allowed to run before it is cancelled.
    #[serde(with = "humantime_serde", default = "default_client_timeout")]
    pub redis_configuration_client_timeout: std::time::Duration,

    /// Expected clients not seen within this window are reported as unresponsive.
    #[serde(with = "humantime_serde", default = "default_dead_threshold")]
    pub client_dead_threshold: std::time::Duration,

    /// Per-endpoint timeout for a single probe round.
    #[serde(with = "humantime_serde", default = "default_probe_timeout")]
    pub redis_probe_timeout: std::time::Duration,

    /// Bounded capacity `U` for the unknown-client set.
    #[serde(default = "default_unknown_client_capacity")]
    pub unknown_client_capacity: usize,

    /// AMQP broker URL used by the external publisher/dispatcher.
    #[serde(default = "default_amqp_url")]
    pub amqp_url: String,

    #[serde(default)]
    pub routing_keys: RoutingKeys,

    /// Path to the single-line master file (component G).
    #[serde(default = "default_master_file_path")]
    pub master_file_path: String,

    /// `host:port` the ambient status/metrics HTTP server binds to.
    #[serde(default = "default_status_addr")]
    pub status_addr: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_master_retries() -> u32 {
    3
}
fn default_watcher_interval() -> std::time::Duration {
    std::time::Duration::from_secs(5)
}
fn default_client_timeout() -> std::time::Duration {
    std::time::Duration::from_secs(10)
}
fn default_dead_threshold() -> std::time::Duration {
    std::time::Duration::from_secs(30)
}
fn default_probe_timeout() -> std::time::Duration {
    std::time::Duration::from_millis(500)
}
fn default_unknown_client_capacity() -> usize {
    100
}
fn default_amqp_url() -> String {
    "amqp://127.0.0.1:5672/%2f".to_string()
}
fn default_master_file_path() -> String {
    "./beetle-master".to_string()
}
fn default_status_addr() -> String {
    "0.0.0.0:7879".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Loads configuration from a TOML file, then layers environment overrides
    /// prefixed `BEETLE_COORDINATOR__` (double underscore as the path separator).
    pub fn from_file(path: &str) -> Result<Self, CoordinatorError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("BEETLE_COORDINATOR")
                    .separator("__")
                    .try_parsing(true),
            );
        let raw = builder.build()?;
        let cfg: Config = raw.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validates the loaded configuration.
    fn validate(&self) -> Result<(), CoordinatorError> {
        if self.redis_servers.len() < 2 {
            return Err(CoordinatorError::configuration(format!(
                "at least 2 redis_servers must be configured, found {}",
                self.redis_servers.len()
            )));
        }

        if self.unknown_client_capacity == 0 {
            warn!("unknown_client_capacity is 0; every unknown client report will evict itself");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Config {
        Config {
            redis_servers: vec!["a:1".into(), "b:1".into()],
            redis_configuration_client_ids: vec![],
            redis_configuration_master_retries: default_master_retries(),
            redis_watcher_interval: default_watcher_interval(),
            redis_configuration_client_timeout: default_client_timeout(),
            client_dead_threshold: default_dead_threshold(),
            redis_probe_timeout: default_probe_timeout(),
            unknown_client_capacity: default_unknown_client_capacity(),
            amqp_url: default_amqp_url(),
            routing_keys: RoutingKeys::default(),
            master_file_path: default_master_file_path(),
            status_addr: default_status_addr(),
            log_level: default_log_level(),
        }
    }

    #[test]
    fn rejects_fewer_than_two_redis_servers() {
        let mut cfg = base();
        cfg.redis_servers = vec!["a:1".into()];
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn accepts_two_redis_servers() {
        assert!(base().validate().is_ok());
    }
}
