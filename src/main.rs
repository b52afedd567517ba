// src/main.rs

//! The main entry point for the Beetle Redis master coordinator.

use anyhow::{Context, Result};
use beetle_coordinator::config::Config;
use beetle_coordinator::core::bus::dispatcher::RoutingKeyNames;
use beetle_coordinator::core::bus::{AmqpPublisher, Dispatcher, Publisher};
use beetle_coordinator::core::coordinator::{Coordinator, OutboundRoutingKeys};
use beetle_coordinator::core::redis_probe::{RedisPool, TcpRedisNode};
use beetle_coordinator::core::watcher::MasterWatcher;
use beetle_coordinator::core::{status_server, CoordinatorError};
use std::env;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info};
use tracing_subscriber::{filter::EnvFilter, prelude::*, reload};

#[tokio::main]
async fn main() -> Result<()> {
    run_app().await
}

async fn run_app() -> Result<()> {
    const VERSION: &str = env!("CARGO_PKG_VERSION");

    let args: Vec<String> = env::args().collect();

    if args.contains(&"--version".to_string()) {
        println!("beetle-coordinator version {VERSION}");
        return Ok(());
    }

    let config_path = args
        .iter()
        .position(|arg| arg == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
        .unwrap_or("config.toml");

    let config = match Config::from_file(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration from \"{config_path}\": {e}");
            std::process::exit(1);
        }
    };

    let initial_log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone());
    let (filter, reload_handle) = reload::Layer::new(EnvFilter::new(initial_log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().compact().with_ansi(true))
        .init();
    let _reload_handle = Arc::new(reload_handle);

    if let Err(e) = run_coordinator(config).await {
        error!("coordinator runtime error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

async fn run_coordinator(config: Config) -> Result<(), CoordinatorError> {
    info!(servers = ?config.redis_servers, "starting beetle-coordinator");

    let nodes = config
        .redis_servers
        .iter()
        .map(|addr| TcpRedisNode::connect(addr).map(|n| Box::new(n) as Box<dyn beetle_coordinator::core::redis_probe::RedisNode>))
        .collect::<Result<Vec<_>, _>>()?;
    let pool = RedisPool::new(nodes);

    let publisher: Arc<dyn Publisher> = Arc::new(AmqpPublisher::connect(&config.amqp_url).await?);

    let (coordinator_tx, coordinator_rx) = tokio::sync::mpsc::channel(256);
    let (watcher_tx, watcher_rx) = tokio::sync::mpsc::channel(16);

    let coordinator = Coordinator::startup(
        pool,
        config.redis_probe_timeout,
        config.master_file_path.clone(),
        config.redis_configuration_client_ids.clone(),
        config.unknown_client_capacity,
        config.redis_configuration_client_timeout,
        config.client_dead_threshold,
        publisher.clone(),
        OutboundRoutingKeys {
            invalidate: config.routing_keys.invalidate.clone(),
            reconfigure: config.routing_keys.reconfigure.clone(),
            system_notification: config.routing_keys.system_notification.clone(),
        },
        watcher_tx.clone(),
        coordinator_tx.clone(),
    )
    .await?;

    let initial_master = coordinator
        .current_master()
        .context("coordinator started without a determined master")
        .map_err(|e| CoordinatorError::Internal(e.to_string()))?;
    let watcher_node = TcpRedisNode::connect(&initial_master)?;

    let mut tasks = JoinSet::new();

    tasks.spawn(async move {
        coordinator.run(coordinator_rx).await;
        info!("coordinator actor exited");
    });

    let watcher = MasterWatcher::new(
        config.redis_configuration_master_retries,
        config.redis_watcher_interval,
        config.redis_probe_timeout,
    );
    let watcher_cmd_tx = coordinator_tx.clone();
    tasks.spawn(async move {
        watcher
            .run(
                Box::new(watcher_node),
                watcher_rx,
                watcher_cmd_tx,
                Arc::new(|addr: &str| {
                    TcpRedisNode::connect(addr)
                        .map(|n| Box::new(n) as Box<dyn beetle_coordinator::core::redis_probe::RedisNode>)
                }),
            )
            .await;
        info!("watcher exited");
    });

    let dispatcher = Dispatcher::new(
        config.amqp_url.clone(),
        RoutingKeyNames {
            pong: config.routing_keys.pong.clone(),
            client_invalidated: config.routing_keys.client_invalidated.clone(),
            client_started: config.routing_keys.client_started.clone(),
            heartbeat: config.routing_keys.heartbeat.clone(),
        },
    );
    let dispatcher_tx = coordinator_tx.clone();
    tasks.spawn(async move {
        if let Err(e) = dispatcher.run(dispatcher_tx).await {
            error!(error = %e, "dispatcher exited with error");
        }
    });

    let status_addr = config.status_addr.clone();
    tasks.spawn(async move {
        status_server::run(status_addr, coordinator_tx).await;
    });

    while let Some(res) = tasks.join_next().await {
        if let Err(join_err) = res {
            error!(error = %join_err, "a coordinator task panicked");
        }
    }

    Ok(())
}
