// src/core/status_server.rs

//! A small `axum` router exposing coordinator status and Prometheus metrics,
//! spawned alongside the coordinator actor and the watcher.

use crate::core::coordinator::command::CoordinatorCommand;
use crate::core::metrics;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};

#[derive(Clone)]
struct ServerState {
    coordinator_tx: mpsc::Sender<CoordinatorCommand>,
}

async fn status_handler(State(state): State<ServerState>) -> impl IntoResponse {
    let (tx, rx) = oneshot::channel();
    if state.coordinator_tx.send(CoordinatorCommand::GetStatus(tx)).await.is_err() {
        return (StatusCode::SERVICE_UNAVAILABLE, "coordinator actor is gone").into_response();
    }
    match rx.await {
        Ok(status) => Json(status).into_response(),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "status request dropped").into_response(),
    }
}

async fn metrics_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        metrics::gather_metrics(),
    )
}

/// Runs the status/metrics HTTP server until the process exits.
pub async fn run(addr: String, coordinator_tx: mpsc::Sender<CoordinatorCommand>) {
    let state = ServerState { coordinator_tx };
    let app = Router::new()
        .route("/status", get(status_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(addr, error = %e, "failed to bind status server");
            return;
        }
    };

    info!(addr, "status server listening");
    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "status server exited");
    }
}
