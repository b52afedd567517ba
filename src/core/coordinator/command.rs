// src/core/coordinator/command.rs

//! The closed set of events the coordinator actor reacts to. Every other
//! task talks to the actor only through these, sent over an `mpsc` channel.

use crate::core::coordinator::state::CoordinatorStatus;
use crate::core::token::Token;
use tokio::sync::oneshot;

/// A parsed, validated bus delivery. Produced by the dispatcher, never
/// constructed by the actor itself.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    Pong { id: String, token: Token },
    ClientInvalidated { id: String, token: Token },
    ClientStarted { id: String },
    Heartbeat { id: String },
}

/// Everything that can mutate coordinator state, funneled through one channel
/// so the actor is the sole owner of its state.
pub enum CoordinatorCommand {
    Inbound(InboundMessage),
    WatcherMasterAvailable,
    WatcherMasterUnavailable,
    /// A generation-tagged invalidation timeout firing. Stale generations are
    /// no-ops once the round they belong to has already closed.
    InvalidationTimeoutExpired { token: Token },
    GetStatus(oneshot::Sender<CoordinatorStatus>),
}
