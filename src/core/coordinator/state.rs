// src/core/coordinator/state.rs

use crate::core::token::Token;
use serde::Serialize;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CoordinatorState {
    /// Process just started; no master has been selected yet. Only held
    /// transiently during `Coordinator::startup`, before `run` ever sees a
    /// command — never observable from outside the actor.
    Undecided,
    Running,
    Paused,
}

/// The read model exposed by the status endpoint. Derived on demand from the
/// actor's state via a request/response round-trip; never mutated directly.
#[derive(Debug, Clone, Serialize)]
pub struct CoordinatorStatus {
    pub configured_client_ids: Vec<String>,
    /// Configured clients that have never been heard from at all, distinct
    /// from `unresponsive_clients` (which tracks clients seen before but gone
    /// quiet).
    pub unseen_client_ids: Vec<String>,
    pub unknown_client_ids: Vec<String>,
    #[serde(serialize_with = "serialize_unresponsive")]
    pub unresponsive_clients: Vec<(String, Instant)>,
    pub current_master: Option<String>,
    pub current_token: Token,
    pub state: CoordinatorState,
}

/// `Instant` has no stable serialization; expose seconds-ago instead, which is
/// what a status consumer actually wants.
fn serialize_unresponsive<S>(clients: &[(String, Instant)], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use serde::ser::SerializeSeq;
    let now = Instant::now();
    let mut seq = serializer.serialize_seq(Some(clients.len()))?;
    for (id, last_seen) in clients {
        seq.serialize_element(&(id, now.saturating_duration_since(*last_seen).as_secs()))?;
    }
    seq.end()
}
