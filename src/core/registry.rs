// src/core/registry.rs

//! Tracks which configured clients have been heard from, and bounds the set
//! of unrecognized client ids reported by the bus.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

/// Coordinator-owned bookkeeping of expected vs. unknown client ids.
///
/// Lives entirely inside the coordinator actor; nothing outside the actor
/// ever touches this directly.
#[derive(Debug)]
pub struct ClientRegistry {
    expected: HashSet<String>,
    clients_last_seen: HashMap<String, Instant>,
    unknown_ids: HashSet<String>,
    unknown_last_seen: HashMap<String, Instant>,
    unknown_capacity: usize,
}

impl ClientRegistry {
    pub fn new(expected_client_ids: impl IntoIterator<Item = String>, unknown_capacity: usize) -> Self {
        Self {
            expected: expected_client_ids.into_iter().collect(),
            clients_last_seen: HashMap::new(),
            unknown_ids: HashSet::new(),
            unknown_last_seen: HashMap::new(),
            unknown_capacity,
        }
    }

    pub fn seen(&mut self, id: &str, now: Instant) {
        self.clients_last_seen.insert(id.to_string(), now);
    }

    pub fn known(&self, id: &str) -> bool {
        self.expected.contains(id)
    }

    /// Configured clients that have never sent a `pong`, `heartbeat`, or
    /// `client_started` — the complement of `clients_last_seen` within
    /// `expected`, reported to the status endpoint.
    pub fn unseen_clients(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .expected
            .iter()
            .filter(|id| !self.clients_last_seen.contains_key(*id))
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    pub fn expected_clients(&self) -> &HashSet<String> {
        &self.expected
    }

    /// Expected clients last seen `threshold` or more ago. Clients never seen
    /// at all are excluded — they are "unseen", not "unresponsive".
    pub fn unresponsive(&self, now: Instant, threshold: std::time::Duration) -> Vec<(String, Instant)> {
        self.expected
            .iter()
            .filter_map(|id| {
                let last_seen = self.clients_last_seen.get(id)?;
                if now.saturating_duration_since(*last_seen) >= threshold {
                    Some((id.clone(), *last_seen))
                } else {
                    None
                }
            })
            .collect()
    }

    /// Records `id` as unknown. Returns true iff this is its first occurrence
    /// (the caller uses this to decide whether to publish a system_notification).
    ///
    /// Enforces `unknown_capacity`: when full, the oldest unknown id by
    /// last-seen time is evicted along with its last-seen entry.
    pub fn note_unknown(&mut self, id: &str, now: Instant) -> bool {
        let first = !self.unknown_ids.contains(id);

        if self.unknown_capacity == 0 {
            return first;
        }

        if first && self.unknown_ids.len() >= self.unknown_capacity {
            if let Some(oldest) = self
                .unknown_last_seen
                .iter()
                .min_by_key(|(_, t)| **t)
                .map(|(k, _)| k.clone())
            {
                self.unknown_ids.remove(&oldest);
                self.unknown_last_seen.remove(&oldest);
            }
        }

        self.unknown_ids.insert(id.to_string());
        self.unknown_last_seen.insert(id.to_string(), now);
        first
    }

    pub fn unknown_client_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.unknown_ids.iter().cloned().collect();
        ids.sort();
        ids
    }

    pub fn unknown_count(&self) -> usize {
        self.unknown_ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn unresponsive_excludes_never_seen() {
        let registry = ClientRegistry::new(ids(&["c1", "c2"]), 100);
        let now = Instant::now();
        assert!(registry.unresponsive(now, Duration::from_secs(0)).is_empty());
    }

    #[test]
    fn unseen_clients_is_expected_minus_seen() {
        let mut registry = ClientRegistry::new(ids(&["c1", "c2", "c3"]), 100);
        registry.seen("c1", Instant::now());
        assert_eq!(registry.unseen_clients(), ids(&["c2", "c3"]));
    }

    #[test]
    fn unresponsive_with_zero_threshold_returns_every_seen_client() {
        let mut registry = ClientRegistry::new(ids(&["c1", "c2"]), 100);
        let t0 = Instant::now();
        registry.seen("c1", t0);
        let later = t0 + Duration::from_secs(1);
        let result = registry.unresponsive(later, Duration::from_secs(0));
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].0, "c1");
    }

    #[test]
    fn bounded_unknown_capacity_evicts_oldest() {
        let mut registry = ClientRegistry::new(ids(&[]), 2);
        let t0 = Instant::now();
        registry.note_unknown("a", t0);
        registry.note_unknown("b", t0 + Duration::from_secs(1));
        assert_eq!(registry.unknown_count(), 2);
        registry.note_unknown("c", t0 + Duration::from_secs(2));
        assert_eq!(registry.unknown_count(), 2);
        let remaining = registry.unknown_client_ids();
        assert!(!remaining.contains(&"a".to_string()));
        assert!(remaining.contains(&"b".to_string()));
        assert!(remaining.contains(&"c".to_string()));
    }

    #[test]
    fn note_unknown_reports_first_occurrence_only_once() {
        let mut registry = ClientRegistry::new(ids(&[]), 10);
        let now = Instant::now();
        assert!(registry.note_unknown("x", now));
        assert!(!registry.note_unknown("x", now));
    }

    #[test]
    fn zero_capacity_never_retains_unknown_ids() {
        let mut registry = ClientRegistry::new(ids(&[]), 0);
        let now = Instant::now();
        assert!(registry.note_unknown("x", now));
        assert!(registry.note_unknown("x", now));
        assert_eq!(registry.unknown_count(), 0);
    }
}
