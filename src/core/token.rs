// src/core/token.rs

//! The monotonic token source tagging every round of the invalidation protocol.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

pub type Token = u64;

/// Mints monotonically increasing round tokens.
///
/// Every protocol message carries the token of the round it belongs to; a
/// message whose token does not match `current()` belongs to a round that has
/// already closed and must be discarded by the caller.
#[derive(Debug)]
pub struct TokenMint {
    current: AtomicU64,
}

impl TokenMint {
    /// Seeds the counter from wall-clock microseconds since the epoch rather
    /// than starting every process back at zero: a client still holding a
    /// token from a previous process run must never see a later process's
    /// early tokens collide with it.
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0);
        Self {
            current: AtomicU64::new(seed),
        }
    }

    pub fn current(&self) -> Token {
        self.current.load(Ordering::SeqCst)
    }

    /// Advances to the next token and returns it.
    pub fn advance(&self) -> Token {
        self.current.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Returns true iff `t` is the token of the currently open round.
    pub fn redeem(&self, t: Token) -> bool {
        t == self.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_from_wall_clock_rather_than_zero() {
        let before = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_micros() as u64;
        let mint = TokenMint::new();
        assert!(mint.current() >= before);
    }

    #[test]
    fn advance_is_monotonic() {
        let mint = TokenMint::new();
        let seed = mint.current();
        assert_eq!(mint.advance(), seed + 1);
        assert_eq!(mint.advance(), seed + 2);
        assert_eq!(mint.current(), seed + 2);
    }

    #[test]
    fn redeem_rejects_stale_tokens() {
        let mint = TokenMint::new();
        let seed = mint.current();
        mint.advance();
        mint.advance();
        assert!(!mint.redeem(seed + 1));
        assert!(mint.redeem(seed + 2));
    }

    #[test]
    fn two_mints_created_in_sequence_never_produce_an_earlier_token() {
        let first = TokenMint::new();
        let second = TokenMint::new();
        assert!(second.current() >= first.current());
    }
}
