//! Monotonic id sequences
//!
//! One sequence assigns group ids and another assigns proposal ids for the
//! whole ledger. Both are injected into the registry and the engine so
//! tests can seed them and snapshots can restore them.

use std::sync::atomic::{AtomicU64, Ordering};

/// An injective, monotonically increasing u64 generator
#[derive(Debug)]
pub struct IdSequence {
    next: AtomicU64,
}

impl IdSequence {
    /// A sequence whose first id is 1
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// A sequence whose first id is `first`
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Take the next id
    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    /// The id the next call to [`next_id`](Self::next_id) will return
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::new()
    }
}
