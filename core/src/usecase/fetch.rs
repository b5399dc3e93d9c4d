use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

/// Tag carried by one fetch. Only the most recently issued ticket of a
/// sequencer is current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

impl FetchTicket {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Per-view counter used to drop results of superseded fetches. Clones share
/// the same counter, so a spawned task can check its ticket.
#[derive(Debug, Clone, Default)]
pub struct FetchSequencer {
    latest: Arc<AtomicU64>,
}

impl FetchSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> FetchTicket {
        FetchTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    /// Passes `value` through when `ticket` is still current.
    pub fn accept<T>(&self, ticket: FetchTicket, value: T) -> Option<T> {
        if self.is_current(ticket) {
            Some(value)
        } else {
            debug!(
                "Discarding stale fetch result (ticket {}, latest {})",
                ticket.0,
                self.latest.load(Ordering::SeqCst)
            );
            None
        }
    }
}
