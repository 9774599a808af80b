use std::sync::atomic::{AtomicU64, Ordering};

/// Position of a state application in the process-wide order.
pub type Ticket = u64;

/// Monotonic ticket source. Every optimistic apply, settlement, rollback
/// and poll fetch draws one, so "newer" is well defined across all of them.
#[derive(Debug, Default)]
pub struct Sequencer {
    last: AtomicU64,
}

static GLOBAL: Sequencer = Sequencer::new();

impl Sequencer {
    pub const fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    /// The sequencer shared by every board in the process.
    pub fn global() -> &'static Sequencer {
        &GLOBAL
    }

    /// Next ticket; strictly greater than every ticket issued before it.
    pub fn issue(&self) -> Ticket {
        self.last.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Most recently issued ticket, 0 before the first.
    pub fn current(&self) -> Ticket {
        self.last.load(Ordering::SeqCst)
    }
}
