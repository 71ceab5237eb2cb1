//! Heartbeat sequence numbers

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic sequence shared by periodic and on-demand heartbeats
#[derive(Debug, Default)]
pub struct HeartbeatCounter {
    value: AtomicU64,
}

impl HeartbeatCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume the next sequence number; the first call returns 1
    pub fn next(&self) -> u64 {
        self.value.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Last issued sequence number, 0 if none
    pub fn current(&self) -> u64 {
        self.value.load(Ordering::SeqCst)
    }
}
