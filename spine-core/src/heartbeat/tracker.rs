//! Correlation of sent heartbeats

use parking_lot::Mutex;
use std::collections::VecDeque;

use super::types::HEARTBEAT_MSG_COUNTERS_SIZE;
use crate::model::MsgCounter;

/// Bounded FIFO of message counters of sent heartbeats
///
/// Used to recognize inbound datagrams (acknowledgements, results) that
/// refer to one of the last heartbeats. Every insertion goes through
/// [`record`](Self::record), which holds the size bound.
#[derive(Debug)]
pub struct MsgCounterTracker {
    counters: Mutex<VecDeque<MsgCounter>>,
}

impl MsgCounterTracker {
    pub fn new() -> Self {
        Self {
            counters: Mutex::new(VecDeque::with_capacity(HEARTBEAT_MSG_COUNTERS_SIZE + 1)),
        }
    }

    /// Remember a message counter, evicting the oldest beyond the bound
    pub fn record(&self, msg_counter: MsgCounter) {
        let mut counters = self.counters.lock();
        counters.push_back(msg_counter);
        while counters.len() > HEARTBEAT_MSG_COUNTERS_SIZE {
            counters.pop_front();
        }
    }

    /// Whether `msg_counter` is among the remembered ones
    pub fn contains(&self, msg_counter: MsgCounter) -> bool {
        self.counters.lock().contains(&msg_counter)
    }

    pub fn len(&self) -> usize {
        self.counters.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.lock().is_empty()
    }

    /// Remembered counters, oldest first
    pub fn snapshot(&self) -> Vec<MsgCounter> {
        self.counters.lock().iter().copied().collect()
    }
}

impl Default for MsgCounterTracker {
    fn default() -> Self {
        Self::new()
    }
}
