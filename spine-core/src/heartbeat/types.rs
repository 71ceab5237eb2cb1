//! Heartbeat configuration types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default interval between periodic heartbeats: 800 ms
pub const DEFAULT_HEARTBEAT_PERIOD_MS: u64 = 800;

/// Default timeout announced to the peer: 4 s
pub const DEFAULT_HEARTBEAT_TIMEOUT_MS: u64 = 4_000;

/// Shortest period the heartbeat loop runs with
pub const MIN_HEARTBEAT_PERIOD_MS: u64 = 1;

/// Number of sent heartbeat message counters remembered for correlation
pub const HEARTBEAT_MSG_COUNTERS_SIZE: usize = 10;

/// Heartbeat configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    /// Interval in milliseconds between periodic heartbeats
    #[serde(default = "default_period")]
    pub period_ms: u64,
    /// Timeout in milliseconds announced to the peer
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

impl HeartbeatConfig {
    /// Interval between periodic heartbeats
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    /// Timeout announced to the peer
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            period_ms: DEFAULT_HEARTBEAT_PERIOD_MS,
            timeout_ms: DEFAULT_HEARTBEAT_TIMEOUT_MS,
        }
    }
}

fn default_period() -> u64 {
    DEFAULT_HEARTBEAT_PERIOD_MS
}

fn default_timeout() -> u64 {
    DEFAULT_HEARTBEAT_TIMEOUT_MS
}

/// Lifecycle of a heartbeat sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    /// Never started
    Idle,
    /// Background loop active
    Running,
    /// Loop ended, may be started again
    Stopped,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Running => "running",
            LifecycleState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}
