//! Heartbeat liveness sub-protocol
//!
//! Periodically tells the peer of a connection that this device is alive
//! and answers explicit requests for the current heartbeat.

pub mod counter;
pub mod payload;
pub mod service;
pub mod tracker;
pub mod types;

pub use counter::HeartbeatCounter;
pub use payload::HeartbeatPayloadBuilder;
pub use service::{Endpoints, HeartbeatSender};
pub use tracker::MsgCounterTracker;
pub use types::{
    HeartbeatConfig, LifecycleState, DEFAULT_HEARTBEAT_PERIOD_MS, DEFAULT_HEARTBEAT_TIMEOUT_MS,
    HEARTBEAT_MSG_COUNTERS_SIZE, MIN_HEARTBEAT_PERIOD_MS,
};
