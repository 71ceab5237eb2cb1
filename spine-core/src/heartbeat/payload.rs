//! Heartbeat payload construction

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use super::counter::HeartbeatCounter;
use crate::model::{format_duration, format_timestamp, Cmd, HeartbeatData};

/// Builds heartbeat payloads from the shared counter and the declared timeout
#[derive(Debug, Clone)]
pub struct HeartbeatPayloadBuilder {
    counter: Arc<HeartbeatCounter>,
    timeout: Duration,
}

impl HeartbeatPayloadBuilder {
    pub fn new(counter: Arc<HeartbeatCounter>, timeout: Duration) -> Self {
        Self { counter, timeout }
    }

    /// Build a heartbeat stamped with `now`; consumes one counter value
    pub fn build(&self, now: DateTime<Utc>) -> HeartbeatData {
        HeartbeatData {
            timestamp: Some(format_timestamp(now)),
            heartbeat_counter: Some(self.counter.next()),
            heartbeat_timeout: Some(format_duration(self.timeout)),
        }
    }

    /// Build a heartbeat wrapped in its command
    pub fn build_cmd(&self, now: DateTime<Utc>) -> Cmd {
        Cmd::DeviceDiagnosisHeartbeatData(self.build(now))
    }

    pub fn counter(&self) -> &HeartbeatCounter {
        &self.counter
    }
}
