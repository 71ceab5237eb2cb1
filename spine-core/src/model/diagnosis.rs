//! Device Diagnosis payloads

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::time::parse_duration;
use crate::error::Result;

/// Liveness announcement
///
/// Built once per heartbeat and never modified afterwards. Fields are
/// optional because peers are free to omit them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatData {
    /// Build time, RFC 3339 UTC
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Sequence number of this heartbeat
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heartbeat_counter: Option<u64>,
    /// Time after which the peer may consider the sender dead
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heartbeat_timeout: Option<String>,
}

impl HeartbeatData {
    /// Declared timeout as a [`Duration`], if present
    pub fn timeout(&self) -> Result<Option<Duration>> {
        self.heartbeat_timeout.as_deref().map(parse_duration).transpose()
    }
}

/// Operating state of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperatingState {
    NormalOperation,
    Standby,
    Failure,
    ServiceNeeded,
    OverrideDetected,
    InAlarm,
    NotReachable,
    Finished,
    TemporarilyNotReady,
    Off,
}

/// Condition of the power supply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PowerSupplyCondition {
    Good,
    Low,
    Critical,
    Unknown,
    Error,
}

/// Diagnosis state published by a device
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDiagnosisStateData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_state: Option<OperatingState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_supply_condition: Option<PowerSupplyCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_state_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}
