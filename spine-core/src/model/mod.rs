//! SPINE protocol model
//!
//! Typed representation of the datagram pieces exchanged between two
//! SPINE devices: addressing, headers, commands and the Device Diagnosis
//! payloads. Field names serialize in camelCase as they appear on the wire.

pub mod address;
pub mod cmd;
pub mod diagnosis;
pub mod header;
pub mod time;

pub use address::FeatureAddress;
pub use cmd::{Cmd, FunctionType};
pub use diagnosis::{DeviceDiagnosisStateData, HeartbeatData, OperatingState, PowerSupplyCondition};
pub use header::{CmdClassifier, Header, MsgCounter, SPECIFICATION_VERSION};
pub use time::{format_duration, format_timestamp, parse_duration, parse_timestamp};
