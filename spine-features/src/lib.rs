//! SPINE feature layer
//!
//! This crate provides the feature data contract, in-memory features and
//! the Device Diagnosis feature that owns a connection's heartbeat.

pub mod base;
pub mod device_diagnosis;
pub mod memory;

pub use base::{FeatureLocal, FeatureLocalPtr, FeatureRemote, FeatureRemotePtr};
pub use device_diagnosis::DeviceDiagnosis;
pub use memory::{LocalFeature, RemoteFeature};
