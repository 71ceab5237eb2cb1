//! Feature data contract
//!
//! A feature is one function block of a SPINE device (for example Device
//! Diagnosis). The local side of a connection publishes its own data, the
//! remote side caches what the peer sent and can ask for fresh data.

use async_trait::async_trait;
use spine_core::model::{Cmd, FeatureAddress, FunctionType, MsgCounter};
use spine_core::Result;
use std::sync::Arc;

/// Feature hosted by this device
#[async_trait]
pub trait FeatureLocal: Send + Sync {
    /// Address of the feature
    fn address(&self) -> &FeatureAddress;

    /// Replace the stored data of the function carried by `data`
    fn set_data(&self, data: Cmd);

    /// Stored data of `function`
    fn data(&self, function: FunctionType) -> Option<Cmd>;

    /// Notify `destination` of the stored data of `function`
    async fn notify_data(
        &self,
        function: FunctionType,
        destination: &FeatureAddress,
    ) -> Result<MsgCounter>;
}

/// Feature of the peer device, as seen from this side of the connection
#[async_trait]
pub trait FeatureRemote: Send + Sync {
    /// Address of the remote feature
    fn address(&self) -> &FeatureAddress;

    /// Last data of `function` received from the peer
    fn data(&self, function: FunctionType) -> Option<Cmd>;

    /// Ask the peer for its current data of `function`
    async fn request_data(&self, function: FunctionType) -> Result<MsgCounter>;
}

pub type FeatureLocalPtr = Arc<dyn FeatureLocal>;
pub type FeatureRemotePtr = Arc<dyn FeatureRemote>;
