//! Device Diagnosis feature
//!
//! Exchanges the diagnosis state with the peer and owns the heartbeat of
//! the connection.

use spine_core::heartbeat::{HeartbeatConfig, HeartbeatSender};
use spine_core::model::{
    Cmd, DeviceDiagnosisStateData, FeatureAddress, FunctionType, Header, HeartbeatData,
    MsgCounter,
};
use spine_core::transport::Sender;
use spine_core::{Error, Result};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::base::{FeatureLocal, FeatureRemote};
use crate::memory::{LocalFeature, RemoteFeature};

/// Device Diagnosis feature pair of one connection
///
/// Pairs our local feature with the peer's remote feature. All three parts
/// share one transport.
pub struct DeviceDiagnosis {
    local: LocalFeature,
    remote: RemoteFeature,
    heartbeat: HeartbeatSender,
}

impl DeviceDiagnosis {
    /// Create the feature pair for `local` and `remote` with the default heartbeat
    pub fn new(local: FeatureAddress, remote: FeatureAddress, sender: Arc<dyn Sender>) -> Self {
        Self::with_heartbeat_config(local, remote, sender, HeartbeatConfig::default())
    }

    /// Create the feature pair with an explicit heartbeat period and timeout
    ///
    /// A zero period is raised to the heartbeat sender's minimum.
    pub fn with_heartbeat_config(
        local: FeatureAddress,
        remote: FeatureAddress,
        sender: Arc<dyn Sender>,
        config: HeartbeatConfig,
    ) -> Self {
        Self {
            local: LocalFeature::new(local.clone(), sender.clone()),
            remote: RemoteFeature::new(remote, local, sender.clone()),
            heartbeat: HeartbeatSender::with_config(sender, config),
        }
    }

    pub fn local(&self) -> &LocalFeature {
        &self.local
    }

    pub fn remote(&self) -> &RemoteFeature {
        &self.remote
    }

    pub fn heartbeat(&self) -> &HeartbeatSender {
        &self.heartbeat
    }

    /// Ask the peer for its diagnosis state
    pub async fn request_state(&self) -> Result<MsgCounter> {
        self.remote
            .request_data(FunctionType::DeviceDiagnosisStateData)
            .await
    }

    /// Last diagnosis state received from the peer
    pub fn get_state(&self) -> Result<DeviceDiagnosisStateData> {
        match self.remote.data(FunctionType::DeviceDiagnosisStateData) {
            Some(Cmd::DeviceDiagnosisStateData(data)) => Ok(data),
            _ => Err(Error::DataNotAvailable(
                FunctionType::DeviceDiagnosisStateData,
            )),
        }
    }

    /// Publish our diagnosis state and notify the peer
    ///
    /// A failed notification is logged; the state stays stored locally.
    pub async fn send_state(&self, state: DeviceDiagnosisStateData) {
        self.local.set_data(Cmd::DeviceDiagnosisStateData(state));

        match self
            .local
            .notify_data(
                FunctionType::DeviceDiagnosisStateData,
                self.remote.address(),
            )
            .await
        {
            Ok(msg_counter) => debug!("Diagnosis state sent as message {}", msg_counter),
            Err(e) => warn!("Failed to notify diagnosis state to {}: {}", self.remote.address(), e),
        }
    }

    /// Last heartbeat received from the peer
    pub fn get_heartbeat(&self) -> Result<HeartbeatData> {
        match self.remote.data(FunctionType::DeviceDiagnosisHeartbeatData) {
            Some(Cmd::DeviceDiagnosisHeartbeatData(data)) => Ok(data),
            _ => Err(Error::DataNotAvailable(
                FunctionType::DeviceDiagnosisHeartbeatData,
            )),
        }
    }

    /// Start announcing our heartbeat to the peer
    pub fn start_heartbeat(&self) {
        self.heartbeat
            .start(self.local.address().clone(), self.remote.address().clone());
    }

    pub fn stop_heartbeat(&self) {
        self.heartbeat.stop();
    }

    /// Answer a heartbeat read request of the peer
    pub async fn handle_heartbeat_request(&self, request_header: &Header) -> Result<()> {
        self.heartbeat.report_now(request_header).await
    }

    /// Whether a result datagram refers to one of our periodic heartbeats
    pub fn is_heartbeat_response(&self, msg_counter: MsgCounter) -> bool {
        self.heartbeat.is_heartbeat_msg_counter(msg_counter)
    }
}
