//! Datagram header

use serde::{Deserialize, Serialize};

use super::address::FeatureAddress;

/// Correlation identifier assigned by the transport to every sent datagram
pub type MsgCounter = u64;

/// SPINE specification version announced in outgoing headers
pub const SPECIFICATION_VERSION: &str = "1.3.0";

/// Kind of command carried by a datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CmdClassifier {
    Read,
    Reply,
    Notify,
    Write,
    Call,
    Result,
}

/// Header of a SPINE datagram
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    /// Protocol version of the sender
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specification_version: Option<String>,
    /// Sending feature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_source: Option<FeatureAddress>,
    /// Receiving feature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_destination: Option<FeatureAddress>,
    /// Counter of this datagram
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg_counter: Option<MsgCounter>,
    /// Counter of the datagram this one answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg_counter_reference: Option<MsgCounter>,
    /// Command kind
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmd_classifier: Option<CmdClassifier>,
    /// Whether the receiver should acknowledge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack_request: Option<bool>,
    /// Send time (RFC 3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Header {
    /// Create a header for the given command kind
    pub fn new(cmd_classifier: CmdClassifier) -> Self {
        Self {
            specification_version: Some(SPECIFICATION_VERSION.to_string()),
            cmd_classifier: Some(cmd_classifier),
            ..Default::default()
        }
    }

    /// Set the source address
    pub fn with_source(mut self, address: FeatureAddress) -> Self {
        self.address_source = Some(address);
        self
    }

    /// Set the destination address
    pub fn with_destination(mut self, address: FeatureAddress) -> Self {
        self.address_destination = Some(address);
        self
    }

    /// Set the counter of this datagram
    pub fn with_msg_counter(mut self, msg_counter: MsgCounter) -> Self {
        self.msg_counter = Some(msg_counter);
        self
    }

    /// Reference the counter of the datagram being answered
    pub fn with_reference(mut self, msg_counter: MsgCounter) -> Self {
        self.msg_counter_reference = Some(msg_counter);
        self
    }

    /// Set the send time
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }
}
