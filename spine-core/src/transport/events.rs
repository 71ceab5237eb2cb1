//! Datagrams handed to the transport

use serde::{Deserialize, Serialize};

use crate::model::{Cmd, CmdClassifier, FunctionType, Header, MsgCounter};

/// Datagram queued for delivery to a remote device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundDatagram {
    /// Addressing and correlation
    pub header: Header,
    /// Function the datagram is about
    pub function: FunctionType,
    /// Payload; absent for read requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmd: Option<Cmd>,
}

impl OutboundDatagram {
    /// Create a datagram carrying data
    pub fn new(header: Header, cmd: Cmd) -> Self {
        Self {
            header,
            function: cmd.function(),
            cmd: Some(cmd),
        }
    }

    /// Create a read request for `function`
    pub fn read(header: Header, function: FunctionType) -> Self {
        Self {
            header,
            function,
            cmd: None,
        }
    }

    /// Message counter assigned by the transport
    pub fn msg_counter(&self) -> Option<MsgCounter> {
        self.header.msg_counter
    }

    /// Command kind from the header
    pub fn classifier(&self) -> Option<CmdClassifier> {
        self.header.cmd_classifier
    }
}
