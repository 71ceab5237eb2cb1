//! Transport port
//!
//! The heartbeat and the feature layer never talk to a socket directly.
//! They hand commands to a [`Sender`], which addresses, numbers and
//! delivers them. [`ChannelSender`] is an in-process implementation that
//! queues every datagram on a tokio channel.

pub mod channel;
pub mod events;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{Cmd, FeatureAddress, FunctionType, Header, MsgCounter};

pub use channel::ChannelSender;
pub use events::OutboundDatagram;

/// Outbound side of a SPINE connection
#[async_trait]
pub trait Sender: Send + Sync {
    /// Send a fire-and-forget notification, returning its message counter
    async fn notify(
        &self,
        sender: &FeatureAddress,
        destination: &FeatureAddress,
        cmd: Cmd,
    ) -> Result<MsgCounter>;

    /// Answer the request identified by `request_header`
    async fn reply(
        &self,
        request_header: &Header,
        sender: Option<&FeatureAddress>,
        cmd: Cmd,
    ) -> Result<()>;

    /// Ask the destination for its current data of `function`
    async fn request(
        &self,
        sender: &FeatureAddress,
        destination: &FeatureAddress,
        function: FunctionType,
    ) -> Result<MsgCounter>;
}
