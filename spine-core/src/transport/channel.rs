//! In-process transport backed by a tokio channel

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

use super::events::OutboundDatagram;
use super::Sender;
use crate::error::{Error, Result};
use crate::model::{
    format_timestamp, Cmd, CmdClassifier, FeatureAddress, FunctionType, Header, MsgCounter,
};

pub type OutboundReceiver = mpsc::UnboundedReceiver<OutboundDatagram>;

/// Transport that numbers datagrams and pushes them onto an unbounded queue
///
/// The connection layer takes the receiving end once and forwards the
/// datagrams to the wire. Until it does, datagrams are buffered.
#[derive(Clone)]
pub struct ChannelSender {
    /// Last assigned message counter
    msg_counter: Arc<AtomicU64>,
    outbound_tx: mpsc::UnboundedSender<OutboundDatagram>,
    outbound_rx: Arc<RwLock<Option<OutboundReceiver>>>,
}

impl ChannelSender {
    /// Create a new channel transport
    pub fn new() -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        Self {
            msg_counter: Arc::new(AtomicU64::new(0)),
            outbound_tx,
            outbound_rx: Arc::new(RwLock::new(Some(outbound_rx))),
        }
    }

    /// Take the outbound receiver (can only be called once)
    pub async fn take_receiver(&self) -> Option<OutboundReceiver> {
        self.outbound_rx.write().await.take()
    }

    fn next_msg_counter(&self) -> MsgCounter {
        self.msg_counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn push(&self, datagram: OutboundDatagram) -> Result<()> {
        debug!(
            "Queueing {:?} for {} (msg_counter={:?})",
            datagram.classifier(),
            datagram.function,
            datagram.msg_counter()
        );
        self.outbound_tx
            .send(datagram)
            .map_err(|_| Error::Transport("Outbound channel closed".to_string()))
    }
}

impl Default for ChannelSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sender for ChannelSender {
    async fn notify(
        &self,
        sender: &FeatureAddress,
        destination: &FeatureAddress,
        cmd: Cmd,
    ) -> Result<MsgCounter> {
        let msg_counter = self.next_msg_counter();
        let header = Header::new(CmdClassifier::Notify)
            .with_source(sender.clone())
            .with_destination(destination.clone())
            .with_msg_counter(msg_counter)
            .with_timestamp(format_timestamp(Utc::now()));

        self.push(OutboundDatagram::new(header, cmd))?;
        Ok(msg_counter)
    }

    async fn reply(
        &self,
        request_header: &Header,
        sender: Option<&FeatureAddress>,
        cmd: Cmd,
    ) -> Result<()> {
        let reference = request_header.msg_counter.ok_or_else(|| {
            Error::Validation("request header has no msg_counter to reply to".to_string())
        })?;

        let mut header = Header::new(CmdClassifier::Reply)
            .with_msg_counter(self.next_msg_counter())
            .with_reference(reference)
            .with_timestamp(format_timestamp(Utc::now()));
        header.address_source = sender.cloned();
        header.address_destination = request_header.address_source.clone();

        self.push(OutboundDatagram::new(header, cmd))
    }

    async fn request(
        &self,
        sender: &FeatureAddress,
        destination: &FeatureAddress,
        function: FunctionType,
    ) -> Result<MsgCounter> {
        let msg_counter = self.next_msg_counter();
        let header = Header::new(CmdClassifier::Read)
            .with_source(sender.clone())
            .with_destination(destination.clone())
            .with_msg_counter(msg_counter)
            .with_timestamp(format_timestamp(Utc::now()));

        self.push(OutboundDatagram::read(header, function))?;
        Ok(msg_counter)
    }
}
