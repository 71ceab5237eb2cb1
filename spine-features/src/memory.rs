//! In-memory feature implementations

use async_trait::async_trait;
use parking_lot::RwLock;
use spine_core::model::{Cmd, FeatureAddress, FunctionType, MsgCounter};
use spine_core::transport::Sender;
use spine_core::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::base::{FeatureLocal, FeatureRemote};

/// Data of one feature, keyed by function
#[derive(Debug, Default)]
struct DataStore {
    data: RwLock<HashMap<FunctionType, Cmd>>,
}

impl DataStore {
    fn set(&self, data: Cmd) {
        self.data.write().insert(data.function(), data);
    }

    fn get(&self, function: FunctionType) -> Option<Cmd> {
        self.data.read().get(&function).cloned()
    }
}

/// Local feature keeping its data in memory
pub struct LocalFeature {
    address: FeatureAddress,
    store: DataStore,
    sender: Arc<dyn Sender>,
}

impl LocalFeature {
    pub fn new(address: FeatureAddress, sender: Arc<dyn Sender>) -> Self {
        Self {
            address,
            store: DataStore::default(),
            sender,
        }
    }
}

#[async_trait]
impl FeatureLocal for LocalFeature {
    fn address(&self) -> &FeatureAddress {
        &self.address
    }

    fn set_data(&self, data: Cmd) {
        self.store.set(data);
    }

    fn data(&self, function: FunctionType) -> Option<Cmd> {
        self.store.get(function)
    }

    async fn notify_data(
        &self,
        function: FunctionType,
        destination: &FeatureAddress,
    ) -> Result<MsgCounter> {
        let data = self
            .store
            .get(function)
            .ok_or(Error::DataNotAvailable(function))?;
        self.sender.notify(&self.address, destination, data).await
    }
}

/// Cache of a peer's feature
///
/// The connection layer feeds inbound data in with [`store`](Self::store).
pub struct RemoteFeature {
    address: FeatureAddress,
    /// Local feature requests are sent from
    local_address: FeatureAddress,
    store: DataStore,
    sender: Arc<dyn Sender>,
}

impl RemoteFeature {
    pub fn new(
        address: FeatureAddress,
        local_address: FeatureAddress,
        sender: Arc<dyn Sender>,
    ) -> Self {
        Self {
            address,
            local_address,
            store: DataStore::default(),
            sender,
        }
    }

    /// Cache data received from the peer
    pub fn store(&self, data: Cmd) {
        debug!("Caching {} from {}", data.function(), self.address);
        self.store.set(data);
    }
}

#[async_trait]
impl FeatureRemote for RemoteFeature {
    fn address(&self) -> &FeatureAddress {
        &self.address
    }

    fn data(&self, function: FunctionType) -> Option<Cmd> {
        self.store.get(function)
    }

    async fn request_data(&self, function: FunctionType) -> Result<MsgCounter> {
        self.sender
            .request(&self.local_address, &self.address, function)
            .await
    }
}
