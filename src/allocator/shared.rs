//! Mutex-guarded allocator handle for concurrent callers.

use std::sync::Arc;

use tokio::sync::Mutex;

use super::{Allocator, AllocatorError, PanelOccupancy};
use crate::model::{ClientId, Command, OwnerId, PanelId, SlotCategory};
use crate::store::{MemoryStore, Store};

/// Cloneable handle that serializes operations on one [`Allocator`].
///
/// Two requests racing for the last slot of a category both go through the
/// lock, so exactly one of them gets it.
pub struct SharedAllocator<S = MemoryStore> {
    inner: Arc<Mutex<Allocator<S>>>,
}

impl<S> Clone for SharedAllocator<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Store> SharedAllocator<S> {
    pub fn new(allocator: Allocator<S>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(allocator)),
        }
    }

    pub async fn apply(&self, command: Command) -> Result<(), AllocatorError> {
        self.inner.lock().await.apply(command)
    }

    pub async fn link_client(
        &self,
        owner: OwnerId,
        panel: PanelId,
        client: ClientId,
        category: SlotCategory,
    ) -> Result<(), AllocatorError> {
        self.inner
            .lock()
            .await
            .link_client(owner, panel, client, category)
    }

    pub async fn unlink_client(
        &self,
        owner: OwnerId,
        client: ClientId,
    ) -> Result<(), AllocatorError> {
        self.inner.lock().await.unlink_client(owner, client)
    }

    pub async fn list_panels_with_occupancy(
        &self,
        owner: OwnerId,
    ) -> Result<Vec<PanelOccupancy>, AllocatorError> {
        self.inner.lock().await.list_panels_with_occupancy(owner)
    }

    /// Take the allocator back once every other handle is dropped.
    pub fn into_inner(self) -> Option<Allocator<S>> {
        Arc::into_inner(self.inner).map(Mutex::into_inner)
    }
}
