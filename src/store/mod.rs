//! Storage contract for panels and clients.
//!
//! The allocator only needs point lookups, owner/panel filtered lists and
//! plain inserts, updates and deletes. Capacity enforcement happens in the
//! allocator, which holds exclusive access to the store while it checks and writes.
//! Operations that write more than one row go through [`Store::transaction`].

use crate::model::{Client, ClientId, OwnerId, Panel, PanelId};

mod error;
pub use error::{Entity, StoreError};

mod memory;
pub use memory::MemoryStore;

pub trait Store {
    fn panel(&self, id: PanelId) -> Result<Option<Panel>, StoreError>;

    /// Panels of one owner, ordered by id.
    fn panels_by_owner(&self, owner: OwnerId) -> Result<Vec<Panel>, StoreError>;

    /// Every panel, ordered by id.
    fn all_panels(&self) -> Result<Vec<Panel>, StoreError>;

    /// Fails with [`StoreError::Conflict`] if the id is taken.
    fn insert_panel(&mut self, panel: Panel) -> Result<(), StoreError>;

    fn update_panel(&mut self, panel: Panel) -> Result<(), StoreError>;

    fn delete_panel(&mut self, id: PanelId) -> Result<Option<Panel>, StoreError>;

    fn client(&self, id: ClientId) -> Result<Option<Client>, StoreError>;

    /// Clients referencing `panel`, ordered by id.
    fn clients_by_panel(&self, panel: PanelId) -> Result<Vec<Client>, StoreError>;

    /// Fails with [`StoreError::Conflict`] if the id is taken.
    fn insert_client(&mut self, client: Client) -> Result<(), StoreError>;

    fn update_client(&mut self, client: Client) -> Result<(), StoreError>;

    fn delete_client(&mut self, id: ClientId) -> Result<Option<Client>, StoreError>;

    /// Run `f` as one unit: if it returns an error, none of its writes persist.
    fn transaction<T, E>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, E>) -> Result<T, E>
    where
        Self: Sized;
}
