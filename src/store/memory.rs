use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use super::{Entity, Store, StoreError};
use crate::model::{Client, ClientId, OwnerId, Panel, PanelId};

/// In-process store backed by ordered maps.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    panels: BTreeMap<PanelId, Panel>,
    clients: BTreeMap<ClientId, Client>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every client, ordered by id.
    pub fn clients(&self) -> impl Iterator<Item = &Client> + '_ {
        self.clients.values()
    }
}

impl Store for MemoryStore {
    fn panel(&self, id: PanelId) -> Result<Option<Panel>, StoreError> {
        Ok(self.panels.get(&id).cloned())
    }

    fn panels_by_owner(&self, owner: OwnerId) -> Result<Vec<Panel>, StoreError> {
        Ok(self
            .panels
            .values()
            .filter(|p| p.owner == owner)
            .cloned()
            .collect())
    }

    fn all_panels(&self) -> Result<Vec<Panel>, StoreError> {
        Ok(self.panels.values().cloned().collect())
    }

    fn insert_panel(&mut self, panel: Panel) -> Result<(), StoreError> {
        match self.panels.entry(panel.id) {
            Entry::Occupied(_) => Err(StoreError::Conflict(Entity::Panel, panel.id)),
            Entry::Vacant(slot) => {
                slot.insert(panel);
                Ok(())
            }
        }
    }

    fn update_panel(&mut self, panel: Panel) -> Result<(), StoreError> {
        let slot = self
            .panels
            .get_mut(&panel.id)
            .ok_or(StoreError::Missing(Entity::Panel, panel.id))?;
        *slot = panel;
        Ok(())
    }

    fn delete_panel(&mut self, id: PanelId) -> Result<Option<Panel>, StoreError> {
        Ok(self.panels.remove(&id))
    }

    fn client(&self, id: ClientId) -> Result<Option<Client>, StoreError> {
        Ok(self.clients.get(&id).cloned())
    }

    fn clients_by_panel(&self, panel: PanelId) -> Result<Vec<Client>, StoreError> {
        Ok(self
            .clients
            .values()
            .filter(|c| c.panel == Some(panel))
            .cloned()
            .collect())
    }

    fn insert_client(&mut self, client: Client) -> Result<(), StoreError> {
        match self.clients.entry(client.id) {
            Entry::Occupied(_) => Err(StoreError::Conflict(Entity::Client, client.id)),
            Entry::Vacant(slot) => {
                slot.insert(client);
                Ok(())
            }
        }
    }

    fn update_client(&mut self, client: Client) -> Result<(), StoreError> {
        let slot = self
            .clients
            .get_mut(&client.id)
            .ok_or(StoreError::Missing(Entity::Client, client.id))?;
        *slot = client;
        Ok(())
    }

    fn delete_client(&mut self, id: ClientId) -> Result<Option<Client>, StoreError> {
        Ok(self.clients.remove(&id))
    }

    fn transaction<T, E>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, E>) -> Result<T, E> {
        let snapshot = self.clone();
        let result = f(self);
        if result.is_err() {
            *self = snapshot;
        }
        result
    }
}
