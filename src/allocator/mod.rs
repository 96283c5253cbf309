//! Shared-credential slot allocator.
//!
//! The allocator links clients into the slots of credit panels. Each panel has
//! a capacity per slot category, and every client linked to a panel carries a
//! copy of the panel's single shared credential. Also supports async stream of
//! commands.

use tokio_stream::{Stream, StreamExt};
use tracing::{info, warn};

use crate::Capacities;
use crate::model::{Client, ClientId, Command, Credential, OwnerId, Panel, PanelId, SlotCategory};
use crate::store::{MemoryStore, Store, StoreError};

mod error;
pub use error::{AccessError, AllocatorError, ErrorKind, Operation, ValidationError};

mod occupancy;
pub use occupancy::{CategoryOccupancy, PanelOccupancy};

mod shared;
pub use shared::SharedAllocator;

/// The slot allocator.
///
/// All operations take `&mut self`, so a capacity check and the write that
/// depends on it can never interleave with another operation.
pub struct Allocator<S = MemoryStore> {
    store: S,
}

impl Allocator<MemoryStore> {
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }
}

/// Public API
impl<S: Store> Allocator<S> {
    pub fn with_store(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run the allocator with the given command stream
    pub async fn run(&mut self, mut stream: impl Stream<Item = Command> + Unpin) {
        while let Some(command) = stream.next().await {
            // a rejected command must not stop the run, it is already logged by `apply`
            let _ = self.apply(command);
        }
    }

    /// Apply a single command on top of the current state
    pub fn apply(&mut self, command: Command) -> Result<(), AllocatorError> {
        let owner = command.owner();
        let result = match command {
            Command::CreatePanel {
                panel,
                name,
                capacities,
                ..
            } => self.create_panel(owner, panel, name, capacities),
            Command::UpdateCapacities {
                panel, capacities, ..
            } => self.update_panel_capacities(owner, panel, capacities),
            Command::RenamePanel { panel, name, .. } => self.rename_panel(owner, panel, name),
            Command::DeletePanel { panel, .. } => self.delete_panel(owner, panel).map(|_| ()),
            Command::AddClient {
                client, credential, ..
            } => self.add_client(owner, client, credential),
            Command::RemoveClient { client, .. } => self.remove_client(owner, client),
            Command::Link {
                panel,
                client,
                category,
                ..
            } => self.link_client(owner, panel, client, category),
            Command::Unlink { client, .. } => self.unlink_client(owner, client),
        };
        if let Err(e) = &result {
            info!(owner = %owner, reason = %e, "command skipped");
        }
        result
    }

    /// Create an empty panel.
    pub fn create_panel(
        &mut self,
        owner: OwnerId,
        panel: PanelId,
        name: impl Into<String>,
        capacities: impl IntoIterator<Item = (SlotCategory, i64)>,
    ) -> Result<(), AllocatorError> {
        let name = valid_name(name.into())?;
        let capacities = valid_capacities(capacities)?;

        self.store.insert_panel(Panel {
            id: panel,
            owner,
            name,
            capacities,
            shared: None,
        })?;

        info!(owner = %owner, panel = %panel, "panel created");
        Ok(())
    }

    /// Replace a panel's capacities.
    ///
    /// Shrinking below the current filled count is accepted: no client is
    /// evicted, the panel just reports negative availability until slots free up.
    pub fn update_panel_capacities(
        &mut self,
        owner: OwnerId,
        panel: PanelId,
        capacities: impl IntoIterator<Item = (SlotCategory, i64)>,
    ) -> Result<(), AllocatorError> {
        let capacities = valid_capacities(capacities)?;
        let mut record = self.owned_panel(Operation::UpdateCapacities, owner, panel)?;
        record.capacities = capacities;

        let occupancy = self.occupancy(&record)?;
        for c in occupancy.categories.iter().filter(|c| c.available < 0) {
            warn!(
                owner = %owner,
                panel = %panel,
                category = %c.category,
                capacity = c.capacity,
                filled = c.filled,
                "panel capacity below filled slots, needs review"
            );
        }

        self.store.update_panel(record)?;
        info!(owner = %owner, panel = %panel, "panel capacities updated");
        Ok(())
    }

    pub fn rename_panel(
        &mut self,
        owner: OwnerId,
        panel: PanelId,
        name: impl Into<String>,
    ) -> Result<(), AllocatorError> {
        let name = valid_name(name.into())?;
        let mut record = self.owned_panel(Operation::RenamePanel, owner, panel)?;
        record.name = name;
        self.store.update_panel(record)?;
        info!(owner = %owner, panel = %panel, "panel renamed");
        Ok(())
    }

    /// Remove a panel and return it.
    ///
    /// Linked clients are kept: they lose the panel reference but keep their
    /// category and credential.
    pub fn delete_panel(
        &mut self,
        owner: OwnerId,
        panel: PanelId,
    ) -> Result<Panel, AllocatorError> {
        let record = self.owned_panel(Operation::DeletePanel, owner, panel)?;
        let clients = self.store.clients_by_panel(panel)?;
        let orphaned = clients.len();

        self.store.transaction(|store| -> Result<(), StoreError> {
            for mut client in clients {
                client.panel = None;
                store.update_client(client)?;
            }
            store.delete_panel(panel)?;
            Ok(())
        })?;

        info!(owner = %owner, panel = %panel, orphaned, "panel deleted");
        Ok(record)
    }

    /// Register an unlinked client with its own credential.
    pub fn add_client(
        &mut self,
        owner: OwnerId,
        client: ClientId,
        credential: Credential,
    ) -> Result<(), AllocatorError> {
        self.store
            .insert_client(Client::new(client, owner, credential))?;
        info!(owner = %owner, client = %client, "client added");
        Ok(())
    }

    /// Delete a client. A linked client frees its slot.
    pub fn remove_client(
        &mut self,
        owner: OwnerId,
        client: ClientId,
    ) -> Result<(), AllocatorError> {
        let record = self.owned_client(Operation::RemoveClient, owner, client)?;
        self.store.transaction(|store| -> Result<(), StoreError> {
            store.delete_client(client)?;
            match record.link() {
                Some((panel, _)) => release_shared_if_empty(store, panel),
                None => Ok(()),
            }
        })?;
        info!(owner = %owner, client = %client, "client removed");
        Ok(())
    }

    /// Link `client` into one `category` slot of `panel`.
    ///
    /// Credential resolution:
    /// - Empty panel: the client's own credential becomes the panel's shared credential
    /// - Otherwise: the client's credential is overwritten with the shared one
    pub fn link_client(
        &mut self,
        owner: OwnerId,
        panel: PanelId,
        client: ClientId,
        category: SlotCategory,
    ) -> Result<(), AllocatorError> {
        use Operation::Link;

        let mut panel_record = self.owned_panel(Link, owner, panel)?;
        let mut client_record = self.owned_client(Link, owner, client)?;

        if let Some(current) = client_record.panel {
            return Err(ValidationError::AlreadyLinked(client, current).into());
        }

        let linked = self.store.clients_by_panel(panel)?;
        let occupancy = PanelOccupancy::compute(&panel_record, &linked);
        if occupancy.available(&category) <= 0 {
            return Err(ValidationError::CapacityExhausted {
                panel,
                capacity: panel_record.capacities.get(&category),
                category,
            }
            .into());
        }

        // first client in: its own credential becomes the shared one
        let first_in = match panel_record.shared.clone() {
            Some(shared) if occupancy.linked() > 0 => {
                client_record.credential = shared;
                None
            }
            _ => {
                panel_record.shared = Some(client_record.credential.clone());
                Some(panel_record)
            }
        };
        client_record.panel = Some(panel);
        client_record.category = Some(category.clone());

        self.store.transaction(|store| -> Result<(), StoreError> {
            if let Some(panel_record) = first_in {
                store.update_panel(panel_record)?;
            }
            store.update_client(client_record)
        })?;

        info!(
            owner = %owner,
            panel = %panel,
            client = %client,
            category = %category,
            "client linked"
        );
        Ok(())
    }

    /// Free the slot held by `client`. Its credential is left as is.
    pub fn unlink_client(
        &mut self,
        owner: OwnerId,
        client: ClientId,
    ) -> Result<(), AllocatorError> {
        let mut record = self.owned_client(Operation::Unlink, owner, client)?;
        let Some((panel, _)) = record.link() else {
            return Err(ValidationError::NotLinked(client).into());
        };

        record.panel = None;
        record.category = None;
        self.store.transaction(|store| -> Result<(), StoreError> {
            store.update_client(record)?;
            release_shared_if_empty(store, panel)
        })?;

        info!(owner = %owner, panel = %panel, client = %client, "client unlinked");
        Ok(())
    }

    /// Occupancy of every panel of `owner`, ordered by panel id.
    pub fn list_panels_with_occupancy(
        &self,
        owner: OwnerId,
    ) -> Result<Vec<PanelOccupancy>, AllocatorError> {
        self.store
            .panels_by_owner(owner)?
            .iter()
            .map(|panel| self.occupancy(panel))
            .collect()
    }

    /// Occupancy of every panel of every owner, ordered by panel id.
    pub fn list_all_panels(&self) -> Result<Vec<PanelOccupancy>, AllocatorError> {
        self.store
            .all_panels()?
            .iter()
            .map(|panel| self.occupancy(panel))
            .collect()
    }

    /// Panels of `owner` holding more clients than some category allows.
    pub fn over_filled_panels(
        &self,
        owner: OwnerId,
    ) -> Result<Vec<PanelOccupancy>, AllocatorError> {
        let mut panels = self.list_panels_with_occupancy(owner)?;
        panels.retain(PanelOccupancy::is_over_filled);
        Ok(panels)
    }

    /// Category to preselect for the next link on `panel`.
    ///
    /// Keeps `last` while it has room, otherwise flips to the first other
    /// category with a free slot. `None` when the panel is full.
    pub fn suggest_category(
        &self,
        owner: OwnerId,
        panel: PanelId,
        last: Option<&SlotCategory>,
    ) -> Result<Option<SlotCategory>, AllocatorError> {
        let record = self.owned_panel(Operation::SuggestCategory, owner, panel)?;
        let occupancy = self.occupancy(&record)?;

        if let Some(last) = last.filter(|c| occupancy.available(c) > 0) {
            return Ok(Some(last.clone()));
        }

        Ok(occupancy
            .categories
            .into_iter()
            .find(|c| c.available > 0)
            .map(|c| c.category))
    }
}

/// Private API
impl<S: Store> Allocator<S> {
    fn occupancy(&self, panel: &Panel) -> Result<PanelOccupancy, AllocatorError> {
        let clients = self.store.clients_by_panel(panel.id)?;
        Ok(PanelOccupancy::compute(panel, &clients))
    }

    /// Fetch a panel and ensure it belongs to `owner`
    fn owned_panel(
        &self,
        op: Operation,
        owner: OwnerId,
        panel: PanelId,
    ) -> Result<Panel, AllocatorError> {
        let record = self
            .store
            .panel(panel)?
            .ok_or(AccessError::PanelNotFound(op, panel))?;
        if record.owner != owner {
            return Err(AccessError::PanelOwnerMismatch(op, panel, record.owner, owner).into());
        }
        Ok(record)
    }

    /// Fetch a client and ensure it belongs to `owner`
    fn owned_client(
        &self,
        op: Operation,
        owner: OwnerId,
        client: ClientId,
    ) -> Result<Client, AllocatorError> {
        let record = self
            .store
            .client(client)?
            .ok_or(AccessError::ClientNotFound(op, client))?;
        if record.owner != owner {
            return Err(AccessError::ClientOwnerMismatch(op, client, record.owner, owner).into());
        }
        Ok(record)
    }
}

impl Default for Allocator<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

/// Forget the shared credential once the last client has left, so the next
/// first-linker fixes a new one.
fn release_shared_if_empty<S: Store>(store: &mut S, panel: PanelId) -> Result<(), StoreError> {
    let Some(mut record) = store.panel(panel)? else {
        return Ok(());
    };
    if record.shared.is_some() && store.clients_by_panel(panel)?.is_empty() {
        record.shared = None;
        store.update_panel(record)?;
    }
    Ok(())
}

fn valid_name(name: String) -> Result<String, ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    Ok(name)
}

fn valid_capacities(
    raw: impl IntoIterator<Item = (SlotCategory, i64)>,
) -> Result<Capacities, ValidationError> {
    Capacities::try_from_raw(raw)
        .map_err(|(category, value)| ValidationError::InvalidCapacity(category, value))
}
