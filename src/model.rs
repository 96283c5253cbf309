//! Core domain types for the slot allocator.

use std::borrow::Cow;
use std::fmt;

use crate::Capacities;

/// Seller (tenant) identifier. Every panel and client belongs to exactly one owner.
pub type OwnerId = u32;

/// Credit panel identifier.
pub type PanelId = u32;

/// Client identifier.
pub type ClientId = u32;

/// A named sub-pool of a panel with its own capacity.
///
/// The set of categories is open; `P2P` and `IPTV` are the ones resellers use today.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotCategory(Cow<'static, str>);

impl SlotCategory {
    pub const P2P: SlotCategory = SlotCategory(Cow::Borrowed("P2P"));
    pub const IPTV: SlotCategory = SlotCategory(Cow::Borrowed("IPTV"));

    pub fn new(name: impl Into<String>) -> Self {
        SlotCategory(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlotCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An opaque login/password pair.
///
/// Values may already be encrypted by the caller; the allocator only copies them.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Credential {
    pub login: String,
    pub password: String,
}

impl Credential {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }
}

// Keep passwords out of logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("login", &self.login)
            .field("password", &"***")
            .finish()
    }
}

/// A credit panel: a pool of slots sharing one login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Panel {
    pub id: PanelId,
    pub owner: OwnerId,
    pub name: String,
    pub capacities: Capacities,
    /// Canonical shared credential, fixed by the first client to link into an empty panel.
    /// `None` while no client is linked.
    pub shared: Option<Credential>,
}

/// A client record as far as the allocator is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    pub id: ClientId,
    pub owner: OwnerId,
    /// Own credential before linking, last known shared credential after.
    pub credential: Credential,
    pub panel: Option<PanelId>,
    /// Slot category of the current or last link. Survives panel deletion.
    pub category: Option<SlotCategory>,
}

impl Client {
    /// Create an unlinked client with its own credential.
    pub fn new(id: ClientId, owner: OwnerId, credential: Credential) -> Self {
        Self {
            id,
            owner,
            credential,
            panel: None,
            category: None,
        }
    }

    /// The (panel, category) pair this client occupies, if linked.
    pub fn link(&self) -> Option<(PanelId, &SlotCategory)> {
        match (self.panel, &self.category) {
            (Some(panel), Some(category)) => Some((panel, category)),
            _ => None,
        }
    }

    pub fn is_linked(&self) -> bool {
        self.link().is_some()
    }
}

/// A command representing the possible inputs of the allocator.
#[derive(Debug, Clone)]
pub enum Command {
    /// Create a panel with the given per-category capacities.
    CreatePanel {
        owner: OwnerId,
        panel: PanelId,
        name: String,
        capacities: Vec<(SlotCategory, i64)>,
    },
    /// Replace a panel's capacities. Shrinking below the filled count is allowed.
    UpdateCapacities {
        owner: OwnerId,
        panel: PanelId,
        capacities: Vec<(SlotCategory, i64)>,
    },
    /// Change a panel's display name.
    RenamePanel {
        owner: OwnerId,
        panel: PanelId,
        name: String,
    },
    /// Remove a panel; linked clients keep their data but lose the panel reference.
    DeletePanel { owner: OwnerId, panel: PanelId },
    /// Register a client with its own credential.
    AddClient {
        owner: OwnerId,
        client: ClientId,
        credential: Credential,
    },
    /// Delete a client, freeing its slot if linked.
    RemoveClient { owner: OwnerId, client: ClientId },
    /// Occupy one slot of `category` on `panel` for `client`.
    Link {
        owner: OwnerId,
        panel: PanelId,
        client: ClientId,
        category: SlotCategory,
    },
    /// Free the slot held by `client`, keeping its credential.
    Unlink { owner: OwnerId, client: ClientId },
}

impl Command {
    pub fn owner(&self) -> OwnerId {
        match self {
            Command::CreatePanel { owner, .. }
            | Command::UpdateCapacities { owner, .. }
            | Command::RenamePanel { owner, .. }
            | Command::DeletePanel { owner, .. }
            | Command::AddClient { owner, .. }
            | Command::RemoveClient { owner, .. }
            | Command::Link { owner, .. }
            | Command::Unlink { owner, .. } => *owner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_categories_equal_parsed_ones() {
        assert_eq!(SlotCategory::new("P2P"), SlotCategory::P2P);
        assert_eq!(SlotCategory::new("IPTV"), SlotCategory::IPTV);
        assert_ne!(SlotCategory::P2P, SlotCategory::IPTV);
    }

    #[test]
    fn categories_order_by_name() {
        assert!(SlotCategory::IPTV < SlotCategory::P2P);
    }

    #[test]
    fn credential_debug_hides_password() {
        let debug = format!("{:?}", Credential::new("u1", "hunter2"));
        assert!(debug.contains("u1"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn new_client_is_unlinked() {
        let client = Client::new(1, 7, Credential::new("u1", "p1"));
        assert!(!client.is_linked());
        assert_eq!(client.link(), None);
    }

    #[test]
    fn client_without_panel_is_not_linked() {
        // what a client looks like after its panel was deleted
        let mut client = Client::new(1, 7, Credential::default());
        client.category = Some(SlotCategory::IPTV);
        assert!(!client.is_linked());

        client.panel = Some(3);
        assert_eq!(client.link(), Some((3, &SlotCategory::IPTV)));
    }
}
