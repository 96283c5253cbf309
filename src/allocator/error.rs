//! Error types for allocator operations.

use thiserror::Error;

use crate::model::{ClientId, OwnerId, PanelId, SlotCategory};
use crate::store::StoreError;

/// Top-level error returned by [`Allocator`](super::Allocator) operations.
#[derive(Debug, Error)]
pub enum AllocatorError {
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Access(#[from] AccessError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// Broad class of an [`AllocatorError`], for mapping to user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Forbidden,
    Storage,
}

impl AllocatorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AllocatorError::Validation(_) => ErrorKind::Validation,
            AllocatorError::Access(AccessError::PanelNotFound(..))
            | AllocatorError::Access(AccessError::ClientNotFound(..)) => ErrorKind::NotFound,
            AllocatorError::Access(_) => ErrorKind::Forbidden,
            AllocatorError::Store(StoreError::Conflict(..)) => ErrorKind::Conflict,
            AllocatorError::Store(StoreError::Missing(..)) => ErrorKind::NotFound,
            AllocatorError::Store(StoreError::Unavailable(_)) => ErrorKind::Storage,
        }
    }
}

/// Request rejected before any state was touched.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("panel name must not be empty")]
    EmptyName,

    #[error("capacity for {0} must be between 0 and {max}, got {1}", max = u32::MAX)]
    InvalidCapacity(SlotCategory, i64),

    #[error("panel {panel} has no free {category} slot (capacity {capacity})")]
    CapacityExhausted {
        panel: PanelId,
        category: SlotCategory,
        capacity: u32,
    },

    #[error("client {0} is already linked to panel {1}")]
    AlreadyLinked(ClientId, PanelId),

    #[error("client {0} is not linked to any panel")]
    NotLinked(ClientId),
}

/// The allocator operation being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    UpdateCapacities,
    RenamePanel,
    DeletePanel,
    RemoveClient,
    Link,
    Unlink,
    SuggestCategory,
}

/// Lookup and tenancy errors, tagged with the failed operation.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("{0:?}: panel {1} not found")]
    PanelNotFound(Operation, PanelId),

    #[error("{0:?}: client {1} not found")]
    ClientNotFound(Operation, ClientId),

    #[error("{0:?}: panel {1} belongs to owner {2}, not {3}")]
    PanelOwnerMismatch(Operation, PanelId, OwnerId, OwnerId),

    #[error("{0:?}: client {1} belongs to owner {2}, not {3}")]
    ClientOwnerMismatch(Operation, ClientId, OwnerId, OwnerId),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Entity;

    #[test]
    fn kinds_follow_taxonomy() {
        let exhausted = AllocatorError::from(ValidationError::CapacityExhausted {
            panel: 1,
            category: SlotCategory::IPTV,
            capacity: 2,
        });
        assert_eq!(exhausted.kind(), ErrorKind::Validation);

        let duplicate = AllocatorError::from(StoreError::Conflict(Entity::Client, 4));
        assert_eq!(duplicate.kind(), ErrorKind::Conflict);

        let missing = AllocatorError::from(AccessError::PanelNotFound(Operation::Link, 9));
        assert_eq!(missing.kind(), ErrorKind::NotFound);

        let foreign =
            AllocatorError::from(AccessError::ClientOwnerMismatch(Operation::Unlink, 3, 1, 2));
        assert_eq!(foreign.kind(), ErrorKind::Forbidden);

        let down = AllocatorError::from(StoreError::Unavailable("timeout".into()));
        assert_eq!(down.kind(), ErrorKind::Storage);
    }

    #[test]
    fn messages_name_the_resource() {
        let err = AllocatorError::from(ValidationError::CapacityExhausted {
            panel: 1,
            category: SlotCategory::IPTV,
            capacity: 2,
        });
        assert_eq!(
            err.to_string(),
            "invalid request: panel 1 has no free IPTV slot (capacity 2)"
        );

        let err = AllocatorError::from(AccessError::PanelOwnerMismatch(Operation::Link, 1, 7, 8));
        assert_eq!(err.to_string(), "Link: panel 1 belongs to owner 7, not 8");
    }
}
