use std::fmt;

use thiserror::Error;

/// Which table a storage error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Panel,
    Client,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Panel => f.write_str("panel"),
            Entity::Client => f.write_str("client"),
        }
    }
}

/// Error reported by a [`Store`](super::Store) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} {1} already exists")]
    Conflict(Entity, u32),

    #[error("{0} {1} does not exist")]
    Missing(Entity, u32),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
