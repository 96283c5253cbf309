pub mod allocator;
pub mod capacity;
pub mod csv;
pub mod model;
pub mod store;

pub use allocator::{Allocator, AllocatorError, PanelOccupancy, SharedAllocator};
pub use capacity::Capacities;
pub use model::{Client, ClientId, Command, Credential, OwnerId, Panel, PanelId, SlotCategory};
