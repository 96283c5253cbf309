use std::collections::BTreeMap;

use crate::model::{Client, Credential, OwnerId, Panel, PanelId, SlotCategory};

/// Filled and available slots of one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryOccupancy {
    pub category: SlotCategory,
    pub capacity: u32,
    pub filled: u32,
    /// `capacity - filled`; negative when the panel was shrunk below its filled count.
    pub available: i64,
}

/// Derived occupancy view of a panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelOccupancy {
    pub panel: PanelId,
    pub owner: OwnerId,
    pub name: String,
    /// One entry per category with a capacity or a linked client, in name order.
    pub categories: Vec<CategoryOccupancy>,
    /// `None` while no client is linked.
    pub shared: Option<Credential>,
}

impl PanelOccupancy {
    /// Count linked clients per category. `clients` must be the panel's linked clients.
    pub(crate) fn compute(panel: &Panel, clients: &[Client]) -> Self {
        let mut filled: BTreeMap<&SlotCategory, u32> =
            panel.capacities.categories().map(|c| (c, 0)).collect();
        for client in clients {
            if let Some((_, category)) = client.link() {
                *filled.entry(category).or_default() += 1;
            }
        }

        let categories = filled
            .into_iter()
            .map(|(category, filled)| {
                let capacity = panel.capacities.get(category);
                CategoryOccupancy {
                    category: category.clone(),
                    capacity,
                    filled,
                    available: i64::from(capacity) - i64::from(filled),
                }
            })
            .collect();

        let any_linked = clients.iter().any(Client::is_linked);
        Self {
            panel: panel.id,
            owner: panel.owner,
            name: panel.name.clone(),
            categories,
            shared: panel.shared.clone().filter(|_| any_linked),
        }
    }

    pub fn category(&self, category: &SlotCategory) -> Option<&CategoryOccupancy> {
        self.categories.iter().find(|c| &c.category == category)
    }

    pub fn filled(&self, category: &SlotCategory) -> u32 {
        self.category(category).map_or(0, |c| c.filled)
    }

    pub fn available(&self, category: &SlotCategory) -> i64 {
        self.category(category).map_or(0, |c| c.available)
    }

    pub fn linked(&self) -> u32 {
        self.categories.iter().map(|c| c.filled).sum()
    }

    /// No category has a free slot.
    pub fn is_full(&self) -> bool {
        self.categories.iter().all(|c| c.available <= 0)
    }

    /// Some category holds more clients than its capacity.
    pub fn is_over_filled(&self) -> bool {
        self.categories.iter().any(|c| c.available < 0)
    }
}
