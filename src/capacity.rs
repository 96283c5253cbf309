use std::collections::BTreeMap;

use crate::SlotCategory;

/// Per-category slot capacities of a panel.
///
/// A category missing from the map has capacity 0.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Capacities(BTreeMap<SlotCategory, u32>);

impl Capacities {
    /// Build capacities from raw input, rejecting negative or oversized values.
    ///
    /// On error returns the offending category and value. Later duplicates win.
    pub fn try_from_raw(
        raw: impl IntoIterator<Item = (SlotCategory, i64)>,
    ) -> Result<Self, (SlotCategory, i64)> {
        let mut map = BTreeMap::new();
        for (category, value) in raw {
            let Ok(capacity) = u32::try_from(value) else {
                return Err((category, value));
            };
            map.insert(category, capacity);
        }
        Ok(Capacities(map))
    }

    pub fn get(&self, category: &SlotCategory) -> u32 {
        self.0.get(category).copied().unwrap_or(0)
    }

    /// Categories with an explicit capacity, in name order.
    pub fn categories(&self) -> impl Iterator<Item = &SlotCategory> + '_ {
        self.0.keys()
    }
}

impl<const N: usize> From<[(SlotCategory, u32); N]> for Capacities {
    fn from(entries: [(SlotCategory, u32); N]) -> Self {
        Capacities(BTreeMap::from(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_category_has_zero_capacity() {
        let capacities = Capacities::from([(SlotCategory::P2P, 3)]);
        assert_eq!(capacities.get(&SlotCategory::P2P), 3);
        assert_eq!(capacities.get(&SlotCategory::IPTV), 0);
    }

    #[test]
    fn try_from_raw_accepts_zero() {
        let capacities =
            Capacities::try_from_raw([(SlotCategory::P2P, 0), (SlotCategory::IPTV, 2)]).unwrap();
        assert_eq!(capacities.get(&SlotCategory::P2P), 0);
        assert_eq!(capacities.get(&SlotCategory::IPTV), 2);
        // explicit zero is still a listed category
        assert_eq!(capacities.categories().count(), 2);
    }

    #[test]
    fn try_from_raw_rejects_negative() {
        let err = Capacities::try_from_raw([(SlotCategory::P2P, 1), (SlotCategory::IPTV, -1)])
            .unwrap_err();
        assert_eq!(err, (SlotCategory::IPTV, -1));
    }

    #[test]
    fn try_from_raw_rejects_overflow() {
        let too_big = i64::from(u32::MAX) + 1;
        let err = Capacities::try_from_raw([(SlotCategory::P2P, too_big)]).unwrap_err();
        assert_eq!(err, (SlotCategory::P2P, too_big));
    }

    #[test]
    fn try_from_raw_last_duplicate_wins() {
        let capacities =
            Capacities::try_from_raw([(SlotCategory::P2P, 1), (SlotCategory::P2P, 4)]).unwrap();
        assert_eq!(capacities.get(&SlotCategory::P2P), 4);
    }

    #[test]
    fn categories_are_name_ordered() {
        let capacities = Capacities::from([
            (SlotCategory::P2P, 1),
            (SlotCategory::new("CINE"), 1),
            (SlotCategory::IPTV, 1),
        ]);
        let names: Vec<_> = capacities.categories().map(|c| c.as_str()).collect();
        assert_eq!(names, ["CINE", "IPTV", "P2P"]);
    }
}
