//! Store inventory snapshot consulted by the inventory-level rule.

use std::collections::HashMap;

use common::{SkuCode, StoreId};
use serde::{Deserialize, Serialize};

/// On-hand position of one SKU at one store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreInventory {
    pub store: StoreId,
    pub sku: SkuCode,
    pub on_hand: u32,
    pub weekly_forecast: f64,
    pub target_weeks_of_supply: f64,
}

impl StoreInventory {
    /// Target stock level: forecast times weeks of supply.
    pub fn target(&self) -> f64 {
        self.weekly_forecast * self.target_weeks_of_supply
    }

    /// On-hand to target ratio; `None` when no target is defined.
    pub fn ratio(&self) -> Option<f64> {
        let target = self.target();
        (target > 0.0).then(|| f64::from(self.on_hand) / target)
    }
}

/// Point-in-time inventory positions keyed by store and SKU.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InventorySnapshot {
    positions: HashMap<(StoreId, SkuCode), StoreInventory>,
}

impl InventorySnapshot {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a position.
    pub fn insert(&mut self, position: StoreInventory) {
        self.positions
            .insert((position.store.clone(), position.sku.clone()), position);
    }

    /// Ratio for a store and SKU, if a usable position exists.
    pub fn ratio(&self, store: &StoreId, sku: &SkuCode) -> Option<f64> {
        self.positions
            .get(&(store.clone(), sku.clone()))
            .and_then(StoreInventory::ratio)
    }

    /// Number of positions held.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Returns true if the snapshot holds no positions.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl FromIterator<StoreInventory> for InventorySnapshot {
    fn from_iter<T: IntoIterator<Item = StoreInventory>>(iter: T) -> Self {
        let mut snapshot = Self::new();
        for position in iter {
            snapshot.insert(position);
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(on_hand: u32, forecast: f64, wos: f64) -> StoreInventory {
        StoreInventory {
            store: StoreId::new("ST-101"),
            sku: SkuCode::new("SKU-1"),
            on_hand,
            weekly_forecast: forecast,
            target_weeks_of_supply: wos,
        }
    }

    #[test]
    fn test_ratio() {
        let p = position(30, 25.0, 2.0);
        assert_eq!(p.target(), 50.0);
        assert_eq!(p.ratio(), Some(0.6));
    }

    #[test]
    fn test_zero_target_has_no_ratio() {
        assert_eq!(position(30, 0.0, 2.0).ratio(), None);
    }

    #[test]
    fn test_snapshot_lookup() {
        let snapshot: InventorySnapshot = vec![position(10, 10.0, 2.0)].into_iter().collect();
        assert_eq!(
            snapshot.ratio(&StoreId::new("ST-101"), &SkuCode::new("SKU-1")),
            Some(0.5)
        );
        assert_eq!(
            snapshot.ratio(&StoreId::new("ST-999"), &SkuCode::new("SKU-1")),
            None
        );
    }
}
