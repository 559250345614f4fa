//! Store inventory positions.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{SkuCode, StoreId};
use domain::{InventorySnapshot, StoreInventory};
use tokio::sync::RwLock;

use crate::Result;

/// Source of store inventory snapshots for the inventory-level rule.
#[async_trait]
pub trait InventoryRepository: Send + Sync {
    /// Positions of every store for one SKU.
    async fn snapshot_for(&self, sku: &SkuCode) -> Result<InventorySnapshot>;

    /// Stores a store's position for a SKU.
    async fn upsert(&self, position: StoreInventory) -> Result<()>;
}

/// In-memory inventory positions.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventoryRepository {
    positions: Arc<RwLock<HashMap<(StoreId, SkuCode), StoreInventory>>>,
}

impl InMemoryInventoryRepository {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InventoryRepository for InMemoryInventoryRepository {
    async fn snapshot_for(&self, sku: &SkuCode) -> Result<InventorySnapshot> {
        let positions = self.positions.read().await;
        Ok(positions
            .values()
            .filter(|p| &p.sku == sku)
            .cloned()
            .collect())
    }

    async fn upsert(&self, position: StoreInventory) -> Result<()> {
        let key = (position.store.clone(), position.sku.clone());
        self.positions.write().await.insert(key, position);
        Ok(())
    }
}
