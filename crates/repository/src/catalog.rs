//! Catalog repository.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::SkuCode;
use domain::Sku;
use tokio::sync::RwLock;

use crate::Result;

/// Read access to SKU master data.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Looks up a SKU; `None` when the code is not in the catalog.
    async fn get_sku(&self, code: &SkuCode) -> Result<Option<Sku>>;

    /// Adds or corrects a SKU (administrative path).
    async fn upsert_sku(&self, sku: Sku) -> Result<()>;
}

/// In-memory catalog.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalogRepository {
    skus: Arc<RwLock<HashMap<SkuCode, Sku>>>,
}

impl InMemoryCatalogRepository {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of SKUs held.
    pub async fn len(&self) -> usize {
        self.skus.read().await.len()
    }
}

#[async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn get_sku(&self, code: &SkuCode) -> Result<Option<Sku>> {
        Ok(self.skus.read().await.get(code).cloned())
    }

    async fn upsert_sku(&self, sku: Sku) -> Result<()> {
        self.skus.write().await.insert(sku.code.clone(), sku);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup() {
        let catalog = InMemoryCatalogRepository::new();
        catalog
            .upsert_sku(Sku::new("SKU-5892", "Premium Widget XL", "Widgets"))
            .await
            .unwrap();

        let found = catalog.get_sku(&SkuCode::new("SKU-5892")).await.unwrap();
        assert_eq!(found.unwrap().description, "Premium Widget XL");
        assert!(catalog.get_sku(&SkuCode::new("SKU-0000")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_replaces() {
        let catalog = InMemoryCatalogRepository::new();
        catalog.upsert_sku(Sku::new("SKU-1", "Old", "Misc")).await.unwrap();
        catalog
            .upsert_sku(Sku::new("SKU-1", "Old", "Misc").with_flow_eligible(false))
            .await
            .unwrap();

        assert_eq!(catalog.len().await, 1);
        let sku = catalog.get_sku(&SkuCode::new("SKU-1")).await.unwrap().unwrap();
        assert!(!sku.flow_eligible);
    }
}
