//! Store demand repository.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{DemandId, SkuCode, Version};
use domain::StoreDemand;
use tokio::sync::RwLock;

use crate::{RepositoryError, Result};

/// Access to open store orders.
///
/// Fills are applied atomically per demand: a fill either lands completely
/// and bumps the version, or fails without effect.
#[async_trait]
pub trait DemandRepository: Send + Sync {
    /// Open demands for a SKU, ranked by priority, due date, then id.
    async fn open_demands_for(&self, sku: &SkuCode) -> Result<Vec<StoreDemand>>;

    /// Loads one demand.
    async fn get(&self, id: &DemandId) -> Result<Option<StoreDemand>>;

    /// Adds filled units.
    ///
    /// With `expected` set, fails with `ConcurrencyConflict` if the demand
    /// changed since the caller read it.
    async fn apply_fill(
        &self,
        id: &DemandId,
        quantity: u32,
        expected: Option<Version>,
    ) -> Result<StoreDemand>;

    /// Removes filled units (rollback or reversal).
    async fn revert_fill(&self, id: &DemandId, quantity: u32) -> Result<StoreDemand>;

    /// Registers a new demand; fails with `AlreadyExists` if the id is
    /// taken, so fills already applied are never reset.
    async fn create(&self, demand: StoreDemand) -> Result<()>;
}

/// In-memory demand registry.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDemandRepository {
    demands: Arc<RwLock<HashMap<DemandId, StoreDemand>>>,
}

impl InMemoryDemandRepository {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DemandRepository for InMemoryDemandRepository {
    async fn open_demands_for(&self, sku: &SkuCode) -> Result<Vec<StoreDemand>> {
        let demands = self.demands.read().await;
        let mut open: Vec<_> = demands
            .values()
            .filter(|d| &d.sku == sku && d.is_open())
            .cloned()
            .collect();
        open.sort_by(StoreDemand::rank_cmp);
        Ok(open)
    }

    async fn get(&self, id: &DemandId) -> Result<Option<StoreDemand>> {
        Ok(self.demands.read().await.get(id).cloned())
    }

    async fn apply_fill(
        &self,
        id: &DemandId,
        quantity: u32,
        expected: Option<Version>,
    ) -> Result<StoreDemand> {
        let mut demands = self.demands.write().await;
        let demand = demands
            .get_mut(id)
            .ok_or_else(|| RepositoryError::not_found("demand", id))?;

        if let Some(expected) = expected
            && demand.version != expected
        {
            return Err(RepositoryError::ConcurrencyConflict {
                entity: "demand",
                id: id.to_string(),
                expected,
                actual: demand.version,
            });
        }

        demand.fill(quantity)?;
        Ok(demand.clone())
    }

    async fn revert_fill(&self, id: &DemandId, quantity: u32) -> Result<StoreDemand> {
        let mut demands = self.demands.write().await;
        let demand = demands
            .get_mut(id)
            .ok_or_else(|| RepositoryError::not_found("demand", id))?;
        demand.revert_fill(quantity)?;
        Ok(demand.clone())
    }

    async fn create(&self, demand: StoreDemand) -> Result<()> {
        let mut demands = self.demands.write().await;
        if demands.contains_key(&demand.id) {
            return Err(RepositoryError::AlreadyExists {
                entity: "demand",
                id: demand.id.to_string(),
            });
        }
        demands.insert(demand.id.clone(), demand);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use domain::{DemandStatus, DomainError};

    async fn seeded() -> InMemoryDemandRepository {
        let repo = InMemoryDemandRepository::new();
        let now = Utc::now();
        for (id, sku, priority, days) in [
            ("ORD-3", "SKU-1", 2, 1),
            ("ORD-1", "SKU-1", 1, 4),
            ("ORD-2", "SKU-2", 1, 1),
        ] {
            repo.create(StoreDemand::new(
                id,
                sku,
                "ST-101",
                10,
                now + Duration::days(days),
                priority,
            ))
            .await
            .unwrap();
        }
        repo
    }

    #[tokio::test]
    async fn test_open_demands_ranked_by_priority() {
        let repo = seeded().await;
        let open = repo.open_demands_for(&SkuCode::new("SKU-1")).await.unwrap();
        let ids: Vec<_> = open.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["ORD-1", "ORD-3"]);
    }

    #[tokio::test]
    async fn test_filled_demand_leaves_open_set() {
        let repo = seeded().await;
        let id = DemandId::new("ORD-1");
        let filled = repo.apply_fill(&id, 10, None).await.unwrap();
        assert_eq!(filled.status, DemandStatus::Filled);

        let open = repo.open_demands_for(&SkuCode::new("SKU-1")).await.unwrap();
        assert_eq!(open.len(), 1);
    }

    #[tokio::test]
    async fn test_stale_version_conflicts() {
        let repo = seeded().await;
        let id = DemandId::new("ORD-1");
        repo.apply_fill(&id, 2, Some(Version::initial())).await.unwrap();

        let err = repo
            .apply_fill(&id, 2, Some(Version::initial()))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(repo.get(&id).await.unwrap().unwrap().quantity_filled, 2);
    }

    #[tokio::test]
    async fn test_overfill_is_domain_error() {
        let repo = seeded().await;
        let err = repo
            .apply_fill(&DemandId::new("ORD-1"), 11, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::Domain(DomainError::Overfill { .. })
        ));
    }

    #[tokio::test]
    async fn test_create_keeps_existing_fill() {
        let repo = seeded().await;
        let id = DemandId::new("ORD-1");
        repo.apply_fill(&id, 10, None).await.unwrap();

        let err = repo
            .create(StoreDemand::new("ORD-1", "SKU-1", "ST-101", 10, Utc::now(), 1))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::AlreadyExists { entity: "demand", .. }));

        let stored = repo.get(&id).await.unwrap().unwrap();
        assert_eq!(stored.quantity_filled, 10);
        assert_eq!(stored.status, DemandStatus::Filled);
    }

    #[tokio::test]
    async fn test_missing_demand() {
        let repo = seeded().await;
        let err = repo
            .revert_fill(&DemandId::new("ORD-404"), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }
}
