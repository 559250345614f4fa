//! Inbound lot repository.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::LotId;
use domain::{InboundLot, LotStatus};
use tokio::sync::RwLock;

use crate::{RepositoryError, Result};

/// Storage for inbound lots.
#[async_trait]
pub trait LotRepository: Send + Sync {
    /// Loads one lot.
    async fn get(&self, id: &LotId) -> Result<Option<InboundLot>>;

    /// Inserts a new lot; fails with `AlreadyExists` if the id is taken.
    async fn create(&self, lot: InboundLot) -> Result<()>;

    /// Inserts or replaces a lot.
    async fn save(&self, lot: InboundLot) -> Result<()>;

    /// Moves a lot from `expected` to `next` in one step. Fails without
    /// change if another caller moved it first.
    async fn try_transition(
        &self,
        id: &LotId,
        expected: LotStatus,
        next: LotStatus,
    ) -> Result<InboundLot>;

    /// Lots in a given status, ordered by id.
    async fn list_by_status(&self, status: LotStatus) -> Result<Vec<InboundLot>>;
}

/// In-memory lot store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLotRepository {
    lots: Arc<RwLock<HashMap<LotId, InboundLot>>>,
}

impl InMemoryLotRepository {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LotRepository for InMemoryLotRepository {
    async fn get(&self, id: &LotId) -> Result<Option<InboundLot>> {
        Ok(self.lots.read().await.get(id).cloned())
    }

    async fn create(&self, lot: InboundLot) -> Result<()> {
        let mut lots = self.lots.write().await;
        if lots.contains_key(&lot.id) {
            return Err(RepositoryError::AlreadyExists {
                entity: "lot",
                id: lot.id.to_string(),
            });
        }
        lots.insert(lot.id.clone(), lot);
        Ok(())
    }

    async fn save(&self, lot: InboundLot) -> Result<()> {
        self.lots.write().await.insert(lot.id.clone(), lot);
        Ok(())
    }

    async fn try_transition(
        &self,
        id: &LotId,
        expected: LotStatus,
        next: LotStatus,
    ) -> Result<InboundLot> {
        let mut lots = self.lots.write().await;
        let lot = lots
            .get_mut(id)
            .ok_or_else(|| RepositoryError::not_found("lot", id))?;
        lot.move_to(expected, next)?;
        Ok(lot.clone())
    }

    async fn list_by_status(&self, status: LotStatus) -> Result<Vec<InboundLot>> {
        let lots = self.lots.read().await;
        let mut matching: Vec<_> = lots.values().filter(|l| l.status == status).cloned().collect();
        matching.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matching)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::DomainError;

    #[tokio::test]
    async fn test_save_and_list() {
        let repo = InMemoryLotRepository::new();
        repo.save(InboundLot::arrived("LOT-2", "SKU-1", 24, "DOCK-1", Utc::now()))
            .await
            .unwrap();
        repo.save(InboundLot::arrived("LOT-1", "SKU-1", 12, "DOCK-1", Utc::now()))
            .await
            .unwrap();
        repo.save(InboundLot::scheduled("LOT-3", "SKU-2", 6, "DOCK-2"))
            .await
            .unwrap();

        let arrived = repo.list_by_status(LotStatus::Arrived).await.unwrap();
        let ids: Vec<_> = arrived.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["LOT-1", "LOT-2"]);
    }

    #[tokio::test]
    async fn test_save_replaces() {
        let repo = InMemoryLotRepository::new();
        let mut lot = InboundLot::arrived("LOT-1", "SKU-1", 24, "DOCK-1", Utc::now());
        repo.save(lot.clone()).await.unwrap();

        lot.begin_processing().unwrap();
        repo.save(lot).await.unwrap();

        let stored = repo.get(&LotId::new("LOT-1")).await.unwrap().unwrap();
        assert_eq!(stored.status, LotStatus::Processing);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_id() {
        let repo = InMemoryLotRepository::new();
        repo.create(InboundLot::arrived("LOT-1", "SKU-1", 24, "DOCK-1", Utc::now()))
            .await
            .unwrap();

        let err = repo
            .create(InboundLot::arrived("LOT-1", "SKU-1", 6, "DOCK-2", Utc::now()))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::AlreadyExists { entity: "lot", .. }));
        let stored = repo.get(&LotId::new("LOT-1")).await.unwrap().unwrap();
        assert_eq!(stored.quantity, 24);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_only_one_caller_claims_a_lot() {
        let repo = InMemoryLotRepository::new();
        repo.create(InboundLot::arrived("LOT-1", "SKU-1", 24, "DOCK-1", Utc::now()))
            .await
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let repo = repo.clone();
                tokio::spawn(async move {
                    repo.try_transition(
                        &LotId::new("LOT-1"),
                        LotStatus::Arrived,
                        LotStatus::Processing,
                    )
                    .await
                })
            })
            .collect();

        let mut claimed = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(lot) => {
                    assert_eq!(lot.status, LotStatus::Processing);
                    claimed += 1;
                }
                Err(RepositoryError::Domain(DomainError::InvalidStateTransition { .. })) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(claimed, 1);
    }

    #[tokio::test]
    async fn test_transition_missing_lot() {
        let repo = InMemoryLotRepository::new();
        let err = repo
            .try_transition(&LotId::new("LOT-404"), LotStatus::Arrived, LotStatus::Processing)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }
}
