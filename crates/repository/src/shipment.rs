//! Shipment repository.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{ShipmentId, StoreId};
use domain::{Shipment, ShipmentStatus, StoreAssignment};
use tokio::sync::RwLock;

use crate::{RepositoryError, Result};

/// Storage for outbound shipments.
///
/// Every mutation runs the shipment's own state machine under the
/// repository lock, so a rejected transition leaves the record unchanged.
#[async_trait]
pub trait ShipmentRepository: Send + Sync {
    /// Stores a new shipment.
    async fn insert(&self, shipment: Shipment) -> Result<()>;

    /// Loads one shipment.
    async fn get(&self, id: &ShipmentId) -> Result<Option<Shipment>>;

    /// Earliest non-departed shipment whose route serves the store.
    async fn open_for_store(&self, store: &StoreId) -> Result<Option<Shipment>>;

    /// Adds a store assignment.
    async fn append_assignment(
        &self,
        id: &ShipmentId,
        assignment: StoreAssignment,
    ) -> Result<Shipment>;

    /// Moves the shipment forward to `next`.
    async fn advance_status(
        &self,
        id: &ShipmentId,
        next: ShipmentStatus,
        at: DateTime<Utc>,
    ) -> Result<Shipment>;

    /// Records scanned items for one store.
    async fn record_scan(&self, id: &ShipmentId, store: &StoreId, count: u32) -> Result<Shipment>;
}

/// In-memory shipment board.
#[derive(Debug, Clone, Default)]
pub struct InMemoryShipmentRepository {
    shipments: Arc<RwLock<HashMap<ShipmentId, Shipment>>>,
}

impl InMemoryShipmentRepository {
    /// Creates an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    async fn mutate<F>(&self, id: &ShipmentId, f: F) -> Result<Shipment>
    where
        F: FnOnce(&mut Shipment) -> std::result::Result<(), domain::DomainError> + Send,
    {
        let mut shipments = self.shipments.write().await;
        let shipment = shipments
            .get_mut(id)
            .ok_or_else(|| RepositoryError::not_found("shipment", id))?;

        // Work on a copy so a failed transition leaves the stored record intact.
        let mut updated = shipment.clone();
        f(&mut updated)?;
        *shipment = updated.clone();
        Ok(updated)
    }
}

#[async_trait]
impl ShipmentRepository for InMemoryShipmentRepository {
    async fn insert(&self, shipment: Shipment) -> Result<()> {
        let mut shipments = self.shipments.write().await;
        if shipments.contains_key(&shipment.id) {
            return Err(RepositoryError::AlreadyExists {
                entity: "shipment",
                id: shipment.id.to_string(),
            });
        }
        shipments.insert(shipment.id.clone(), shipment);
        Ok(())
    }

    async fn get(&self, id: &ShipmentId) -> Result<Option<Shipment>> {
        Ok(self.shipments.read().await.get(id).cloned())
    }

    async fn open_for_store(&self, store: &StoreId) -> Result<Option<Shipment>> {
        let shipments = self.shipments.read().await;
        Ok(shipments
            .values()
            .filter(|s| s.status.accepts_assignments() && s.serves(store))
            .min_by(|a, b| {
                a.scheduled_departure
                    .cmp(&b.scheduled_departure)
                    .then_with(|| a.id.cmp(&b.id))
            })
            .cloned())
    }

    async fn append_assignment(
        &self,
        id: &ShipmentId,
        assignment: StoreAssignment,
    ) -> Result<Shipment> {
        self.mutate(id, move |s| s.assign(assignment)).await
    }

    async fn advance_status(
        &self,
        id: &ShipmentId,
        next: ShipmentStatus,
        at: DateTime<Utc>,
    ) -> Result<Shipment> {
        self.mutate(id, move |s| s.advance_to(next, at)).await
    }

    async fn record_scan(&self, id: &ShipmentId, store: &StoreId, count: u32) -> Result<Shipment> {
        let store = store.clone();
        self.mutate(id, move |s| s.record_scan(&store, count)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use domain::DomainError;

    fn truck(id: &str, hours: i64) -> Shipment {
        Shipment::scheduled(
            id,
            "North Loop",
            Utc::now() + Duration::hours(hours),
            120,
            vec![StoreId::new("ST-103"), StoreId::new("ST-108")],
        )
    }

    #[tokio::test]
    async fn test_open_for_store_prefers_earliest() {
        let repo = InMemoryShipmentRepository::new();
        repo.insert(truck("TRK-2", 8)).await.unwrap();
        repo.insert(truck("TRK-1", 2)).await.unwrap();

        let found = repo
            .open_for_store(&StoreId::new("ST-108"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id.as_str(), "TRK-1");
        assert!(repo
            .open_for_store(&StoreId::new("ST-999"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_departed_shipment_not_offered() {
        let repo = InMemoryShipmentRepository::new();
        let id = ShipmentId::new("TRK-1");
        let store = StoreId::new("ST-103");
        repo.insert(truck("TRK-1", 1)).await.unwrap();
        repo.append_assignment(&id, StoreAssignment::new("ST-103", 2, 0, 0))
            .await
            .unwrap();
        repo.advance_status(&id, ShipmentStatus::Loading, Utc::now())
            .await
            .unwrap();
        repo.record_scan(&id, &store, 2).await.unwrap();
        repo.advance_status(&id, ShipmentStatus::Departed, Utc::now())
            .await
            .unwrap();

        assert!(repo.open_for_store(&store).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_transition_leaves_record() {
        let repo = InMemoryShipmentRepository::new();
        let id = ShipmentId::new("TRK-3821");
        repo.insert(truck("TRK-3821", 1)).await.unwrap();
        repo.append_assignment(&id, StoreAssignment::new("ST-103", 36, 0, 0))
            .await
            .unwrap();
        repo.append_assignment(&id, StoreAssignment::new("ST-108", 42, 0, 0))
            .await
            .unwrap();
        repo.advance_status(&id, ShipmentStatus::Loading, Utc::now())
            .await
            .unwrap();
        repo.record_scan(&id, &StoreId::new("ST-103"), 36).await.unwrap();

        let err = repo
            .advance_status(&id, ShipmentStatus::Departed, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::Domain(DomainError::IncompleteLoad { scanned: 36, total: 78, .. })
        ));

        let stored = repo.get(&id).await.unwrap().unwrap();
        assert_eq!(stored.status, ShipmentStatus::Loading);
        assert!(stored.departed_at.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_insert() {
        let repo = InMemoryShipmentRepository::new();
        repo.insert(truck("TRK-1", 1)).await.unwrap();
        assert!(matches!(
            repo.insert(truck("TRK-1", 1)).await,
            Err(RepositoryError::AlreadyExists { .. })
        ));
    }
}
