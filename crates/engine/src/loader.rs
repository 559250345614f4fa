//! Shipment loader: assignments, scan progress and departure.

use std::sync::Arc;

use chrono::Utc;
use common::{ShipmentId, StoreId};
use domain::{LoadProgress, Shipment, ShipmentStatus, Sku, StoreAssignment, Utilization};
use repository::{RepositoryError, ShipmentRepository};
use tracing::{info, warn};

use crate::error::Result;

/// Drives shipments through `Scheduled -> Loading -> Departed`.
#[derive(Clone)]
pub struct ShipmentLoader {
    repo: Arc<dyn ShipmentRepository>,
}

impl ShipmentLoader {
    /// Creates a loader over a shipment repository.
    pub fn new(repo: Arc<dyn ShipmentRepository>) -> Self {
        Self { repo }
    }

    /// Registers a scheduled shipment.
    pub async fn schedule(&self, shipment: Shipment) -> Result<()> {
        info!(shipment_id = %shipment.id, route = %shipment.route, "shipment scheduled");
        self.repo.insert(shipment).await?;
        Ok(())
    }

    /// Loads a shipment or fails with `NotFound`.
    pub async fn get(&self, id: &ShipmentId) -> Result<Shipment> {
        Ok(self
            .repo
            .get(id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "shipment",
                id: id.to_string(),
            })?)
    }

    /// Adds a store assignment to a shipment.
    #[tracing::instrument(skip(self, assignment), fields(store = %assignment.store, quantity = assignment.quantity))]
    pub async fn assign(&self, id: &ShipmentId, assignment: StoreAssignment) -> Result<Shipment> {
        Ok(self.repo.append_assignment(id, assignment).await?)
    }

    /// Places flow-through units for a store on the earliest open shipment
    /// serving it. Returns `None` when no shipment serves the store.
    #[tracing::instrument(skip(self, sku), fields(sku = %sku.code))]
    pub async fn dispatch(
        &self,
        store: &StoreId,
        quantity: u32,
        sku: &Sku,
    ) -> Result<Option<ShipmentId>> {
        let Some(shipment) = self.repo.open_for_store(store).await? else {
            warn!("no open shipment serves this store; decision stands unassigned");
            return Ok(None);
        };

        let assignment = StoreAssignment::new(
            store.clone(),
            quantity,
            sku.weight_g_for(quantity),
            sku.volume_cm3_for(quantity),
        );
        self.repo.append_assignment(&shipment.id, assignment).await?;
        info!(shipment_id = %shipment.id, "flow-through units assigned to shipment");
        Ok(Some(shipment.id))
    }

    /// `Scheduled -> Loading`; requires at least one assignment.
    #[tracing::instrument(skip(self))]
    pub async fn start_loading(&self, id: &ShipmentId) -> Result<Shipment> {
        let shipment = self
            .repo
            .advance_status(id, ShipmentStatus::Loading, Utc::now())
            .await?;
        info!("shipment loading started");
        Ok(shipment)
    }

    /// Records scanned items for a store while loading.
    #[tracing::instrument(skip(self))]
    pub async fn scan(&self, id: &ShipmentId, store: &StoreId, count: u32) -> Result<LoadProgress> {
        let shipment = self.repo.record_scan(id, store, count).await?;
        Ok(shipment.progress())
    }

    /// `Loading -> Departed`; fails with `IncompleteLoad` until every
    /// assignment is fully scanned. A rejected departure changes nothing.
    #[tracing::instrument(skip(self))]
    pub async fn depart(&self, id: &ShipmentId) -> Result<Shipment> {
        let shipment = self
            .repo
            .advance_status(id, ShipmentStatus::Departed, Utc::now())
            .await?;

        metrics::counter!("shipments_departed_total").increment(1);
        info!(items = shipment.progress().total, "shipment departed");
        Ok(shipment)
    }

    /// Items scanned against items assigned.
    pub async fn progress(&self, id: &ShipmentId) -> Result<LoadProgress> {
        Ok(self.get(id).await?.progress())
    }

    /// Units, weight and volume derived from the assignments.
    pub async fn utilization(&self, id: &ShipmentId) -> Result<Utilization> {
        Ok(self.get(id).await?.utilization())
    }
}
