//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use common::{LotId, StoreId};
use domain::{CapacityConstraint, ScopeKey, Shipment, Sku, StoreDemand};
use engine::{CrossDock, EngineConfig, ReceiptInspection, Repositories};
use repository::{CapacityRepository, CatalogRepository, DemandRepository, InMemoryRepositories};

pub const SKU: &str = "SKU-5892";
pub const STORE: &str = "ST-103";
pub const STORAGE: &str = "STORAGE-MAIN";

pub struct Harness {
    pub repos: InMemoryRepositories,
    pub dock: CrossDock,
}

impl Harness {
    /// Empty repositories with the default engine configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let repos = InMemoryRepositories::new();
        let dock = CrossDock::new(Repositories::from(&repos), config).unwrap();
        Self { repos, dock }
    }

    /// Engine over custom repository handles; `repos` stays reachable for
    /// setup and assertions.
    pub fn from_parts(repos: InMemoryRepositories, handles: Repositories) -> Self {
        let dock = CrossDock::new(handles, EngineConfig::default()).unwrap();
        Self { repos, dock }
    }

    /// Catalog entry, outbound lane for `STORE` and a storage area.
    pub async fn standard(lane_limit: u32, storage_limit: u32) -> Self {
        let harness = Self::new();
        harness.seed_standard(lane_limit, storage_limit).await;
        harness
    }

    pub async fn seed_standard(&self, lane_limit: u32, storage_limit: u32) {
        self.add_sku(Sku::new(SKU, "Premium Widget XL", "Widgets")).await;
        self.add_lane(STORE, lane_limit).await;
        self.add_storage(storage_limit).await;
    }

    pub async fn add_sku(&self, sku: Sku) {
        self.repos.catalog.upsert_sku(sku).await.unwrap();
    }

    pub async fn add_lane(&self, store: &str, limit: u32) {
        self.repos
            .capacity
            .register(CapacityConstraint::new(
                format!("CAP-{store}"),
                lane(store),
                limit,
            ))
            .await
            .unwrap();
    }

    pub async fn add_storage(&self, limit: u32) {
        self.repos
            .capacity
            .register(CapacityConstraint::new("CAP-STORAGE", storage(), limit))
            .await
            .unwrap();
    }

    pub async fn add_demand(&self, id: &str, store: &str, qty: u32, due_in_days: i64, priority: u8) {
        self.repos
            .demands
            .create(StoreDemand::new(
                id,
                SKU,
                store,
                qty,
                Utc::now() + ChronoDuration::days(due_in_days),
                priority,
            ))
            .await
            .unwrap();
    }

    pub async fn add_shipment(&self, id: &str, stores: &[&str]) {
        self.dock
            .loader()
            .schedule(Shipment::scheduled(
                id,
                "North Loop",
                Utc::now() + ChronoDuration::hours(6),
                120,
                stores.iter().map(|s| StoreId::new(*s)).collect(),
            ))
            .await
            .unwrap();
    }

    /// Receives a clean lot of `SKU`.
    pub async fn receive(&self, lot_id: &str, qty: u32) -> LotId {
        self.dock
            .receive(ReceiptInspection::clean(lot_id, SKU, qty, "DOCK-1"))
            .await
            .unwrap()
            .lot
            .id
    }

    pub async fn lane_reserved(&self, store: &str) -> u32 {
        self.repos.capacity.reserved(&lane(store)).await
    }

    pub async fn storage_reserved(&self) -> u32 {
        self.repos.capacity.reserved(&storage()).await
    }

    pub async fn filled(&self, demand: &str) -> u32 {
        self.repos
            .demands
            .get(&demand.into())
            .await
            .unwrap()
            .unwrap()
            .quantity_filled
    }
}

pub fn lane(store: &str) -> ScopeKey {
    ScopeKey::outbound_lane(&StoreId::new(store))
}

pub fn storage() -> ScopeKey {
    ScopeKey::storage(STORAGE)
}

pub fn fast_config() -> EngineConfig {
    EngineConfig {
        reservation_timeout: Duration::from_millis(1000),
        ..EngineConfig::default()
    }
}
