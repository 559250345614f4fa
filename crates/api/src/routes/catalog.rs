//! Master data: SKUs, store demand, inventory positions and capacity.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use domain::{CapacityConstraint, CapacityKind, ScopeKey, Sku, StoreDemand, StoreInventory};
use repository::{CapacityRepository, CatalogRepository, DemandRepository, InventoryRepository};
use serde::Deserialize;

use super::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CreateDemandRequest {
    pub id: String,
    pub sku: String,
    pub store: String,
    pub quantity: u32,
    pub due_date: DateTime<Utc>,
    pub priority_level: u8,
}

#[derive(Deserialize)]
pub struct CreateCapacityRequest {
    pub id: String,
    pub location: String,
    pub kind: CapacityKind,
    pub limit: u32,
}

/// POST /skus: add or replace a catalog entry.
#[tracing::instrument(skip(state, sku), fields(sku = %sku.code))]
pub async fn upsert_sku(
    State(state): State<Arc<AppState>>,
    Json(sku): Json<Sku>,
) -> Result<(StatusCode, Json<Sku>), ApiError> {
    state
        .dock
        .repositories()
        .catalog
        .upsert_sku(sku.clone())
        .await?;
    Ok((StatusCode::CREATED, Json(sku)))
}

/// POST /demands: record an open store demand. Reposting an existing id is
/// a conflict.
#[tracing::instrument(skip(state, req), fields(demand_id = %req.id))]
pub async fn create_demand(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateDemandRequest>,
) -> Result<(StatusCode, Json<StoreDemand>), ApiError> {
    if req.quantity == 0 {
        return Err(ApiError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let demand = StoreDemand::new(
        req.id,
        req.sku,
        req.store,
        req.quantity,
        req.due_date,
        req.priority_level,
    );
    state
        .dock
        .repositories()
        .demands
        .create(demand.clone())
        .await?;
    Ok((StatusCode::CREATED, Json(demand)))
}

/// POST /inventory: record a store's on-hand position for a SKU.
#[tracing::instrument(skip(state, position), fields(store = %position.store, sku = %position.sku))]
pub async fn upsert_inventory(
    State(state): State<Arc<AppState>>,
    Json(position): Json<StoreInventory>,
) -> Result<StatusCode, ApiError> {
    state
        .dock
        .repositories()
        .inventory
        .upsert(position)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /capacity: configure a storage area or outbound lane limit.
#[tracing::instrument(skip(state, req), fields(location = %req.location))]
pub async fn register_capacity(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateCapacityRequest>,
) -> Result<(StatusCode, Json<CapacityConstraint>), ApiError> {
    let constraint = CapacityConstraint::new(
        req.id,
        ScopeKey::new(req.location, req.kind),
        req.limit,
    );
    state
        .dock
        .repositories()
        .capacity
        .register(constraint.clone())
        .await?;
    Ok((StatusCode::CREATED, Json(constraint)))
}
