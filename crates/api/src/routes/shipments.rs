//! Outbound shipments: scheduling, loading scans and departure.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{ShipmentId, StoreId};
use domain::{LoadProgress, Shipment, Utilization};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CreateShipmentRequest {
    pub id: String,
    pub route: String,
    pub scheduled_departure: DateTime<Utc>,
    pub capacity_units: u32,
    pub stops: Vec<String>,
}

#[derive(Deserialize)]
pub struct ScanRequest {
    pub store: String,
    pub count: u32,
}

#[derive(Serialize)]
pub struct ShipmentResponse {
    #[serde(flatten)]
    pub shipment: Shipment,
    pub progress: LoadProgress,
    pub utilization: Utilization,
}

impl From<Shipment> for ShipmentResponse {
    fn from(shipment: Shipment) -> Self {
        Self {
            progress: shipment.progress(),
            utilization: shipment.utilization(),
            shipment,
        }
    }
}

/// POST /shipments: schedule a truck on a route.
#[tracing::instrument(skip(state, req), fields(shipment_id = %req.id))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateShipmentRequest>,
) -> Result<(StatusCode, Json<ShipmentResponse>), ApiError> {
    let shipment = Shipment::scheduled(
        req.id,
        req.route,
        req.scheduled_departure,
        req.capacity_units,
        req.stops.into_iter().map(StoreId::new).collect(),
    );
    let loader = state.dock.loader();
    loader.schedule(shipment.clone()).await?;
    Ok((StatusCode::CREATED, Json(shipment.into())))
}

/// GET /shipments/{id}
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ShipmentResponse>, ApiError> {
    let shipment = state.dock.loader().get(&ShipmentId::new(id)).await?;
    Ok(Json(shipment.into()))
}

/// POST /shipments/{id}/loading
#[tracing::instrument(skip(state))]
pub async fn start_loading(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ShipmentResponse>, ApiError> {
    let shipment = state
        .dock
        .loader()
        .start_loading(&ShipmentId::new(id))
        .await?;
    Ok(Json(shipment.into()))
}

/// POST /shipments/{id}/scan
#[tracing::instrument(skip(state, req), fields(store = %req.store, count = req.count))]
pub async fn scan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ScanRequest>,
) -> Result<Json<LoadProgress>, ApiError> {
    let progress = state
        .dock
        .loader()
        .scan(&ShipmentId::new(id), &StoreId::new(req.store), req.count)
        .await?;
    Ok(Json(progress))
}

/// POST /shipments/{id}/depart: refused until every unit is scanned.
#[tracing::instrument(skip(state))]
pub async fn depart(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ShipmentResponse>, ApiError> {
    let shipment = state.dock.loader().depart(&ShipmentId::new(id)).await?;
    Ok(Json(shipment.into()))
}
