//! Receiving, allocation runs and the decision journal.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::Utc;
use common::{DecisionId, LotId};
use domain::{AllocationDecision, AllocationPlan, InboundLot};
use engine::{CancellationToken, FlowSummary, ReceiptInspection, ReceiptOutcome};
use repository::LotRepository;
use serde::Deserialize;
use tracing::Instrument;

use super::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct ReverseRequest {
    pub reason: String,
}

/// POST /receipts: record an arriving lot and raise any discrepancies.
#[tracing::instrument(skip(state, inspection), fields(lot_id = %inspection.lot_id))]
pub async fn receive(
    State(state): State<Arc<AppState>>,
    Json(inspection): Json<ReceiptInspection>,
) -> Result<(StatusCode, Json<ReceiptOutcome>), ApiError> {
    let outcome = state.dock.receive(inspection).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// GET /lots/{id}
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<InboundLot>, ApiError> {
    let lot = state
        .dock
        .repositories()
        .lots
        .get(&LotId::new(id.as_str()))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Lot {id} not found")))?;
    Ok(Json(lot))
}

/// POST /lots/{id}/allocate: evaluate and allocate an arrived lot.
///
/// The run happens on its own task, so a client that disconnects never
/// leaves reservations or the lot half-processed.
#[tracing::instrument(skip(state))]
pub async fn allocate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<AllocationPlan>, ApiError> {
    let lot_id = LotId::new(id);
    let cancel = CancellationToken::new();
    {
        let mut in_flight = state.in_flight.lock().await;
        if in_flight.contains_key(&lot_id) {
            return Err(ApiError::Conflict(format!(
                "Allocation already running for lot {lot_id}"
            )));
        }
        in_flight.insert(lot_id.clone(), cancel.clone());
    }

    let run = tokio::spawn(
        async move {
            let result = state.dock.process_lot(&lot_id, Utc::now(), &cancel).await;
            state.in_flight.lock().await.remove(&lot_id);
            result
        }
        .in_current_span(),
    );

    let plan = run
        .await
        .map_err(|e| ApiError::Internal(format!("Allocation task failed: {e}")))??;
    Ok(Json(plan))
}

/// POST /lots/{id}/cancel: abort a running allocation.
#[tracing::instrument(skip(state))]
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let in_flight = state.in_flight.lock().await;
    let token = in_flight
        .get(&LotId::new(id.as_str()))
        .ok_or_else(|| ApiError::NotFound(format!("No allocation running for lot {id}")))?;
    token.cancel();
    Ok(StatusCode::ACCEPTED)
}

/// GET /lots/{id}/decisions
#[tracing::instrument(skip(state))]
pub async fn decisions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<AllocationDecision>>, ApiError> {
    let decisions = state.dock.decisions_for(&LotId::new(id)).await?;
    Ok(Json(decisions))
}

/// POST /decisions/{id}/reverse
#[tracing::instrument(skip(state, req))]
pub async fn reverse(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ReverseRequest>,
) -> Result<Json<AllocationDecision>, ApiError> {
    let decision_id = parse_decision_id(&id)?;
    let reversal = state
        .dock
        .reverse_decision(&decision_id, &req.reason)
        .await?;
    Ok(Json(reversal))
}

/// GET /summary: flow-through share across every journaled decision.
#[tracing::instrument(skip(state))]
pub async fn summary(State(state): State<Arc<AppState>>) -> Result<Json<FlowSummary>, ApiError> {
    Ok(Json(state.dock.flow_summary().await?))
}

fn parse_decision_id(id: &str) -> Result<DecisionId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid decision ID format: {e}")))?;
    Ok(DecisionId::from_uuid(uuid))
}
