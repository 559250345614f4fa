//! Exception queue and resolution.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use common::ExceptionId;
use domain::{ExceptionRecord, ExceptionStatus};
use serde::Deserialize;

use super::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct ListQuery {
    /// `open` or `resolved`; every record when absent.
    pub status: Option<String>,

    /// Free-text search over id, kind, references and description.
    pub q: Option<String>,
}

#[derive(Deserialize)]
pub struct ResolveRequest {
    pub resolver: String,
    pub note: String,
}

/// GET /exceptions: the queue in display order.
#[tracing::instrument(skip(state, query))]
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ExceptionRecord>>, ApiError> {
    let status = query.status.as_deref().map(parse_status).transpose()?;
    let manager = state.dock.exceptions();

    let records = match query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        Some(text) => manager
            .search(text)
            .await?
            .into_iter()
            .filter(|r| status.is_none_or(|s| r.status == s))
            .collect(),
        None => manager.queue(status).await?,
    };
    Ok(Json(records))
}

/// GET /exceptions/{id}
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ExceptionRecord>, ApiError> {
    let record = state
        .dock
        .exceptions()
        .get(&ExceptionId::new(id.as_str()))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Exception {id} not found")))?;
    Ok(Json(record))
}

/// POST /exceptions/{id}/resolve
#[tracing::instrument(skip(state, req), fields(resolver = %req.resolver))]
pub async fn resolve(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ResolveRequest>,
) -> Result<Json<ExceptionRecord>, ApiError> {
    let record = state
        .dock
        .exceptions()
        .resolve(&ExceptionId::new(id), &req.resolver, &req.note)
        .await?;
    Ok(Json(record))
}

fn parse_status(raw: &str) -> Result<ExceptionStatus, ApiError> {
    match raw.to_ascii_lowercase().as_str() {
        "open" => Ok(ExceptionStatus::Open),
        "resolved" => Ok(ExceptionStatus::Resolved),
        other => Err(ApiError::BadRequest(format!(
            "Unknown exception status: {other}"
        ))),
    }
}
