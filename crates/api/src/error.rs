//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;
use engine::EngineError;
use repository::RepositoryError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Request conflicts with work already in progress.
    Conflict(String),
    /// Engine operation failed.
    Engine(EngineError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Engine(err) => engine_error_to_response(err),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        if status.is_server_error() {
            tracing::error!(error = %message, "internal server error");
        }

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn engine_error_to_response(err: EngineError) -> (StatusCode, String) {
    let status = match &err {
        EngineError::LotNotFound(_)
        | EngineError::DecisionNotFound(_)
        | EngineError::ExceptionNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::MissingCatalogData { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::LotOnHold { .. }
        | EngineError::DecisionAlreadyReversed(_)
        | EngineError::NotReversible { .. }
        | EngineError::CapacityExceeded { .. }
        | EngineError::AllocationConflict { .. }
        | EngineError::Cancelled { .. } => StatusCode::CONFLICT,
        EngineError::ReservationTimeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
        EngineError::RuleConfiguration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::Repository(repo_err) => repository_status(repo_err),
        EngineError::Domain(domain_err) => domain_status(domain_err),
    };
    (status, err.to_string())
}

fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::NotFound { .. } => StatusCode::NOT_FOUND,
        RepositoryError::AlreadyExists { .. } | RepositoryError::ConcurrencyConflict { .. } => {
            StatusCode::CONFLICT
        }
        RepositoryError::Domain(domain_err) => domain_status(domain_err),
    }
}

fn domain_status(err: &DomainError) -> StatusCode {
    match err {
        DomainError::InvalidQuantity { .. }
        | DomainError::EmptyResolutionNote
        | DomainError::MissingResolver
        | DomainError::StoreNotOnRoute { .. }
        | DomainError::StoreNotAssigned { .. }
        | DomainError::ScanExceedsAssignment { .. }
        | DomainError::RuleConfiguration(_) => StatusCode::BAD_REQUEST,
        DomainError::InvalidStateTransition { .. }
        | DomainError::ExceptionAlreadyResolved(_)
        | DomainError::IncompleteLoad { .. }
        | DomainError::NoAssignments(_)
        | DomainError::Overfill { .. }
        | DomainError::CapacityExceeded { .. }
        | DomainError::LimitBelowReserved { .. }
        | DomainError::ShipmentOverCapacity { .. } => StatusCode::CONFLICT,
        DomainError::FillUnderflow { .. } | DomainError::ReleaseExceedsReserved { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError::Engine(err)
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        ApiError::Engine(err.into())
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Engine(err.into())
    }
}
