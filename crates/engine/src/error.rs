//! Engine error types.

use common::{DecisionId, ExceptionId, LotId, SkuCode};
use domain::{DomainError, RuleConfigurationError};
use repository::RepositoryError;
use thiserror::Error;

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A rule threshold is outside its valid domain.
    #[error(transparent)]
    RuleConfiguration(#[from] RuleConfigurationError),

    /// The lot's SKU is not in the catalog.
    #[error("SKU {sku} is not in the catalog")]
    MissingCatalogData { sku: SkuCode },

    /// A reservation could not fit under the scope's limit.
    #[error("Capacity exceeded on {scope}: requested {requested}, available {available}")]
    CapacityExceeded {
        scope: String,
        requested: u32,
        available: u32,
    },

    /// Version conflicts persisted through every retry.
    #[error("Allocation conflict on {scope} after {attempts} attempts")]
    AllocationConflict { scope: String, attempts: u32 },

    /// The reservation did not complete in time.
    #[error("Reservation on {scope} timed out after {timeout_ms} ms")]
    ReservationTimeout { scope: String, timeout_ms: u64 },

    /// The allocation was aborted by the operator.
    #[error("Allocation of lot {lot} was cancelled")]
    Cancelled { lot: LotId },

    /// Lot does not exist.
    #[error("Lot not found: {0}")]
    LotNotFound(LotId),

    /// Lot is blocked by an open exception.
    #[error("Lot {lot} is on hold pending exception {exception}")]
    LotOnHold { lot: LotId, exception: ExceptionId },

    /// Decision does not exist.
    #[error("Decision not found: {0}")]
    DecisionNotFound(DecisionId),

    /// Decision has already been reversed.
    #[error("Decision {0} has already been reversed")]
    DecisionAlreadyReversed(DecisionId),

    /// Decision kind cannot be reversed.
    #[error("Decision {id} cannot be reversed: {reason}")]
    NotReversible { id: DecisionId, reason: &'static str },

    /// Exception does not exist.
    #[error("Exception not found: {0}")]
    ExceptionNotFound(ExceptionId),

    /// Repository error.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Domain error.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

impl EngineError {
    /// Returns true when the error reflects contention on a capacity scope
    /// rather than a data problem.
    pub fn is_contention(&self) -> bool {
        matches!(
            self,
            EngineError::AllocationConflict { .. } | EngineError::ReservationTimeout { .. }
        )
    }
}

/// Convenience type alias for engine results.
pub type Result<T> = std::result::Result<T, EngineError>;
