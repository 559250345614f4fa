use common::Version;
use domain::DomainError;
use thiserror::Error;

/// Errors that can occur when interacting with a repository.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RepositoryError {
    /// The record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A record with this id is already stored.
    #[error("{entity} already exists: {id}")]
    AlreadyExists { entity: &'static str, id: String },

    /// The caller's version did not match the stored version.
    #[error("Concurrency conflict on {entity} {id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        entity: &'static str,
        id: String,
        expected: Version,
        actual: Version,
    },

    /// The mutation violates a domain rule.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

impl RepositoryError {
    pub(crate) fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        RepositoryError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns true for optimistic-concurrency conflicts.
    pub fn is_conflict(&self) -> bool {
        matches!(self, RepositoryError::ConcurrencyConflict { .. })
    }
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
