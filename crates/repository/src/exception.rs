//! Exception repository.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::ExceptionId;
use domain::{ExceptionRecord, ExceptionStatus, NewException};
use tokio::sync::RwLock;

use crate::{RepositoryError, Result};

/// Storage for exception records. Records are never deleted.
#[async_trait]
pub trait ExceptionRepository: Send + Sync {
    /// Opens a new exception and returns its id.
    async fn create(&self, exception: NewException, at: DateTime<Utc>) -> Result<ExceptionId>;

    /// Loads one exception.
    async fn get(&self, id: &ExceptionId) -> Result<Option<ExceptionRecord>>;

    /// Resolves an open exception.
    async fn resolve(
        &self,
        id: &ExceptionId,
        resolver: &str,
        note: &str,
        at: DateTime<Utc>,
    ) -> Result<ExceptionRecord>;

    /// Exceptions with the given status, in creation order.
    async fn list_by_status(&self, status: ExceptionStatus) -> Result<Vec<ExceptionRecord>>;

    /// Every exception, in creation order.
    async fn list_all(&self) -> Result<Vec<ExceptionRecord>>;
}

#[derive(Debug, Default)]
struct ExceptionState {
    records: HashMap<ExceptionId, ExceptionRecord>,
    order: Vec<ExceptionId>,
}

/// In-memory exception log with sequential `EX-0001` ids.
#[derive(Debug, Clone, Default)]
pub struct InMemoryExceptionRepository {
    state: Arc<RwLock<ExceptionState>>,
}

impl InMemoryExceptionRepository {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExceptionRepository for InMemoryExceptionRepository {
    async fn create(&self, exception: NewException, at: DateTime<Utc>) -> Result<ExceptionId> {
        let mut state = self.state.write().await;
        let id = ExceptionId::new(format!("EX-{:04}", state.order.len() + 1));
        let record = ExceptionRecord::open(id.clone(), exception, at);
        state.records.insert(id.clone(), record);
        state.order.push(id.clone());
        Ok(id)
    }

    async fn get(&self, id: &ExceptionId) -> Result<Option<ExceptionRecord>> {
        Ok(self.state.read().await.records.get(id).cloned())
    }

    async fn resolve(
        &self,
        id: &ExceptionId,
        resolver: &str,
        note: &str,
        at: DateTime<Utc>,
    ) -> Result<ExceptionRecord> {
        let mut state = self.state.write().await;
        let record = state
            .records
            .get_mut(id)
            .ok_or_else(|| RepositoryError::not_found("exception", id))?;
        record.resolve(resolver, note, at)?;
        Ok(record.clone())
    }

    async fn list_by_status(&self, status: ExceptionStatus) -> Result<Vec<ExceptionRecord>> {
        let state = self.state.read().await;
        Ok(state
            .order
            .iter()
            .filter_map(|id| state.records.get(id))
            .filter(|r| r.status == status)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<ExceptionRecord>> {
        let state = self.state.read().await;
        Ok(state
            .order
            .iter()
            .filter_map(|id| state.records.get(id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{DomainError, ExceptionKind};

    #[tokio::test]
    async fn test_sequential_ids() {
        let repo = InMemoryExceptionRepository::new();
        let now = Utc::now();
        let a = repo
            .create(NewException::new(ExceptionKind::DamagedItems, "2 cartons crushed"), now)
            .await
            .unwrap();
        let b = repo
            .create(NewException::new(ExceptionKind::QuantityVariance, "short 4"), now)
            .await
            .unwrap();

        assert_eq!(a.as_str(), "EX-0001");
        assert_eq!(b.as_str(), "EX-0002");
    }

    #[tokio::test]
    async fn test_resolve_moves_between_lists() {
        let repo = InMemoryExceptionRepository::new();
        let now = Utc::now();
        let id = repo
            .create(NewException::new(ExceptionKind::MissingDocumentation, "no BOL"), now)
            .await
            .unwrap();

        assert_eq!(repo.list_by_status(ExceptionStatus::Open).await.unwrap().len(), 1);

        let record = repo.resolve(&id, "jsmith", "paperwork found", now).await.unwrap();
        assert_eq!(record.status, ExceptionStatus::Resolved);
        assert!(repo.list_by_status(ExceptionStatus::Open).await.unwrap().is_empty());
        assert_eq!(repo.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_twice_fails() {
        let repo = InMemoryExceptionRepository::new();
        let now = Utc::now();
        let id = repo
            .create(NewException::new(ExceptionKind::AllocationFailure, "lane full"), now)
            .await
            .unwrap();
        repo.resolve(&id, "jsmith", "written off", now).await.unwrap();

        let err = repo.resolve(&id, "jsmith", "again", now).await.unwrap_err();
        assert_eq!(
            err,
            RepositoryError::Domain(DomainError::ExceptionAlreadyResolved(id))
        );
    }

    #[tokio::test]
    async fn test_resolve_unknown() {
        let repo = InMemoryExceptionRepository::new();
        let err = repo
            .resolve(&ExceptionId::new("EX-9999"), "jsmith", "n/a", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }
}
