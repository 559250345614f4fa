//! Exception manager: creation, resolution and the work queue.

use std::sync::Arc;

use chrono::Utc;
use common::ExceptionId;
use domain::{ExceptionRecord, ExceptionStatus, NewException};
use repository::ExceptionRepository;
use tracing::{info, warn};

use crate::error::{EngineError, Result};

/// Raises and resolves exceptions.
///
/// Resolving an exception only records the resolver's disposition; it never
/// retries allocation.
#[derive(Clone)]
pub struct ExceptionManager {
    repo: Arc<dyn ExceptionRepository>,
}

impl ExceptionManager {
    /// Creates a manager over an exception repository.
    pub fn new(repo: Arc<dyn ExceptionRepository>) -> Self {
        Self { repo }
    }

    /// Opens a new exception.
    #[tracing::instrument(skip(self, exception), fields(kind = %exception.kind))]
    pub async fn raise(&self, exception: NewException) -> Result<ExceptionId> {
        let kind = exception.kind;
        let severity = exception.severity;
        let id = self.repo.create(exception, Utc::now()).await?;

        metrics::counter!("exceptions_raised_total", "kind" => kind.label()).increment(1);
        warn!(exception_id = %id, ?severity, "exception raised");
        Ok(id)
    }

    /// Resolves an open exception.
    #[tracing::instrument(skip(self, note))]
    pub async fn resolve(
        &self,
        id: &ExceptionId,
        resolver: &str,
        note: &str,
    ) -> Result<ExceptionRecord> {
        if self.repo.get(id).await?.is_none() {
            return Err(EngineError::ExceptionNotFound(id.clone()));
        }
        let record = self.repo.resolve(id, resolver, note, Utc::now()).await?;

        metrics::counter!("exceptions_resolved_total").increment(1);
        info!(exception_id = %id, "exception resolved");
        Ok(record)
    }

    /// Loads one exception.
    pub async fn get(&self, id: &ExceptionId) -> Result<Option<ExceptionRecord>> {
        Ok(self.repo.get(id).await?)
    }

    /// Returns true if the exception exists and is still open.
    pub async fn is_open(&self, id: &ExceptionId) -> Result<bool> {
        Ok(self
            .repo
            .get(id)
            .await?
            .is_some_and(|record| record.is_open()))
    }

    /// Exceptions in queue order: Open first, then High, Medium, Low.
    pub async fn queue(&self, status: Option<ExceptionStatus>) -> Result<Vec<ExceptionRecord>> {
        let mut records = match status {
            Some(status) => self.repo.list_by_status(status).await?,
            None => self.repo.list_all().await?,
        };
        records.sort_by(ExceptionRecord::queue_cmp);
        Ok(records)
    }

    /// Open exceptions in queue order.
    pub async fn open(&self) -> Result<Vec<ExceptionRecord>> {
        self.queue(Some(ExceptionStatus::Open)).await
    }

    /// Case-insensitive search over id, kind, references and description.
    pub async fn search(&self, query: &str) -> Result<Vec<ExceptionRecord>> {
        let mut records: Vec<_> = self
            .repo
            .list_all()
            .await?
            .into_iter()
            .filter(|r| r.matches_text(query))
            .collect();
        records.sort_by(ExceptionRecord::queue_cmp);
        Ok(records)
    }
}
