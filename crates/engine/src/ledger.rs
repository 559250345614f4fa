//! Capacity ledger: bounded-retry, time-limited reservations.

use std::sync::Arc;
use std::time::Duration;

use domain::ScopeKey;
use repository::{CapacityRepository, ReserveOutcome};
use tracing::{debug, warn};

use crate::error::{EngineError, Result};

/// Reserves and releases capacity through a [`CapacityRepository`].
///
/// Each reservation reads the scope's version, then attempts a
/// compare-and-swap at that version. Conflicts are retried up to
/// `max_attempts` times; the whole attempt is bounded by `timeout`.
#[derive(Clone)]
pub struct CapacityLedger {
    repo: Arc<dyn CapacityRepository>,
    timeout: Duration,
    max_attempts: u32,
}

impl CapacityLedger {
    /// Creates a ledger.
    pub fn new(repo: Arc<dyn CapacityRepository>, timeout: Duration, max_attempts: u32) -> Self {
        Self {
            repo,
            timeout,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Reserves as much of `wanted` as the scope can take, returning the
    /// amount reserved (possibly zero).
    ///
    /// A scope with no configured constraint has zero capacity.
    #[tracing::instrument(skip(self, scope), fields(scope = %scope))]
    pub async fn reserve_up_to(&self, scope: &ScopeKey, wanted: u32) -> Result<u32> {
        if wanted == 0 {
            return Ok(0);
        }

        match tokio::time::timeout(self.timeout, self.reserve_with_retry(scope, wanted)).await {
            Ok(result) => result,
            Err(_) => {
                metrics::counter!("capacity_timeouts_total").increment(1);
                warn!(timeout_ms = self.timeout.as_millis() as u64, "capacity reservation timed out");
                Err(EngineError::ReservationTimeout {
                    scope: scope.to_string(),
                    timeout_ms: self.timeout.as_millis() as u64,
                })
            }
        }
    }

    async fn reserve_with_retry(&self, scope: &ScopeKey, wanted: u32) -> Result<u32> {
        for attempt in 1..=self.max_attempts {
            let Some(state) = self.repo.snapshot(scope).await? else {
                warn!("no capacity constraint configured; treating as zero capacity");
                return Ok(0);
            };

            let amount = wanted.min(state.available());
            if amount == 0 {
                return Ok(0);
            }

            match self.repo.try_reserve(scope, amount, Some(state.version)).await {
                Ok(ReserveOutcome::Reserved { .. }) => {
                    debug!(amount, attempt, "capacity reserved");
                    return Ok(amount);
                }
                Ok(ReserveOutcome::Exhausted { available }) => {
                    debug!(available, attempt, "capacity shrank before reservation, retrying");
                }
                Err(e) if e.is_conflict() => {
                    metrics::counter!("capacity_conflicts_total").increment(1);
                    debug!(attempt, "capacity version conflict, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!(attempts = self.max_attempts, "capacity contention persisted");
        Err(EngineError::AllocationConflict {
            scope: scope.to_string(),
            attempts: self.max_attempts,
        })
    }

    /// Returns units to the scope.
    #[tracing::instrument(skip(self, scope), fields(scope = %scope))]
    pub async fn release(&self, scope: &ScopeKey, amount: u32) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        self.repo.release(scope, amount).await?;
        debug!(amount, "capacity released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::StoreId;
    use domain::CapacityConstraint;
    use repository::InMemoryCapacityRepository;

    async fn setup(limit: u32) -> (InMemoryCapacityRepository, CapacityLedger, ScopeKey) {
        let repo = InMemoryCapacityRepository::new();
        let scope = ScopeKey::outbound_lane(&StoreId::new("ST-103"));
        repo.register(CapacityConstraint::new("CAP-1", scope.clone(), limit))
            .await
            .unwrap();
        let ledger = CapacityLedger::new(Arc::new(repo.clone()), Duration::from_millis(500), 3);
        (repo, ledger, scope)
    }

    #[tokio::test]
    async fn test_reserves_up_to_available() {
        let (repo, ledger, scope) = setup(10).await;
        assert_eq!(ledger.reserve_up_to(&scope, 18).await.unwrap(), 10);
        assert_eq!(ledger.reserve_up_to(&scope, 5).await.unwrap(), 0);
        assert_eq!(repo.reserved(&scope).await, 10);
    }

    #[tokio::test]
    async fn test_unconfigured_scope_is_zero_capacity() {
        let repo = InMemoryCapacityRepository::new();
        let ledger = CapacityLedger::new(Arc::new(repo), Duration::from_millis(500), 3);
        let granted = ledger
            .reserve_up_to(&ScopeKey::storage("NOWHERE"), 6)
            .await
            .unwrap();
        assert_eq!(granted, 0);
    }

    #[tokio::test]
    async fn test_retries_through_transient_conflicts() {
        let (repo, ledger, scope) = setup(10).await;
        repo.inject_conflicts(2).await;
        assert_eq!(ledger.reserve_up_to(&scope, 4).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_persistent_conflict_surfaces() {
        let (repo, ledger, scope) = setup(10).await;
        repo.inject_conflicts(5).await;

        let err = ledger.reserve_up_to(&scope, 4).await.unwrap_err();
        assert!(matches!(err, EngineError::AllocationConflict { attempts: 3, .. }));
        assert_eq!(repo.reserved(&scope).await, 0);
    }

    #[tokio::test]
    async fn test_timeout_fails_fast() {
        let (repo, _, scope) = setup(10).await;
        repo.set_reserve_delay(Some(Duration::from_millis(200))).await;
        let ledger = CapacityLedger::new(Arc::new(repo.clone()), Duration::from_millis(20), 3);

        let err = ledger.reserve_up_to(&scope, 4).await.unwrap_err();
        assert!(matches!(err, EngineError::ReservationTimeout { timeout_ms: 20, .. }));
        assert_eq!(repo.reserved(&scope).await, 0);
    }

    #[tokio::test]
    async fn test_release() {
        let (repo, ledger, scope) = setup(10).await;
        ledger.reserve_up_to(&scope, 7).await.unwrap();
        ledger.release(&scope, 7).await.unwrap();
        assert_eq!(repo.reserved(&scope).await, 0);
    }
}
