//! Capacity repository.
//!
//! Each scope key owns its own mutex so reservations on different lanes
//! never contend. Every successful mutation bumps the scope's version, and
//! `try_reserve` compares against the caller's expected version before
//! touching the counters.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::Version;
use domain::{CapacityConstraint, CapacityState, ScopeKey};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::{RepositoryError, Result};

/// Outcome of a reservation attempt that reached the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveOutcome {
    /// The amount was reserved; `version` is the scope's new version.
    Reserved { version: Version },
    /// Not enough headroom; nothing was reserved.
    Exhausted { available: u32 },
}

/// Atomic reserve/release per scope key.
#[async_trait]
pub trait CapacityRepository: Send + Sync {
    /// Registers (or replaces) a constraint. Reserved units carry over;
    /// a limit below them is rejected with `LimitBelowReserved`.
    async fn register(&self, constraint: CapacityConstraint) -> Result<()>;

    /// Current state of a scope; `None` when no constraint is configured.
    async fn snapshot(&self, scope: &ScopeKey) -> Result<Option<CapacityState>>;

    /// Reserves `amount` units.
    ///
    /// With `expected` set, the reservation only applies if the scope is
    /// still at that version; otherwise `ConcurrencyConflict` is returned.
    async fn try_reserve(
        &self,
        scope: &ScopeKey,
        amount: u32,
        expected: Option<Version>,
    ) -> Result<ReserveOutcome>;

    /// Releases previously reserved units.
    async fn release(&self, scope: &ScopeKey, amount: u32) -> Result<()>;
}

#[derive(Debug, Default)]
struct Faults {
    conflicts_to_inject: u32,
    reserve_delay: Option<Duration>,
}

/// In-memory capacity ledger store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCapacityRepository {
    scopes: Arc<RwLock<HashMap<ScopeKey, Arc<Mutex<CapacityState>>>>>,
    faults: Arc<Mutex<Faults>>,
}

impl InMemoryCapacityRepository {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` reservation attempts fail with a version
    /// conflict (for testing retry behavior).
    pub async fn inject_conflicts(&self, count: u32) {
        self.faults.lock().await.conflicts_to_inject = count;
    }

    /// Delays every reservation attempt (for testing timeouts).
    pub async fn set_reserve_delay(&self, delay: Option<Duration>) {
        self.faults.lock().await.reserve_delay = delay;
    }

    /// Units currently reserved on a scope (0 when unknown).
    pub async fn reserved(&self, scope: &ScopeKey) -> u32 {
        match self.entry(scope).await {
            Some(entry) => entry.lock().await.reserved,
            None => 0,
        }
    }

    async fn entry(&self, scope: &ScopeKey) -> Option<Arc<Mutex<CapacityState>>> {
        self.scopes.read().await.get(scope).cloned()
    }

    async fn entry_or_not_found(&self, scope: &ScopeKey) -> Result<Arc<Mutex<CapacityState>>> {
        self.entry(scope)
            .await
            .ok_or_else(|| RepositoryError::not_found("capacity scope", scope))
    }

    async fn take_injected_conflict(&self) -> bool {
        let mut faults = self.faults.lock().await;
        if faults.conflicts_to_inject > 0 {
            faults.conflicts_to_inject -= 1;
            true
        } else {
            false
        }
    }
}

#[async_trait]
impl CapacityRepository for InMemoryCapacityRepository {
    async fn register(&self, constraint: CapacityConstraint) -> Result<()> {
        let mut scopes = self.scopes.write().await;
        match scopes.get(&constraint.scope) {
            Some(existing) => {
                existing.lock().await.reconfigure(constraint)?;
            }
            None => {
                let scope = constraint.scope.clone();
                scopes.insert(scope, Arc::new(Mutex::new(CapacityState::new(constraint))));
            }
        }
        Ok(())
    }

    async fn snapshot(&self, scope: &ScopeKey) -> Result<Option<CapacityState>> {
        match self.entry(scope).await {
            Some(entry) => Ok(Some(entry.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn try_reserve(
        &self,
        scope: &ScopeKey,
        amount: u32,
        expected: Option<Version>,
    ) -> Result<ReserveOutcome> {
        let entry = self.entry_or_not_found(scope).await?;

        let delay = self.faults.lock().await.reserve_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = entry.lock().await;

        let injected = self.take_injected_conflict().await;
        if let Some(expected) = expected
            && (injected || state.version != expected)
        {
            debug!(%scope, %expected, actual = %state.version, "capacity version conflict");
            return Err(RepositoryError::ConcurrencyConflict {
                entity: "capacity scope",
                id: scope.to_string(),
                expected,
                actual: state.version,
            });
        }

        if amount > state.available() {
            return Ok(ReserveOutcome::Exhausted {
                available: state.available(),
            });
        }

        state.reserve(amount)?;
        Ok(ReserveOutcome::Reserved {
            version: state.version,
        })
    }

    async fn release(&self, scope: &ScopeKey, amount: u32) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let entry = self.entry_or_not_found(scope).await?;
        let mut state = entry.lock().await;
        state.release(amount)?;
        Ok(())
    }
}
