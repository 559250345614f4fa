//! Allocator: matches flow-eligible quantity to ranked store demand under
//! outbound capacity, then puts the remainder away.
//!
//! Every plan is a partition of the lot: flow-through, storage and
//! unallocated (exception-held) decisions always sum to the lot quantity.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{DemandId, LocationCode};
use domain::{
    AllocationDecision, AllocationPlan, DecisionTarget, ExceptionKind, InboundLot, NewException,
    ScopeKey, StoreDemand, UnallocatedReason,
};
use repository::{DemandRepository, RepositoryError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{EngineError, Result};
use crate::exceptions::ExceptionManager;
use crate::ledger::CapacityLedger;
use crate::rule_engine::{EligibilityResult, EligibleDemand};

/// Capacity and demand fills acquired during one run, released on abort.
#[derive(Debug, Default)]
struct Holdings {
    reservations: Vec<(ScopeKey, u32)>,
    fills: Vec<(DemandId, u32)>,
}

/// Quantity that could not be placed; becomes an AllocationFailure
/// exception at commit.
#[derive(Debug)]
struct Shortfall {
    demand: Option<DemandId>,
    quantity: u32,
    reason: UnallocatedReason,
    description: String,
}

/// Turns an eligibility result into a committed allocation plan.
#[derive(Clone)]
pub struct Allocator {
    demands: Arc<dyn DemandRepository>,
    ledger: CapacityLedger,
    exceptions: ExceptionManager,
    storage_location: LocationCode,
    fill_attempts: u32,
}

impl Allocator {
    /// Creates an allocator.
    pub fn new(
        demands: Arc<dyn DemandRepository>,
        ledger: CapacityLedger,
        exceptions: ExceptionManager,
        storage_location: LocationCode,
        fill_attempts: u32,
    ) -> Self {
        Self {
            demands,
            ledger,
            exceptions,
            storage_location,
            fill_attempts: fill_attempts.max(1),
        }
    }

    /// Allocates the whole lot.
    ///
    /// Outbound capacity is reserved per demand before its fill is applied;
    /// a fill that cannot land releases its reservation. If the run fails
    /// or `cancel` fires before commit, every reservation and fill taken so
    /// far is rolled back.
    #[tracing::instrument(
        skip(self, lot, eligibility, cancel),
        fields(lot_id = %lot.id, quantity = lot.quantity)
    )]
    pub async fn allocate(
        &self,
        lot: &InboundLot,
        eligibility: &EligibilityResult,
        cancel: &CancellationToken,
    ) -> Result<AllocationPlan> {
        let mut holdings = Holdings::default();
        match self.place(lot, eligibility, cancel, &mut holdings).await {
            Ok(plan) => Ok(plan),
            Err(e) => {
                warn!(error = %e, "allocation aborted, rolling back");
                self.roll_back(holdings).await;
                Err(e)
            }
        }
    }

    async fn place(
        &self,
        lot: &InboundLot,
        eligibility: &EligibilityResult,
        cancel: &CancellationToken,
        holdings: &mut Holdings,
    ) -> Result<AllocationPlan> {
        let now = Utc::now();
        let mut remaining = lot.quantity;
        let mut decisions = Vec::new();
        let mut shortfalls = Vec::new();

        let mut candidates: Vec<&EligibleDemand> = eligibility.eligible.iter().collect();
        candidates.sort_by(|a, b| a.demand.rank_cmp(&b.demand));

        for candidate in candidates {
            if remaining == 0 {
                break;
            }
            check_cancelled(lot, cancel)?;

            let wanted = remaining.min(candidate.max_draw);
            if wanted == 0 {
                continue;
            }

            let demand = &candidate.demand;
            let scope = ScopeKey::outbound_lane(&demand.store);

            let granted = match self.reserve(lot, &scope, wanted, cancel).await {
                Ok(granted) => granted,
                Err(e) if e.is_contention() => {
                    shortfalls.push(Shortfall {
                        demand: Some(demand.id.clone()),
                        quantity: wanted,
                        reason: UnallocatedReason::OutboundCapacity,
                        description: format!(
                            "Could not reserve {wanted} units on {scope} for order {}: {e}",
                            demand.id
                        ),
                    });
                    remaining -= wanted;
                    continue;
                }
                Err(e) => return Err(e),
            };

            if granted > 0 {
                holdings.reservations.push((scope.clone(), granted));

                let filled = match self.fill(demand, granted).await {
                    Ok(filled) => filled,
                    Err(e) if e.is_contention() => {
                        self.give_back(holdings, &scope, granted).await?;
                        shortfalls.push(Shortfall {
                            demand: Some(demand.id.clone()),
                            quantity: wanted,
                            reason: UnallocatedReason::OutboundCapacity,
                            description: format!(
                                "Order {} kept changing while allocating {wanted} units: {e}",
                                demand.id
                            ),
                        });
                        remaining -= wanted;
                        continue;
                    }
                    Err(e) => return Err(e),
                };

                if filled > 0 {
                    holdings.fills.push((demand.id.clone(), filled));
                    decisions.push(AllocationDecision::flow_through(
                        &lot.id,
                        &lot.sku,
                        demand.id.clone(),
                        demand.store.clone(),
                        filled,
                        candidate.matched_rules.clone(),
                        now,
                    ));
                    remaining -= filled;
                    debug!(demand_id = %demand.id, filled, "flow-through allocated");
                }

                // The demand shrank since evaluation; the extra units were
                // never committed to it.
                if filled < granted {
                    self.give_back(holdings, &scope, granted - filled).await?;
                }
            }

            let capacity_short = wanted - granted;
            if capacity_short > 0 {
                shortfalls.push(Shortfall {
                    demand: Some(demand.id.clone()),
                    quantity: capacity_short,
                    reason: UnallocatedReason::OutboundCapacity,
                    description: format!(
                        "Outbound capacity on {scope} covered {granted} of {wanted} rule-eligible units for order {}",
                        demand.id
                    ),
                });
                remaining -= capacity_short;
                warn!(demand_id = %demand.id, capacity_short, "outbound capacity exhausted");
            }
        }

        if remaining > 0 {
            check_cancelled(lot, cancel)?;
            let (stored, overflow) = self.put_away(lot, remaining, now, cancel, holdings).await?;
            decisions.extend(stored);
            shortfalls.extend(overflow);
        }

        check_cancelled(lot, cancel)?;
        self.commit(lot, decisions, shortfalls, now).await
    }

    async fn put_away(
        &self,
        lot: &InboundLot,
        quantity: u32,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
        holdings: &mut Holdings,
    ) -> Result<(Option<AllocationDecision>, Option<Shortfall>)> {
        let scope = ScopeKey::storage(self.storage_location.clone());
        let (granted, failure) = match self.reserve(lot, &scope, quantity, cancel).await {
            Ok(granted) => (granted, None),
            Err(e) if e.is_contention() => (0, Some(e.to_string())),
            Err(e) => return Err(e),
        };

        let mut stored = None;
        if granted > 0 {
            holdings.reservations.push((scope, granted));
            stored = Some(AllocationDecision::storage(
                &lot.id,
                &lot.sku,
                self.storage_location.clone(),
                granted,
                now,
            ));
        }

        let overflow = quantity - granted;
        if overflow == 0 {
            return Ok((stored, None));
        }

        let description = match failure {
            Some(reason) => format!("Could not reserve storage for {overflow} units: {reason}"),
            None => format!(
                "Storage capacity exceeded at {}: {overflow} of {quantity} units could not be put away",
                self.storage_location
            ),
        };
        warn!(overflow, "storage capacity exhausted");
        Ok((
            stored,
            Some(Shortfall {
                demand: None,
                quantity: overflow,
                reason: UnallocatedReason::StorageCapacity,
                description,
            }),
        ))
    }

    async fn commit(
        &self,
        lot: &InboundLot,
        decisions: Vec<AllocationDecision>,
        shortfalls: Vec<Shortfall>,
        now: DateTime<Utc>,
    ) -> Result<AllocationPlan> {
        let mut plan = AllocationPlan::new(lot.id.clone(), lot.quantity);
        plan.decisions = decisions;

        for shortfall in shortfalls {
            let mut exception =
                NewException::new(ExceptionKind::AllocationFailure, shortfall.description)
                    .for_lot(lot.id.clone())
                    .with_quantity(shortfall.quantity);
            if let Some(demand) = shortfall.demand {
                exception = exception.for_demand(demand);
            }

            let exception_id = self.exceptions.raise(exception).await?;
            plan.decisions.push(AllocationDecision::unallocated(
                &lot.id,
                &lot.sku,
                exception_id.clone(),
                shortfall.reason,
                shortfall.quantity,
                now,
            ));
            plan.exceptions.push(exception_id);
        }

        debug_assert!(plan.is_partition());
        info!(
            flow_through = plan.flow_through_quantity(),
            storage = plan.storage_quantity(),
            unallocated = plan.unallocated_quantity(),
            "allocation plan committed"
        );
        Ok(plan)
    }

    async fn reserve(
        &self,
        lot: &InboundLot,
        scope: &ScopeKey,
        wanted: u32,
        cancel: &CancellationToken,
    ) -> Result<u32> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(EngineError::Cancelled { lot: lot.id.clone() }),
            result = self.ledger.reserve_up_to(scope, wanted) => result,
        }
    }

    /// Applies up to `granted` units to the demand, re-reading it when it
    /// changed since evaluation. Returns the units actually filled.
    async fn fill(&self, demand: &StoreDemand, granted: u32) -> Result<u32> {
        let mut current = demand.clone();
        for attempt in 1..=self.fill_attempts {
            if !current.is_open() {
                return Ok(0);
            }
            let quantity = granted.min(current.shortfall());

            match self
                .demands
                .apply_fill(&current.id, quantity, Some(current.version))
                .await
            {
                Ok(_) => return Ok(quantity),
                Err(e) if e.is_conflict() => {
                    debug!(demand_id = %current.id, attempt, "demand changed since evaluation");
                    current = self.demands.get(&current.id).await?.ok_or_else(|| {
                        RepositoryError::NotFound {
                            entity: "demand",
                            id: demand.id.to_string(),
                        }
                    })?;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(EngineError::AllocationConflict {
            scope: format!("demand {}", demand.id),
            attempts: self.fill_attempts,
        })
    }

    /// Releases part of the most recent reservation on `scope`.
    async fn give_back(&self, holdings: &mut Holdings, scope: &ScopeKey, amount: u32) -> Result<()> {
        self.ledger.release(scope, amount).await?;
        if let Some(index) = holdings.reservations.iter().rposition(|(s, _)| s == scope) {
            let held = &mut holdings.reservations[index].1;
            *held -= amount.min(*held);
            if *held == 0 {
                holdings.reservations.remove(index);
            }
        }
        Ok(())
    }

    async fn roll_back(&self, holdings: Holdings) {
        for (demand, quantity) in holdings.fills.iter().rev() {
            if let Err(e) = self.demands.revert_fill(demand, *quantity).await {
                warn!(demand_id = %demand, quantity, error = %e, "failed to revert demand fill");
            }
        }
        for (scope, quantity) in holdings.reservations.iter().rev() {
            if let Err(e) = self.ledger.release(scope, *quantity).await {
                warn!(%scope, quantity, error = %e, "failed to release reservation");
            }
        }
        info!(
            fills = holdings.fills.len(),
            reservations = holdings.reservations.len(),
            "allocation rolled back"
        );
    }

    /// Undoes the effect of a committed decision: reverts its demand fill
    /// and releases the capacity it held. Unallocated decisions hold
    /// nothing.
    pub async fn undo(&self, decision: &AllocationDecision) -> Result<()> {
        match &decision.target {
            DecisionTarget::FlowThrough { demand, store } => {
                self.demands.revert_fill(demand, decision.quantity).await?;
                self.ledger
                    .release(&ScopeKey::outbound_lane(store), decision.quantity)
                    .await?;
            }
            DecisionTarget::Storage { location } => {
                self.ledger
                    .release(&ScopeKey::storage(location.clone()), decision.quantity)
                    .await?;
            }
            DecisionTarget::Unallocated { .. } | DecisionTarget::Reversal { .. } => {}
        }
        Ok(())
    }

    /// Undoes every decision of a plan that could not be journaled.
    pub async fn discard(&self, plan: &AllocationPlan) {
        for decision in plan.decisions.iter().rev() {
            if let Err(e) = self.undo(decision).await {
                warn!(decision_id = %decision.id, error = %e, "failed to undo decision");
            }
        }
    }
}

fn check_cancelled(lot: &InboundLot, cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(EngineError::Cancelled {
            lot: lot.id.clone(),
        })
    } else {
        Ok(())
    }
}
