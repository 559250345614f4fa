//! Cross-dock coordinator.
//!
//! Ties receiving, rule evaluation, allocation, the decision journal and
//! shipment dispatch together. The coordinator holds no mutable state of
//! its own; everything lives behind the repositories it is given.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{DecisionId, ExceptionId, LotId};
use domain::{
    AllocationDecision, AllocationPlan, DecisionTarget, ExceptionKind, InboundLot, LotStatus,
    NewException, Sku,
};
use repository::{
    CapacityRepository, CatalogRepository, DecisionRepository, DemandRepository,
    ExceptionRepository, InMemoryRepositories, InventoryRepository, LotRepository,
    RepositoryError, ShipmentRepository,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::allocator::Allocator;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::exceptions::ExceptionManager;
use crate::ledger::CapacityLedger;
use crate::loader::ShipmentLoader;
use crate::receiving::ReceiptInspection;
use crate::rule_engine::RuleEngine;
use crate::summary::FlowSummary;

/// Handles to every repository the engine reads and writes.
#[derive(Clone)]
pub struct Repositories {
    pub catalog: Arc<dyn CatalogRepository>,
    pub demands: Arc<dyn DemandRepository>,
    pub capacity: Arc<dyn CapacityRepository>,
    pub exceptions: Arc<dyn ExceptionRepository>,
    pub shipments: Arc<dyn ShipmentRepository>,
    pub decisions: Arc<dyn DecisionRepository>,
    pub lots: Arc<dyn LotRepository>,
    pub inventory: Arc<dyn InventoryRepository>,
}

impl From<&InMemoryRepositories> for Repositories {
    fn from(repos: &InMemoryRepositories) -> Self {
        Self {
            catalog: Arc::new(repos.catalog.clone()),
            demands: Arc::new(repos.demands.clone()),
            capacity: Arc::new(repos.capacity.clone()),
            exceptions: Arc::new(repos.exceptions.clone()),
            shipments: Arc::new(repos.shipments.clone()),
            decisions: Arc::new(repos.decisions.clone()),
            lots: Arc::new(repos.lots.clone()),
            inventory: Arc::new(repos.inventory.clone()),
        }
    }
}

/// Result of receiving a lot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReceiptOutcome {
    pub lot: InboundLot,
    pub exceptions: Vec<ExceptionId>,
}

/// The cross-dock allocation engine.
#[derive(Clone)]
pub struct CrossDock {
    repos: Repositories,
    config: EngineConfig,
    rules: RuleEngine,
    allocator: Allocator,
    exceptions: ExceptionManager,
    loader: ShipmentLoader,
}

impl CrossDock {
    /// Wires the engine to its repositories.
    ///
    /// Fails with `RuleConfiguration` if the configured thresholds are out
    /// of range.
    pub fn new(repos: Repositories, config: EngineConfig) -> Result<Self> {
        let rules = RuleEngine::new(config.rule_set()?);
        let exceptions = ExceptionManager::new(repos.exceptions.clone());
        let ledger = CapacityLedger::new(
            repos.capacity.clone(),
            config.reservation_timeout,
            config.reservation_attempts,
        );
        let allocator = Allocator::new(
            repos.demands.clone(),
            ledger,
            exceptions.clone(),
            config.storage_location.clone(),
            config.reservation_attempts,
        );
        let loader = ShipmentLoader::new(repos.shipments.clone());

        Ok(Self {
            repos,
            config,
            rules,
            allocator,
            exceptions,
            loader,
        })
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Repository handles.
    pub fn repositories(&self) -> &Repositories {
        &self.repos
    }

    /// Exception manager.
    pub fn exceptions(&self) -> &ExceptionManager {
        &self.exceptions
    }

    /// Shipment loader.
    pub fn loader(&self) -> &ShipmentLoader {
        &self.loader
    }

    /// Records an arriving lot and raises an exception for every
    /// discrepancy found at the dock.
    ///
    /// Only usable (undamaged) units become lot quantity. Unknown SKUs and
    /// missing paperwork put the lot on hold.
    #[tracing::instrument(skip(self, inspection), fields(lot_id = %inspection.lot_id, sku = %inspection.sku))]
    pub async fn receive(&self, inspection: ReceiptInspection) -> Result<ReceiptOutcome> {
        inspection.validate()?;
        let known = self.repos.catalog.get_sku(&inspection.sku).await?.is_some();

        // The lot is claimed as Scheduled so nobody can allocate it before
        // its holds are attached.
        let mut lot = InboundLot::scheduled(
            inspection.lot_id.clone(),
            inspection.sku.clone(),
            inspection.usable_quantity(),
            inspection.source_location.clone(),
        );
        self.repos.lots.create(lot.clone()).await?;

        let mut exceptions = Vec::new();
        for finding in inspection.findings(known) {
            let id = self.exceptions.raise(finding.exception).await?;
            if finding.holds_lot && lot.hold.is_none() {
                lot.hold = Some(id.clone());
            }
            exceptions.push(id);
        }

        lot.arrive(inspection.received_at)?;
        self.repos.lots.save(lot.clone()).await?;
        info!(
            quantity = lot.quantity,
            exceptions = exceptions.len(),
            on_hold = lot.hold.is_some(),
            "lot received"
        );
        Ok(ReceiptOutcome { lot, exceptions })
    }

    /// Evaluates and allocates one arrived lot, journals the plan,
    /// dispatches flow-through units to shipments and closes the lot.
    ///
    /// On failure or cancellation the lot returns to `Arrived` with nothing
    /// reserved or filled on its behalf.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn process_lot(
        &self,
        lot_id: &LotId,
        as_of: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<AllocationPlan> {
        metrics::counter!("allocation_runs_total").increment(1);
        let started = std::time::Instant::now();

        let lot = self
            .repos
            .lots
            .get(lot_id)
            .await?
            .ok_or_else(|| EngineError::LotNotFound(lot_id.clone()))?;

        if let Some(hold) = &lot.hold
            && self.exceptions.is_open(hold).await?
        {
            return Err(EngineError::LotOnHold {
                lot: lot.id.clone(),
                exception: hold.clone(),
            });
        }

        let mut lot = self
            .repos
            .lots
            .try_transition(lot_id, LotStatus::Arrived, LotStatus::Processing)
            .await
            .map_err(|e| match e {
                RepositoryError::Domain(e) => EngineError::Domain(e),
                other => other.into(),
            })?;

        match self.run_allocation(&mut lot, as_of, cancel).await {
            Ok(plan) => {
                lot.close()?;
                self.repos.lots.save(lot).await?;

                for decision in &plan.decisions {
                    metrics::counter!("allocation_units_total", "target" => decision.target.label())
                        .increment(u64::from(decision.quantity));
                }
                metrics::histogram!("allocation_duration_seconds")
                    .record(started.elapsed().as_secs_f64());
                info!(
                    flow_through = plan.flow_through_quantity(),
                    storage = plan.storage_quantity(),
                    unallocated = plan.unallocated_quantity(),
                    "lot closed"
                );
                Ok(plan)
            }
            Err(e) => {
                lot.abandon_processing()?;
                self.repos.lots.save(lot).await?;
                Err(e)
            }
        }
    }

    async fn run_allocation(
        &self,
        lot: &mut InboundLot,
        as_of: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<AllocationPlan> {
        let sku = self.repos.catalog.get_sku(&lot.sku).await?;
        let demands = self.repos.demands.open_demands_for(&lot.sku).await?;
        let inventory = self.repos.inventory.snapshot_for(&lot.sku).await?;

        let eligibility =
            match self
                .rules
                .evaluate(lot, sku.as_ref(), &demands, &inventory, as_of)
            {
                Ok(eligibility) => eligibility,
                Err(e @ EngineError::MissingCatalogData { .. }) => {
                    let hold = self
                        .exceptions
                        .raise(
                            NewException::new(ExceptionKind::IncorrectSku, e.to_string())
                                .for_lot(lot.id.clone())
                                .with_quantity(lot.quantity),
                        )
                        .await?;
                    lot.hold = Some(hold);
                    return Err(e);
                }
                Err(e) => return Err(e),
            };

        let plan = self.allocator.allocate(lot, &eligibility, cancel).await?;

        if let Err(e) = self.repos.decisions.append(plan.decisions.clone()).await {
            warn!(error = %e, "failed to journal plan, undoing allocation");
            self.allocator.discard(&plan).await;
            return Err(e.into());
        }

        if let Some(sku) = &sku {
            self.dispatch(&plan, sku).await;
        }
        Ok(plan)
    }

    async fn dispatch(&self, plan: &AllocationPlan, sku: &Sku) {
        for decision in &plan.decisions {
            if let DecisionTarget::FlowThrough { store, .. } = &decision.target
                && let Err(e) = self.loader.dispatch(store, decision.quantity, sku).await
            {
                warn!(decision_id = %decision.id, error = %e, "failed to assign flow-through units to a shipment");
            }
        }
    }

    /// Processes several lots in order. One lot's failure never stops the
    /// others.
    pub async fn process_batch(
        &self,
        lot_ids: &[LotId],
        as_of: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Vec<(LotId, Result<AllocationPlan>)> {
        let mut results = Vec::with_capacity(lot_ids.len());
        for lot_id in lot_ids {
            let result = self.process_lot(lot_id, as_of, cancel).await;
            if let Err(e) = &result {
                warn!(lot_id = %lot_id, error = %e, "lot not allocated");
            }
            results.push((lot_id.clone(), result));
        }
        results
    }

    /// Reverses a flow-through or storage decision: journals a reversal,
    /// reverts the demand fill and releases the capacity it held.
    ///
    /// A failed release after journaling raises an allocation-failure
    /// exception for the lot.
    ///
    /// Unallocated decisions are disposed of by resolving their exception.
    #[tracing::instrument(skip(self, reason))]
    pub async fn reverse_decision(
        &self,
        id: &DecisionId,
        reason: &str,
    ) -> Result<AllocationDecision> {
        let decision = self
            .repos
            .decisions
            .get(id)
            .await?
            .ok_or(EngineError::DecisionNotFound(*id))?;

        match decision.target {
            DecisionTarget::Reversal { .. } => {
                return Err(EngineError::NotReversible {
                    id: *id,
                    reason: "reversal entries are final",
                });
            }
            DecisionTarget::Unallocated { .. } => {
                return Err(EngineError::NotReversible {
                    id: *id,
                    reason: "resolve the held exception instead",
                });
            }
            DecisionTarget::FlowThrough { .. } | DecisionTarget::Storage { .. } => {}
        }

        if self.repos.decisions.reversal_of(id).await?.is_some() {
            return Err(EngineError::DecisionAlreadyReversed(*id));
        }

        let reversal = decision.reversal(reason, Utc::now());
        match self.repos.decisions.append(vec![reversal.clone()]).await {
            Ok(()) => {}
            Err(RepositoryError::AlreadyExists { .. }) => {
                return Err(EngineError::DecisionAlreadyReversed(*id));
            }
            Err(e) => return Err(e.into()),
        }

        // The journal entry serializes competing reversals, so it goes
        // first. If the undo then fails the units are still held and an
        // operator has to release them.
        if let Err(e) = self.allocator.undo(&decision).await {
            error!(
                decision_id = %decision.id,
                reversal_id = %reversal.id,
                lot_id = %decision.lot,
                quantity = decision.quantity,
                target = decision.target.label(),
                error = %e,
                "reversal journaled but units were not released"
            );
            self.exceptions
                .raise(
                    NewException::new(
                        ExceptionKind::AllocationFailure,
                        format!(
                            "Reversal {} of decision {} is journaled but its {} units are still held: {e}",
                            reversal.id, decision.id, decision.quantity
                        ),
                    )
                    .for_lot(decision.lot.clone())
                    .with_quantity(decision.quantity),
                )
                .await?;
            return Err(e);
        }
        info!(lot_id = %decision.lot, quantity = decision.quantity, "decision reversed");
        Ok(reversal)
    }

    /// Decisions journaled for a lot.
    pub async fn decisions_for(&self, lot_id: &LotId) -> Result<Vec<AllocationDecision>> {
        Ok(self.repos.decisions.for_lot(lot_id).await?)
    }

    /// Flow-through share across the whole journal.
    pub async fn flow_summary(&self) -> Result<FlowSummary> {
        let decisions = self.repos.decisions.all().await?;
        Ok(FlowSummary::from_decisions(
            &decisions,
            self.config.flow_alert_pct,
        ))
    }
}
