//! Allocation decisions and plans.

use chrono::{DateTime, Utc};
use common::{DecisionId, DemandId, ExceptionId, LocationCode, LotId, SkuCode, StoreId};
use serde::{Deserialize, Serialize};

use crate::rules::RuleKind;

/// Why a slice of a lot could not be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnallocatedReason {
    /// Rule-eligible units the outbound lane could not take.
    OutboundCapacity,
    /// Storage-bound units the storage area could not take.
    StorageCapacity,
}

/// Where a slice of a lot goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DecisionTarget {
    /// Cross-docked straight to a store order.
    FlowThrough { demand: DemandId, store: StoreId },

    /// Put away.
    Storage { location: LocationCode },

    /// Held pending manual resolution of an exception.
    Unallocated {
        exception: ExceptionId,
        reason: UnallocatedReason,
    },

    /// Cancels an earlier decision.
    Reversal { of: DecisionId },
}

impl DecisionTarget {
    /// Short label used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            DecisionTarget::FlowThrough { .. } => "flow_through",
            DecisionTarget::Storage { .. } => "storage",
            DecisionTarget::Unallocated { .. } => "unallocated",
            DecisionTarget::Reversal { .. } => "reversal",
        }
    }
}

/// One immutable allocation of a lot slice.
///
/// Corrections never edit a decision; they append a reversal and a new
/// decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationDecision {
    pub id: DecisionId,
    pub lot: LotId,
    pub sku: SkuCode,
    pub target: DecisionTarget,
    pub quantity: u32,
    pub decided_at: DateTime<Utc>,

    /// Rules that justified a flow-through decision.
    #[serde(default)]
    pub rules: Vec<RuleKind>,

    /// Free-text note (reversal reason, failure cause).
    #[serde(default)]
    pub note: Option<String>,
}

impl AllocationDecision {
    fn new(lot: &LotId, sku: &SkuCode, target: DecisionTarget, quantity: u32, at: DateTime<Utc>) -> Self {
        Self {
            id: DecisionId::new(),
            lot: lot.clone(),
            sku: sku.clone(),
            target,
            quantity,
            decided_at: at,
            rules: Vec::new(),
            note: None,
        }
    }

    /// Flow-through decision to a store demand.
    pub fn flow_through(
        lot: &LotId,
        sku: &SkuCode,
        demand: DemandId,
        store: StoreId,
        quantity: u32,
        rules: Vec<RuleKind>,
        at: DateTime<Utc>,
    ) -> Self {
        let mut decision = Self::new(lot, sku, DecisionTarget::FlowThrough { demand, store }, quantity, at);
        decision.rules = rules;
        decision
    }

    /// Storage decision.
    pub fn storage(lot: &LotId, sku: &SkuCode, location: LocationCode, quantity: u32, at: DateTime<Utc>) -> Self {
        Self::new(lot, sku, DecisionTarget::Storage { location }, quantity, at)
    }

    /// Holding-bucket decision tied to an open exception.
    pub fn unallocated(
        lot: &LotId,
        sku: &SkuCode,
        exception: ExceptionId,
        reason: UnallocatedReason,
        quantity: u32,
        at: DateTime<Utc>,
    ) -> Self {
        Self::new(
            lot,
            sku,
            DecisionTarget::Unallocated { exception, reason },
            quantity,
            at,
        )
    }

    /// Reversal of this decision.
    pub fn reversal(&self, reason: impl Into<String>, at: DateTime<Utc>) -> Self {
        let mut decision = Self::new(
            &self.lot,
            &self.sku,
            DecisionTarget::Reversal { of: self.id },
            self.quantity,
            at,
        );
        decision.note = Some(reason.into());
        decision
    }

    /// Returns true for flow-through decisions.
    pub fn is_flow_through(&self) -> bool {
        matches!(self.target, DecisionTarget::FlowThrough { .. })
    }
}

/// The partition of one lot's quantity produced by an allocation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub lot: LotId,
    pub lot_quantity: u32,
    pub decisions: Vec<AllocationDecision>,
    pub exceptions: Vec<ExceptionId>,
}

impl AllocationPlan {
    /// Creates an empty plan for a lot.
    pub fn new(lot: LotId, lot_quantity: u32) -> Self {
        Self {
            lot,
            lot_quantity,
            decisions: Vec::new(),
            exceptions: Vec::new(),
        }
    }

    fn sum_where(&self, pred: impl Fn(&DecisionTarget) -> bool) -> u32 {
        self.decisions
            .iter()
            .filter(|d| pred(&d.target))
            .map(|d| d.quantity)
            .sum()
    }

    /// Units cross-docked.
    pub fn flow_through_quantity(&self) -> u32 {
        self.sum_where(|t| matches!(t, DecisionTarget::FlowThrough { .. }))
    }

    /// Units put away.
    pub fn storage_quantity(&self) -> u32 {
        self.sum_where(|t| matches!(t, DecisionTarget::Storage { .. }))
    }

    /// Units held in the exception bucket.
    pub fn unallocated_quantity(&self) -> u32 {
        self.sum_where(|t| matches!(t, DecisionTarget::Unallocated { .. }))
    }

    /// Sum of all decision quantities.
    pub fn total_quantity(&self) -> u32 {
        self.decisions.iter().map(|d| d.quantity).sum()
    }

    /// Returns true if the decisions account for exactly the lot quantity.
    pub fn is_partition(&self) -> bool {
        self.total_quantity() == self.lot_quantity
    }

    /// Targets and quantities in plan order, without ids or timestamps.
    ///
    /// Two runs over the same snapshot produce equal lines.
    pub fn lines(&self) -> Vec<(DecisionTarget, u32)> {
        self.decisions
            .iter()
            .map(|d| (d.target.clone(), d.quantity))
            .collect()
    }
}
