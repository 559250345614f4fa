//! Flow-through eligibility evaluation.
//!
//! Evaluation is a pure function over the supplied snapshots: it never
//! touches demand or capacity state, so lots can be evaluated in parallel.

use chrono::{DateTime, Utc};
use domain::{InboundLot, InventorySnapshot, RuleContext, RuleKind, RuleSet, Sku, StoreDemand};
use serde::Serialize;
use tracing::debug;

use crate::error::{EngineError, Result};

/// A demand that at least one rule matched, with how much it may draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EligibleDemand {
    pub demand: StoreDemand,

    /// `quantity_requested - quantity_filled` at evaluation time.
    pub max_draw: u32,

    pub matched_rules: Vec<RuleKind>,
}

/// Classification of a lot's quantity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EligibilityResult {
    /// Matched demands in rank order.
    pub eligible: Vec<EligibleDemand>,

    /// Units some matched demand can absorb (capped at the lot quantity).
    pub flow_eligible_quantity: u32,

    /// Units no rule claimed.
    pub storage_bound: u32,
}

impl EligibilityResult {
    fn all_storage(quantity: u32) -> Self {
        Self {
            eligible: Vec::new(),
            flow_eligible_quantity: 0,
            storage_bound: quantity,
        }
    }
}

/// Evaluates a rule set against lots and candidate demands.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    rules: RuleSet,
}

impl RuleEngine {
    /// Creates an engine over a validated rule set.
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    /// The configured rules.
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Classifies the lot's quantity as flow-eligible or storage-bound.
    ///
    /// `sku` is the catalog lookup result for the lot's SKU; `None` yields
    /// `MissingCatalogData`. Demands for other SKUs and closed demands are
    /// ignored.
    #[tracing::instrument(
        skip(self, lot, sku, demands, inventory),
        fields(lot_id = %lot.id, sku = %lot.sku)
    )]
    pub fn evaluate(
        &self,
        lot: &InboundLot,
        sku: Option<&Sku>,
        demands: &[StoreDemand],
        inventory: &InventorySnapshot,
        as_of: DateTime<Utc>,
    ) -> Result<EligibilityResult> {
        let sku = sku.ok_or_else(|| EngineError::MissingCatalogData {
            sku: lot.sku.clone(),
        })?;

        if !sku.flow_eligible {
            debug!("SKU not flow-eligible in catalog, routing to storage");
            return Ok(EligibilityResult::all_storage(lot.quantity));
        }

        let mut eligible: Vec<EligibleDemand> = demands
            .iter()
            .filter(|d| d.sku == lot.sku && d.is_open())
            .filter_map(|demand| {
                let ctx = RuleContext {
                    as_of,
                    inventory_ratio: inventory.ratio(&demand.store, &demand.sku),
                };
                let matched_rules = self.rules.matching(demand, &ctx);
                debug!(
                    demand_id = %demand.id,
                    store = %demand.store,
                    matched = matched_rules.len(),
                    "evaluated demand"
                );
                if matched_rules.is_empty() {
                    None
                } else {
                    Some(EligibleDemand {
                        demand: demand.clone(),
                        max_draw: demand.shortfall(),
                        matched_rules,
                    })
                }
            })
            .collect();

        eligible.sort_by(|a, b| a.demand.rank_cmp(&b.demand));

        let claimable: u64 = eligible.iter().map(|e| u64::from(e.max_draw)).sum();
        let flow_eligible_quantity = claimable.min(u64::from(lot.quantity)) as u32;

        Ok(EligibilityResult {
            eligible,
            flow_eligible_quantity,
            storage_bound: lot.quantity - flow_eligible_quantity,
        })
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new(RuleSet::standard())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use common::{SkuCode, StoreId};
    use domain::{Rule, StoreInventory};

    fn lot(quantity: u32) -> InboundLot {
        InboundLot::arrived("LOT-1", "SKU-5892", quantity, "DOCK-1", Utc::now())
    }

    fn sku() -> Sku {
        Sku::new("SKU-5892", "Premium Widget XL", "Widgets")
    }

    fn demand(id: &str, store: &str, qty: u32, days: i64, priority: u8) -> StoreDemand {
        StoreDemand::new(
            id,
            "SKU-5892",
            store,
            qty,
            Utc::now() + Duration::days(days),
            priority,
        )
    }

    #[test]
    fn test_lead_time_match() {
        let engine = RuleEngine::default();
        let result = engine
            .evaluate(
                &lot(24),
                Some(&sku()),
                &[demand("ORD-1", "ST-103", 18, 2, 1)],
                &InventorySnapshot::new(),
                Utc::now(),
            )
            .unwrap();

        assert_eq!(result.eligible.len(), 1);
        assert_eq!(result.eligible[0].max_draw, 18);
        assert_eq!(result.eligible[0].matched_rules, vec![RuleKind::LeadTime]);
        assert_eq!(result.flow_eligible_quantity, 18);
        assert_eq!(result.storage_bound, 6);
    }

    #[test]
    fn test_no_rule_matches_goes_to_storage() {
        let engine = RuleEngine::default();
        let result = engine
            .evaluate(
                &lot(24),
                Some(&sku()),
                &[demand("ORD-1", "ST-103", 18, 20, 1)],
                &InventorySnapshot::new(),
                Utc::now(),
            )
            .unwrap();

        assert!(result.eligible.is_empty());
        assert_eq!(result.storage_bound, 24);
    }

    #[test]
    fn test_inventory_level_match() {
        let engine = RuleEngine::default();
        let snapshot: InventorySnapshot = [StoreInventory {
            store: StoreId::new("ST-103"),
            sku: SkuCode::new("SKU-5892"),
            on_hand: 4,
            weekly_forecast: 10.0,
            target_weeks_of_supply: 1.0,
        }]
        .into_iter()
        .collect();

        let result = engine
            .evaluate(
                &lot(24),
                Some(&sku()),
                &[demand("ORD-1", "ST-103", 10, 20, 1)],
                &snapshot,
                Utc::now(),
            )
            .unwrap();

        assert_eq!(
            result.eligible[0].matched_rules,
            vec![RuleKind::InventoryLevel]
        );
    }

    #[test]
    fn test_catalog_flag_overrides_rules() {
        let engine = RuleEngine::default();
        let result = engine
            .evaluate(
                &lot(24),
                Some(&sku().with_flow_eligible(false)),
                &[demand("ORD-1", "ST-103", 18, 1, 1)],
                &InventorySnapshot::new(),
                Utc::now(),
            )
            .unwrap();

        assert!(result.eligible.is_empty());
        assert_eq!(result.storage_bound, 24);
    }

    #[test]
    fn test_missing_sku() {
        let engine = RuleEngine::default();
        let err = engine
            .evaluate(&lot(24), None, &[], &InventorySnapshot::new(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, EngineError::MissingCatalogData { .. }));
    }

    #[test]
    fn test_ranked_and_capped_at_lot_quantity() {
        let engine = RuleEngine::default();
        let result = engine
            .evaluate(
                &lot(10),
                Some(&sku()),
                &[
                    demand("ORD-B", "ST-101", 8, 3, 2),
                    demand("ORD-A", "ST-102", 8, 5, 1),
                    demand("ORD-C", "ST-104", 8, 1, 2),
                ],
                &InventorySnapshot::new(),
                Utc::now(),
            )
            .unwrap();

        let ids: Vec<_> = result
            .eligible
            .iter()
            .map(|e| e.demand.id.as_str())
            .collect();
        assert_eq!(ids, vec!["ORD-A", "ORD-C", "ORD-B"]);
        assert_eq!(result.flow_eligible_quantity, 10);
        assert_eq!(result.storage_bound, 0);
    }

    #[test]
    fn test_evaluation_does_not_mutate_inputs() {
        let engine = RuleEngine::new(
            RuleSet::new(vec![Rule::LeadTime { days_threshold: 30 }]).unwrap(),
        );
        let demands = vec![demand("ORD-1", "ST-103", 5, 2, 1)];
        let before = demands.clone();

        engine
            .evaluate(
                &lot(24),
                Some(&sku()),
                &demands,
                &InventorySnapshot::new(),
                Utc::now(),
            )
            .unwrap();

        assert_eq!(demands, before);
    }
}
