//! Flow-through summary over the decision journal.

use std::collections::HashSet;

use domain::{AllocationDecision, DecisionTarget};
use serde::Serialize;

/// Units by destination, excluding reversed decisions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowSummary {
    pub flow_through_units: u64,
    pub storage_units: u64,
    pub unallocated_units: u64,
    pub total_units: u64,
    pub flow_through_pct: f64,

    /// Set when the flow-through share is below the alert threshold.
    pub alert: bool,
}

impl FlowSummary {
    /// Summarizes journal entries.
    pub fn from_decisions(decisions: &[AllocationDecision], alert_threshold_pct: f64) -> Self {
        let reversed: HashSet<_> = decisions
            .iter()
            .filter_map(|d| match d.target {
                DecisionTarget::Reversal { of } => Some(of),
                _ => None,
            })
            .collect();

        let mut summary = Self {
            flow_through_units: 0,
            storage_units: 0,
            unallocated_units: 0,
            total_units: 0,
            flow_through_pct: 0.0,
            alert: false,
        };

        for decision in decisions.iter().filter(|d| !reversed.contains(&d.id)) {
            let quantity = u64::from(decision.quantity);
            match decision.target {
                DecisionTarget::FlowThrough { .. } => summary.flow_through_units += quantity,
                DecisionTarget::Storage { .. } => summary.storage_units += quantity,
                DecisionTarget::Unallocated { .. } => summary.unallocated_units += quantity,
                DecisionTarget::Reversal { .. } => continue,
            }
            summary.total_units += quantity;
        }

        if summary.total_units > 0 {
            summary.flow_through_pct =
                summary.flow_through_units as f64 / summary.total_units as f64 * 100.0;
            summary.alert = summary.flow_through_pct < alert_threshold_pct;
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::{DemandId, LocationCode, LotId, SkuCode, StoreId};

    fn flow(qty: u32) -> AllocationDecision {
        AllocationDecision::flow_through(
            &LotId::new("LOT-1"),
            &SkuCode::new("SKU-1"),
            DemandId::new("ORD-1"),
            StoreId::new("ST-103"),
            qty,
            Vec::new(),
            Utc::now(),
        )
    }

    fn storage(qty: u32) -> AllocationDecision {
        AllocationDecision::storage(
            &LotId::new("LOT-1"),
            &SkuCode::new("SKU-1"),
            LocationCode::new("STORAGE-MAIN"),
            qty,
            Utc::now(),
        )
    }

    #[test]
    fn test_receiving_split() {
        let summary = FlowSummary::from_decisions(&[flow(18), storage(6)], 60.0);
        assert_eq!(summary.total_units, 24);
        assert_eq!(summary.flow_through_pct, 75.0);
        assert!(!summary.alert);
    }

    #[test]
    fn test_alert_below_threshold() {
        let summary = FlowSummary::from_decisions(&[flow(5), storage(15)], 60.0);
        assert_eq!(summary.flow_through_pct, 25.0);
        assert!(summary.alert);
    }

    #[test]
    fn test_reversed_decisions_excluded() {
        let original = flow(18);
        let reversal = original.reversal("picked wrong order", Utc::now());
        let summary = FlowSummary::from_decisions(&[original, reversal, storage(6)], 60.0);
        assert_eq!(summary.flow_through_units, 0);
        assert_eq!(summary.total_units, 6);
        assert!(summary.alert);
    }

    #[test]
    fn test_empty_journal() {
        let summary = FlowSummary::from_decisions(&[], 60.0);
        assert_eq!(summary.total_units, 0);
        assert!(!summary.alert);
    }
}
