//! Store demand (orders) and fill accounting.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use common::{DemandId, SkuCode, StoreId, Version};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// The fill status of a store demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DemandStatus {
    #[default]
    Open,
    PartiallyFilled,
    Filled,
    Cancelled,
}

impl DemandStatus {
    /// Returns true if the demand can still receive units.
    pub fn accepts_fill(&self) -> bool {
        matches!(self, DemandStatus::Open | DemandStatus::PartiallyFilled)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            DemandStatus::Open => "Open",
            DemandStatus::PartiallyFilled => "PartiallyFilled",
            DemandStatus::Filled => "Filled",
            DemandStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for DemandStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An open store order for a SKU.
///
/// Invariant: `quantity_filled <= quantity_requested`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreDemand {
    pub id: DemandId,
    pub sku: SkuCode,
    pub store: StoreId,
    pub quantity_requested: u32,
    #[serde(default)]
    pub quantity_filled: u32,
    pub due_date: DateTime<Utc>,

    /// Ordinal urgency, lower is more urgent.
    pub priority_level: u8,

    #[serde(default)]
    pub status: DemandStatus,

    #[serde(default)]
    pub version: Version,
}

impl StoreDemand {
    /// Creates an open, unfilled demand.
    pub fn new(
        id: impl Into<DemandId>,
        sku: impl Into<SkuCode>,
        store: impl Into<StoreId>,
        quantity_requested: u32,
        due_date: DateTime<Utc>,
        priority_level: u8,
    ) -> Self {
        Self {
            id: id.into(),
            sku: sku.into(),
            store: store.into(),
            quantity_requested,
            quantity_filled: 0,
            due_date,
            priority_level,
            status: DemandStatus::Open,
            version: Version::initial(),
        }
    }

    /// Units still wanted.
    pub fn shortfall(&self) -> u32 {
        self.quantity_requested - self.quantity_filled
    }

    /// Returns true if the demand can still draw units.
    pub fn is_open(&self) -> bool {
        self.status.accepts_fill() && self.shortfall() > 0
    }

    /// Adds filled units, keeping the fill invariant.
    pub fn fill(&mut self, quantity: u32) -> Result<(), DomainError> {
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity { quantity });
        }
        if !self.status.accepts_fill() {
            return Err(DomainError::InvalidStateTransition {
                entity: "demand",
                current_state: self.status.to_string(),
                action: "fill",
            });
        }
        if quantity > self.shortfall() {
            return Err(DomainError::Overfill {
                demand_id: self.id.clone(),
                requested: self.quantity_requested,
                filled: self.quantity_filled,
                attempted: quantity,
            });
        }

        self.quantity_filled += quantity;
        self.refresh_status();
        self.version = self.version.next();
        Ok(())
    }

    /// Removes previously filled units (reversal or rollback).
    pub fn revert_fill(&mut self, quantity: u32) -> Result<(), DomainError> {
        if quantity > self.quantity_filled {
            return Err(DomainError::FillUnderflow {
                demand_id: self.id.clone(),
                filled: self.quantity_filled,
                attempted: quantity,
            });
        }

        self.quantity_filled -= quantity;
        if self.status != DemandStatus::Cancelled {
            self.refresh_status();
        }
        self.version = self.version.next();
        Ok(())
    }

    fn refresh_status(&mut self) {
        self.status = if self.quantity_filled == 0 {
            DemandStatus::Open
        } else if self.quantity_filled < self.quantity_requested {
            DemandStatus::PartiallyFilled
        } else {
            DemandStatus::Filled
        };
    }

    /// Allocation ranking: priority, then due date, then id.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        self.priority_level
            .cmp(&other.priority_level)
            .then(self.due_date.cmp(&other.due_date))
            .then_with(|| self.id.cmp(&other.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn demand(id: &str, priority: u8, due_in_days: i64) -> StoreDemand {
        StoreDemand::new(
            id,
            "SKU-1",
            "ST-103",
            18,
            Utc::now() + Duration::days(due_in_days),
            priority,
        )
    }

    #[test]
    fn test_fill_updates_status_and_version() {
        let mut d = demand("ORD-1", 1, 2);
        d.fill(10).unwrap();
        assert_eq!(d.status, DemandStatus::PartiallyFilled);
        assert_eq!(d.shortfall(), 8);
        assert_eq!(d.version, Version::new(1));

        d.fill(8).unwrap();
        assert_eq!(d.status, DemandStatus::Filled);
        assert!(!d.is_open());
    }

    #[test]
    fn test_overfill_rejected() {
        let mut d = demand("ORD-1", 1, 2);
        d.fill(15).unwrap();
        let err = d.fill(4).unwrap_err();
        assert!(matches!(err, DomainError::Overfill { filled: 15, attempted: 4, .. }));
        assert_eq!(d.quantity_filled, 15);
    }

    #[test]
    fn test_cancelled_demand_rejects_fill() {
        let mut d = demand("ORD-1", 1, 2);
        d.status = DemandStatus::Cancelled;
        assert!(d.fill(1).is_err());
    }

    #[test]
    fn test_revert_fill() {
        let mut d = demand("ORD-1", 1, 2);
        d.fill(18).unwrap();
        d.revert_fill(18).unwrap();
        assert_eq!(d.status, DemandStatus::Open);
        assert!(matches!(
            d.revert_fill(1),
            Err(DomainError::FillUnderflow { .. })
        ));
    }

    #[test]
    fn test_ranking_priority_then_due_then_id() {
        let urgent = demand("ORD-9", 1, 5);
        let soon = demand("ORD-2", 2, 1);
        let later = demand("ORD-1", 2, 3);
        let tie = StoreDemand {
            id: DemandId::new("ORD-3"),
            ..soon.clone()
        };

        let mut all = vec![later.clone(), tie.clone(), soon.clone(), urgent.clone()];
        all.sort_by(StoreDemand::rank_cmp);
        let ids: Vec<_> = all.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["ORD-9", "ORD-2", "ORD-3", "ORD-1"]);
    }
}
