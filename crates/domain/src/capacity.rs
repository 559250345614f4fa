//! Capacity constraints and reservation accounting.

use chrono::{DateTime, Utc};
use common::{LocationCode, StoreId, Version};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// What kind of capacity a constraint governs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CapacityKind {
    /// Put-away volume in a storage area.
    Storage,
    /// Door / truck slots on an outbound lane.
    Outbound,
}

impl CapacityKind {
    /// Returns the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CapacityKind::Storage => "storage",
            CapacityKind::Outbound => "outbound",
        }
    }
}

/// The key under which capacity is reserved: a location and a kind.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScopeKey {
    pub location: LocationCode,
    pub kind: CapacityKind,
}

impl ScopeKey {
    /// Creates a scope key.
    pub fn new(location: impl Into<LocationCode>, kind: CapacityKind) -> Self {
        Self {
            location: location.into(),
            kind,
        }
    }

    /// Storage scope for a storage location.
    pub fn storage(location: impl Into<LocationCode>) -> Self {
        Self::new(location, CapacityKind::Storage)
    }

    /// Outbound lane serving a destination store.
    pub fn outbound_lane(store: &StoreId) -> Self {
        Self::new(store.as_str(), CapacityKind::Outbound)
    }
}

impl std::fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.location, self.kind.as_str())
    }
}

/// A configured capacity limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityConstraint {
    pub id: String,
    pub scope: ScopeKey,
    pub limit: u32,
    pub unit: String,
    pub effective_from: Option<DateTime<Utc>>,
}

impl CapacityConstraint {
    /// Creates a constraint measured in units.
    pub fn new(id: impl Into<String>, scope: ScopeKey, limit: u32) -> Self {
        Self {
            id: id.into(),
            scope,
            limit,
            unit: "units".to_string(),
            effective_from: None,
        }
    }
}

/// Live reservation state of one scope.
///
/// Invariant: `reserved <= constraint.limit`. Every change bumps `version`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityState {
    pub constraint: CapacityConstraint,
    pub reserved: u32,
    pub version: Version,
}

impl CapacityState {
    /// Creates an empty ledger entry for a constraint.
    pub fn new(constraint: CapacityConstraint) -> Self {
        Self {
            constraint,
            reserved: 0,
            version: Version::initial(),
        }
    }

    /// Units still available.
    pub fn available(&self) -> u32 {
        self.constraint.limit.saturating_sub(self.reserved)
    }

    /// Reserves units; fails without change if the limit would be exceeded.
    pub fn reserve(&mut self, amount: u32) -> Result<(), DomainError> {
        if amount == 0 {
            return Err(DomainError::InvalidQuantity { quantity: amount });
        }
        if amount > self.available() {
            return Err(DomainError::CapacityExceeded {
                scope: self.constraint.scope.to_string(),
                limit: self.constraint.limit,
                reserved: self.reserved,
                requested: amount,
            });
        }
        self.reserved += amount;
        self.version = self.version.next();
        Ok(())
    }

    /// Swaps in a new constraint for the same scope. Reserved units carry
    /// over, so the new limit must still cover them.
    pub fn reconfigure(&mut self, constraint: CapacityConstraint) -> Result<(), DomainError> {
        if constraint.limit < self.reserved {
            return Err(DomainError::LimitBelowReserved {
                scope: self.constraint.scope.to_string(),
                limit: constraint.limit,
                reserved: self.reserved,
            });
        }
        self.constraint = constraint;
        self.version = self.version.next();
        Ok(())
    }

    /// Releases previously reserved units.
    pub fn release(&mut self, amount: u32) -> Result<(), DomainError> {
        if amount > self.reserved {
            return Err(DomainError::ReleaseExceedsReserved {
                scope: self.constraint.scope.to_string(),
                reserved: self.reserved,
                requested: amount,
            });
        }
        self.reserved -= amount;
        self.version = self.version.next();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lane(limit: u32) -> CapacityState {
        CapacityState::new(CapacityConstraint::new(
            "CAP-1",
            ScopeKey::outbound_lane(&StoreId::new("ST-103")),
            limit,
        ))
    }

    #[test]
    fn test_reserve_within_limit() {
        let mut state = lane(10);
        state.reserve(7).unwrap();
        assert_eq!(state.available(), 3);
        assert_eq!(state.version, Version::new(1));
    }

    #[test]
    fn test_reserve_beyond_limit_leaves_state_unchanged() {
        let mut state = lane(10);
        state.reserve(7).unwrap();
        let err = state.reserve(4).unwrap_err();
        assert!(matches!(err, DomainError::CapacityExceeded { requested: 4, .. }));
        assert_eq!(state.reserved, 7);
        assert_eq!(state.version, Version::new(1));
    }

    #[test]
    fn test_release() {
        let mut state = lane(10);
        state.reserve(5).unwrap();
        state.release(5).unwrap();
        assert_eq!(state.available(), 10);
        assert!(state.release(1).is_err());
    }

    #[test]
    fn test_reconfigure_keeps_reserved_within_limit() {
        let mut state = lane(20);
        state.reserve(18).unwrap();

        let lowered = CapacityConstraint::new("CAP-1", state.constraint.scope.clone(), 5);
        let err = state.reconfigure(lowered).unwrap_err();
        assert!(matches!(
            err,
            DomainError::LimitBelowReserved { limit: 5, reserved: 18, .. }
        ));
        assert_eq!(state.constraint.limit, 20);
        assert_eq!(state.version, Version::new(1));

        let raised = CapacityConstraint::new("CAP-2", state.constraint.scope.clone(), 18);
        state.reconfigure(raised).unwrap();
        assert_eq!(state.available(), 0);
        assert_eq!(state.version, Version::new(2));
    }

    #[test]
    fn test_scope_display() {
        assert_eq!(ScopeKey::storage("STORAGE-MAIN").to_string(), "STORAGE-MAIN/storage");
    }
}
