use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an allocation decision.
///
/// Decisions are immutable journal entries, so their identity is a random
/// UUID rather than a business code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecisionId(Uuid);

impl DecisionId {
    /// Creates a new random decision ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a decision ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for DecisionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DecisionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for DecisionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<DecisionId> for Uuid {
    fn from(id: DecisionId) -> Self {
        id.0
    }
}

/// Declares a string-backed business identifier.
///
/// Warehouse records are keyed by codes assigned upstream (`SKU-5892`,
/// `ST-103`, `TRK-3821`), so these wrap a `String` and order lexically.
macro_rules! code_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates the identifier from a string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

code_id!(
    /// Catalog code of a stock keeping unit.
    SkuCode
);
code_id!(
    /// Identifier of an inbound lot (one SKU from one inbound shipment).
    LotId
);
code_id!(
    /// Identifier of a store order.
    DemandId
);
code_id!(
    /// Identifier of a destination store.
    StoreId
);
code_id!(
    /// Identifier of an outbound shipment (truck departure).
    ShipmentId
);
code_id!(
    /// Identifier of an exception record.
    ExceptionId
);
code_id!(
    /// Warehouse location code (storage area, dock door, lane).
    LocationCode
);

/// Version counter used for optimistic concurrency control.
///
/// Every successful mutation of a versioned record increments it; writers
/// that present a stale version are rejected.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    /// Creates a version from a raw value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the initial version of a freshly stored record.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the version following this one.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_id_new_creates_unique_ids() {
        let id1 = DecisionId::new();
        let id2 = DecisionId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn decision_id_from_uuid_preserves_value() {
        let uuid = Uuid::new_v4();
        let id = DecisionId::from_uuid(uuid);
        assert_eq!(id.as_uuid(), uuid);
    }

    #[test]
    fn code_ids_order_lexically() {
        let mut ids = vec![DemandId::new("ORD-3"), DemandId::new("ORD-1"), DemandId::new("ORD-2")];
        ids.sort();
        assert_eq!(ids[0].as_str(), "ORD-1");
        assert_eq!(ids[2].as_str(), "ORD-3");
    }

    #[test]
    fn code_id_serializes_as_plain_string() {
        let sku = SkuCode::new("SKU-5892");
        let json = serde_json::to_string(&sku).unwrap();
        assert_eq!(json, "\"SKU-5892\"");
    }

    #[test]
    fn version_increments() {
        let v = Version::initial();
        assert_eq!(v.next(), Version::new(1));
        assert!(v < v.next());
    }
}
