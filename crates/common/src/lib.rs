//! Shared identifier types for the cross-dock allocation engine.

mod types;

pub use types::{
    DecisionId, DemandId, ExceptionId, LocationCode, LotId, ShipmentId, SkuCode, StoreId, Version,
};
