//! Domain layer for the cross-dock allocation engine.
//!
//! This crate holds the data model and its invariants:
//! - SKU master data and store inventory positions
//! - Inbound lots, store demand and capacity constraints
//! - Allocation decisions and plans
//! - Exception records and shipment load state machines
//! - Flow-through eligibility rules

pub mod capacity;
pub mod decision;
pub mod demand;
pub mod error;
pub mod exception;
pub mod inventory;
pub mod lot;
pub mod rules;
pub mod shipment;
pub mod sku;

pub use capacity::{CapacityConstraint, CapacityKind, CapacityState, ScopeKey};
pub use decision::{AllocationDecision, AllocationPlan, DecisionTarget, UnallocatedReason};
pub use demand::{DemandStatus, StoreDemand};
pub use error::{DomainError, RuleConfigurationError};
pub use exception::{
    ExceptionKind, ExceptionRecord, ExceptionStatus, NewException, Resolution, Severity,
};
pub use inventory::{InventorySnapshot, StoreInventory};
pub use lot::{InboundLot, LotStatus};
pub use rules::{Rule, RuleContext, RuleKind, RuleSet};
pub use shipment::{LoadProgress, Shipment, ShipmentStatus, StoreAssignment, Utilization};
pub use sku::{Dimensions, Sku};
