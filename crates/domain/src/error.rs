//! Domain error types.

use common::{DemandId, ExceptionId, ShipmentId, StoreId};
use thiserror::Error;

use crate::rules::RuleKind;

/// A rule threshold outside its valid domain.
///
/// Raised when a rule set is loaded; it is never silently replaced by a
/// default.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Invalid {rule} rule configuration: {value} ({reason})")]
pub struct RuleConfigurationError {
    pub rule: RuleKind,
    pub value: String,
    pub reason: &'static str,
}

/// Errors raised when a domain invariant or state transition is violated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    /// The record is not in a state that allows the requested action.
    #[error("Invalid state transition: cannot {action} {entity} in {current_state} state")]
    InvalidStateTransition {
        entity: &'static str,
        current_state: String,
        action: &'static str,
    },

    /// Quantities must be positive.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// A fill would push a demand past its requested quantity.
    #[error(
        "Demand {demand_id} cannot take {attempted} more units: {filled} of {requested} already filled"
    )]
    Overfill {
        demand_id: DemandId,
        requested: u32,
        filled: u32,
        attempted: u32,
    },

    /// A fill reversal exceeds what was filled.
    #[error("Demand {demand_id} cannot revert {attempted} units: only {filled} filled")]
    FillUnderflow {
        demand_id: DemandId,
        filled: u32,
        attempted: u32,
    },

    /// A reservation would push a scope past its limit.
    #[error("Capacity exceeded for {scope}: {reserved} of {limit} reserved, {requested} requested")]
    CapacityExceeded {
        scope: String,
        limit: u32,
        reserved: u32,
        requested: u32,
    },

    /// A new limit would sit below units already reserved.
    #[error("Cannot set {scope} limit to {limit}: {reserved} units already reserved")]
    LimitBelowReserved {
        scope: String,
        limit: u32,
        reserved: u32,
    },

    /// A release exceeds what is reserved.
    #[error("Cannot release {requested} units from {scope}: only {reserved} reserved")]
    ReleaseExceedsReserved {
        scope: String,
        reserved: u32,
        requested: u32,
    },

    /// The exception was already resolved.
    #[error("Exception {0} is already resolved")]
    ExceptionAlreadyResolved(ExceptionId),

    /// Resolution notes must carry text.
    #[error("Resolution note must not be empty")]
    EmptyResolutionNote,

    /// Resolutions must name who resolved them.
    #[error("Resolver identity must not be empty")]
    MissingResolver,

    /// Departure attempted before every assignment was scanned.
    #[error("Shipment {shipment_id} is not fully loaded: {scanned} of {total} items scanned")]
    IncompleteLoad {
        shipment_id: ShipmentId,
        scanned: u32,
        total: u32,
    },

    /// Loading cannot start on an empty shipment.
    #[error("Shipment {0} has no store assignments")]
    NoAssignments(ShipmentId),

    /// An assignment would load more units than the trailer holds.
    #[error(
        "Shipment {shipment_id} cannot take {requested} more units: {used} of {capacity} used"
    )]
    ShipmentOverCapacity {
        shipment_id: ShipmentId,
        capacity: u32,
        used: u32,
        requested: u32,
    },

    /// The store is not a stop on the shipment's route.
    #[error("Store {store} is not on the route of shipment {shipment_id}")]
    StoreNotOnRoute {
        shipment_id: ShipmentId,
        store: StoreId,
    },

    /// No assignment exists for the store on this shipment.
    #[error("Shipment {shipment_id} has no assignment for store {store}")]
    StoreNotAssigned {
        shipment_id: ShipmentId,
        store: StoreId,
    },

    /// A scan would exceed the assigned quantity.
    #[error(
        "Scanning {count} items for store {store} on {shipment_id} exceeds the assignment ({scanned} of {quantity} scanned)"
    )]
    ScanExceedsAssignment {
        shipment_id: ShipmentId,
        store: StoreId,
        scanned: u32,
        quantity: u32,
        count: u32,
    },

    /// An invalid rule threshold.
    #[error(transparent)]
    RuleConfiguration(#[from] RuleConfigurationError),
}
