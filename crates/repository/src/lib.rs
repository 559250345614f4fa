//! Repository contracts for the cross-dock engine.
//!
//! Each contract is an `async_trait` trait so the engine can be wired to
//! any persistence technology. The `InMemory*` implementations are
//! thread-safe and back the tests and the demo server.

pub mod capacity;
pub mod catalog;
pub mod decision;
pub mod demand;
pub mod error;
pub mod exception;
pub mod inventory;
pub mod lot;
pub mod shipment;

pub use capacity::{CapacityRepository, InMemoryCapacityRepository, ReserveOutcome};
pub use catalog::{CatalogRepository, InMemoryCatalogRepository};
pub use decision::{DecisionRepository, InMemoryDecisionRepository};
pub use demand::{DemandRepository, InMemoryDemandRepository};
pub use error::{RepositoryError, Result};
pub use exception::{ExceptionRepository, InMemoryExceptionRepository};
pub use inventory::{InMemoryInventoryRepository, InventoryRepository};
pub use lot::{InMemoryLotRepository, LotRepository};
pub use shipment::{InMemoryShipmentRepository, ShipmentRepository};

/// One in-memory instance of every repository.
///
/// Cloning shares the underlying stores.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepositories {
    pub catalog: InMemoryCatalogRepository,
    pub demands: InMemoryDemandRepository,
    pub capacity: InMemoryCapacityRepository,
    pub exceptions: InMemoryExceptionRepository,
    pub shipments: InMemoryShipmentRepository,
    pub decisions: InMemoryDecisionRepository,
    pub lots: InMemoryLotRepository,
    pub inventory: InMemoryInventoryRepository,
}

impl InMemoryRepositories {
    /// Creates an empty set of repositories.
    pub fn new() -> Self {
        Self::default()
    }
}
