//! Cross-dock allocation engine.
//!
//! Classifies inbound lots as flow-through or storage, matches flow-through
//! quantity to ranked store demand under outbound capacity, raises and
//! resolves exceptions, and tracks outbound shipments to departure.
//!
//! The engine holds no global state: every record lives behind the
//! repository contracts of the `repository` crate.

pub mod allocator;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod exceptions;
pub mod ledger;
pub mod loader;
pub mod receiving;
pub mod rule_engine;
pub mod summary;

pub use allocator::Allocator;
pub use config::{ConfigError, EngineConfig};
pub use coordinator::{CrossDock, ReceiptOutcome, Repositories};
pub use error::{EngineError, Result};
pub use exceptions::ExceptionManager;
pub use ledger::CapacityLedger;
pub use loader::ShipmentLoader;
pub use receiving::{Finding, ReceiptInspection};
pub use rule_engine::{EligibilityResult, EligibleDemand, RuleEngine};
pub use summary::FlowSummary;

pub use tokio_util::sync::CancellationToken;
