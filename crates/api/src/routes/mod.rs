//! HTTP handlers, grouped by resource.

pub mod catalog;
pub mod exceptions;
pub mod health;
pub mod lots;
pub mod metrics;
pub mod shipments;

use std::collections::HashMap;

use common::LotId;
use engine::{CancellationToken, CrossDock};
use tokio::sync::Mutex;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub dock: CrossDock,

    /// Cancellation handles for allocations currently running.
    pub in_flight: Mutex<HashMap<LotId, CancellationToken>>,
}

impl AppState {
    pub fn new(dock: CrossDock) -> Self {
        Self {
            dock,
            in_flight: Mutex::new(HashMap::new()),
        }
    }
}
