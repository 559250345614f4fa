//! Outbound shipments and load progress.

use chrono::{DateTime, Utc};
use common::{ShipmentId, StoreId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// The status of an outbound shipment.
///
/// State transitions (forward only):
/// ```text
/// Scheduled ──► Loading ──► Departed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum ShipmentStatus {
    #[default]
    Scheduled,
    Loading,
    Departed,
}

impl ShipmentStatus {
    /// Returns true if assignments can still be added.
    pub fn accepts_assignments(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if loading can begin.
    pub fn can_start_loading(&self) -> bool {
        matches!(self, ShipmentStatus::Scheduled)
    }

    /// Returns true if items can be scanned onto the truck.
    pub fn can_scan(&self) -> bool {
        matches!(self, ShipmentStatus::Loading)
    }

    /// Returns true if the truck can depart.
    pub fn can_depart(&self) -> bool {
        matches!(self, ShipmentStatus::Loading)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ShipmentStatus::Departed)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentStatus::Scheduled => "Scheduled",
            ShipmentStatus::Loading => "Loading",
            ShipmentStatus::Departed => "Departed",
        }
    }
}

impl std::fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Aggregate quantity bound for one store on one departure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreAssignment {
    pub store: StoreId,
    pub quantity: u32,
    pub weight_g: u64,
    pub volume_cm3: u64,
    #[serde(default)]
    pub scanned: u32,
}

impl StoreAssignment {
    /// Creates an unscanned assignment.
    pub fn new(store: impl Into<StoreId>, quantity: u32, weight_g: u64, volume_cm3: u64) -> Self {
        Self {
            store: store.into(),
            quantity,
            weight_g,
            volume_cm3,
            scanned: 0,
        }
    }

    /// Returns true once every item is scanned.
    pub fn is_loaded(&self) -> bool {
        self.scanned == self.quantity
    }
}

/// Derived capacity use of a shipment. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utilization {
    pub used_units: u32,
    pub total_units: u32,
    pub weight_g: u64,
    pub volume_cm3: u64,
}

impl Utilization {
    /// Used share of unit capacity, in percent.
    pub fn percent(&self) -> f64 {
        if self.total_units == 0 {
            0.0
        } else {
            f64::from(self.used_units) * 100.0 / f64::from(self.total_units)
        }
    }
}

/// Scan progress towards departure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadProgress {
    pub scanned: u32,
    pub total: u32,
}

impl LoadProgress {
    /// Scanned share, in percent (100 for an empty load).
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            f64::from(self.scanned) * 100.0 / f64::from(self.total)
        }
    }

    /// Returns true when every item is scanned.
    pub fn is_complete(&self) -> bool {
        self.scanned == self.total
    }
}

/// A truck departure serving a list of stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    pub id: ShipmentId,
    pub route: String,
    pub scheduled_departure: DateTime<Utc>,
    #[serde(default)]
    pub status: ShipmentStatus,
    pub capacity_units: u32,

    /// Stores on the route.
    pub stops: Vec<StoreId>,

    #[serde(default)]
    pub assignments: Vec<StoreAssignment>,

    #[serde(default)]
    pub departed_at: Option<DateTime<Utc>>,
}

impl Shipment {
    /// Creates a scheduled shipment with no assignments.
    pub fn scheduled(
        id: impl Into<ShipmentId>,
        route: impl Into<String>,
        scheduled_departure: DateTime<Utc>,
        capacity_units: u32,
        stops: Vec<StoreId>,
    ) -> Self {
        Self {
            id: id.into(),
            route: route.into(),
            scheduled_departure,
            status: ShipmentStatus::Scheduled,
            capacity_units,
            stops,
            assignments: Vec::new(),
            departed_at: None,
        }
    }

    /// Returns true if the store is a stop on this route.
    pub fn serves(&self, store: &StoreId) -> bool {
        self.stops.contains(store)
    }

    /// Adds units for a store, merging into an existing assignment. The
    /// total may not exceed the trailer's unit capacity.
    pub fn assign(&mut self, assignment: StoreAssignment) -> Result<(), DomainError> {
        if !self.status.accepts_assignments() {
            return Err(self.invalid("assign to"));
        }
        if assignment.quantity == 0 {
            return Err(DomainError::InvalidQuantity { quantity: 0 });
        }
        if !self.serves(&assignment.store) {
            return Err(DomainError::StoreNotOnRoute {
                shipment_id: self.id.clone(),
                store: assignment.store,
            });
        }
        let used = self.utilization().used_units;
        if used.saturating_add(assignment.quantity) > self.capacity_units {
            return Err(DomainError::ShipmentOverCapacity {
                shipment_id: self.id.clone(),
                capacity: self.capacity_units,
                used,
                requested: assignment.quantity,
            });
        }

        match self
            .assignments
            .iter_mut()
            .find(|a| a.store == assignment.store)
        {
            Some(existing) => {
                existing.quantity += assignment.quantity;
                existing.weight_g += assignment.weight_g;
                existing.volume_cm3 += assignment.volume_cm3;
            }
            None => self.assignments.push(assignment),
        }
        Ok(())
    }

    /// Scheduled → Loading; requires at least one assignment.
    pub fn start_loading(&mut self) -> Result<(), DomainError> {
        if !self.status.can_start_loading() {
            return Err(self.invalid("start loading"));
        }
        if self.assignments.is_empty() {
            return Err(DomainError::NoAssignments(self.id.clone()));
        }
        self.status = ShipmentStatus::Loading;
        Ok(())
    }

    /// Records scanned items for a store while loading.
    pub fn record_scan(&mut self, store: &StoreId, count: u32) -> Result<(), DomainError> {
        if !self.status.can_scan() {
            return Err(self.invalid("scan items onto"));
        }
        if count == 0 {
            return Err(DomainError::InvalidQuantity { quantity: 0 });
        }
        let shipment_id = self.id.clone();
        let assignment = self
            .assignments
            .iter_mut()
            .find(|a| &a.store == store)
            .ok_or_else(|| DomainError::StoreNotAssigned {
                shipment_id: shipment_id.clone(),
                store: store.clone(),
            })?;

        if assignment.scanned + count > assignment.quantity {
            return Err(DomainError::ScanExceedsAssignment {
                shipment_id,
                store: store.clone(),
                scanned: assignment.scanned,
                quantity: assignment.quantity,
                count,
            });
        }
        assignment.scanned += count;
        Ok(())
    }

    /// Loading → Departed; requires every assignment fully scanned.
    pub fn depart(&mut self, at: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.status.can_depart() {
            return Err(self.invalid("depart"));
        }
        let progress = self.progress();
        if !self.assignments.iter().all(StoreAssignment::is_loaded) {
            return Err(DomainError::IncompleteLoad {
                shipment_id: self.id.clone(),
                scanned: progress.scanned,
                total: progress.total,
            });
        }
        self.status = ShipmentStatus::Departed;
        self.departed_at = Some(at);
        Ok(())
    }

    /// Moves to `next`, enforcing the forward-only state machine.
    pub fn advance_to(&mut self, next: ShipmentStatus, at: DateTime<Utc>) -> Result<(), DomainError> {
        match next {
            ShipmentStatus::Loading => self.start_loading(),
            ShipmentStatus::Departed => self.depart(at),
            ShipmentStatus::Scheduled => Err(self.invalid("return to scheduled")),
        }
    }

    /// Items scanned vs assigned.
    pub fn progress(&self) -> LoadProgress {
        LoadProgress {
            scanned: self.assignments.iter().map(|a| a.scanned).sum(),
            total: self.assignments.iter().map(|a| a.quantity).sum(),
        }
    }

    /// Capacity use recomputed from assignments.
    pub fn utilization(&self) -> Utilization {
        Utilization {
            used_units: self.assignments.iter().map(|a| a.quantity).sum(),
            total_units: self.capacity_units,
            weight_g: self.assignments.iter().map(|a| a.weight_g).sum(),
            volume_cm3: self.assignments.iter().map(|a| a.volume_cm3).sum(),
        }
    }

    fn invalid(&self, action: &'static str) -> DomainError {
        DomainError::InvalidStateTransition {
            entity: "shipment",
            current_state: self.status.to_string(),
            action,
        }
    }
}
