//! Inbound lots and their lifecycle.

use chrono::{DateTime, Utc};
use common::{ExceptionId, LocationCode, LotId, SkuCode};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// The status of an inbound lot.
///
/// State transitions:
/// ```text
/// Scheduled ──► Arrived ──► Processing ──► Closed
///                  ▲            │
///                  └────────────┘  (allocation cancelled or failed)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LotStatus {
    /// Announced but not yet at the dock.
    #[default]
    Scheduled,

    /// Received and inspected, waiting for allocation.
    Arrived,

    /// Allocation in progress.
    Processing,

    /// Entire quantity accounted for by decisions (terminal state).
    Closed,
}

impl LotStatus {
    /// Returns true if the lot can be marked as arrived.
    pub fn can_arrive(&self) -> bool {
        matches!(self, LotStatus::Scheduled)
    }

    /// Returns true if allocation can start.
    pub fn can_process(&self) -> bool {
        matches!(self, LotStatus::Arrived)
    }

    /// Returns true if the lot can be closed.
    pub fn can_close(&self) -> bool {
        matches!(self, LotStatus::Processing)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LotStatus::Closed)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            LotStatus::Scheduled => "Scheduled",
            LotStatus::Arrived => "Arrived",
            LotStatus::Processing => "Processing",
            LotStatus::Closed => "Closed",
        }
    }
}

impl std::fmt::Display for LotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A receivable quantity of one SKU from one inbound shipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundLot {
    pub id: LotId,
    pub sku: SkuCode,

    /// Usable quantity received (damaged units excluded).
    pub quantity: u32,

    pub source_location: LocationCode,
    pub expected_at: Option<DateTime<Utc>>,
    pub arrived_at: Option<DateTime<Utc>>,
    pub status: LotStatus,

    /// Open exception that blocks allocation (missing paperwork, unknown SKU).
    #[serde(default)]
    pub hold: Option<ExceptionId>,
}

impl InboundLot {
    /// Creates a scheduled lot.
    pub fn scheduled(
        id: impl Into<LotId>,
        sku: impl Into<SkuCode>,
        quantity: u32,
        source_location: impl Into<LocationCode>,
    ) -> Self {
        Self {
            id: id.into(),
            sku: sku.into(),
            quantity,
            source_location: source_location.into(),
            expected_at: None,
            arrived_at: None,
            status: LotStatus::Scheduled,
            hold: None,
        }
    }

    /// Creates a lot that has already arrived.
    pub fn arrived(
        id: impl Into<LotId>,
        sku: impl Into<SkuCode>,
        quantity: u32,
        source_location: impl Into<LocationCode>,
        arrived_at: DateTime<Utc>,
    ) -> Self {
        let mut lot = Self::scheduled(id, sku, quantity, source_location);
        lot.arrived_at = Some(arrived_at);
        lot.status = LotStatus::Arrived;
        lot
    }

    /// Records arrival at the dock.
    pub fn arrive(&mut self, at: DateTime<Utc>) -> Result<(), DomainError> {
        self.transition(LotStatus::can_arrive, "arrive")?;
        self.arrived_at = Some(at);
        self.status = LotStatus::Arrived;
        Ok(())
    }

    /// Starts allocation.
    pub fn begin_processing(&mut self) -> Result<(), DomainError> {
        self.transition(LotStatus::can_process, "process")?;
        self.status = LotStatus::Processing;
        Ok(())
    }

    /// Returns an in-flight lot to Arrived after an aborted allocation.
    pub fn abandon_processing(&mut self) -> Result<(), DomainError> {
        self.transition(|s| matches!(s, LotStatus::Processing), "abandon processing of")?;
        self.status = LotStatus::Arrived;
        Ok(())
    }

    /// Closes the lot once fully allocated.
    pub fn close(&mut self) -> Result<(), DomainError> {
        self.transition(LotStatus::can_close, "close")?;
        self.status = LotStatus::Closed;
        Ok(())
    }

    /// Applies the lifecycle step into `next`, provided the lot is still in
    /// `expected`. Stores use this to claim a lot under their own lock.
    pub fn move_to(&mut self, expected: LotStatus, next: LotStatus) -> Result<(), DomainError> {
        self.transition(|s| *s == expected, "claim")?;
        match next {
            LotStatus::Processing => self.begin_processing(),
            LotStatus::Closed => self.close(),
            LotStatus::Arrived => self.abandon_processing(),
            LotStatus::Scheduled => Err(DomainError::InvalidStateTransition {
                entity: "lot",
                current_state: self.status.to_string(),
                action: "reschedule",
            }),
        }
    }

    fn transition(
        &self,
        allowed: impl Fn(&LotStatus) -> bool,
        action: &'static str,
    ) -> Result<(), DomainError> {
        if allowed(&self.status) {
            Ok(())
        } else {
            Err(DomainError::InvalidStateTransition {
                entity: "lot",
                current_state: self.status.to_string(),
                action,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_lifecycle() {
        let mut lot = InboundLot::scheduled("LOT-1", "SKU-1", 24, "DOCK-1");
        lot.arrive(Utc::now()).unwrap();
        lot.begin_processing().unwrap();
        lot.close().unwrap();
        assert_eq!(lot.status, LotStatus::Closed);
        assert!(lot.status.is_terminal());
    }

    #[test]
    fn test_cannot_process_scheduled_lot() {
        let mut lot = InboundLot::scheduled("LOT-1", "SKU-1", 24, "DOCK-1");
        let err = lot.begin_processing().unwrap_err();
        assert!(matches!(err, DomainError::InvalidStateTransition { .. }));
    }

    #[test]
    fn test_abandon_returns_to_arrived() {
        let mut lot = InboundLot::arrived("LOT-1", "SKU-1", 24, "DOCK-1", Utc::now());
        lot.begin_processing().unwrap();
        lot.abandon_processing().unwrap();
        assert_eq!(lot.status, LotStatus::Arrived);
        assert!(lot.abandon_processing().is_err());
    }

    #[test]
    fn test_closed_lot_cannot_reopen() {
        let mut lot = InboundLot::arrived("LOT-1", "SKU-1", 24, "DOCK-1", Utc::now());
        lot.begin_processing().unwrap();
        lot.close().unwrap();
        assert!(lot.begin_processing().is_err());
        assert!(lot.abandon_processing().is_err());
    }

    #[test]
    fn test_move_to_requires_expected_state() {
        let mut lot = InboundLot::arrived("LOT-1", "SKU-1", 24, "DOCK-1", Utc::now());
        lot.move_to(LotStatus::Arrived, LotStatus::Processing).unwrap();

        let err = lot
            .move_to(LotStatus::Arrived, LotStatus::Processing)
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidStateTransition { action: "claim", .. }));
        assert_eq!(lot.status, LotStatus::Processing);

        assert!(lot.move_to(LotStatus::Processing, LotStatus::Scheduled).is_err());
        lot.move_to(LotStatus::Processing, LotStatus::Closed).unwrap();
        assert_eq!(lot.status, LotStatus::Closed);
    }
}
