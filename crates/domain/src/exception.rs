//! Exception records and their resolution lifecycle.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use common::{DemandId, ExceptionId, LotId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Category of a cross-dock exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExceptionKind {
    QuantityVariance,
    DamagedItems,
    MissingDocumentation,
    AllocationFailure,
    IncorrectSku,
}

impl ExceptionKind {
    /// Severity assigned when the raiser does not override it.
    pub fn default_severity(&self) -> Severity {
        match self {
            ExceptionKind::QuantityVariance | ExceptionKind::AllocationFailure => Severity::High,
            ExceptionKind::DamagedItems | ExceptionKind::IncorrectSku => Severity::Medium,
            ExceptionKind::MissingDocumentation => Severity::Low,
        }
    }

    /// Display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExceptionKind::QuantityVariance => "Quantity Variance",
            ExceptionKind::DamagedItems => "Damaged Items",
            ExceptionKind::MissingDocumentation => "Missing Documentation",
            ExceptionKind::AllocationFailure => "Allocation Failure",
            ExceptionKind::IncorrectSku => "Incorrect SKU",
        }
    }

    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            ExceptionKind::QuantityVariance => "quantity_variance",
            ExceptionKind::DamagedItems => "damaged_items",
            ExceptionKind::MissingDocumentation => "missing_documentation",
            ExceptionKind::AllocationFailure => "allocation_failure",
            ExceptionKind::IncorrectSku => "incorrect_sku",
        }
    }
}

impl std::fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Exception severity. Declaration order is sort order: High first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    High,
    Medium,
    Low,
}

/// Exception status. `Open ──► Resolved` is the only transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum ExceptionStatus {
    #[default]
    Open,
    Resolved,
}

impl ExceptionStatus {
    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExceptionStatus::Open => "Open",
            ExceptionStatus::Resolved => "Resolved",
        }
    }
}

impl std::fmt::Display for ExceptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Everything needed to raise an exception; the repository assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewException {
    pub kind: ExceptionKind,
    pub severity: Severity,
    pub lot: Option<LotId>,
    pub demand: Option<DemandId>,
    pub description: String,

    /// Units affected, where the exception concerns a quantity.
    pub quantity: Option<u32>,
}

impl NewException {
    /// Creates an exception with the kind's default severity.
    pub fn new(kind: ExceptionKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            lot: None,
            demand: None,
            description: description.into(),
            quantity: None,
        }
    }

    /// Sets the originating lot.
    pub fn for_lot(mut self, lot: LotId) -> Self {
        self.lot = Some(lot);
        self
    }

    /// Sets the originating demand.
    pub fn for_demand(mut self, demand: DemandId) -> Self {
        self.demand = Some(demand);
        self
    }

    /// Sets the affected quantity.
    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = Some(quantity);
        self
    }

    /// Overrides the severity.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

/// How an exception was closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub resolver: String,
    pub note: String,
    pub resolved_at: DateTime<Utc>,
}

/// A stored exception. Never deleted; resolved records stay for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionRecord {
    pub id: ExceptionId,
    pub kind: ExceptionKind,
    pub severity: Severity,
    pub status: ExceptionStatus,
    pub lot: Option<LotId>,
    pub demand: Option<DemandId>,
    pub description: String,
    pub quantity: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub resolution: Option<Resolution>,
}

impl ExceptionRecord {
    /// Materialises a new exception as Open.
    pub fn open(id: ExceptionId, new: NewException, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            kind: new.kind,
            severity: new.severity,
            status: ExceptionStatus::Open,
            lot: new.lot,
            demand: new.demand,
            description: new.description,
            quantity: new.quantity,
            created_at,
            resolution: None,
        }
    }

    /// Returns true while the exception awaits resolution.
    pub fn is_open(&self) -> bool {
        self.status == ExceptionStatus::Open
    }

    /// Records the resolver's disposition and closes the exception.
    pub fn resolve(
        &mut self,
        resolver: &str,
        note: &str,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !self.is_open() {
            return Err(DomainError::ExceptionAlreadyResolved(self.id.clone()));
        }
        if resolver.trim().is_empty() {
            return Err(DomainError::MissingResolver);
        }
        if note.trim().is_empty() {
            return Err(DomainError::EmptyResolutionNote);
        }

        self.status = ExceptionStatus::Resolved;
        self.resolution = Some(Resolution {
            resolver: resolver.trim().to_string(),
            note: note.trim().to_string(),
            resolved_at: at,
        });
        Ok(())
    }

    /// Queue order: Open before Resolved, then severity, then age, then id.
    pub fn queue_cmp(&self, other: &Self) -> Ordering {
        self.status
            .cmp(&other.status)
            .then(self.severity.cmp(&other.severity))
            .then(self.created_at.cmp(&other.created_at))
            .then_with(|| self.id.cmp(&other.id))
    }

    /// Case-insensitive match on id, kind, references and description.
    pub fn matches_text(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        let hay = [
            Some(self.id.as_str()),
            Some(self.kind.as_str()),
            self.lot.as_ref().map(|l| l.as_str()),
            self.demand.as_ref().map(|d| d.as_str()),
            Some(self.description.as_str()),
        ];
        hay.into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&query))
    }
}
