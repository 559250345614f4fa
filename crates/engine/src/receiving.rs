//! Receiving inspection: data-validation findings for an arriving lot.

use chrono::{DateTime, Utc};
use common::{LocationCode, LotId, SkuCode};
use domain::{DomainError, ExceptionKind, NewException};
use serde::{Deserialize, Serialize};

/// What the dock observed when a lot arrived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptInspection {
    pub lot_id: LotId,
    pub sku: SkuCode,
    pub declared_quantity: u32,
    pub received_quantity: u32,
    #[serde(default)]
    pub damaged_quantity: u32,
    #[serde(default = "default_documentation")]
    pub documentation_present: bool,
    pub source_location: LocationCode,
    #[serde(default = "Utc::now")]
    pub received_at: DateTime<Utc>,
}

fn default_documentation() -> bool {
    true
}

/// One discrepancy found during inspection.
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub exception: NewException,

    /// Whether the lot must wait for this exception before allocation.
    pub holds_lot: bool,
}

impl ReceiptInspection {
    /// Creates a clean inspection: declared and received agree, nothing
    /// damaged, paperwork present.
    pub fn clean(
        lot_id: impl Into<LotId>,
        sku: impl Into<SkuCode>,
        quantity: u32,
        source_location: impl Into<LocationCode>,
    ) -> Self {
        Self {
            lot_id: lot_id.into(),
            sku: sku.into(),
            declared_quantity: quantity,
            received_quantity: quantity,
            damaged_quantity: 0,
            documentation_present: true,
            source_location: source_location.into(),
            received_at: Utc::now(),
        }
    }

    /// Sets the received count.
    pub fn with_received(mut self, received: u32) -> Self {
        self.received_quantity = received;
        self
    }

    /// Sets the damaged count.
    pub fn with_damaged(mut self, damaged: u32) -> Self {
        self.damaged_quantity = damaged;
        self
    }

    /// Marks paperwork as missing.
    pub fn without_documentation(mut self) -> Self {
        self.documentation_present = false;
        self
    }

    /// Rejects counts that cannot describe a real receipt.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.damaged_quantity > self.received_quantity {
            return Err(DomainError::InvalidQuantity {
                quantity: self.damaged_quantity,
            });
        }
        Ok(())
    }

    /// Units that can be allocated.
    pub fn usable_quantity(&self) -> u32 {
        self.received_quantity.saturating_sub(self.damaged_quantity)
    }

    /// Discrepancies against the declaration and the catalog.
    pub fn findings(&self, sku_in_catalog: bool) -> Vec<Finding> {
        let mut findings = Vec::new();

        if !sku_in_catalog {
            findings.push(Finding {
                exception: NewException::new(
                    ExceptionKind::IncorrectSku,
                    format!("SKU {} is not in the catalog", self.sku),
                )
                .for_lot(self.lot_id.clone())
                .with_quantity(self.received_quantity),
                holds_lot: true,
            });
        }

        if self.received_quantity != self.declared_quantity {
            let difference = i64::from(self.received_quantity) - i64::from(self.declared_quantity);
            findings.push(Finding {
                exception: NewException::new(
                    ExceptionKind::QuantityVariance,
                    format!(
                        "Expected {} units, received {} (difference {difference:+})",
                        self.declared_quantity, self.received_quantity
                    ),
                )
                .for_lot(self.lot_id.clone())
                .with_quantity(difference.unsigned_abs() as u32),
                holds_lot: false,
            });
        }

        if self.damaged_quantity > 0 {
            findings.push(Finding {
                exception: NewException::new(
                    ExceptionKind::DamagedItems,
                    format!("{} units received damaged", self.damaged_quantity),
                )
                .for_lot(self.lot_id.clone())
                .with_quantity(self.damaged_quantity),
                holds_lot: false,
            });
        }

        if !self.documentation_present {
            findings.push(Finding {
                exception: NewException::new(
                    ExceptionKind::MissingDocumentation,
                    "Required shipment paperwork is missing",
                )
                .for_lot(self.lot_id.clone()),
                holds_lot: true,
            });
        }

        findings
    }
}
