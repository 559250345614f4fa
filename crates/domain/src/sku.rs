//! SKU master data.

use chrono::{DateTime, Utc};
use common::SkuCode;
use serde::{Deserialize, Serialize};

/// Physical dimensions of one unit, in integer metric units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub length_mm: u32,
    pub width_mm: u32,
    pub height_mm: u32,
    pub weight_g: u32,
}

impl Dimensions {
    /// Creates unit dimensions.
    pub fn new(length_mm: u32, width_mm: u32, height_mm: u32, weight_g: u32) -> Self {
        Self {
            length_mm,
            width_mm,
            height_mm,
            weight_g,
        }
    }

    /// Volume of one unit in cubic centimetres (rounded down).
    pub fn volume_cm3(&self) -> u64 {
        u64::from(self.length_mm) * u64::from(self.width_mm) * u64::from(self.height_mm) / 1000
    }
}

/// A stock keeping unit as held in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sku {
    /// Catalog code.
    pub code: SkuCode,

    /// Human-readable description.
    pub description: String,

    /// Merchandise category.
    pub category: String,

    /// Unit of measure (`EA`, `CS`, ...).
    pub unit_of_measure: String,

    /// Catalog-level default: may this SKU be cross-docked at all?
    pub flow_eligible: bool,

    /// Per-unit dimensions.
    #[serde(default)]
    pub dimensions: Dimensions,

    /// When the SKU was added to the catalog.
    #[serde(default)]
    pub date_added: Option<DateTime<Utc>>,
}

impl Sku {
    /// Creates a flow-eligible SKU sold by the each.
    pub fn new(code: impl Into<SkuCode>, description: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
            category: category.into(),
            unit_of_measure: "EA".to_string(),
            flow_eligible: true,
            dimensions: Dimensions::default(),
            date_added: None,
        }
    }

    /// Sets the flow-eligibility flag.
    pub fn with_flow_eligible(mut self, flow_eligible: bool) -> Self {
        self.flow_eligible = flow_eligible;
        self
    }

    /// Sets per-unit dimensions.
    pub fn with_dimensions(mut self, dimensions: Dimensions) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Total weight in grams of `quantity` units.
    pub fn weight_g_for(&self, quantity: u32) -> u64 {
        u64::from(self.dimensions.weight_g) * u64::from(quantity)
    }

    /// Total volume in cubic centimetres of `quantity` units.
    pub fn volume_cm3_for(&self, quantity: u32) -> u64 {
        self.dimensions.volume_cm3() * u64::from(quantity)
    }
}
