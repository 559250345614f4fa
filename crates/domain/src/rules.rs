//! Flow-through eligibility rules.
//!
//! Rules are a closed set of tagged variants evaluated uniformly through
//! [`Rule::matches`]. Adding a rule kind means adding a variant here; the
//! allocator only ever sees which rules matched.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::demand::StoreDemand;
use crate::error::RuleConfigurationError;

/// Valid range for the lead-time threshold, in days.
pub const LEAD_TIME_DAYS_RANGE: std::ops::RangeInclusive<i64> = 1..=30;

/// Valid range for the inventory-level threshold, in percent.
pub const INVENTORY_PERCENT_RANGE: std::ops::RangeInclusive<f64> = 0.0..=100.0;

/// Discriminant of a rule, used to record which rules justified a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    LeadTime,
    InventoryLevel,
}

impl RuleKind {
    /// Returns the rule name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::LeadTime => "lead_time",
            RuleKind::InventoryLevel => "inventory_level",
        }
    }
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Facts a rule may consult about one candidate demand.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext {
    /// Evaluation timestamp.
    pub as_of: DateTime<Utc>,

    /// Destination store's inventory-to-target ratio for the SKU, if known.
    pub inventory_ratio: Option<f64>,
}

/// A configured eligibility rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rule {
    /// Matches demand due within `days_threshold` days of evaluation.
    LeadTime { days_threshold: i64 },

    /// Matches demand whose store sits below `percent_threshold` of target stock.
    InventoryLevel { percent_threshold: f64 },
}

impl Rule {
    /// Returns the rule's kind.
    pub fn kind(&self) -> RuleKind {
        match self {
            Rule::LeadTime { .. } => RuleKind::LeadTime,
            Rule::InventoryLevel { .. } => RuleKind::InventoryLevel,
        }
    }

    /// Checks the threshold against its valid domain.
    pub fn validate(&self) -> Result<(), RuleConfigurationError> {
        match *self {
            Rule::LeadTime { days_threshold } => {
                if LEAD_TIME_DAYS_RANGE.contains(&days_threshold) {
                    Ok(())
                } else {
                    Err(RuleConfigurationError {
                        rule: RuleKind::LeadTime,
                        value: days_threshold.to_string(),
                        reason: "days threshold must be between 1 and 30",
                    })
                }
            }
            Rule::InventoryLevel { percent_threshold } => {
                if INVENTORY_PERCENT_RANGE.contains(&percent_threshold) {
                    Ok(())
                } else {
                    Err(RuleConfigurationError {
                        rule: RuleKind::InventoryLevel,
                        value: percent_threshold.to_string(),
                        reason: "percent threshold must be between 0 and 100",
                    })
                }
            }
        }
    }

    /// Returns true if the rule matches the demand.
    pub fn matches(&self, demand: &StoreDemand, ctx: &RuleContext) -> bool {
        match *self {
            Rule::LeadTime { days_threshold } => {
                demand.due_date - ctx.as_of <= Duration::days(days_threshold)
            }
            Rule::InventoryLevel { percent_threshold } => ctx
                .inventory_ratio
                .is_some_and(|ratio| ratio * 100.0 < percent_threshold),
        }
    }
}

/// A validated, ordered set of rules.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Validates and wraps the rules.
    pub fn new(rules: Vec<Rule>) -> Result<Self, RuleConfigurationError> {
        for rule in &rules {
            rule.validate()?;
        }
        Ok(Self { rules })
    }

    /// Parses and validates a JSON array of rules.
    pub fn from_json(json: &str) -> Result<Self, crate::DomainError> {
        let rules: Vec<Rule> = serde_json::from_str(json).map_err(|e| RuleConfigurationError {
            rule: RuleKind::LeadTime,
            value: e.to_string(),
            reason: "rule set is not valid JSON",
        })?;
        Ok(Self::new(rules)?)
    }

    /// The standard configuration: due within 7 days, or store below 60% of target.
    pub fn standard() -> Self {
        Self {
            rules: vec![
                Rule::LeadTime { days_threshold: 7 },
                Rule::InventoryLevel {
                    percent_threshold: 60.0,
                },
            ],
        }
    }

    /// Iterates over the rules.
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Returns true if no rules are configured.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Kinds of every rule that matches the demand, in configuration order.
    pub fn matching(&self, demand: &StoreDemand, ctx: &RuleContext) -> Vec<RuleKind> {
        self.rules
            .iter()
            .filter(|rule| rule.matches(demand, ctx))
            .map(Rule::kind)
            .collect()
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::standard()
    }
}
