//! Comparison rules between two snapshots of the same field

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How two snapshots of the same field are judged equal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComparisonRule {
    /// Equality after normalization (trim + case-fold, cents for amounts)
    Exact,
    /// `|observed - expected| <= epsilon`
    NumericEpsilon { epsilon: f64 },
    /// Observed id set contains every expected id (or count >= expected)
    Superset,
    /// `after >= before`, and `after - before == delta` when a delta is known
    MonotonicIncrease { expected_delta: Option<f64> },
    /// Observed date within `[start, end]` inclusive
    DateInRange { start: NaiveDate, end: NaiveDate },
}

impl ComparisonRule {
    /// Default currency tolerance
    pub fn currency() -> Self {
        ComparisonRule::NumericEpsilon { epsilon: 0.01 }
    }

    pub fn increase_by(delta: f64) -> Self {
        ComparisonRule::MonotonicIncrease {
            expected_delta: Some(delta),
        }
    }

    pub fn kind(&self) -> RuleKind {
        match self {
            ComparisonRule::Exact => RuleKind::Exact,
            ComparisonRule::NumericEpsilon { .. } => RuleKind::NumericEpsilon,
            ComparisonRule::Superset => RuleKind::Superset,
            ComparisonRule::MonotonicIncrease { .. } => RuleKind::MonotonicIncrease,
            ComparisonRule::DateInRange { .. } => RuleKind::DateInRange,
        }
    }
}

/// Rule discriminant used in failure reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Exact,
    NumericEpsilon,
    Superset,
    MonotonicIncrease,
    DateInRange,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Exact => "exact",
            RuleKind::NumericEpsilon => "numeric_epsilon",
            RuleKind::Superset => "superset",
            RuleKind::MonotonicIncrease => "monotonic_increase",
            RuleKind::DateInRange => "date_in_range",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
