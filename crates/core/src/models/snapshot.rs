//! Snapshots: a typed value of a named field, captured once from one source

use crate::types::Source;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Typed payload of a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Currency amount
    Amount(f64),
    /// Integer count (cards, spins, records, progress)
    Count(i64),
    /// Free text or enum status label
    Text(String),
    /// Boolean state, e.g. a button being enabled
    Flag(bool),
    Date(NaiveDate),
    /// Set of record identifiers
    Ids(BTreeSet<String>),
}

impl Value {
    /// Numeric view of amounts and counts
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Amount(v) => Some(*v),
            Value::Count(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Amount(_) => ValueKind::Amount,
            Value::Count(_) => ValueKind::Count,
            Value::Text(_) => ValueKind::Text,
            Value::Flag(_) => ValueKind::Flag,
            Value::Date(_) => ValueKind::Date,
            Value::Ids(_) => ValueKind::Ids,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Amount(v) => write!(f, "{:.2}", v),
            Value::Count(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{:?}", s),
            Value::Flag(b) => write!(f, "{}", b),
            Value::Date(d) => write!(f, "{}", d),
            Value::Ids(ids) => {
                let joined: Vec<&str> = ids.iter().map(String::as_str).collect();
                write!(f, "{{{}}}", joined.join(", "))
            }
        }
    }
}

/// Target type when coercing a display string into a `Value`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Amount,
    Count,
    Text,
    Flag,
    Date,
    Ids,
}

/// A named, typed value captured at a point in time from one source.
///
/// Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    field_name: String,
    value: Value,
    source: Source,
    captured_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(field_name: impl Into<String>, value: Value, source: Source) -> Self {
        Self {
            field_name: field_name.into(),
            value,
            source,
            captured_at: Utc::now(),
        }
    }

    pub fn api(field_name: impl Into<String>, value: Value) -> Self {
        Self::new(field_name, value, Source::Api)
    }

    pub fn ui(field_name: impl Into<String>, value: Value) -> Self {
        Self::new(field_name, value, Source::Ui)
    }

    pub fn computed(field_name: impl Into<String>, value: Value) -> Self {
        Self::new(field_name, value, Source::Computed)
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Derive a computed snapshot of the same field with a new value
    pub fn derive(&self, value: Value) -> Self {
        Self::computed(self.field_name.clone(), value)
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={} ({})", self.field_name, self.value, self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_display() {
        let snap = Snapshot::ui("wallet_balance", Value::Amount(12.5));
        assert_eq!(snap.to_string(), "wallet_balance=12.50 (UI)");
        assert_eq!(snap.source(), Source::Ui);
    }

    #[test]
    fn test_derive_keeps_field_name() {
        let before = Snapshot::api("spin_count", Value::Count(2));
        let expected = before.derive(Value::Count(3));
        assert_eq!(expected.field_name(), "spin_count");
        assert_eq!(expected.source(), Source::Computed);
    }

    #[test]
    fn test_value_serde_shape() {
        let json = serde_json::to_value(Value::Count(4)).unwrap();
        assert_eq!(json, serde_json::json!({"type": "count", "value": 4}));
    }
}
