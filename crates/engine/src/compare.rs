//! Tolerance-aware comparator
//!
//! Judges an expected snapshot (API or computed) against an observed one
//! (UI or a second API call) under a `ComparisonRule`.

use reconciler_core::{ComparisonRule, Error, Mismatch, Money, Result, Snapshot, Value};

/// Stateless judge. `epsilon` is the tolerance applied where a rule has
/// none of its own (the delta check of `MonotonicIncrease`).
#[derive(Debug, Clone, Copy)]
pub struct Comparator {
    epsilon: f64,
}

impl Default for Comparator {
    fn default() -> Self {
        Self { epsilon: 0.01 }
    }
}

impl Comparator {
    pub fn new(epsilon: f64) -> Self {
        Self { epsilon }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Compare two snapshots. Snapshots of different fields are rejected
    /// before the rule is looked at.
    pub fn check(&self, rule: &ComparisonRule, expected: &Snapshot, observed: &Snapshot) -> Result<()> {
        if expected.field_name() != observed.field_name() {
            return Err(Error::FieldNameMismatch {
                expected: expected.field_name().to_string(),
                observed: observed.field_name().to_string(),
            });
        }
        self.judge(expected.field_name(), rule, expected.value(), observed.value())
            .map_err(Error::from)
    }

    /// Apply one rule to two values of `field`
    pub fn judge(
        &self,
        field: &str,
        rule: &ComparisonRule,
        expected: &Value,
        observed: &Value,
    ) -> std::result::Result<(), Mismatch> {
        let fail = |detail: Option<String>| Mismatch {
            field: field.to_string(),
            rule: rule.kind(),
            expected: expected.clone(),
            observed: observed.clone(),
            detail,
        };

        match rule {
            ComparisonRule::Exact => {
                if exact_eq(expected, observed) {
                    Ok(())
                } else {
                    Err(fail(type_detail(expected, observed)))
                }
            }
            ComparisonRule::NumericEpsilon { epsilon } => {
                let (e, o) = numeric_pair(expected, observed).ok_or_else(|| fail(Some("not numeric".into())))?;
                let diff = (o - e).abs();
                if diff <= *epsilon {
                    Ok(())
                } else {
                    Err(fail(Some(format!("|diff| {} > epsilon {}", diff, epsilon))))
                }
            }
            ComparisonRule::Superset => match (expected, observed) {
                (Value::Ids(want), Value::Ids(have)) => {
                    let missing: Vec<&str> = want.difference(have).map(String::as_str).collect();
                    if missing.is_empty() {
                        Ok(())
                    } else {
                        Err(fail(Some(format!("missing {}", missing.join(", ")))))
                    }
                }
                _ => {
                    let (e, o) =
                        numeric_pair(expected, observed).ok_or_else(|| fail(Some("not ids or counts".into())))?;
                    if o >= e {
                        Ok(())
                    } else {
                        Err(fail(Some("observed shrank".into())))
                    }
                }
            },
            ComparisonRule::MonotonicIncrease { expected_delta } => {
                let (before, after) =
                    numeric_pair(expected, observed).ok_or_else(|| fail(Some("not numeric".into())))?;
                if after < before {
                    return Err(fail(Some("value decreased".into())));
                }
                match expected_delta {
                    Some(delta) if ((after - before) - delta).abs() > self.epsilon => Err(fail(Some(format!(
                        "delta {:.2} != expected {:.2}",
                        after - before,
                        delta
                    )))),
                    _ => Ok(()),
                }
            }
            ComparisonRule::DateInRange { start, end } => match observed {
                Value::Date(date) if start <= date && date <= end => Ok(()),
                Value::Date(_) => Err(fail(Some(format!("outside [{}, {}]", start, end)))),
                _ => Err(fail(Some("observed is not a date".into()))),
            },
        }
    }

    /// Boolean form of `judge`
    pub fn matches(&self, rule: &ComparisonRule, expected: &Value, observed: &Value) -> bool {
        self.judge("", rule, expected, observed).is_ok()
    }
}

fn numeric_pair(expected: &Value, observed: &Value) -> Option<(f64, f64)> {
    Some((expected.as_f64()?, observed.as_f64()?))
}

fn exact_eq(expected: &Value, observed: &Value) -> bool {
    match (expected, observed) {
        (Value::Text(a), Value::Text(b)) => a.trim().to_lowercase() == b.trim().to_lowercase(),
        (Value::Count(a), Value::Count(b)) => a == b,
        // amounts compare in whole cents
        (Value::Amount(_), Value::Amount(_) | Value::Count(_)) | (Value::Count(_), Value::Amount(_)) => {
            match numeric_pair(expected, observed) {
                Some((a, b)) if a.is_finite() && b.is_finite() => Money::new(a).cents() == Money::new(b).cents(),
                _ => false,
            }
        }
        (Value::Flag(a), Value::Flag(b)) => a == b,
        (Value::Date(a), Value::Date(b)) => a == b,
        (Value::Ids(a), Value::Ids(b)) => a == b,
        _ => false,
    }
}

fn type_detail(expected: &Value, observed: &Value) -> Option<String> {
    let (e, o) = (expected.kind(), observed.kind());
    let numeric = |v: &Value| v.as_f64().is_some();
    if e != o && !(numeric(expected) && numeric(observed)) {
        Some(format!("type {:?} vs {:?}", e, o))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use reconciler_core::RuleKind;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn ids(items: &[&str]) -> Value {
        Value::Ids(items.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>())
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_field_name_checked_first() {
        let c = Comparator::default();
        let err = c
            .check(
                &ComparisonRule::Exact,
                &Snapshot::api("wallet_balance", Value::Amount(1.0)),
                &Snapshot::ui("bonus_balance", Value::Amount(1.0)),
            )
            .unwrap_err();
        assert!(matches!(err, Error::FieldNameMismatch { .. }));
    }

    #[test]
    fn test_exact_text_is_trimmed_and_case_folded() {
        let c = Comparator::default();
        assert!(c.matches(&ComparisonRule::Exact, &Value::Text("Claimed".into()), &Value::Text("  claimed ".into())));
        assert!(c.matches(&ComparisonRule::Exact, &Value::Text("已领取".into()), &Value::Text("已领取".into())));
        assert!(!c.matches(&ComparisonRule::Exact, &Value::Text("Claim".into()), &Value::Text("Claimed".into())));
    }

    #[test]
    fn test_exact_amounts_compare_in_cents() {
        let c = Comparator::default();
        assert!(c.matches(&ComparisonRule::Exact, &Value::Amount(70.0), &Value::Amount(70.001)));
        assert!(c.matches(&ComparisonRule::Exact, &Value::Amount(70.0), &Value::Count(70)));
        assert!(!c.matches(&ComparisonRule::Exact, &Value::Amount(70.0), &Value::Amount(70.01)));
    }

    #[test]
    fn test_type_mismatch_is_reported_not_panicked() {
        let c = Comparator::default();
        let m = c
            .judge("vip_remaining", &ComparisonRule::Exact, &Value::Amount(70.0), &Value::Text("70".into()))
            .unwrap_err();
        assert_eq!(m.rule, RuleKind::Exact);
        assert!(m.detail.unwrap().contains("Text"));

        let eps = ComparisonRule::currency();
        assert!(!c.matches(&eps, &Value::Flag(true), &Value::Amount(1.0)));
    }

    #[test]
    fn test_numeric_epsilon_boundaries() {
        let c = Comparator::default();
        let rule = ComparisonRule::NumericEpsilon { epsilon: 0.5 };
        assert!(c.matches(&rule, &Value::Amount(10.0), &Value::Amount(10.5)));
        assert!(!c.matches(&rule, &Value::Amount(10.0), &Value::Amount(10.75)));
        assert!(!c.matches(&rule, &Value::Amount(f64::NAN), &Value::Amount(f64::NAN)));
    }

    #[test]
    fn test_superset_on_ids_and_counts() {
        let c = Comparator::default();
        assert!(c.matches(&ComparisonRule::Superset, &ids(&["1", "2"]), &ids(&["1", "2", "3"])));
        let m = c
            .judge("history_ids", &ComparisonRule::Superset, &ids(&["1", "9"]), &ids(&["1", "2"]))
            .unwrap_err();
        assert_eq!(m.detail.as_deref(), Some("missing 9"));

        assert!(c.matches(&ComparisonRule::Superset, &Value::Count(3), &Value::Count(4)));
        assert!(!c.matches(&ComparisonRule::Superset, &Value::Count(3), &Value::Count(2)));
    }

    #[test]
    fn test_monotonic_increase_with_and_without_delta() {
        let c = Comparator::default();
        let any = ComparisonRule::MonotonicIncrease { expected_delta: None };
        assert!(c.matches(&any, &Value::Count(2), &Value::Count(2)));
        assert!(!c.matches(&any, &Value::Count(2), &Value::Count(1)));

        let by_one = ComparisonRule::increase_by(1.0);
        assert!(c.matches(&by_one, &Value::Count(2), &Value::Count(3)));
        let m = c.judge("lottery_cards", &by_one, &Value::Count(2), &Value::Count(4)).unwrap_err();
        assert!(m.to_string().contains("delta 2.00 != expected 1.00"));
    }

    #[test]
    fn test_date_in_range() {
        let c = Comparator::default();
        let rule = ComparisonRule::DateInRange {
            start: date(2026, 10, 1),
            end: date(2026, 10, 7),
        };
        let anchor = Value::Date(date(2026, 10, 1));
        assert!(c.matches(&rule, &anchor, &Value::Date(date(2026, 10, 4))));
        assert!(!c.matches(&rule, &anchor, &Value::Date(date(2026, 10, 8))));
        assert!(!c.matches(&rule, &anchor, &Value::Text("2026-10-04".into())));
    }

    proptest! {
        #[test]
        fn prop_numeric_epsilon_is_abs_diff(a in -1.0e7f64..1.0e7, b in -1.0e7f64..1.0e7, eps in 0.0f64..100.0) {
            let c = Comparator::default();
            let rule = ComparisonRule::NumericEpsilon { epsilon: eps };
            let forward = c.matches(&rule, &Value::Amount(a), &Value::Amount(b));
            prop_assert_eq!(forward, (a - b).abs() <= eps);
            prop_assert_eq!(forward, c.matches(&rule, &Value::Amount(b), &Value::Amount(a)));
            prop_assert!(c.matches(&rule, &Value::Amount(a), &Value::Amount(a)));
        }

        #[test]
        fn prop_date_range_is_inclusive(offset in 0i64..3650, len in 0i64..365) {
            let start = date(2020, 1, 1) + chrono::Duration::days(offset);
            let end = start + chrono::Duration::days(len);
            let rule = ComparisonRule::DateInRange { start, end };
            let c = Comparator::default();
            let anchor = Value::Date(start);
            prop_assert!(c.matches(&rule, &anchor, &Value::Date(start)));
            prop_assert!(c.matches(&rule, &anchor, &Value::Date(end)));
            prop_assert!(!c.matches(&rule, &anchor, &Value::Date(end + chrono::Duration::days(1))));
            prop_assert!(!c.matches(&rule, &anchor, &Value::Date(start - chrono::Duration::days(1))));
        }
    }
}
