//! Lenient deserializers for backend fields that arrive as numbers or strings
//!
//! `null` is an error for required fields. The `_or_zero` forms accept it as
//! zero and belong only on `#[serde(default)]` fields.

use serde::de;
use std::fmt;

/// Deserialize an f64 that may arrive as a number or string
pub(crate) fn f64_lenient<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserializer.deserialize_any(F64Lenient { null_as_zero: false })
}

/// As `f64_lenient`, with `null` read as zero
pub(crate) fn f64_lenient_or_zero<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserializer.deserialize_any(F64Lenient { null_as_zero: true })
}

/// Deserialize an i64 that may arrive as a number, string or bool
pub(crate) fn i64_lenient<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserializer.deserialize_any(I64Lenient { null_as_zero: false })
}

/// As `i64_lenient`, with `null` read as zero
pub(crate) fn i64_lenient_or_zero<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    deserializer.deserialize_any(I64Lenient { null_as_zero: true })
}

struct F64Lenient {
    null_as_zero: bool,
}

impl F64Lenient {
    fn null<E: de::Error>(self) -> std::result::Result<f64, E> {
        if self.null_as_zero {
            Ok(0.0)
        } else {
            Err(de::Error::invalid_type(de::Unexpected::Unit, &self))
        }
    }
}

impl<'de> de::Visitor<'de> for F64Lenient {
    type Value = f64;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a number or numeric string")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<f64, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<f64, E> {
        Ok(v as f64)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<f64, E> {
        Ok(v as f64)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<f64, E> {
        // Backend formats large amounts with thousands separators
        v.trim().replace(',', "").parse::<f64>().map_err(de::Error::custom)
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<f64, E> {
        self.null()
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<f64, E> {
        self.null()
    }
}

struct I64Lenient {
    null_as_zero: bool,
}

impl I64Lenient {
    fn null<E: de::Error>(self) -> std::result::Result<i64, E> {
        if self.null_as_zero {
            Ok(0)
        } else {
            Err(de::Error::invalid_type(de::Unexpected::Unit, &self))
        }
    }
}

impl<'de> de::Visitor<'de> for I64Lenient {
    type Value = i64;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an integer, numeric string or bool")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<i64, E> {
        Ok(v)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<i64, E> {
        i64::try_from(v).map_err(de::Error::custom)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<i64, E> {
        if v.fract() == 0.0 {
            Ok(v as i64)
        } else {
            Err(de::Error::custom(format!("expected integer, got {}", v)))
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<i64, E> {
        v.trim().parse::<i64>().map_err(de::Error::custom)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<i64, E> {
        Ok(v as i64)
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<i64, E> {
        self.null()
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<i64, E> {
        self.null()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Row {
        #[serde(deserialize_with = "f64_lenient")]
        amount: f64,
        #[serde(default, deserialize_with = "i64_lenient_or_zero")]
        count: i64,
    }

    #[test]
    fn test_null_required_field_is_rejected() {
        assert!(serde_json::from_str::<Row>(r#"{"amount": null}"#).is_err());
    }

    #[test]
    fn test_null_optional_field_reads_zero() {
        let row: Row = serde_json::from_str(r#"{"amount": "1,000", "count": null}"#).unwrap();
        assert_eq!(row.amount, 1000.0);
        assert_eq!(row.count, 0);
    }
}
