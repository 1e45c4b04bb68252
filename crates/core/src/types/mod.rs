//! Shared type definitions and newtypes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Currency amount as reported by the backend or rendered by the UI
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Money(pub f64);

impl Money {
    pub fn new(amount: f64) -> Self {
        Money(amount)
    }

    pub fn as_f64(&self) -> f64 {
        self.0
    }

    /// Round to whole cents (the smallest unit the wallet displays)
    pub fn round_cents(&self) -> Self {
        Money((self.0 * 100.0).round() / 100.0)
    }

    /// Amount in integer cents, for exact comparisons
    pub fn cents(&self) -> i64 {
        (self.0 * 100.0).round() as i64
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// UI / content language of the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Zh,
    En,
    Ms,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Zh, Language::En, Language::Ms];

    /// Value sent in the `Language` header
    pub fn code(&self) -> &'static str {
        match self {
            Language::Zh => "zh",
            Language::En => "en",
            Language::Ms => "ms",
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::En
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zh" | "cn" | "zh-cn" => Ok(Language::Zh),
            "en" | "en-us" => Ok(Language::En),
            "ms" | "my" | "bm" => Ok(Language::Ms),
            other => Err(crate::Error::ConfigError(format!("unsupported language '{}'", other))),
        }
    }
}

/// Where a snapshot was captured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Rendered web UI
    Ui,
    /// Backend HTTP API
    Api,
    /// Derived locally from other snapshots (e.g. before + delta)
    Computed,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Ui => f.write_str("UI"),
            Source::Api => f.write_str("API"),
            Source::Computed => f.write_str("computed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_rounding() {
        assert_eq!(Money::new(10.005_1).round_cents(), Money::new(10.01));
        assert_eq!(Money::new(99.994).cents(), 9999);
        assert_eq!(Money::new(1234.5).to_string(), "1234.50");
    }

    #[test]
    fn test_language_parsing() {
        assert_eq!("ZH".parse::<Language>().unwrap(), Language::Zh);
        assert_eq!("bm".parse::<Language>().unwrap(), Language::Ms);
        assert!("fr".parse::<Language>().is_err());
    }
}
