//! Localization-aware parsing of display strings into typed values

use chrono::NaiveDate;
use reconciler_core::config::LanguageSettings;
use reconciler_core::{Error, Language, Result, Value, ValueKind};
use std::collections::BTreeSet;

/// Turns "余额：RM 1,234.50" into `Amount(1234.5)` for one language.
#[derive(Debug, Clone)]
pub struct ValueParser {
    language: Language,
    settings: LanguageSettings,
}

impl ValueParser {
    pub fn new(language: Language, settings: LanguageSettings) -> Self {
        Self { language, settings }
    }

    /// Parser with the built-in label table
    pub fn builtin(language: Language) -> Self {
        Self::new(language, LanguageSettings::builtin(language))
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn settings(&self) -> &LanguageSettings {
        &self.settings
    }

    pub fn parse(&self, field: &str, raw: &str, kind: ValueKind) -> Result<Value> {
        let invalid = |why: &str| {
            Error::InvalidData(format!(
                "cannot read {} from '{}' as {:?} ({}): {}",
                field, raw, kind, self.language, why
            ))
        };

        let body = self.strip_label(field, raw);
        match kind {
            // timestamps contain ':' themselves, so dates are searched, not split
            ValueKind::Date => find_date(raw).map(Value::Date).ok_or_else(|| invalid("no date")),
            ValueKind::Amount => {
                let number = self.strip_number(body);
                number
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .map(Value::Amount)
                    .ok_or_else(|| invalid("not an amount"))
            }
            ValueKind::Count => {
                let number = self.strip_number(body);
                number.parse::<i64>().map(Value::Count).map_err(|_| invalid("not a whole number"))
            }
            ValueKind::Text => Ok(Value::Text(body.trim().to_string())),
            ValueKind::Flag => match body.trim().to_lowercase().as_str() {
                "true" | "yes" | "1" | "on" => Ok(Value::Flag(true)),
                "false" | "no" | "0" | "off" => Ok(Value::Flag(false)),
                _ => Err(invalid("not a flag")),
            },
            ValueKind::Ids => {
                let ids: BTreeSet<String> = body
                    .split(|c: char| c == ',' || c == '，' || c.is_whitespace())
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
                Ok(Value::Ids(ids))
            }
        }
    }

    /// Drop the field's localized label and the separator after it. Without
    /// a known label, everything up to the last separator goes.
    fn strip_label<'a>(&self, field: &str, raw: &'a str) -> &'a str {
        let trimmed = raw.trim();
        if let Some(rest) = self.settings.label(field).and_then(|label| trimmed.strip_prefix(label)) {
            let rest = rest.trim_start();
            return self
                .settings
                .separators
                .iter()
                .find_map(|sep| rest.strip_prefix(sep.as_str()))
                .unwrap_or(rest);
        }

        self.settings
            .separators
            .iter()
            .filter_map(|sep| trimmed.rfind(sep.as_str()).map(|idx| idx + sep.len()))
            .max()
            .map(|end| &trimmed[end..])
            .unwrap_or(trimmed)
    }

    fn strip_number(&self, body: &str) -> String {
        let mut number = body.to_string();
        for symbol in &self.settings.currency_symbols {
            number = number.replace(symbol.as_str(), "");
        }
        if !self.settings.thousands_separator.is_empty() {
            number = number.replace(self.settings.thousands_separator.as_str(), "");
        }
        number.retain(|c| !c.is_whitespace());
        number
    }
}

/// First `YYYY-MM-DD` or `YYYY/MM/DD` in the string
fn find_date(raw: &str) -> Option<NaiveDate> {
    let bytes = raw.as_bytes();
    bytes.windows(10).enumerate().find_map(|(i, w)| {
        let digits = |r: std::ops::Range<usize>| w[r].iter().all(u8::is_ascii_digit);
        let sep = w[4];
        if !(digits(0..4) && digits(5..7) && digits(8..10) && (sep == b'-' || sep == b'/') && w[7] == sep) {
            return None;
        }
        // all ten bytes are ASCII, so these are char boundaries
        let text = raw[i..i + 10].replace('/', "-");
        NaiveDate::parse_from_str(&text, "%Y-%m-%d").ok()
    })
}
