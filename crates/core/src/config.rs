//! Configuration model
//!
//! Loaded by the runner from defaults, a YAML file and `RECONCILER_*`
//! environment variables. Credentials and URLs are always injected here,
//! never compiled in.

use crate::types::Language;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub poll: PollConfig,
    pub provision: ProvisionConfig,
    pub sampler: SamplerConfig,
    pub comparator: ComparatorConfig,
    pub database: DatabaseConfig,
    /// Per-language overrides, layered over the built-in label tables
    pub language_settings: BTreeMap<Language, LanguageOverride>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    /// Token for the fixture endpoints (approve deposit, simulate streak)
    pub admin_token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            admin_token: None,
            timeout_secs: 15,
        }
    }
}

/// The single polling policy used for every eventually-consistent check
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval_ms: u64,
    pub max_wait_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1_000,
            max_wait_ms: 30_000,
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }
}

/// Fixed account reused for read-only checks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeededAccount {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Recorded on every registered account for later bulk cleanup
    pub tag: String,
    pub seeded: BTreeMap<Language, SeededAccount>,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_ms: 500,
            max_backoff_ms: 8_000,
            tag: "e2e".to_string(),
            seeded: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// How long to wait for an element to appear
    pub element_timeout_ms: u64,
    pub element_poll_ms: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            element_timeout_ms: 10_000,
            element_poll_ms: 250,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparatorConfig {
    pub currency_epsilon: f64,
}

impl Default for ComparatorConfig {
    fn default() -> Self {
        Self {
            currency_epsilon: 0.01,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "reconciler.db".to_string(),
        }
    }
}

/// Localized strings needed to read values off the UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageSettings {
    /// Separators between a label and its value, e.g. "：" in "余额：100"
    pub separators: Vec<String>,
    pub currency_symbols: Vec<String>,
    pub thousands_separator: String,
    pub claim: String,
    pub claimed: String,
    /// Field name -> label shown in front of the value
    pub labels: BTreeMap<String, String>,
}

impl LanguageSettings {
    /// Built-in label table for a language
    pub fn builtin(language: Language) -> Self {
        match language {
            Language::Zh => Self::table(
                &["：", ":"],
                "领取",
                "已领取",
                &[
                    ("wallet_balance", "余额"),
                    ("bonus_balance", "奖金"),
                    ("vip_remaining", "距离下一级还需"),
                    ("lottery_cards", "4D卡"),
                    ("spin_count", "转盘次数"),
                    ("referral_count", "邀请人数"),
                ],
            ),
            Language::En => Self::table(
                &[":", "："],
                "Claim",
                "Claimed",
                &[
                    ("wallet_balance", "Balance"),
                    ("bonus_balance", "Bonus"),
                    ("vip_remaining", "Remaining to next VIP"),
                    ("lottery_cards", "4D Cards"),
                    ("spin_count", "Spins"),
                    ("referral_count", "Invited"),
                ],
            ),
            Language::Ms => Self::table(
                &[":", "："],
                "Tuntut",
                "Telah Dituntut",
                &[
                    ("wallet_balance", "Baki"),
                    ("bonus_balance", "Bonus"),
                    ("vip_remaining", "Baki ke VIP seterusnya"),
                    ("lottery_cards", "Kad 4D"),
                    ("spin_count", "Putaran"),
                    ("referral_count", "Dijemput"),
                ],
            ),
        }
    }

    fn table(separators: &[&str], claim: &str, claimed: &str, labels: &[(&str, &str)]) -> Self {
        Self {
            separators: separators.iter().map(|s| s.to_string()).collect(),
            currency_symbols: ["MYR", "RM", "¥", "￥", "$"].iter().map(|s| s.to_string()).collect(),
            thousands_separator: ",".to_string(),
            claim: claim.to_string(),
            claimed: claimed.to_string(),
            labels: labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub fn label(&self, field: &str) -> Option<&str> {
        self.labels.get(field).map(String::as_str)
    }

    /// Replace the fields `patch` sets; labels are merged per field
    pub fn apply(&mut self, patch: &LanguageOverride) {
        if let Some(separators) = &patch.separators {
            self.separators = separators.clone();
        }
        if let Some(symbols) = &patch.currency_symbols {
            self.currency_symbols = symbols.clone();
        }
        if let Some(sep) = &patch.thousands_separator {
            self.thousands_separator = sep.clone();
        }
        if let Some(claim) = &patch.claim {
            self.claim = claim.clone();
        }
        if let Some(claimed) = &patch.claimed {
            self.claimed = claimed.clone();
        }
        self.labels
            .extend(patch.labels.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}

/// Partial `LanguageSettings` from the config file. Unset fields keep the
/// built-in value for that language.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub separators: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency_symbols: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thousands_separator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimed: Option<String>,
    pub labels: BTreeMap<String, String>,
}

impl Config {
    /// Built-in label table for a language with any configured override on top
    pub fn language(&self, language: Language) -> LanguageSettings {
        let mut settings = LanguageSettings::builtin(language);
        if let Some(patch) = self.language_settings.get(&language) {
            settings.apply(patch);
        }
        settings
    }

    /// Reject settings that would make polling or provisioning misbehave
    pub fn validate(&self) -> Result<()> {
        if self.backend.base_url.trim().is_empty() {
            return Err(Error::ConfigError("backend.base_url cannot be empty".into()));
        }
        if self.poll.interval_ms == 0 || self.poll.max_wait_ms == 0 {
            return Err(Error::ConfigError("poll interval and max wait must be positive".into()));
        }
        if self.poll.interval_ms > self.poll.max_wait_ms {
            return Err(Error::ConfigError(format!(
                "poll.interval_ms ({}) exceeds poll.max_wait_ms ({})",
                self.poll.interval_ms, self.poll.max_wait_ms
            )));
        }
        if self.provision.max_attempts == 0 {
            return Err(Error::ConfigError("provision.max_attempts cannot be 0".into()));
        }
        if self.provision.initial_backoff_ms > self.provision.max_backoff_ms {
            return Err(Error::ConfigError(format!(
                "provision.initial_backoff_ms ({}) exceeds provision.max_backoff_ms ({})",
                self.provision.initial_backoff_ms, self.provision.max_backoff_ms
            )));
        }
        if !(self.comparator.currency_epsilon > 0.0) {
            return Err(Error::ConfigError("comparator.currency_epsilon must be positive".into()));
        }
        if self.database.path.trim().is_empty() {
            return Err(Error::ConfigError("database.path cannot be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_inverted_poll_budget_rejected() {
        let mut config = Config::default();
        config.poll.interval_ms = 60_000;
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut config = Config::default();
        config.provision.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_language_fallback_and_override() {
        let mut config = Config::default();
        assert_eq!(config.language(Language::Zh).claimed, "已领取");

        let custom = LanguageOverride {
            claim: Some("Ambil".to_string()),
            ..LanguageOverride::default()
        };
        config.language_settings.insert(Language::Ms, custom);
        assert_eq!(config.language(Language::Ms).claim, "Ambil");
        assert_eq!(config.language(Language::Ms).claimed, "Telah Dituntut");
    }

    #[test]
    fn test_partial_override_keeps_the_languages_own_strings() {
        let config: Config = serde_json::from_value(serde_json::json!({
            "language_settings": {"zh": {"claim": "领", "labels": {"wallet_balance": "钱包余额"}}}
        }))
        .unwrap();

        let zh = config.language(Language::Zh);
        assert_eq!(zh.claim, "领");
        assert_eq!(zh.claimed, "已领取");
        assert_eq!(zh.label("wallet_balance"), Some("钱包余额"));
        assert_eq!(zh.label("bonus_balance"), Some("奖金"));
        assert_eq!(zh.separators, LanguageSettings::builtin(Language::Zh).separators);
        assert_eq!(config.language(Language::En), LanguageSettings::builtin(Language::En));
    }
}
