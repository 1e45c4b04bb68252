//! Observed state sampler
//!
//! Reads a semantic quantity off the rendered UI and coerces it into the
//! same `Value` type the fetcher produces for that field.

mod locator;
mod parse;
mod surface;

pub use locator::Locator;
pub use parse::ValueParser;
pub use surface::{ScriptedSurface, Surface};

use reconciler_core::config::SamplerConfig;
use reconciler_core::{Error, Language, Result, Snapshot, Value, ValueKind};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Label and clickability of a button
#[derive(Debug, Clone, PartialEq)]
pub struct ButtonState {
    pub label: String,
    pub enabled: bool,
}

/// A claim-style button's label matched against the localized strings
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimState {
    Claimable,
    Claimed,
    /// Neither localized string; carries the raw label
    Unrecognized(String),
}

#[derive(Clone)]
pub struct Sampler {
    surface: Arc<dyn Surface>,
    parser: ValueParser,
    element_timeout: Duration,
    element_poll: Duration,
}

impl Sampler {
    pub fn new(surface: Arc<dyn Surface>, parser: ValueParser, config: &SamplerConfig) -> Self {
        Self {
            surface,
            parser,
            element_timeout: Duration::from_millis(config.element_timeout_ms),
            element_poll: Duration::from_millis(config.element_poll_ms.max(1)),
        }
    }

    pub fn language(&self) -> Language {
        self.parser.language()
    }

    pub fn parser(&self) -> &ValueParser {
        &self.parser
    }

    /// Wait for the element, read it, parse it into a UI snapshot
    pub async fn sample(&self, field: &str, locator: &Locator, kind: ValueKind) -> Result<Snapshot> {
        let text = self.wait_for_text(locator).await?;
        let value = self.parser.parse(field, &text, kind)?;
        debug!("Sampled {}={} from {} ({:?})", field, value, locator, text);
        Ok(Snapshot::ui(field, value))
    }

    pub async fn sample_button(&self, locator: &Locator) -> Result<ButtonState> {
        let label = self.wait_for_text(locator).await?;
        let enabled = self.surface.is_enabled(locator).await?.ok_or_else(|| Error::ElementNotFound {
            locator: locator.to_string(),
            timeout_ms: 0,
        })?;
        Ok(ButtonState {
            label: label.trim().to_string(),
            enabled,
        })
    }

    pub async fn claim_state(&self, locator: &Locator) -> Result<ClaimState> {
        let button = self.sample_button(locator).await?;
        Ok(self.classify_claim(&button.label))
    }

    /// UI side of a claim check: `Count(1)` once the button reads the
    /// localized "Claimed" and is disabled, `Count(0)` while it still
    /// offers "Claim". Any other label is an error.
    pub async fn sample_claimed(&self, field: &str, locator: &Locator) -> Result<Snapshot> {
        let button = self.sample_button(locator).await?;
        let claimed = match self.classify_claim(&button.label) {
            ClaimState::Claimed => !button.enabled,
            ClaimState::Claimable => false,
            ClaimState::Unrecognized(label) => {
                return Err(Error::InvalidData(format!(
                    "{} at {} reads '{}', neither '{}' nor '{}'",
                    field,
                    locator,
                    label,
                    self.parser.settings().claim,
                    self.parser.settings().claimed
                )))
            }
        };
        Ok(Snapshot::ui(field, Value::Count(claimed as i64)))
    }

    /// Match a button label against the localized Claim / Claimed strings
    pub fn classify_claim(&self, label: &str) -> ClaimState {
        let settings = self.parser.settings();
        let norm = |s: &str| s.trim().to_lowercase();
        let label_n = norm(label);
        if label_n == norm(&settings.claimed) {
            ClaimState::Claimed
        } else if label_n == norm(&settings.claim) {
            ClaimState::Claimable
        } else {
            ClaimState::Unrecognized(label.trim().to_string())
        }
    }

    async fn wait_for_text(&self, locator: &Locator) -> Result<String> {
        let start = Instant::now();
        let deadline = start + self.element_timeout;
        loop {
            if let Some(text) = self.surface.read_text(locator).await? {
                return Ok(text);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(Error::ElementNotFound {
                    locator: locator.to_string(),
                    timeout_ms: self.element_timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(self.element_poll.min(deadline - now)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sampler(surface: Arc<ScriptedSurface>, language: Language) -> Sampler {
        let config = SamplerConfig {
            element_timeout_ms: 2_000,
            element_poll_ms: 100,
        };
        Sampler::new(surface, ValueParser::builtin(language), &config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_element_is_distinct_from_mismatch() {
        let surface = Arc::new(ScriptedSurface::new());
        let err = sampler(surface, Language::En)
            .sample("wallet_balance", &Locator::id("balance"), ValueKind::Amount)
            .await
            .unwrap_err();
        match err {
            Error::ElementNotFound { locator, timeout_ms } => {
                assert_eq!(locator, "#balance");
                assert_eq!(timeout_ms, 2_000);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_sample_is_ui_tagged_and_repeatable() {
        let surface = Arc::new(ScriptedSurface::new());
        surface.set_text(Locator::id("balance"), "余额：1,050.00").unwrap();
        let s = sampler(surface, Language::Zh);

        let first = s.sample("wallet_balance", &Locator::id("balance"), ValueKind::Amount).await.unwrap();
        let second = s.sample("wallet_balance", &Locator::id("balance"), ValueKind::Amount).await.unwrap();
        assert_eq!(first.source(), reconciler_core::Source::Ui);
        assert_eq!(first.value(), &Value::Amount(1050.0));
        assert_eq!(first.value(), second.value());
    }

    #[tokio::test]
    async fn test_claim_states_per_language() {
        let surface = Arc::new(ScriptedSurface::new());
        let button = Locator::css(".mission-7 button");
        surface.set_text(button.clone(), "Tuntut").unwrap();
        let s = sampler(surface.clone(), Language::Ms);

        assert_eq!(s.claim_state(&button).await.unwrap(), ClaimState::Claimable);
        assert_eq!(s.sample_claimed("mission_7_claimed", &button).await.unwrap().value(), &Value::Count(0));

        surface.set_text(button.clone(), "Telah Dituntut").unwrap();
        surface.set_enabled(&button, false).unwrap();
        assert_eq!(s.claim_state(&button).await.unwrap(), ClaimState::Claimed);
        assert_eq!(s.sample_claimed("mission_7_claimed", &button).await.unwrap().value(), &Value::Count(1));

        surface.set_text(button.clone(), "Claimed").unwrap();
        assert!(matches!(s.sample_claimed("mission_7_claimed", &button).await, Err(Error::InvalidData(_))));
    }
}
