//! Test fixture / account provisioner
//!
//! Produces a logged-in `TestAccount`, either freshly registered or one of
//! the seeded per-language accounts. Attempts are bounded with exponential
//! backoff; registered accounts are written to the ledger under a cleanup
//! tag since the backend never deletes them.

use rand::seq::SliceRandom;
use rand::Rng;
use reconciler_core::config::ProvisionConfig;
use reconciler_core::{Error, Language, RegisterRequest, Result, TestAccount};
use reconciler_networking::BackendClient;
use reconciler_persistence::{sqlite, Database, SecretEncryptor};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const USERNAME_PREFIX: &str = "qa";
const LOWER_ALNUM: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
const ALNUM: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Random identity for a fresh registration
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedIdentity {
    pub username: String,
    pub password: String,
    pub phone: String,
}

impl GeneratedIdentity {
    /// `qa` + 8 lowercase alphanumerics, a 10-char password with at least
    /// one letter and one digit, and a Malaysian mobile number.
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        let mut pick = |set: &[u8]| set[rng.gen_range(0..set.len())] as char;

        let username: String = std::iter::once(USERNAME_PREFIX.to_string())
            .chain((0..8).map(|_| pick(LOWER_ALNUM).to_string()))
            .collect();

        let mut password: Vec<char> = (0..8).map(|_| pick(ALNUM)).collect();
        password.push(pick(LETTERS));
        password.push(pick(DIGITS));
        let phone: String = std::iter::once("01".to_string())
            .chain((0..8).map(|_| pick(DIGITS).to_string()))
            .collect();

        password.shuffle(&mut rand::thread_rng());

        Self {
            username,
            password: password.into_iter().collect(),
            phone,
        }
    }
}

/// Where registered accounts are remembered for cleanup
pub struct AccountLedger {
    db: Arc<Database>,
    encryptor: SecretEncryptor,
}

impl AccountLedger {
    pub fn new(db: Arc<Database>, encryptor: SecretEncryptor) -> Self {
        Self { db, encryptor }
    }

    pub async fn record(&self, account: &TestAccount, tag: &str) -> Result<i64> {
        let secret = self.encryptor.encrypt(&account.password)?;
        sqlite::record_account(self.db.pool(), account, tag, &secret).await
    }
}

pub struct Provisioner {
    client: BackendClient,
    config: ProvisionConfig,
    ledger: Option<AccountLedger>,
}

impl Provisioner {
    /// `client` needs no token; its language is overridden per call
    pub fn new(client: BackendClient, config: ProvisionConfig) -> Self {
        Self {
            client,
            config,
            ledger: None,
        }
    }

    pub fn with_ledger(mut self, ledger: AccountLedger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Client for `language`, authenticated as `account`
    pub fn client_for(&self, account: &TestAccount) -> BackendClient {
        self.client
            .clone()
            .with_language(account.language)
            .with_token(account.token.clone())
    }

    /// Register a fresh account or log into the seeded one for `language`
    pub async fn provision(&self, register_new: bool, language: Language) -> Result<TestAccount> {
        if !register_new {
            let seeded = self.config.seeded.get(&language).ok_or_else(|| {
                Error::ConfigError(format!("no seeded account configured for {}", language))
            })?;
            let account = self
                .with_retries("seeded login", move || {
                    self.login(language, &seeded.username, &seeded.password, true)
                })
                .await?;
            info!("Using seeded account {} ({})", account.username, language);
            return Ok(account);
        }

        let account = self
            .with_retries("registration", move || self.register_fresh(language))
            .await?;
        info!("Provisioned fresh account {} (id {}, {})", account.username, account.user_id, language);

        if let Some(ledger) = &self.ledger {
            if let Err(e) = ledger.record(&account, &self.config.tag).await {
                warn!("Could not record {} in the ledger: {}", account.username, e);
            }
        }
        Ok(account)
    }

    async fn register_fresh(&self, language: Language) -> Result<TestAccount> {
        let identity = GeneratedIdentity::random();
        let client = self.client.clone().with_language(language);
        client
            .register(&RegisterRequest {
                username: identity.username.clone(),
                password: identity.password.clone(),
                phone: identity.phone.clone(),
                language,
                referral_code: None,
            })
            .await?;
        self.login(language, &identity.username, &identity.password, false).await
    }

    async fn login(&self, language: Language, username: &str, password: &str, seeded: bool) -> Result<TestAccount> {
        let login = self
            .client
            .clone()
            .with_language(language)
            .login(username, password)
            .await?;
        Ok(TestAccount {
            username: username.to_string(),
            password: password.to_string(),
            user_id: login.user_id,
            token: login.token,
            language,
            seeded,
        })
    }

    /// Delay before retry number `retry` (1-based)
    fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u64.saturating_pow(retry.saturating_sub(1));
        Duration::from_millis(
            self.config
                .initial_backoff_ms
                .saturating_mul(factor)
                .min(self.config.max_backoff_ms),
        )
    }

    async fn with_retries<F, Fut>(&self, what: &str, mut attempt: F) -> Result<TestAccount>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<TestAccount>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_error = String::new();

        for n in 1..=max_attempts {
            match attempt().await {
                Ok(account) => return Ok(account),
                Err(e @ Error::ConfigError(_)) => return Err(e),
                Err(e) => {
                    last_error = e.to_string();
                    if n < max_attempts {
                        let delay = self.backoff(n);
                        warn!("{} attempt {}/{} failed: {}; retrying in {:?}", what, n, max_attempts, e, delay);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(Error::ProvisionFailed {
            attempts: max_attempts,
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconciler_core::config::SeededAccount;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ok(data: serde_json::Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({"code": 0, "msg": "ok", "data": data}))
    }

    fn config(max_attempts: u32) -> ProvisionConfig {
        ProvisionConfig {
            max_attempts,
            initial_backoff_ms: 1,
            max_backoff_ms: 4,
            ..ProvisionConfig::default()
        }
    }

    #[test]
    fn test_generated_identity_shape() {
        for _ in 0..50 {
            let id = GeneratedIdentity::random();
            assert_eq!(id.username.len(), 10);
            assert!(id.username.starts_with("qa"));
            assert!(id.username[2..].chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
            assert_eq!(id.password.len(), 10);
            assert!(id.password.chars().any(|c| c.is_ascii_digit()));
            assert!(id.password.chars().any(|c| c.is_ascii_alphabetic()));
            assert!(id.phone.starts_with("01") && id.phone.len() == 10);
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let p = Provisioner::new(
            BackendClient::new("http://localhost", Language::En).unwrap(),
            ProvisionConfig {
                initial_backoff_ms: 500,
                max_backoff_ms: 3_000,
                ..ProvisionConfig::default()
            },
        );
        let delays: Vec<u64> = (1..=5).map(|n| p.backoff(n).as_millis() as u64).collect();
        assert_eq!(delays, vec![500, 1_000, 2_000, 3_000, 3_000]);
    }

    #[tokio::test]
    async fn test_fresh_account_registers_then_logs_in_and_is_recorded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/register"))
            .and(header("language", "zh"))
            .and(body_partial_json(serde_json::json!({"language": "zh"})))
            .respond_with(ok(serde_json::json!({"user_id": 77})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ok(serde_json::json!({"token": "tok-77", "user_id": "77"})))
            .mount(&server)
            .await;

        let db = Arc::new(Database::connect_in_memory().await.unwrap());
        let provisioner = Provisioner::new(BackendClient::new(&server.uri(), Language::En).unwrap(), config(3))
            .with_ledger(AccountLedger::new(db.clone(), SecretEncryptor::from_passphrase("t").unwrap()));

        let account = provisioner.provision(true, Language::Zh).await.unwrap();
        assert_eq!(account.user_id, 77);
        assert_eq!(account.token, "tok-77");
        assert!(!account.seeded);

        let ledger = sqlite::list_accounts(db.pool(), Some("e2e")).await.unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].username, account.username);
        assert_eq!(ledger[0].language, Language::Zh);
    }

    #[tokio::test]
    async fn test_registration_failure_is_bounded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/register"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"code": 1001, "msg": "username taken", "data": null}),
            ))
            .expect(3)
            .mount(&server)
            .await;

        let provisioner = Provisioner::new(BackendClient::new(&server.uri(), Language::En).unwrap(), config(3));
        let err = provisioner.provision(true, Language::En).await.unwrap_err();
        match err {
            Error::ProvisionFailed { attempts, last_error } => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains("username taken"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_seeded_account_is_only_logged_in() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .and(body_partial_json(serde_json::json!({"username": "seed_ms"})))
            .respond_with(ok(serde_json::json!({"token": "tok-s", "user_id": 5})))
            .mount(&server)
            .await;

        let mut cfg = config(2);
        cfg.seeded.insert(
            Language::Ms,
            SeededAccount {
                username: "seed_ms".into(),
                password: "pw".into(),
            },
        );
        let provisioner = Provisioner::new(BackendClient::new(&server.uri(), Language::En).unwrap(), cfg);

        let account = provisioner.provision(false, Language::Ms).await.unwrap();
        assert!(account.seeded);
        assert_eq!(account.user_id, 5);

        let missing = provisioner.provision(false, Language::Zh).await.unwrap_err();
        assert!(matches!(missing, Error::ConfigError(_)));
    }
}
