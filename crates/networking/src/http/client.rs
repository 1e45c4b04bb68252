//! Backend HTTP client with bearer-token authentication

use reconciler_core::config::BackendConfig;
use reconciler_core::{
    ApiEnvelope, CheckinStatus, DepositReceipt, DepositRequest, Error, HistoryFilter, HistoryPage,
    Language, LoginRequest, LoginResponse, LotteryCards, Mission, MissionClaimResponse,
    ReferralSummary, RegisterRequest, RegisterResponse, Result, SpinStatus, TurnoverStatus,
    VipInfo, WalletBalance,
};
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION},
    Client, Response,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error, instrument};

const USER_AGENT_VALUE: &str = "reconciler/0.3 (+wallet-e2e)";
const LANGUAGE_HEADER: &str = "language";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// HTTP client for the platform backend.
///
/// Every call is one request: no retries happen here. Polling and
/// provisioning retries live in the engine.
#[derive(Clone)]
pub struct BackendClient {
    http: Client,
    base_url: String,
    language: Language,
    token: Option<String>,
    admin_token: Option<String>,
}

impl BackendClient {
    /// Create an unauthenticated client
    pub fn new(base_url: &str, language: Language) -> Result<Self> {
        Self::with_timeout(base_url, language, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: &str, language: Language, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT_VALUE)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::NetworkError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            language,
            token: None,
            admin_token: None,
        })
    }

    /// Build a client from the backend section of the config
    pub fn from_config(config: &BackendConfig, language: Language) -> Result<Self> {
        let client = Self::with_timeout(
            &config.base_url,
            language,
            Duration::from_secs(config.timeout_secs.max(1)),
        )?;
        Ok(client.with_admin_token(config.admin_token.clone()))
    }

    /// Same client, authenticated as a user
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Same client, sending a different `language` header
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn with_admin_token(mut self, admin_token: Option<String>) -> Self {
        self.admin_token = admin_token;
        self
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn headers_with(&self, bearer: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(HeaderName::from_static(LANGUAGE_HEADER), HeaderValue::from_static(self.language.code()));

        if let Some(token) = bearer {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| Error::AuthenticationError(format!("Invalid token header: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }

    /// Headers for user-scoped requests
    fn default_headers(&self) -> Result<HeaderMap> {
        self.headers_with(self.token.as_deref())
    }

    /// Headers for the fixture (admin) endpoints
    fn admin_headers(&self) -> Result<HeaderMap> {
        let token = self.admin_token.as_deref().ok_or_else(|| {
            Error::ConfigError("backend.admin_token is required for fixture endpoints".to_string())
        })?;
        self.headers_with(Some(token))
    }

    /// Check if response indicates authentication failure
    fn check_auth_error(response: &Response) -> Option<Error> {
        match response.status().as_u16() {
            401 => Some(Error::TokenExpired),
            403 => Some(Error::AuthenticationError("Access forbidden".to_string())),
            _ => None,
        }
    }

    /// Validate status, parse the envelope and unwrap its payload
    async fn read_envelope<T: DeserializeOwned>(response: Response, endpoint: &str) -> Result<T> {
        debug!("{} -> {}", endpoint, response.status());

        if let Some(err) = Self::check_auth_error(&response) {
            return Err(err);
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("{} failed: HTTP {}: {}", endpoint, status, body);
            return Err(Error::ApiError(format!("{} returned HTTP {}: {}", endpoint, status, body)));
        }

        let body_text = response.text().await.map_err(|e| {
            error!("Failed to read {} response body: {}", endpoint, e);
            Error::InvalidData(e.to_string())
        })?;

        let envelope: ApiEnvelope<T> = serde_json::from_str(&body_text).map_err(|e| {
            error!(
                "Failed to parse {} response: {}. Body preview: {}",
                endpoint,
                e,
                body_text.chars().take(500).collect::<String>()
            );
            Error::InvalidData(format!("{}: {}", endpoint, e))
        })?;

        envelope.into_data(endpoint)
    }

    async fn get_data<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let response = self
            .http
            .get(self.url(path))
            .headers(self.default_headers()?)
            .query(query)
            .send()
            .await?;

        Self::read_envelope(response, path).await
    }

    async fn post_data<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        headers: HeaderMap,
    ) -> Result<T> {
        let response = self
            .http
            .post(self.url(path))
            .headers(headers)
            .json(body)
            .send()
            .await?;

        Self::read_envelope(response, path).await
    }

    // ─── Auth ────────────────────────────────────────────────────────

    /// Log in and return the token + user id
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let login: LoginResponse = self
            .post_data("/api/auth/login", &body, self.headers_with(None)?)
            .await
            .map_err(|e| match e {
                Error::TokenExpired => Error::AuthenticationError(format!("login rejected for {}", username)),
                other => other,
            })?;

        debug!("Logged in as {} (id {})", username, login.user_id);
        Ok(login)
    }

    /// Register a new user
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse> {
        self.post_data("/api/auth/register", request, self.headers_with(None)?)
            .await
    }

    // ─── Read-only queries ───────────────────────────────────────────

    #[instrument(skip(self))]
    pub async fn get_wallet_balance(&self) -> Result<WalletBalance> {
        self.get_data("/api/wallet/balance", &[]).await
    }

    #[instrument(skip(self))]
    pub async fn get_missions(&self) -> Result<Vec<Mission>> {
        let missions: Vec<Mission> = self.get_data("/api/missions", &[]).await?;
        debug!("Fetched {} missions", missions.len());
        Ok(missions)
    }

    #[instrument(skip(self))]
    pub async fn get_vip_info(&self) -> Result<VipInfo> {
        self.get_data("/api/vip/info", &[]).await
    }

    #[instrument(skip(self))]
    pub async fn get_turnover_status(&self) -> Result<TurnoverStatus> {
        self.get_data("/api/turnover/status", &[]).await
    }

    #[instrument(skip(self))]
    pub async fn get_history(&self, filter: &HistoryFilter) -> Result<HistoryPage> {
        let page: HistoryPage = self.get_data("/api/history", &filter.to_query()).await?;
        debug!("Fetched {} history records (total: {})", page.records.len(), page.total);
        Ok(page)
    }

    #[instrument(skip(self))]
    pub async fn get_lottery_cards(&self) -> Result<LotteryCards> {
        self.get_data("/api/lottery/cards", &[]).await
    }

    #[instrument(skip(self))]
    pub async fn get_checkin_status(&self) -> Result<CheckinStatus> {
        self.get_data("/api/checkin/status", &[]).await
    }

    #[instrument(skip(self))]
    pub async fn get_spin_status(&self) -> Result<SpinStatus> {
        self.get_data("/api/wheel/status", &[]).await
    }

    #[instrument(skip(self))]
    pub async fn get_referral_summary(&self) -> Result<ReferralSummary> {
        self.get_data("/api/referral/summary", &[]).await
    }

    // ─── State-changing calls (fixture setup) ────────────────────────

    #[instrument(skip(self))]
    pub async fn submit_deposit(&self, request: &DepositRequest) -> Result<DepositReceipt> {
        let receipt: DepositReceipt = self
            .post_data("/api/deposit", request, self.default_headers()?)
            .await?;
        debug!("Deposit {} submitted: {:?}", receipt.deposit_id, receipt.status);
        Ok(receipt)
    }

    #[instrument(skip(self))]
    pub async fn claim_mission(&self, mission_id: i64) -> Result<MissionClaimResponse> {
        let path = format!("/api/missions/{}/claim", mission_id);
        self.post_data(&path, &serde_json::json!({}), self.default_headers()?)
            .await
    }

    /// Approve a pending deposit as the back office would
    #[instrument(skip(self))]
    pub async fn approve_deposit(&self, deposit_id: i64) -> Result<DepositReceipt> {
        let path = format!("/api/admin/deposit/{}/approve", deposit_id);
        self.post_data(&path, &serde_json::json!({}), self.admin_headers()?)
            .await
    }

    /// Pretend the user checked in on `days` consecutive days
    #[instrument(skip(self))]
    pub async fn simulate_checkin_streak(&self, user_id: i64, days: u32) -> Result<CheckinStatus> {
        let body = serde_json::json!({ "user_id": user_id, "days": days });
        self.post_data("/api/admin/checkin/simulate", &body, self.admin_headers()?)
            .await
    }

    /// Mark the user's wagering requirement as fulfilled
    #[instrument(skip(self))]
    pub async fn complete_turnover(&self, user_id: i64) -> Result<TurnoverStatus> {
        let body = serde_json::json!({ "user_id": user_id });
        self.post_data("/api/admin/turnover/complete", &body, self.admin_headers()?)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ok(data: serde_json::Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({"code": 0, "msg": "ok", "data": data}))
    }

    #[tokio::test]
    async fn test_sends_bearer_and_language_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/wallet/balance"))
            .and(header("authorization", "Bearer tok-1"))
            .and(header("language", "ms"))
            .respond_with(ok(serde_json::json!({"balance": "88.10"})))
            .mount(&server)
            .await;

        let client = BackendClient::new(&server.uri(), Language::Ms)
            .unwrap()
            .with_token("tok-1");
        let wallet = client.get_wallet_balance().await.unwrap();
        assert_eq!(wallet.balance, 88.1);
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_token_expired() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/vip/info"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = BackendClient::new(&server.uri(), Language::En).unwrap().with_token("stale");
        assert!(matches!(client.get_vip_info().await, Err(Error::TokenExpired)));
    }

    #[tokio::test]
    async fn test_server_error_is_fatal_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/missions"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .expect(1)
            .mount(&server)
            .await;

        let client = BackendClient::new(&server.uri(), Language::En).unwrap().with_token("t");
        let err = client.get_missions().await.unwrap_err();
        assert!(matches!(err, Error::ApiError(ref m) if m.contains("502")));
    }

    #[tokio::test]
    async fn test_malformed_json_is_invalid_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/lottery/cards"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let client = BackendClient::new(&server.uri(), Language::En).unwrap().with_token("t");
        assert!(matches!(client.get_lottery_cards().await, Err(Error::InvalidData(_))));
    }

    #[tokio::test]
    async fn test_history_filter_is_sent_as_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/history"))
            .and(query_param("start_date", "2026-10-01"))
            .and(query_param("type", "withdraw"))
            .respond_with(ok(serde_json::json!({"records": [], "total": 0})))
            .mount(&server)
            .await;

        let client = BackendClient::new(&server.uri(), Language::Zh).unwrap().with_token("t");
        let filter = HistoryFilter::between(
            chrono::NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
            chrono::NaiveDate::from_ymd_opt(2026, 10, 2).unwrap(),
        )
        .of_type(reconciler_core::RecordType::Withdraw);
        let page = client.get_history(&filter).await.unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_fixture_endpoints_require_admin_token() {
        let client = BackendClient::new("http://127.0.0.1:9", Language::En).unwrap();
        assert!(matches!(client.approve_deposit(1).await, Err(Error::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_admin_approve_uses_admin_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/admin/turnover/complete"))
            .and(header("authorization", "Bearer admin-1"))
            .and(body_json(serde_json::json!({"user_id": 77})))
            .respond_with(ok(serde_json::json!({"remaining": 0, "required": 100, "is_locked": 0})))
            .mount(&server)
            .await;

        let client = BackendClient::new(&server.uri(), Language::En)
            .unwrap()
            .with_token("user-token")
            .with_admin_token(Some("admin-1".to_string()));
        let status = client.complete_turnover(77).await.unwrap();
        assert!(!status.locked());
    }
}
