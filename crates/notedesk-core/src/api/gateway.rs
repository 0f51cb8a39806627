//! Authenticated request gateway.
//!
//! Every API call goes through [`Gateway::execute`], which attaches the
//! session's bearer token and, when the server answers 401, performs one
//! silent refresh of the access token followed by one retry of the original
//! request. A refresh rejected with 403 tears the session down.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::auth::SessionStore;
use crate::config::{Config, RefreshPolicy};

use super::{ApiError, ApiRequest, ApiResponse};

/// Endpoint that trades the refresh cookie for a new access token
pub const REFRESH_PATH: &str = "/auth/refresh";

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    #[serde(rename = "accessToken")]
    access_token: Option<String>,
}

/// Sends requests on behalf of the session.
/// Clone is cheap - the reqwest client and session store are shared.
#[derive(Clone)]
pub struct Gateway {
    client: Client,
    base_url: String,
    session: Arc<SessionStore>,
    policy: RefreshPolicy,
    refresh_lock: Arc<Mutex<()>>,
    /// Number of refresh attempts that have completed, whatever their outcome
    refresh_generation: Arc<AtomicU64>,
}

impl Gateway {
    /// Create a gateway for the API rooted at `base_url` (e.g. `https://host/api`)
    /// with the default timeout and refresh policy
    pub fn new(base_url: impl Into<String>, session: Arc<SessionStore>) -> Result<Self, ApiError> {
        let defaults = Config::default();
        Self::build(
            base_url.into(),
            session,
            defaults.request_timeout_secs,
            defaults.refresh_policy,
        )
    }

    pub fn from_config(config: &Config, session: Arc<SessionStore>) -> Result<Self, ApiError> {
        Self::build(
            config.api_base_url(),
            session,
            config.request_timeout_secs,
            config.refresh_policy,
        )
    }

    fn build(
        base_url: String,
        session: Arc<SessionStore>,
        timeout_secs: u64,
        policy: RefreshPolicy,
    ) -> Result<Self, ApiError> {
        // The cookie store carries the HTTP-only refresh credential
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
            policy,
            refresh_lock: Arc::new(Mutex::new(())),
            refresh_generation: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn with_policy(mut self, policy: RefreshPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a request, refreshing the access token and retrying once if the
    /// server rejects it with 401.
    ///
    /// The outcome of the retry is returned as-is, including a second 401.
    pub async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let sent_with = self.session.token();
        let generation = self.refresh_generation.load(Ordering::Acquire);

        match self.send(request, sent_with.as_deref()).await {
            Err(e) if e.is_unauthorized() => {
                debug!(path = request.path(), "Access token rejected, refreshing");
            }
            outcome => return outcome,
        }

        let token = match self.policy {
            RefreshPolicy::Independent => self.refresh().await?,
            RefreshPolicy::SingleFlight => {
                let _guard = self.refresh_lock.lock().await;
                let refreshed_since =
                    self.refresh_generation.load(Ordering::Acquire) != generation;
                match self.session.token() {
                    Some(current) if refreshed_since && Some(&current) != sent_with.as_ref() => {
                        debug!(path = request.path(), "Token already refreshed by another request");
                        current
                    }
                    None if refreshed_since => {
                        // A concurrent refresh was rejected and logged the session out
                        debug!(path = request.path(), "Session expired during another refresh");
                        return Err(ApiError::SessionExpired);
                    }
                    _ => self.refresh().await?,
                }
            }
        };

        // The new token is committed to the session before the retry goes out
        self.send(request, Some(&token)).await
    }

    /// Send a request with the current token but without refresh handling.
    /// Used for credential endpoints, where a 401 is a final answer.
    pub async fn execute_once(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let token = self.session.token();
        self.send(request, token.as_deref()).await
    }

    /// Trade the refresh credential for a new access token and store it.
    ///
    /// A 403 means the refresh credential is no longer valid: the session is
    /// cleared and `SessionExpired` is returned. Any other failure is
    /// returned unchanged and the session is left alone.
    pub async fn refresh(&self) -> Result<String, ApiError> {
        let request = ApiRequest::post(REFRESH_PATH);
        let outcome = self.send(&request, None).await;

        let result = match outcome {
            Ok(response) => {
                let body: RefreshResponse = response.json()?;
                let token = body
                    .access_token
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| {
                        ApiError::InvalidResponse("refresh response has no accessToken".to_string())
                    })?;
                self.session.set_credentials(token.clone());
                info!("Access token refreshed");
                Ok(token)
            }
            Err(ApiError::Http { status, message }) if status == StatusCode::FORBIDDEN => {
                warn!(reason = %message, "Refresh credential rejected, logging out");
                self.session.log_out();
                Err(ApiError::SessionExpired)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                Err(e)
            }
        };
        self.refresh_generation.fetch_add(1, Ordering::AcqRel);
        result
    }

    /// Prepare and send a single request without any refresh handling
    async fn send(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> Result<ApiResponse, ApiError> {
        let url = self.url_for(request.path());

        let mut builder = self
            .client
            .request(request.method().clone(), &url)
            .headers(request.headers().clone());

        if !request.query_params().is_empty() {
            builder = builder.query(request.query_params());
        }
        if let Some(token) = token {
            if !request.headers().contains_key(AUTHORIZATION) {
                builder = builder.bearer_auth(token);
            }
        }
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        debug!(method = %request.method(), url = %url, "Sending request");
        let response = builder.send().await?;
        Self::check_response(response).await
    }

    /// Read the response body, turning non-success statuses into errors
    async fn check_response(response: reqwest::Response) -> Result<ApiResponse, ApiError> {
        let status = response.status();
        if status.is_success() {
            let body = response.text().await?;
            Ok(ApiResponse { status, body })
        } else {
            let body = response.text().await.unwrap_or_default();
            debug!(status = %status, "Request failed");
            Err(ApiError::from_status(status, &body))
        }
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_joins_paths() {
        let session = Arc::new(SessionStore::new());
        let gateway = Gateway::new("http://localhost:3500/api/", session).unwrap();
        assert_eq!(gateway.base_url(), "http://localhost:3500/api");
        assert_eq!(gateway.url_for("/notes"), "http://localhost:3500/api/notes");
        assert_eq!(gateway.url_for("notes/7"), "http://localhost:3500/api/notes/7");
        assert_eq!(gateway.policy, Config::default().refresh_policy);
    }

    #[test]
    fn test_from_config_uses_api_root_and_policy() {
        let config = Config {
            base_url: "https://notes.test".to_string(),
            refresh_policy: RefreshPolicy::SingleFlight,
            ..Config::default()
        };
        let gateway = Gateway::from_config(&config, Arc::new(SessionStore::new())).unwrap();
        assert_eq!(gateway.base_url(), "https://notes.test/api");
        assert_eq!(gateway.policy, RefreshPolicy::SingleFlight);
    }
}
