//! ARM REST client
//!
//! Wraps a `reqwest::Client` with AAD token acquisition (client-credentials
//! grant, cached until near expiry) and the ARM long-running-operation
//! convention: mutating calls may return `202 Accepted` with an
//! `Azure-AsyncOperation` (or `Location`) header that is polled until the
//! operation reaches a terminal state, bounded by the caller's timeout.

use std::time::{Duration, Instant};

use reqwest::{Method, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use arolift_common::retry::{retry_with_backoff, RetryConfig};
use arolift_common::{Error, Result};

use crate::credentials::AzureCredentials;

/// Azure Resource Manager endpoint
pub const ARM_ENDPOINT: &str = "https://management.azure.com";
/// AAD login endpoint
pub const AAD_ENDPOINT: &str = "https://login.microsoftonline.com";
/// OAuth scope for ARM access
pub const ARM_SCOPE: &str = "https://management.azure.com/.default";

/// Default pause between operation polls when ARM sends no `Retry-After`
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);
/// Tokens are refreshed this long before they actually expire
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);
/// Per-request timeout; operation completion has its own deadline
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

/// Authenticated ARM client shared by all API surfaces.
pub struct ArmClient {
    http: reqwest::Client,
    credentials: AzureCredentials,
    token: Mutex<Option<CachedToken>>,
    endpoint: String,
    login_endpoint: String,
    operation_timeout: Duration,
    poll_interval: Duration,
}

impl ArmClient {
    /// Build a client. `operation_timeout` bounds each long-running
    /// operation (cluster creates routinely take 40+ minutes).
    pub fn new(credentials: AzureCredentials, operation_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::provider("client/build", format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            credentials,
            token: Mutex::new(None),
            endpoint: ARM_ENDPOINT.to_string(),
            login_endpoint: AAD_ENDPOINT.to_string(),
            operation_timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Subscription all requests are scoped to.
    pub fn subscription_id(&self) -> &str {
        &self.credentials.subscription_id
    }

    /// PUT a resource and wait for the operation to complete.
    pub async fn put(&self, step: &str, path: &str, api_version: &str, body: &Value) -> Result<Value> {
        let response = self
            .send(step, Method::PUT, path, api_version, Some(body))
            .await?;
        self.await_completion(step, response).await
    }

    /// POST an action (e.g. `listCredentials`) and return the body.
    pub async fn post(&self, step: &str, path: &str, api_version: &str) -> Result<Value> {
        let response = self
            .send(step, Method::POST, path, api_version, None)
            .await?;
        self.await_completion(step, response).await
    }

    /// GET a resource or collection.
    pub async fn get(&self, step: &str, path: &str, api_version: &str) -> Result<Value> {
        let response = self.send(step, Method::GET, path, api_version, None).await?;
        self.await_completion(step, response).await
    }

    /// DELETE a resource and wait for the operation to complete.
    ///
    /// A `404` comes back as a provider error with that status so callers
    /// can treat already-gone resources as success.
    pub async fn delete(&self, step: &str, path: &str, api_version: &str) -> Result<()> {
        let response = self
            .send(step, Method::DELETE, path, api_version, None)
            .await?;
        self.await_completion(step, response).await?;
        Ok(())
    }

    async fn send(
        &self,
        step: &str,
        method: Method,
        path: &str,
        api_version: &str,
        body: Option<&Value>,
    ) -> Result<Response> {
        let token = self.bearer().await?;
        let url = format!("{}{}?api-version={}", self.endpoint, path, api_version);
        debug!(step = %step, method = %method, url = %url, "ARM request");

        let mut request = self
            .http
            .request(method, &url)
            .header("Authorization", format!("Bearer {token}"))
            .timeout(REQUEST_TIMEOUT);
        if let Some(body) = body {
            request = request.json(body);
        }

        request
            .send()
            .await
            .map_err(|e| Error::provider(step, format!("request to {url} failed: {e}")))
    }

    /// Resolve the initial response into a completed operation body.
    async fn await_completion(&self, step: &str, response: Response) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            return Err(self.error_from_response(step, response).await);
        }

        let poll_url = operation_url(&response);
        let body = read_json(step, response).await?;

        let Some(poll_url) = poll_url else {
            return Ok(body);
        };

        self.poll_operation(step, &poll_url).await?;
        Ok(body)
    }

    /// Poll an `Azure-AsyncOperation`/`Location` URL until terminal state.
    async fn poll_operation(&self, step: &str, url: &str) -> Result<()> {
        let deadline = Instant::now() + self.operation_timeout;

        loop {
            if Instant::now() > deadline {
                return Err(Error::provider(
                    step,
                    format!(
                        "operation did not complete within {}s",
                        self.operation_timeout.as_secs()
                    ),
                ));
            }

            let token = self.bearer().await?;
            let response = self
                .http
                .get(url)
                .header("Authorization", format!("Bearer {token}"))
                .timeout(REQUEST_TIMEOUT)
                .send()
                .await
                .map_err(|e| Error::provider(step, format!("operation poll failed: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                return Err(self.error_from_response(step, response).await);
            }

            let pause = retry_after(&response).unwrap_or(self.poll_interval);

            // A Location-style poll is done as soon as it stops saying 202;
            // an Azure-AsyncOperation body carries an explicit status field.
            if status == StatusCode::ACCEPTED {
                debug!(step = %step, "Operation still running");
                tokio::time::sleep(pause).await;
                continue;
            }

            let body = read_json(step, response).await.unwrap_or(Value::Null);
            match operation_state(&body) {
                OperationState::Succeeded => return Ok(()),
                OperationState::Failed(message) => {
                    return Err(Error::provider(
                        step,
                        format!("operation failed: {message}"),
                    ));
                }
                OperationState::Running => {
                    debug!(step = %step, "Operation still running");
                    tokio::time::sleep(pause).await;
                }
            }
        }
    }

    async fn error_from_response(&self, step: &str, response: Response) -> Error {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = arm_error_message(&body).unwrap_or_else(|| truncate(&body, 300));
        Error::provider_http(step, status, message)
    }

    /// Get a bearer token, refreshing through AAD when the cache is stale.
    async fn bearer(&self) -> Result<String> {
        let mut cache = self.token.lock().await;
        if let Some(token) = cache.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.value.clone());
            }
        }

        let fresh = retry_with_backoff(
            &RetryConfig::with_max_attempts(3),
            "aad-token",
            || self.fetch_token(),
        )
        .await?;
        let value = fresh.value.clone();
        *cache = Some(fresh);
        Ok(value)
    }

    async fn fetch_token(&self) -> Result<CachedToken> {
        let url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.login_endpoint, self.credentials.tenant_id
        );
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("scope", ARM_SCOPE),
        ];

        let response = self
            .http
            .post(&url)
            .form(&params)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| Error::auth(format!("token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::auth(format!(
                "AAD returned {status}: {}",
                truncate(&body, 300)
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::auth(format!("malformed token response: {e}")))?;

        let lifetime = Duration::from_secs(token.expires_in);
        let expires_at = Instant::now() + lifetime.saturating_sub(TOKEN_EXPIRY_MARGIN);
        Ok(CachedToken {
            value: token.access_token,
            expires_at,
        })
    }
}

/// Terminal/running states of an ARM operation document.
enum OperationState {
    Succeeded,
    Failed(String),
    Running,
}

/// Interpret an operation status body.
///
/// Bodies without a recognizable status (plain resource GETs following a
/// `Location` header) count as done.
fn operation_state(body: &Value) -> OperationState {
    let status = body
        .get("status")
        .or_else(|| body.pointer("/properties/provisioningState"))
        .and_then(|s| s.as_str());

    match status {
        Some("Succeeded") => OperationState::Succeeded,
        Some("Failed") | Some("Canceled") => {
            let message = body
                .pointer("/error/message")
                .and_then(|m| m.as_str())
                .unwrap_or("no error detail")
                .to_string();
            OperationState::Failed(message)
        }
        Some(_) => OperationState::Running,
        None => OperationState::Succeeded,
    }
}

/// Extract the poll URL from an accepted mutating response, if any.
fn operation_url(response: &Response) -> Option<String> {
    for header in ["azure-asyncoperation", "location"] {
        if let Some(value) = response.headers().get(header) {
            if let Ok(url) = value.to_str() {
                return Some(url.to_string());
            }
        }
    }
    None
}

/// Parse a `Retry-After` header into a pause duration.
fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get("retry-after")?
        .to_str()
        .ok()?
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Pull the human-readable message out of an ARM error body.
fn arm_error_message(body: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    let error = parsed.get("error")?;
    let code = error.get("code")?.as_str()?;
    let message = error.get("message")?.as_str()?;
    Some(format!("{code}: {message}"))
}

async fn read_json(step: &str, response: Response) -> Result<Value> {
    let text = response.text().await.unwrap_or_default();
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| {
        warn!(step = %step, "ARM returned a non-JSON body");
        Error::provider(step, format!("malformed response body: {e}"))
    })
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn operation_state_reads_async_operation_documents() {
        assert!(matches!(
            operation_state(&json!({"status": "Succeeded"})),
            OperationState::Succeeded
        ));
        assert!(matches!(
            operation_state(&json!({"status": "InProgress"})),
            OperationState::Running
        ));
        match operation_state(&json!({
            "status": "Failed",
            "error": {"code": "QuotaExceeded", "message": "too many cores"}
        })) {
            OperationState::Failed(msg) => assert_eq!(msg, "too many cores"),
            _ => panic!("expected failed state"),
        }
    }

    #[test]
    fn operation_state_reads_provisioning_state() {
        assert!(matches!(
            operation_state(&json!({"properties": {"provisioningState": "Creating"}})),
            OperationState::Running
        ));
        assert!(matches!(
            operation_state(&json!({"properties": {"provisioningState": "Succeeded"}})),
            OperationState::Succeeded
        ));
    }

    #[test]
    fn bodies_without_status_count_as_done() {
        assert!(matches!(
            operation_state(&json!({"name": "aro-vnet-ab12"})),
            OperationState::Succeeded
        ));
        assert!(matches!(
            operation_state(&Value::Null),
            OperationState::Succeeded
        ));
    }

    #[test]
    fn arm_error_messages_are_flattened() {
        let body = r#"{"error": {"code": "InvalidParameter", "message": "bad subnet"}}"#;
        assert_eq!(
            arm_error_message(body).unwrap(),
            "InvalidParameter: bad subnet"
        );
        assert!(arm_error_message("not json").is_none());
        assert!(arm_error_message(r#"{"message": "no envelope"}"#).is_none());
    }

    #[test]
    fn truncate_caps_long_bodies() {
        assert_eq!(truncate("short", 300), "short");
        let long = "x".repeat(400);
        let out = truncate(&long, 300);
        assert_eq!(out.len(), 303);
        assert!(out.ends_with("..."));
    }
}
