// SPDX-License-Identifier: MIT

//! Tuya cloud API client.
//!
//! Handles:
//! - HMAC-signed requests against the regional endpoint
//! - Token lifecycle (proactive refresh on expiry, reactive on 401)
//! - Bounded transport retry with exponential backoff
//! - Paginated measurement history and analysis reports

use crate::config::Config;
use crate::error::{is_auth_message, Result, ScaleError};
use crate::models::{
    AnalysisReport, AnalysisRequest, ApiEnvelope, HistoryPage, RawRecord, TokenGrant,
};
use crate::services::rate_limit::RateLimiter;
use crate::services::sign::sign_request;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::{header, Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;

/// Records per history page.
pub const PAGE_SIZE: u32 = 50;

/// Page budget for one history fetch.
pub const MAX_HISTORY_PAGES: u32 = 5;

/// Per-request transport timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Transport retry: 3 attempts, 4s base backoff capped at 10s.
const MAX_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_secs(4);
const RETRY_MAX_DELAY: Duration = Duration::from_secs(10);

/// Margin before token expiry when we proactively refresh.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 30;

const TOKEN_PATH: &str = "/v1.0/token?grant_type=1";

/// Vendor API seam the coordinator is driven through. Mutable receiver:
/// the client owns token and rate-limiter state, serialized by the
/// coordinator's single-flight lock.
#[async_trait]
pub trait ScaleApi: Send {
    /// Fetch one page of measurement history.
    async fn history_page(&mut self, page_no: u32, page_size: u32) -> Result<Vec<RawRecord>>;

    /// Request a body-composition analysis for one reconciled measurement.
    async fn analysis_report(&mut self, request: &AnalysisRequest) -> Result<AnalysisReport>;
}

/// Fetch measurement history up to `max_pages`, concatenating pages.
///
/// Stops early on an empty page (end of history) or a short page (last
/// page). Any single page failure aborts the whole fetch, naming the page;
/// partial results are discarded. Zero records overall is `EmptyResult`.
pub async fn fetch_history(api: &mut dyn ScaleApi, max_pages: u32) -> Result<Vec<RawRecord>> {
    let mut all_records = Vec::new();

    for page_no in 1..=max_pages {
        let records = api
            .history_page(page_no, PAGE_SIZE)
            .await
            .map_err(|err| err.with_page(page_no))?;
        tracing::debug!(page_no, count = records.len(), "Fetched history page");

        if records.is_empty() {
            break;
        }
        let last_page = records.len() < PAGE_SIZE as usize;
        all_records.extend(records);
        if last_page {
            break;
        }
    }

    if all_records.is_empty() {
        return Err(ScaleError::EmptyResult);
    }
    tracing::debug!(total = all_records.len(), "History fetch complete");
    Ok(all_records)
}

impl ScaleError {
    /// Add failing-page context without changing the error class.
    fn with_page(self, page_no: u32) -> Self {
        match self {
            ScaleError::Auth(msg) => ScaleError::Auth(format!("page {}: {}", page_no, msg)),
            ScaleError::Network(msg) => ScaleError::Network(format!("page {}: {}", page_no, msg)),
            ScaleError::Api(msg) => ScaleError::Api(format!("page {}: {}", page_no, msg)),
            other => other,
        }
    }
}

/// A device user discovered from measurement history (setup aid).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredUser {
    pub user_id: String,
    pub name: String,
}

/// Distinct `{user_id, nick_name}` pairs seen in history, in first-seen
/// order. Records without both fields are skipped.
pub fn distinct_users(records: &[RawRecord]) -> Vec<DiscoveredUser> {
    let mut seen = HashSet::new();
    let mut users = Vec::new();
    for record in records {
        let (Some(user_id), Some(name)) = (&record.user_id, &record.nick_name) else {
            continue;
        };
        if seen.insert(user_id.clone()) {
            users.push(DiscoveredUser {
                user_id: user_id.clone(),
                name: name.clone(),
            });
        }
    }
    users
}

/// Cached bearer token with its absolute expiry.
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Signed HTTP client for one configured device.
pub struct TuyaCloudClient {
    http: reqwest::Client,
    base_url: String,
    access_id: String,
    access_key: String,
    device_id: String,
    token: Option<CachedToken>,
    rate_limiter: RateLimiter,
}

impl TuyaCloudClient {
    pub fn new(config: &Config) -> Self {
        Self::with_base_url(config, config.region.base_url())
    }

    /// Client against an explicit endpoint instead of the configured
    /// region (tests point this at a local stub server).
    pub fn with_base_url(config: &Config, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            access_id: config.access_id.clone(),
            access_key: config.access_key.clone(),
            device_id: config.device_id.clone(),
            token: None,
            rate_limiter: RateLimiter::default(),
        }
    }

    /// Millisecond epoch timestamp as the signer expects it.
    fn timestamp_ms() -> String {
        Utc::now().timestamp_millis().to_string()
    }

    /// Send a request, retrying timeouts and connection failures with
    /// exponential backoff. Bad status and bad JSON are not retried here;
    /// the caller owns business-level retry.
    async fn send_with_retry(
        &self,
        build: impl Fn() -> reqwest::RequestBuilder,
    ) -> Result<reqwest::Response> {
        let mut delay = RETRY_BASE_DELAY;
        let mut attempt = 1;
        loop {
            match build().timeout(REQUEST_TIMEOUT).send().await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_timeout() || err.is_connect() => {
                    if attempt >= MAX_ATTEMPTS {
                        return Err(ScaleError::Network(err.to_string()));
                    }
                    tracing::warn!(
                        attempt,
                        error = %err,
                        "Transient network failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(RETRY_MAX_DELAY);
                    attempt += 1;
                }
                Err(err) => return Err(ScaleError::Api(err.to_string())),
            }
        }
    }

    /// Return a valid bearer token, acquiring one if absent or expiring.
    async fn ensure_token(&mut self) -> Result<String> {
        let margin = ChronoDuration::seconds(TOKEN_REFRESH_MARGIN_SECS);
        if let Some(token) = &self.token {
            if Utc::now() + margin < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        self.rate_limiter.acquire().await;
        let t = Self::timestamp_ms();
        let sign = sign_request(
            "GET",
            TOKEN_PATH,
            b"",
            &t,
            &self.access_id,
            &self.access_key,
            None,
        );
        let url = format!("{}{}", self.base_url, TOKEN_PATH);

        let response = self
            .send_with_retry(|| {
                self.http
                    .get(&url)
                    .header("client_id", &self.access_id)
                    .header("sign", &sign)
                    .header("t", &t)
                    .header("sign_method", "HMAC-SHA256")
            })
            .await?;

        if !response.status().is_success() {
            return Err(ScaleError::Auth(format!(
                "Token request failed with HTTP {}",
                response.status()
            )));
        }
        let envelope: ApiEnvelope = response
            .json()
            .await
            .map_err(|e| ScaleError::Auth(format!("Invalid token response: {}", e)))?;
        if !envelope.success {
            return Err(ScaleError::Auth(envelope.msg.unwrap_or_default()));
        }
        let grant: TokenGrant = envelope
            .result
            .ok_or_else(|| ScaleError::Auth("Token response missing result".to_string()))
            .and_then(|result| {
                serde_json::from_value(result)
                    .map_err(|e| ScaleError::Auth(format!("Invalid token grant: {}", e)))
            })?;

        let expires_at = Utc::now() + ChronoDuration::seconds(grant.expire_time);
        tracing::debug!(expires_at = %expires_at, "Access token acquired");
        self.token = Some(CachedToken {
            value: grant.access_token.clone(),
            expires_at,
        });
        Ok(grant.access_token)
    }

    /// Signed request with envelope handling and a single bounded retry on
    /// auth-shaped failures (fresh token, then give up with `Auth`).
    async fn request_envelope(
        &mut self,
        method: Method,
        path: &str,
        body: Option<String>,
    ) -> Result<Value> {
        for attempt in 0..2 {
            self.rate_limiter.acquire().await;
            let token = self.ensure_token().await?;
            let t = Self::timestamp_ms();
            let body_bytes = body.as_deref().unwrap_or("").as_bytes();
            let sign = sign_request(
                method.as_str(),
                path,
                body_bytes,
                &t,
                &self.access_id,
                &self.access_key,
                Some(&token),
            );
            let url = format!("{}{}", self.base_url, path);

            let response = self
                .send_with_retry(|| {
                    let mut request = self
                        .http
                        .request(method.clone(), &url)
                        .header("client_id", &self.access_id)
                        .header("access_token", &token)
                        .header("sign", &sign)
                        .header("t", &t)
                        .header("sign_method", "HMAC-SHA256");
                    if let Some(body) = &body {
                        request = request
                            .header(header::CONTENT_TYPE, "application/json")
                            .body(body.clone());
                    }
                    request
                })
                .await?;

            if response.status() == StatusCode::UNAUTHORIZED {
                tracing::info!(attempt, "Token rejected (401), invalidating");
                self.token = None;
                continue;
            }
            if !response.status().is_success() {
                return Err(ScaleError::Api(format!("HTTP {}", response.status())));
            }

            let envelope: ApiEnvelope = response
                .json()
                .await
                .map_err(|e| ScaleError::Api(format!("Invalid JSON response: {}", e)))?;
            if !envelope.success {
                let msg = envelope.msg.unwrap_or_default();
                if is_auth_message(&msg) {
                    if attempt == 0 {
                        tracing::info!(msg = %msg, "Auth-shaped API error, invalidating token");
                        self.token = None;
                        continue;
                    }
                    return Err(ScaleError::Auth(msg));
                }
                return Err(ScaleError::Api(msg));
            }
            return envelope
                .result
                .ok_or_else(|| ScaleError::Api("Envelope missing result".to_string()));
        }

        Err(ScaleError::Auth(
            "Request rejected twice with a fresh token".to_string(),
        ))
    }
}

#[async_trait]
impl ScaleApi for TuyaCloudClient {
    async fn history_page(&mut self, page_no: u32, page_size: u32) -> Result<Vec<RawRecord>> {
        let path = format!(
            "/v1.0/scales/{}/datas/history?page_no={}&page_size={}",
            self.device_id, page_no, page_size
        );
        let result = self.request_envelope(Method::GET, &path, None).await?;
        let page: HistoryPage = serde_json::from_value(result)
            .map_err(|e| ScaleError::Api(format!("Invalid history payload: {}", e)))?;
        Ok(page.records)
    }

    async fn analysis_report(&mut self, request: &AnalysisRequest) -> Result<AnalysisReport> {
        let path = format!("/v1.0/scales/{}/analysis-reports", self.device_id);
        let body = serde_json::to_string(request)
            .map_err(|e| ScaleError::Internal(anyhow::anyhow!("Serializing analysis body: {}", e)))?;
        let result = self
            .request_envelope(Method::POST, &path, Some(body))
            .await?;
        serde_json::from_value(result)
            .map_err(|e| ScaleError::Api(format!("Invalid analysis payload: {}", e)))
    }
}
