//! HTTP client for the analytics API.
//!
//! Every call takes an explicit [`Session`] — the bearer token is issued by
//! the ops SSO service and merely presented here, never stored in any global.
//! The client's job ends at delivering well-typed rows: derivation lives in
//! [`crate::metrics`], and a failed fetch never reaches it as a partial array.

use reqwest::{header, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::types::{
    BulkRegisterOutcome, DailyMetric, DashboardSummary, RegisterOutcome, RemoveOutcome, TimeRange,
    ValidateOutcome, WalletPage, WalletRanking,
};

/// Bearer token for one authenticated user, passed per call.
#[derive(Debug, Clone)]
pub struct Session {
    token: String,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("api returned {status}: {message}")]
    Api { status: StatusCode, message: String },
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Token missing/expired — the web layer turns this into a login redirect.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Self::Api {
                status: StatusCode::UNAUTHORIZED,
                ..
            }
        )
    }
}

/// Error body shape the API uses for non-2xx responses.
#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest<'a> {
    address: &'a str,
    label: Option<&'a str>,
    trigger_backfill: bool,
}

#[derive(serde::Serialize)]
pub struct BulkEntry {
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(serde::Serialize)]
struct BulkRegisterRequest<'a> {
    wallets: &'a [BulkEntry],
}

#[derive(serde::Serialize)]
struct ValidateRequest<'a> {
    address: &'a str,
}

pub struct DashboardApi {
    base_url: String,
    http: reqwest::Client,
}

impl DashboardApi {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    pub fn summary_url(&self) -> String {
        format!("{}/api/v1/dashboard/summary", self.base_url)
    }

    pub fn timeseries_url(&self, range: TimeRange) -> String {
        let mut url = Url::parse(&format!("{}/api/v1/metrics/global", self.base_url))
            .expect("api base_url must be a valid absolute URL");
        url.query_pairs_mut().append_pair("range", range.as_str());
        url.to_string()
    }

    pub fn top_wallets_url(&self, window: TimeRange, limit: u32) -> String {
        let mut url = Url::parse(&format!("{}/api/v1/wallets/top", self.base_url))
            .expect("api base_url must be a valid absolute URL");
        {
            let mut qp = url.query_pairs_mut();
            qp.append_pair("window", window.as_str());
            qp.append_pair("limit", &limit.to_string());
        }
        url.to_string()
    }

    pub fn wallets_url(&self, limit: u32, offset: u32) -> String {
        let mut url = Url::parse(&format!("{}/api/v1/wallets", self.base_url))
            .expect("api base_url must be a valid absolute URL");
        {
            let mut qp = url.query_pairs_mut();
            qp.append_pair("limit", &limit.to_string());
            qp.append_pair("offset", &offset.to_string());
        }
        url.to_string()
    }

    pub async fn fetch_summary(&self, session: &Session) -> Result<DashboardSummary, ApiError> {
        self.execute(self.http.get(self.summary_url()), session)
            .await
    }

    /// Global daily series for the requested range, sorted ascending by day
    /// with duplicate days dropped so downstream derivation can rely on the
    /// series invariant.
    pub async fn fetch_global_timeseries(
        &self,
        session: &Session,
        range: TimeRange,
    ) -> Result<Vec<DailyMetric>, ApiError> {
        let rows: Vec<DailyMetric> = self
            .execute(self.http.get(self.timeseries_url(range)), session)
            .await?;
        Ok(normalize_series(rows))
    }

    pub async fn fetch_top_wallets(
        &self,
        session: &Session,
        window: TimeRange,
        limit: u32,
    ) -> Result<Vec<WalletRanking>, ApiError> {
        self.execute(self.http.get(self.top_wallets_url(window, limit)), session)
            .await
    }

    pub async fn list_wallets(
        &self,
        session: &Session,
        limit: u32,
        offset: u32,
    ) -> Result<WalletPage, ApiError> {
        self.execute(self.http.get(self.wallets_url(limit, offset)), session)
            .await
    }

    pub async fn register_wallet(
        &self,
        session: &Session,
        address: &str,
        label: Option<&str>,
        trigger_backfill: bool,
    ) -> Result<RegisterOutcome, ApiError> {
        let body = RegisterRequest {
            address,
            label,
            trigger_backfill,
        };
        let req = self
            .http
            .post(format!("{}/api/v1/wallets", self.base_url))
            .json(&body);
        self.execute(req, session).await
    }

    pub async fn register_bulk(
        &self,
        session: &Session,
        wallets: &[BulkEntry],
    ) -> Result<BulkRegisterOutcome, ApiError> {
        let req = self
            .http
            .post(format!("{}/api/v1/wallets/bulk", self.base_url))
            .json(&BulkRegisterRequest { wallets });
        self.execute(req, session).await
    }

    pub async fn remove_wallet(
        &self,
        session: &Session,
        wallet_id: i64,
    ) -> Result<RemoveOutcome, ApiError> {
        let req = self
            .http
            .delete(format!("{}/api/v1/wallets/{wallet_id}", self.base_url));
        self.execute(req, session).await
    }

    pub async fn validate_wallet(
        &self,
        session: &Session,
        address: &str,
    ) -> Result<ValidateOutcome, ApiError> {
        let req = self
            .http
            .post(format!("{}/api/v1/wallets/validate", self.base_url))
            .json(&ValidateRequest { address });
        self.execute(req, session).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
        session: &Session,
    ) -> Result<T, ApiError> {
        let started = std::time::Instant::now();
        let resp = req
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", session.token()),
            )
            .send()
            .await?;
        metrics::counter!("api_requests_total").increment(1);
        metrics::histogram!("api_request_latency_ms")
            .record(started.elapsed().as_secs_f64() * 1000.0);

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|e| e.message)
                .unwrap_or_else(|_| format!("API error: {status}"));
            tracing::warn!(%status, %message, "api request rejected");
            return Err(ApiError::Api { status, message });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

/// Sort ascending by day and drop duplicate days (first occurrence wins).
/// The API already promises this ordering; enforcing it here keeps the
/// derivation layer's input invariant local to one place.
fn normalize_series(mut rows: Vec<DailyMetric>) -> Vec<DailyMetric> {
    rows.sort_by_key(|r| r.day);
    rows.dedup_by(|a, b| {
        if a.day == b.day {
            tracing::warn!(day = %a.day, "duplicate day in timeseries, dropping");
            true
        } else {
            false
        }
    });
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn api() -> DashboardApi {
        DashboardApi::new("http://localhost:3001/", Duration::from_secs(15))
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        assert_eq!(
            api().summary_url(),
            "http://localhost:3001/api/v1/dashboard/summary"
        );
    }

    #[test]
    fn test_timeseries_url_carries_range() {
        let url = api().timeseries_url(TimeRange::Quarter);
        assert!(url.contains("/api/v1/metrics/global"));
        assert!(url.contains("range=90d"));
    }

    #[test]
    fn test_top_wallets_url() {
        let url = api().top_wallets_url(TimeRange::Month, 50);
        assert!(url.contains("window=30d"));
        assert!(url.contains("limit=50"));
    }

    #[test]
    fn test_wallets_url_pagination() {
        let url = api().wallets_url(50, 100);
        assert!(url.contains("limit=50"));
        assert!(url.contains("offset=100"));
    }

    #[test]
    fn test_parse_timeseries_response() {
        let json = r#"[
            {"day":"2026-01-18","dau":1100,"spot_volume_usd":"1000.50","perp_volume_usd":"2000"},
            {"day":"2026-01-19","dau":1200,"spot_volume_usd":"1100.25","perp_volume_usd":"2100"}
        ]"#;
        let rows: Vec<DailyMetric> = serde_json::from_str(json).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].active_wallets, 1200);
    }

    #[test]
    fn test_parse_fixture_timeseries() {
        let json = include_str!("../../../tests/fixtures/global_metrics_sample.json");
        let rows: Vec<DailyMetric> = serde_json::from_str(json).unwrap();
        assert!(!rows.is_empty());
        assert!(rows.iter().all(|r| r.spot_volume_usd >= Decimal::ZERO));
    }

    #[test]
    fn test_parse_fixture_top_wallets() {
        let json = include_str!("../../../tests/fixtures/top_wallets_sample.json");
        let rows: Vec<WalletRanking> = serde_json::from_str(json).unwrap();
        assert!(!rows.is_empty());
    }

    #[test]
    fn test_parse_fixture_wallet_page() {
        let json = include_str!("../../../tests/fixtures/wallets_list_sample.json");
        let page: WalletPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.wallets.len() as i64, page.total);
    }

    #[test]
    fn test_normalize_series_sorts_and_dedupes() {
        let json = r#"[
            {"day":"2026-01-19","dau":3,"spot_volume_usd":"3","perp_volume_usd":"3"},
            {"day":"2026-01-17","dau":1,"spot_volume_usd":"1","perp_volume_usd":"1"},
            {"day":"2026-01-17","dau":9,"spot_volume_usd":"9","perp_volume_usd":"9"},
            {"day":"2026-01-18","dau":2,"spot_volume_usd":"2","perp_volume_usd":"2"}
        ]"#;
        let rows: Vec<DailyMetric> = serde_json::from_str(json).unwrap();
        let normalized = normalize_series(rows);
        let days: Vec<String> = normalized.iter().map(|r| r.day.to_string()).collect();
        assert_eq!(days, vec!["2026-01-17", "2026-01-18", "2026-01-19"]);
        // first occurrence of the duplicated day wins
        assert_eq!(normalized[0].active_wallets, 1);
    }

    #[test]
    fn test_register_request_serializes_camel_case_backfill() {
        let body = RegisterRequest {
            address: "0xabc",
            label: Some("Main"),
            trigger_backfill: true,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"triggerBackfill\":true"));
        assert!(json.contains("\"label\":\"Main\""));
    }

    #[test]
    fn test_validate_request_and_outcome() {
        let json = serde_json::to_string(&ValidateRequest { address: "0xabc" }).unwrap();
        assert_eq!(json, r#"{"address":"0xabc"}"#);

        let outcome: ValidateOutcome =
            serde_json::from_str(r#"{"valid":true,"hasActivity":false}"#).unwrap();
        assert!(outcome.valid);
        assert!(!outcome.has_activity);
        assert!(outcome.error.is_none());
    }

    #[test]
    fn test_error_body_parses() {
        let body: ErrorBody = serde_json::from_str(r#"{"message":"invalid address"}"#).unwrap();
        assert_eq!(body.message, "invalid address");
    }
}
