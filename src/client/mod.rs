//! HTTP client for the external accrual service.
//!
//! Maps transport outcomes onto a closed error taxonomy the pipeline
//! switches on. Retry policy deliberately does NOT live here: the
//! backoff tables in the pipeline coordinate retries with persistence.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::model::OrderStatus;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Remote failure modes the pipeline's backoff policy branches on.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    /// 204: the accrual service does not know this order yet.
    #[error("order not registered in accrual system")]
    OrderNotRegistered,

    /// 429, with the parsed `Retry-After` (default 60s).
    #[error("rate limit exceeded, retry after {retry_after:?}")]
    RateLimitExceeded { retry_after: Duration },

    /// 5xx or transport failure (connect, timeout).
    #[error("accrual service unavailable")]
    Unavailable,

    /// Any other status the contract does not cover.
    #[error("unexpected accrual response status {0}")]
    UnexpectedStatus(u16),

    /// 200 with a body that does not parse.
    #[error("malformed accrual response: {0}")]
    Malformed(String),
}

/// Status vocabulary of the accrual service itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccrualStatus {
    Registered,
    Processing,
    Invalid,
    Processed,
}

impl From<AccrualStatus> for OrderStatus {
    // REGISTERED is not part of the order status domain; both
    // pre-terminal remote states map to PROCESSING.
    fn from(status: AccrualStatus) -> Self {
        match status {
            AccrualStatus::Registered | AccrualStatus::Processing => OrderStatus::Processing,
            AccrualStatus::Invalid => OrderStatus::Invalid,
            AccrualStatus::Processed => OrderStatus::Processed,
        }
    }
}

/// `GET /api/orders/{number}` response body.
#[derive(Debug, Clone, Deserialize)]
pub struct AccrualResponse {
    pub order: String,
    pub status: AccrualStatus,
    #[serde(default)]
    pub accrual: Option<Decimal>,
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    order: &'a str,
}

/// Seam the status workers consume the client through, so pipeline logic
/// is testable without a network.
#[async_trait]
pub trait AccrualApi: Send + Sync {
    /// Poll the accrual decision for one order.
    async fn get_order(&self, number: &str) -> Result<AccrualResponse, ClientError>;

    /// Register an order the accrual service answered 204 for.
    /// 200 and 202 both count as success.
    async fn register_order(&self, number: &str) -> Result<(), ClientError>;
}

pub struct AccrualClient {
    base_url: String,
    http: reqwest::Client,
}

impl AccrualClient {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .pool_max_idle_per_host(10)
            .user_agent(concat!("bonusd/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }
}

#[async_trait]
impl AccrualApi for AccrualClient {
    async fn get_order(&self, number: &str) -> Result<AccrualResponse, ClientError> {
        let url = format!("{}/api/orders/{}", self.base_url, number);

        let resp = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|_| ClientError::Unavailable)?;

        match resp.status().as_u16() {
            200 => resp
                .json::<AccrualResponse>()
                .await
                .map_err(|e| ClientError::Malformed(e.to_string())),
            204 => Err(ClientError::OrderNotRegistered),
            429 => {
                let retry_after = parse_retry_after(
                    resp.headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok()),
                );
                Err(ClientError::RateLimitExceeded { retry_after })
            }
            code if (500..600).contains(&code) => Err(ClientError::Unavailable),
            code => Err(ClientError::UnexpectedStatus(code)),
        }
    }

    async fn register_order(&self, number: &str) -> Result<(), ClientError> {
        let url = format!("{}/api/orders", self.base_url);

        let resp = self
            .http
            .post(&url)
            .json(&RegisterRequest { order: number })
            .send()
            .await
            .map_err(|_| ClientError::Unavailable)?;

        match resp.status().as_u16() {
            200 | 202 => Ok(()),
            429 => {
                let retry_after = parse_retry_after(
                    resp.headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok()),
                );
                Err(ClientError::RateLimitExceeded { retry_after })
            }
            code if (500..600).contains(&code) => Err(ClientError::Unavailable),
            code => Err(ClientError::UnexpectedStatus(code)),
        }
    }
}

/// `Retry-After` carries either seconds or an RFC 1123 date.
fn parse_retry_after(header: Option<&str>) -> Duration {
    let Some(header) = header else {
        return DEFAULT_RETRY_AFTER;
    };

    if let Ok(seconds) = header.trim().parse::<u64>() {
        return Duration::from_secs(seconds);
    }

    if let Ok(at) = chrono::DateTime::parse_from_rfc2822(header) {
        return (at.with_timezone(&chrono::Utc) - chrono::Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);
    }

    DEFAULT_RETRY_AFTER
}
