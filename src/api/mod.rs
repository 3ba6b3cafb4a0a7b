//! Naver Search Ad API integration.
//!
//! Every request goes through `PacedRetryClient`, which signs it, spaces it
//! out behind a pacing gate and retries according to the response status.
//! The wire itself sits behind the `Transport` trait so the retry policy can
//! be driven by scripted responses in tests.
//!
//! API: `https://api.searchad.naver.com`
//! Auth: HMAC-SHA256 signature over `{timestamp}.{method}.{path}`.
//! Rate limit: undocumented; bursts are answered with 403/429.

pub mod bids;
pub mod client;
pub mod signer;
pub mod stats;
pub mod transport;

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::types::{BidRow, SpeedMode, StatsRecord};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

pub const DEFAULT_BASE_URL: &str = "https://api.searchad.naver.com";

/// The API is picky about clients that don't look like a browser.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

// ---------------------------------------------------------------------------
// Requests and responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// An unsigned API request. It is signed again on every attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    /// Path without query string; this is what gets signed.
    pub path: &'static str,
    pub query: Vec<(&'static str, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: &'static str) -> Self {
        Self {
            method: HttpMethod::Get,
            path,
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: &'static str, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            path,
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn with_query(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.query.push((key, value.into()));
        self
    }

    /// Path plus percent-encoded query string.
    pub fn path_and_query(&self) -> String {
        if self.query.is_empty() {
            return self.path.to_string();
        }
        let query = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.path, query)
    }
}

/// Authentication headers for one attempt.
#[derive(Clone)]
pub struct AuthHeaders {
    pub timestamp: String,
    pub api_key: String,
    pub customer: String,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("connection failed: {0}")]
    Connection(String),
}

/// Why a client call produced no data. Callers only care that it failed.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("credentials rejected (HTTP 401)")]
    Unauthorized,

    #[error("gave up after {attempts} attempts")]
    Exhausted { attempts: u32 },
}

// ---------------------------------------------------------------------------
// Seams
// ---------------------------------------------------------------------------

/// Sends one signed request and hands back status and body untouched.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        request: &ApiRequest,
        auth: &AuthHeaders,
        timeout: Duration,
    ) -> Result<RawResponse, TransportError>;
}

/// Source of keyword statistics. `None` means "no usable stats".
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatsSource: Send + Sync {
    async fn fetch_stats(&self, raw_keyword: &str, mode: &SpeedMode) -> Option<StatsRecord>;
}

/// Source of per-device, per-position bid estimates. Always returns a full row.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BidSource: Send + Sync {
    async fn fetch_bids(&self, raw_keyword: &str, mode: &SpeedMode) -> BidRow;
}
