//! reqwest-backed transport.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::{
    ApiRequest, AuthHeaders, HttpMethod, RawResponse, Transport, TransportError, JSON_CONTENT_TYPE,
};

/// Sends signed requests over one keep-alive `reqwest::Client`.
///
/// TLS verification is left at reqwest's default (on).
pub struct HttpTransport {
    http: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, user_agent: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client for Search Ad API")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        request: &ApiRequest,
        auth: &AuthHeaders,
        timeout: Duration,
    ) -> Result<RawResponse, TransportError> {
        let url = format!("{}{}", self.base_url, request.path_and_query());
        debug!(method = request.method.as_str(), path = request.path, "Search Ad API request");

        let mut builder = match request.method {
            HttpMethod::Get => self.http.get(&url),
            HttpMethod::Post => self.http.post(&url),
        };
        builder = builder
            .timeout(timeout)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .header("X-Timestamp", auth.timestamp.as_str())
            .header("X-API-KEY", auth.api_key.as_str())
            .header("X-Customer", auth.customer.as_str())
            .header("X-Signature", auth.signature.as_str());
        if let Some(body) = &request.body {
            builder = builder.body(body.to_string());
        }

        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                TransportError::Timeout(timeout)
            } else if e.is_connect() {
                TransportError::Connection(e.to_string())
            } else {
                TransportError::Request(e)
            }
        };

        let response = builder.send().await.map_err(map_err)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_err)?;

        Ok(RawResponse { status, body })
    }
}
