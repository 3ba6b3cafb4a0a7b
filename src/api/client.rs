//! Paced, retrying API client.
//!
//! Handles pacing, signing, retry with backoff, and status classification.
//! Upstream answers bursts with 403/429, so every attempt first passes a
//! pacing gate and rate-limit responses back off along the configured
//! delay ladder.

use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::signer::{timestamp_millis, Signer};
use super::{ApiError, ApiRequest, AuthHeaders, Transport};
use crate::types::{Credentials, SpeedMode};

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

/// Classified result of a single attempt.
#[derive(Debug, PartialEq)]
pub enum AttemptOutcome<T> {
    Success(T),
    /// 403 or 429: back off before retrying.
    RateLimited { status: u16 },
    /// 401: retrying only burns budget.
    Unauthorized,
    /// Timeout, transport error, malformed body, or unexpected status.
    Transient(String),
}

/// Map a status and body onto the retry policy.
pub fn classify_response<T: DeserializeOwned>(status: u16, body: &str) -> AttemptOutcome<T> {
    match status {
        200 => match serde_json::from_str(body) {
            Ok(value) => AttemptOutcome::Success(value),
            Err(e) => AttemptOutcome::Transient(format!("malformed body: {e}")),
        },
        401 => AttemptOutcome::Unauthorized,
        403 | 429 => AttemptOutcome::RateLimited { status },
        other => AttemptOutcome::Transient(format!("HTTP {other}")),
    }
}

/// Delay for retry step `index`, reusing the last entry once the ladder runs out.
pub fn backoff_delay(delays: &[Duration], index: usize) -> Duration {
    match delays.len() {
        0 => Duration::ZERO,
        len => delays[index.min(len - 1)],
    }
}

// ---------------------------------------------------------------------------
// Pacing gate
// ---------------------------------------------------------------------------

/// Spaces out dispatches from one client.
///
/// Every attempt sleeps the full interval while holding the lock, so two
/// dispatches are never closer than the interval, even with concurrent callers.
#[derive(Debug, Default)]
pub struct PacingGate {
    lock: Mutex<()>,
    dispatched: AtomicU64,
}

impl PacingGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn wait(&self, interval: Duration) {
        let _guard = self.lock.lock().await;
        tokio::time::sleep(interval).await;
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Attempts let through so far.
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct PacedRetryClient {
    transport: Arc<dyn Transport>,
    signer: Signer,
    customer_id: String,
    access_key: String,
    gate: PacingGate,
}

impl PacedRetryClient {
    pub fn new(transport: Arc<dyn Transport>, credentials: Credentials) -> Self {
        let Credentials {
            customer_id,
            access_key,
            secret_key,
        } = credentials;

        Self {
            transport,
            signer: Signer::new(secret_key),
            customer_id,
            access_key,
            gate: PacingGate::new(),
        }
    }

    /// Total attempts sent through this client.
    pub fn requests_sent(&self) -> u64 {
        self.gate.dispatched()
    }

    /// Send `request` until it yields a parseable 200 or the budget runs out.
    ///
    /// Each retry first sleeps `backoff_delay(attempt - 1)`. A 403/429 adds
    /// `backoff_delay(attempt)` on top. A 200 with a bad body is retried
    /// without that extra delay.
    pub async fn call<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
        mode: &SpeedMode,
    ) -> Result<T, ApiError> {
        let attempts = mode.retry_count;

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = backoff_delay(&mode.retry_delays, (attempt - 1) as usize);
                debug!(
                    path = request.path,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying Search Ad request"
                );
                tokio::time::sleep(delay).await;
            }

            self.gate.wait(mode.pacing_interval()).await;

            match self.attempt::<T>(request, mode).await {
                AttemptOutcome::Success(value) => {
                    debug!(path = request.path, attempt, "Search Ad request succeeded");
                    return Ok(value);
                }
                AttemptOutcome::Unauthorized => {
                    warn!(path = request.path, "Search Ad rejected credentials (401), not retrying");
                    return Err(ApiError::Unauthorized);
                }
                AttemptOutcome::RateLimited { status } => {
                    let delay = backoff_delay(&mode.retry_delays, attempt as usize);
                    warn!(
                        path = request.path,
                        status,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Search Ad rate limited, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                AttemptOutcome::Transient(reason) => {
                    warn!(path = request.path, attempt, reason = %reason, "Search Ad request failed");
                }
            }
        }

        Err(ApiError::Exhausted { attempts })
    }

    /// One signed attempt. The timestamp is taken right before sending.
    async fn attempt<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
        mode: &SpeedMode,
    ) -> AttemptOutcome<T> {
        let timestamp = timestamp_millis();
        let auth = AuthHeaders {
            timestamp: timestamp.to_string(),
            api_key: self.access_key.clone(),
            customer: self.customer_id.clone(),
            signature: self.signer.sign(request.method.as_str(), request.path, timestamp),
        };

        match self.transport.send(request, &auth, mode.timeout).await {
            Ok(response) => classify_response(response.status, &response.body),
            Err(e) => AttemptOutcome::Transient(e.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
