//! Scripted upstream for integration testing.
//!
//! Implements `Transport` with per-path queues of canned replies and records
//! every request it sees, together with the (tokio) time it arrived. Paths
//! with an exhausted script answer 500.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use keyword_scout::api::{ApiRequest, AuthHeaders, RawResponse, Transport, TransportError};

/// One canned reply.
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16, String),
    Timeout,
}

impl Reply {
    pub fn ok(body: serde_json::Value) -> Self {
        Reply::Status(200, body.to_string())
    }

    pub fn status(code: u16) -> Self {
        Reply::Status(code, String::new())
    }
}

/// What the transport saw for one attempt.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub at: Instant,
    pub request: ApiRequest,
    pub timestamp: String,
    pub api_key: String,
    pub customer: String,
    pub signature: String,
    pub timeout: Duration,
}

pub struct ScriptedTransport {
    scripts: Mutex<HashMap<&'static str, VecDeque<Reply>>>,
    seen: Mutex<Vec<SeenRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Queue replies for `path`, served in order.
    pub fn script(&self, path: &'static str, replies: impl IntoIterator<Item = Reply>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(path)
            .or_default()
            .extend(replies);
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn seen_for(&self, path: &str) -> Vec<SeenRequest> {
        self.seen().into_iter().filter(|s| s.request.path == path).collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(
        &self,
        request: &ApiRequest,
        auth: &AuthHeaders,
        timeout: Duration,
    ) -> Result<RawResponse, TransportError> {
        self.seen.lock().unwrap().push(SeenRequest {
            at: Instant::now(),
            request: request.clone(),
            timestamp: auth.timestamp.clone(),
            api_key: auth.api_key.clone(),
            customer: auth.customer.clone(),
            signature: auth.signature.clone(),
            timeout,
        });

        let reply = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(request.path)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Reply::status(500));

        match reply {
            Reply::Status(status, body) => Ok(RawResponse { status, body }),
            Reply::Timeout => Err(TransportError::Timeout(timeout)),
        }
    }
}
