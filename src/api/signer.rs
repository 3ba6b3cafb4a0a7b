//! Request signing.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Produces the `X-Signature` header value from the account secret.
pub struct Signer {
    secret: SecretString,
}

impl Signer {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Base64 HMAC-SHA256 of `"{timestamp}.{method}.{path}"`.
    ///
    /// `path` excludes the query string. The timestamp must be the one sent
    /// in `X-Timestamp`; upstream rejects stale values.
    pub fn sign(&self, method: &str, path: &str, timestamp_ms: i64) -> String {
        let message = format!("{timestamp_ms}.{method}.{path}");
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(message.as_bytes());
        STANDARD.encode(mac.finalize().into_bytes())
    }
}

/// Current epoch time in milliseconds.
pub fn timestamp_millis() -> i64 {
    Utc::now().timestamp_millis()
}
