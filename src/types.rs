//! Shared types for keyword-scout.
//!
//! Credentials and speed modes are fixed for one batch run. Stats and bid
//! rows live only while a single keyword is processed; `KeywordRecord` and
//! `BatchResult` are what the host hands to export.

use chrono::Local;
use secrecy::SecretString;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Search Ad API credentials. The secret never leaves this struct except
/// through the signer, and `Debug` redacts all three fields.
pub struct Credentials {
    pub customer_id: String,
    pub access_key: String,
    pub(crate) secret_key: SecretString,
}

impl Credentials {
    /// Validate and build credentials. Every field must be non-blank; values
    /// are stored exactly as given.
    pub fn new(
        customer_id: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Result<Self, KeywordScoutError> {
        let customer_id = customer_id.into();
        let access_key = access_key.into();
        let secret_key = secret_key.into();

        if customer_id.trim().is_empty() {
            return Err(KeywordScoutError::MissingCredential("customer_id"));
        }
        if access_key.trim().is_empty() {
            return Err(KeywordScoutError::MissingCredential("access_key"));
        }
        if secret_key.trim().is_empty() {
            return Err(KeywordScoutError::MissingCredential("secret_key"));
        }

        Ok(Self {
            customer_id,
            access_key,
            secret_key: SecretString::new(secret_key),
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("customer_id", &"[REDACTED]")
            .field("access_key", &"[REDACTED]")
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Speed modes
// ---------------------------------------------------------------------------

/// (name, calls/s, timeout s, retry count, retry delays s), slowest first.
const PRESETS: [(&str, f64, u64, u32, &[u64]); 5] = [
    ("초안전모드", 1.5, 30, 2, &[5, 15]),
    ("안전모드", 2.5, 25, 3, &[5, 10, 20]),
    ("균형모드", 4.0, 20, 3, &[3, 8, 15]),
    ("고속모드", 6.0, 15, 2, &[2, 8]),
    ("초고속모드", 8.0, 12, 2, &[2, 5]),
];

/// Preset index used when nothing else is configured.
pub const DEFAULT_SPEED_MODE: usize = 1;

/// Presets from this index upward are known to trigger 403 blocking.
const HIGH_RISK_FROM: usize = 3;

/// Request-rate and retry settings for one batch run.
///
/// `retry_delays` may be shorter than `retry_count`; the last delay is
/// reused for later attempts (see `api::client::backoff_delay`).
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedMode {
    pub name: String,
    pub calls_per_second: f64,
    pub timeout: Duration,
    pub retry_count: u32,
    pub retry_delays: Vec<Duration>,
}

impl SpeedMode {
    pub fn new(
        name: impl Into<String>,
        calls_per_second: f64,
        timeout: Duration,
        retry_count: u32,
        retry_delays: Vec<Duration>,
    ) -> Result<Self, KeywordScoutError> {
        let name = name.into();
        if !(calls_per_second.is_finite() && calls_per_second > 0.0) {
            return Err(KeywordScoutError::InvalidSpeedMode(format!(
                "{name}: calls_per_second must be > 0, got {calls_per_second}"
            )));
        }
        if Duration::try_from_secs_f64(1.0 / calls_per_second).is_err() {
            return Err(KeywordScoutError::InvalidSpeedMode(format!(
                "{name}: calls_per_second {calls_per_second} is too slow to pace"
            )));
        }
        if timeout.is_zero() {
            return Err(KeywordScoutError::InvalidSpeedMode(format!(
                "{name}: timeout must be > 0"
            )));
        }
        if retry_count == 0 {
            return Err(KeywordScoutError::InvalidSpeedMode(format!(
                "{name}: retry_count must be >= 1"
            )));
        }
        if retry_delays.is_empty() {
            return Err(KeywordScoutError::InvalidSpeedMode(format!(
                "{name}: retry_delays must not be empty"
            )));
        }

        Ok(Self {
            name,
            calls_per_second,
            timeout,
            retry_count,
            retry_delays,
        })
    }

    /// All five presets, slowest and safest first.
    pub fn presets() -> Vec<SpeedMode> {
        PRESETS
            .iter()
            .map(|(name, cps, timeout, retries, delays)| SpeedMode {
                name: (*name).to_string(),
                calls_per_second: *cps,
                timeout: Duration::from_secs(*timeout),
                retry_count: *retries,
                retry_delays: delays.iter().map(|s| Duration::from_secs(*s)).collect(),
            })
            .collect()
    }

    /// Look up a preset by its selection index (0..=4).
    pub fn preset(index: usize) -> Result<SpeedMode, KeywordScoutError> {
        Self::presets()
            .into_iter()
            .nth(index)
            .ok_or(KeywordScoutError::UnknownSpeedMode(index))
    }

    /// Whether the preset at `index` runs fast enough to risk 403 blocking.
    pub fn is_high_risk(index: usize) -> bool {
        index >= HIGH_RISK_FROM
    }

    /// Minimum gap between two outbound requests.
    pub fn pacing_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.calls_per_second)
    }
}

impl fmt::Display for SpeedMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:.1} calls/s, timeout {}s, {} attempts)",
            self.name,
            self.calls_per_second,
            self.timeout.as_secs(),
            self.retry_count,
        )
    }
}

// ---------------------------------------------------------------------------
// Bids
// ---------------------------------------------------------------------------

/// Ad-rank positions requested per device.
pub const BID_POSITIONS: [u8; 5] = [1, 2, 3, 4, 5];

/// Device the bid estimate applies to. Order matters: PC is fetched and
/// exported before MOBILE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Device {
    Pc,
    Mobile,
}

impl Device {
    pub const ALL: [Device; 2] = [Device::Pc, Device::Mobile];

    /// Upstream wire name, also used in column labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Pc => "PC",
            Device::Mobile => "MOBILE",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BidSlot {
    pub device: Device,
    pub position: u8,
}

/// Raw bid estimates for every (device, position) pair.
///
/// Always holds all ten slots; `None` means upstream gave no usable data.
/// Values stay raw JSON because upstream mixes numbers and numeric strings.
#[derive(Debug, Clone, PartialEq)]
pub struct BidRow {
    slots: BTreeMap<BidSlot, Option<Value>>,
}

impl BidRow {
    /// A row with every slot set to "no data".
    pub fn empty() -> Self {
        let mut slots = BTreeMap::new();
        for device in Device::ALL {
            for position in BID_POSITIONS {
                slots.insert(BidSlot { device, position }, None);
            }
        }
        Self { slots }
    }

    /// Record a bid. Positions outside 1..=5 are ignored.
    pub fn set(&mut self, device: Device, position: u8, bid: Option<Value>) {
        if let Some(slot) = self.slots.get_mut(&BidSlot { device, position }) {
            *slot = bid.filter(|v| !v.is_null());
        }
    }

    pub fn get(&self, device: Device, position: u8) -> Option<&Value> {
        self.slots
            .get(&BidSlot { device, position })
            .and_then(|v| v.as_ref())
    }

    /// Slots in export order (PC 1..5, then MOBILE 1..5).
    pub fn iter(&self) -> impl Iterator<Item = (&BidSlot, Option<&Value>)> {
        self.slots.iter().map(|(slot, bid)| (slot, bid.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of slots holding a value.
    pub fn filled(&self) -> usize {
        self.slots.values().filter(|v| v.is_some()).count()
    }
}

impl Default for BidRow {
    fn default() -> Self {
        Self::empty()
    }
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Normalized keyword statistics from `/keywordstool`.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsRecord {
    /// The keyword as upstream echoed it (`relKeyword`).
    pub keyword: String,
    pub pc_search_volume: i64,
    pub mobile_search_volume: i64,
    pub total_search_volume: i64,
    /// Average click-through rate as a fraction, when upstream sent a number.
    pub pc_ctr: Option<f64>,
    pub mobile_ctr: Option<f64>,
    pub competition_index: String,
}

// ---------------------------------------------------------------------------
// Output records
// ---------------------------------------------------------------------------

/// Export column labels. Order and spelling are part of the export contract.
pub const KEYWORD_COLUMNS: [&str; 17] = [
    "키워드",
    "PC 검색량",
    "모바일 검색량",
    "총 검색량",
    "PC 클릭률",
    "모바일 클릭률",
    "경쟁도",
    "PC 1위",
    "PC 2위",
    "PC 3위",
    "PC 4위",
    "PC 5위",
    "MOBILE 1위",
    "MOBILE 2위",
    "MOBILE 3위",
    "MOBILE 4위",
    "MOBILE 5위",
];

/// Header for the failed-keyword listing.
pub const FAILED_COLUMN: &str = "실패한 키워드";

/// One fully formatted output row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordRecord {
    /// The user's original input, not the sanitized form.
    pub keyword: String,
    pub pc_search_volume: String,
    pub mobile_search_volume: String,
    pub total_search_volume: String,
    pub pc_ctr: String,
    pub mobile_ctr: String,
    pub competition: String,
    pub pc_bids: [String; 5],
    pub mobile_bids: [String; 5],
}

impl KeywordRecord {
    /// Cell values aligned with `KEYWORD_COLUMNS`.
    pub fn values(&self) -> Vec<&str> {
        let mut values = vec![
            self.keyword.as_str(),
            self.pc_search_volume.as_str(),
            self.mobile_search_volume.as_str(),
            self.total_search_volume.as_str(),
            self.pc_ctr.as_str(),
            self.mobile_ctr.as_str(),
            self.competition.as_str(),
        ];
        values.extend(self.pc_bids.iter().map(String::as_str));
        values.extend(self.mobile_bids.iter().map(String::as_str));
        values
    }
}

impl Serialize for KeywordRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(KEYWORD_COLUMNS.len()))?;
        for (column, value) in KEYWORD_COLUMNS.iter().zip(self.values()) {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Outcome of one batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub timestamp: String,
    pub succeeded: Vec<KeywordRecord>,
    /// Raw keywords exactly as the user entered them.
    pub failed: Vec<String>,
}

impl BatchResult {
    pub fn new(succeeded: Vec<KeywordRecord>, failed: Vec<String>) -> Self {
        Self {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            succeeded,
            failed,
        }
    }

    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// Percentage of attempted keywords that produced a record.
    pub fn success_rate(&self) -> f64 {
        let attempted = self.attempted();
        if attempted == 0 {
            return 0.0;
        }
        self.succeeded.len() as f64 / attempted as f64 * 100.0
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Validation errors raised before a batch starts.
#[derive(Debug, thiserror::Error)]
pub enum KeywordScoutError {
    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("Invalid speed mode: {0}")]
    InvalidSpeedMode(String),

    #[error("Unknown speed mode index {0} (expected 0..=4)")]
    UnknownSpeedMode(usize),

    #[error("No keywords to process")]
    NoKeywords,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
