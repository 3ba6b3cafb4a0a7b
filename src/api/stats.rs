//! Keyword statistics (`GET /keywordstool`).
//!
//! Upstream returns the hint keyword plus related keywords; only the first
//! entry with a non-empty `relKeyword` is kept.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use super::client::PacedRetryClient;
use super::{ApiRequest, StatsSource};
use crate::sanitize::{clean_keyword, numeric_field, safe_number};
use crate::types::{SpeedMode, StatsRecord};

pub const KEYWORD_TOOL_PATH: &str = "/keywordstool";

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeywordToolResponse {
    /// Kept as raw values; one odd entry must not sink the whole list.
    /// Absent and `null` both mean "no matches".
    #[serde(default)]
    keyword_list: Option<Vec<Value>>,
}

/// Counts arrive as numbers or as threshold strings like `"< 10"`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeywordToolItem {
    #[serde(default)]
    rel_keyword: Option<Value>,
    #[serde(default)]
    monthly_pc_qc_cnt: Option<Value>,
    #[serde(default)]
    monthly_mobile_qc_cnt: Option<Value>,
    #[serde(default)]
    monthly_ave_pc_ctr: Option<Value>,
    #[serde(default)]
    monthly_ave_mobile_ctr: Option<Value>,
    #[serde(default)]
    comp_idx: Option<Value>,
}

impl KeywordToolItem {
    fn rel_keyword(&self) -> Option<&str> {
        self.rel_keyword
            .as_ref()
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    fn into_record(self) -> Option<StatsRecord> {
        let keyword = self.rel_keyword()?.to_string();
        let pc = safe_number(self.monthly_pc_qc_cnt.as_ref(), 0).max(0);
        let mobile = safe_number(self.monthly_mobile_qc_cnt.as_ref(), 0).max(0);
        let competition_index = match &self.comp_idx {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => "-".to_string(),
        };

        Some(StatsRecord {
            keyword,
            pc_search_volume: pc,
            mobile_search_volume: mobile,
            total_search_volume: pc.saturating_add(mobile),
            pc_ctr: numeric_field(self.monthly_ave_pc_ctr.as_ref()),
            mobile_ctr: numeric_field(self.monthly_ave_mobile_ctr.as_ref()),
            competition_index,
        })
    }
}

/// First candidate with a usable `relKeyword`, normalized.
fn first_match(candidates: Vec<Value>) -> Option<StatsRecord> {
    candidates
        .into_iter()
        .filter_map(|v| serde_json::from_value::<KeywordToolItem>(v).ok())
        .find_map(KeywordToolItem::into_record)
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

pub struct KeywordStatsFetcher {
    client: Arc<PacedRetryClient>,
}

impl KeywordStatsFetcher {
    pub fn new(client: Arc<PacedRetryClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StatsSource for KeywordStatsFetcher {
    async fn fetch_stats(&self, raw_keyword: &str, mode: &SpeedMode) -> Option<StatsRecord> {
        let keyword = clean_keyword(raw_keyword);
        if keyword.is_empty() {
            debug!(raw = raw_keyword, "Keyword empty after cleaning, skipping stats");
            return None;
        }

        let request = ApiRequest::get(KEYWORD_TOOL_PATH)
            .with_query("hintKeywords", keyword.as_str())
            .with_query("showDetail", "1");

        let response: KeywordToolResponse = match self.client.call(&request, mode).await {
            Ok(response) => response,
            Err(e) => {
                warn!(keyword = %keyword, error = %e, "Keyword stats unavailable");
                return None;
            }
        };

        let candidates = response.keyword_list.unwrap_or_default();
        let count = candidates.len();
        let record = first_match(candidates);
        if record.is_none() {
            debug!(keyword = %keyword, candidates = count, "No matching keyword in stats response");
        }
        record
    }
}
