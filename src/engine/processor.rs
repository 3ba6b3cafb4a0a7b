//! Keyword processor.
//!
//! Fetches stats, then bids, and formats both into one 17-column record.
//! Bids are only requested once stats came back, so keywords upstream does
//! not know don't burn rate-limit budget.

use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tracing::{debug, error};

use super::ProcessKeyword;
use crate::api::{BidSource, StatsSource};
use crate::sanitize::{format_bid, format_number, format_percentage};
use crate::types::{BidRow, Device, KeywordRecord, SpeedMode, StatsRecord, BID_POSITIONS};

pub struct KeywordProcessor<S, B> {
    stats: S,
    bids: B,
}

impl<S: StatsSource, B: BidSource> KeywordProcessor<S, B> {
    pub fn new(stats: S, bids: B) -> Self {
        Self { stats, bids }
    }

    async fn fetch_and_merge(&self, raw_keyword: &str, mode: &SpeedMode) -> Option<KeywordRecord> {
        let Some(stats) = self.stats.fetch_stats(raw_keyword, mode).await else {
            debug!(keyword = raw_keyword, "No stats, skipping bid estimates");
            return None;
        };
        let bids = self.bids.fetch_bids(raw_keyword, mode).await;
        Some(build_record(raw_keyword, &stats, &bids))
    }
}

#[async_trait]
impl<S: StatsSource, B: BidSource> ProcessKeyword for KeywordProcessor<S, B> {
    async fn process(&self, raw_keyword: &str, mode: &SpeedMode) -> Option<KeywordRecord> {
        match AssertUnwindSafe(self.fetch_and_merge(raw_keyword, mode))
            .catch_unwind()
            .await
        {
            Ok(record) => record,
            Err(panic) => {
                error!(
                    keyword = raw_keyword,
                    reason = panic_message(panic.as_ref()),
                    "Keyword processing panicked, marking as failed"
                );
                None
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

/// Format stats and bids into the export row, keyed by the raw keyword.
pub fn build_record(raw_keyword: &str, stats: &StatsRecord, bids: &BidRow) -> KeywordRecord {
    let device_bids = |device: Device| BID_POSITIONS.map(|p| format_bid(bids.get(device, p)));

    KeywordRecord {
        keyword: raw_keyword.to_string(),
        pc_search_volume: format_number(stats.pc_search_volume),
        mobile_search_volume: format_number(stats.mobile_search_volume),
        total_search_volume: format_number(stats.total_search_volume),
        pc_ctr: format_percentage(stats.pc_ctr),
        mobile_ctr: format_percentage(stats.mobile_ctr),
        competition: stats.competition_index.clone(),
        pc_bids: device_bids(Device::Pc),
        mobile_bids: device_bids(Device::Mobile),
    }
}
