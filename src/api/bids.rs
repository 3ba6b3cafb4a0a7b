//! Average-position bid estimates
//! (`POST /estimate/average-position-bid/keyword`).
//!
//! One request per device, PC first, each paced and retried on its own.
//! A device that fails keeps its five slots empty; the other device is
//! still fetched.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use super::client::PacedRetryClient;
use super::{ApiError, ApiRequest, BidSource};
use crate::sanitize::{clean_keyword, safe_number};
use crate::types::{BidRow, Device, SpeedMode, BID_POSITIONS};

pub const BID_ESTIMATE_PATH: &str = "/estimate/average-position-bid/keyword";

#[derive(Debug, Deserialize)]
struct BidEstimateResponse {
    /// `null` is treated like an empty list.
    #[serde(default)]
    estimate: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct BidEstimate {
    #[serde(default)]
    position: Option<Value>,
    #[serde(default)]
    bid: Option<Value>,
}

impl BidEstimate {
    fn position(&self) -> Option<u8> {
        u8::try_from(safe_number(self.position.as_ref(), -1)).ok()
    }
}

fn request_body(keyword: &str, device: Device) -> Value {
    let items: Vec<Value> = BID_POSITIONS
        .iter()
        .map(|position| json!({ "key": keyword, "position": position }))
        .collect();
    json!({ "device": device.as_str(), "items": items })
}

pub struct BidEstimateFetcher {
    client: Arc<PacedRetryClient>,
}

impl BidEstimateFetcher {
    pub fn new(client: Arc<PacedRetryClient>) -> Self {
        Self { client }
    }

    /// Estimates for one device as (position, bid) pairs.
    async fn fetch_device(
        &self,
        keyword: &str,
        device: Device,
        mode: &SpeedMode,
    ) -> Result<Vec<(u8, Option<Value>)>, ApiError> {
        let request = ApiRequest::post(BID_ESTIMATE_PATH, request_body(keyword, device));
        let response: BidEstimateResponse = self.client.call(&request, mode).await?;

        Ok(response
            .estimate
            .unwrap_or_default()
            .into_iter()
            .filter_map(|v| serde_json::from_value::<BidEstimate>(v).ok())
            .filter_map(|e| e.position().map(|p| (p, e.bid)))
            .collect())
    }
}

#[async_trait]
impl BidSource for BidEstimateFetcher {
    async fn fetch_bids(&self, raw_keyword: &str, mode: &SpeedMode) -> BidRow {
        let mut row = BidRow::empty();

        let keyword = clean_keyword(raw_keyword);
        if keyword.is_empty() {
            debug!(raw = raw_keyword, "Keyword empty after cleaning, skipping bids");
            return row;
        }

        for device in Device::ALL {
            match self.fetch_device(&keyword, device, mode).await {
                Ok(estimates) => {
                    for (position, bid) in estimates {
                        row.set(device, position, bid);
                    }
                }
                Err(e) => {
                    warn!(keyword = %keyword, device = %device, error = %e, "Bid estimates unavailable");
                }
            }
        }

        debug!(keyword = %keyword, filled = row.filled(), "Bid estimates collected");
        row
    }
}
