//! Per-keyword processing and the batch loop that drives it.

pub mod processor;
pub mod runner;

use async_trait::async_trait;

use crate::types::{KeywordRecord, SpeedMode};

/// Turns one raw keyword into an output record, or `None` when it failed.
///
/// Implementations must not let any failure escape; a failed keyword is
/// simply the absence of a record.
#[async_trait]
pub trait ProcessKeyword: Send + Sync {
    async fn process(&self, raw_keyword: &str, mode: &SpeedMode) -> Option<KeywordRecord>;
}
