//! Batch runner.
//!
//! Walks the keyword list strictly one at a time. Upstream blocks bursts,
//! so there is no fan-out here: each keyword finishes (including all its
//! retries) before the next one starts.

use std::collections::HashSet;
use tracing::info;

use super::ProcessKeyword;
use crate::types::{BatchResult, SpeedMode};

/// Progress after one keyword, successful or not.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress<'a> {
    pub completed: usize,
    pub total: usize,
    pub keyword: &'a str,
    pub succeeded: bool,
}

impl Progress<'_> {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.completed as f64 / self.total as f64 * 100.0
    }
}

/// Split pasted text into keywords: one per line, trimmed, blanks dropped.
pub fn parse_keyword_input(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Drop repeats, keeping the first occurrence of each keyword in order.
pub fn dedupe_keywords<S: AsRef<str>>(keywords: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    keywords
        .iter()
        .map(|k| k.as_ref())
        .filter(|k| seen.insert(*k))
        .map(String::from)
        .collect()
}

pub struct BatchRunner<P> {
    processor: P,
}

impl<P: ProcessKeyword> BatchRunner<P> {
    pub fn new(processor: P) -> Self {
        Self { processor }
    }

    /// Process every keyword and collect the outcome.
    ///
    /// Never stops early. `on_progress` fires once per keyword, after it is
    /// done, with a monotonically increasing `completed` count.
    pub async fn run<S, F>(&self, raw_keywords: &[S], mode: &SpeedMode, mut on_progress: F) -> BatchResult
    where
        S: AsRef<str>,
        F: FnMut(Progress<'_>),
    {
        let keywords = dedupe_keywords(raw_keywords);
        let total = keywords.len();
        info!(
            total,
            duplicates = raw_keywords.len() - total,
            mode = %mode,
            "Starting keyword batch"
        );

        let mut succeeded = Vec::new();
        let mut failed = Vec::new();

        for (idx, keyword) in keywords.iter().enumerate() {
            let record = self.processor.process(keyword, mode).await;
            let ok = record.is_some();
            match record {
                Some(record) => succeeded.push(record),
                None => failed.push(keyword.clone()),
            }

            on_progress(Progress {
                completed: idx + 1,
                total,
                keyword,
                succeeded: ok,
            });
        }

        let result = BatchResult::new(succeeded, failed);
        info!(
            succeeded = result.succeeded.len(),
            failed = result.failed.len(),
            success_rate = %format!("{:.1}%", result.success_rate()),
            "Keyword batch complete"
        );
        result
    }
}
