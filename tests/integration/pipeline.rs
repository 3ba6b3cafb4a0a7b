//! Retry, pacing and pipeline behaviour against the scripted upstream.
//!
//! All tests run on paused tokio time, so every sleep is exact and instant.

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use keyword_scout::api::bids::{BidEstimateFetcher, BID_ESTIMATE_PATH};
use keyword_scout::api::client::PacedRetryClient;
use keyword_scout::api::signer::Signer;
use keyword_scout::api::stats::{KeywordStatsFetcher, KEYWORD_TOOL_PATH};
use keyword_scout::api::{ApiError, ApiRequest, BidSource, StatsSource};
use keyword_scout::engine::processor::KeywordProcessor;
use keyword_scout::engine::runner::BatchRunner;
use keyword_scout::types::{Credentials, Device, SpeedMode};
use secrecy::SecretString;

use crate::mock_upstream::{Reply, ScriptedTransport};

const SECRET: &str = "test-secret";

fn credentials() -> Credentials {
    Credentials::new("1234", "access-key", SECRET).unwrap()
}

/// 2 calls/s (0.5s gap), 3 attempts, delays 1s then 3s.
fn test_mode() -> SpeedMode {
    SpeedMode::new(
        "test",
        2.0,
        Duration::from_secs(10),
        3,
        vec![Duration::from_secs(1), Duration::from_secs(3)],
    )
    .unwrap()
}

fn setup() -> (Arc<ScriptedTransport>, Arc<PacedRetryClient>) {
    let transport = Arc::new(ScriptedTransport::new());
    let client = Arc::new(PacedRetryClient::new(transport.clone(), credentials()));
    (transport, client)
}

fn offsets(transport: &ScriptedTransport, start: Instant) -> Vec<Duration> {
    transport.seen().iter().map(|s| s.at - start).collect()
}

fn ms(values: &[u64]) -> Vec<Duration> {
    values.iter().map(|v| Duration::from_millis(*v)).collect()
}

fn stats_body(keyword: &str) -> Value {
    json!({
        "keywordList": [{
            "relKeyword": keyword,
            "monthlyPcQcCnt": 12000,
            "monthlyMobileQcCnt": "< 10",
            "monthlyAvePcCtr": 0.0123,
            "monthlyAveMobileCtr": 0.5,
            "compIdx": "높음"
        }]
    })
}

// -- Retry policy ---------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_rate_limited_twice_then_success() {
    let (transport, client) = setup();
    transport.script(
        KEYWORD_TOOL_PATH,
        [Reply::status(429), Reply::status(403), Reply::ok(json!({"ok": true}))],
    );
    let start = Instant::now();

    let value: Value = client
        .call(&ApiRequest::get(KEYWORD_TOOL_PATH), &test_mode())
        .await
        .unwrap();

    assert_eq!(value, json!({"ok": true}));
    // pacing 0.5 | +1 extra, +1 base, pacing | +3 extra, +3 base, pacing
    assert_eq!(offsets(&transport, start), ms(&[500, 3_000, 9_500]));
    assert_eq!(client.requests_sent(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_unauthorized_is_not_retried() {
    let (transport, client) = setup();
    transport.script(KEYWORD_TOOL_PATH, [Reply::status(401), Reply::ok(json!({}))]);

    let err = client
        .call::<Value>(&ApiRequest::get(KEYWORD_TOOL_PATH), &test_mode())
        .await
        .unwrap_err();

    assert_eq!(err, ApiError::Unauthorized);
    assert_eq!(transport.seen().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_server_errors_exhaust_budget() {
    let (transport, client) = setup();
    let start = Instant::now();

    let err = client
        .call::<Value>(&ApiRequest::get(KEYWORD_TOOL_PATH), &test_mode())
        .await
        .unwrap_err();

    assert_eq!(err, ApiError::Exhausted { attempts: 3 });
    // No extra delay on 5xx: only the base delay before each retry.
    assert_eq!(offsets(&transport, start), ms(&[500, 2_000, 5_500]));
}

#[tokio::test(start_paused = true)]
async fn test_malformed_body_and_timeout_are_retried() {
    let (transport, client) = setup();
    transport.script(
        KEYWORD_TOOL_PATH,
        [
            Reply::Status(200, "<html>oops</html>".to_string()),
            Reply::Timeout,
            Reply::ok(json!([1, 2, 3])),
        ],
    );
    let start = Instant::now();

    let value: Vec<i64> = client
        .call(&ApiRequest::get(KEYWORD_TOOL_PATH), &test_mode())
        .await
        .unwrap();

    assert_eq!(value, vec![1, 2, 3]);
    assert_eq!(offsets(&transport, start), ms(&[500, 2_000, 5_500]));
}

#[tokio::test(start_paused = true)]
async fn test_short_delay_ladder_reuses_last_entry() {
    let (transport, client) = setup();
    let mode = SpeedMode::new("short", 4.0, Duration::from_secs(5), 4, vec![Duration::from_secs(2)])
        .unwrap();
    let start = Instant::now();

    let err = client
        .call::<Value>(&ApiRequest::get(KEYWORD_TOOL_PATH), &mode)
        .await
        .unwrap_err();

    assert_eq!(err, ApiError::Exhausted { attempts: 4 });
    assert_eq!(offsets(&transport, start), ms(&[250, 2_500, 4_750, 7_000]));
    assert!(transport
        .seen()
        .iter()
        .all(|s| s.timeout == Duration::from_secs(5)));
}

#[tokio::test(start_paused = true)]
async fn test_every_attempt_is_signed() {
    let (transport, client) = setup();
    transport.script(BID_ESTIMATE_PATH, [Reply::status(429), Reply::ok(json!({}))]);

    let _: Value = client
        .call(&ApiRequest::post(BID_ESTIMATE_PATH, json!({"device": "PC"})), &test_mode())
        .await
        .unwrap();

    let signer = Signer::new(SecretString::new(SECRET.to_string()));
    let seen = transport.seen();
    assert_eq!(seen.len(), 2);
    for request in seen {
        let ts: i64 = request.timestamp.parse().unwrap();
        assert_eq!(request.signature, signer.sign("POST", BID_ESTIMATE_PATH, ts));
        assert_eq!(request.api_key, "access-key");
        assert_eq!(request.customer, "1234");
        assert!(!request.signature.contains(SECRET));
    }
}

// -- Fetchers -------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_stats_request_carries_cleaned_keyword() {
    let (transport, client) = setup();
    transport.script(KEYWORD_TOOL_PATH, [Reply::ok(stats_body("노트북 가방"))]);
    let fetcher = KeywordStatsFetcher::new(client);

    let stats = fetcher.fetch_stats("  노트북\t가방!! ", &test_mode()).await.unwrap();

    assert_eq!(stats.keyword, "노트북 가방");
    assert_eq!(stats.pc_search_volume, 12_000);
    assert_eq!(stats.mobile_search_volume, 10);
    assert_eq!(stats.total_search_volume, 12_010);
    let seen = transport.seen();
    assert_eq!(
        seen[0].request.query,
        vec![
            ("hintKeywords", "노트북 가방".to_string()),
            ("showDetail", "1".to_string()),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_bids_survive_one_device_failing() {
    let (transport, client) = setup();
    transport.script(
        BID_ESTIMATE_PATH,
        [
            Reply::status(401),
            Reply::ok(json!({"estimate": [
                {"position": 1, "bid": 2300},
                {"position": 2, "bid": "1,100"},
                {"position": 9, "bid": 50}
            ]})),
        ],
    );
    let fetcher = BidEstimateFetcher::new(client);

    let row = fetcher.fetch_bids("노트북", &test_mode()).await;

    assert_eq!(row.len(), 10);
    assert_eq!(row.filled(), 2);
    assert!(row.get(Device::Pc, 1).is_none());
    assert_eq!(row.get(Device::Mobile, 1), Some(&json!(2300)));
    assert_eq!(row.get(Device::Mobile, 2), Some(&json!("1,100")));

    let seen = transport.seen_for(BID_ESTIMATE_PATH);
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].request.body.as_ref().unwrap()["device"], "PC");
    assert_eq!(seen[1].request.body.as_ref().unwrap()["device"], "MOBILE");
}

#[tokio::test(start_paused = true)]
async fn test_null_keyword_list_is_not_retried() {
    let (transport, client) = setup();
    transport.script(KEYWORD_TOOL_PATH, [Reply::ok(json!({"keywordList": null}))]);
    let fetcher = KeywordStatsFetcher::new(client.clone());
    let start = Instant::now();

    assert!(fetcher.fetch_stats("노트북", &test_mode()).await.is_none());

    assert_eq!(offsets(&transport, start), ms(&[500]));
    assert_eq!(client.requests_sent(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_null_estimate_is_not_retried() {
    let (transport, client) = setup();
    transport.script(
        BID_ESTIMATE_PATH,
        [Reply::ok(json!({"estimate": null})), Reply::ok(json!({"estimate": null}))],
    );
    let fetcher = BidEstimateFetcher::new(client.clone());
    let start = Instant::now();

    let row = fetcher.fetch_bids("노트북", &test_mode()).await;

    assert_eq!(row.filled(), 0);
    // One paced request per device, no backoff.
    assert_eq!(offsets(&transport, start), ms(&[500, 1_000]));
    assert_eq!(client.requests_sent(), 2);
}

// -- Full pipeline ----------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_batch_pipeline() {
    let (transport, client) = setup();
    transport.script(
        KEYWORD_TOOL_PATH,
        [
            Reply::ok(stats_body("노트북")),
            Reply::ok(json!({"keywordList": []})),
        ],
    );
    transport.script(
        BID_ESTIMATE_PATH,
        [
            Reply::ok(json!({"estimate": [
                {"position": 1, "bid": 1500},
                {"position": 2, "bid": "1200"},
                {"position": 3, "bid": 0}
            ]})),
            Reply::ok(json!({"estimate": [{"position": 1, "bid": 2300}]})),
        ],
    );

    let runner = BatchRunner::new(KeywordProcessor::new(
        KeywordStatsFetcher::new(client.clone()),
        BidEstimateFetcher::new(client.clone()),
    ));
    let mut progress = Vec::new();

    let result = runner
        .run(&["노트북", "없는키워드", "노트북", "!!!"], &test_mode(), |p| {
            progress.push((p.completed, p.total, p.succeeded))
        })
        .await;

    assert_eq!(progress, vec![(1, 3, true), (2, 3, false), (3, 3, false)]);
    assert_eq!(result.failed, vec!["없는키워드".to_string(), "!!!".to_string()]);
    assert_eq!(result.succeeded.len(), 1);

    let record = &result.succeeded[0];
    assert_eq!(
        record.values(),
        vec![
            "노트북", "12,000", "10", "12,010", "1.23%", "50.00%", "높음",
            "1,500", "1,200", "-", "-", "-",
            "2,300", "-", "-", "-", "-",
        ]
    );

    // Stats for two keywords, bids only for the one that had stats,
    // nothing at all for the keyword that cleans to empty.
    assert_eq!(transport.seen_for(KEYWORD_TOOL_PATH).len(), 2);
    assert_eq!(transport.seen_for(BID_ESTIMATE_PATH).len(), 2);
    assert_eq!(client.requests_sent(), 4);

    let seen = transport.seen();
    for pair in seen.windows(2) {
        assert!(pair[1].at - pair[0].at >= Duration::from_millis(500));
    }
}
