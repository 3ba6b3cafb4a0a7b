//! keyword-scout: batch keyword research against the Naver Search Ad API
//!
//! Entry point. Loads configuration and credentials, reads the keyword list,
//! runs the batch sequentially at the selected speed preset and writes the
//! results to disk.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use keyword_scout::api::bids::BidEstimateFetcher;
use keyword_scout::api::client::PacedRetryClient;
use keyword_scout::api::stats::KeywordStatsFetcher;
use keyword_scout::api::transport::HttpTransport;
use keyword_scout::config::AppConfig;
use keyword_scout::engine::processor::KeywordProcessor;
use keyword_scout::engine::runner::{dedupe_keywords, parse_keyword_input, BatchRunner};
use keyword_scout::storage;
use keyword_scout::types::{KeywordScoutError, SpeedMode};

#[derive(Parser, Debug)]
#[command(name = "keyword-scout", version, about = "Collect search volume and bid estimates for keywords")]
struct Cli {
    /// Config file; built-in defaults are used when it does not exist.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Keyword file, one per line. Reads stdin when omitted.
    #[arg(short, long)]
    keywords: Option<PathBuf>,

    /// Speed preset 0-4 (overrides the config file).
    #[arg(short, long)]
    speed_mode: Option<usize>,

    /// Output file; `.tsv`/`.txt` write a table, anything else JSON.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cli = Cli::parse();

    let cfg = if cli.config.exists() {
        AppConfig::load(&cli.config)?
    } else {
        AppConfig::default()
    };

    init_logging();

    // -- Credentials and speed mode --------------------------------------

    let credentials = cfg.credentials().context("Search Ad credentials are required")?;

    let mode_index = cli.speed_mode.unwrap_or(cfg.run.speed_mode);
    let mode = SpeedMode::preset(mode_index)?;
    if SpeedMode::is_high_risk(mode_index) {
        warn!(mode = %mode, "High-speed preset selected; upstream may answer with 403 blocks");
    }

    // -- Keywords --------------------------------------------------------

    let input = read_keyword_input(cli.keywords.as_ref())?;
    let keywords = dedupe_keywords(&parse_keyword_input(&input));
    if keywords.is_empty() {
        return Err(KeywordScoutError::NoKeywords.into());
    }

    info!(
        keywords = keywords.len(),
        mode = %mode,
        base_url = %cfg.api.base_url,
        "keyword-scout starting up"
    );

    // -- Initialise components -------------------------------------------

    let transport = Arc::new(HttpTransport::new(&cfg.api.base_url, &cfg.api.user_agent)?);
    let client = Arc::new(PacedRetryClient::new(transport, credentials));
    let processor = KeywordProcessor::new(
        KeywordStatsFetcher::new(client.clone()),
        BidEstimateFetcher::new(client.clone()),
    );
    let runner = BatchRunner::new(processor);

    // -- Run -------------------------------------------------------------

    let result = runner
        .run(&keywords, &mode, |p| {
            info!(
                completed = p.completed,
                total = p.total,
                percent = %format!("{:.1}%", p.percent()),
                keyword = p.keyword,
                succeeded = p.succeeded,
                "Keyword processed"
            );
        })
        .await;

    let output = cli.output.unwrap_or(cfg.run.output_path);
    storage::save_result(&result, &output)?;

    info!(
        attempted = result.attempted(),
        succeeded = result.succeeded.len(),
        failed = result.failed.len(),
        success_rate = %format!("{:.1}%", result.success_rate()),
        requests_sent = client.requests_sent(),
        timestamp = %result.timestamp,
        output = %output.display(),
        "keyword-scout finished"
    );

    Ok(())
}

fn read_keyword_input(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read keyword file: {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read keywords from stdin")?;
            Ok(buf)
        }
    }
}

/// Initialise the tracing subscriber with env-filter and optional JSON output.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("keyword_scout=info"));

    let json_logging = std::env::var("KEYWORD_SCOUT_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
