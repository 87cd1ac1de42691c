//! wikiflow - live per-article edit tracker
//!
//! Seeds the aggregates from the historical-edit service, then follows the
//! recentchange stream and prints one line per in-scope edit.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin wikiflow
//! ```
//!
//! ## Environment Variables
//!
//! - TRACKED_DOMAIN - Wiki domain to track (default: en.wikipedia.org)
//! - BACKFILL_URL - Historical-edit endpoint (default: http://localhost:8080/edits)
//! - STREAM_URL - Live stream endpoint (default: https://stream.wikimedia.org/v2/stream/recentchange)
//! - SKIP_BACKFILL - Go straight to the live stream: true/false, 1/0, yes/no (default: false)
//! - RECONNECT_MAX_RETRIES - Reconnects after the stream ends (default: 0)
//! - RECONNECT_INITIAL_DELAY_SECS / RECONNECT_MAX_DELAY_SECS - Backoff bounds (default: 5 / 60)
//! - SUMMARY_TOP_N - Titles listed in the shutdown summary (default: 10)
//! - RUST_LOG - Logging level (optional, default: info)

use wikiflow::ingest::{load_backfill, run_live_with_reconnect, ConsoleSink, ExponentialBackoff};
use wikiflow::{build_client, AggregateStore, TrackerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let config = TrackerConfig::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.rust_log))
        .target(env_logger::Target::Stderr)
        .init();

    log::info!("🚀 Starting wikiflow");
    log::info!("   Tracked domain: {}", config.tracked_domain);
    log::info!("   Backfill URL: {}", config.backfill_url);
    log::info!("   Stream URL: {}", config.stream_url);
    log::info!("   Reconnect retries: {}", config.reconnect_max_retries);

    let client = build_client()?;
    let mut store = AggregateStore::new();

    if config.skip_backfill {
        log::info!("⏭️  Backfill skipped (SKIP_BACKFILL=true)");
    } else {
        match load_backfill(&client, &config.backfill_url, &mut store, &config.tracked_domain).await {
            Ok(report) => {
                log::info!(
                    "✅ Processed {} historical edits ({} folded, {} skipped, {} titles)",
                    report.processed,
                    report.folded,
                    report.skipped,
                    store.len()
                );
                if let Some(newest) = report.newest_timestamp {
                    log::info!("   Newest historical edit: {}", newest.to_rfc3339());
                }
            }
            Err(e) => {
                log::warn!("⚠️  Backfill failed, continuing with live stream only: {}", e);
            }
        }
    }

    let mut sink = ConsoleSink;
    let mut backoff = ExponentialBackoff::new(
        config.reconnect_initial_delay_secs,
        config.reconnect_max_delay_secs,
        config.reconnect_max_retries,
    );

    let outcome = tokio::select! {
        report = run_live_with_reconnect(
            &client,
            &config.stream_url,
            &mut store,
            &config.tracked_domain,
            &mut sink,
            &mut backoff,
        ) => Some(report),
        _ = tokio::signal::ctrl_c() => {
            log::info!("🛑 Interrupted, stopping live stream");
            None
        }
    };

    log::info!(
        "📊 Summary: {} titles, {} edits",
        store.len(),
        store.total_edits()
    );
    for (rank, (title, entry)) in store.top_by_edit_count(config.summary_top_n).iter().enumerate() {
        log::info!(
            "   {:>2}. {} - {} edits, {} B",
            rank + 1,
            title,
            entry.edit_count,
            entry.cumulative_abs_byte_delta
        );
    }

    match outcome {
        Some(report) => {
            log::error!(
                "❌ Live tracking ended after {} connection(s), {} folded events, {} dropped: {}",
                report.connections,
                report.events_folded,
                report.decode_failures,
                report.termination
            );
            Err(report.termination.into())
        }
        None => Ok(()),
    }
}
