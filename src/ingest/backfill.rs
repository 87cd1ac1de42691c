//! One-shot backfill from the historical-edit service
//!
//! Endpoint: GET `<BACKFILL_URL>` (default http://localhost:8080/edits)
//! Returns: JSON array of historical edit records
//!
//! No retry, no pagination: the whole history arrives in one response body.

use chrono::{DateTime, Utc};

use crate::edit_core::{is_in_scope, normalize_historical, AggregateStore, HistoricalEdit};
use crate::error::TrackerError;

/// Outcome of a completed backfill
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackfillReport {
    /// Every record examined, in scope or not
    pub processed: usize,
    pub folded: usize,
    pub skipped: usize,
    /// Newest record timestamp, when the service provides timestamps
    pub newest_timestamp: Option<DateTime<Utc>>,
}

/// Fetch the historical edits and fold every in-scope one into `store`.
///
/// # Returns
/// * `Ok(BackfillReport)` - body decoded and every record examined
/// * `Err(TrackerError::Fetch)` - endpoint unreachable or non-2xx status
/// * `Err(TrackerError::Decode)` - body is not a JSON array of historical records
///
/// On error the store is untouched. Both errors are non-fatal for the tracker:
/// callers log them and go on to the live stream.
pub async fn load_backfill(
    client: &reqwest::Client,
    url: &str,
    store: &mut AggregateStore,
    tracked_domain: &str,
) -> Result<BackfillReport, TrackerError> {
    log::info!("📥 Fetching historical edits from {}", url);

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| TrackerError::fetch_transport(url, e))?;

    if !response.status().is_success() {
        return Err(TrackerError::fetch_status(url, response.status()));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| TrackerError::fetch_transport(url, e))?;

    log::debug!("Backfill body: {} bytes", body.len());

    let edits = HistoricalEdit::from_json_array(&body)?;
    Ok(fold_historical(&edits, store, tracked_domain))
}

/// Normalize, filter and fold a decoded backfill payload
pub fn fold_historical(
    edits: &[HistoricalEdit],
    store: &mut AggregateStore,
    tracked_domain: &str,
) -> BackfillReport {
    let mut report = BackfillReport::default();

    for record in edits {
        report.processed += 1;

        if let Some(ts) = record.timestamp {
            report.newest_timestamp = Some(report.newest_timestamp.map_or(ts, |cur| cur.max(ts)));
        }

        let edit = normalize_historical(record, tracked_domain);
        if is_in_scope(&edit, tracked_domain) {
            store.fold(&edit);
            report.folded += 1;
        } else {
            log::debug!("Skipping out-of-scope historical edit: {}", edit.article_title);
            report.skipped += 1;
        }
    }

    report
}
