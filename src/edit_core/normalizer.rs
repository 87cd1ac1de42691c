//! Edit normalization from the two wire shapes into one CanonicalEdit

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::TrackerError;

/// Namespaced pages (Talk:, User:, Wikipedia:, ...) carry this separator in their title
pub const NAMESPACE_SEPARATOR: char = ':';

/// Record returned by the historical-edit storage service
///
/// Only the fields used for accounting are modelled; `id`, `comment`, `user` and the
/// URL fields of the payload are ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalEdit {
    pub title: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    pub length_old: i64,
    pub length_new: i64,
}

/// One `recentchange` event from the live stream
///
/// Only the fields used for accounting are modelled; the rest of the payload is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct LiveChange {
    #[serde(default)]
    pub meta: ChangeMeta,
    pub title: String,
    /// Log events carry no length; they count as zero-byte edits
    #[serde(default)]
    pub length: ChangeLength,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangeMeta {
    #[serde(default)]
    pub domain: String,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ChangeLength {
    #[serde(default)]
    pub old: i64,
    #[serde(default)]
    pub new: i64,
}

/// Source-independent view of a single edit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalEdit {
    pub article_title: String,
    /// new length - old length
    pub byte_delta: i64,
    pub domain: String,
    pub namespace_is_article: bool,
}

/// `new - old`, or a decode error when the difference does not fit in an i64
fn checked_delta(title: &str, old: i64, new: i64) -> Result<i64, TrackerError> {
    new.checked_sub(old).ok_or_else(|| {
        TrackerError::Decode(format!(
            "length delta out of range for {}: old={} new={}",
            title, old, new
        ))
    })
}

impl HistoricalEdit {
    /// Decode the full backfill payload (a JSON array of records)
    ///
    /// A record whose lengths have no representable delta makes the payload malformed.
    pub fn from_json_array(body: &[u8]) -> Result<Vec<Self>, TrackerError> {
        let edits: Vec<HistoricalEdit> = serde_json::from_slice(body)?;
        for edit in &edits {
            checked_delta(&edit.title, edit.length_old, edit.length_new)?;
        }
        Ok(edits)
    }
}

impl LiveChange {
    /// Decode one `data: ` payload
    pub fn from_payload(payload: &[u8]) -> Result<Self, TrackerError> {
        let change: LiveChange = serde_json::from_slice(payload)?;
        checked_delta(&change.title, change.length.old, change.length.new)?;
        Ok(change)
    }
}

fn is_article_title(title: &str) -> bool {
    !title.contains(NAMESPACE_SEPARATOR)
}

/// Historical records carry no domain; they are assumed to belong to `tracked_domain`.
///
/// Decoded records always have an in-range delta; hand-built ones saturate.
pub fn normalize_historical(record: &HistoricalEdit, tracked_domain: &str) -> CanonicalEdit {
    CanonicalEdit {
        article_title: record.title.clone(),
        byte_delta: record.length_new.saturating_sub(record.length_old),
        domain: tracked_domain.to_string(),
        namespace_is_article: is_article_title(&record.title),
    }
}

pub fn normalize_live(record: &LiveChange) -> CanonicalEdit {
    CanonicalEdit {
        article_title: record.title.clone(),
        byte_delta: record.length.new.saturating_sub(record.length.old),
        domain: record.meta.domain.clone(),
        namespace_is_article: is_article_title(&record.title),
    }
}
