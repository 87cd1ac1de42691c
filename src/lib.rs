//! wikiflow - per-article edit aggregates from a backfill plus the live recentchange feed

pub mod config;
pub mod edit_core;
pub mod error;
pub mod ingest;

pub use config::{ConfigError, TrackerConfig};
pub use edit_core::{AggregateEntry, AggregateStore, CanonicalEdit, Observation};
pub use error::TrackerError;

/// User agent sent with every request (Wikimedia rejects anonymous clients)
pub const USER_AGENT: &str = concat!("wikiflow/", env!("CARGO_PKG_VERSION"));

/// HTTP client shared by the backfill and the stream.
///
/// No request timeout: the stream body is read indefinitely.
pub fn build_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().user_agent(USER_AGENT).build()
}
