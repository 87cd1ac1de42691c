//! Edit Core - normalization, scope filtering and per-article aggregation
//!
//! Both ingestion paths (backfill and live stream) go through the same steps:
//!
//! ```text
//! HistoricalEdit ─┐
//!                 ├─→ CanonicalEdit ─→ is_in_scope ─→ AggregateStore::fold
//! LiveChange ─────┘
//! ```

pub mod filter;
pub mod normalizer;
pub mod store;

pub use filter::is_in_scope;
pub use normalizer::{
    normalize_historical, normalize_live, CanonicalEdit, HistoricalEdit, LiveChange,
};
pub use store::{AggregateEntry, AggregateStore, Observation};
