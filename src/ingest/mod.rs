//! Ingestion - historical backfill and live stream consumption
//!
//! ```text
//! load_backfill (one GET, JSON array) ──┐
//!                                       ├─→ AggregateStore
//! EventStream → consume_stream ─────────┘        │
//!                                                 └─→ ObservationSink (live only)
//! ```

pub mod backfill;
pub mod observer;
pub mod stream;
pub mod supervisor;

pub use backfill::{fold_historical, load_backfill, BackfillReport};
pub use observer::{ChannelSink, ConsoleSink, ObservationSink};
pub use stream::{consume_stream, track_change, BodyReader, EventStream, StreamReport};
pub use supervisor::{run_live_with_reconnect, ExponentialBackoff, SupervisedReport};
