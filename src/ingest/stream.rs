//! Live recentchange stream consumer
//!
//! The stream is a server-push text body. Each event is one line:
//!
//! ```text
//! event: message
//! id: [{"topic":"eqiad.mediawiki.recentchange","partition":0,"offset":-1}]
//! data: {"meta":{"domain":"en.wikipedia.org",...},"title":"Dog","length":{"old":50,"new":40},...}
//!
//! ```
//!
//! Only `data: ` lines are decoded; everything else (keep-alives, comments, `event:`
//! and `id:` lines) is skipped. `EventStream` yields decoded changes lazily for one
//! connection, and `consume_stream` folds them into the store in arrival order.

use futures::TryStreamExt;
use std::io;
use std::pin::Pin;
use std::time::Instant;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::io::StreamReader;

use crate::edit_core::{is_in_scope, normalize_live, AggregateStore, LiveChange, Observation};
use crate::error::TrackerError;
use crate::ingest::observer::ObservationSink;

pub const DATA_MARKER: &[u8] = b"data: ";

const RATE_LOG_INTERVAL_SECS: u64 = 10;

/// Response body of a live connection, read as a buffered byte stream
pub type BodyReader = Pin<Box<dyn AsyncBufRead + Send>>;

/// Strip the data marker, or `None` for a non-data line
pub fn data_payload(line: &[u8]) -> Option<&[u8]> {
    line.strip_prefix(DATA_MARKER)
}

/// Decoded events of one stream connection
///
/// Lines end in `\n` or `\r\n` and have no length limit. The sequence is finite:
/// it ends with `StreamClosed` or `Stream` once the body ends. Reconnecting means
/// calling `connect` again.
pub struct EventStream<R = BodyReader> {
    reader: R,
    line: Vec<u8>,
    lines_read: u64,
    data_lines: u64,
}

impl EventStream<BodyReader> {
    /// Open the long-lived GET. Transport failures and non-2xx statuses are `Connect` errors.
    pub async fn connect(client: &reqwest::Client, url: &str) -> Result<Self, TrackerError> {
        log::info!("🔌 Connecting to live stream: {}", url);

        let response = client
            .get(url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| TrackerError::connect_transport(url, e))?;

        if !response.status().is_success() {
            return Err(TrackerError::connect_status(url, response.status()));
        }

        log::info!("✅ Connected to live stream ({})", response.status());

        let body = response.bytes_stream().map_err(io::Error::other);
        Ok(Self::from_reader(Box::pin(StreamReader::new(body))))
    }
}

impl<R: AsyncBufRead + Unpin> EventStream<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader,
            line: Vec::new(),
            lines_read: 0,
            data_lines: 0,
        }
    }

    /// Lines read so far, data or not
    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    pub fn data_lines(&self) -> u64 {
        self.data_lines
    }

    /// Read the next line into `self.line`, terminator stripped
    async fn next_line(&mut self) -> Result<(), TrackerError> {
        self.line.clear();
        let n = self
            .reader
            .read_until(b'\n', &mut self.line)
            .await
            .map_err(TrackerError::Stream)?;

        if n == 0 {
            return Err(TrackerError::StreamClosed);
        }

        if self.line.last() == Some(&b'\n') {
            self.line.pop();
        }
        if self.line.last() == Some(&b'\r') {
            self.line.pop();
        }
        self.lines_read += 1;
        Ok(())
    }

    /// Next decoded change.
    ///
    /// `Err(Decode)` drops one malformed event and the caller may keep reading;
    /// `Err(StreamClosed)` or `Err(Stream)` end this connection.
    pub async fn next_change(&mut self) -> Result<LiveChange, TrackerError> {
        loop {
            self.next_line().await?;
            let Some(payload) = data_payload(&self.line) else {
                continue;
            };
            self.data_lines += 1;
            return LiveChange::from_payload(payload);
        }
    }
}

/// Counters for one `consume_stream` run, plus the error that ended it
#[derive(Debug)]
pub struct StreamReport {
    pub lines_read: u64,
    pub events_decoded: u64,
    pub decode_failures: u64,
    pub events_folded: u64,
    pub events_filtered: u64,
    pub termination: TrackerError,
}

/// Normalize, filter and fold one live change
///
/// Returns the post-fold observation, or `None` when the change is out of scope.
pub fn track_change(
    change: &LiveChange,
    store: &mut AggregateStore,
    tracked_domain: &str,
) -> Option<Observation> {
    let edit = normalize_live(change);
    if !is_in_scope(&edit, tracked_domain) {
        return None;
    }
    Some(store.fold_observed(&edit))
}

/// Drive `stream` until it terminates, folding every in-scope change into `store`
/// and reporting it to `sink`.
///
/// Events are handled one at a time in arrival order. Decode and sink failures are
/// logged and skipped; the first terminal error ends the run and is returned in the
/// report. Dropping the future cancels the read.
pub async fn consume_stream<R: AsyncBufRead + Unpin>(
    stream: &mut EventStream<R>,
    store: &mut AggregateStore,
    tracked_domain: &str,
    sink: &mut dyn ObservationSink,
) -> StreamReport {
    log::info!("📡 Streaming live edits for {} (sink: {})", tracked_domain, sink.sink_type());

    let lines_at_start = stream.lines_read();
    let mut events_decoded = 0u64;
    let mut decode_failures = 0u64;
    let mut events_folded = 0u64;
    let mut events_filtered = 0u64;

    let mut window_events = 0u64;
    let mut last_log_time = Instant::now();

    let termination = loop {
        let change = match stream.next_change().await {
            Ok(change) => change,
            Err(e) if e.is_recoverable() => {
                decode_failures += 1;
                log::warn!("⚠️  Dropping event: {}", e);
                continue;
            }
            Err(e) => break e,
        };
        events_decoded += 1;
        window_events += 1;

        match track_change(&change, store, tracked_domain) {
            Some(observation) => {
                events_folded += 1;
                log::debug!(
                    "Folded {}: count={} bytes={}",
                    observation.title,
                    observation.edit_count,
                    observation.cumulative_abs_byte_delta
                );
                if let Err(e) = sink.emit(&observation).await {
                    log::warn!("⚠️  Failed to emit observation for {}: {}", observation.title, e);
                }
            }
            None => events_filtered += 1,
        }

        if last_log_time.elapsed().as_secs() >= RATE_LOG_INTERVAL_SECS {
            let events_per_sec = window_events as f64 / last_log_time.elapsed().as_secs_f64();
            log::info!(
                "📊 Ingestion rate: {:.1} events/sec (folded: {}, titles: {})",
                events_per_sec,
                events_folded,
                store.len()
            );
            last_log_time = Instant::now();
            window_events = 0;
        }
    };

    StreamReport {
        lines_read: stream.lines_read() - lines_at_start,
        events_decoded,
        decode_failures,
        events_folded,
        events_filtered,
        termination,
    }
}
