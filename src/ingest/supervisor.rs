//! Reconnect policy around the stream consumer
//!
//! The consumer itself never reconnects. This wraps connect + consume in an
//! exponential backoff; with `max_retries == 0` the first terminating error is final.

use std::time::Duration;
use tokio::time::sleep;

use crate::edit_core::AggregateStore;
use crate::error::TrackerError;
use crate::ingest::observer::ObservationSink;
use crate::ingest::stream::{consume_stream, EventStream, StreamReport};

#[derive(Debug)]
pub struct ExponentialBackoff {
    initial_delay: u64,
    max_delay: u64,
    max_retries: u32,
    current_attempt: u32,
}

impl ExponentialBackoff {
    pub fn new(initial: u64, max: u64, retries: u32) -> Self {
        Self {
            initial_delay: initial,
            max_delay: max,
            max_retries: retries,
            current_attempt: 0,
        }
    }

    /// Delay before the next attempt, `None` once retries are exhausted
    pub fn next_delay(&self) -> Option<Duration> {
        if self.current_attempt >= self.max_retries {
            return None;
        }

        let factor = 2_u64.saturating_pow(self.current_attempt);
        let delay = std::cmp::min(self.initial_delay.saturating_mul(factor), self.max_delay);
        Some(Duration::from_secs(delay))
    }

    /// Sleep before the next attempt; `false` when no attempts are left
    pub async fn sleep(&mut self) -> bool {
        let Some(delay) = self.next_delay() else {
            return false;
        };

        log::warn!(
            "⏳ Reconnect attempt {} of {} in {}s",
            self.current_attempt + 1,
            self.max_retries,
            delay.as_secs()
        );

        sleep(delay).await;
        self.current_attempt += 1;
        true
    }

    pub fn reset(&mut self) {
        self.current_attempt = 0;
    }
}

/// Totals across every connection of one supervised run
#[derive(Debug)]
pub struct SupervisedReport {
    pub connections: u32,
    pub events_folded: u64,
    pub decode_failures: u64,
    pub termination: TrackerError,
}

/// Connect and consume, reconnecting after terminal errors while the backoff allows.
///
/// The same store and sink are reused across connections, so aggregates keep growing
/// from where the previous connection stopped.
pub async fn run_live_with_reconnect(
    client: &reqwest::Client,
    url: &str,
    store: &mut AggregateStore,
    tracked_domain: &str,
    sink: &mut dyn ObservationSink,
    backoff: &mut ExponentialBackoff,
) -> SupervisedReport {
    let mut connections = 0u32;
    let mut events_folded = 0u64;
    let mut decode_failures = 0u64;

    loop {
        let termination = match EventStream::connect(client, url).await {
            Ok(mut stream) => {
                connections += 1;
                backoff.reset();

                let StreamReport {
                    events_folded: folded,
                    decode_failures: failures,
                    termination,
                    ..
                } = consume_stream(&mut stream, store, tracked_domain, sink).await;

                events_folded += folded;
                decode_failures += failures;
                log::error!("❌ Live stream ended after {} folded events: {}", folded, termination);
                termination
            }
            Err(e) => {
                log::error!("❌ Connection failed: {}", e);
                e
            }
        };

        if !backoff.sleep().await {
            return SupervisedReport {
                connections,
                events_folded,
                decode_failures,
                termination,
            };
        }
    }
}
