//! Observation sinks
//!
//! Every in-scope live edit produces one `Observation`. Where it goes (console, channel
//! to another task, ...) is up to the sink handed to the stream consumer.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::edit_core::Observation;
use crate::error::TrackerError;

/// Backend trait for reporting observations
#[async_trait]
pub trait ObservationSink: Send {
    /// Report one post-fold observation
    async fn emit(&mut self, observation: &Observation) -> Result<(), TrackerError>;

    /// Get sink type for logging
    fn sink_type(&self) -> &'static str;
}

/// Prints `edit #<count>: <title> (<bytes> B)` to stdout
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn format(observation: &Observation) -> String {
        format!(
            "edit #{}: {} ({} B)",
            observation.edit_count, observation.title, observation.cumulative_abs_byte_delta
        )
    }
}

#[async_trait]
impl ObservationSink for ConsoleSink {
    async fn emit(&mut self, observation: &Observation) -> Result<(), TrackerError> {
        println!("{}", Self::format(observation));
        Ok(())
    }

    fn sink_type(&self) -> &'static str {
        "console"
    }
}

/// Forwards observations to another task without ever blocking the stream read.
///
/// A full channel drops the observation with a warning; a closed channel is a sink error.
pub struct ChannelSink {
    tx: mpsc::Sender<Observation>,
    dropped: u64,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<Observation>) -> Self {
        Self { tx, dropped: 0 }
    }

    /// Observations dropped because the receiver was behind
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[async_trait]
impl ObservationSink for ChannelSink {
    async fn emit(&mut self, observation: &Observation) -> Result<(), TrackerError> {
        match self.tx.try_send(observation.clone()) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                self.dropped += 1;
                log::warn!(
                    "⚠️  Observation channel full, dropping {} (total dropped: {})",
                    dropped.title,
                    self.dropped
                );
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(TrackerError::Sink("observation channel closed".to_string()))
            }
        }
    }

    fn sink_type(&self) -> &'static str {
        "channel"
    }
}
