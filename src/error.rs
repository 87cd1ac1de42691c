//! Error taxonomy shared by the backfill loader and the stream consumer

use reqwest::StatusCode;

#[derive(Debug)]
pub enum TrackerError {
    /// Transport failure or non-2xx status reaching the historical endpoint
    Fetch {
        url: String,
        status: Option<StatusCode>,
        source: Option<reqwest::Error>,
    },
    /// Payload is not valid JSON or does not match the expected record shape
    Decode(String),
    /// Initial stream connection could not be established
    Connect {
        url: String,
        status: Option<StatusCode>,
        source: Option<reqwest::Error>,
    },
    /// Transport error after the stream was established
    Stream(std::io::Error),
    /// The server ended the stream body
    StreamClosed,
    /// An observation sink rejected an observation
    Sink(String),
}

impl TrackerError {
    pub(crate) fn fetch_transport(url: &str, err: reqwest::Error) -> Self {
        TrackerError::Fetch {
            url: url.to_string(),
            status: err.status(),
            source: Some(err),
        }
    }

    pub(crate) fn fetch_status(url: &str, status: StatusCode) -> Self {
        TrackerError::Fetch {
            url: url.to_string(),
            status: Some(status),
            source: None,
        }
    }

    pub(crate) fn connect_transport(url: &str, err: reqwest::Error) -> Self {
        TrackerError::Connect {
            url: url.to_string(),
            status: err.status(),
            source: Some(err),
        }
    }

    pub(crate) fn connect_status(url: &str, status: StatusCode) -> Self {
        TrackerError::Connect {
            url: url.to_string(),
            status: Some(status),
            source: None,
        }
    }

    /// Errors after which the stream read may continue with the next line
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TrackerError::Decode(_) | TrackerError::Sink(_))
    }

    /// Errors that end the live-tracking run
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TrackerError::Connect { .. } | TrackerError::Stream(_) | TrackerError::StreamClosed
        )
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(err: serde_json::Error) -> Self {
        TrackerError::Decode(err.to_string())
    }
}

impl std::fmt::Display for TrackerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackerError::Fetch { url, status: Some(status), source: None } => {
                write!(f, "Fetch error: {} returned {}", url, status)
            }
            TrackerError::Fetch { url, source, .. } => match source {
                Some(e) => write!(f, "Fetch error: {}: {}", url, e),
                None => write!(f, "Fetch error: {}", url),
            },
            TrackerError::Decode(msg) => write!(f, "Decode error: {}", msg),
            TrackerError::Connect { url, status: Some(status), source: None } => {
                write!(f, "Connect error: {} returned {}", url, status)
            }
            TrackerError::Connect { url, source, .. } => match source {
                Some(e) => write!(f, "Connect error: {}: {}", url, e),
                None => write!(f, "Connect error: {}", url),
            },
            TrackerError::Stream(e) => write!(f, "Stream error: {}", e),
            TrackerError::StreamClosed => write!(f, "Stream closed by server"),
            TrackerError::Sink(msg) => write!(f, "Sink error: {}", msg),
        }
    }
}

impl std::error::Error for TrackerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TrackerError::Fetch { source: Some(e), .. }
            | TrackerError::Connect { source: Some(e), .. } => Some(e),
            TrackerError::Stream(e) => Some(e),
            _ => None,
        }
    }
}
