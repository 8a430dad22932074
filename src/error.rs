use std::{fmt, time::Duration};

use thiserror::Error;

use crate::models::Source;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeoError {
    /// Latitude outside [-90, 90], longitude outside [-180, 180], or not finite
    #[error("Invalid coordinate: ({latitude}, {longitude})")]
    InvalidCoordinate { latitude: f64, longitude: f64 },
}

#[derive(Error, Debug)]
pub enum AdapterError {
    /// The adapter did not settle within its own timeout
    #[error("{adapter} timed out after {after:?}")]
    Timeout { adapter: Source, after: Duration },

    /// Transport level failure (DNS, connection reset, TLS, ...)
    #[error("{adapter} network error: {source}")]
    Network {
        adapter: Source,
        #[source]
        source: reqwest::Error,
    },

    /// The source answered with a non-success HTTP status
    #[error("{adapter} returned HTTP {status}")]
    Status {
        adapter: Source,
        status: reqwest::StatusCode,
    },

    /// The source answered successfully but reported an error in the payload
    #[error("{adapter} API error: {message}")]
    Api { adapter: Source, message: String },

    /// The response document as a whole could not be decoded
    #[error("{adapter} parse error: {message}")]
    Parse { adapter: Source, message: String },
}

impl AdapterError {
    pub fn adapter(&self) -> Source {
        match self {
            AdapterError::Timeout { adapter, .. }
            | AdapterError::Network { adapter, .. }
            | AdapterError::Status { adapter, .. }
            | AdapterError::Api { adapter, .. }
            | AdapterError::Parse { adapter, .. } => *adapter,
        }
    }

    /// Maps a reqwest error, keeping client side timeouts distinct from other transport errors.
    pub(crate) fn from_reqwest(adapter: Source, after: Duration, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            AdapterError::Timeout { adapter, after }
        } else if error.is_decode() {
            AdapterError::Parse {
                adapter,
                message: error.to_string(),
            }
        } else if let Some(status) = error.status() {
            AdapterError::Status { adapter, status }
        } else {
            AdapterError::Network {
                adapter,
                source: error,
            }
        }
    }
}

/// One failed adapter call, reported alongside a (partial) result.
#[derive(Debug)]
pub struct AdapterFailure {
    pub source: Source,
    pub error: AdapterError,
}

impl fmt::Display for AdapterFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.error)
    }
}

#[derive(Error, Debug)]
pub enum AggregationError {
    #[error(transparent)]
    InvalidCoordinate(#[from] GeoError),

    #[error("No source adapter is enabled")]
    NoSourcesEnabled,

    /// Every enabled adapter failed; carries each underlying cause
    #[error("All sources failed: {}", join_failures(.0))]
    AllSourcesFailed(Vec<AdapterFailure>),

    /// Superseded by a request for another location, or cancelled explicitly
    #[error("Discovery cancelled")]
    Cancelled,
}

fn join_failures(failures: &[AdapterFailure]) -> String {
    failures
        .iter()
        .map(|failure| failure.to_string())
        .collect::<Vec<String>>()
        .join("; ")
}
