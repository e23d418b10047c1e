//! Custom error types for scopus-report.
//!
//! Every failure carries the endpoint and identifier it concerns so a failed
//! run can be diagnosed from the log line alone. Absent upstream values are
//! modelled as `Option`, never as errors, and errors are never swallowed
//! into `None`.

use thiserror::Error;

/// Main error type for scopus-report operations.
#[derive(Debug, Error)]
pub enum ScopusError {
    /// Network failure: connection refused, DNS, TLS, timeout.
    #[error("Transport error on {endpoint} ({target}): {source}")]
    Transport {
        /// Logical endpoint name
        endpoint: &'static str,
        /// Author or document identifier the request was about
        target: String,
        #[source]
        source: reqwest::Error,
    },

    /// Upstream answered with a non-2xx status
    #[error("API error on {endpoint} ({target}): {code} - {message}")]
    Status {
        /// Logical endpoint name
        endpoint: &'static str,
        /// Author or document identifier the request was about
        target: String,
        /// HTTP status code
        code: u16,
        /// Status reason or body excerpt
        message: String,
    },

    /// Response body is not valid JSON
    #[error("Decode error on {endpoint} ({target}): {source}")]
    Decode {
        /// Logical endpoint name
        endpoint: &'static str,
        /// Author or document identifier the request was about
        target: String,
        #[source]
        source: serde_json::Error,
    },

    /// A required field is absent or has the wrong type
    #[error("Schema error for {target}: {message}")]
    Schema {
        /// Record the field belongs to
        target: String,
        /// What was expected
        message: String,
    },

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error while writing or reading a report
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV export error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl ScopusError {
    /// Build a schema error for the given record.
    pub fn schema(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema {
            target: target.into(),
            message: message.into(),
        }
    }

    /// True for failures that concern a single record rather than the
    /// whole run (transport, status, decode, schema).
    pub fn is_record_level(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Status { .. } | Self::Decode { .. } | Self::Schema { .. }
        )
    }
}

/// Result type alias using `ScopusError`
pub type Result<T> = std::result::Result<T, ScopusError>;

/// Extension trait for turning a missing required value into a schema error
pub trait OptionExt<T> {
    /// Convert Option to Result with a schema error naming the record
    fn ok_or_schema(self, target: &str, msg: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_schema(self, target: &str, msg: &str) -> Result<T> {
        self.ok_or_else(|| ScopusError::schema(target, msg))
    }
}
