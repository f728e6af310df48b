use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced to the caller of the crawl and probe pipelines.
///
/// Transient network failures are not listed here: they are retried by
/// [`RetryPolicy`](crate::core::retry::RetryPolicy) and then degraded to an
/// empty page or a "not open" port.
#[derive(Debug, Error)]
pub enum SentinelError {
    /// One or more configuration bounds were violated. Raised before any
    /// network activity.
    #[error("invalid configuration: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// A URL that could not be parsed or has no host.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("{context} '{}': {source}", .path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid spider results in '{}': {source}", .path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl SentinelError {
    pub fn io(context: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SentinelError::Io {
            context,
            path: path.into(),
            source,
        }
    }

    /// Violations carried by a validation error, empty for other kinds.
    pub fn violations(&self) -> &[String] {
        match self {
            SentinelError::Validation(v) => v,
            _ => &[],
        }
    }
}
