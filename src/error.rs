/// Error types for OpsGrid
///
/// Pure transformations (filter, sort, dedupe, group, CSV text, snapshots)
/// never fail. Errors only come from talking to the backend, writing
/// downloads, reading configuration, and page-data extraction (which
/// `summarize` swallows).

use thiserror::Error;

/// A failed backend request, already shaped for the view's error banner
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request never produced a response (connection refused, DNS, reset)
    #[error("{0}")]
    Transport(String),

    /// Non-2xx response; `message` comes from the body when it had one
    #[error("{message}")]
    Application { status: u16, message: String },

    /// A 2xx response whose body was not the JSON we expected
    #[error("Unexpected response from server")]
    Parse { detail: String },
}

impl ApiError {
    /// Build the error for a non-2xx response.
    ///
    /// The body's `message` field wins, then `error`, then the status line.
    pub fn from_status(status: u16, reason: Option<&str>, body: &str) -> Self {
        let from_body = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|json| {
                ["message", "error"].iter().find_map(|field| {
                    json.get(field)
                        .and_then(|v| v.as_str())
                        .filter(|s| !s.trim().is_empty())
                        .map(str::to_string)
                })
            });

        let message = from_body.unwrap_or_else(|| match reason {
            Some(reason) if !reason.is_empty() => format!("HTTP {} {}", status, reason),
            _ => format!("HTTP {}", status),
        });

        ApiError::Application { status, message }
    }

    /// Text for the view's error banner
    pub fn display_message(&self) -> String {
        self.to_string()
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Application { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No data to export")]
    Empty,

    #[error("failed to write {filename}: {source}")]
    Io {
        filename: String,
        #[source]
        source: std::io::Error,
    },
}

/// Raised by page-data extractors; `summarize` turns it into an `error` field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("missing field '{0}'")]
    MissingField(String),

    #[error("field '{field}' is not {expected}")]
    InvalidShape { field: String, expected: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid port '{0}'")]
    InvalidPort(String),

    #[error("invalid API base URL '{0}'")]
    InvalidUrl(String),
}
