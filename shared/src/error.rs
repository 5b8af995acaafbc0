//! Error types for the room status Lambda.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving room status.
#[derive(Error, Debug)]
pub enum Error {
    /// Token endpoint answered with a non-success status
    #[error("Authentication error ({status}): {message}")]
    Auth { status: u16, message: String },

    /// Graph API answered with a non-success status
    #[error("Graph API error ({status}): {message}")]
    Graph { status: u16, message: String },

    /// Transport failure or unreadable response body
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Event returned by Graph could not be normalized
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// AWS SDK error
    #[error("AWS error: {0}")]
    Aws(String),
}

impl Error {
    /// Short label used in structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Auth { .. } => "auth",
            Error::Graph { .. } => "graph",
            Error::Http(_) => "http",
            Error::Serialization(_) => "serialization",
            Error::InvalidEvent(_) => "invalid_event",
            Error::Config(_) => "config",
            Error::Aws(_) => "aws",
        }
    }

    /// Upstream HTTP status, when the failure came from a non-success response.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Error::Auth { status, .. } | Error::Graph { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
