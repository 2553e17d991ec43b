//! Error taxonomy surfaced to the host UI.
//!
//! Every variant maps to a short status line via [`LspError::status_message`];
//! none of them are fatal to the host process.

use std::path::PathBuf;
use std::time::Duration;

use crate::codec::FrameError;

#[derive(Debug, thiserror::Error)]
pub enum LspError {
    /// The server binary could not be resolved or spawned. Not retried.
    #[error("language server `{command}` not available: {reason}")]
    ServerNotFound { command: String, reason: String },

    /// The server process exited or its pipes closed.
    #[error("language server is not running")]
    ServerNotRunning,

    /// No response within the request budget. The session stays usable.
    #[error("`{method}` timed out after {}ms", timeout.as_millis())]
    RequestTimeout { method: String, timeout: Duration },

    /// Malformed or unexpected JSON from the server.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The server answered with a JSON-RPC error object.
    #[error("server error {code}: {message}")]
    ServerError { code: i64, message: String },

    /// A buffer for an incoming message could not be allocated.
    #[error("out of memory while reading a {requested} byte message")]
    OutOfMemory { requested: usize },

    #[error("invalid filter `{pattern}`: {reason}")]
    InvalidFilter { pattern: String, reason: String },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LspError {
    /// Short human-readable line for a status bar.
    #[must_use]
    pub fn status_message(&self) -> String {
        match self {
            Self::ServerNotFound { .. } => "Language server not available".to_string(),
            Self::ServerNotRunning => "Language server stopped, retry to restart it".to_string(),
            Self::RequestTimeout { .. } => "Request timed out, try again".to_string(),
            Self::InvalidResponse(_) => "Language server sent an invalid response".to_string(),
            Self::ServerError { message, .. } => format!("Language server error: {message}"),
            Self::OutOfMemory { .. } => "Not enough memory to read the response".to_string(),
            Self::InvalidFilter { pattern, .. } => format!("Invalid filter: {pattern}"),
            Self::Io { path, .. } => format!("Cannot read {}", path.display()),
        }
    }

    /// Whether the session that produced this error can still serve requests.
    #[must_use]
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, Self::ServerNotFound { .. } | Self::ServerNotRunning)
    }
}

impl From<FrameError> for LspError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::OutOfMemory { requested } => Self::OutOfMemory { requested },
            FrameError::Io(_) | FrameError::UnexpectedEof => Self::ServerNotRunning,
            other => Self::InvalidResponse(other.to_string()),
        }
    }
}
