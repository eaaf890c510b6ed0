// ── Core error types ──
//
// The engine's failure taxonomy. Transport-layer errors from
// `restsync-api` are translated by the `From` impl below so callers
// branch on what went wrong, not on which layer noticed it.

use thiserror::Error;

use crate::json_path::JsonPathError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Configuration ────────────────────────────────────────────────
    #[error("Invalid configuration: {message}")]
    ConfigInvalid { message: String },

    // ── Connection errors ────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("Transport error: {message}")]
    Transport { message: String, timeout: bool },

    #[error("Operation cancelled")]
    Cancelled,

    // ── HTTP status errors ───────────────────────────────────────────
    /// 404. Recovered locally by refresh-READ and DELETE.
    #[error("unexpected response code '404': {body}")]
    NotFound { body: String },

    #[error("unexpected response code '{status}': {body}")]
    Http4xx { status: u16, body: String },

    #[error("unexpected response code '{status}': {body}")]
    Http5xx { status: u16, body: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Failed to decode {context}: {message}")]
    Decode { context: String, message: String },

    #[error(transparent)]
    Path(#[from] JsonPathError),

    #[error("Object identity unknown: {message}")]
    IdentityMissing { message: String },

    // ── Search errors ────────────────────────────────────────────────
    /// No record in the collection matched. Recovered by search-READ as "gone".
    #[error("No record found where '{key}' = '{value}'")]
    SearchNoMatch { key: String, value: String },

    #[error("Unexpected search response: {message}")]
    SearchShape { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal invariant violated: {message}")]
    InternalInvariant { message: String },
}

impl CoreError {
    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::NotFound { .. } => Some(404),
            Self::Http4xx { status, .. } | Self::Http5xx { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` for a 404 response.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` when the server reports the object no longer exists (404 or 410).
    pub fn is_gone(&self) -> bool {
        matches!(self.status(), Some(404 | 410))
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            message: message.into(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<restsync_api::Error> for CoreError {
    fn from(err: restsync_api::Error) -> Self {
        match err {
            restsync_api::Error::Build { message } => CoreError::ConfigInvalid { message },
            restsync_api::Error::InvalidUrl(e) => CoreError::ConfigInvalid {
                message: format!("Invalid URL: {e}"),
            },
            restsync_api::Error::Authentication { message } => CoreError::Auth { message },
            restsync_api::Error::Transport(e) => CoreError::Transport {
                timeout: e.is_timeout(),
                message: e.to_string(),
            },
            restsync_api::Error::Tls(message) => CoreError::Transport {
                message: format!("TLS error: {message}"),
                timeout: false,
            },
            restsync_api::Error::Cancelled => CoreError::Cancelled,
            restsync_api::Error::HttpStatus { status: 404, body } => CoreError::NotFound { body },
            restsync_api::Error::HttpStatus { status, body } if status >= 500 => {
                CoreError::Http5xx { status, body }
            }
            restsync_api::Error::HttpStatus { status, body } => CoreError::Http4xx { status, body },
        }
    }
}
