use thiserror::Error;

/// Top-level error type for the `restsync-api` crate.
///
/// Covers every failure mode of a single `send`: request construction,
/// authorization, transport, and non-2xx responses. `restsync-core`
/// maps these into its own taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Build ───────────────────────────────────────────────────────
    /// Request construction failed (bad header, unparseable URL, etc.)
    #[error("Failed to build request: {message}")]
    Build { message: String },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Authentication ──────────────────────────────────────────────
    /// OAuth2 token acquisition failed.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// TLS material could not be loaded or the client could not be built.
    #[error("TLS error: {0}")]
    Tls(String),

    /// The caller's cancellation token fired while the request was in flight.
    #[error("Request cancelled")]
    Cancelled,

    // ── Response ────────────────────────────────────────────────────
    /// The server answered outside `[200, 300)`. Carries the raw body.
    #[error("unexpected response code '{status}': {body}")]
    HttpStatus { status: u16, body: String },
}

impl Error {
    /// HTTP status carried by this error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns `true` for a 404 response.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Returns `true` for a 410 response.
    pub fn is_gone(&self) -> bool {
        self.status() == Some(410)
    }

    /// Returns `true` if the request may succeed when sent again:
    /// connection and timeout failures, and any 5xx except 501.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            Self::HttpStatus { status, .. } => (500..600).contains(status) && *status != 501,
            _ => false,
        }
    }
}
