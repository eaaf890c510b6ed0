//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use restsync_config::ConfigError;
use restsync_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const DRIFT: i32 = 9;
    pub const AMBIGUOUS: i32 = 10;
    pub const CANCELLED: i32 = 130;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Manifest ─────────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(restsync::validation))]
    Validation { field: String, reason: String },

    #[error("Object '{name}' is not defined in the manifest")]
    #[diagnostic(
        code(restsync::unknown_object),
        help("Objects defined: {available}")
    )]
    UnknownObject { name: String, available: String },

    #[error("Could not load manifest {path}")]
    #[diagnostic(
        code(restsync::manifest),
        help("Pass --manifest <FILE> or set RESTSYNC_MANIFEST.")
    )]
    Manifest {
        path: String,
        #[source]
        source: ConfigError,
    },

    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the API: {message}")]
    #[diagnostic(
        code(restsync::connection_failed),
        help("Check client.uri and network access. Use --insecure (-k) for self-signed certificates.")
    )]
    ConnectionFailed { message: String },

    #[error("Request timed out: {message}")]
    #[diagnostic(
        code(restsync::timeout),
        help("Raise client.timeout in the manifest or check API responsiveness.")
    )]
    Timeout { message: String },

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(restsync::auth_failed),
        help("Verify the credentials in the [client] table (or RESTSYNC_CLIENT__* variables).")
    )]
    AuthFailed { message: String },

    #[error("Operation cancelled")]
    #[diagnostic(code(restsync::cancelled))]
    Cancelled,

    // ── API ──────────────────────────────────────────────────────────
    #[error("Object '{object}' does not exist on the server")]
    #[diagnostic(
        code(restsync::not_found),
        help("Run: restsync apply {object}")
    )]
    NotFound { object: String },

    #[error("{message}")]
    #[diagnostic(code(restsync::api_error))]
    Api { status: u16, message: String },

    #[error("{message}")]
    #[diagnostic(
        code(restsync::data),
        help("Check id_attribute, read_search and results_key against the API's responses (run with --debug).")
    )]
    Data { message: String },

    #[error("{message}")]
    #[diagnostic(
        code(restsync::ambiguous_state),
        help("The server may hold an object this run could not track. Inspect it before running apply again.")
    )]
    Ambiguous { message: String },

    // ── Drift ────────────────────────────────────────────────────────
    #[error("Object '{object}' would change ({action})")]
    #[diagnostic(code(restsync::drift))]
    Drift { object: String, action: String },

    // ── Serialization ────────────────────────────────────────────────
    #[error("Failed to render output: {0}")]
    #[diagnostic(code(restsync::render))]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation { .. } | Self::UnknownObject { .. } | Self::Manifest { .. } => {
                exit_code::USAGE
            }
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Drift { .. } => exit_code::DRIFT,
            Self::Ambiguous { .. } => exit_code::AMBIGUOUS,
            Self::Cancelled => exit_code::CANCELLED,
            _ => exit_code::GENERAL,
        }
    }

    pub fn manifest(path: &std::path::Path, source: ConfigError) -> Self {
        Self::Manifest {
            path: path.display().to_string(),
            source,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConfigInvalid { message } => CliError::Validation {
                field: "configuration".into(),
                reason: message,
            },
            CoreError::Auth { message } => CliError::AuthFailed { message },
            CoreError::Transport {
                message,
                timeout: true,
            } => CliError::Timeout { message },
            CoreError::Transport { message, .. } => CliError::ConnectionFailed { message },
            CoreError::Cancelled => CliError::Cancelled,
            err @ (CoreError::NotFound { .. }
            | CoreError::Http4xx { .. }
            | CoreError::Http5xx { .. }) => CliError::Api {
                status: err.status().unwrap_or_default(),
                message: err.to_string(),
            },
            CoreError::InternalInvariant { message } => CliError::Ambiguous { message },
            err @ (CoreError::Decode { .. }
            | CoreError::Path(_)
            | CoreError::IdentityMissing { .. }
            | CoreError::SearchNoMatch { .. }
            | CoreError::SearchShape { .. }) => CliError::Data {
                message: err.to_string(),
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::UnknownObject { name, available } => CliError::UnknownObject {
                name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            },
            other => CliError::Validation {
                field: "manifest".into(),
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_exit_codes() {
        let cases = [
            (
                CoreError::Transport {
                    message: "t".into(),
                    timeout: true,
                },
                exit_code::TIMEOUT,
            ),
            (
                CoreError::Transport {
                    message: "t".into(),
                    timeout: false,
                },
                exit_code::CONNECTION,
            ),
            (CoreError::Auth { message: "a".into() }, exit_code::AUTH),
            (
                CoreError::InternalInvariant { message: "i".into() },
                exit_code::AMBIGUOUS,
            ),
            (
                CoreError::Http5xx {
                    status: 502,
                    body: "b".into(),
                },
                exit_code::GENERAL,
            ),
            (CoreError::Cancelled, exit_code::CANCELLED),
        ];
        for (err, code) in cases {
            let label = err.to_string();
            assert_eq!(CliError::from(err).exit_code(), code, "{label}");
        }
    }

    #[test]
    fn api_errors_keep_the_status_message() {
        let err = CliError::from(CoreError::Http4xx {
            status: 409,
            body: "conflict".into(),
        });
        assert_eq!(err.to_string(), "unexpected response code '409': conflict");
    }
}
