//! Async HTTP transport for declarative REST object sync.
//!
//! [`HttpClient`] is the single entry point: it owns the `reqwest::Client`
//! (TLS trust, client identity, cookie jar, timeout), the authorization
//! policy, the shared token-bucket [`RateLimiter`] and the [`RetryPolicy`].
//! Its one operation, [`HttpClient::send`], returns a normalized body or a
//! typed [`Error`].

pub mod auth;
pub mod client;
pub mod error;
pub mod rate_limit;
pub mod retry;
pub mod transport;

pub use auth::{Authorization, OAuth2Config};
pub use client::{ApiResponse, EMPTY_OBJECT, HttpClient, HttpClientConfig};
pub use error::Error;
pub use rate_limit::RateLimiter;
pub use retry::RetryPolicy;
pub use transport::{ClientIdentity, TlsConfig, TransportConfig};

pub use reqwest::Method;
pub use tokio_util::sync::CancellationToken;
