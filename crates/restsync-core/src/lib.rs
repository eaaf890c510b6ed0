//! Object lifecycle and drift detection on top of `restsync-api`.
//!
//! - **[`ApiClient`]**: shared handle to one REST API: the HTTP transport
//!   plus the client-wide defaults (methods, id attribute, copy keys) every
//!   object inherits. [`connect()`](ApiClient::connect) runs the optional
//!   test-path probe.
//!
//! - **[`ApiObject`]**: controller for a single remote entity. Drives
//!   [`create`](ApiObject::create), [`read`](ApiObject::read),
//!   [`update`](ApiObject::update) and [`delete`](ApiObject::delete),
//!   locates entities by collection search, and adopts server responses.
//!
//! - **[`get_delta`]**: compares a declaration against the server's view,
//!   honoring dotted ignore paths.
//!
//! - **[`json_path`]**: slash-delimited accessor (`a/b/0/c`) used for ids
//!   and search keys.

pub mod client;
pub mod config;
pub mod delta;
pub mod error;
pub mod json_path;
pub mod object;

// ── Primary re-exports ──────────────────────────────────────────────
pub use client::{ApiClient, DEFAULT_ID_ATTRIBUTE};
pub use config::{ClientConfig, ObjectConfig, ReadSearch};
pub use delta::{Delta, get_delta, json_eq};
pub use error::CoreError;
pub use json_path::{JsonPathError, get_object_at_key, get_string_at_key};
pub use object::{ApiObject, ObjectSnapshot, append_id_to_path};

pub use restsync_api::{CancellationToken, Method};
