// ── Runtime configuration ──
//
// These types describe *what* to sync and *how* to talk to the API.
// They carry already-validated values and never touch disk: the
// `restsync-config` crate builds them from files and environment.

use restsync_api::{HttpClientConfig, Method};

/// Client-wide settings shared by every object bound to one API.
///
/// `None` fields fall back to the hard-coded defaults
/// (`POST`/`GET`/`PUT`/`DELETE`, id attribute `id`).
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub http: HttpClientConfig,
    pub create_method: Option<Method>,
    pub read_method: Option<Method>,
    pub update_method: Option<Method>,
    pub destroy_method: Option<Method>,
    /// Slash-delimited path to the id inside an object's JSON.
    pub id_attribute: Option<String>,
    /// Server-authoritative keys copied into the declaration on every read.
    pub copy_keys: Vec<String>,
    /// CREATE and UPDATE responses carry the full object.
    pub write_returns_object: bool,
    /// Only the CREATE response carries the full object.
    pub create_returns_object: bool,
    /// Probed with the read method when the client connects.
    pub test_path: Option<String>,
}

/// Locate an object by scanning a collection instead of fetching by id.
#[derive(Debug, Clone, Default)]
pub struct ReadSearch {
    /// Path inside each record compared against `search_value`.
    pub search_key: String,
    /// Literal to match; `{id}` is replaced by the current id.
    pub search_value: String,
    /// Path to the array of records; the response root when `None`.
    pub results_key: Option<String>,
    pub query_string: Option<String>,
    /// JSON object sent as the search request body.
    pub search_data: Option<String>,
    /// JSON Patch (RFC 6902) applied to the matched record before adoption.
    pub search_patch: Option<String>,
}

/// Per-object settings. `None` overrides fall back to the client.
#[derive(Debug, Clone, Default)]
pub struct ObjectConfig {
    /// Base collection path, e.g. `/api/objects`.
    pub path: String,
    pub create_path: Option<String>,
    pub read_path: Option<String>,
    pub update_path: Option<String>,
    pub destroy_path: Option<String>,
    pub search_path: Option<String>,

    pub create_method: Option<Method>,
    pub read_method: Option<Method>,
    pub update_method: Option<Method>,
    pub destroy_method: Option<Method>,
    pub id_attribute: Option<String>,
    pub copy_keys: Option<Vec<String>>,
    pub write_returns_object: Option<bool>,
    pub create_returns_object: Option<bool>,

    /// Appended to every request path.
    pub query_string: Option<String>,

    /// The declaration: a JSON object.
    pub data: String,
    pub read_data: Option<String>,
    pub update_data: Option<String>,
    pub destroy_data: Option<String>,

    /// Explicit id; takes precedence over the id found in `data`.
    pub object_id: Option<String>,
    pub read_search: Option<ReadSearch>,

    /// Dotted paths excluded from drift detection.
    pub ignore_changes_to: Vec<String>,
    /// Server-only keys never count as drift.
    pub ignore_all_server_changes: bool,
    pub debug: bool,
}
