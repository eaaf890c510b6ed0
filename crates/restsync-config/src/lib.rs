//! Manifest configuration for restsync.
//!
//! A manifest is a TOML file with one `[client]` table and any number of
//! `[objects.<name>]` tables. Every key can also come from the
//! environment (`RESTSYNC_CLIENT__URI`, `RESTSYNC_OBJECTS__WEB__PATH`, ...).
//! [`resolve_client`] and [`resolve_object`] validate the raw settings and
//! translate them into `restsync_core` configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use restsync_api::{
    Authorization, ClientIdentity, HttpClientConfig, OAuth2Config, RetryPolicy, TlsConfig,
    TransportConfig,
};
use restsync_core::{ClientConfig, Method, ObjectConfig, ReadSearch};

pub const ENV_PREFIX: &str = "RESTSYNC_";
pub const MANIFEST_FILE: &str = "restsync.toml";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("unknown object '{name}'; manifest defines: [{}]", .available.join(", "))]
    UnknownObject {
        name: String,
        available: Vec<String>,
    },

    #[error("manifest loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("failed to read {field} '{}': {source}", .path.display())]
    Io {
        field: String,
        path: PathBuf,
        source: std::io::Error,
    },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── Manifest structs ────────────────────────────────────────────────

/// Top-level manifest.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Manifest {
    #[serde(default)]
    pub client: ClientSettings,

    /// Managed objects by name.
    #[serde(default)]
    pub objects: BTreeMap<String, ObjectSettings>,
}

impl Manifest {
    /// Look up an object by name.
    pub fn object(&self, name: &str) -> Result<&ObjectSettings, ConfigError> {
        self.objects
            .get(name)
            .ok_or_else(|| ConfigError::UnknownObject {
                name: name.to_owned(),
                available: self.objects.keys().cloned().collect(),
            })
    }
}

/// A JSON document given either as a JSON string or as an inline TOML value.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum JsonDocument {
    Text(String),
    Inline(Value),
}

impl JsonDocument {
    /// The document as JSON text.
    pub fn to_json(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Inline(value) => value.to_string(),
        }
    }
}

/// Raw `[client]` table.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ClientSettings {
    pub uri: Option<String>,
    #[serde(default)]
    pub insecure: bool,
    /// Per-request timeout in seconds.
    pub timeout: Option<f64>,
    #[serde(default)]
    pub use_cookies: bool,

    pub create_method: Option<String>,
    pub read_method: Option<String>,
    pub update_method: Option<String>,
    pub destroy_method: Option<String>,
    pub id_attribute: Option<String>,

    pub username: Option<String>,
    pub password: Option<String>,
    pub bearer_token: Option<String>,
    pub oauth2: Option<OAuth2Settings>,

    pub cert_file: Option<PathBuf>,
    pub cert_string: Option<String>,
    pub key_file: Option<PathBuf>,
    pub key_string: Option<String>,
    pub root_ca_file: Option<PathBuf>,
    pub root_ca_string: Option<String>,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub write_returns_object: bool,
    #[serde(default)]
    pub create_returns_object: bool,
    #[serde(default)]
    pub copy_keys: Vec<String>,
    pub xssi_prefix: Option<String>,
    /// Requests per second.
    pub rate_limit: Option<f64>,
    pub test_path: Option<String>,
    pub retry: Option<RetrySettings>,
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct OAuth2Settings {
    pub client_id: String,
    pub client_secret: String,
    pub token_endpoint: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub endpoint_params: BTreeMap<String, Vec<String>>,
}

/// Waits are in seconds.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RetrySettings {
    pub max_retries: Option<i64>,
    pub min_wait: Option<f64>,
    pub max_wait: Option<f64>,
}

/// Raw `[objects.<name>]` table.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ObjectSettings {
    pub path: String,
    pub create_path: Option<String>,
    pub read_path: Option<String>,
    pub update_path: Option<String>,
    pub destroy_path: Option<String>,
    pub search_path: Option<String>,

    pub create_method: Option<String>,
    pub read_method: Option<String>,
    pub update_method: Option<String>,
    pub destroy_method: Option<String>,
    pub id_attribute: Option<String>,
    pub copy_keys: Option<Vec<String>>,
    pub write_returns_object: Option<bool>,
    pub create_returns_object: Option<bool>,
    pub query_string: Option<String>,

    pub data: Option<JsonDocument>,
    pub read_data: Option<JsonDocument>,
    pub update_data: Option<JsonDocument>,
    pub destroy_data: Option<JsonDocument>,

    pub object_id: Option<String>,
    pub read_search: Option<SearchSettings>,
    #[serde(default)]
    pub ignore_changes_to: Vec<String>,
    #[serde(default)]
    pub ignore_all_server_changes: bool,
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SearchSettings {
    pub search_key: String,
    pub search_value: String,
    pub results_key: Option<String>,
    pub query_string: Option<String>,
    pub search_data: Option<JsonDocument>,
    pub search_patch: Option<JsonDocument>,
}

// ── Manifest path and loading ───────────────────────────────────────

/// Default manifest location: `restsync.toml` in the platform config dir,
/// or the current directory when no home directory is known.
pub fn default_manifest_path() -> PathBuf {
    ProjectDirs::from("dev", "restsync", "restsync").map_or_else(
        || PathBuf::from(MANIFEST_FILE),
        |dirs| dirs.config_dir().join(MANIFEST_FILE),
    )
}

/// Figment layering defaults, the manifest file and `RESTSYNC_*` variables.
pub fn manifest_figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Manifest::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load the manifest at `path`, overlaid with environment variables.
pub fn load_manifest(path: &Path) -> Result<Manifest, ConfigError> {
    let manifest: Manifest = manifest_figment(path).extract()?;
    Ok(manifest)
}

// ── Client resolution ───────────────────────────────────────────────

/// Validate `[client]` and build the core client configuration.
pub fn resolve_client(settings: &ClientSettings) -> Result<ClientConfig, ConfigError> {
    let uri = settings
        .uri
        .as_deref()
        .filter(|u| !u.is_empty())
        .ok_or_else(|| invalid("client.uri", "a base URI is required"))?;
    url::Url::parse(uri).map_err(|e| invalid("client.uri", format!("'{uri}': {e}")))?;

    let authorization = resolve_authorization(settings)?;

    let timeout = settings
        .timeout
        .map(|secs| seconds("client.timeout", secs))
        .transpose()?
        .filter(|d| !d.is_zero());

    if let Some(rate) = settings.rate_limit {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(invalid(
                "client.rate_limit",
                format!("must be greater than zero, got {rate}"),
            ));
        }
    }

    let transport = TransportConfig {
        tls: TlsConfig {
            insecure: settings.insecure,
            root_ca_pem: pem(
                "client.root_ca",
                settings.root_ca_file.as_deref(),
                settings.root_ca_string.as_deref(),
            )?,
            identity: resolve_identity(settings)?,
        },
        timeout,
        cookie_jar: None,
    };
    let transport = if settings.use_cookies {
        transport.with_cookie_jar()
    } else {
        transport
    };

    Ok(ClientConfig {
        http: HttpClientConfig {
            base_url: uri.to_owned(),
            transport,
            authorization,
            headers: settings.headers.clone(),
            xssi_prefix: settings.xssi_prefix.clone().filter(|p| !p.is_empty()),
            rate_limit: settings.rate_limit,
            retry: resolve_retry(settings.retry.as_ref())?,
            debug: settings.debug,
        },
        create_method: method("client.create_method", settings.create_method.as_deref())?,
        read_method: method("client.read_method", settings.read_method.as_deref())?,
        update_method: method("client.update_method", settings.update_method.as_deref())?,
        destroy_method: method("client.destroy_method", settings.destroy_method.as_deref())?,
        id_attribute: settings.id_attribute.clone(),
        copy_keys: settings.copy_keys.clone(),
        write_returns_object: settings.write_returns_object,
        create_returns_object: settings.create_returns_object,
        test_path: settings.test_path.clone(),
    })
}

fn resolve_authorization(settings: &ClientSettings) -> Result<Authorization, ConfigError> {
    let header_bearer = settings.headers.iter().any(|(name, value)| {
        name.eq_ignore_ascii_case("authorization")
            && value.trim_start().to_ascii_lowercase().starts_with("bearer ")
    });

    let mut chosen = Vec::new();
    if settings.username.is_some() || settings.password.is_some() {
        chosen.push("username/password");
    }
    if settings.oauth2.is_some() {
        chosen.push("oauth2");
    }
    if settings.bearer_token.is_some() || header_bearer {
        chosen.push("bearer_token");
    }
    if chosen.len() > 1 {
        return Err(invalid(
            "client authorization",
            format!("{} are mutually exclusive", chosen.join(" and ")),
        ));
    }

    if let Some(ref oauth) = settings.oauth2 {
        let token_endpoint = url::Url::parse(&oauth.token_endpoint).map_err(|e| {
            invalid(
                "client.oauth2.token_endpoint",
                format!("'{}': {e}", oauth.token_endpoint),
            )
        })?;
        if oauth.client_id.is_empty() {
            return Err(invalid("client.oauth2.client_id", "must not be empty"));
        }
        return Ok(Authorization::OAuth2(OAuth2Config {
            client_id: oauth.client_id.clone(),
            client_secret: SecretString::from(oauth.client_secret.clone()),
            token_endpoint,
            scopes: oauth.scopes.clone(),
            endpoint_params: oauth.endpoint_params.clone(),
        }));
    }

    if let Some(ref token) = settings.bearer_token {
        return Ok(Authorization::Bearer(SecretString::from(token.clone())));
    }

    match (&settings.username, &settings.password) {
        (Some(username), Some(password)) => Ok(Authorization::Basic {
            username: username.clone(),
            password: SecretString::from(password.clone()),
        }),
        (Some(_), None) => Err(invalid("client.password", "required with client.username")),
        (None, Some(_)) => Err(invalid("client.username", "required with client.password")),
        (None, None) => Ok(Authorization::None),
    }
}

fn resolve_identity(settings: &ClientSettings) -> Result<Option<ClientIdentity>, ConfigError> {
    let cert = pem(
        "client.cert",
        settings.cert_file.as_deref(),
        settings.cert_string.as_deref(),
    )?;
    let key = pem(
        "client.key",
        settings.key_file.as_deref(),
        settings.key_string.as_deref(),
    )?;

    match (cert, key) {
        (Some(cert_pem), Some(key_pem)) => Ok(Some(ClientIdentity { cert_pem, key_pem })),
        (Some(_), None) => Err(invalid(
            "client.key_file",
            "a client certificate requires key_file or key_string",
        )),
        (None, Some(_)) => Err(invalid(
            "client.cert_file",
            "a client key requires cert_file or cert_string",
        )),
        (None, None) => Ok(None),
    }
}

/// PEM bytes from a file or an inline string, never both.
fn pem(field: &str, file: Option<&Path>, inline: Option<&str>) -> Result<Option<Vec<u8>>, ConfigError> {
    match (file, inline) {
        (Some(_), Some(_)) => Err(invalid(
            field,
            format!("{field}_file and {field}_string are mutually exclusive"),
        )),
        (Some(path), None) => std::fs::read(path)
            .map(Some)
            .map_err(|source| ConfigError::Io {
                field: format!("{field}_file"),
                path: path.to_owned(),
                source,
            }),
        (None, Some(text)) => Ok(Some(text.as_bytes().to_vec())),
        (None, None) => Ok(None),
    }
}

fn resolve_retry(settings: Option<&RetrySettings>) -> Result<RetryPolicy, ConfigError> {
    let defaults = RetryPolicy::default();
    let Some(settings) = settings else {
        return Ok(defaults);
    };

    let max_retries = match settings.max_retries {
        Some(n) => u32::try_from(n).map_err(|_| {
            invalid(
                "client.retry.max_retries",
                format!("must be a non-negative count, got {n}"),
            )
        })?,
        None => defaults.max_retries,
    };
    let min_wait = settings
        .min_wait
        .map(|s| seconds("client.retry.min_wait", s))
        .transpose()?
        .unwrap_or(defaults.min_wait);
    let max_wait = settings
        .max_wait
        .map(|s| seconds("client.retry.max_wait", s))
        .transpose()?
        .unwrap_or(defaults.max_wait);

    if min_wait > max_wait {
        return Err(invalid(
            "client.retry",
            format!(
                "min_wait ({}s) must not exceed max_wait ({}s)",
                min_wait.as_secs_f64(),
                max_wait.as_secs_f64()
            ),
        ));
    }

    Ok(RetryPolicy {
        max_retries,
        min_wait,
        max_wait,
    })
}

fn seconds(field: &str, secs: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(secs)
        .map_err(|_| invalid(field, format!("must be a non-negative number of seconds, got {secs}")))
}

const METHODS: [Method; 7] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::HEAD,
    Method::OPTIONS,
];

fn method(field: &str, raw: Option<&str>) -> Result<Option<Method>, ConfigError> {
    let Some(raw) = raw.filter(|m| !m.is_empty()) else {
        return Ok(None);
    };
    let upper = raw.to_ascii_uppercase();
    METHODS
        .iter()
        .find(|m| m.as_str() == upper)
        .cloned()
        .map(Some)
        .ok_or_else(|| invalid(field, format!("'{raw}' is not an HTTP method")))
}

// ── Object resolution ───────────────────────────────────────────────

/// Validate `[objects.<name>]` and build the core object configuration.
pub fn resolve_object(name: &str, settings: &ObjectSettings) -> Result<ObjectConfig, ConfigError> {
    let field = |key: &str| format!("objects.{name}.{key}");

    if settings.path.is_empty() {
        return Err(invalid(field("path"), "a collection path is required"));
    }
    let data = settings
        .data
        .as_ref()
        .map(JsonDocument::to_json)
        .ok_or_else(|| invalid(field("data"), "the object declaration is required"))?;

    let read_search = match settings.read_search {
        Some(ref search) => {
            if search.search_key.is_empty() || search.search_value.is_empty() {
                return Err(invalid(
                    field("read_search"),
                    "search_key and search_value are both required",
                ));
            }
            Some(ReadSearch {
                search_key: search.search_key.clone(),
                search_value: search.search_value.clone(),
                results_key: search.results_key.clone(),
                query_string: search.query_string.clone(),
                search_data: search.search_data.as_ref().map(JsonDocument::to_json),
                search_patch: search.search_patch.as_ref().map(JsonDocument::to_json),
            })
        }
        None => None,
    };

    Ok(ObjectConfig {
        path: settings.path.clone(),
        create_path: settings.create_path.clone(),
        read_path: settings.read_path.clone(),
        update_path: settings.update_path.clone(),
        destroy_path: settings.destroy_path.clone(),
        search_path: settings.search_path.clone(),

        create_method: method(&field("create_method"), settings.create_method.as_deref())?,
        read_method: method(&field("read_method"), settings.read_method.as_deref())?,
        update_method: method(&field("update_method"), settings.update_method.as_deref())?,
        destroy_method: method(&field("destroy_method"), settings.destroy_method.as_deref())?,
        id_attribute: settings.id_attribute.clone(),
        copy_keys: settings.copy_keys.clone(),
        write_returns_object: settings.write_returns_object,
        create_returns_object: settings.create_returns_object,
        query_string: settings.query_string.clone(),

        data,
        read_data: settings.read_data.as_ref().map(JsonDocument::to_json),
        update_data: settings.update_data.as_ref().map(JsonDocument::to_json),
        destroy_data: settings.destroy_data.as_ref().map(JsonDocument::to_json),

        object_id: settings.object_id.clone(),
        read_search,
        ignore_changes_to: settings.ignore_changes_to.clone(),
        ignore_all_server_changes: settings.ignore_all_server_changes,
        debug: settings.debug,
    })
}
