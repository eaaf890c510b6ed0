// ── Object controller ──
//
// Drives the CREATE / READ / UPDATE / DELETE lifecycle of one remote
// entity and keeps the declared and observed documents side by side.
// Operations on one `ApiObject` must not overlap; inspectors may run
// concurrently with an in-flight operation.

mod path;
mod search;

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use restsync_api::{CancellationToken, Method};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::client::ApiClient;
use crate::config::ObjectConfig;
use crate::delta::{Delta, get_delta};
use crate::error::CoreError;
use crate::json_path::{get_string_at_key, kind_of};

pub use path::{append_id_to_path, append_query, join_queries, strip_id_suffix, substitute_id};

use search::CompiledSearch;

/// Point-in-time copy of an object's state, suitable for persisting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectSnapshot {
    pub id: String,
    pub declared: Map<String, Value>,
    pub api_data: Map<String, Value>,
    pub api_response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_response: Option<String>,
}

#[derive(Debug, Default)]
struct ObjectState {
    id: String,
    declared: Map<String, Value>,
    api_data: Map<String, Value>,
    api_response: String,
    create_response: Option<String>,
}

/// One managed remote entity bound to an [`ApiClient`].
#[derive(Debug)]
pub struct ApiObject {
    client: ApiClient,

    create_path: String,
    read_path: String,
    update_path: String,
    destroy_path: String,
    search_path: String,

    create_method: Method,
    read_method: Method,
    update_method: Method,
    destroy_method: Method,

    id_attribute: String,
    copy_keys: Vec<String>,
    write_returns_object: bool,
    create_returns_object: bool,
    query_string: Option<String>,

    read_data: Option<String>,
    update_data: Option<String>,
    destroy_data: Option<String>,
    search: Option<CompiledSearch>,

    ignore_changes_to: Vec<String>,
    ignore_all_server_changes: bool,
    debug: bool,

    /// Id taken from `object_id` or the declaration at construction.
    declared_id: String,
    state: RwLock<ObjectState>,
}

impl ApiObject {
    /// Validate `config` and bind it to `client`. No request is sent.
    pub fn new(client: ApiClient, config: ObjectConfig) -> Result<Self, CoreError> {
        if config.path.is_empty() {
            return Err(CoreError::config("object path must not be empty"));
        }
        let declared = parse_object("data", &config.data)?;

        let id_attribute = config
            .id_attribute
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| client.id_attribute().to_owned());
        let write_returns_object = config
            .write_returns_object
            .unwrap_or_else(|| client.write_returns_object());
        let create_returns_object = config
            .create_returns_object
            .unwrap_or_else(|| client.create_returns_object());
        let copy_keys = config
            .copy_keys
            .unwrap_or_else(|| client.copy_keys().to_vec());

        let search = config
            .read_search
            .as_ref()
            .map(CompiledSearch::compile)
            .transpose()?;

        let id = match config.object_id.filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => get_string_at_key(&Value::Object(declared.clone()), &id_attribute)
                .unwrap_or_default(),
        };

        if id.is_empty() && !write_returns_object && !create_returns_object && search.is_none() {
            return Err(CoreError::config(format!(
                "no id found at '{id_attribute}' in data and no object_id given; \
                 without write_returns_object, create_returns_object or read_search \
                 the object cannot be tracked after creation"
            )));
        }

        let read_data = validated_payload("read_data", config.read_data)?;
        let update_data = validated_payload("update_data", config.update_data)?;
        let destroy_data = validated_payload("destroy_data", config.destroy_data)?;

        let explicit_read_path = config.read_path.filter(|p| !p.is_empty());
        let search_path = config
            .search_path
            .filter(|p| !p.is_empty())
            .or_else(|| explicit_read_path.as_deref().map(strip_id_suffix))
            .unwrap_or_else(|| config.path.clone());
        let id_path = |explicit: Option<String>| {
            explicit
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| append_id_to_path(&config.path))
        };

        let object = Self {
            create_path: config
                .create_path
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| config.path.clone()),
            read_path: id_path(explicit_read_path),
            update_path: id_path(config.update_path),
            destroy_path: id_path(config.destroy_path),
            search_path,

            create_method: config
                .create_method
                .unwrap_or_else(|| client.create_method().clone()),
            read_method: config
                .read_method
                .unwrap_or_else(|| client.read_method().clone()),
            update_method: config
                .update_method
                .unwrap_or_else(|| client.update_method().clone()),
            destroy_method: config
                .destroy_method
                .unwrap_or_else(|| client.destroy_method().clone()),

            id_attribute,
            copy_keys,
            write_returns_object,
            create_returns_object,
            query_string: config.query_string.filter(|q| !q.is_empty()),

            read_data,
            update_data,
            destroy_data,
            search,

            ignore_changes_to: config.ignore_changes_to,
            ignore_all_server_changes: config.ignore_all_server_changes,
            debug: config.debug,

            declared_id: id.clone(),
            client,
            state: RwLock::new(ObjectState {
                id,
                declared,
                ..ObjectState::default()
            }),
        };

        debug!(
            id = %object.id(),
            read_path = %object.read_path,
            search = object.search.is_some(),
            "object configured"
        );
        Ok(object)
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Create the object from the declaration.
    ///
    /// An id cleared by an earlier read or delete is restored from the
    /// declaration before sending. A cancelled CREATE is reported as an internal invariant failure:
    /// the server may hold an object whose id was never learned.
    pub async fn create(&self, cancel: &CancellationToken) -> Result<(), CoreError> {
        let authoritative = self.write_returns_object || self.create_returns_object;
        let (id, body) = {
            let mut state = self.write_state();
            if state.id.is_empty() {
                state.id.clone_from(&self.declared_id);
            }
            let body = encode("data", &state.declared)?;
            (state.id.clone(), body)
        };
        if id.is_empty() && !authoritative && self.search.is_none() {
            return Err(CoreError::IdentityMissing {
                message: "cannot create an object with no id unless the response \
                          or a search can supply one"
                    .into(),
            });
        }

        let path = self.request_path(&self.create_path, &id);
        let response = match self.send(&self.create_method, &path, &body, cancel).await {
            Ok(response) => response,
            Err(CoreError::Cancelled) => {
                return Err(CoreError::InternalInvariant {
                    message: format!(
                        "CREATE to '{path}' was cancelled before its response was read; \
                         the object may exist on the server without a known id"
                    ),
                });
            }
            Err(e) => return Err(e),
        };

        if !authoritative {
            return self.read(cancel).await;
        }

        {
            let mut state = self.write_state();
            if state.create_response.is_none() {
                state.create_response = Some(response.clone());
            }
        }
        let unknown_id = || CoreError::InternalInvariant {
            message: format!(
                "CREATE to '{path}' succeeded but no id was found at '{}'",
                self.id_attribute
            ),
        };
        match self.adopt(None, &response) {
            Err(CoreError::IdentityMissing { .. }) => return Err(unknown_id()),
            Err(e) => return Err(e),
            Ok(()) => {}
        }

        let id = self.id();
        if id.is_empty() {
            return Err(unknown_id());
        }
        info!(id = %id, "object created");
        Ok(())
    }

    /// Refresh the observed document from the server.
    ///
    /// When the server reports the object gone (404, or no search match)
    /// the id is cleared and `Ok(())` is returned.
    pub async fn read(&self, cancel: &CancellationToken) -> Result<(), CoreError> {
        let id = self.id();

        if self.search.is_some() {
            return match self.find(cancel).await? {
                Some((found, record)) => {
                    let raw = encode("search record", &record)?;
                    self.adopt(Some(found), &raw)
                }
                None => {
                    self.clear_id();
                    Ok(())
                }
            };
        }

        if id.is_empty() {
            return Err(CoreError::IdentityMissing {
                message: "cannot read an object whose id is unknown".into(),
            });
        }

        let path = self.request_path(&self.read_path, &id);
        let body = self.read_data.as_deref().unwrap_or_default();
        match self.send(&self.read_method, &path, body, cancel).await {
            Ok(response) => self.adopt(None, &response),
            Err(e) if e.is_not_found() => {
                info!(id = %id, "object no longer exists");
                self.clear_id();
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Push the declaration (or the configured update payload) to the server.
    pub async fn update(&self, cancel: &CancellationToken) -> Result<(), CoreError> {
        let (id, body) = {
            let state = self.read_state();
            let body = match self.update_data {
                Some(ref data) => data.clone(),
                None => encode("data", &state.declared)?,
            };
            (state.id.clone(), body)
        };
        if id.is_empty() {
            return Err(CoreError::IdentityMissing {
                message: "cannot update an object whose id is unknown".into(),
            });
        }

        let path = self.request_path(&self.update_path, &id);
        let response = self.send(&self.update_method, &path, &body, cancel).await?;

        if self.write_returns_object {
            self.adopt(None, &response)
        } else {
            self.read(cancel).await
        }
    }

    /// Delete the object and forget its id. Already gone (404/410) counts
    /// as success.
    pub async fn delete(&self, cancel: &CancellationToken) -> Result<(), CoreError> {
        let id = self.id();
        if id.is_empty() {
            debug!("delete skipped, object has no id");
            return Ok(());
        }

        let path = self.request_path(&self.destroy_path, &id);
        let body = self.destroy_data.as_deref().unwrap_or_default();
        match self.send(&self.destroy_method, &path, body, cancel).await {
            Ok(_) => {
                info!(id = %id, "object deleted");
                self.clear_id();
                Ok(())
            }
            Err(e) if e.is_gone() => {
                debug!(id = %id, status = ?e.status(), "object already gone");
                self.clear_id();
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Run the configured search without adopting its result.
    ///
    /// Returns the matched id and (patched) record, or `None` when nothing
    /// matched. Fails when no search is configured.
    pub async fn find(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Option<(String, Value)>, CoreError> {
        let Some(ref search) = self.search else {
            return Err(CoreError::config("object has no read_search configured"));
        };

        let id = self.id();
        let value = search.value_for(&id);
        let query = join_queries(
            search.query_string.as_deref(),
            self.query_string.as_deref(),
        );
        let path = append_query(&substitute_id(&self.search_path, &id), query.as_deref());
        let body = search.body.as_deref().unwrap_or_default();

        let response = self.send(&self.read_method, &path, body, cancel).await?;
        let response: Value =
            serde_json::from_str(&response).map_err(|e| CoreError::Decode {
                context: format!("search response from '{path}'"),
                message: e.to_string(),
            })?;

        match search.select(&response, &value, &self.id_attribute) {
            Ok(found) => {
                debug!(key = %search.key, value = %value, id = %found.0, "search matched");
                Ok(Some(found))
            }
            Err(CoreError::SearchNoMatch { key, value }) => {
                info!(key = %key, value = %value, "search found no matching record");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    // ── Drift ────────────────────────────────────────────────────────

    /// Compare the declaration against the last observed document.
    pub fn compute_delta(&self, ignore: &[String], ignore_server_additions: bool) -> Delta {
        let state = self.read_state();
        get_delta(
            &state.declared,
            &state.api_data,
            ignore,
            ignore_server_additions,
        )
    }

    /// [`compute_delta`](Self::compute_delta) with the object's own ignore settings.
    pub fn drift(&self) -> Delta {
        self.compute_delta(&self.ignore_changes_to, self.ignore_all_server_changes)
    }

    // ── Inspectors ───────────────────────────────────────────────────

    pub fn id(&self) -> String {
        self.read_state().id.clone()
    }

    pub fn declared(&self) -> Map<String, Value> {
        self.read_state().declared.clone()
    }

    pub fn api_data(&self) -> Map<String, Value> {
        self.read_state().api_data.clone()
    }

    pub fn api_response(&self) -> String {
        self.read_state().api_response.clone()
    }

    pub fn create_response(&self) -> Option<String> {
        self.read_state().create_response.clone()
    }

    pub fn snapshot(&self) -> ObjectSnapshot {
        let state = self.read_state();
        ObjectSnapshot {
            id: state.id.clone(),
            declared: state.declared.clone(),
            api_data: state.api_data.clone(),
            api_response: state.api_response.clone(),
            create_response: state.create_response.clone(),
        }
    }

    /// Whether [`read`](Self::read) can run: an id is known or a search is configured.
    pub fn is_locatable(&self) -> bool {
        self.search.is_some() || !self.id().is_empty()
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Replace the observed document with `raw`.
    ///
    /// `id`, when given, overrides the current id; otherwise an empty id
    /// is extracted from the document.
    fn adopt(&self, id: Option<String>, raw: &str) -> Result<(), CoreError> {
        let api_data = parse_object("API response", raw)?;

        let extracted = match id {
            Some(id) => Some(id),
            None if self.id().is_empty() => {
                let id = get_string_at_key(&Value::Object(api_data.clone()), &self.id_attribute)
                    .map_err(|e| CoreError::IdentityMissing {
                        message: format!(
                            "response has no id at '{}': {e}",
                            self.id_attribute
                        ),
                    })?;
                Some(id)
            }
            None => None,
        };

        let mut state = self.write_state();
        if let Some(id) = extracted {
            state.id = id;
        }
        for key in &self.copy_keys {
            let value = api_data.get(key).cloned().unwrap_or(Value::Null);
            state.declared.insert(key.clone(), value);
        }
        state.api_data = api_data;
        state.api_response = raw.to_owned();
        Ok(())
    }

    fn clear_id(&self) {
        self.write_state().id.clear();
    }

    fn request_path(&self, template: &str, id: &str) -> String {
        append_query(&substitute_id(template, id), self.query_string.as_deref())
    }

    async fn send(
        &self,
        method: &Method,
        path: &str,
        body: &str,
        cancel: &CancellationToken,
    ) -> Result<String, CoreError> {
        let response = self
            .client
            .http()
            .send(method.clone(), path, body, self.debug, cancel)
            .await
            .inspect_err(|e| warn!(method = %method, path = %path, error = %e, "request failed"))?;
        Ok(response.body)
    }

    fn read_state(&self) -> RwLockReadGuard<'_, ObjectState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, ObjectState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Decode `raw` as a JSON object.
pub(crate) fn parse_object(context: &str, raw: &str) -> Result<Map<String, Value>, CoreError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(CoreError::Decode {
            context: context.to_owned(),
            message: format!("expected a JSON object, found {}", kind_of(&other)),
        }),
        Err(e) => Err(CoreError::Decode {
            context: context.to_owned(),
            message: e.to_string(),
        }),
    }
}

fn validated_payload(name: &str, raw: Option<String>) -> Result<Option<String>, CoreError> {
    match raw {
        Some(raw) => {
            parse_object(name, &raw).map_err(|e| CoreError::config(e.to_string()))?;
            Ok(Some(raw))
        }
        None => Ok(None),
    }
}

fn encode<T: Serialize>(context: &str, value: &T) -> Result<String, CoreError> {
    serde_json::to_string(value).map_err(|e| CoreError::Decode {
        context: context.to_owned(),
        message: e.to_string(),
    })
}
