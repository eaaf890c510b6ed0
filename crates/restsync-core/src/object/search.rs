// Search-read: locate one record in a collection response.

use json_patch::Patch;
use serde_json::Value;

use crate::config::ReadSearch;
use crate::error::CoreError;
use crate::json_path::{get_object_at_key, get_string_at_key, kind_of};

use super::path::{ID_PLACEHOLDER, substitute_id};

/// A validated `read_search` block, ready to run.
#[derive(Debug, Clone)]
pub(crate) struct CompiledSearch {
    pub key: String,
    value: String,
    results_key: Option<String>,
    pub query_string: Option<String>,
    pub body: Option<String>,
    patch: Option<Patch>,
}

impl CompiledSearch {
    pub fn compile(search: &ReadSearch) -> Result<Self, CoreError> {
        if search.search_key.is_empty() || search.search_value.is_empty() {
            return Err(CoreError::config(
                "read_search requires both search_key and search_value",
            ));
        }

        let body = match search.search_data.as_deref() {
            Some(raw) => {
                super::parse_object("read_search.search_data", raw)?;
                Some(raw.to_owned())
            }
            None => None,
        };

        let patch = search
            .search_patch
            .as_deref()
            .map(|raw| {
                serde_json::from_str::<Patch>(raw).map_err(|e| {
                    CoreError::config(format!("read_search.search_patch is not a JSON Patch: {e}"))
                })
            })
            .transpose()?;

        Ok(Self {
            key: search.search_key.clone(),
            value: search.search_value.clone(),
            results_key: search.results_key.clone().filter(|k| !k.is_empty()),
            query_string: search.query_string.clone().filter(|q| !q.is_empty()),
            body,
            patch,
        })
    }

    /// The literal to match, with `{id}` replaced by `id`.
    pub fn value_for(&self, id: &str) -> String {
        if self.value.contains(ID_PLACEHOLDER) {
            substitute_id(&self.value, id)
        } else {
            self.value.clone()
        }
    }

    /// Pick the first record whose `key` equals `value`.
    ///
    /// Returns the record's id (read through `id_attribute`) and the
    /// record itself, patched if a search patch was configured.
    pub fn select(
        &self,
        response: &Value,
        value: &str,
        id_attribute: &str,
    ) -> Result<(String, Value), CoreError> {
        let records = match self.results_key.as_deref() {
            Some(results_key) => get_object_at_key(response, results_key)?,
            None => response,
        };
        let Value::Array(records) = records else {
            return Err(CoreError::SearchShape {
                message: format!(
                    "expected an array of records at '{}', found {}",
                    self.results_key.as_deref().unwrap_or("/"),
                    kind_of(records)
                ),
            });
        };

        for (idx, record) in records.iter().enumerate() {
            if !record.is_object() {
                return Err(CoreError::SearchShape {
                    message: format!("record {idx} is {}, expected an object", kind_of(record)),
                });
            }
            if get_string_at_key(record, &self.key)? != value {
                continue;
            }

            let id = get_string_at_key(record, id_attribute).map_err(|e| {
                CoreError::IdentityMissing {
                    message: format!("matched record has no id at '{id_attribute}': {e}"),
                }
            })?;

            let mut record = record.clone();
            if let Some(ref patch) = self.patch {
                json_patch::patch(&mut record, &patch.0).map_err(|e| {
                    CoreError::SearchShape {
                        message: format!("search_patch failed on matched record: {e}"),
                    }
                })?;
            }
            return Ok((id, record));
        }

        Err(CoreError::SearchNoMatch {
            key: self.key.clone(),
            value: value.to_owned(),
        })
    }
}
