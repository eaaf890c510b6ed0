//! Slash-delimited descent into decoded JSON (`a/b/0/c`).
//!
//! Objects are indexed by key, arrays by a numeric segment. Empty
//! segments are ignored, so `/a//b/` is the same path as `a/b`.

use serde_json::Value;
use thiserror::Error;

/// Why a path could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JsonPathError {
    #[error("key '{segment}' not found at '{traversed}'; available keys: [{}]", .available.join(", "))]
    MissingKey {
        traversed: String,
        segment: String,
        available: Vec<String>,
    },

    #[error("'{segment}' at '{traversed}' is not a valid index into an array of {len} elements")]
    BadIndex {
        traversed: String,
        segment: String,
        len: usize,
    },

    #[error("cannot descend into {kind} at '{traversed}' with '{segment}'")]
    NotTraversable {
        traversed: String,
        segment: String,
        kind: &'static str,
    },

    #[error("value at '{path}' is {kind}; expected a string, number or boolean")]
    NotScalar { path: String, kind: &'static str },
}

/// Human name of a JSON value's type, for diagnostics.
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Walk `path` from `root` and return the value it names.
pub fn get_object_at_key<'a>(root: &'a Value, path: &str) -> Result<&'a Value, JsonPathError> {
    let mut current = root;
    let mut traversed = String::new();

    for segment in path.split('/').filter(|s| !s.is_empty()) {
        current = match current {
            Value::Object(map) => map.get(segment).ok_or_else(|| {
                let mut available: Vec<String> = map.keys().cloned().collect();
                available.sort();
                JsonPathError::MissingKey {
                    traversed: traversed.clone(),
                    segment: segment.to_owned(),
                    available,
                }
            })?,
            Value::Array(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|idx| items.get(idx))
                .ok_or_else(|| JsonPathError::BadIndex {
                    traversed: traversed.clone(),
                    segment: segment.to_owned(),
                    len: items.len(),
                })?,
            other => {
                return Err(JsonPathError::NotTraversable {
                    traversed,
                    segment: segment.to_owned(),
                    kind: kind_of(other),
                });
            }
        };
        traversed.push('/');
        traversed.push_str(segment);
    }

    Ok(current)
}

/// Like [`get_object_at_key`], but coerce the scalar found into a string.
pub fn get_string_at_key(root: &Value, path: &str) -> Result<String, JsonPathError> {
    match get_object_at_key(root, path)? {
        Value::String(s) => Ok(s.clone()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(render_number(n)),
        other => Err(JsonPathError::NotScalar {
            path: path.to_owned(),
            kind: kind_of(other),
        }),
    }
}

/// Integers print as-is; floats print without a trailing `.0`.
fn render_number(n: &serde_json::Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        #[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        Some(f) => format!("{f}"),
        None => n.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn doc() -> Value {
        json!({
            "id": "abc",
            "meta": { "rev": 3, "ratio": 2.5, "whole": 4.0, "live": true, "gone": null },
            "items": [ { "name": "first" }, { "name": "second" } ]
        })
    }

    #[test]
    fn descends_objects_and_arrays() {
        let d = doc();
        assert_eq!(get_object_at_key(&d, "meta/rev").unwrap(), &json!(3));
        assert_eq!(get_string_at_key(&d, "items/1/name").unwrap(), "second");
        assert_eq!(get_string_at_key(&d, "/items//0/name/").unwrap(), "first");
    }

    #[test]
    fn empty_path_is_root() {
        let d = doc();
        assert_eq!(get_object_at_key(&d, "").unwrap(), &d);
    }

    #[test]
    fn scalars_are_coerced() {
        let d = doc();
        assert_eq!(get_string_at_key(&d, "meta/rev").unwrap(), "3");
        assert_eq!(get_string_at_key(&d, "meta/ratio").unwrap(), "2.5");
        assert_eq!(get_string_at_key(&d, "meta/whole").unwrap(), "4");
        assert_eq!(get_string_at_key(&d, "meta/live").unwrap(), "true");
    }

    #[test]
    fn non_scalars_are_rejected() {
        let d = doc();
        for path in ["meta", "items", "meta/gone"] {
            assert!(
                matches!(get_string_at_key(&d, path), Err(JsonPathError::NotScalar { .. })),
                "{path} should not coerce"
            );
        }
    }

    #[test]
    fn missing_key_lists_siblings() {
        let d = doc();
        let err = get_object_at_key(&d, "meta/revision").unwrap_err();
        assert_eq!(
            err,
            JsonPathError::MissingKey {
                traversed: "/meta".into(),
                segment: "revision".into(),
                available: vec![
                    "gone".into(),
                    "live".into(),
                    "ratio".into(),
                    "rev".into(),
                    "whole".into()
                ],
            }
        );
        assert!(err.to_string().contains("available keys: [gone, live, ratio, rev, whole]"));
    }

    #[test]
    fn bad_index_and_scalar_descent_fail() {
        let d = doc();
        assert!(matches!(
            get_object_at_key(&d, "items/7"),
            Err(JsonPathError::BadIndex { len: 2, .. })
        ));
        assert!(matches!(
            get_object_at_key(&d, "items/first"),
            Err(JsonPathError::BadIndex { .. })
        ));
        assert!(matches!(
            get_object_at_key(&d, "id/deeper"),
            Err(JsonPathError::NotTraversable { kind: "a string", .. })
        ));
    }
}
