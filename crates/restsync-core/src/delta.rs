//! Drift detection between a recorded declaration and the server's view.
//!
//! [`get_delta`] walks the recorded document key by key and overlays
//! every server value that differs, honoring a list of dotted ignore
//! paths (`outer.inner`). Arrays are compared whole, never merged.

use serde_json::{Map, Value};

/// Result of a drift check.
#[derive(Debug, Clone, PartialEq)]
pub struct Delta {
    /// The recorded document with every drifted server value overlaid.
    pub modified: Map<String, Value>,
    pub has_changes: bool,
}

/// Compare `recorded` against `actual`.
///
/// Keys listed in `ignore` keep their recorded value. Keys present only
/// in `actual` are adopted (and count as drift) unless
/// `ignore_server_additions` is set.
pub fn get_delta(
    recorded: &Map<String, Value>,
    actual: &Map<String, Value>,
    ignore: &[String],
    ignore_server_additions: bool,
) -> Delta {
    let mut modified = Map::new();
    let mut has_changes = false;

    for (key, recorded_value) in recorded {
        if ignore.iter().any(|p| p == key) {
            modified.insert(key.clone(), recorded_value.clone());
            continue;
        }

        let actual_value = actual.get(key);

        match (recorded_value, actual_value) {
            // Absence on the server equals null.
            (Value::Null, actual_value) => {
                let actual_value = actual_value.cloned().unwrap_or(Value::Null);
                if !actual_value.is_null() {
                    has_changes = true;
                }
                modified.insert(key.clone(), actual_value);
            }
            (Value::Object(rec), Some(Value::Object(act))) => {
                let nested = descend(ignore, key);
                let inner = get_delta(rec, act, &nested, ignore_server_additions);
                if inner.has_changes {
                    has_changes = true;
                    modified.insert(key.clone(), Value::Object(inner.modified));
                } else {
                    modified.insert(key.clone(), recorded_value.clone());
                }
            }
            (recorded_value, actual_value) => {
                let same = actual_value.is_some_and(|a| json_eq(recorded_value, a));
                if same {
                    modified.insert(key.clone(), recorded_value.clone());
                } else {
                    has_changes = true;
                    modified.insert(key.clone(), actual_value.cloned().unwrap_or(Value::Null));
                }
            }
        }
    }

    for (key, actual_value) in actual {
        if recorded.contains_key(key) || ignore.iter().any(|p| p == key) {
            continue;
        }
        if ignore_server_additions {
            continue;
        }
        has_changes = true;
        modified.insert(key.clone(), actual_value.clone());
    }

    Delta {
        modified,
        has_changes,
    }
}

/// Ignore paths relevant below `key`, with the leading `key.` stripped.
fn descend(ignore: &[String], key: &str) -> Vec<String> {
    ignore
        .iter()
        .filter_map(|path| {
            path.split_once('.')
                .filter(|(head, _)| *head == key)
                .map(|(_, rest)| rest.to_owned())
        })
        .collect()
}

/// Structural equality that treats numerically equal numbers as equal (`1 == 1.0`).
pub fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| json_eq(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| json_eq(x, y)))
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn obj(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            other => panic!("expected object, got {other}"),
        }
    }

    fn ignore(paths: &[&str]) -> Vec<String> {
        paths.iter().map(|p| (*p).to_owned()).collect()
    }

    #[test]
    fn identical_documents_have_no_drift() {
        let d = obj(json!({
            "a": 1, "b": "two", "c": [1, 2, {"x": true}], "d": {"e": null, "f": {"g": 1.5}}
        }));
        for flag in [true, false] {
            let delta = get_delta(&d, &d, &ignore(&["c", "d.f"]), flag);
            assert!(!delta.has_changes);
            assert_eq!(delta.modified, d);
        }
    }

    #[test]
    fn drift_with_ignored_key() {
        let recorded = obj(json!({"foo": "bar", "baz": "old"}));
        let actual = obj(json!({"foo": "bar", "baz": "new", "added": "x"}));

        let delta = get_delta(&recorded, &actual, &ignore(&["baz"]), false);

        assert!(delta.has_changes);
        assert_eq!(
            Value::Object(delta.modified),
            json!({"foo": "bar", "baz": "old", "added": "x"})
        );
    }

    #[test]
    fn null_in_declaration_equals_absent_on_server() {
        let recorded = obj(json!({"foo": "bar", "opt": null}));
        let actual = obj(json!({"foo": "bar"}));

        let delta = get_delta(&recorded, &actual, &[], false);

        assert!(!delta.has_changes);
        assert_eq!(Value::Object(delta.modified), json!({"foo": "bar", "opt": null}));
    }

    #[test]
    fn null_in_declaration_drifts_when_server_sets_value() {
        let recorded = obj(json!({"opt": null}));
        let actual = obj(json!({"opt": 5}));

        let delta = get_delta(&recorded, &actual, &[], false);

        assert!(delta.has_changes);
        assert_eq!(Value::Object(delta.modified), json!({"opt": 5}));
    }

    #[test]
    fn server_additions_can_be_ignored() {
        let recorded = obj(json!({"foo": "bar"}));
        let actual = obj(json!({"foo": "bar", "created_at": "now"}));

        let delta = get_delta(&recorded, &actual, &[], true);

        assert!(!delta.has_changes);
        assert_eq!(delta.modified, recorded);
    }

    #[test]
    fn nested_ignore_paths_descend() {
        let recorded = obj(json!({"outer": {"inner": 1, "kept": "a"}}));
        let actual = obj(json!({"outer": {"inner": 2, "kept": "a"}}));

        let ignored = get_delta(&recorded, &actual, &ignore(&["outer.inner"]), false);
        assert!(!ignored.has_changes);
        assert_eq!(ignored.modified, recorded);

        let unrelated = get_delta(&recorded, &actual, &ignore(&["other.inner"]), false);
        assert!(unrelated.has_changes);
        assert_eq!(
            Value::Object(unrelated.modified),
            json!({"outer": {"inner": 2, "kept": "a"}})
        );
    }

    #[test]
    fn nested_drift_keeps_unchanged_siblings() {
        let recorded = obj(json!({"outer": {"a": 1, "b": 2}, "top": "same"}));
        let actual = obj(json!({"outer": {"a": 1, "b": 3}, "top": "same"}));

        let delta = get_delta(&recorded, &actual, &[], false);

        assert!(delta.has_changes);
        assert_eq!(
            Value::Object(delta.modified),
            json!({"outer": {"a": 1, "b": 3}, "top": "same"})
        );
    }

    #[test]
    fn object_versus_scalar_is_drift() {
        let recorded = obj(json!({"x": {"a": 1}}));
        let actual = obj(json!({"x": "flat"}));

        let delta = get_delta(&recorded, &actual, &[], false);

        assert!(delta.has_changes);
        assert_eq!(Value::Object(delta.modified), json!({"x": "flat"}));
    }

    #[test]
    fn arrays_compare_whole() {
        let recorded = obj(json!({"tags": ["a", "b"]}));
        let reordered = obj(json!({"tags": ["b", "a"]}));

        let delta = get_delta(&recorded, &reordered, &[], false);

        assert!(delta.has_changes);
        assert_eq!(Value::Object(delta.modified), json!({"tags": ["b", "a"]}));
    }

    #[test]
    fn missing_server_value_is_drift() {
        let recorded = obj(json!({"name": "x"}));
        let actual = obj(json!({}));

        let delta = get_delta(&recorded, &actual, &[], false);

        assert!(delta.has_changes);
        assert_eq!(Value::Object(delta.modified), json!({"name": null}));
    }

    #[test]
    fn integer_and_float_forms_are_equal() {
        let recorded = obj(json!({"n": 1, "list": [2]}));
        let actual = obj(json!({"n": 1.0, "list": [2.0]}));

        assert!(!get_delta(&recorded, &actual, &[], false).has_changes);
    }

    #[test]
    fn applying_twice_is_stable() {
        let recorded = obj(json!({"a": 1, "b": {"c": "old"}}));
        let actual = obj(json!({"a": 1, "b": {"c": "new"}, "d": [1]}));

        let first = get_delta(&recorded, &actual, &[], false);
        let second = get_delta(&first.modified, &actual, &[], false);

        assert!(!second.has_changes);
        assert_eq!(second.modified, first.modified);
    }
}
