//! Traversal over `serde_json::Value` containers.
//!
//! `get` descends and returns `None` on any absent segment. `set` descends
//! creating intermediate objects and arrays as needed. `enumerate_rows`
//! implements the repeated-group probe: rows added client-side have no
//! upper bound the server knows ahead of time, so the only way to learn
//! how many were submitted is to count contiguous indices.

use serde_json::Value;
use tracing::trace;

use crate::path::{Path, Segment};

/// Descend `container` along `path`. Returns `None` if any segment is absent.
pub fn get<'a>(container: &'a Value, path: &Path) -> Option<&'a Value> {
    let mut current = container;
    for segment in path.segments() {
        current = match (segment, current) {
            (Segment::Key(k), Value::Object(map)) => map.get(k)?,
            (Segment::Index(i), Value::Array(items)) => items.get(*i)?,
            // Form decoders sometimes materialize numeric keys as objects.
            (Segment::Index(i), Value::Object(map)) => map.get(&i.to_string())?,
            _ => return None,
        };
    }
    Some(current)
}

/// Mutable variant of [`get`].
pub fn get_mut<'a>(container: &'a mut Value, path: &Path) -> Option<&'a mut Value> {
    let mut current = container;
    for segment in path.segments() {
        current = match (segment, current) {
            (Segment::Key(k), Value::Object(map)) => map.get_mut(k)?,
            (Segment::Index(i), Value::Array(items)) => items.get_mut(*i)?,
            (Segment::Index(i), Value::Object(map)) => map.get_mut(&i.to_string())?,
            _ => return None,
        };
    }
    Some(current)
}

/// Assign `value` at `path`, creating missing intermediate containers.
///
/// Key segments create objects, index segments create arrays padded with
/// `Null` up to the index. An existing scalar in the way is replaced by
/// the container the next segment requires.
pub fn set(container: &mut Value, path: &Path, value: Value) {
    let mut current = container;
    let segments = path.segments();
    for (i, segment) in segments.iter().enumerate() {
        let last = i + 1 == segments.len();
        match segment {
            Segment::Key(k) => {
                if !current.is_object() {
                    *current = Value::Object(serde_json::Map::new());
                }
                let Value::Object(map) = current else { return };
                if last {
                    map.insert(k.clone(), value);
                    return;
                }
                current = map.entry(k.clone()).or_insert(Value::Null);
            }
            Segment::Index(idx) => {
                if !current.is_array() {
                    *current = Value::Array(Vec::new());
                }
                let Value::Array(items) = current else { return };
                while items.len() <= *idx {
                    items.push(Value::Null);
                }
                if last {
                    items[*idx] = value;
                    return;
                }
                current = &mut items[*idx];
            }
        }
    }
}

/// Whether a value is an empty placeholder slot introduced by a
/// client-side array-building widget.
fn is_placeholder(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Discover how many rows of a dynamically repeated group were submitted.
///
/// The path must carry a numeric marker segment (see
/// [`Path::marker_position`]); the marker is substituted with 0, 1, 2, …
/// and each sibling path is probed until the first index that resolves to
/// absent. Every successfully probed value is appended to the result.
///
/// As a side effect, any probed value that is an array is normalized in
/// place: empty placeholder slots are filtered out so downstream
/// validation sees clean per-row arrays.
///
/// Enumeration stops at the first gap. A row removed from the middle
/// leaves a real gap and later rows are dropped, not reordered.
pub fn enumerate_rows(container: &mut Value, path: &Path) -> Vec<Value> {
    let Some(marker) = path.marker_position() else {
        // No repetition marker: at most one occurrence.
        return get(container, path).cloned().into_iter().collect();
    };

    let mut rows = Vec::new();
    for index in 0.. {
        let sibling = path.with_index(marker, index);
        let Some(value) = get_mut(container, &sibling) else {
            break;
        };
        if let Value::Array(items) = value {
            items.retain(|item| !is_placeholder(item));
        }
        rows.push(value.clone());
    }
    trace!(path = %path, rows = rows.len(), "enumerated repeated group");
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(s: &str) -> Path {
        s.parse().unwrap()
    }

    #[test]
    fn get_descends_objects_and_arrays() {
        let container = json!({"item": [{"qty": 3}, {"qty": 5}]});
        assert_eq!(get(&container, &path("item:0:qty")), Some(&json!(3)));
        assert_eq!(get(&container, &path("item:1:qty")), Some(&json!(5)));
    }

    #[test]
    fn get_absent_segment_is_none() {
        let container = json!({"item": [{"qty": 3}]});
        assert_eq!(get(&container, &path("item:1:qty")), None);
        assert_eq!(get(&container, &path("missing")), None);
        assert_eq!(get(&container, &path("item:0:missing")), None);
    }

    #[test]
    fn get_numeric_key_into_object() {
        let container = json!({"item": {"0": {"qty": 7}}});
        assert_eq!(get(&container, &path("item:0:qty")), Some(&json!(7)));
    }

    #[test]
    fn set_creates_intermediates() {
        let mut container = Value::Null;
        set(&mut container, &path("a:b:c"), json!("deep"));
        assert_eq!(container, json!({"a": {"b": {"c": "deep"}}}));
    }

    #[test]
    fn set_pads_arrays_with_null() {
        let mut container = Value::Null;
        set(&mut container, &path("rows:2"), json!("x"));
        assert_eq!(container, json!({"rows": [null, null, "x"]}));
    }

    #[test]
    fn set_then_get_round_trips() {
        let mut container = Value::Null;
        set(&mut container, &path("item:1:qty"), json!(9));
        assert_eq!(get(&container, &path("item:1:qty")), Some(&json!(9)));
    }

    #[test]
    fn set_replaces_scalar_in_the_way() {
        let mut container = json!({"a": "scalar"});
        set(&mut container, &path("a:b"), json!(1));
        assert_eq!(container, json!({"a": {"b": 1}}));
    }

    #[test]
    fn enumerate_counts_contiguous_rows() {
        // Scenario D: rows at 0, 1, 2; row 3 absent.
        let mut container = json!({"item": [{"qty": 1}, {"qty": 2}, {"qty": 3}]});
        let rows = enumerate_rows(&mut container, &path("item:0:qty"));
        assert_eq!(rows, vec![json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn enumerate_counts_empty_rows() {
        // Termination depends only on presence, not content.
        let mut container = json!({"item": ["", "", ""]});
        let rows = enumerate_rows(&mut container, &path("item:0"));
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn enumeration_stops_at_gap_and_drops_later_rows() {
        // A middle row deleted client-side leaves indices 0 and 2. The
        // original behavior, preserved here, stops at the gap: row 2 is
        // silently dropped, never reordered into position 1.
        let mut container = json!({"item": {"0": {"qty": 1}, "2": {"qty": 3}}});
        let rows = enumerate_rows(&mut container, &path("item:0:qty"));
        assert_eq!(rows, vec![json!(1)]);
    }

    #[test]
    fn enumerate_filters_placeholder_slots() {
        let mut container = json!({"item": [["a", "", "b", null]]});
        let rows = enumerate_rows(&mut container, &path("item:0"));
        assert_eq!(rows, vec![json!(["a", "b"])]);
        // Container normalized in place.
        assert_eq!(container, json!({"item": [["a", "b"]]}));
    }

    #[test]
    fn enumerate_without_marker_returns_single_value() {
        let mut container = json!({"bio": "hello"});
        let rows = enumerate_rows(&mut container, &path("bio"));
        assert_eq!(rows, vec![json!("hello")]);

        let rows = enumerate_rows(&mut container, &path("absent"));
        assert!(rows.is_empty());
    }
}

#[cfg(test)]
mod properties {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn arb_segment() -> impl Strategy<Value = String> {
        prop_oneof![
            "[a-z]{1,6}".prop_map(|s| s),
            (0usize..5).prop_map(|i| i.to_string()),
        ]
    }

    fn arb_path() -> impl Strategy<Value = Path> {
        proptest::collection::vec(arb_segment(), 1..5)
            .prop_map(|segs| segs.join(":").parse::<Path>().unwrap())
    }

    proptest! {
        #[test]
        fn get_after_set_yields_value(path in arb_path(), n in any::<i64>()) {
            let mut container = Value::Null;
            set(&mut container, &path, json!(n));
            prop_assert_eq!(get(&container, &path), Some(&json!(n)));
        }

        #[test]
        fn enumeration_yields_row_count(count in 0usize..8) {
            let rows: Vec<_> = (0..count).map(|i| json!({ "qty": i })).collect();
            let mut container = json!({ "item": rows });
            let path: Path = "item:0:qty".parse().unwrap();
            let found = enumerate_rows(&mut container, &path);
            prop_assert_eq!(found.len(), count);
        }
    }
}
