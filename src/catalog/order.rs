//! Key ordering of merged catalogs

use serde_json::{Map, Value};

/// Reorder `target` so its keys follow `source` order at every level.
///
/// Keys only present in the target keep their relative order and come after
/// the source-ordered ones. Values are never changed.
pub fn order_like_source(source: &Value, target: Value) -> Value {
    match (source, target) {
        (Value::Object(source_map), Value::Object(mut target_map)) => {
            let mut ordered = Map::with_capacity(target_map.len());

            for (key, source_child) in source_map {
                if let Some(child) = target_map.shift_remove(key) {
                    ordered.insert(key.clone(), order_like_source(source_child, child));
                }
            }
            ordered.extend(target_map);

            Value::Object(ordered)
        }
        (_, target) => target,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys(value: &Value) -> Vec<&str> {
        value.as_object().unwrap().keys().map(String::as_str).collect()
    }

    #[test]
    fn test_order_like_source_nested() {
        let source = json!({"a": "x", "b": {"c": "y", "d": "z"}, "e": "w"});
        let target = json!({"b": {"d": "D", "c": "C", "x": "X"}, "a": "A", "f": "F", "e": "E"});

        let ordered = order_like_source(&source, target);

        assert_eq!(keys(&ordered), vec!["a", "b", "e", "f"]);
        assert_eq!(keys(&ordered["b"]), vec!["c", "d", "x"]);
        assert_eq!(ordered["b"]["x"], "X");
        assert_eq!(ordered["f"], "F");
    }

    #[test]
    fn test_order_like_source_flat() {
        let source = json!({"a": "x", "b": "y", "c": "z"});
        let target = json!({"b": "B", "a": "A", "d": "D", "e": "E"});

        let ordered = order_like_source(&source, target);
        assert_eq!(keys(&ordered), vec!["a", "b", "d", "e"]);
    }

    #[test]
    fn test_type_mismatch_keeps_target() {
        let source = json!({"a": {"b": "x"}});
        let target = json!({"a": "flat"});
        assert_eq!(order_like_source(&source, target), json!({"a": "flat"}));
    }
}
