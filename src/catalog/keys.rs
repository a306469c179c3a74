//! Flat key mapping for message catalogs
//!
//! Nested catalogs are reduced to an ordered mapping of dotted paths to
//! leaves, and restored from it. Traversal is depth-first in document order,
//! so the same catalog always produces the same key order.
//!
//! Non-string leaves (numbers, booleans, null, empty objects and arrays) are
//! carried through as [`Leaf::Verbatim`] and never translated. Arrays are
//! enumerated with numeric path segments (`items.0`, `items.1`).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::CatalogError;

/// Separator joining path segments of a flat key
pub const SEPARATOR: char = '.';

/// Leaf of a flattened catalog
#[derive(Debug, Clone, PartialEq)]
pub enum Leaf {
    /// Translatable message
    Text(String),

    /// Passed through unmodified, excluded from translation
    Verbatim(Value),
}

impl Leaf {
    /// Message text, if this leaf is translatable
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Verbatim(_) => None,
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Self::Text(text) => Value::String(text.clone()),
            Self::Verbatim(value) => value.clone(),
        }
    }
}

/// Ordered mapping of flat keys to leaves
pub type FlatMap = IndexMap<String, Leaf>;

/// On-disk layout of a catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Structure {
    /// Nested objects, keys are split on [`SEPARATOR`]
    Nested,

    /// Single-level object, keys are used as-is
    Flat,
}

impl std::fmt::Display for Structure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nested => f.write_str("nested"),
            Self::Flat => f.write_str("flat"),
        }
    }
}

/// Detect the layout of a catalog: nested when any top-level value is an
/// object or an array
pub fn detect_structure(tree: &Value) -> Structure {
    match tree {
        Value::Object(map) if map.values().any(|v| v.is_object() || v.is_array()) => Structure::Nested,
        _ => Structure::Flat,
    }
}

/// Resolve a requested layout against the detected one.
///
/// A request that contradicts the catalog is ignored with a warning.
pub fn resolve_structure(requested: Option<Structure>, tree: &Value) -> Structure {
    let detected = detect_structure(tree);
    match requested {
        Some(requested) if requested != detected => {
            tracing::warn!(
                requested = %requested,
                detected = %detected,
                "Requested catalog structure ignored; using detected structure"
            );
            detected
        }
        _ => detected,
    }
}

/// Flatten a catalog tree into an ordered flat mapping
pub fn flatten(tree: &Value, structure: Structure) -> Result<FlatMap, CatalogError> {
    let root = tree.as_object().ok_or(CatalogError::NotAnObject {
        found: json_kind(tree),
    })?;

    let mut out = FlatMap::with_capacity(root.len());
    match structure {
        Structure::Flat => {
            for (key, value) in root {
                let leaf = match value {
                    Value::String(text) => Leaf::Text(text.clone()),
                    other => Leaf::Verbatim(other.clone()),
                };
                out.insert(key.clone(), leaf);
            }
        }
        Structure::Nested => {
            for (key, value) in root {
                check_segment(key, key)?;
                flatten_into(value, key.clone(), &mut out)?;
            }
        }
    }
    Ok(out)
}

fn flatten_into(value: &Value, path: String, out: &mut FlatMap) -> Result<(), CatalogError> {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                let child_path = join(&path, key);
                check_segment(key, &child_path)?;
                flatten_into(child, child_path, out)?;
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (index, child) in items.iter().enumerate() {
                flatten_into(child, join(&path, &index.to_string()), out)?;
            }
        }
        Value::String(text) => {
            out.insert(path, Leaf::Text(text.clone()));
        }
        other => {
            out.insert(path, Leaf::Verbatim(other.clone()));
        }
    }
    Ok(())
}

fn check_segment(segment: &str, key: &str) -> Result<(), CatalogError> {
    if segment.contains(SEPARATOR) {
        return Err(CatalogError::SeparatorInKey {
            key: key.to_string(),
            segment: segment.to_string(),
        });
    }
    Ok(())
}

fn join(prefix: &str, segment: &str) -> String {
    format!("{prefix}{SEPARATOR}{segment}")
}

/// Restore a tree from a flat mapping, creating intermediate objects as needed
pub fn unflatten(flat: &FlatMap, structure: Structure) -> Result<Value, CatalogError> {
    let mut root = Map::new();

    for (key, leaf) in flat {
        match structure {
            Structure::Flat => {
                root.insert(key.clone(), leaf.to_value());
            }
            Structure::Nested => {
                let segments: Vec<&str> = key.split(SEPARATOR).collect();
                insert_path(&mut root, &segments, leaf.to_value(), key)?;
            }
        }
    }

    Ok(Value::Object(root))
}

/// Restore a tree like [`unflatten`], turning index-keyed objects back into
/// arrays wherever one of the `shapes` holds an array at the same path.
///
/// Shapes are consulted in order; the first one that resolves the path wins.
/// Elements keep their index; a missing index is [`CatalogError::ArrayGap`].
pub fn unflatten_with_shape(
    flat: &FlatMap,
    structure: Structure,
    shapes: &[&Value],
) -> Result<Value, CatalogError> {
    let mut tree = unflatten(flat, structure)?;
    if structure == Structure::Nested {
        let mut path = Vec::new();
        restore_arrays(&mut tree, &mut path, shapes)?;
    }
    Ok(tree)
}

/// Whether `key` sits in an array element whose earlier siblings are absent
/// from `flat`, so the array could not be restored without a hole.
pub fn leaves_array_gap(flat: &FlatMap, key: &str, shapes: &[&Value]) -> bool {
    let mut path: Vec<String> = Vec::new();
    for segment in key.split(SEPARATOR) {
        if !path.is_empty() && shape_is_array(shapes, &path) {
            if let Ok(index) = segment.parse::<usize>() {
                let prefix = path.join(&SEPARATOR.to_string());
                if (0..index).any(|i| !has_element(flat, &join(&prefix, &i.to_string()))) {
                    return true;
                }
            }
        }
        path.push(segment.to_string());
    }
    false
}

fn has_element(flat: &FlatMap, element: &str) -> bool {
    flat.contains_key(element)
        || flat
            .keys()
            .any(|k| k.strip_prefix(element).is_some_and(|rest| rest.starts_with(SEPARATOR)))
}

fn insert_path(
    root: &mut Map<String, Value>,
    segments: &[&str],
    value: Value,
    key: &str,
) -> Result<(), CatalogError> {
    let Some((last, parents)) = segments.split_last() else {
        return Ok(());
    };

    let mut current = root;
    for (depth, segment) in parents.iter().enumerate() {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        current = match entry {
            Value::Object(map) => map,
            _ => {
                return Err(CatalogError::KeyConflict {
                    key: key.to_string(),
                    path: segments[..=depth].join(&SEPARATOR.to_string()),
                })
            }
        };
    }

    match current.get(*last) {
        None => {
            current.insert(last.to_string(), value);
            Ok(())
        }
        // An empty verbatim object merges into a subtree that already exists
        Some(Value::Object(_)) if matches!(&value, Value::Object(m) if m.is_empty()) => Ok(()),
        Some(_) => Err(CatalogError::KeyConflict {
            key: key.to_string(),
            path: key.to_string(),
        }),
    }
}

fn restore_arrays(value: &mut Value, path: &mut Vec<String>, shapes: &[&Value]) -> Result<(), CatalogError> {
    let replacement = match value {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                path.push(key.clone());
                let restored = restore_arrays(child, path, shapes);
                path.pop();
                restored?;
            }

            if !path.is_empty() && shape_is_array(shapes, path) {
                match into_indexed(std::mem::take(map)) {
                    Indexed::Array(items) => Some(items),
                    Indexed::NotIndexed(original) => {
                        *map = original;
                        None
                    }
                    Indexed::Gap(index) => {
                        return Err(CatalogError::ArrayGap {
                            path: path.join(&SEPARATOR.to_string()),
                            index,
                        })
                    }
                }
            } else {
                None
            }
        }
        _ => None,
    };

    if let Some(items) = replacement {
        *value = Value::Array(items);
    }
    Ok(())
}

fn shape_is_array(shapes: &[&Value], path: &[String]) -> bool {
    shapes
        .iter()
        .find_map(|shape| lookup(shape, path))
        .is_some_and(Value::is_array)
}

fn lookup<'v>(tree: &'v Value, path: &[String]) -> Option<&'v Value> {
    path.iter().try_fold(tree, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

enum Indexed {
    Array(Vec<Value>),
    NotIndexed(Map<String, Value>),
    /// First index with no element
    Gap(usize),
}

fn into_indexed(map: Map<String, Value>) -> Indexed {
    if !map.keys().all(|k| k.parse::<usize>().is_ok()) {
        return Indexed::NotIndexed(map);
    }

    let mut slots: Vec<Option<Value>> = vec![None; map.len()];
    for (key, value) in map {
        match key.parse::<usize>() {
            Ok(index) if index < slots.len() => slots[index] = Some(value),
            // An index at or past the key count implies a lower one is missing
            _ => {}
        }
    }

    match slots.iter().position(Option::is_none) {
        Some(index) => Indexed::Gap(index),
        None => Indexed::Array(slots.into_iter().flatten().collect()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
