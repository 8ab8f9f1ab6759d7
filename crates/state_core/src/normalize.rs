use serde_json::{Map, Value};

/// Replace every "absent" leaf (`Null` as an object entry's value) with an
/// empty mapping, recursively.
///
/// Remote-entity payloads often mark a nested entity as "exists, no detail
/// fetched yet" with an explicit null; merging such a payload as-is would
/// wipe previously-fetched detail. Normalizing first makes the payload safe
/// to [`deep_merge`] into the state tree.
///
/// Idempotent, and never removes a key. Nulls inside arrays are kept: only
/// mapping entries carry the absent marker.
pub fn normalize_sparse(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let normalized = map
                .into_iter()
                .map(|(key, child)| {
                    let child = match child {
                        Value::Null => Value::Object(Map::new()),
                        other => normalize_sparse(other),
                    };
                    (key, child)
                })
                .collect();
            Value::Object(normalized)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_sparse).collect()),
        other => other,
    }
}

/// Recursively merge `incoming` into `base`: objects merge key-by-key, any
/// other incoming value replaces the base value. A normalized incoming tree
/// therefore never deletes sibling keys it does not mention.
pub fn deep_merge(base: Value, incoming: Value) -> Value {
    match (base, incoming) {
        (Value::Object(mut base_map), Value::Object(incoming_map)) => {
            for (key, incoming_child) in incoming_map {
                let merged = match base_map.remove(&key) {
                    Some(base_child) => deep_merge(base_child, incoming_child),
                    None => incoming_child,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, incoming) => incoming,
    }
}
