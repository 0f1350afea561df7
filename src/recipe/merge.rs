//! Base/override document merging
//!
//! Override documents are deep-merged over the base at the JSON-value
//! level before parsing: mappings merge key-wise, everything else —
//! scalars and lists alike — is replaced wholesale by the override.

use serde_json::Value;

/// Merge `overlay` into `base` in place.
///
/// Lists are replaced, not concatenated or index-merged: an override that
/// touches a list owns the whole list.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => {
                        base_map.insert(key, overlay_value);
                    }
                }
            }
        }
        (base_slot, overlay_value) => *base_slot = overlay_value,
    }
}
