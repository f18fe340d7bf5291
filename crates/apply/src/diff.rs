//! Merge-style differences between two JSON values.

use serde_json::{Map, Value as Json};

/// JSON merge patch turning `before` into `after`.
///
/// Changed keys carry the new value, removed keys carry `null`, nested objects
/// recurse and arrays are replaced wholesale. Equal inputs give `{}`.
pub fn merge_diff(before: &Json, after: &Json) -> Json {
    match (before, after) {
        (Json::Object(bo), Json::Object(ao)) => {
            let mut out = Map::new();
            for (k, av) in ao.iter() {
                match bo.get(k) {
                    Some(bv) if bv == av => continue,
                    Some(bv) => {
                        out.insert(k.clone(), merge_diff(bv, av));
                    }
                    None => {
                        out.insert(k.clone(), av.clone());
                    }
                }
            }
            for k in bo.keys() {
                if !ao.contains_key(k) {
                    out.insert(k.clone(), Json::Null);
                }
            }
            Json::Object(out)
        }
        (_, av) => av.clone(),
    }
}

pub fn is_empty_patch(patch: &Json) -> bool {
    matches!(patch, Json::Object(m) if m.is_empty())
}

/// Status-subresource merge patch between two object snapshots, `None` when
/// their statuses are equivalent.
pub fn status_patch(before: &Json, after: &Json) -> Option<Json> {
    let b = before.get("status").unwrap_or(&Json::Null);
    let a = after.get("status").unwrap_or(&Json::Null);
    if a == b {
        return None;
    }
    let diff = merge_diff(b, a);
    if is_empty_patch(&diff) {
        return None;
    }
    let mut root = Map::new();
    root.insert("status".into(), diff);
    Some(Json::Object(root))
}
