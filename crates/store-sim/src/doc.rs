//! In-memory JSON document with the remote store's path semantics: a node
//! is addressed by a slash-separated path, reads of absent nodes yield JSON
//! `null`, and a partial write shallow-merges an object into the addressed
//! node, creating intermediate objects on the way down.

use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::RwLock;

pub type SharedDoc = Arc<RwLock<Value>>;

pub fn new_doc() -> SharedDoc {
    Arc::new(RwLock::new(Value::Object(Map::new())))
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Resolve a path to the node it addresses. The empty path is the root.
pub fn get_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut cur = root;
    for seg in segments(path) {
        cur = cur.get(seg)?;
    }
    Some(cur)
}

/// Shallow-merge `update` into the object at `path`. Intermediate nodes are
/// created as objects; a non-object node in the way is replaced, matching
/// the store's overwrite-on-type-change behaviour.
pub fn patch_path(root: &mut Value, path: &str, update: &Map<String, Value>) {
    let mut cur = root;
    for seg in segments(path) {
        if !cur.is_object() {
            *cur = Value::Object(Map::new());
        }
        cur = cur
            .as_object_mut()
            .expect("node was just made an object")
            .entry(seg.to_string())
            .or_insert(Value::Null);
    }

    if !cur.is_object() {
        *cur = Value::Object(Map::new());
    }
    let target = cur.as_object_mut().expect("node was just made an object");
    for (k, v) in update {
        target.insert(k.clone(), v.clone());
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            other => panic!("expected object, got {other}"),
        }
    }

    // -- get_path -----------------------------------------------------------

    #[test]
    fn get_empty_path_is_root() {
        let root = json!({"a": 1});
        assert_eq!(get_path(&root, ""), Some(&root));
        assert_eq!(get_path(&root, "/"), Some(&root));
    }

    #[test]
    fn get_nested_path() {
        let root = json!({"esp32": {"metrics": {"soil_moisture": {"percent": 40}}}});
        assert_eq!(
            get_path(&root, "esp32/metrics/soil_moisture/percent"),
            Some(&json!(40))
        );
    }

    #[test]
    fn get_missing_path_is_none() {
        let root = json!({"esp32": {}});
        assert_eq!(get_path(&root, "esp32/metrics"), None);
        assert_eq!(get_path(&root, "other"), None);
    }

    #[test]
    fn get_through_scalar_is_none() {
        let root = json!({"a": 5});
        assert_eq!(get_path(&root, "a/b"), None);
    }

    // -- patch_path ---------------------------------------------------------

    #[test]
    fn patch_creates_intermediate_objects() {
        let mut root = json!({});
        patch_path(
            &mut root,
            "esp32/metrics/grow_light",
            &obj(json!({"commanded_on": true})),
        );
        assert_eq!(
            root,
            json!({"esp32": {"metrics": {"grow_light": {"commanded_on": true}}}})
        );
    }

    #[test]
    fn patch_is_shallow_merge_preserving_siblings() {
        let mut root = json!({"esp32": {"metrics": {
            "grow_light": {"commanded_on": true},
            "soil_moisture": {"percent": 40}
        }}});

        patch_path(
            &mut root,
            "esp32/metrics",
            &obj(json!({"soil_moisture": {"percent": 41, "status": "ok"}})),
        );

        // Sibling sub-document untouched, named child replaced wholesale.
        assert_eq!(
            root["esp32"]["metrics"]["grow_light"],
            json!({"commanded_on": true})
        );
        assert_eq!(
            root["esp32"]["metrics"]["soil_moisture"],
            json!({"percent": 41, "status": "ok"})
        );
    }

    #[test]
    fn patch_at_root() {
        let mut root = json!({"keep": 1});
        patch_path(&mut root, "", &obj(json!({"add": 2})));
        assert_eq!(root, json!({"keep": 1, "add": 2}));
    }

    #[test]
    fn patch_replaces_scalar_in_the_way() {
        let mut root = json!({"esp32": "oops"});
        patch_path(&mut root, "esp32/metrics", &obj(json!({"x": 1})));
        assert_eq!(root, json!({"esp32": {"metrics": {"x": 1}}}));
    }

    #[test]
    fn repeated_patches_accumulate() {
        let mut root = json!({});
        patch_path(&mut root, "m", &obj(json!({"a": 1})));
        patch_path(&mut root, "m", &obj(json!({"b": 2})));
        assert_eq!(root["m"], json!({"a": 1, "b": 2}));
    }
}
