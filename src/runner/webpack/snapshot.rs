//! Loading a registry from a JSON snapshot.
//!
//! A snapshot is an array of `{ "id": 12 | "name", "exports": ..., "source"?: "..." }`.
//! Export values map onto the object model as follows:
//!
//! * JSON scalars, arrays and objects become the matching values;
//! * `{ "$fn": "<source>", "props"?: {..}, "prototype"?: {..} }` becomes a
//!   no-op function whose `toString()` is `<source>`;
//! * `{ "$host": "window" | "document" | "domTokenList" }` becomes a host
//!   global;
//! * `{ "$typedArray": [bytes] }` becomes a typed array.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::runner::ds::array_object::new_array;
use crate::runner::ds::error::ShimError;
use crate::runner::ds::function_object::{new_class, new_function_with_source};
use crate::runner::ds::object::{new_host_object, new_object, new_typed_array, HostKind};
use crate::runner::ds::object_property::PropertyDescriptor;
use crate::runner::ds::operations::object::define_property;
use crate::runner::ds::value::{JsObjectType, JsValue};
use crate::runner::webpack::registry::{ModuleId, ModuleRegistry};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SnapshotId {
    Num(u64),
    Str(String),
}

#[derive(Debug, Deserialize)]
struct SnapshotEntry {
    id: SnapshotId,
    #[serde(default)]
    exports: Value,
    #[serde(default)]
    source: Option<String>,
}

impl From<SnapshotId> for ModuleId {
    fn from(id: SnapshotId) -> Self {
        match id {
            SnapshotId::Num(n) => ModuleId::Num(n),
            SnapshotId::Str(s) => ModuleId::Str(s),
        }
    }
}

impl ModuleRegistry {
    /// Registers every module of `json`, in order. Returns how many were
    /// added.
    pub fn load_snapshot(&self, json: &str) -> Result<usize, ShimError> {
        let entries: Vec<SnapshotEntry> = serde_json::from_str(json)?;
        let count = entries.len();
        for entry in entries {
            let exports = to_js_value(&entry.exports)?;
            match entry.source {
                Some(source) => self.register_with_source(ModuleId::from(entry.id), exports, source),
                None => self.register(ModuleId::from(entry.id), exports),
            };
        }
        Ok(count)
    }

    pub fn load_snapshot_file(&self, path: &Path) -> Result<usize, ShimError> {
        let text = fs::read_to_string(path)?;
        self.load_snapshot(&text)
    }
}

pub fn to_js_value(value: &Value) -> Result<JsValue, ShimError> {
    Ok(match value {
        Value::Null => JsValue::Null,
        Value::Bool(b) => JsValue::from(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => JsValue::from(i),
            None => JsValue::from(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => JsValue::from(s.as_str()),
        Value::Array(items) => {
            let elements = items.iter().map(to_js_value).collect::<Result<Vec<_>, _>>()?;
            JsValue::Object(new_array(elements))
        }
        Value::Object(map) => JsValue::Object(object_from_map(map)?),
    })
}

fn object_from_map(map: &Map<String, Value>) -> Result<JsObjectType, ShimError> {
    if let Some(source) = map.get("$fn") {
        return function_from_map(source, map);
    }
    if let Some(kind) = map.get("$host") {
        let kind = match kind.as_str() {
            Some("window") => HostKind::Window,
            Some("document") => HostKind::Document,
            Some("domTokenList") => HostKind::DomTokenList,
            Some("symbol") => HostKind::Symbol,
            _ => return Err(ShimError::Snapshot(format!("unknown host kind {}", kind))),
        };
        return Ok(new_host_object(kind));
    }
    if let Some(bytes) = map.get("$typedArray") {
        let bytes: Vec<u8> = serde_json::from_value(bytes.clone())?;
        return Ok(new_typed_array(bytes));
    }
    let o = new_object();
    copy_properties(&o, map)?;
    Ok(o)
}

fn function_from_map(source: &Value, map: &Map<String, Value>) -> Result<JsObjectType, ShimError> {
    let source = source
        .as_str()
        .ok_or_else(|| ShimError::Snapshot("\"$fn\" must be a string".to_string()))?;
    let name = map.get("name").and_then(Value::as_str).unwrap_or("");
    let f = match map.get("prototype") {
        Some(Value::Object(proto)) => new_class(name, source, object_from_map(proto)?),
        Some(_) => {
            return Err(ShimError::Snapshot(
                "\"prototype\" must be an object".to_string(),
            ))
        }
        None => new_function_with_source(name, source, |_, _| Ok(JsValue::Undefined)),
    };
    match map.get("props") {
        Some(Value::Object(props)) => copy_properties(&f, props)?,
        Some(_) => return Err(ShimError::Snapshot("\"props\" must be an object".to_string())),
        None => {}
    }
    Ok(f)
}

fn copy_properties(o: &JsObjectType, map: &Map<String, Value>) -> Result<(), ShimError> {
    for (key, value) in map {
        define_property(o, key, PropertyDescriptor::new_data(to_js_value(value)?));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ds::function_object::function_to_string;
    use crate::runner::ds::operations::object::get_v;

    #[test]
    fn test_load_snapshot() {
        let registry = ModuleRegistry::new();
        let n = registry
            .load_snapshot(
                r#"[
                    {"id": 1, "exports": {"a": 1, "b": [1, 2]}},
                    {"id": "x", "exports": {"$fn": "function f(){return 1}", "props": {"displayName": "F"}}, "source": "n.d(t)"},
                    {"id": 3, "exports": {"$host": "window"}}
                ]"#,
            )
            .unwrap();
        assert_eq!(n, 3);
        let f = registry.get(&ModuleId::parse("x")).unwrap();
        assert_eq!(f.source.as_deref(), Some("n.d(t)"));
        assert_eq!(
            function_to_string(f.exports.as_object().unwrap()).unwrap(),
            "function f(){return 1}"
        );
        assert_eq!(get_v(&f.exports, "displayName").unwrap(), JsValue::from("F"));
    }

    #[test]
    fn test_bad_host_kind() {
        let registry = ModuleRegistry::new();
        assert!(registry
            .load_snapshot(r#"[{"id": 1, "exports": {"$host": "nope"}}]"#)
            .is_err());
    }
}
