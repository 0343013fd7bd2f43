//! Resource data bag handed to lifecycle callbacks
//!
//! Holds the prior state of a resource next to the values it should have now,
//! so callbacks can ask whether it is new and which attributes changed.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Missing, null and empty-map values are all "unset"
fn normalize(value: Option<&Value>) -> Option<&Value> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) if map.is_empty() => None,
        other => other,
    }
}

/// String form of a map entry. Numbers and bools are written out, anything
/// else has no string form.
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Whether two attribute values differ, treating every form of "unset" alike
pub(crate) fn values_differ(a: Option<&Value>, b: Option<&Value>) -> bool {
    normalize(a) != normalize(b)
}

#[derive(Debug, Clone, Default)]
pub struct ResourceData {
    id: String,
    is_new: bool,
    /// Values as last recorded in state
    prior: Map<String, Value>,
    /// Values the callback works with and writes back into
    values: Map<String, Value>,
}

impl ResourceData {
    /// Data for a resource about to be created
    pub fn new(planned: Map<String, Value>) -> Self {
        Self {
            id: String::new(),
            is_new: true,
            prior: Map::new(),
            values: planned,
        }
    }

    /// Data for refresh, delete or import: the current values are the prior state
    pub fn from_state(id: impl Into<String>, state: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            is_new: false,
            prior: state.clone(),
            values: state,
        }
    }

    /// Data for an in-place update from `prior` to `planned`
    pub fn for_update(
        id: impl Into<String>,
        prior: Map<String, Value>,
        planned: Map<String, Value>,
    ) -> Self {
        Self {
            id: id.into(),
            is_new: false,
            prior,
            values: planned,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Set the resource identity. An empty ID marks the resource as gone.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    pub fn is_new_resource(&self) -> bool {
        self.is_new
    }

    pub fn has_change(&self, key: &str) -> bool {
        values_differ(self.prior.get(key), self.values.get(key))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key).filter(|v| !v.is_null())
    }

    /// Non-empty string value
    pub fn get_string(&self, key: &str) -> Option<String> {
        match self.get(key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }

    /// Bool value; an explicit `false` counts as set
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// Non-empty map value
    pub fn get_map(&self, key: &str) -> Option<&Map<String, Value>> {
        match self.get(key) {
            Some(Value::Object(map)) if !map.is_empty() => Some(map),
            _ => None,
        }
    }

    /// Non-empty map value with every scalar entry as a string
    pub fn get_string_map(&self, key: &str) -> Option<BTreeMap<String, String>> {
        self.get_map(key).map(|map| {
            map.iter()
                .filter_map(|(k, v)| scalar_to_string(v).map(|s| (k.clone(), s)))
                .collect()
        })
    }

    /// Write a value; `None` clears the attribute
    pub fn set<V: Into<Value>>(&mut self, key: &str, value: Option<V>) {
        match value {
            Some(v) => {
                self.values.insert(key.to_string(), v.into());
            }
            None => {
                self.values.remove(key);
            }
        }
    }

    /// Write a string map, clearing the attribute when it is absent
    pub fn set_string_map(&mut self, key: &str, value: Option<&BTreeMap<String, String>>) {
        let value = value.map(|m| {
            m.iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect::<Map<String, Value>>()
        });
        self.set(key, value);
    }

    /// Current values, to be recorded as the new state
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn into_values(self) -> Map<String, Value> {
        self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_new_resource_flags() {
        let d = ResourceData::new(obj(json!({"name": "x"})));
        assert!(d.is_new_resource());
        assert_eq!(d.id(), "");
        assert!(d.has_change("name"));
        assert!(!d.has_change("secrets"));
    }

    #[test]
    fn test_has_change_treats_unset_forms_alike() {
        let d = ResourceData::for_update(
            "id-1",
            obj(json!({"secrets": {}, "code": null})),
            obj(json!({"name": "x"})),
        );
        assert!(!d.has_change("secrets"));
        assert!(!d.has_change("code"));
        assert!(d.has_change("name"));
    }

    #[test]
    fn test_getters_follow_get_ok() {
        let d = ResourceData::from_state(
            "id-1",
            obj(json!({"code": "", "enabled": false, "dependencies": {}, "name": "n"})),
        );
        assert_eq!(d.get_string("code"), None);
        assert_eq!(d.get_string("name").as_deref(), Some("n"));
        assert_eq!(d.get_bool("enabled"), Some(false));
        assert!(d.get_map("dependencies").is_none());
    }

    #[test]
    fn test_string_map_writes_out_scalars() {
        let d = ResourceData::new(obj(json!({"secrets": {"PIN": 1234, "DEBUG": true, "K": "v"}})));
        let secrets = d.get_string_map("secrets").unwrap();
        assert_eq!(secrets["PIN"], "1234");
        assert_eq!(secrets["DEBUG"], "true");
        assert_eq!(secrets["K"], "v");
        assert!(d.get_string_map("dependencies").is_none());
    }

    #[test]
    fn test_set_none_clears() {
        let mut d = ResourceData::from_state("id-1", obj(json!({"code": "x"})));
        d.set::<String>("code", None);
        assert!(d.get("code").is_none());
        assert!(d.has_change("code"));
    }
}
