//! Resource schema declaration
//!
//! A schema lists the attributes of a resource, their types and flags. The
//! lifecycle driver uses it to validate configuration before any API call and
//! to decide whether a change can be applied in place.

use super::data::{scalar_to_string, values_differ};
use super::validation::Validator;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Attribute type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Bool,
    /// Map of string keys to string values
    StringMap,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::String => f.write_str("string"),
            FieldType::Bool => f.write_str("bool"),
            FieldType::StringMap => f.write_str("map of string"),
        }
    }
}

/// Attribute declaration
#[derive(Debug, Clone)]
pub struct FieldSchema {
    pub field_type: FieldType,
    pub required: bool,
    pub optional: bool,
    /// Value may be filled in by the API when not configured
    pub computed: bool,
    /// Changing the value requires replacing the resource
    pub force_new: bool,
    /// Value is never shown in plan output
    pub sensitive: bool,
    pub validators: Vec<Validator>,
    pub description: &'static str,
}

impl FieldSchema {
    fn of(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
            optional: false,
            computed: false,
            force_new: false,
            sensitive: false,
            validators: Vec::new(),
            description: "",
        }
    }

    pub fn string() -> Self {
        Self::of(FieldType::String)
    }

    pub fn bool() -> Self {
        Self::of(FieldType::Bool)
    }

    pub fn string_map() -> Self {
        Self::of(FieldType::StringMap)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn validate(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Whether the attribute may appear in configuration at all
    fn configurable(&self) -> bool {
        self.required || self.optional
    }
}

/// Problem found while validating configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub attribute: Option<String>,
    pub summary: String,
}

impl Diagnostic {
    pub fn attribute(attribute: &str, summary: impl Into<String>) -> Self {
        Self {
            attribute: Some(attribute.to_string()),
            summary: summary.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.attribute {
            Some(attr) => write!(f, "{}: {}", attr, self.summary),
            None => f.write_str(&self.summary),
        }
    }
}

/// Attributes of one resource type
#[derive(Debug, Clone, Default)]
pub struct ResourceSchema {
    pub fields: BTreeMap<&'static str, FieldSchema>,
}

impl ResourceSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &'static str, field: FieldSchema) -> Self {
        self.fields.insert(name, field);
        self
    }

    /// Validate configuration values, returning every problem found
    pub fn validate_config(&self, config: &Map<String, Value>) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        for key in config.keys() {
            match self.fields.get(key.as_str()) {
                None => diagnostics.push(Diagnostic::attribute(
                    key,
                    "An argument with this name is not expected here",
                )),
                Some(field) if !field.configurable() => diagnostics.push(Diagnostic::attribute(
                    key,
                    "Value is computed and cannot be configured",
                )),
                Some(_) => {}
            }
        }

        for (name, field) in &self.fields {
            let value = config.get(*name).filter(|v| !v.is_null());

            let Some(value) = value else {
                if field.required {
                    diagnostics.push(Diagnostic::attribute(
                        name,
                        "The argument is required, but no definition was found",
                    ));
                }
                continue;
            };

            if let Err(summary) = check_type(field.field_type, value) {
                diagnostics.push(Diagnostic::attribute(name, summary));
                continue;
            }

            if let Value::String(s) = value {
                for validator in &field.validators {
                    if let Err(summary) = validator.validate(name, s) {
                        diagnostics.push(Diagnostic::attribute(name, summary));
                    }
                }
            }
        }

        diagnostics
    }

    /// Values the resource should end up with: configured attributes, plus prior
    /// values of computed attributes left out of the configuration
    pub fn planned_values(
        &self,
        prior: Option<&Map<String, Value>>,
        config: &Map<String, Value>,
    ) -> Map<String, Value> {
        let mut planned = Map::new();

        for (name, field) in &self.fields {
            match config.get(*name).filter(|v| !v.is_null()) {
                Some(value) => {
                    planned.insert(name.to_string(), planned_value(field.field_type, value));
                }
                None if field.computed => {
                    if let Some(value) = prior.and_then(|p| p.get(*name)) {
                        planned.insert(name.to_string(), value.clone());
                    }
                }
                None => {}
            }
        }

        planned
    }

    /// Attributes that differ between `prior` and `planned`
    pub fn changed_fields(
        &self,
        prior: &Map<String, Value>,
        planned: &Map<String, Value>,
    ) -> Vec<&'static str> {
        self.fields
            .keys()
            .copied()
            .filter(|name| values_differ(prior.get(*name), planned.get(*name)))
            .collect()
    }

    /// Changed attributes that force the resource to be replaced
    pub fn force_new_changes(
        &self,
        prior: &Map<String, Value>,
        planned: &Map<String, Value>,
    ) -> Vec<&'static str> {
        self.changed_fields(prior, planned)
            .into_iter()
            .filter(|name| self.fields.get(name).is_some_and(|f| f.force_new))
            .collect()
    }
}

/// Map entries are stored as strings, the form the API reports them back in
fn planned_value(field_type: FieldType, value: &Value) -> Value {
    match (field_type, value) {
        (FieldType::StringMap, Value::Object(map)) => Value::Object(
            map.iter()
                .filter_map(|(k, v)| scalar_to_string(v).map(|s| (k.clone(), Value::String(s))))
                .collect(),
        ),
        _ => value.clone(),
    }
}

fn check_type(field_type: FieldType, value: &Value) -> Result<(), String> {
    let ok = match field_type {
        FieldType::String => value.is_string(),
        FieldType::Bool => value.is_boolean(),
        FieldType::StringMap => match value {
            Value::Object(map) => map
                .values()
                .all(|v| v.is_string() || v.is_number() || v.is_boolean()),
            _ => false,
        },
    };

    if ok {
        Ok(())
    } else {
        Err(format!("Inappropriate value: {} required", field_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::validation::string_in_slice;
    use serde_json::json;

    fn schema() -> ResourceSchema {
        ResourceSchema::new()
            .field("name", FieldSchema::string().required())
            .field(
                "kind",
                FieldSchema::string()
                    .required()
                    .force_new()
                    .validate(string_in_slice(&["a", "b"], false)),
            )
            .field("enabled", FieldSchema::bool().optional().computed())
            .field("labels", FieldSchema::string_map().optional())
            .field("created_at", FieldSchema::string().computed())
    }

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_valid_config_has_no_diagnostics() {
        let config = obj(json!({"name": "x", "kind": "a", "labels": {"k": "v"}}));
        assert!(schema().validate_config(&config).is_empty());
    }

    #[test]
    fn test_missing_required_and_unknown_attributes() {
        let config = obj(json!({"kind": "a", "colour": "blue", "created_at": "now"}));
        let diags = schema().validate_config(&config);
        let attrs: Vec<_> = diags.iter().filter_map(|d| d.attribute.clone()).collect();
        assert_eq!(diags.len(), 3);
        assert!(attrs.contains(&"name".to_string()));
        assert!(attrs.contains(&"colour".to_string()));
        assert!(attrs.contains(&"created_at".to_string()));
    }

    #[test]
    fn test_type_mismatch_and_validator() {
        let config = obj(json!({"name": 3, "kind": "c", "labels": {"k": {"nested": true}}}));
        let diags = schema().validate_config(&config);
        assert_eq!(diags.len(), 3);
        assert!(diags[0].to_string().starts_with("kind: expected kind to be one of"));
    }

    #[test]
    fn test_planned_values_keep_computed_prior() {
        let prior = obj(json!({"name": "x", "kind": "a", "enabled": true, "created_at": "t0"}));
        let config = obj(json!({"name": "y", "kind": "a"}));
        let planned = schema().planned_values(Some(&prior), &config);
        assert_eq!(planned.get("enabled"), Some(&json!(true)));
        assert_eq!(planned.get("created_at"), Some(&json!("t0")));
        assert_eq!(planned.get("name"), Some(&json!("y")));
    }

    #[test]
    fn test_planned_values_write_map_scalars_as_strings() {
        let config = obj(json!({"name": "x", "kind": "a", "labels": {"port": 8080, "debug": false}}));
        assert!(schema().validate_config(&config).is_empty());

        let planned = schema().planned_values(None, &config);
        assert_eq!(planned["labels"], json!({"port": "8080", "debug": "false"}));

        let prior = obj(json!({"name": "x", "kind": "a", "labels": {"port": "8080", "debug": "false"}}));
        assert!(schema().changed_fields(&prior, &planned).is_empty());
    }

    #[test]
    fn test_force_new_changes() {
        let s = schema();
        let prior = obj(json!({"name": "x", "kind": "a"}));
        let rename = obj(json!({"name": "y", "kind": "a"}));
        let rekind = obj(json!({"name": "x", "kind": "b"}));

        assert_eq!(s.changed_fields(&prior, &rename), vec!["name"]);
        assert!(s.force_new_changes(&prior, &rename).is_empty());
        assert_eq!(s.force_new_changes(&prior, &rekind), vec!["kind"]);
    }
}
