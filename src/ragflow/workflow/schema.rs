// SPDX-License-Identifier: MIT

//! Schema contracts for values crossing step boundaries
//!
//! A `SchemaContract` describes the fields an object must (or may) carry.
//! Validation is non-strict: fields the contract does not mention are
//! tolerated. Every violation found is reported, not just the first one.

use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Field descriptors keyed by field name
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(transparent)]
pub struct SchemaContract {
    pub fields: BTreeMap<String, FieldDef>,
}

/// Definition of a single field
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct FieldDef {
    #[serde(flatten)]
    pub field_type: FieldType,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_required() -> bool {
    true
}

/// Supported field types
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Array { items: Box<FieldType> },
    Object { fields: SchemaContract },
}

/// One offending location in a validated value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Dotted path to the field, `$` for the value itself
    pub path: String,
    pub expected: String,
    pub actual: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: expected {}, found {}",
            self.path, self.expected, self.actual
        )
    }
}

/// All violations found while checking a value against a contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl ValidationError {
    /// Paths of every offending field, in contract order
    pub fn paths(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.path.as_str()).collect()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.violations.iter().map(|v| v.to_string()).collect();
        write!(f, "{}", rendered.join("; "))
    }
}

impl std::error::Error for ValidationError {}

impl SchemaContract {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a field
    pub fn field(mut self, name: impl Into<String>, def: FieldDef) -> Self {
        self.fields.insert(name.into(), def);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldDef> {
        self.fields.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Derive a contract from a Rust type's JSON Schema
    pub fn for_type<T: JsonSchema>() -> Result<Self, String> {
        let generator = SchemaSettings::draft07()
            .with(|settings| {
                settings.inline_subschemas = true;
                settings.option_add_null_type = false;
            })
            .into_generator();
        let root = generator.into_root_schema_for::<T>();
        let schema = serde_json::to_value(root).map_err(|e| e.to_string())?;
        Self::from_json_schema(&schema)
    }

    /// Check `value` against the contract, returning it unchanged on success
    pub fn validate<'a>(&self, value: &'a Value) -> Result<&'a Value, ValidationError> {
        let mut violations = Vec::new();
        self.check_object("", value, &mut violations);

        if violations.is_empty() {
            Ok(value)
        } else {
            Err(ValidationError { violations })
        }
    }

    fn check_object(&self, prefix: &str, value: &Value, out: &mut Vec<Violation>) {
        let Value::Object(map) = value else {
            out.push(Violation {
                path: if prefix.is_empty() { "$" } else { prefix }.to_string(),
                expected: "object".to_string(),
                actual: json_type_name(value).to_string(),
            });
            return;
        };

        for (name, def) in &self.fields {
            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{}.{}", prefix, name)
            };

            match map.get(name) {
                // Absent and null are the same thing for an optional field
                None | Some(Value::Null) if !def.required => {}
                None => out.push(Violation {
                    path,
                    expected: def.field_type.name().to_string(),
                    actual: "missing".to_string(),
                }),
                Some(v) => check_value(&def.field_type, &path, v, out),
            }
        }
    }

    /// Structural check that values satisfying `producer` also satisfy `self`
    pub fn check_compatible(&self, producer: &SchemaContract) -> Result<(), String> {
        for (name, wanted) in &self.fields {
            match producer.fields.get(name) {
                None if wanted.required => {
                    return Err(format!("field '{}' is required but never produced", name));
                }
                None => {}
                Some(given) => {
                    if wanted.required && !given.required {
                        return Err(format!(
                            "field '{}' is required but only optionally produced",
                            name
                        ));
                    }
                    wanted
                        .field_type
                        .accepts(&given.field_type)
                        .map_err(|reason| format!("field '{}': {}", name, reason))?;
                }
            }
        }
        Ok(())
    }

    /// Render as a JSON Schema object
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for (name, def) in &self.fields {
            let mut property = def.field_type.to_json_schema();
            if let Some(description) = &def.description {
                property["description"] = json!(description);
            }
            properties.insert(name.clone(), property);
            if def.required {
                required.push(name.clone());
            }
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required
        })
    }

    /// Build a contract from the subset of JSON Schema this crate understands
    ///
    /// `properties`, `required`, `type` (`integer` is treated as `number`),
    /// `items` and `description` are read; everything else is ignored.
    pub fn from_json_schema(schema: &Value) -> Result<Self, String> {
        let required: HashSet<&str> = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let mut contract = SchemaContract::new();
        let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
            return Ok(contract);
        };

        for (name, property) in properties {
            let field_type = FieldType::from_json_schema(property)
                .map_err(|reason| format!("property '{}': {}", name, reason))?;
            contract.fields.insert(
                name.clone(),
                FieldDef {
                    field_type,
                    required: required.contains(name.as_str()),
                    description: property
                        .get("description")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                },
            );
        }

        Ok(contract)
    }
}

impl FieldDef {
    fn required_of(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: true,
            description: None,
        }
    }

    pub fn string() -> Self {
        Self::required_of(FieldType::String)
    }

    pub fn number() -> Self {
        Self::required_of(FieldType::Number)
    }

    pub fn boolean() -> Self {
        Self::required_of(FieldType::Boolean)
    }

    pub fn array(items: FieldType) -> Self {
        Self::required_of(FieldType::Array {
            items: Box::new(items),
        })
    }

    pub fn object(fields: SchemaContract) -> Self {
        Self::required_of(FieldType::Object { fields })
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl FieldType {
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Array { .. } => "array",
            FieldType::Object { .. } => "object",
        }
    }

    fn accepts(&self, produced: &FieldType) -> Result<(), String> {
        match (self, produced) {
            (FieldType::String, FieldType::String)
            | (FieldType::Number, FieldType::Number)
            | (FieldType::Boolean, FieldType::Boolean) => Ok(()),
            (FieldType::Array { items: wanted }, FieldType::Array { items: given }) => {
                wanted.accepts(given)
            }
            (FieldType::Object { fields: wanted }, FieldType::Object { fields: given }) => {
                wanted.check_compatible(given)
            }
            (wanted, given) => Err(format!(
                "expected {}, produced {}",
                wanted.name(),
                given.name()
            )),
        }
    }

    fn to_json_schema(&self) -> Value {
        match self {
            FieldType::Array { items } => json!({
                "type": "array",
                "items": items.to_json_schema()
            }),
            FieldType::Object { fields } => fields.to_json_schema(),
            primitive => json!({ "type": primitive.name() }),
        }
    }

    fn from_json_schema(property: &Value) -> Result<Self, String> {
        let type_name = match property.get("type") {
            Some(Value::String(name)) => name.as_str(),
            Some(Value::Array(names)) => names
                .iter()
                .filter_map(Value::as_str)
                .find(|name| *name != "null")
                .ok_or("no non-null type")?,
            _ if property.get("properties").is_some() => "object",
            _ => return Err("missing type".to_string()),
        };

        match type_name {
            "string" => Ok(FieldType::String),
            "number" | "integer" => Ok(FieldType::Number),
            "boolean" => Ok(FieldType::Boolean),
            "array" => {
                let items = property.get("items").ok_or("array without items")?;
                Ok(FieldType::Array {
                    items: Box::new(FieldType::from_json_schema(items)?),
                })
            }
            "object" => Ok(FieldType::Object {
                fields: SchemaContract::from_json_schema(property)?,
            }),
            other => Err(format!("unsupported type '{}'", other)),
        }
    }
}

fn check_value(field_type: &FieldType, path: &str, value: &Value, out: &mut Vec<Violation>) {
    match (field_type, value) {
        (FieldType::String, Value::String(_))
        | (FieldType::Number, Value::Number(_))
        | (FieldType::Boolean, Value::Bool(_)) => {}
        (FieldType::Array { items }, Value::Array(elements)) => {
            for (i, element) in elements.iter().enumerate() {
                check_value(items, &format!("{}[{}]", path, i), element, out);
            }
        }
        (FieldType::Object { fields }, Value::Object(_)) => fields.check_object(path, value, out),
        (expected, actual) => out.push(Violation {
            path: path.to_string(),
            expected: expected.name().to_string(),
            actual: json_type_name(actual).to_string(),
        }),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn page_list_contract() -> SchemaContract {
        SchemaContract::new()
            .field(
                "pages",
                FieldDef::array(FieldType::Object {
                    fields: SchemaContract::new()
                        .field("id", FieldDef::string())
                        .field("title", FieldDef::string())
                        .field("url", FieldDef::string().optional()),
                }),
            )
            .field("total", FieldDef::number())
            .field("error", FieldDef::string().optional())
    }

    #[test]
    fn test_schema_deserialize() {
        let yaml = r#"
            query:
              type: string
              description: Question in natural language
            total:
              type: number
            verbose:
              type: boolean
              required: false
            pages:
              type: array
              items:
                type: object
                fields:
                  id: { type: string }
        "#;
        let contract: SchemaContract = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(contract.fields.len(), 4);
        assert_eq!(contract.fields["query"].field_type, FieldType::String);
        assert!(contract.fields["query"].required);
        assert_eq!(
            contract.fields["query"].description.as_deref(),
            Some("Question in natural language")
        );
        assert!(!contract.fields["verbose"].required);
        match &contract.fields["pages"].field_type {
            FieldType::Array { items } => match items.as_ref() {
                FieldType::Object { fields } => {
                    assert_eq!(fields.fields["id"].field_type, FieldType::String)
                }
                other => panic!("Expected object items, got {:?}", other),
            },
            other => panic!("Expected array, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_value_passes() {
        let value = json!({
            "pages": [{"id": "123", "title": "AI Overview"}],
            "total": 1
        });
        assert_eq!(page_list_contract().validate(&value), Ok(&value));
    }

    #[test]
    fn test_extra_fields_are_tolerated() {
        let contract = SchemaContract::new().field("query", FieldDef::string());
        let value = json!({"query": "AI", "locale": "ja"});
        assert!(contract.validate(&value).is_ok());
    }

    #[test]
    fn test_missing_required_field() {
        let contract = SchemaContract::new().field("query", FieldDef::string());
        let err = contract.validate(&json!({})).unwrap_err();

        assert_eq!(err.violations.len(), 1);
        assert_eq!(err.violations[0].path, "query");
        assert_eq!(err.violations[0].expected, "string");
        assert_eq!(err.violations[0].actual, "missing");
    }

    #[test]
    fn test_optional_field_absent_or_null() {
        let contract = SchemaContract::new().field("error", FieldDef::string().optional());
        assert!(contract.validate(&json!({})).is_ok());
        assert!(contract.validate(&json!({"error": null})).is_ok());

        let err = contract.validate(&json!({"error": 404})).unwrap_err();
        assert_eq!(err.paths(), vec!["error"]);
    }

    #[test]
    fn test_required_null_is_a_violation() {
        let contract = SchemaContract::new().field("text", FieldDef::string());
        let err = contract.validate(&json!({"text": null})).unwrap_err();
        assert_eq!(err.violations[0].actual, "null");
    }

    #[test]
    fn test_collects_all_violations_with_nested_paths() {
        let value = json!({
            "pages": [
                {"id": "1", "title": "ok"},
                {"id": 2, "url": false}
            ],
            "total": "one"
        });
        let err = page_list_contract().validate(&value).unwrap_err();

        assert_eq!(
            err.paths(),
            vec!["pages[1].id", "pages[1].title", "pages[1].url", "total"]
        );
        assert!(err.to_string().contains("pages[1].id: expected string, found number"));
    }

    #[test]
    fn test_non_object_value() {
        let contract = SchemaContract::new().field("query", FieldDef::string());
        let err = contract.validate(&json!("just text")).unwrap_err();
        assert_eq!(err.paths(), vec!["$"]);
        assert_eq!(err.violations[0].expected, "object");
    }

    #[test]
    fn test_compatible_contracts() {
        let producer = page_list_contract();
        let consumer = SchemaContract::new()
            .field(
                "pages",
                FieldDef::array(FieldType::Object {
                    fields: SchemaContract::new().field("id", FieldDef::string()),
                }),
            )
            .field("error", FieldDef::string().optional());

        assert!(consumer.check_compatible(&producer).is_ok());
    }

    #[test]
    fn test_incompatible_contracts() {
        let producer = SchemaContract::new()
            .field("cql", FieldDef::string())
            .field("page_id", FieldDef::string().optional());

        let missing = SchemaContract::new().field("query", FieldDef::string());
        assert!(missing
            .check_compatible(&producer)
            .unwrap_err()
            .contains("'query' is required but never produced"));

        let optional = SchemaContract::new().field("page_id", FieldDef::string());
        assert!(optional
            .check_compatible(&producer)
            .unwrap_err()
            .contains("only optionally produced"));

        let wrong_type = SchemaContract::new().field("cql", FieldDef::number());
        assert!(wrong_type
            .check_compatible(&producer)
            .unwrap_err()
            .contains("expected number, produced string"));
    }

    #[test]
    fn test_json_schema_rendering() {
        let contract = SchemaContract::new()
            .field("query", FieldDef::string().describe("What to search for"))
            .field("limit", FieldDef::number().optional());
        let schema = contract.to_json_schema();

        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["query"]["type"], "string");
        assert_eq!(
            schema["properties"]["query"]["description"],
            "What to search for"
        );
        assert_eq!(schema["required"], json!(["query"]));
        assert_eq!(SchemaContract::from_json_schema(&schema).unwrap(), contract);
    }

    #[test]
    fn test_from_json_schema_rejects_unknown_types() {
        let schema = json!({
            "type": "object",
            "properties": { "when": { "type": "date" } }
        });
        let err = SchemaContract::from_json_schema(&schema).unwrap_err();
        assert!(err.contains("property 'when'"));
    }

    #[test]
    fn test_for_type_derives_contract() {
        #[derive(Deserialize, JsonSchema)]
        #[allow(dead_code)]
        struct Summary {
            id: String,
            url: Option<String>,
        }

        #[derive(Deserialize, JsonSchema)]
        #[allow(dead_code)]
        struct Results {
            /// Matching pages
            pages: Vec<Summary>,
            total: u64,
            error: Option<String>,
        }

        let contract = SchemaContract::for_type::<Results>().unwrap();

        assert!(contract.fields["pages"].required);
        assert_eq!(
            contract.fields["pages"].description.as_deref(),
            Some("Matching pages")
        );
        assert_eq!(contract.fields["total"].field_type, FieldType::Number);
        assert!(!contract.fields["error"].required);
        assert_eq!(contract.fields["error"].field_type, FieldType::String);

        let value = json!({"pages": [{"id": "1"}], "total": 1});
        assert!(contract.validate(&value).is_ok());
        let bad = json!({"pages": [{"url": "x"}], "total": 1});
        assert_eq!(contract.validate(&bad).unwrap_err().paths(), vec!["pages[0].id"]);
    }
}
