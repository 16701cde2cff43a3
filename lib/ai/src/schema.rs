//! Declarative output schemas.
//!
//! A [`SchemaDescriptor`] is a plain description of a structured result:
//! field names, types, enumerations, numeric ranges and the descriptions the
//! model is shown. The same descriptor is rendered into the request (so the
//! model knows what to produce) and checked against the response (so callers
//! never see a record that breaks it).

use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue, json};
use std::fmt;

/// The type of a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
    /// A string restricted to a finite set of values.
    Enum(Vec<String>),
    /// A homogeneous list.
    Array(Box<FieldType>),
    /// A nested record.
    Object(Vec<Field>),
}

impl FieldType {
    fn type_name(&self) -> &'static str {
        match self {
            Self::String | Self::Enum(_) => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }
}

/// A named field within a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Field name as it appears in the JSON document.
    pub name: String,
    /// Description shown to the model.
    pub description: String,
    /// Field type.
    pub field_type: FieldType,
    /// Whether the field may be `null` or absent.
    pub nullable: bool,
    /// Inclusive lower bound for numeric fields.
    pub minimum: Option<f64>,
    /// Inclusive upper bound for numeric fields.
    pub maximum: Option<f64>,
}

impl Field {
    /// Creates a required field.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            field_type,
            nullable: false,
            minimum: None,
            maximum: None,
        }
    }

    #[must_use]
    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, FieldType::String)
    }

    #[must_use]
    pub fn number(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, FieldType::Number)
    }

    #[must_use]
    pub fn integer(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, FieldType::Integer)
    }

    #[must_use]
    pub fn boolean(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, FieldType::Boolean)
    }

    /// A string field restricted to `values`.
    #[must_use]
    pub fn enumeration<I, S>(name: impl Into<String>, description: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect();
        Self::new(name, description, FieldType::Enum(values))
    }

    /// A list of strings.
    #[must_use]
    pub fn string_list(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, FieldType::Array(Box::new(FieldType::String)))
    }

    /// A list of nested records.
    #[must_use]
    pub fn object_list(
        name: impl Into<String>,
        description: impl Into<String>,
        fields: Vec<Field>,
    ) -> Self {
        Self::new(
            name,
            description,
            FieldType::Array(Box::new(FieldType::Object(fields))),
        )
    }

    /// A number constrained to `[0, 1]`.
    #[must_use]
    pub fn confidence(name: impl Into<String>) -> Self {
        Self::number(name, "Confidence score between 0 and 1").with_range(0.0, 1.0)
    }

    /// Marks the field as nullable (and therefore optional).
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Sets an inclusive numeric range.
    #[must_use]
    pub fn with_range(mut self, minimum: f64, maximum: f64) -> Self {
        self.minimum = Some(minimum);
        self.maximum = Some(maximum);
        self
    }

    fn to_json_schema(&self) -> JsonValue {
        let mut schema = type_schema(&self.field_type);
        if let Some(obj) = schema.as_object_mut() {
            obj.insert("description".into(), json!(self.description));
            if self.nullable {
                obj.insert("nullable".into(), json!(true));
            }
            if let Some(min) = self.minimum {
                obj.insert("minimum".into(), json!(min));
            }
            if let Some(max) = self.maximum {
                obj.insert("maximum".into(), json!(max));
            }
        }
        schema
    }
}

fn type_schema(field_type: &FieldType) -> JsonValue {
    match field_type {
        FieldType::Enum(values) => json!({
            "type": "string",
            "format": "enum",
            "enum": values,
        }),
        FieldType::Array(items) => json!({
            "type": "array",
            "items": type_schema(items),
        }),
        FieldType::Object(fields) => object_schema(fields),
        other => json!({ "type": other.type_name() }),
    }
}

fn object_schema(fields: &[Field]) -> JsonValue {
    let mut properties = Map::new();
    for field in fields {
        properties.insert(field.name.clone(), field.to_json_schema());
    }
    let required: Vec<&str> = fields
        .iter()
        .filter(|f| !f.nullable)
        .map(|f| f.name.as_str())
        .collect();
    let ordering: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "propertyOrdering": ordering,
    })
}

/// A single way in which a document fails its schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// The raw output could not be parsed as JSON.
    NotJson { reason: String },
    /// A required field is absent or null.
    Missing { path: String },
    /// A value has the wrong JSON type.
    WrongType { path: String, expected: String },
    /// A numeric value lies outside its declared range.
    OutOfRange { path: String, value: String },
    /// A categorical value is outside its declared set.
    NotInEnum {
        path: String,
        value: String,
        allowed: Vec<String>,
    },
    /// The document validated but could not be decoded into the target type.
    Decode { reason: String },
}

impl Violation {
    /// The field path this violation refers to, if any.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Missing { path }
            | Self::WrongType { path, .. }
            | Self::OutOfRange { path, .. }
            | Self::NotInEnum { path, .. } => Some(path),
            Self::NotJson { .. } | Self::Decode { .. } => None,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotJson { reason } => write!(f, "not valid JSON ({reason})"),
            Self::Missing { path } => write!(f, "missing required field '{path}'"),
            Self::WrongType { path, expected } => {
                write!(f, "field '{path}' should be {expected}")
            }
            Self::OutOfRange { path, value } => {
                write!(f, "field '{path}' value {value} is out of range")
            }
            Self::NotInEnum {
                path,
                value,
                allowed,
            } => write!(
                f,
                "field '{path}' value '{value}' is not one of [{}]",
                allowed.join(", ")
            ),
            Self::Decode { reason } => write!(f, "could not decode output ({reason})"),
        }
    }
}

/// Description of a structured result.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDescriptor {
    /// Schema name, used in logs and errors.
    pub name: String,
    /// What the record represents.
    pub description: String,
    /// Top-level fields, in the order the model should produce them.
    pub fields: Vec<Field>,
}

impl SchemaDescriptor {
    /// Creates an empty schema.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            fields: Vec::new(),
        }
    }

    /// Adds a field.
    #[must_use]
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Looks up a top-level field by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Renders the schema in the OpenAPI subset accepted as a response schema
    /// or as function-declaration parameters.
    #[must_use]
    pub fn to_json_schema(&self) -> JsonValue {
        let mut schema = object_schema(&self.fields);
        if let Some(obj) = schema.as_object_mut()
            && !self.description.is_empty()
        {
            obj.insert("description".into(), json!(self.description));
        }
        schema
    }

    /// Checks a parsed document against this schema.
    ///
    /// Unknown extra fields are ignored.
    ///
    /// # Errors
    ///
    /// Returns every violation found, not just the first.
    pub fn validate(&self, value: &JsonValue) -> Result<(), Vec<Violation>> {
        let mut violations = Vec::new();
        validate_object(&self.fields, value, "", &mut violations);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

fn validate_object(fields: &[Field], value: &JsonValue, path: &str, out: &mut Vec<Violation>) {
    let Some(obj) = value.as_object() else {
        out.push(Violation::WrongType {
            path: if path.is_empty() { "$".to_string() } else { path.to_string() },
            expected: "object".to_string(),
        });
        return;
    };

    for field in fields {
        let field_path = join_path(path, &field.name);
        match obj.get(&field.name) {
            None | Some(JsonValue::Null) if field.nullable => {}
            None | Some(JsonValue::Null) => out.push(Violation::Missing { path: field_path }),
            Some(v) => validate_value(field, &field.field_type, v, &field_path, out),
        }
    }
}

fn validate_value(
    field: &Field,
    field_type: &FieldType,
    value: &JsonValue,
    path: &str,
    out: &mut Vec<Violation>,
) {
    let wrong_type = |out: &mut Vec<Violation>| {
        out.push(Violation::WrongType {
            path: path.to_string(),
            expected: field_type.type_name().to_string(),
        });
    };

    match field_type {
        FieldType::String => {
            if !value.is_string() {
                wrong_type(out);
            }
        }
        FieldType::Boolean => {
            if !value.is_boolean() {
                wrong_type(out);
            }
        }
        FieldType::Number | FieldType::Integer => {
            let Some(n) = value.as_f64() else {
                wrong_type(out);
                return;
            };
            if matches!(field_type, FieldType::Integer) && n.fract() != 0.0 {
                wrong_type(out);
                return;
            }
            let below = field.minimum.is_some_and(|min| n < min);
            let above = field.maximum.is_some_and(|max| n > max);
            if below || above {
                out.push(Violation::OutOfRange {
                    path: path.to_string(),
                    value: value.to_string(),
                });
            }
        }
        FieldType::Enum(allowed) => match value.as_str() {
            Some(s) if allowed.iter().any(|a| a == s) => {}
            Some(s) => out.push(Violation::NotInEnum {
                path: path.to_string(),
                value: s.to_string(),
                allowed: allowed.clone(),
            }),
            None => wrong_type(out),
        },
        FieldType::Array(items) => {
            let Some(elements) = value.as_array() else {
                wrong_type(out);
                return;
            };
            for (idx, element) in elements.iter().enumerate() {
                validate_value(field, items, element, &format!("{path}[{idx}]"), out);
            }
        }
        FieldType::Object(fields) => validate_object(fields, value, path, out),
    }
}

/// A type that can be requested as structured model output.
///
/// Implementors describe themselves with a [`SchemaDescriptor`]; the
/// descriptor must agree with the type's serde representation.
pub trait StructuredOutput: DeserializeOwned + Send {
    /// The schema the model is asked to produce.
    fn schema() -> SchemaDescriptor;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_schema() -> SchemaDescriptor {
        SchemaDescriptor::new("ModifyEventDetails", "Details for modifying an event")
            .field(Field::string("event_identifier", "Which event"))
            .field(Field::object_list(
                "changes",
                "List of changes to make",
                vec![
                    Field::string("field", "Field to change"),
                    Field::string("new_value", "New value for the field"),
                ],
            ))
            .field(Field::enumeration(
                "kind",
                "Request kind",
                ["new_event", "modify_event", "other"],
            ))
            .field(Field::confidence("confidence_score"))
            .field(Field::string("calendar_link", "Link").nullable())
    }

    #[test]
    fn renders_required_and_ordering() {
        let schema = event_schema().to_json_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(
            schema["propertyOrdering"],
            json!(["event_identifier", "changes", "kind", "confidence_score", "calendar_link"])
        );
        let required = schema["required"].as_array().expect("required list");
        assert!(!required.contains(&json!("calendar_link")));
        assert_eq!(schema["properties"]["kind"]["enum"][2], "other");
        assert_eq!(schema["properties"]["confidence_score"]["maximum"], 1.0);
        assert_eq!(schema["properties"]["calendar_link"]["nullable"], true);
        assert_eq!(
            schema["properties"]["changes"]["items"]["properties"]["new_value"]["type"],
            "string"
        );
    }

    #[test]
    fn accepts_conforming_document() {
        let doc = json!({
            "event_identifier": "team sync",
            "changes": [{"field": "time", "new_value": "15:00"}],
            "kind": "modify_event",
            "confidence_score": 0.82,
            "calendar_link": null,
            "extra": "ignored"
        });
        assert_eq!(event_schema().validate(&doc), Ok(()));
    }

    #[test]
    fn reports_every_violation_with_paths() {
        let doc = json!({
            "changes": [{"field": "time", "new_value": 3}],
            "kind": "delete_event",
            "confidence_score": 1.5
        });
        let violations = event_schema().validate(&doc).unwrap_err();
        let paths: Vec<_> = violations.iter().filter_map(Violation::path).collect();
        assert_eq!(
            paths,
            vec!["event_identifier", "changes[0].new_value", "kind", "confidence_score"]
        );
        assert!(matches!(violations[2], Violation::NotInEnum { .. }));
        assert!(matches!(violations[3], Violation::OutOfRange { .. }));
    }

    #[test]
    fn integer_rejects_fractions() {
        let schema = SchemaDescriptor::new("T", "").field(Field::integer("minutes", "Duration"));
        assert!(schema.validate(&json!({"minutes": 30})).is_ok());
        assert!(schema.validate(&json!({"minutes": 30.5})).is_err());
    }

    #[test]
    fn non_object_root_is_wrong_type() {
        let violations = event_schema().validate(&json!([1, 2])).unwrap_err();
        assert_eq!(
            violations,
            vec![Violation::WrongType {
                path: "$".to_string(),
                expected: "object".to_string()
            }]
        );
    }

    #[test]
    fn confidence_bounds_are_inclusive() {
        let schema = SchemaDescriptor::new("T", "").field(Field::confidence("c"));
        assert!(schema.validate(&json!({"c": 0.0})).is_ok());
        assert!(schema.validate(&json!({"c": 1.0})).is_ok());
        assert!(schema.validate(&json!({"c": -0.01})).is_err());
    }
}
