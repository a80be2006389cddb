//! Field Schemas
//!
//! A `Fieldset` declares the user-editable fields of a content type. It is the
//! contract between the type registry, the content `update` action and the
//! forms: forms extract and validate submitted data against it, and `update`
//! applies only the fields it names.
//!
//! ## Example
//!
//! ```rust
//! use ptahcms_core::models::{content_schema, Field, FieldType};
//! use serde_json::json;
//!
//! let schema = content_schema().with(Field::new("body", FieldType::TextArea));
//! let data = json!({"title": "Hello"});
//! let (values, errors) = schema.extract(data.as_object().unwrap());
//! assert!(errors.is_empty());
//! assert_eq!(values["description"], json!(""));
//! ```

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

/// Widget-level type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    TextArea,
    Bool,
    Int,
    DateTime,
}

/// Regex validator attached to a field
#[derive(Debug, Clone)]
pub struct Validator {
    pattern: Regex,
    message: String,
}

impl Validator {
    /// # Panics
    ///
    /// Panics on an invalid pattern; validators are declared at startup.
    pub fn regex(pattern: &str, message: impl Into<String>) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("validator pattern must compile"),
            message: message.into(),
        }
    }

    /// Names may only contain `a-z`, `0-9` and `-`
    pub fn special_symbols() -> Self {
        Self::regex("^[a-z0-9-]+$", "Forbidden characters")
    }

    pub fn validate(&self, value: &str) -> Result<(), String> {
        if self.pattern.is_match(value) {
            Ok(())
        } else {
            Err(self.message.clone())
        }
    }
}

/// Single declared field
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub title: String,
    pub description: String,
    pub field_type: FieldType,
    pub required: bool,
    /// Value applied by `update` when the field is absent from the data
    pub default: Option<Value>,
    /// Value used by extraction when the field is absent and not required
    pub missing: Option<Value>,
    pub validator: Option<Validator>,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        Self {
            title: capitalize(&name),
            name,
            description: String::new(),
            field_type,
            required: false,
            default: None,
            missing: None,
            validator: None,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn missing(mut self, value: Value) -> Self {
        self.missing = Some(value);
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    fn check_type(&self, value: &Value) -> Result<(), String> {
        let ok = match self.field_type {
            FieldType::Text | FieldType::TextArea => value.is_string(),
            FieldType::Bool => value.is_boolean(),
            FieldType::Int => value.is_i64() || value.is_u64(),
            FieldType::DateTime => value
                .as_str()
                .map(|s| chrono::DateTime::parse_from_rfc3339(s).is_ok())
                .unwrap_or(false),
        };
        if ok {
            Ok(())
        } else {
            Err(format!("Invalid value for {}", self.title))
        }
    }
}

/// Error attached to a single field (or to the form when `field` is `None`)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: Option<String>,
    pub message: String,
}

impl FieldError {
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    pub fn form(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
        }
    }
}

/// Ordered collection of fields
#[derive(Debug, Clone, Default)]
pub struct Fieldset {
    fields: Vec<Field>,
}

impl Fieldset {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Append a field, replacing any field with the same name
    pub fn with(mut self, field: Field) -> Self {
        self.fields.retain(|f| f.name != field.name);
        self.fields.push(field);
        self
    }

    /// Concatenate two fieldsets; fields of `other` win on name collision
    pub fn merge(mut self, other: &Fieldset) -> Self {
        for field in &other.fields {
            self = self.with(field.clone());
        }
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Extract and validate submitted values
    ///
    /// Empty strings count as absent. Absent required fields are errors; absent
    /// optional fields take their `missing` value when one is declared.
    pub fn extract(&self, data: &Map<String, Value>) -> (Map<String, Value>, Vec<FieldError>) {
        let mut values = Map::new();
        let mut errors = Vec::new();

        for field in &self.fields {
            let raw = data
                .get(&field.name)
                .filter(|v| !v.is_null() && v.as_str() != Some(""));

            let Some(value) = raw else {
                if field.required {
                    errors.push(FieldError::field(&field.name, "Required"));
                } else if let Some(missing) = &field.missing {
                    values.insert(field.name.clone(), missing.clone());
                }
                continue;
            };

            if let Err(message) = field.check_type(value) {
                errors.push(FieldError::field(&field.name, message));
                continue;
            }

            if let (Some(validator), Some(text)) = (&field.validator, value.as_str()) {
                if let Err(message) = validator.validate(text) {
                    errors.push(FieldError::field(&field.name, message));
                    continue;
                }
            }

            values.insert(field.name.clone(), value.clone());
        }

        (values, errors)
    }
}

/// Default schema of content types: title and description
pub fn content_schema() -> Fieldset {
    Fieldset::new(vec![
        Field::new("title", FieldType::Text).title("Title").required(),
        Field::new("description", FieldType::TextArea)
            .title("Description")
            .missing(Value::String(String::new())),
    ])
}

/// Name of the form field carrying an explicit content name
pub const NAME_FIELD: &str = "__name__";

/// Schema of the explicit content name field used by add and rename forms
pub fn content_name_schema() -> Fieldset {
    Fieldset::new(vec![Field::new(NAME_FIELD, FieldType::Text)
        .title("Name")
        .description(
            "Name is the part that shows up in the URL. \
             Allowed character are \"a-z\", \"0-9\" and \"-\".",
        )
        .validator(Validator::special_symbols())])
}

pub(crate) fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
