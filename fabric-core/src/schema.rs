//! Schema - Define type schemas for resources
//!
//! Providers define schemas for each resource type so configurations can be
//! rejected before any API call is made.

use std::collections::HashMap;
use std::fmt;

use crate::resource::Value;

/// Attribute type
#[derive(Debug, Clone)]
pub enum AttributeType {
    /// String
    String,
    /// Integer
    Int,
    /// Boolean
    Bool,
    /// Enum (list of allowed values)
    Enum(Vec<String>),
    /// Custom type (with validation function)
    Custom {
        name: String,
        base: Box<AttributeType>,
        validate: fn(&Value) -> Result<(), String>,
    },
    /// List
    List(Box<AttributeType>),
    /// Nested block: a list of maps validated against nested attributes
    Block(Box<BlockSchema>),
}

impl AttributeType {
    /// Check if a value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        match (self, value) {
            (AttributeType::String, Value::String(_)) => Ok(()),
            (AttributeType::Int, Value::Int(_)) => Ok(()),
            (AttributeType::Bool, Value::Bool(_)) => Ok(()),

            (AttributeType::Enum(variants), Value::String(s)) => {
                if variants.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(TypeError::InvalidEnumVariant {
                        value: s.clone(),
                        expected: variants.clone(),
                    })
                }
            }

            (AttributeType::Custom { base, validate, .. }, v) => {
                base.validate(v)?;
                validate(v).map_err(|msg| TypeError::ValidationFailed { message: msg })
            }

            (AttributeType::List(inner), Value::List(items)) => {
                for (i, item) in items.iter().enumerate() {
                    inner.validate(item).map_err(|e| TypeError::ListItemError {
                        index: i,
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Block(block), Value::List(items)) => block.validate(items),

            _ => Err(TypeError::TypeMismatch {
                expected: self.type_name(),
                got: value.type_name(),
            }),
        }
    }

    fn type_name(&self) -> String {
        match self {
            AttributeType::String => "String".to_string(),
            AttributeType::Int => "Int".to_string(),
            AttributeType::Bool => "Bool".to_string(),
            AttributeType::Enum(variants) => format!("Enum({})", variants.join(" | ")),
            AttributeType::Custom { name, .. } => name.clone(),
            AttributeType::List(inner) => format!("List<{}>", inner.type_name()),
            AttributeType::Block(_) => "Block".to_string(),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Type error
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Invalid enum variant '{value}', expected one of: {}", expected.join(", "))]
    InvalidEnumVariant {
        value: String,
        expected: Vec<String>,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Unknown attribute '{name}'")]
    UnknownAttribute { name: String },

    #[error("Attribute '{name}' is computed and cannot be set")]
    ComputedOnly { name: String },

    #[error("Block must have between {min} and {max} elements, got {got}")]
    BlockSize { min: usize, max: usize, got: usize },

    #[error("Attribute '{name}': {inner}")]
    AttributeError { name: String, inner: Box<TypeError> },

    #[error("List item at index {index}: {inner}")]
    ListItemError { index: usize, inner: Box<TypeError> },
}

impl Value {
    fn type_name(&self) -> String {
        match self {
            Value::String(_) => "String".to_string(),
            Value::Int(_) => "Int".to_string(),
            Value::Bool(_) => "Bool".to_string(),
            Value::List(_) => "List".to_string(),
            Value::Map(_) => "Map".to_string(),
        }
    }
}

/// Attribute schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    pub required: bool,
    pub optional: bool,
    /// Value may be assigned by the remote API
    pub computed: bool,
    /// Changing the value requires replacing the resource
    pub force_new: bool,
    pub sensitive: bool,
    pub description: Option<String>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            optional: false,
            computed: false,
            force_new: false,
            sensitive: false,
            description: None,
        }
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

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Whether a configuration may set this attribute
    pub fn is_settable(&self) -> bool {
        self.required || self.optional
    }
}

fn validate_attributes(
    attributes: &HashMap<String, AttributeSchema>,
    values: &HashMap<String, Value>,
    errors: &mut Vec<TypeError>,
) {
    for (name, schema) in attributes {
        if schema.required && !values.contains_key(name) {
            errors.push(TypeError::MissingRequired { name: name.clone() });
        }
    }

    for (name, value) in values {
        match attributes.get(name) {
            None => errors.push(TypeError::UnknownAttribute { name: name.clone() }),
            Some(schema) if !schema.is_settable() => {
                errors.push(TypeError::ComputedOnly { name: name.clone() })
            }
            Some(schema) => {
                if let Err(e) = schema.attr_type.validate(value) {
                    errors.push(TypeError::AttributeError {
                        name: name.clone(),
                        inner: Box::new(e),
                    });
                }
            }
        }
    }
}

/// Nested block schema
#[derive(Debug, Clone, Default)]
pub struct BlockSchema {
    pub attributes: HashMap<String, AttributeSchema>,
    pub min_items: usize,
    pub max_items: Option<usize>,
}

impl BlockSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn min_items(mut self, min: usize) -> Self {
        self.min_items = min;
        self
    }

    pub fn max_items(mut self, max: usize) -> Self {
        self.max_items = Some(max);
        self
    }

    fn validate(&self, items: &[Value]) -> Result<(), TypeError> {
        let max = self.max_items.unwrap_or(usize::MAX);
        if items.len() < self.min_items || items.len() > max {
            return Err(TypeError::BlockSize {
                min: self.min_items,
                max,
                got: items.len(),
            });
        }
        for (index, item) in items.iter().enumerate() {
            let Value::Map(values) = item else {
                return Err(TypeError::ListItemError {
                    index,
                    inner: Box::new(TypeError::TypeMismatch {
                        expected: "Map".to_string(),
                        got: item.type_name(),
                    }),
                });
            };
            let mut errors = Vec::new();
            validate_attributes(&self.attributes, values, &mut errors);
            if let Some(first) = errors.into_iter().next() {
                return Err(TypeError::ListItemError {
                    index,
                    inner: Box::new(first),
                });
            }
        }
        Ok(())
    }
}

/// Resource schema
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub attributes: HashMap<String, AttributeSchema>,
    pub description: Option<String>,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: HashMap::new(),
            description: None,
        }
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Names of attributes whose change forces replacement
    pub fn force_new_attributes(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .attributes
            .values()
            .filter(|a| a.force_new)
            .map(|a| a.name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    /// Validate resource attributes
    pub fn validate(&self, attributes: &HashMap<String, Value>) -> Result<(), Vec<TypeError>> {
        let mut errors = Vec::new();
        validate_attributes(&self.attributes, attributes, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Helper functions for common types
pub mod types {
    use super::*;

    /// Custom integer type
    pub fn int(name: &str, validate: fn(&Value) -> Result<(), String>) -> AttributeType {
        AttributeType::Custom {
            name: name.to_string(),
            base: Box::new(AttributeType::Int),
            validate,
        }
    }

    /// Positive integer type
    pub fn positive_int() -> AttributeType {
        int("PositiveInt", |value| match value {
            Value::Int(n) if *n > 0 => Ok(()),
            _ => Err("Value must be positive".to_string()),
        })
    }

    /// Non-empty string type
    pub fn non_empty_string() -> AttributeType {
        AttributeType::Custom {
            name: "NonEmptyString".to_string(),
            base: Box::new(AttributeType::String),
            validate: |value| match value {
                Value::String(s) if !s.is_empty() => Ok(()),
                _ => Err("Value must not be empty".to_string()),
            },
        }
    }

    /// Custom string type
    pub fn string(name: &str, validate: fn(&Value) -> Result<(), String>) -> AttributeType {
        AttributeType::Custom {
            name: name.to_string(),
            base: Box::new(AttributeType::String),
            validate,
        }
    }

    /// Enum from static variants
    pub fn one_of(variants: &[&str]) -> AttributeType {
        AttributeType::Enum(variants.iter().map(|v| v.to_string()).collect())
    }
}

/// Validate the length of a string in characters
pub fn validate_length(value: &str, min: usize, max: usize) -> Result<(), String> {
    let len = value.chars().count();
    if len < min || len > max {
        Err(format!(
            "expected length between {} and {}, got {}",
            min, max, len
        ))
    } else {
        Ok(())
    }
}

/// Validate that an integer lies within an inclusive range
pub fn validate_range(value: i64, min: i64, max: i64) -> Result<(), String> {
    if value < min || value > max {
        Err(format!(
            "expected value between {} and {}, got {}",
            min, max, value
        ))
    } else {
        Ok(())
    }
}
