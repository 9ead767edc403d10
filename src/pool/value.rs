use std::fmt;
use std::sync::Arc;

use crate::schema::{FieldConfig, FieldType};

/// Concrete value held by a [`FieldValue`]
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Text(String),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
}

impl Value {
    /// Zero value of a field type
    pub fn empty(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Text => Value::Text(String::new()),
            FieldType::Int => Value::Int(0),
            FieldType::Long => Value::Long(0),
            FieldType::Float => Value::Float(0.0),
            FieldType::Double => Value::Double(0.0),
        }
    }

    /// The type this value actually holds
    pub fn value_type(&self) -> FieldType {
        match self {
            Value::Text(_) => FieldType::Text,
            Value::Int(_) => FieldType::Int,
            Value::Long(_) => FieldType::Long,
            Value::Float(_) => FieldType::Float,
            Value::Double(_) => FieldType::Double,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integral value, widened
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v as i64),
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Floating-point value, widened
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
        }
    }
}

/// A raw value that could not be parsed as its field's declared type
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoercionError {
    pub field: String,
    pub field_type: FieldType,
    pub raw: String,
    pub reason: String,
}

impl fmt::Display for CoercionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unable to parse \"{}\" as {} for field {}: {}",
            self.raw, self.field_type, self.field, self.reason
        )
    }
}

impl std::error::Error for CoercionError {}

/// A named, typed value bound to its field's config
///
/// Only the pool constructs these, and only for the config's own field name,
/// so a recycled instance always belongs to the same field.
#[derive(Debug)]
pub struct FieldValue {
    config: Arc<FieldConfig>,
    value: Value,
}

impl FieldValue {
    pub(crate) fn new(config: Arc<FieldConfig>) -> Self {
        let value = Value::empty(config.field_type());
        Self { config, value }
    }

    pub fn name(&self) -> &str {
        self.config.name()
    }

    pub fn config(&self) -> &Arc<FieldConfig> {
        &self.config
    }

    /// Declared type from the field's config
    pub fn field_type(&self) -> FieldType {
        self.config.field_type()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// True when the current value is a text fallback for a numeric field
    pub fn is_fallback(&self) -> bool {
        self.value.value_type() != self.field_type()
    }

    /// Store `raw` coerced to the declared type.
    ///
    /// On a parse failure the raw text is stored instead and the error is
    /// returned; the declared type is untouched, so the next assignment
    /// tries the coercion again.
    pub(crate) fn assign(&mut self, raw: &str) -> Result<(), CoercionError> {
        let field_type = self.field_type();
        let parsed = match field_type {
            FieldType::Text => {
                self.set_text(raw);
                return Ok(());
            }
            FieldType::Int => raw.parse().map(Value::Int).map_err(|e| e.to_string()),
            FieldType::Long => raw.parse().map(Value::Long).map_err(|e| e.to_string()),
            // Decimal forms tolerate surrounding whitespace, integral ones do not.
            FieldType::Float => raw.trim().parse().map(Value::Float).map_err(|e| e.to_string()),
            FieldType::Double => raw.trim().parse().map(Value::Double).map_err(|e| e.to_string()),
        };

        match parsed {
            Ok(value) => {
                self.value = value;
                Ok(())
            }
            Err(reason) => {
                self.set_text(raw);
                Err(CoercionError {
                    field: self.name().to_string(),
                    field_type,
                    raw: raw.to_string(),
                    reason,
                })
            }
        }
    }

    // Reuses the existing text buffer when there is one.
    fn set_text(&mut self, raw: &str) {
        match &mut self.value {
            Value::Text(buf) => {
                buf.clear();
                buf.push_str(raw);
            }
            other => *other = Value::Text(raw.to_string()),
        }
    }
}
