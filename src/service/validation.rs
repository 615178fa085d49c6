//! Request validation: typed field extraction with field-keyed error collection.

use crate::error::{ValidationErrors, SCHEMA_KEY};
use serde_json::{Map, Value};

pub const MISSING: &str = "Missing data for required field.";
pub const NULL: &str = "Field may not be null.";
pub const INVALID_INPUT: &str = "Invalid input type.";
pub const UNKNOWN_FIELD: &str = "Unknown field.";
const NOT_INTEGER: &str = "Not a valid integer.";
const NOT_STRING: &str = "Not a valid string.";
const NOT_LIST: &str = "Not a valid list.";

/// Rule for one string field.
#[derive(Debug, Clone, Copy)]
pub struct StringRule {
    pub required: bool,
    pub max_length: Option<usize>,
}

impl StringRule {
    pub const fn optional(max_length: Option<usize>) -> Self {
        StringRule {
            required: false,
            max_length,
        }
    }

    pub const fn required(max_length: Option<usize>) -> Self {
        StringRule {
            required: true,
            max_length,
        }
    }
}

/// Pulls typed values out of a JSON object, recording one error list per field.
/// Nothing fails until [`FieldReader::finish`].
pub struct FieldReader {
    fields: Map<String, Value>,
    errors: ValidationErrors,
}

impl FieldReader {
    /// Fails right away when `value` is not an object. Keys outside `known` are reported as unknown.
    pub fn new(value: Value, known: &[&str]) -> Result<Self, ValidationErrors> {
        let fields = match value {
            Value::Object(fields) => fields,
            _ => return Err(ValidationErrors::single(SCHEMA_KEY, INVALID_INPUT)),
        };
        let mut errors = ValidationErrors::new();
        for key in fields.keys() {
            if !known.contains(&key.as_str()) {
                errors.add(key, UNKNOWN_FIELD);
            }
        }
        Ok(FieldReader { fields, errors })
    }

    /// Whether `name` is still unread in the body.
    pub fn has(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Optional, non-nullable integer. Numeric strings are accepted.
    pub fn integer(&mut self, name: &str) -> Option<i32> {
        match self.fields.remove(name)? {
            Value::Null => {
                self.errors.add(name, NULL);
                None
            }
            value => {
                let parsed = match &value {
                    Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
                    Value::String(s) => s.trim().parse::<i32>().ok(),
                    _ => None,
                };
                if parsed.is_none() {
                    self.errors.add(name, NOT_INTEGER);
                }
                parsed
            }
        }
    }

    pub fn string(&mut self, name: &str, rule: StringRule) -> Option<String> {
        match self.fields.remove(name) {
            None => {
                if rule.required {
                    self.errors.add(name, MISSING);
                }
                None
            }
            Some(Value::Null) => {
                self.errors.add(name, NULL);
                None
            }
            Some(Value::String(s)) => {
                if let Some(max) = rule.max_length {
                    if s.chars().count() > max {
                        self.errors.add(name, format!("Longer than maximum length {}.", max));
                        return None;
                    }
                }
                Some(s)
            }
            Some(_) => {
                self.errors.add(name, NOT_STRING);
                None
            }
        }
    }

    /// Absent is `None`, `null` is `Some(None)`.
    pub fn nullable(&mut self, name: &str) -> Option<Option<Value>> {
        self.fields.remove(name).map(|value| match value {
            Value::Null => None,
            value => Some(value),
        })
    }

    /// Optional, non-nullable list.
    pub fn list(&mut self, name: &str) -> Option<Vec<Value>> {
        match self.fields.remove(name)? {
            Value::Array(items) => Some(items),
            Value::Null => {
                self.errors.add(name, NULL);
                None
            }
            _ => {
                self.errors.add(name, NOT_LIST);
                None
            }
        }
    }

    pub fn add(&mut self, name: &str, message: impl Into<String>) {
        self.errors.add(name, message);
    }

    pub fn nest(&mut self, name: &str, errors: ValidationErrors) {
        self.errors.nest(name, errors);
    }

    pub fn finish(self) -> Result<(), ValidationErrors> {
        self.errors.into_result()
    }
}
