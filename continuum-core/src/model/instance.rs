use serde::{Serialize, Serializer};
use serde_json::Value;

use super::schema::ValidationError;

/// A validated record together with the outcome of its validation.
///
/// The outcome is fixed at construction. Serializing an instance emits the
/// record only, so the error never shows up among its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedInstance {
    value: Value,
    error: Option<ValidationError>,
}

impl ValidatedInstance {
    pub(crate) fn new(value: Value, error: Option<ValidationError>) -> Self {
        Self { value, error }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn error(&self) -> Option<&ValidationError> {
        self.error.as_ref()
    }

    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.value.get(field)
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn into_parts(self) -> (Value, Option<ValidationError>) {
        (self.value, self.error)
    }
}

impl Serialize for ValidatedInstance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Validated {
    Bypassed(Value),
    Many(Vec<ValidatedInstance>),
    One(ValidatedInstance),
}

impl Validated {
    pub fn failures(&self) -> Vec<&ValidatedInstance> {
        match self {
            Validated::Bypassed(_) => Vec::new(),
            Validated::Many(items) => items.iter().filter(|i| !i.is_valid()).collect(),
            Validated::One(item) if !item.is_valid() => vec![item],
            Validated::One(_) => Vec::new(),
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Validated::Bypassed(value) => value,
            Validated::Many(items) => {
                Value::Array(items.into_iter().map(ValidatedInstance::into_value).collect())
            }
            Validated::One(item) => item.into_value(),
        }
    }
}
