use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Any,
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

impl FieldKind {
    fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldKind::Any => true,
            FieldKind::String => value.is_string(),
            FieldKind::Number => value.is_number(),
            FieldKind::Integer => value
                .as_f64()
                .map(|n| n.is_finite() && n.fract() == 0.0)
                .unwrap_or(false),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::Object => value.is_object(),
            FieldKind::Array => value.is_array(),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Any => "any",
            FieldKind::String => "string",
            FieldKind::Number => "number",
            FieldKind::Integer => "integer",
            FieldKind::Boolean => "boolean",
            FieldKind::Object => "object",
            FieldKind::Array => "array",
        };
        f.write_str(name)
    }
}

pub fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone)]
pub struct Field {
    kind: FieldKind,
    required: bool,
    nullable: bool,
    default: Option<Value>,
    min: Option<f64>,
    max: Option<f64>,
    pattern: Option<Regex>,
    allowed: Vec<Value>,
}

impl Field {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            required: false,
            nullable: false,
            default: None,
            min: None,
            max: None,
            pattern: None,
            allowed: Vec::new(),
        }
    }

    pub fn any() -> Self {
        Self::new(FieldKind::Any)
    }

    pub fn string() -> Self {
        Self::new(FieldKind::String)
    }

    pub fn number() -> Self {
        Self::new(FieldKind::Number)
    }

    pub fn integer() -> Self {
        Self::new(FieldKind::Integer)
    }

    pub fn boolean() -> Self {
        Self::new(FieldKind::Boolean)
    }

    pub fn object() -> Self {
        Self::new(FieldKind::Object)
    }

    pub fn array() -> Self {
        Self::new(FieldKind::Array)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Lower bound: numeric value for numbers, length for strings and arrays.
    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn pattern(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.pattern = Some(Regex::new(pattern)?);
        Ok(self)
    }

    pub fn allow(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.allowed.extend(values);
        self
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    fn check(&self, path: &str, value: &Value, violations: &mut Vec<Violation>) {
        if value.is_null() && self.nullable {
            return;
        }

        if !self.kind.accepts(value) {
            violations.push(Violation::new(
                path,
                format!("must be of type {} but got {}", self.kind, json_type(value)),
            ));
            return;
        }

        if !self.allowed.is_empty() && !self.allowed.contains(value) {
            violations.push(Violation::new(path, "is not one of the allowed values"));
        }

        let measure = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => Some(s.chars().count() as f64),
            Value::Array(items) => Some(items.len() as f64),
            _ => None,
        };
        if let Some(measure) = measure {
            if let Some(min) = self.min {
                if measure < min {
                    violations.push(Violation::new(path, format!("must be at least {}", min)));
                }
            }
            if let Some(max) = self.max {
                if measure > max {
                    violations.push(Violation::new(path, format!("must be at most {}", max)));
                }
            }
        }

        if let (Some(pattern), Value::String(s)) = (&self.pattern, value) {
            if !pattern.is_match(s) {
                violations.push(Violation::new(
                    path,
                    format!("does not match pattern {}", pattern.as_str()),
                ));
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "\"{}\" {}", self.path, self.message)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.violations.iter().map(|v| v.to_string()).collect();
        f.write_str(&parts.join("; "))
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: BTreeMap<String, Field>,
    allow_unknown: bool,
}

impl Schema {
    pub fn new(fields: BTreeMap<String, Field>, allow_unknown: bool) -> Self {
        Self {
            fields,
            allow_unknown,
        }
    }

    pub fn fields(&self) -> &BTreeMap<String, Field> {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn allows_unknown(&self) -> bool {
        self.allow_unknown
    }

    /// Validates one record. The returned value is always the submitted data,
    /// with defaults filled in for absent fields when it is an object.
    pub fn validate(&self, data: &Value) -> (Value, Option<ValidationError>) {
        let object = match data {
            Value::Object(object) => object,
            other => {
                let violation = Violation::new(
                    "",
                    format!("value must be of type object but got {}", json_type(other)),
                );
                return (
                    other.clone(),
                    Some(ValidationError {
                        violations: vec![violation],
                    }),
                );
            }
        };

        let mut violations = Vec::new();
        let mut value: Map<String, Value> = object.clone();

        for (name, field) in &self.fields {
            match object.get(name) {
                Some(present) => field.check(name, present, &mut violations),
                None => {
                    if let Some(default) = &field.default {
                        value.insert(name.clone(), default.clone());
                    } else if field.required {
                        violations.push(Violation::new(name.as_str(), "is required"));
                    }
                }
            }
        }

        if !self.allow_unknown {
            for key in object.keys() {
                if !self.fields.contains_key(key) {
                    violations.push(Violation::new(key.as_str(), "is not allowed"));
                }
            }
        }

        let error = if violations.is_empty() {
            None
        } else {
            Some(ValidationError { violations })
        };
        (Value::Object(value), error)
    }
}
