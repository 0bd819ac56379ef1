pub mod failures;
pub mod instance;
pub mod schema;

pub use failures::{Failure, FailureLog};
pub use instance::{Validated, ValidatedInstance};
pub use schema::{json_type, Field, FieldKind, Schema, ValidationError, Violation};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    #[default]
    Sequence,
    Single,
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerKind::Sequence => f.write_str("array"),
            ContainerKind::Single => f.write_str("object"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub kind: ContainerKind,
    pub validate: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            kind: ContainerKind::Sequence,
            validate: true,
        }
    }
}

impl ModelConfig {
    pub fn merged(&self, overrides: &ModelOverrides) -> ModelConfig {
        ModelConfig {
            kind: overrides.kind.unwrap_or(self.kind),
            validate: overrides.validate.unwrap_or(self.validate),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelOverrides {
    pub kind: Option<ContainerKind>,
    pub validate: Option<bool>,
}

impl ModelOverrides {
    pub fn bypass() -> Self {
        Self {
            kind: None,
            validate: Some(false),
        }
    }

    pub fn kind(kind: ContainerKind) -> Self {
        Self {
            kind: Some(kind),
            validate: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Model {model} expected type {expected} but got {found}")]
pub struct ShapeError {
    pub model: String,
    pub expected: ContainerKind,
    pub found: &'static str,
}

pub struct ModelBuilder {
    name: String,
    fields: BTreeMap<String, Field>,
    allow_unknown: bool,
    config: ModelConfig,
    failures: Option<FailureLog>,
}

impl ModelBuilder {
    pub fn field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.fields.insert(name.into(), field);
        self
    }

    pub fn allow_unknown(mut self, allow: bool) -> Self {
        self.allow_unknown = allow;
        self
    }

    pub fn kind(mut self, kind: ContainerKind) -> Self {
        self.config.kind = kind;
        self
    }

    pub fn validate(mut self, validate: bool) -> Self {
        self.config.validate = validate;
        self
    }

    pub fn config(mut self, config: ModelConfig) -> Self {
        self.config = config;
        self
    }

    pub fn failure_log(mut self, log: FailureLog) -> Self {
        self.failures = Some(log);
        self
    }

    pub fn build(self) -> Model {
        Model {
            name: Arc::from(self.name),
            schema: Arc::new(Schema::new(self.fields, self.allow_unknown)),
            config: self.config,
            failures: self.failures.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Model {
    name: Arc<str>,
    schema: Arc<Schema>,
    config: ModelConfig,
    failures: FailureLog,
}

impl Model {
    pub fn builder(name: impl Into<String>) -> ModelBuilder {
        ModelBuilder {
            name: name.into(),
            fields: BTreeMap::new(),
            allow_unknown: false,
            config: ModelConfig::default(),
            failures: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config(&self) -> ModelConfig {
        self.config
    }

    pub fn failed(&self) -> Vec<Failure> {
        self.failures.snapshot()
    }

    pub fn failure_log(&self) -> &FailureLog {
        &self.failures
    }

    pub fn reset(&self) {
        self.failures.reset();
    }

    /// Validates a single record. Invalid input still yields an instance, carrying
    /// the submitted value and the error.
    pub fn factory(&self, data: Value) -> ValidatedInstance {
        let (value, error) = self.schema.validate(&data);
        if let Some(error) = &error {
            tracing::warn!(model = %self.name, error = %error, "record failed validation");
            self.failures.record(&self.name, error.clone(), value.clone());
        }
        ValidatedInstance::new(value, error)
    }

    pub fn validate(
        &self,
        data: Value,
        overrides: &ModelOverrides,
    ) -> Result<Validated, ShapeError> {
        let effective = self.config.merged(overrides);
        if !effective.validate {
            return Ok(Validated::Bypassed(data));
        }

        match (effective.kind, data) {
            (ContainerKind::Sequence, Value::Array(items)) => Ok(Validated::Many(
                items.into_iter().map(|item| self.factory(item)).collect(),
            )),
            (ContainerKind::Single, data @ Value::Object(_)) => {
                Ok(Validated::One(self.factory(data)))
            }
            (expected, data) => {
                let err = ShapeError {
                    model: self.name.to_string(),
                    expected,
                    found: json_type(&data),
                };
                tracing::error!(model = %self.name, %expected, found = err.found, "{}", err);
                Err(err)
            }
        }
    }
}
