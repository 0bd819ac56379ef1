use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex};

use super::schema::ValidationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    pub model: String,
    pub error: ValidationError,
    pub value: Value,
    pub at: DateTime<Utc>,
}

/// Accumulates field-level validation failures until [`FailureLog::reset`].
///
/// Clones share the same underlying list, so one log can be injected into
/// several models.
#[derive(Debug, Clone, Default)]
pub struct FailureLog {
    inner: Arc<Mutex<Vec<Failure>>>,
}

impl FailureLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, model: &str, error: ValidationError, value: Value) {
        let failure = Failure {
            model: model.to_string(),
            error,
            value,
            at: Utc::now(),
        };
        self.lock().push(failure);
    }

    pub fn snapshot(&self) -> Vec<Failure> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn reset(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Failure>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
