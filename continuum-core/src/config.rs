use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{ContinuumError, Result};
use crate::model::ModelOverrides;

pub const ENV_BASE_URL: &str = "CONTINUUM_BASE_URL";
pub const ENV_TOKEN: &str = "CONTINUUM_TOKEN";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub token: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub key_field: String,
    pub event_buffer: usize,
    pub model: ModelOverrides,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost".to_string(),
            timeout_secs: 30,
            token: None,
            headers: BTreeMap::new(),
            key_field: "id".to_string(),
            event_buffer: 64,
            model: ModelOverrides::default(),
        }
    }
}

impl DomainConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: DomainConfig = toml::from_str(content)?;
        config.check()?;
        Ok(config)
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_toml_str(&content)
    }

    /// Overrides the base URL and token from `CONTINUUM_BASE_URL` and
    /// `CONTINUUM_TOKEN` when they are set.
    pub fn with_env(mut self) -> Self {
        if let Ok(url) = std::env::var(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Ok(token) = std::env::var(ENV_TOKEN) {
            self.token = Some(token);
        }
        self
    }

    pub fn check(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(ContinuumError::InvalidConfig("base_url cannot be empty".to_string()));
        }
        if self.key_field.is_empty() {
            return Err(ContinuumError::InvalidConfig("key_field cannot be empty".to_string()));
        }
        if self.event_buffer == 0 {
            return Err(ContinuumError::InvalidConfig(
                "event_buffer must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    /// Appended to the resource endpoint, e.g. a record id.
    pub path: Option<String>,
    pub query: Vec<(String, String)>,
    pub headers: BTreeMap<String, String>,
    /// Merge into the cached state instead of replacing it.
    pub merge: bool,
    pub model: ModelOverrides,
}

impl RequestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn merge(mut self, merge: bool) -> Self {
        self.merge = merge;
        self
    }

    pub fn model(mut self, model: ModelOverrides) -> Self {
        self.model = model;
        self
    }
}
