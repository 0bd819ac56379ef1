use thiserror::Error;
use reqwest::Error as ReqwestError;
use serde_json::Error as JsonError;
use std::io::Error as IoError;

use crate::model::ShapeError;

#[derive(Error, Debug)]
pub enum ContinuumError {
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] JsonError),

    #[error("IO error: {0}")]
    Io(#[from] IoError),

    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Cache miss")]
    CacheMiss,

    #[error("Store error: {0}")]
    Store(String),

    #[error("Transform error: {0}")]
    Transform(String),

    #[error("Resource responded with {status}: {body}")]
    Status { status: u16, body: String },

    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error("Fetch for domain {domain} failed after cache miss: {source}")]
    Fallback {
        domain: String,
        #[source]
        source: Box<ContinuumError>,
    },

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl ContinuumError {
    /// Unwraps a [`ContinuumError::Fallback`] to the failure that caused it.
    pub fn root(&self) -> &ContinuumError {
        match self {
            ContinuumError::Fallback { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<anyhow::Error> for ContinuumError {
    fn from(err: anyhow::Error) -> Self {
        ContinuumError::Unknown(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ContinuumError>;
