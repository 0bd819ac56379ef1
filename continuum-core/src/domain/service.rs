use serde_json::Value;

use super::members::{Envelope, Service};
use crate::error::{ContinuumError, Result};

#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityService;

impl Service for IdentityService {}

type Hook = Box<dyn Fn(Value) -> Result<Value> + Send + Sync>;
type InboundHook = Box<dyn Fn(Envelope, &Value) -> Result<Value> + Send + Sync>;

/// A [`Service`] assembled from closures. Unset hooks fall back to identity.
#[derive(Default)]
pub struct FnService {
    inbound_get: Option<Hook>,
    inbound_update: Option<InboundHook>,
    inbound_create: Option<InboundHook>,
    outbound_update: Option<Hook>,
    outbound_create: Option<Hook>,
}

impl FnService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_inbound_get<F>(mut self, hook: F) -> Self
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.inbound_get = Some(Box::new(hook));
        self
    }

    pub fn on_inbound_update<F>(mut self, hook: F) -> Self
    where
        F: Fn(Envelope, &Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.inbound_update = Some(Box::new(hook));
        self
    }

    pub fn on_inbound_create<F>(mut self, hook: F) -> Self
    where
        F: Fn(Envelope, &Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.inbound_create = Some(Box::new(hook));
        self
    }

    pub fn on_outbound_update<F>(mut self, hook: F) -> Self
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.outbound_update = Some(Box::new(hook));
        self
    }

    pub fn on_outbound_create<F>(mut self, hook: F) -> Self
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.outbound_create = Some(Box::new(hook));
        self
    }
}

impl Service for FnService {
    fn inbound_get(&self, data: Value) -> Result<Value> {
        match &self.inbound_get {
            Some(hook) => hook(data),
            None => Ok(data),
        }
    }

    fn inbound_update(&self, response: Envelope, data: &Value) -> Result<Value> {
        match &self.inbound_update {
            Some(hook) => hook(response, data),
            None => Ok(response.data),
        }
    }

    fn inbound_create(&self, response: Envelope, data: &Value) -> Result<Value> {
        match &self.inbound_create {
            Some(hook) => hook(response, data),
            None => Ok(response.data),
        }
    }

    fn outbound_update(&self, data: Value) -> Result<Value> {
        match &self.outbound_update {
            Some(hook) => hook(data),
            None => Ok(data),
        }
    }

    fn outbound_create(&self, data: Value) -> Result<Value> {
        match &self.outbound_create {
            Some(hook) => hook(data),
            None => Ok(data),
        }
    }
}

pub fn transform_error(reason: impl std::fmt::Display) -> ContinuumError {
    ContinuumError::Transform(reason.to_string())
}
