use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::RequestConfig;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub status: u16,
    pub data: Value,
}

impl Envelope {
    pub fn ok(data: Value) -> Self {
        Self { status: 200, data }
    }
}

pub trait Service: Send + Sync {
    fn inbound_get(&self, data: Value) -> Result<Value> {
        Ok(data)
    }

    fn inbound_update(&self, response: Envelope, _data: &Value) -> Result<Value> {
        Ok(response.data)
    }

    fn inbound_create(&self, response: Envelope, _data: &Value) -> Result<Value> {
        Ok(response.data)
    }

    fn outbound_update(&self, data: Value) -> Result<Value> {
        Ok(data)
    }

    fn outbound_create(&self, data: Value) -> Result<Value> {
        Ok(data)
    }
}

#[async_trait]
pub trait Resource: Send + Sync {
    async fn get(&self, config: &RequestConfig) -> Result<Envelope>;
    async fn put(&self, body: Value, config: &RequestConfig) -> Result<Envelope>;
    async fn post(&self, body: Value, config: &RequestConfig) -> Result<Envelope>;
    async fn delete(&self, data: &Value, config: &RequestConfig) -> Result<Envelope>;
}

pub type Handler = Arc<dyn Fn(&Value) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    id: Uuid,
}

impl Subscription {
    pub fn new() -> Self {
        Self { id: Uuid::new_v4() }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Default for Subscription {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Full read. A cold cache is an error, typically
    /// [`ContinuumError::CacheMiss`](crate::ContinuumError::CacheMiss).
    async fn get(&self) -> Result<Value>;
    async fn set(&self, data: Value, config: &RequestConfig) -> Result<Value>;
    async fn remove(&self, data: &Value) -> Result<()>;
    fn subscribe(&self, handler: Handler) -> Subscription;
    fn unsubscribe(&self, subscription: &Subscription) -> bool;
    async fn dispatch(&self, payload: Value) -> Result<Value>;
}
