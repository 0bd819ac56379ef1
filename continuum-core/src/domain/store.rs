use async_trait::async_trait;
use serde_json::Value;
use std::sync::RwLock as StdRwLock;
use tokio::sync::{broadcast, RwLock};

use super::members::{Handler, Store, Subscription};
use crate::config::RequestConfig;
use crate::error::{ContinuumError, Result};

pub struct MemoryStore {
    state: RwLock<Option<Value>>,
    key_field: String,
    handlers: StdRwLock<Vec<(Subscription, Handler)>>,
    events: broadcast::Sender<Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_options("id", 64)
    }

    pub fn with_options(key_field: impl Into<String>, buffer: usize) -> Self {
        let (events, _) = broadcast::channel(buffer.max(1));
        Self {
            state: RwLock::new(None),
            key_field: key_field.into(),
            handlers: StdRwLock::new(Vec::new()),
            events,
        }
    }

    pub fn with_state(self, state: Value) -> Self {
        Self {
            state: RwLock::new(Some(state)),
            ..self
        }
    }

    pub fn events(&self) -> broadcast::Receiver<Value> {
        self.events.subscribe()
    }

    pub async fn clear(&self) {
        *self.state.write().await = None;
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.read().map(|h| h.len()).unwrap_or(0)
    }

    fn key_of<'a>(&self, record: &'a Value) -> Option<&'a Value> {
        record.get(&self.key_field)
    }

    fn same_record(&self, a: &Value, b: &Value) -> bool {
        match (self.key_of(a), self.key_of(b)) {
            (Some(ka), Some(kb)) => ka == kb,
            (None, None) => a == b,
            _ => false,
        }
    }

    fn upsert(&self, items: &mut Vec<Value>, record: Value) {
        match items.iter_mut().find(|item| self.same_record(item, &record)) {
            Some(existing) => *existing = record,
            None => items.push(record),
        }
    }

    fn merge(&self, current: Option<Value>, incoming: Value) -> Value {
        match (current, incoming) {
            (Some(Value::Object(mut current)), Value::Object(incoming)) => {
                current.extend(incoming);
                Value::Object(current)
            }
            (Some(Value::Array(mut items)), Value::Array(incoming)) => {
                for record in incoming {
                    self.upsert(&mut items, record);
                }
                Value::Array(items)
            }
            (Some(Value::Array(mut items)), record @ Value::Object(_)) => {
                self.upsert(&mut items, record);
                Value::Array(items)
            }
            (_, incoming) => incoming,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self) -> Result<Value> {
        self.state.read().await.clone().ok_or(ContinuumError::CacheMiss)
    }

    async fn set(&self, data: Value, config: &RequestConfig) -> Result<Value> {
        let mut state = self.state.write().await;
        let next = if config.merge {
            self.merge(state.take(), data)
        } else {
            data
        };
        *state = Some(next.clone());
        Ok(next)
    }

    async fn remove(&self, data: &Value) -> Result<()> {
        let targets: Vec<&Value> = match data {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        };

        let mut state = self.state.write().await;
        let evict = match state.as_mut() {
            Some(Value::Array(items)) => {
                items.retain(|item| !targets.iter().any(|t| self.same_record(item, t)));
                false
            }
            Some(current) => targets.iter().any(|t| self.same_record(current, t)),
            None => false,
        };
        if evict {
            *state = None;
        }
        Ok(())
    }

    fn subscribe(&self, handler: Handler) -> Subscription {
        let subscription = Subscription::new();
        match self.handlers.write() {
            Ok(mut handlers) => handlers.push((subscription, handler)),
            Err(poisoned) => poisoned.into_inner().push((subscription, handler)),
        }
        subscription
    }

    fn unsubscribe(&self, subscription: &Subscription) -> bool {
        let mut handlers = match self.handlers.write() {
            Ok(handlers) => handlers,
            Err(poisoned) => poisoned.into_inner(),
        };
        let before = handlers.len();
        handlers.retain(|(s, _)| s != subscription);
        handlers.len() != before
    }

    async fn dispatch(&self, payload: Value) -> Result<Value> {
        let handlers: Vec<Handler> = self
            .handlers
            .read()
            .map_err(|_| ContinuumError::Store("subscriber registry poisoned".to_string()))?
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();

        for handler in handlers {
            handler(&payload);
        }
        // No receivers is not an error.
        let _ = self.events.send(payload.clone());
        Ok(payload)
    }
}
