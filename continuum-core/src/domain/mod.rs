pub mod members;
pub mod resource;
pub mod service;
pub mod store;

pub use members::{Envelope, Handler, Resource, Service, Store, Subscription};
pub use resource::HttpResource;
pub use service::{transform_error, FnService, IdentityService};
pub use store::MemoryStore;

use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::config::{DomainConfig, RequestConfig};
use crate::error::{ContinuumError, Result};
use crate::log_domain;
use crate::model::{Model, ModelConfig};
use crate::observability::MetricsCollector;

pub type Component = Arc<dyn Any + Send + Sync>;

#[derive(Default)]
pub struct Members {
    pub service: Option<Arc<dyn Service>>,
    pub resource: Option<Arc<dyn Resource>>,
    pub store: Option<Arc<dyn Store>>,
    pub model: Option<Model>,
    pub components: HashMap<String, Component>,
    pub constants: HashMap<String, Value>,
}

impl Members {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn service(mut self, service: Arc<dyn Service>) -> Self {
        self.service = Some(service);
        self
    }

    pub fn resource(mut self, resource: Arc<dyn Resource>) -> Self {
        self.resource = Some(resource);
        self
    }

    pub fn store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn model(mut self, model: Model) -> Self {
        self.model = Some(model);
        self
    }

    pub fn component(mut self, name: impl Into<String>, component: Component) -> Self {
        self.components.insert(name.into(), component);
        self
    }

    pub fn constant(mut self, name: impl Into<String>, value: Value) -> Self {
        self.constants.insert(name.into(), value);
        self
    }
}

#[derive(Debug, Clone, Copy)]
enum WriteKind {
    Update,
    Create,
}

impl WriteKind {
    fn operation(&self) -> &'static str {
        match self {
            WriteKind::Update => "update",
            WriteKind::Create => "create",
        }
    }
}

pub struct Domain {
    name: String,
    service: Arc<dyn Service>,
    resource: Arc<dyn Resource>,
    store: Arc<dyn Store>,
    model: Model,
    components: HashMap<String, Component>,
    constants: HashMap<String, Value>,
    metrics: MetricsCollector,
}

impl Domain {
    pub fn new(name: impl Into<String>, members: Members, config: DomainConfig) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ContinuumError::InvalidConfig(
                "please provide a name for your domain".to_string(),
            ));
        }
        config.check()?;

        let resource: Arc<dyn Resource> = match members.resource {
            Some(resource) => resource,
            None => Arc::new(HttpResource::new(&name, &config)?),
        };
        let store: Arc<dyn Store> = members.store.unwrap_or_else(|| {
            Arc::new(MemoryStore::with_options(config.key_field.clone(), config.event_buffer))
        });
        let model = members.model.unwrap_or_else(|| {
            Model::builder("Model")
                .allow_unknown(true)
                .config(ModelConfig::default().merged(&config.model))
                .build()
        });

        let service: Arc<dyn Service> =
            members.service.unwrap_or_else(|| Arc::new(IdentityService));

        log_domain!(debug, name.as_str(), model = model.name(), "domain assembled");

        Ok(Self {
            name,
            service,
            resource,
            store,
            model,
            components: members.components,
            constants: members.constants,
            metrics: MetricsCollector::new()?,
        })
    }

    pub fn with_metrics(mut self, metrics: MetricsCollector) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.get(name)
    }

    pub fn constant(&self, name: &str) -> Option<&Value> {
        self.constants.get(name)
    }

    pub fn constants(&self) -> &HashMap<String, Value> {
        &self.constants
    }

    /// Cache-first read.
    ///
    /// A failed store read is treated as a miss and never surfaced. Failures
    /// after that point come back wrapped in [`ContinuumError::Fallback`].
    pub async fn get(&self, config: &RequestConfig) -> Result<Value> {
        let started = Instant::now();
        let result = match self.store.get().await {
            Ok(cached) => {
                self.metrics.record_cache_hit(&self.name);
                log_domain!(debug, self.name(), "served from store");
                Ok(cached)
            }
            Err(miss) => {
                self.metrics.record_cache_miss(&self.name);
                log_domain!(debug, self.name(), reason = %miss, "store read failed, fetching from resource");
                self.fetch(config).await.map_err(|source| ContinuumError::Fallback {
                    domain: self.name.clone(),
                    source: Box::new(source),
                })
            }
        };
        self.finish("get", started, result)
    }

    async fn fetch(&self, config: &RequestConfig) -> Result<Value> {
        let response = self.resource.get(config).await?;
        let validated = self.model.validate(response.data, &config.model)?;
        self.metrics
            .record_validation_failures(&self.name, validated.failures().len());

        let data = self.service.inbound_get(validated.into_value())?;
        let stored = self.store.set(data, config).await?;
        self.store.dispatch(stored).await
    }

    pub async fn update(&self, data: Value, config: &RequestConfig) -> Result<Value> {
        let started = Instant::now();
        let result = self.write(WriteKind::Update, data, config).await;
        self.finish("update", started, result)
    }

    pub async fn create(&self, data: Value, config: &RequestConfig) -> Result<Value> {
        let started = Instant::now();
        let result = self.write(WriteKind::Create, data, config).await;
        self.finish("create", started, result)
    }

    async fn write(&self, kind: WriteKind, data: Value, config: &RequestConfig) -> Result<Value> {
        let record = match kind {
            WriteKind::Update => {
                let body = self.service.outbound_update(data.clone())?;
                let response = self.resource.put(body, config).await?;
                self.service.inbound_update(response, &data)?
            }
            WriteKind::Create => {
                let body = self.service.outbound_create(data.clone())?;
                let response = self.resource.post(body, config).await?;
                self.service.inbound_create(response, &data)?
            }
        };
        log_domain!(debug, self.name(), operation = kind.operation(), "resource accepted write");

        let stored = self.store.set(record, config).await?;
        self.store.dispatch(stored).await
    }

    /// Deletes remotely, then evicts `data` (not the response) from the store
    /// and broadcasts it.
    pub async fn delete(&self, data: Value, config: &RequestConfig) -> Result<Value> {
        let started = Instant::now();
        let result = self.remove(data, config).await;
        self.finish("delete", started, result)
    }

    async fn remove(&self, data: Value, config: &RequestConfig) -> Result<Value> {
        let response = self.resource.delete(&data, config).await?;
        log_domain!(debug, self.name(), status = response.status, "resource accepted delete");

        self.store.remove(&data).await?;
        self.store.dispatch(data).await
    }

    pub fn subscribe(&self, handler: Handler) -> Subscription {
        self.store.subscribe(handler)
    }

    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        self.store.unsubscribe(subscription)
    }

    pub async fn dispatch(&self, payload: Value) -> Result<Value> {
        self.store.dispatch(payload).await
    }

    fn finish(&self, operation: &'static str, started: Instant, result: Result<Value>) -> Result<Value> {
        let elapsed = started.elapsed();
        self.metrics
            .record_operation(&self.name, operation, elapsed, result.is_ok());
        match &result {
            Ok(_) => {
                log_domain!(info, self.name(), operation, elapsed_ms = elapsed.as_millis() as u64, "operation resolved");
            }
            Err(err) => {
                log_domain!(error, self.name(), operation, error = %err, "operation rejected");
            }
        }
        result
    }
}
