use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

use super::members::{Envelope, Resource};
use crate::config::{DomainConfig, RequestConfig};
use crate::error::{ContinuumError, Result};

pub struct HttpResource {
    client: Client,
    endpoint: String,
    token: Option<String>,
    headers: BTreeMap<String, String>,
}

impl HttpResource {
    pub fn new(name: &str, config: &DomainConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/{}", config.base_url.trim_end_matches('/'), name.trim_matches('/')),
            token: config.token.clone(),
            headers: config.headers.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, config: &RequestConfig) -> String {
        match &config.path {
            Some(path) => format!("{}/{}", self.endpoint, path.trim_start_matches('/')),
            None => self.endpoint.clone(),
        }
    }

    fn request(&self, method: Method, config: &RequestConfig) -> RequestBuilder {
        let mut req = self.client.request(method, self.url(config));
        if !config.query.is_empty() {
            req = req.query(&config.query);
        }
        for (name, value) in self.headers.iter().chain(config.headers.iter()) {
            req = req.header(name.as_str(), value.as_str());
        }
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn send(&self, req: RequestBuilder) -> Result<Envelope> {
        let response = req.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ContinuumError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let data = if body.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&body)?
        };
        Ok(Envelope {
            status: status.as_u16(),
            data,
        })
    }
}

#[async_trait]
impl Resource for HttpResource {
    async fn get(&self, config: &RequestConfig) -> Result<Envelope> {
        tracing::debug!(endpoint = %self.url(config), "GET");
        self.send(self.request(Method::GET, config)).await
    }

    async fn put(&self, body: Value, config: &RequestConfig) -> Result<Envelope> {
        tracing::debug!(endpoint = %self.url(config), "PUT");
        self.send(self.request(Method::PUT, config).json(&body)).await
    }

    async fn post(&self, body: Value, config: &RequestConfig) -> Result<Envelope> {
        tracing::debug!(endpoint = %self.url(config), "POST");
        self.send(self.request(Method::POST, config).json(&body)).await
    }

    async fn delete(&self, data: &Value, config: &RequestConfig) -> Result<Envelope> {
        tracing::debug!(endpoint = %self.url(config), "DELETE");
        self.send(self.request(Method::DELETE, config).json(data)).await
    }
}
