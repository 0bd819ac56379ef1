/// Integration tests for domain orchestration

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use continuum_core::config::{DomainConfig, RequestConfig};
    use continuum_core::domain::{
        Domain, Envelope, FnService, Handler, MemoryStore, Members, Resource, Store, Subscription,
    };
    use continuum_core::error::{ContinuumError, Result};
    use continuum_core::model::{ContainerKind, Field, Model, ModelOverrides};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    type Calls = Arc<Mutex<Vec<String>>>;

    fn record(calls: &Calls, call: impl Into<String>) {
        calls.lock().unwrap().push(call.into());
    }

    /// Suffix naming the request path a collaborator received, if any.
    fn at(config: &RequestConfig) -> String {
        match &config.path {
            Some(path) => format!(" @{}", path),
            None => String::new(),
        }
    }

    struct MockResource {
        calls: Calls,
        response: Value,
        fail: bool,
    }

    impl MockResource {
        fn respond(&self, call: String) -> Result<Envelope> {
            record(&self.calls, call);
            if self.fail {
                return Err(ContinuumError::Status {
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }
            Ok(Envelope::ok(self.response.clone()))
        }
    }

    #[async_trait]
    impl Resource for MockResource {
        async fn get(&self, config: &RequestConfig) -> Result<Envelope> {
            self.respond(format!("resource.get{}", at(config)))
        }

        async fn put(&self, body: Value, config: &RequestConfig) -> Result<Envelope> {
            self.respond(format!("resource.put {}{}", body, at(config)))
        }

        async fn post(&self, body: Value, config: &RequestConfig) -> Result<Envelope> {
            self.respond(format!("resource.post {}{}", body, at(config)))
        }

        async fn delete(&self, data: &Value, config: &RequestConfig) -> Result<Envelope> {
            self.respond(format!("resource.delete {}{}", data, at(config)))
        }
    }

    /// Store that records every call and can be told to fail its read.
    struct MockStore {
        calls: Calls,
        cached: Option<Value>,
        inner: MemoryStore,
    }

    #[async_trait]
    impl Store for MockStore {
        async fn get(&self) -> Result<Value> {
            record(&self.calls, "store.get");
            match &self.cached {
                Some(value) => Ok(value.clone()),
                None => Err(ContinuumError::Store("connection reset".to_string())),
            }
        }

        async fn set(&self, data: Value, config: &RequestConfig) -> Result<Value> {
            record(&self.calls, format!("store.set {}{}", data, at(config)));
            self.inner.set(data, config).await
        }

        async fn remove(&self, data: &Value) -> Result<()> {
            record(&self.calls, format!("store.remove {}", data));
            self.inner.remove(data).await
        }

        fn subscribe(&self, handler: Handler) -> Subscription {
            self.inner.subscribe(handler)
        }

        fn unsubscribe(&self, subscription: &Subscription) -> bool {
            self.inner.unsubscribe(subscription)
        }

        async fn dispatch(&self, payload: Value) -> Result<Value> {
            record(&self.calls, format!("store.dispatch {}", payload));
            let payload = self.inner.dispatch(payload).await?;
            Ok(json!({"dispatched": payload}))
        }
    }

    struct Fixture {
        domain: Domain,
        calls: Calls,
    }

    fn fixture(cached: Option<Value>, response: Value, model: Model) -> Fixture {
        fixture_with(cached, response, model, false, FnService::new())
    }

    fn fixture_with(
        cached: Option<Value>,
        response: Value,
        model: Model,
        fail_resource: bool,
        service: FnService,
    ) -> Fixture {
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let resource = MockResource {
            calls: calls.clone(),
            response,
            fail: fail_resource,
        };
        let store = MockStore {
            calls: calls.clone(),
            cached,
            inner: MemoryStore::new(),
        };
        let domain = Domain::new(
            "users",
            Members::new()
                .resource(Arc::new(resource))
                .store(Arc::new(store))
                .service(Arc::new(service))
                .model(model),
            DomainConfig::default(),
        )
        .unwrap();
        Fixture { domain, calls }
    }

    fn single_model() -> Model {
        Model::builder("User")
            .field("id", Field::number().required())
            .allow_unknown(true)
            .kind(ContainerKind::Single)
            .build()
    }

    fn calls(fixture: &Fixture) -> Vec<String> {
        fixture.calls.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_get_serves_cache_without_resource() {
        let fx = fixture(Some(json!([{"id": 1}])), json!(null), single_model());

        let value = fx.domain.get(&RequestConfig::default()).await.unwrap();

        assert_eq!(value, json!([{"id": 1}]));
        assert_eq!(calls(&fx), vec!["store.get"]);
        assert_eq!(fx.domain.metrics().stats("users").cache_hits, 1);
    }

    #[tokio::test]
    async fn test_get_falls_back_in_order() {
        let fx = fixture(None, json!({"id": 1}), single_model());

        let value = fx.domain.get(&RequestConfig::default()).await.unwrap();

        assert_eq!(
            calls(&fx),
            vec![
                "store.get",
                "resource.get",
                r#"store.set {"id":1}"#,
                r#"store.dispatch {"id":1}"#,
            ]
        );
        assert_eq!(value, json!({"dispatched": {"id": 1}}));
        assert_eq!(fx.domain.metrics().stats("users").cache_misses, 1);
    }

    #[tokio::test]
    async fn test_get_applies_inbound_transform_after_validation() {
        let transforms = Arc::new(Mutex::new(0));
        let counter = transforms.clone();
        let service = FnService::new().on_inbound_get(move |mut data| {
            *counter.lock().unwrap() += 1;
            for item in data.as_array_mut().into_iter().flatten() {
                item["seen"] = json!(true);
            }
            Ok(data)
        });
        // `seen` is undeclared and unknown keys are rejected, so the record
        // only validates if the transform has not run yet.
        let model = Model::builder("User")
            .field("id", Field::number().required())
            .field("role", Field::string().default_value(json!("member")))
            .allow_unknown(false)
            .build();
        let fx = fixture_with(None, json!([{"id": 1}, {"id": 2}]), model, false, service);

        fx.domain.get(&RequestConfig::default()).await.unwrap();

        assert_eq!(*transforms.lock().unwrap(), 1);
        assert!(fx.domain.model().failed().is_empty());
        assert_eq!(fx.domain.metrics().stats("users").validation_failures, 0);
        let set = calls(&fx)
            .into_iter()
            .find(|c| c.starts_with("store.set"))
            .unwrap();
        assert_eq!(
            set,
            r#"store.set [{"id":1,"role":"member","seen":true},{"id":2,"role":"member","seen":true}]"#
        );
    }

    #[tokio::test]
    async fn test_get_stores_invalid_records_and_logs_failures() {
        let fx = fixture(None, json!({"id": "x"}), single_model());

        fx.domain.get(&RequestConfig::default()).await.unwrap();

        assert!(calls(&fx).contains(&r#"store.set {"id":"x"}"#.to_string()));
        assert_eq!(fx.domain.model().failed().len(), 1);
        assert_eq!(fx.domain.metrics().stats("users").validation_failures, 1);
    }

    #[tokio::test]
    async fn test_get_shape_mismatch_rejects_without_store_write() {
        let fx = fixture(None, json!({"id": 1}), single_model());
        let config = RequestConfig::new().model(ModelOverrides::kind(ContainerKind::Sequence));

        let err = fx.domain.get(&config).await.unwrap_err();

        assert!(matches!(err, ContinuumError::Fallback { .. }));
        assert!(matches!(err.root(), ContinuumError::Shape(_)));
        assert_eq!(calls(&fx), vec!["store.get", "resource.get"]);
    }

    #[tokio::test]
    async fn test_get_resource_failure_is_not_the_cache_miss() {
        let fx = fixture_with(None, json!(null), single_model(), true, FnService::new());

        let err = fx.domain.get(&RequestConfig::default()).await.unwrap_err();

        assert!(matches!(
            err.root(),
            ContinuumError::Status { status: 503, .. }
        ));
        assert_eq!(fx.domain.metrics().stats("users").failed, 1);
    }

    #[tokio::test]
    async fn test_get_bypass_skips_validation() {
        let fx = fixture(None, json!("raw"), single_model());
        let config = RequestConfig::new().model(ModelOverrides::bypass());

        fx.domain.get(&config).await.unwrap();

        assert!(calls(&fx).contains(&r#"store.set "raw""#.to_string()));
    }

    #[tokio::test]
    async fn test_update_sequence() {
        let service = FnService::new()
            .on_outbound_update(|mut data| {
                data["version"] = json!(2);
                Ok(data)
            })
            .on_inbound_update(|response, original| {
                let mut merged = original.clone();
                merged["saved"] = response.data["ok"].clone();
                Ok(merged)
            });
        let fx = fixture_with(None, json!({"ok": true}), single_model(), false, service);

        let value = fx
            .domain
            .update(json!({"id": 1}), &RequestConfig::default())
            .await
            .unwrap();

        assert_eq!(
            calls(&fx),
            vec![
                r#"resource.put {"id":1,"version":2}"#,
                r#"store.set {"id":1,"saved":true}"#,
                r#"store.dispatch {"id":1,"saved":true}"#,
            ]
        );
        assert_eq!(value, json!({"dispatched": {"id": 1, "saved": true}}));
    }

    #[tokio::test]
    async fn test_create_uses_post() {
        let fx = fixture(None, json!({"id": 10, "name": "ada"}), single_model());

        let value = fx
            .domain
            .create(json!({"name": "ada"}), &RequestConfig::default())
            .await
            .unwrap();

        assert_eq!(calls(&fx)[0], r#"resource.post {"name":"ada"}"#);
        assert_eq!(value["dispatched"]["id"], json!(10));
    }

    #[tokio::test]
    async fn test_write_failure_skips_store() {
        let fx = fixture_with(None, json!(null), single_model(), true, FnService::new());

        let err = fx
            .domain
            .create(json!({"name": "ada"}), &RequestConfig::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ContinuumError::Status { .. }));
        assert_eq!(calls(&fx).len(), 1);
    }

    #[tokio::test]
    async fn test_outbound_transform_failure_rejects_before_resource() {
        let service = FnService::new()
            .on_outbound_update(|_| Err(ContinuumError::Transform("missing id".to_string())));
        let fx = fixture_with(None, json!({}), single_model(), false, service);

        let err = fx
            .domain
            .update(json!({}), &RequestConfig::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ContinuumError::Transform(_)));
        assert!(calls(&fx).is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_original_data() {
        let fx = fixture(None, json!({"deleted": 1, "noise": true}), single_model());

        let value = fx
            .domain
            .delete(json!({"id": 1}), &RequestConfig::default())
            .await
            .unwrap();

        let log = calls(&fx);
        assert_eq!(
            log,
            vec![
                r#"resource.delete {"id":1}"#,
                r#"store.remove {"id":1}"#,
                r#"store.dispatch {"id":1}"#,
            ]
        );
        assert!(!log.iter().any(|c| c.starts_with("store.set")));
        assert_eq!(value, json!({"dispatched": {"id": 1}}));
    }

    #[tokio::test]
    async fn test_concurrent_gets_both_fetch() {
        let fx = fixture(None, json!({"id": 1}), single_model());
        let config = RequestConfig::default();

        let (a, b) = tokio::join!(fx.domain.get(&config), fx.domain.get(&config));
        assert!(a.is_ok() && b.is_ok());

        let fetches = calls(&fx).iter().filter(|c| *c == "resource.get").count();
        assert_eq!(fetches, 2);
    }

    #[tokio::test]
    async fn test_subscribe_and_dispatch_delegate_to_store() {
        let fx = fixture(None, json!(null), single_model());
        let seen = Arc::new(Mutex::new(0));

        let counter = seen.clone();
        let subscription = fx.domain.subscribe(Arc::new(move |_: &Value| {
            *counter.lock().unwrap() += 1;
        }));

        let out = fx.domain.dispatch(json!({"ping": 1})).await.unwrap();
        assert_eq!(out, json!({"dispatched": {"ping": 1}}));
        assert_eq!(*seen.lock().unwrap(), 1);
        assert!(fx.domain.unsubscribe(&subscription));
        assert!(!fx.domain.unsubscribe(&subscription));
    }

    #[tokio::test]
    async fn test_memory_store_round_trip_notifies_subscribers() {
        let store = Arc::new(MemoryStore::new());
        let resource = MockResource {
            calls: Arc::new(Mutex::new(Vec::new())),
            response: json!([{"id": 1}, {"id": 2}]),
            fail: false,
        };
        let domain = Domain::new(
            "users",
            Members::new()
                .resource(Arc::new(resource))
                .store(store.clone()),
            DomainConfig::default(),
        )
        .unwrap();

        let seen: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        domain.subscribe(Arc::new(move |payload: &Value| {
            sink.lock().unwrap().push(payload.clone());
        }));

        let fetched = domain.get(&RequestConfig::default()).await.unwrap();
        assert_eq!(fetched, json!([{"id": 1}, {"id": 2}]));

        // Second read is a cache hit.
        assert_eq!(domain.get(&RequestConfig::default()).await.unwrap(), fetched);
        assert_eq!(seen.lock().unwrap().len(), 1);

        domain
            .delete(json!({"id": 1}), &RequestConfig::default())
            .await
            .unwrap();
        assert_eq!(store.get().await.unwrap(), json!([{"id": 2}]));
        assert_eq!(seen.lock().unwrap().last(), Some(&json!({"id": 1})));
    }

    #[tokio::test]
    async fn test_get_threads_request_config_to_resource_and_store() {
        let fx = fixture(None, json!({"id": 7}), single_model());
        let config = RequestConfig::new().path("7");

        fx.domain.get(&config).await.unwrap();

        assert_eq!(
            calls(&fx),
            vec![
                "store.get",
                "resource.get @7",
                r#"store.set {"id":7} @7"#,
                r#"store.dispatch {"id":7}"#,
            ]
        );
    }

    #[tokio::test]
    async fn test_writes_thread_request_config_to_resource_and_store() {
        let fx = fixture(None, json!({"id": 7}), single_model());
        let config = RequestConfig::new().path("7");

        fx.domain.update(json!({"id": 7}), &config).await.unwrap();
        fx.domain.create(json!({"name": "ada"}), &config).await.unwrap();
        fx.domain.delete(json!({"id": 7}), &config).await.unwrap();

        assert_eq!(
            calls(&fx),
            vec![
                r#"resource.put {"id":7} @7"#,
                r#"store.set {"id":7} @7"#,
                r#"store.dispatch {"id":7}"#,
                r#"resource.post {"name":"ada"} @7"#,
                r#"store.set {"id":7} @7"#,
                r#"store.dispatch {"id":7}"#,
                r#"resource.delete {"id":7} @7"#,
                r#"store.remove {"id":7}"#,
                r#"store.dispatch {"id":7}"#,
            ]
        );
    }

    #[tokio::test]
    async fn test_update_with_merge_upserts_into_memory_store() {
        let store = Arc::new(
            MemoryStore::new().with_state(json!([{"id": 1, "name": "ada"}, {"id": 2, "name": "grace"}])),
        );
        let resource = MockResource {
            calls: Arc::new(Mutex::new(Vec::new())),
            response: json!({"id": 2, "name": "hopper"}),
            fail: false,
        };
        let domain = Domain::new(
            "users",
            Members::new()
                .resource(Arc::new(resource))
                .store(store.clone()),
            DomainConfig::default(),
        )
        .unwrap();

        let merged = domain
            .update(json!({"id": 2, "name": "hopper"}), &RequestConfig::new().merge(true))
            .await
            .unwrap();

        let expected = json!([{"id": 1, "name": "ada"}, {"id": 2, "name": "hopper"}]);
        assert_eq!(merged, expected);
        assert_eq!(store.get().await.unwrap(), expected);

        domain
            .update(json!({"id": 3}), &RequestConfig::default())
            .await
            .unwrap();
        assert_eq!(store.get().await.unwrap(), json!({"id": 2, "name": "hopper"}));
    }
}
