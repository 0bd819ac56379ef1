use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ContinuumError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct OperationStats {
    pub total: u64,
    pub failed: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub validation_failures: u64,
}

#[derive(Clone)]
pub struct MetricsCollector {
    registry: Arc<Registry>,
    operations: CounterVec,
    failures: CounterVec,
    cache_hits: CounterVec,
    cache_misses: CounterVec,
    validation_failures: CounterVec,
    duration: HistogramVec,
}

impl MetricsCollector {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let operations = CounterVec::new(
            Opts::new("continuum_operations_total", "Total number of domain operations"),
            &["domain", "operation"],
        )?;
        let failures = CounterVec::new(
            Opts::new("continuum_operation_failures_total", "Domain operations that rejected"),
            &["domain", "operation"],
        )?;
        let cache_hits = CounterVec::new(
            Opts::new("continuum_cache_hits_total", "Reads served from the store"),
            &["domain"],
        )?;
        let cache_misses = CounterVec::new(
            Opts::new("continuum_cache_misses_total", "Reads that fell back to the resource"),
            &["domain"],
        )?;
        let validation_failures = CounterVec::new(
            Opts::new("continuum_validation_failures_total", "Records that failed schema validation"),
            &["domain"],
        )?;
        let duration = HistogramVec::new(
            HistogramOpts::new("continuum_operation_duration_seconds", "Operation duration in seconds")
                .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["domain", "operation"],
        )?;

        registry.register(Box::new(operations.clone()))?;
        registry.register(Box::new(failures.clone()))?;
        registry.register(Box::new(cache_hits.clone()))?;
        registry.register(Box::new(cache_misses.clone()))?;
        registry.register(Box::new(validation_failures.clone()))?;
        registry.register(Box::new(duration.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            operations,
            failures,
            cache_hits,
            cache_misses,
            validation_failures,
            duration,
        })
    }

    pub fn record_operation(&self, domain: &str, operation: &str, elapsed: Duration, success: bool) {
        let labels = &[domain, operation];
        self.operations.with_label_values(labels).inc();
        self.duration
            .with_label_values(labels)
            .observe(elapsed.as_secs_f64());
        if !success {
            self.failures.with_label_values(labels).inc();
        }
    }

    pub fn record_cache_hit(&self, domain: &str) {
        self.cache_hits.with_label_values(&[domain]).inc();
    }

    pub fn record_cache_miss(&self, domain: &str) {
        self.cache_misses.with_label_values(&[domain]).inc();
    }

    pub fn record_validation_failures(&self, domain: &str, count: usize) {
        if count > 0 {
            self.validation_failures
                .with_label_values(&[domain])
                .inc_by(count as f64);
        }
    }

    pub fn export(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| ContinuumError::Unknown(e.to_string()))
    }

    /// Aggregates across operations for one domain. Reads gathered samples, so
    /// no empty series are created for labels that never ran.
    pub fn stats(&self, domain: &str) -> OperationStats {
        let families = self.registry.gather();
        let total = |name: &str| -> u64 {
            families
                .iter()
                .filter(|family| family.get_name() == name)
                .flat_map(|family| family.get_metric())
                .filter(|metric| {
                    metric
                        .get_label()
                        .iter()
                        .any(|label| label.get_name() == "domain" && label.get_value() == domain)
                })
                .map(|metric| metric.get_counter().get_value() as u64)
                .sum()
        };

        OperationStats {
            total: total("continuum_operations_total"),
            failed: total("continuum_operation_failures_total"),
            cache_hits: total("continuum_cache_hits_total"),
            cache_misses: total("continuum_cache_misses_total"),
            validation_failures: total("continuum_validation_failures_total"),
        }
    }
}
