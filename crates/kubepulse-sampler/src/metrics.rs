//! Prometheus gauges for cluster health
//!
//! Exposes:
//! - `cluster_node_unhealthy` - nodes whose Ready condition is not "True"
//! - `cluster_pod_unhealthy` - pods not Running or Succeeded
//! - `cluster_pod_restart_total` - container restarts for the configured pod subset
//! - `cluster_deployment_unavailable_replicas` - unavailable replicas across deployments
//!
//! The four gauges are written together under one lock and read together
//! under the same lock, so a scrape sees either the previous tick or the
//! current one, never a mix.

use parking_lot::RwLock;
use prometheus::{Encoder, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

use kubepulse_types::HealthIndicators;

use crate::exporter::{ExportError, Exporter};

/// Owned registry holding the health gauges
pub struct MetricsRegistry {
    registry: Registry,
    node_unhealthy: IntGauge,
    pod_unhealthy: IntGauge,
    pod_restarts: IntGauge,
    deployment_unavailable: IntGauge,
    /// Held for writing while a tick updates, for reading while a scrape encodes
    update: RwLock<()>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let node_unhealthy = IntGauge::new("cluster_node_unhealthy", "Number of unhealthy nodes")?;
        let pod_unhealthy = IntGauge::new("cluster_pod_unhealthy", "Number of unhealthy pods")?;
        let pod_restarts = IntGauge::new(
            "cluster_pod_restart_total",
            "Total container restarts for the sampled pods",
        )?;
        let deployment_unavailable = IntGauge::new(
            "cluster_deployment_unavailable_replicas",
            "Number of unavailable replicas across deployments",
        )?;

        registry.register(Box::new(node_unhealthy.clone()))?;
        registry.register(Box::new(pod_unhealthy.clone()))?;
        registry.register(Box::new(pod_restarts.clone()))?;
        registry.register(Box::new(deployment_unavailable.clone()))?;

        Ok(Self {
            registry,
            node_unhealthy,
            pod_unhealthy,
            pod_restarts,
            deployment_unavailable,
            update: RwLock::new(()),
        })
    }

    /// Overwrite all gauges with one tick's indicators
    pub fn set(&self, indicators: &HealthIndicators) {
        let _guard = self.update.write();
        self.node_unhealthy.set(gauge_value(indicators.unhealthy_node_count));
        self.pod_unhealthy.set(gauge_value(indicators.unhealthy_pod_count));
        self.pod_restarts.set(gauge_value(indicators.total_pod_restarts));
        self.deployment_unavailable
            .set(gauge_value(indicators.unavailable_deployment_replicas));
    }

    /// Current gauge values
    pub fn current(&self) -> HealthIndicators {
        let _guard = self.update.read();
        HealthIndicators {
            unhealthy_node_count: self.node_unhealthy.get().max(0) as u64,
            unhealthy_pod_count: self.pod_unhealthy.get().max(0) as u64,
            total_pod_restarts: self.pod_restarts.get().max(0) as u64,
            unavailable_deployment_replicas: self.deployment_unavailable.get().max(0) as u64,
        }
    }

    /// Encode metrics as text for scraping
    pub fn encode(&self) -> Result<String, ExportError> {
        let metric_families = {
            let _guard = self.update.read();
            self.registry.gather()
        };

        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| ExportError::Encode(prometheus::Error::Msg(e.to_string())))
    }
}

fn gauge_value(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Exporter that updates the gauges of a shared registry
pub struct MetricsSink {
    registry: Arc<MetricsRegistry>,
}

impl MetricsSink {
    pub fn new(registry: Arc<MetricsRegistry>) -> Self {
        Self { registry }
    }
}

impl Exporter for MetricsSink {
    fn name(&self) -> &'static str {
        "metrics"
    }

    fn publish(&self, indicators: &HealthIndicators) -> Result<(), ExportError> {
        self.registry.set(indicators);
        Ok(())
    }
}
