//! Cluster health sampling and export for kubepulse
//!
//! This crate turns a [`ClusterSource`](kubepulse_k8s::ClusterSource) into
//! periodic [`HealthIndicators`](kubepulse_types::HealthIndicators) and
//! publishes them to Prometheus gauges and/or the console.

mod config;
mod exporter;
mod metrics;
mod reduce;
mod sampler;
mod scheduler;
mod server;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ExporterConfig, SamplerConfig, SinkKind};
pub use exporter::{ConsoleFormat, ConsoleSink, ExportError, Exporter, Fanout};
pub use metrics::{MetricsRegistry, MetricsSink};
pub use reduce::reduce;
pub use sampler::{CollectCause, CollectionError, Sampler, SourceKind};
pub use scheduler::{Scheduler, TickOutcome, TickStats};
pub use server::{MetricsServer, router};

// Re-export types used in our public API
pub use kubepulse_types::{ClusterSnapshot, HealthIndicators, RestartScope};
