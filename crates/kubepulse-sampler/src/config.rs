use serde::Deserialize;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use kubepulse_types::RestartScope;

use crate::exporter::ConsoleFormat;

/// Sampling loop settings (`[sampler]`)
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SamplerConfig {
    /// Seconds between tick starts
    pub interval_secs: u64,
    /// Upper bound for every single cluster read
    pub call_timeout_secs: u64,
    pub restart_scope: RestartScope,
    /// Also list services and read their endpoints each tick
    pub include_services: bool,
    /// Extra attempts for transient read failures
    pub retry_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            call_timeout_secs: 10,
            restart_scope: RestartScope::default(),
            include_services: false,
            retry_attempts: 0,
            retry_backoff_ms: 500,
        }
    }
}

impl SamplerConfig {
    /// Tick interval, never shorter than one second
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs.max(1))
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    Metrics,
    Console,
}

/// Export settings (`[exporter]`)
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExporterConfig {
    pub sinks: Vec<SinkKind>,
    /// Address of the scrape listener
    pub listen: SocketAddr,
    pub console_format: ConsoleFormat,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            sinks: vec![SinkKind::Metrics, SinkKind::Console],
            listen: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8000)),
            console_format: ConsoleFormat::default(),
        }
    }
}

impl ExporterConfig {
    pub fn wants(&self, kind: SinkKind) -> bool {
        self.sinks.contains(&kind)
    }
}
