//! Configuration file support
//!
//! Every key is optional. A missing file section falls back to the defaults
//! the tools have always used; command-line flags win over the file.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use kubepulse_sampler::{ExporterConfig, SamplerConfig};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub kube: KubeSettings,
    pub sampler: SamplerConfig,
    pub exporter: ExporterConfig,
    pub prometheus: PrometheusSettings,
    pub check: CheckSettings,
    pub report: ReportSettings,
}

/// `[kube]`
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KubeSettings {
    /// Kubeconfig context; the current context when unset
    pub context: Option<String>,
}

/// `[prometheus]`
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrometheusSettings {
    pub url: String,
    pub query_timeout_secs: u64,
    pub status_timeout_secs: u64,
}

impl Default for PrometheusSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:9090".to_string(),
            query_timeout_secs: 10,
            status_timeout_secs: 5,
        }
    }
}

impl PrometheusSettings {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs.max(1))
    }

    pub fn status_timeout(&self) -> Duration {
        Duration::from_secs(self.status_timeout_secs.max(1))
    }
}

/// `[check]`
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckSettings {
    pub critical_namespaces: Vec<String>,
}

impl Default for CheckSettings {
    fn default() -> Self {
        Self {
            critical_namespaces: vec!["kube-system".to_string(), "monitoring".to_string()],
        }
    }
}

/// `[report]`
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportSettings {
    /// Namespace whose pods and services are listed in detail
    pub detail_namespace: String,
    /// Rows in the top-pods tables of the usage report
    pub top_pods: usize,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            detail_namespace: "monitoring".to_string(),
            top_pods: 10,
        }
    }
}

impl Config {
    /// Load from a TOML file, or defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Apply the global command-line overrides
    pub fn override_with(&mut self, context: Option<String>, prometheus_url: Option<String>) {
        if let Some(context) = context {
            self.kube.context = Some(context);
        }
        if let Some(url) = prometheus_url {
            self.prometheus.url = url;
        }
    }
}
