//! Response models for the Prometheus HTTP API

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Common envelope around every `/api/v1` response
#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse<T> {
    pub status: String,
    pub data: Option<T>,
    #[serde(rename = "errorType")]
    pub error_type: Option<String>,
    pub error: Option<String>,
}

/// `data` of an instant query, tagged by `resultType`
#[derive(Debug, Deserialize)]
#[serde(tag = "resultType", content = "result", rename_all = "lowercase")]
pub(crate) enum QueryData {
    Vector(Vec<RawSample>),
    Scalar((f64, String)),
    Matrix(serde_json::Value),
    String(serde_json::Value),
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawSample {
    #[serde(default)]
    pub metric: BTreeMap<String, String>,
    pub value: (f64, String),
}

/// One element of an instant-query result
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub labels: BTreeMap<String, String>,
    /// Evaluation time, seconds since the epoch
    pub timestamp: f64,
    pub value: f64,
}

impl Sample {
    /// Label value, if present
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// Label value or "unknown"
    pub fn label_or_unknown(&self, key: &str) -> &str {
        self.label(key).unwrap_or("unknown")
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RulesData {
    #[serde(default)]
    pub groups: Vec<RuleGroup>,
}

/// A rule group as loaded by Prometheus
#[derive(Clone, Debug, Deserialize)]
pub struct RuleGroup {
    pub name: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl RuleGroup {
    /// Only the alerting rules of this group
    pub fn alerting_rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(|r| r.is_alerting())
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Rule {
    /// "alerting" or "recording"
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub health: Option<String>,
}

impl Rule {
    pub fn is_alerting(&self) -> bool {
        self.kind == "alerting"
    }

    pub fn severity(&self) -> &str {
        self.labels.get("severity").map_or("unknown", String::as_str)
    }

    pub fn category(&self) -> &str {
        self.labels.get("category").map_or("unknown", String::as_str)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AlertsData {
    #[serde(default)]
    pub alerts: Vec<Alert>,
}

/// A pending or firing alert
#[derive(Clone, Debug, Deserialize)]
pub struct Alert {
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(rename = "activeAt", default)]
    pub active_at: Option<DateTime<Utc>>,
}

impl Alert {
    pub fn name(&self) -> &str {
        self.labels.get("alertname").map_or("Unknown", String::as_str)
    }

    pub fn severity(&self) -> &str {
        self.labels.get("severity").map_or("unknown", String::as_str)
    }

    pub fn summary(&self) -> &str {
        self.annotations
            .get("summary")
            .map_or("No summary", String::as_str)
    }

    pub fn state(&self) -> &str {
        self.state.as_deref().unwrap_or("unknown")
    }
}
