//! Client for the Prometheus HTTP API

use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::model::{
    Alert, AlertsData, ApiResponse, QueryData, RawSample, RuleGroup, RulesData, Sample,
};

/// Default timeout for instant queries
const QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for status, rules and alerts requests
const STATUS_TIMEOUT: Duration = Duration::from_secs(5);

/// Client errors
#[derive(Debug, thiserror::Error)]
pub enum PrometheusError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Query error ({error_type}): {error}")]
    Query { error_type: String, error: String },
}

/// Prometheus HTTP API client
#[derive(Clone)]
pub struct PrometheusClient {
    base_url: String,
    client: reqwest::Client,
    query_timeout: Duration,
    status_timeout: Duration,
}

impl PrometheusClient {
    /// Create new client
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client: reqwest::Client::new(),
            query_timeout: QUERY_TIMEOUT,
            status_timeout: STATUS_TIMEOUT,
        }
    }

    /// Set query timeout
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Set timeout for status, rules and alerts requests
    pub fn with_status_timeout(mut self, timeout: Duration) -> Self {
        self.status_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check that the server answers its status endpoint
    pub async fn check_connection(&self) -> Result<(), PrometheusError> {
        let url = format!("{}/api/v1/status/config", self.base_url);

        let response = self
            .client
            .get(&url)
            .timeout(self.status_timeout)
            .send()
            .await
            .map_err(|e| PrometheusError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(PrometheusError::Server {
                status: status.as_u16(),
                message,
            })
        }
    }

    /// Evaluate an instant query
    pub async fn query(&self, expr: &str) -> Result<Vec<Sample>, PrometheusError> {
        tracing::debug!(query = expr, "prometheus query");

        let data: QueryData = self
            .get("/api/v1/query", &[("query", expr)], self.query_timeout)
            .await?;

        match data {
            QueryData::Vector(samples) => samples.into_iter().map(to_sample).collect(),
            QueryData::Scalar((timestamp, value)) => Ok(vec![Sample {
                labels: Default::default(),
                timestamp,
                value: parse_value(&value)?,
            }]),
            QueryData::Matrix(_) | QueryData::String(_) => Err(PrometheusError::Parse(
                "unsupported result type for instant query".to_string(),
            )),
        }
    }

    /// Fetch all rule groups
    pub async fn rules(&self) -> Result<Vec<RuleGroup>, PrometheusError> {
        let data: RulesData = self.get("/api/v1/rules", &[], self.status_timeout).await?;
        Ok(data.groups)
    }

    /// Fetch currently pending and firing alerts
    pub async fn alerts(&self) -> Result<Vec<Alert>, PrometheusError> {
        let data: AlertsData = self.get("/api/v1/alerts", &[], self.status_timeout).await?;
        Ok(data.alerts)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<T, PrometheusError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .query(params)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| PrometheusError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PrometheusError::Network(e.to_string()))?;

        // Error envelopes come with 4xx/5xx; prefer their message when present
        let envelope: ApiResponse<T> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(e) if status.is_success() => return Err(PrometheusError::Parse(e.to_string())),
            Err(_) => {
                return Err(PrometheusError::Server {
                    status: status.as_u16(),
                    message: body,
                });
            }
        };

        if envelope.status != "success" {
            return Err(PrometheusError::Query {
                error_type: envelope.error_type.unwrap_or_else(|| "unknown".to_string()),
                error: envelope.error.unwrap_or_default(),
            });
        }

        envelope
            .data
            .ok_or_else(|| PrometheusError::Parse("response has no data".to_string()))
    }
}

fn parse_value(value: &str) -> Result<f64, PrometheusError> {
    value
        .parse::<f64>()
        .map_err(|e| PrometheusError::Parse(format!("invalid sample value '{}': {}", value, e)))
}

fn to_sample(raw: RawSample) -> Result<Sample, PrometheusError> {
    let (timestamp, value) = raw.value;
    Ok(Sample {
        labels: raw.metric,
        timestamp,
        value: parse_value(&value)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn server_with(route: &str, status: u16, body: serde_json::Value) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_query_vector() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/query"))
            .and(query_param("query", "count(kube_pod_info) by (namespace)"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": {
                    "resultType": "vector",
                    "result": [
                        {"metric": {"namespace": "monitoring"}, "value": [1700000000.5, "12"]},
                        {"metric": {"namespace": "kube-system"}, "value": [1700000000.5, "7"]}
                    ]
                }
            })))
            .mount(&server)
            .await;

        let client = PrometheusClient::new(server.uri());
        let samples = client
            .query("count(kube_pod_info) by (namespace)")
            .await
            .unwrap();

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].label("namespace"), Some("monitoring"));
        assert_eq!(samples[0].value, 12.0);
        assert_eq!(samples[0].timestamp, 1700000000.5);
        assert_eq!(samples[1].label_or_unknown("pod"), "unknown");
    }

    #[tokio::test]
    async fn test_query_scalar() {
        let server = server_with(
            "/api/v1/query",
            200,
            json!({
                "status": "success",
                "data": {"resultType": "scalar", "result": [1700000000, "0.25"]}
            }),
        )
        .await;

        let samples = PrometheusClient::new(server.uri())
            .query("scalar(1)")
            .await
            .unwrap();
        assert_eq!(samples.len(), 1);
        assert!(samples[0].labels.is_empty());
        assert_eq!(samples[0].value, 0.25);
    }

    #[tokio::test]
    async fn test_query_nan_value() {
        let server = server_with(
            "/api/v1/query",
            200,
            json!({
                "status": "success",
                "data": {"resultType": "vector", "result": [
                    {"metric": {}, "value": [1700000000, "NaN"]}
                ]}
            }),
        )
        .await;

        let samples = PrometheusClient::new(server.uri()).query("x").await.unwrap();
        assert!(samples[0].value.is_nan());
    }

    #[tokio::test]
    async fn test_query_error_envelope() {
        let server = server_with(
            "/api/v1/query",
            400,
            json!({
                "status": "error",
                "errorType": "bad_data",
                "error": "parse error at char 4"
            }),
        )
        .await;

        let err = PrometheusClient::new(server.uri())
            .query("sum(")
            .await
            .unwrap_err();
        match err {
            PrometheusError::Query { error_type, error } => {
                assert_eq!(error_type, "bad_data");
                assert!(error.contains("parse error"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/query"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = PrometheusClient::new(server.uri())
            .query("up")
            .await
            .unwrap_err();
        assert!(matches!(err, PrometheusError::Server { status: 502, .. }));
    }

    #[tokio::test]
    async fn test_check_connection() {
        let server = server_with("/api/v1/status/config", 200, json!({"status": "success"})).await;
        let client = PrometheusClient::new(format!("{}/", server.uri()));
        assert!(client.check_connection().await.is_ok());
        assert_eq!(client.base_url(), server.uri());
    }

    #[tokio::test]
    async fn test_check_connection_unreachable() {
        let client = PrometheusClient::new("http://127.0.0.1:9")
            .with_status_timeout(Duration::from_millis(500));
        let err = client.check_connection().await.unwrap_err();
        assert!(matches!(err, PrometheusError::Network(_)));
    }

    #[tokio::test]
    async fn test_rules() {
        let server = server_with(
            "/api/v1/rules",
            200,
            json!({
                "status": "success",
                "data": {"groups": [{
                    "name": "kubernetes-apps",
                    "file": "/etc/prometheus/rules.yaml",
                    "rules": [
                        {"type": "alerting", "name": "KubePodCrashLooping", "query": "x",
                         "labels": {"severity": "warning", "category": "pods"}},
                        {"type": "recording", "name": "job:up:sum", "query": "sum(up)"}
                    ]
                }]}
            }),
        )
        .await;

        let groups = PrometheusClient::new(server.uri()).rules().await.unwrap();
        assert_eq!(groups.len(), 1);
        let alerting: Vec<_> = groups[0].alerting_rules().collect();
        assert_eq!(alerting.len(), 1);
        assert_eq!(alerting[0].severity(), "warning");
        assert_eq!(alerting[0].category(), "pods");
    }

    #[tokio::test]
    async fn test_alerts() {
        let server = server_with(
            "/api/v1/alerts",
            200,
            json!({
                "status": "success",
                "data": {"alerts": [{
                    "labels": {"alertname": "NodeDown", "severity": "critical"},
                    "annotations": {"summary": "Node worker-1 is down"},
                    "state": "firing",
                    "activeAt": "2024-01-15T10:30:00.123456789Z",
                    "value": "1e+00"
                }]}
            }),
        )
        .await;

        let alerts = PrometheusClient::new(server.uri()).alerts().await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].name(), "NodeDown");
        assert_eq!(alerts[0].severity(), "critical");
        assert_eq!(alerts[0].summary(), "Node worker-1 is down");
        assert_eq!(alerts[0].state(), "firing");
        assert!(alerts[0].active_at.is_some());
    }
}
