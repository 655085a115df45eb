//! Shared types for kubepulse
//!
//! This crate contains the point-in-time cluster model read from the
//! Kubernetes API and the health indicators derived from it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Name of the node condition that decides readiness
pub const READY_CONDITION: &str = "Ready";

// ============================================================================
// Kubernetes Resource Types
// ============================================================================

/// Node readiness and capacity
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeStatus {
    pub name: String,
    /// Condition type -> condition status ("True", "False", "Unknown")
    pub conditions: BTreeMap<String, String>,
    pub cpu_capacity: Option<String>,
    pub memory_capacity: Option<String>,
    pub pods_capacity: Option<String>,
}

impl NodeStatus {
    pub fn new(name: String) -> Self {
        Self {
            name,
            conditions: BTreeMap::new(),
            cpu_capacity: None,
            memory_capacity: None,
            pods_capacity: None,
        }
    }

    pub fn with_condition(mut self, kind: impl Into<String>, status: impl Into<String>) -> Self {
        self.conditions.insert(kind.into(), status.into());
        self
    }

    /// True only when the Ready condition is present and exactly "True"
    pub fn ready(&self) -> bool {
        self.ready_condition() == Some("True")
    }

    /// Raw value of the Ready condition, if the node reports one
    pub fn ready_condition(&self) -> Option<&str> {
        self.conditions.get(READY_CONDITION).map(String::as_str)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl PodPhase {
    /// Running and Succeeded pods count as healthy, everything else does not
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Running | Self::Succeeded)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Unknown => "Unknown",
        }
    }
}

impl From<&str> for PodPhase {
    fn from(s: &str) -> Self {
        match s {
            "Pending" => Self::Pending,
            "Running" => Self::Running,
            "Succeeded" => Self::Succeeded,
            "Failed" => Self::Failed,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for PodPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerStatus {
    pub name: String,
    pub ready: bool,
    pub restart_count: u32,
}

impl ContainerStatus {
    pub fn new(name: String) -> Self {
        Self {
            name,
            ready: false,
            restart_count: 0,
        }
    }
}

/// Pod phase and per-container state
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PodStatus {
    pub namespace: String,
    pub name: String,
    pub phase: PodPhase,
    /// Empty when the API reported no container statuses
    pub containers: Vec<ContainerStatus>,
    pub node_name: Option<String>,
}

impl PodStatus {
    pub fn new(namespace: String, name: String) -> Self {
        Self {
            namespace,
            name,
            phase: PodPhase::Unknown,
            containers: Vec::new(),
            node_name: None,
        }
    }

    /// Sum of restart counts across all containers
    pub fn restart_count(&self) -> u64 {
        self.containers
            .iter()
            .map(|c| u64::from(c.restart_count))
            .sum()
    }

    pub fn ready_containers(&self) -> usize {
        self.containers.iter().filter(|c| c.ready).count()
    }

    pub fn total_containers(&self) -> usize {
        self.containers.len()
    }

    pub fn is_healthy(&self) -> bool {
        self.phase.is_healthy()
    }

    /// "namespace/name"
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

/// Deployment replica counts
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeploymentStatus {
    pub namespace: String,
    pub name: String,
    pub desired_replicas: u32,
    pub available_replicas: u32,
    pub unavailable_replicas: u32,
}

impl DeploymentStatus {
    pub fn new(namespace: String, name: String) -> Self {
        Self {
            namespace,
            name,
            desired_replicas: 1,
            available_replicas: 0,
            unavailable_replicas: 0,
        }
    }

    /// Format replica status as "available/desired"
    pub fn replica_status(&self) -> String {
        format!("{}/{}", self.available_replicas, self.desired_replicas)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServicePortInfo {
    pub name: Option<String>,
    pub port: i32,
    pub protocol: String,
}

/// Service addressing and endpoint readiness
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceStatus {
    pub namespace: String,
    pub name: String,
    pub service_type: String,
    pub cluster_ip: Option<String>,
    pub ports: Vec<ServicePortInfo>,
    /// Ready addresses across all endpoint subsets; None until endpoints are read
    pub ready_endpoint_count: Option<u32>,
}

impl ServiceStatus {
    pub fn new(namespace: String, name: String) -> Self {
        Self {
            namespace,
            name,
            service_type: "ClusterIP".to_string(),
            cluster_ip: None,
            ports: Vec::new(),
            ready_endpoint_count: None,
        }
    }
}

/// Namespace information
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamespaceInfo {
    pub name: String,
    pub phase: String,
}

impl NamespaceInfo {
    pub fn new(name: String, phase: String) -> Self {
        Self { name, phase }
    }
}

/// API server build information
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServerVersion {
    pub git_version: String,
    pub platform: String,
}

// ============================================================================
// Snapshot & Indicators
// ============================================================================

/// Everything read from the cluster during one tick
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClusterSnapshot {
    pub nodes: Vec<NodeStatus>,
    pub pods: Vec<PodStatus>,
    pub deployments: Vec<DeploymentStatus>,
    pub services: Vec<ServiceStatus>,
}

/// Which pods contribute to `total_pod_restarts`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartScope {
    /// Only pods whose phase is neither Running nor Succeeded
    #[default]
    UnhealthyPods,
    /// Every pod in the cluster
    AllPods,
}

impl RestartScope {
    pub fn includes(&self, pod: &PodStatus) -> bool {
        match self {
            Self::UnhealthyPods => !pod.is_healthy(),
            Self::AllPods => true,
        }
    }
}

/// Scalar health summary derived from a single snapshot
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthIndicators {
    pub unhealthy_node_count: u64,
    pub unhealthy_pod_count: u64,
    pub total_pod_restarts: u64,
    pub unavailable_deployment_replicas: u64,
}

impl fmt::Display for HealthIndicators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Nodes Unhealthy: {}, Pods Unhealthy: {}, Pod Restarts: {}, Deployments Unavailable: {}",
            self.unhealthy_node_count,
            self.unhealthy_pod_count,
            self.total_pod_restarts,
            self.unavailable_deployment_replicas
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_ready_tracks_condition() {
        let node = NodeStatus::new("n1".to_string()).with_condition("Ready", "True");
        assert!(node.ready());

        let node = node.with_condition("Ready", "Unknown");
        assert!(!node.ready());
        assert_eq!(node.ready_condition(), Some("Unknown"));
    }

    #[test]
    fn test_node_without_ready_condition_is_not_ready() {
        let node = NodeStatus::new("n1".to_string()).with_condition("MemoryPressure", "False");
        assert!(!node.ready());
        assert_eq!(node.ready_condition(), None);
    }

    #[test]
    fn test_ready_requires_exact_literal() {
        let node = NodeStatus::new("n1".to_string()).with_condition("Ready", "true");
        assert!(!node.ready());
    }

    #[test]
    fn test_ready_follows_condition_map_edits() {
        let mut node = NodeStatus::new("n1".to_string()).with_condition("Ready", "True");
        node.conditions.insert(READY_CONDITION.to_string(), "False".to_string());
        assert!(!node.ready());

        node.conditions.remove(READY_CONDITION);
        assert!(!node.ready());
    }

    #[test]
    fn test_pod_phase_parsing() {
        assert_eq!(PodPhase::from("Running"), PodPhase::Running);
        assert_eq!(PodPhase::from("Succeeded"), PodPhase::Succeeded);
        assert_eq!(PodPhase::from("CrashLoopBackOff"), PodPhase::Unknown);
        assert!(PodPhase::Succeeded.is_healthy());
        assert!(!PodPhase::Pending.is_healthy());
        assert!(!PodPhase::Unknown.is_healthy());
    }

    #[test]
    fn test_pod_container_counts() {
        let mut pod = PodStatus::new("default".to_string(), "web".to_string());
        assert_eq!(pod.restart_count(), 0);
        assert_eq!(pod.total_containers(), 0);

        let mut app = ContainerStatus::new("app".to_string());
        app.ready = true;
        app.restart_count = 3;
        let mut sidecar = ContainerStatus::new("sidecar".to_string());
        sidecar.restart_count = 4;
        pod.containers = vec![app, sidecar];

        assert_eq!(pod.restart_count(), 7);
        assert_eq!(pod.ready_containers(), 1);
        assert_eq!(pod.total_containers(), 2);
        assert_eq!(pod.qualified_name(), "default/web");
    }

    #[test]
    fn test_restart_scope_deserializes_snake_case() {
        let scope: RestartScope = serde_json::from_str("\"all_pods\"").unwrap();
        assert_eq!(scope, RestartScope::AllPods);
        assert_eq!(RestartScope::default(), RestartScope::UnhealthyPods);
    }

    #[test]
    fn test_indicators_display() {
        let indicators = HealthIndicators {
            unhealthy_node_count: 1,
            unhealthy_pod_count: 2,
            total_pod_restarts: 5,
            unavailable_deployment_replicas: 0,
        };
        assert_eq!(
            indicators.to_string(),
            "Nodes Unhealthy: 1, Pods Unhealthy: 2, Pod Restarts: 5, Deployments Unavailable: 0"
        );
    }
}
