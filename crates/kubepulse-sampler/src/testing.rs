//! In-memory cluster source and fixtures for tests

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use kubepulse_k8s::{ClusterSource, ReadError, ReadResult};
use kubepulse_types::{
    ClusterSnapshot, ContainerStatus, DeploymentStatus, NamespaceInfo, NodeStatus, PodPhase,
    PodStatus, ServerVersion, ServiceStatus,
};

use crate::sampler::SourceKind;

pub fn node(name: &str, ready: Option<&str>) -> NodeStatus {
    let node = NodeStatus::new(name.to_string()).with_condition("DiskPressure", "False");
    match ready {
        Some(status) => node.with_condition("Ready", status),
        None => node,
    }
}

pub fn pod(name: &str, phase: PodPhase, restarts: &[u32]) -> PodStatus {
    let mut pod = PodStatus::new("default".to_string(), name.to_string());
    pod.phase = phase;
    pod.containers = restarts
        .iter()
        .enumerate()
        .map(|(i, &count)| {
            let mut container = ContainerStatus::new(format!("c{}", i));
            container.ready = phase == PodPhase::Running;
            container.restart_count = count;
            container
        })
        .collect();
    pod
}

pub fn deployment(name: &str, desired: u32, unavailable: u32) -> DeploymentStatus {
    let mut deploy = DeploymentStatus::new("default".to_string(), name.to_string());
    deploy.desired_replicas = desired;
    deploy.available_replicas = desired - unavailable;
    deploy.unavailable_replicas = unavailable;
    deploy
}

pub fn service(name: &str) -> ServiceStatus {
    ServiceStatus::new("default".to_string(), name.to_string())
}

/// Cluster source backed by a mutable snapshot
#[derive(Default)]
pub struct FakeSource {
    snapshot: Mutex<ClusterSnapshot>,
    endpoints: Mutex<HashMap<String, u32>>,
    failing: Mutex<Option<SourceKind>>,
    /// Remaining transient failures injected into list_nodes
    flaky_nodes: AtomicUsize,
    node_delay: Mutex<Option<Duration>>,
    node_calls: AtomicUsize,
}

impl FakeSource {
    pub fn new(snapshot: ClusterSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
            ..Default::default()
        }
    }

    pub fn set_snapshot(&self, snapshot: ClusterSnapshot) {
        *self.snapshot.lock() = snapshot;
    }

    pub fn set_endpoints(&self, service: &str, count: u32) {
        self.endpoints.lock().insert(service.to_string(), count);
    }

    pub fn fail(&self, kind: SourceKind) {
        *self.failing.lock() = Some(kind);
    }

    pub fn recover(&self) {
        *self.failing.lock() = None;
    }

    pub fn flaky_nodes(&self, failures: usize) {
        self.flaky_nodes.store(failures, Ordering::SeqCst);
    }

    pub fn delay_nodes(&self, delay: Duration) {
        *self.node_delay.lock() = Some(delay);
    }

    pub fn node_calls(&self) -> usize {
        self.node_calls.load(Ordering::SeqCst)
    }

    fn check(&self, kind: SourceKind) -> ReadResult<()> {
        if *self.failing.lock() == Some(kind) {
            return Err(ReadError::Unavailable(format!("injected {} failure", kind)));
        }
        Ok(())
    }
}

impl ClusterSource for FakeSource {
    async fn list_nodes(&self) -> ReadResult<Vec<NodeStatus>> {
        self.node_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.node_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let remaining = self.flaky_nodes.load(Ordering::SeqCst);
        if remaining > 0 {
            self.flaky_nodes.store(remaining - 1, Ordering::SeqCst);
            return Err(ReadError::Unavailable("connection reset".to_string()));
        }
        self.check(SourceKind::Nodes)?;
        Ok(self.snapshot.lock().nodes.clone())
    }

    async fn list_pods_all_namespaces(&self) -> ReadResult<Vec<PodStatus>> {
        self.check(SourceKind::Pods)?;
        Ok(self.snapshot.lock().pods.clone())
    }

    async fn list_pods_in_namespace(&self, namespace: &str) -> ReadResult<Vec<PodStatus>> {
        self.check(SourceKind::Pods)?;
        Ok(self
            .snapshot
            .lock()
            .pods
            .iter()
            .filter(|p| p.namespace == namespace)
            .cloned()
            .collect())
    }

    async fn list_deployments_all_namespaces(&self) -> ReadResult<Vec<DeploymentStatus>> {
        self.check(SourceKind::Deployments)?;
        Ok(self.snapshot.lock().deployments.clone())
    }

    async fn list_services_all_namespaces(&self) -> ReadResult<Vec<ServiceStatus>> {
        self.check(SourceKind::Services)?;
        Ok(self.snapshot.lock().services.clone())
    }

    async fn list_services_in_namespace(&self, namespace: &str) -> ReadResult<Vec<ServiceStatus>> {
        self.check(SourceKind::Services)?;
        Ok(self
            .snapshot
            .lock()
            .services
            .iter()
            .filter(|s| s.namespace == namespace)
            .cloned()
            .collect())
    }

    async fn read_endpoints(&self, service: &str, _namespace: &str) -> ReadResult<u32> {
        self.check(SourceKind::Endpoints)?;
        Ok(self.endpoints.lock().get(service).copied().unwrap_or(0))
    }

    async fn list_namespaces(&self) -> ReadResult<Vec<NamespaceInfo>> {
        Ok(vec![NamespaceInfo::new(
            "default".to_string(),
            "Active".to_string(),
        )])
    }

    async fn server_version(&self) -> ReadResult<ServerVersion> {
        Ok(ServerVersion::default())
    }
}
