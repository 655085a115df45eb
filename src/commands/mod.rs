//! Subcommand implementations
//!
//! Report commands write to any `io::Write` so their output can be checked
//! in tests; `main` hands them a locked stdout.

pub mod alerts;
pub mod check;
pub mod export;
pub mod report;
pub mod usage;

use anyhow::{Context, Result};
use std::io::{self, Write};

use kubepulse_prom::PrometheusClient;

use crate::config::PrometheusSettings;

const RULE_WIDTH: usize = 60;

/// Title between two full-width rules
fn banner(out: &mut impl Write, title: &str) -> io::Result<()> {
    writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;
    writeln!(out, "{}", title)?;
    writeln!(out, "{}", "=".repeat(RULE_WIDTH))
}

/// Section heading with a leading blank line
fn section(out: &mut impl Write, title: &str) -> io::Result<()> {
    writeln!(out)?;
    banner(out, title)
}

/// Build a Prometheus client and make sure the server answers
pub(crate) async fn connect_prometheus(settings: &PrometheusSettings) -> Result<PrometheusClient> {
    let client = PrometheusClient::new(&settings.url)
        .with_query_timeout(settings.query_timeout())
        .with_status_timeout(settings.status_timeout());

    client.check_connection().await.with_context(|| {
        format!(
            "Cannot connect to Prometheus at {}. Is a port-forward running?",
            client.base_url()
        )
    })?;

    tracing::debug!(url = client.base_url(), "connected to prometheus");
    Ok(client)
}

#[cfg(test)]
pub(crate) mod fake {
    //! Fixed in-memory cluster for command tests

    use std::collections::HashSet;

    use kubepulse_k8s::{ClusterSource, ReadError, ReadResult};
    use kubepulse_types::{
        ClusterSnapshot, ContainerStatus, DeploymentStatus, NamespaceInfo, NodeStatus, PodPhase,
        PodStatus, ServerVersion, ServiceStatus,
    };

    #[derive(Default)]
    pub struct StaticCluster {
        pub snapshot: ClusterSnapshot,
        pub namespaces: Vec<NamespaceInfo>,
        pub version: ServerVersion,
        /// Namespaces whose pod list fails
        pub broken_namespaces: HashSet<String>,
        pub nodes_unreachable: bool,
    }

    pub fn pod(namespace: &str, name: &str, phase: PodPhase, ready: &[bool]) -> PodStatus {
        let mut pod = PodStatus::new(namespace.to_string(), name.to_string());
        pod.phase = phase;
        pod.node_name = Some("worker-1".to_string());
        pod.containers = ready
            .iter()
            .enumerate()
            .map(|(i, &ready)| {
                let mut container = ContainerStatus::new(format!("c{}", i));
                container.ready = ready;
                container
            })
            .collect();
        pod
    }

    pub fn node(name: &str, ready: Option<&str>) -> NodeStatus {
        let node = NodeStatus::new(name.to_string());
        match ready {
            Some(status) => node.with_condition("Ready", status),
            None => node,
        }
    }

    impl ClusterSource for StaticCluster {
        async fn list_nodes(&self) -> ReadResult<Vec<NodeStatus>> {
            if self.nodes_unreachable {
                return Err(ReadError::Unavailable("connection refused".to_string()));
            }
            Ok(self.snapshot.nodes.clone())
        }

        async fn list_pods_all_namespaces(&self) -> ReadResult<Vec<PodStatus>> {
            Ok(self.snapshot.pods.clone())
        }

        async fn list_pods_in_namespace(&self, namespace: &str) -> ReadResult<Vec<PodStatus>> {
            if self.broken_namespaces.contains(namespace) {
                return Err(ReadError::Unavailable(format!(
                    "namespace {} is not readable",
                    namespace
                )));
            }
            Ok(self
                .snapshot
                .pods
                .iter()
                .filter(|p| p.namespace == namespace)
                .cloned()
                .collect())
        }

        async fn list_deployments_all_namespaces(&self) -> ReadResult<Vec<DeploymentStatus>> {
            Ok(self.snapshot.deployments.clone())
        }

        async fn list_services_all_namespaces(&self) -> ReadResult<Vec<ServiceStatus>> {
            Ok(self.snapshot.services.clone())
        }

        async fn list_services_in_namespace(
            &self,
            namespace: &str,
        ) -> ReadResult<Vec<ServiceStatus>> {
            Ok(self
                .snapshot
                .services
                .iter()
                .filter(|s| s.namespace == namespace)
                .cloned()
                .collect())
        }

        async fn read_endpoints(&self, service: &str, namespace: &str) -> ReadResult<u32> {
            Ok(self
                .snapshot
                .services
                .iter()
                .find(|s| s.name == service && s.namespace == namespace)
                .and_then(|s| s.ready_endpoint_count)
                .unwrap_or(0))
        }

        async fn list_namespaces(&self) -> ReadResult<Vec<NamespaceInfo>> {
            Ok(self.namespaces.clone())
        }

        async fn server_version(&self) -> ReadResult<ServerVersion> {
            Ok(self.version.clone())
        }
    }
}
