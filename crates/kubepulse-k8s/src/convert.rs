//! Conversion from k8s-openapi objects into kubepulse types
//!
//! Absent fields fall back to documented defaults instead of failing.

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Endpoints, Namespace, Node, Pod, Service};

use kubepulse_types::{
    ContainerStatus, DeploymentStatus, NamespaceInfo, NodeStatus, PodPhase, PodStatus,
    ServicePortInfo, ServiceStatus,
};

fn non_negative(value: Option<i32>) -> u32 {
    value.and_then(|v| u32::try_from(v).ok()).unwrap_or(0)
}

/// Convert a k8s Node to NodeStatus
pub(crate) fn node_status(node: Node) -> NodeStatus {
    let name = node.metadata.name.unwrap_or_default();
    let mut info = NodeStatus::new(name);

    if let Some(status) = node.status {
        for condition in status.conditions.unwrap_or_default() {
            info = info.with_condition(condition.type_, condition.status);
        }

        if let Some(capacity) = status.capacity {
            info.cpu_capacity = capacity.get("cpu").map(|q| q.0.clone());
            info.memory_capacity = capacity.get("memory").map(|q| q.0.clone());
            info.pods_capacity = capacity.get("pods").map(|q| q.0.clone());
        }
    }

    info
}

/// Convert a k8s Pod to PodStatus
pub(crate) fn pod_status(pod: Pod) -> PodStatus {
    let namespace = pod.metadata.namespace.unwrap_or_default();
    let name = pod.metadata.name.unwrap_or_default();
    let mut info = PodStatus::new(namespace, name);

    if let Some(spec) = &pod.spec {
        info.node_name = spec.node_name.clone();
    }

    if let Some(status) = pod.status {
        info.phase = status
            .phase
            .as_deref()
            .map(PodPhase::from)
            .unwrap_or(PodPhase::Unknown);

        // Missing container statuses mean "no containers reported yet"
        if let Some(container_statuses) = status.container_statuses {
            info.containers = container_statuses
                .into_iter()
                .map(|cs| {
                    let mut container = ContainerStatus::new(cs.name);
                    container.ready = cs.ready;
                    container.restart_count = non_negative(Some(cs.restart_count));
                    container
                })
                .collect();
        }
    }

    info
}

/// Convert a k8s Deployment to DeploymentStatus
pub(crate) fn deployment_status(deploy: Deployment) -> DeploymentStatus {
    let namespace = deploy.metadata.namespace.unwrap_or_default();
    let name = deploy.metadata.name.unwrap_or_default();
    let mut info = DeploymentStatus::new(namespace, name);

    if let Some(replicas) = deploy.spec.and_then(|s| s.replicas) {
        info.desired_replicas = u32::try_from(replicas).unwrap_or(0);
    }

    if let Some(status) = deploy.status {
        info.available_replicas = non_negative(status.available_replicas);
        info.unavailable_replicas = non_negative(status.unavailable_replicas);
    }

    info
}

/// Convert a k8s Service to ServiceStatus (endpoint count left unread)
pub(crate) fn service_status(svc: Service) -> ServiceStatus {
    let namespace = svc.metadata.namespace.unwrap_or_default();
    let name = svc.metadata.name.unwrap_or_default();
    let mut info = ServiceStatus::new(namespace, name);

    if let Some(spec) = svc.spec {
        if let Some(service_type) = spec.type_ {
            info.service_type = service_type;
        }
        info.cluster_ip = spec.cluster_ip;
        info.ports = spec
            .ports
            .unwrap_or_default()
            .into_iter()
            .map(|p| ServicePortInfo {
                name: p.name,
                port: p.port,
                protocol: p.protocol.unwrap_or_else(|| "TCP".to_string()),
            })
            .collect();
    }

    info
}

/// Count ready addresses across all subsets
pub(crate) fn ready_endpoint_count(endpoints: &Endpoints) -> u32 {
    endpoints
        .subsets
        .iter()
        .flatten()
        .map(|subset| subset.addresses.as_ref().map_or(0, Vec::len))
        .sum::<usize>()
        .try_into()
        .unwrap_or(u32::MAX)
}

pub(crate) fn namespace_info(ns: Namespace) -> NamespaceInfo {
    let name = ns.metadata.name.unwrap_or_default();
    let phase = ns
        .status
        .and_then(|s| s.phase)
        .unwrap_or_else(|| "Unknown".to_string());
    NamespaceInfo::new(name, phase)
}
