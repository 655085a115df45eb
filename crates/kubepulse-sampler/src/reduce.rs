//! Snapshot → indicator reduction

use kubepulse_types::{ClusterSnapshot, HealthIndicators, RestartScope};

/// Reduce a snapshot to its health indicators.
///
/// Pure function of its inputs: the same snapshot always yields the same
/// indicators.
pub fn reduce(snapshot: &ClusterSnapshot, scope: RestartScope) -> HealthIndicators {
    // Absent Ready condition counts as not ready
    let unhealthy_node_count = snapshot
        .nodes
        .iter()
        .filter(|node| !node.ready())
        .count() as u64;

    let unhealthy_pod_count = snapshot
        .pods
        .iter()
        .filter(|pod| !pod.is_healthy())
        .count() as u64;

    let total_pod_restarts = snapshot
        .pods
        .iter()
        .filter(|pod| scope.includes(pod))
        .map(|pod| pod.restart_count())
        .sum();

    let unavailable_deployment_replicas = snapshot
        .deployments
        .iter()
        .map(|d| u64::from(d.unavailable_replicas))
        .sum();

    HealthIndicators {
        unhealthy_node_count,
        unhealthy_pod_count,
        total_pod_restarts,
        unavailable_deployment_replicas,
    }
}
