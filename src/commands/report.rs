//! One-shot cluster report

use anyhow::{Context, Result};
use clap::ValueEnum;
use std::collections::BTreeMap;
use std::io::Write;

use kubepulse_k8s::ClusterSource;
use kubepulse_types::{
    DeploymentStatus, NamespaceInfo, NodeStatus, PodPhase, PodStatus, ServerVersion,
    ServiceStatus,
};

use super::{banner, section};
use crate::config::ReportSettings;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Section {
    Version,
    Nodes,
    Namespaces,
    Pods,
    Deployments,
    Services,
}

/// Print the selected sections, or all of them when none are selected
pub async fn run<S: ClusterSource>(
    source: &S,
    sections: &[Section],
    settings: &ReportSettings,
    out: &mut impl Write,
) -> Result<()> {
    let wants = |s: Section| sections.is_empty() || sections.contains(&s);

    banner(out, "KUBERNETES CLUSTER REPORT")?;

    if wants(Section::Version) {
        let version = source
            .server_version()
            .await
            .context("Failed to read server version")?;
        write_version(out, &version)?;
    }

    if wants(Section::Nodes) {
        let nodes = source.list_nodes().await.context("Failed to list nodes")?;
        write_nodes(out, &nodes)?;
    }

    if wants(Section::Namespaces) {
        let namespaces = source
            .list_namespaces()
            .await
            .context("Failed to list namespaces")?;
        write_namespaces(out, &namespaces)?;
    }

    if wants(Section::Pods) {
        let pods = source
            .list_pods_all_namespaces()
            .await
            .context("Failed to list pods")?;
        write_pod_summary(out, &pods)?;
        write_problem_pods(out, &pods)?;

        let detail: Vec<_> = pods
            .iter()
            .filter(|p| p.namespace == settings.detail_namespace)
            .collect();
        write_pod_detail(out, &settings.detail_namespace, &detail)?;
    }

    if wants(Section::Deployments) {
        let deployments = source
            .list_deployments_all_namespaces()
            .await
            .context("Failed to list deployments")?;
        write_deployments(out, &deployments)?;
    }

    if wants(Section::Services) {
        let mut services = source
            .list_services_in_namespace(&settings.detail_namespace)
            .await
            .with_context(|| {
                format!(
                    "Failed to list services in namespace {}",
                    settings.detail_namespace
                )
            })?;

        for svc in &mut services {
            match source.read_endpoints(&svc.name, &svc.namespace).await {
                Ok(count) => svc.ready_endpoint_count = Some(count),
                Err(e) => {
                    tracing::warn!(service = %svc.name, error = %e, "could not read endpoints");
                }
            }
        }
        write_services(out, &settings.detail_namespace, &services)?;
    }

    writeln!(out)?;
    writeln!(out, "{}", "=".repeat(60))?;
    Ok(())
}

fn write_version(out: &mut impl Write, version: &ServerVersion) -> std::io::Result<()> {
    writeln!(out)?;
    writeln!(out, "📌 Kubernetes Version: {}", version.git_version)?;
    writeln!(out, "📌 Platform: {}", version.platform)
}

fn write_nodes(out: &mut impl Write, nodes: &[NodeStatus]) -> std::io::Result<()> {
    section(out, "NODES")?;

    for node in nodes {
        let icon = if node.ready() { "✅" } else { "❌" };
        writeln!(out, "\n{} Node: {}", icon, node.name)?;
        writeln!(out, "   Ready: {}", node.ready_condition().unwrap_or("unknown"))?;

        let others: Vec<_> = node
            .conditions
            .iter()
            .filter(|(kind, _)| kind.as_str() != kubepulse_types::READY_CONDITION)
            .map(|(kind, status)| format!("{}={}", kind, status))
            .collect();
        if !others.is_empty() {
            writeln!(out, "   Conditions: {}", others.join(", "))?;
        }

        writeln!(out, "   CPU: {}", capacity(&node.cpu_capacity))?;
        writeln!(out, "   Memory: {}", capacity(&node.memory_capacity))?;
        writeln!(out, "   Pods: {}", capacity(&node.pods_capacity))?;
    }
    Ok(())
}

fn capacity(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("unknown")
}

fn write_namespaces(out: &mut impl Write, namespaces: &[NamespaceInfo]) -> std::io::Result<()> {
    section(out, "NAMESPACES")?;
    writeln!(out, "\nTotal Namespaces: {}\n", namespaces.len())?;
    for ns in namespaces {
        writeln!(out, "  • {} ({})", ns.name, ns.phase)?;
    }
    Ok(())
}

/// Count of pods per phase, in phase order
fn phase_counts(pods: &[PodStatus]) -> BTreeMap<PodPhase, usize> {
    let mut counts = BTreeMap::new();
    for pod in pods {
        *counts.entry(pod.phase).or_insert(0) += 1;
    }
    counts
}

fn write_pod_summary(out: &mut impl Write, pods: &[PodStatus]) -> std::io::Result<()> {
    section(out, "POD HEALTH")?;
    writeln!(out, "\n📊 Total Pods: {}", pods.len())?;
    writeln!(out, "\n📈 Pod Status Summary:")?;
    for (phase, count) in phase_counts(pods) {
        let icon = if phase == PodPhase::Running { "✅" } else { "⚠️" };
        writeln!(out, "   {} {}: {}", icon, phase, count)?;
    }
    Ok(())
}

/// Pods in any namespace that have restarted or are not in a healthy phase
fn write_problem_pods(out: &mut impl Write, pods: &[PodStatus]) -> std::io::Result<()> {
    let problems: Vec<_> = pods
        .iter()
        .filter(|p| p.restart_count() > 0 || !p.is_healthy())
        .collect();

    writeln!(out, "\n🔁 Pods With Restarts Or Issues: {}", problems.len())?;
    for pod in problems {
        writeln!(
            out,
            "   {:<45} {:<10} {}",
            pod.qualified_name(),
            pod.phase.as_str(),
            pod.restart_count()
        )?;
    }
    Ok(())
}

fn write_pod_detail(
    out: &mut impl Write,
    namespace: &str,
    pods: &[&PodStatus],
) -> std::io::Result<()> {
    section(out, &format!("{} NAMESPACE PODS", namespace.to_uppercase()))?;

    if pods.is_empty() {
        writeln!(out, "\nNo pods in namespace {}", namespace)?;
    }

    for pod in pods {
        let icon = if pod.phase == PodPhase::Running { "✅" } else { "❌" };
        writeln!(out, "\n{} {}", icon, pod.name)?;
        writeln!(out, "   Status: {}", pod.phase)?;
        writeln!(
            out,
            "   Containers: {}/{} ready",
            pod.ready_containers(),
            pod.total_containers()
        )?;
        writeln!(out, "   Restarts: {}", pod.restart_count())?;
        writeln!(out, "   Node: {}", pod.node_name.as_deref().unwrap_or("<none>"))?;
    }
    Ok(())
}

fn write_deployments(
    out: &mut impl Write,
    deployments: &[DeploymentStatus],
) -> std::io::Result<()> {
    section(out, "DEPLOYMENTS")?;
    writeln!(out)?;
    writeln!(
        out,
        "{:<45} {:<10} {:<10} {:<12}",
        "Namespace/Deployment", "Desired", "Available", "Unavailable"
    )?;
    writeln!(out, "{}", "─".repeat(80))?;

    for deploy in deployments {
        let icon = if deploy.unavailable_replicas == 0 { "✅" } else { "❌" };
        writeln!(
            out,
            "{:<45} {:<10} {:<10} {:<12} {}",
            format!("{}/{}", deploy.namespace, deploy.name),
            deploy.desired_replicas,
            deploy.available_replicas,
            deploy.unavailable_replicas,
            icon
        )?;
    }
    Ok(())
}

fn write_services(
    out: &mut impl Write,
    namespace: &str,
    services: &[ServiceStatus],
) -> std::io::Result<()> {
    section(out, "SERVICES")?;
    writeln!(
        out,
        "\n📊 Services in '{}' namespace: {}\n",
        namespace,
        services.len()
    )?;

    for svc in services {
        writeln!(out, "🔹 Service: {}", svc.name)?;
        writeln!(out, "   Type: {}", svc.service_type)?;
        writeln!(
            out,
            "   Cluster IP: {}",
            svc.cluster_ip.as_deref().unwrap_or("None")
        )?;
        match svc.ready_endpoint_count {
            Some(count) => writeln!(out, "   Ready Endpoints: {}", count)?,
            None => writeln!(out, "   Ready Endpoints: unknown")?,
        }

        if !svc.ports.is_empty() {
            writeln!(out, "   Ports:")?;
            for port in &svc.ports {
                writeln!(
                    out,
                    "      • {}: {}/{}",
                    port.name.as_deref().unwrap_or("unnamed"),
                    port.port,
                    port.protocol
                )?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}
