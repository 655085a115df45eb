//! Resource usage report from Prometheus

use anyhow::Result;
use std::collections::BTreeMap;
use std::io::Write;

use kubepulse_prom::{PrometheusClient, Sample};

use super::section;

const TOTAL_CPU: &str =
    r#"sum(rate(container_cpu_usage_seconds_total{container!="",container!="POD"}[5m]))"#;
const TOTAL_MEMORY: &str = r#"sum(container_memory_usage_bytes{container!="",container!="POD"})"#;
const TOTAL_PODS: &str = "count(kube_pod_info)";
const TOTAL_NODES: &str = "count(kube_node_info)";

const NODE_CPU_PERCENT: &str =
    r#"100 - (avg by (instance) (irate(node_cpu_seconds_total{mode="idle"}[5m])) * 100)"#;
const NODE_MEMORY_PERCENT: &str =
    "(1 - (node_memory_MemAvailable_bytes / node_memory_MemTotal_bytes)) * 100";
const NODE_MEMORY_TOTAL: &str = "node_memory_MemTotal_bytes";

const NAMESPACE_CPU: &str = r#"sum(rate(container_cpu_usage_seconds_total{container!="",container!="POD"}[5m])) by (namespace)"#;
const NAMESPACE_MEMORY: &str =
    r#"sum(container_memory_usage_bytes{container!="",container!="POD"}) by (namespace)"#;
const NAMESPACE_PODS: &str = "count(kube_pod_info) by (namespace)";

fn top_pods_cpu(limit: usize) -> String {
    format!(
        r#"topk({}, sum(rate(container_cpu_usage_seconds_total{{container!="",container!="POD"}}[5m])) by (namespace, pod))"#,
        limit
    )
}

fn top_pods_memory(limit: usize) -> String {
    format!(
        r#"topk({}, sum(container_memory_usage_bytes{{container!="",container!="POD"}}) by (namespace, pod))"#,
        limit
    )
}

/// Human-readable byte size in powers of 1024
pub fn format_bytes(bytes: f64) -> String {
    let mut value = bytes;
    for unit in ["B", "KB", "MB", "GB", "TB"] {
        if value < 1024.0 {
            return format!("{:.2} {}", value, unit);
        }
        value /= 1024.0;
    }
    format!("{:.2} PB", value)
}

/// CPU in cores, or millicores below one thousandth of a core
pub fn format_cpu(cores: f64) -> String {
    if cores < 0.001 {
        format!("{:.2} m", cores * 1000.0)
    } else {
        format!("{:.3} cores", cores)
    }
}

fn cpu_marker(percent: f64) -> &'static str {
    if percent > 80.0 {
        "🔴"
    } else if percent > 60.0 {
        "🟡"
    } else {
        "🟢"
    }
}

fn memory_marker(percent: f64) -> &'static str {
    if percent > 85.0 {
        "🔴"
    } else if percent > 70.0 {
        "🟡"
    } else {
        "🟢"
    }
}

/// Run a query; a failed query is logged and yields no rows
async fn query_or_empty(client: &PrometheusClient, expr: &str) -> Vec<Sample> {
    match client.query(expr).await {
        Ok(samples) => samples,
        Err(e) => {
            tracing::warn!(query = expr, error = %e, "prometheus query failed");
            Vec::new()
        }
    }
}

fn value_for(samples: &[Sample], label: &str, key: &str) -> Option<f64> {
    samples
        .iter()
        .find(|s| s.label(label) == Some(key))
        .map(|s| s.value)
}

fn first_value(samples: &[Sample]) -> Option<f64> {
    samples.first().map(|s| s.value)
}

#[derive(Debug, Default, Clone, PartialEq)]
struct NamespaceUsage {
    pods: u64,
    cpu: f64,
    memory: f64,
}

/// Per-namespace usage ordered by CPU, busiest first
fn namespace_usage(
    cpu: &[Sample],
    memory: &[Sample],
    pods: &[Sample],
) -> Vec<(String, NamespaceUsage)> {
    let mut namespaces: BTreeMap<String, NamespaceUsage> = BTreeMap::new();

    for sample in cpu {
        namespaces
            .entry(sample.label_or_unknown("namespace").to_string())
            .or_default()
            .cpu = sample.value;
    }
    for sample in memory {
        namespaces
            .entry(sample.label_or_unknown("namespace").to_string())
            .or_default()
            .memory = sample.value;
    }
    for sample in pods {
        if let Some(usage) = namespaces.get_mut(sample.label_or_unknown("namespace")) {
            usage.pods = sample.value.max(0.0) as u64;
        }
    }

    let mut sorted: Vec<_> = namespaces.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cpu.total_cmp(&a.1.cpu));
    sorted
}

pub async fn run(client: &PrometheusClient, top: usize, out: &mut impl Write) -> Result<()> {
    writeln!(out, "✅ Connected to Prometheus at {}", client.base_url())?;

    write_summary(client, out).await?;
    write_nodes(client, out).await?;
    write_namespaces(client, out).await?;
    write_top_pods(client, top, out).await?;

    Ok(())
}

async fn write_summary(client: &PrometheusClient, out: &mut impl Write) -> Result<()> {
    section(out, "📊 CLUSTER RESOURCE SUMMARY")?;
    writeln!(out)?;

    let cpu = first_value(&query_or_empty(client, TOTAL_CPU).await);
    let memory = first_value(&query_or_empty(client, TOTAL_MEMORY).await);
    let pods = first_value(&query_or_empty(client, TOTAL_PODS).await);
    let nodes = first_value(&query_or_empty(client, TOTAL_NODES).await);

    match (cpu, memory, pods, nodes) {
        (Some(cpu), Some(memory), Some(pods), Some(nodes)) => {
            writeln!(out, "Total Nodes:        {}", nodes.max(0.0) as u64)?;
            writeln!(out, "Total Pods:         {}", pods.max(0.0) as u64)?;
            writeln!(out, "Total CPU Usage:    {}", format_cpu(cpu))?;
            writeln!(out, "Total Memory Usage: {}", format_bytes(memory))?;
        }
        _ => writeln!(out, "⚠️  Cluster totals unavailable")?,
    }
    Ok(())
}

async fn write_nodes(client: &PrometheusClient, out: &mut impl Write) -> Result<()> {
    section(out, "🖥️  NODE RESOURCES")?;
    writeln!(out)?;

    let cpu = query_or_empty(client, NODE_CPU_PERCENT).await;
    let memory = query_or_empty(client, NODE_MEMORY_PERCENT).await;
    let memory_total = query_or_empty(client, NODE_MEMORY_TOTAL).await;

    writeln!(
        out,
        "{:<30} {:<20} {:<20} {:<15}",
        "Node", "CPU Usage", "Memory Usage", "Total Memory"
    )?;
    writeln!(out, "{}", "─".repeat(85))?;

    for sample in &cpu {
        let instance = sample.label_or_unknown("instance");
        let mem_percent = value_for(&memory, "instance", instance).unwrap_or(0.0);
        let mem_total = value_for(&memory_total, "instance", instance).unwrap_or(0.0);

        writeln!(
            out,
            "{:<30} {} {:>6.2}%{:<10} {} {:>6.2}%{:<10} {:<15}",
            instance,
            cpu_marker(sample.value),
            sample.value,
            "",
            memory_marker(mem_percent),
            mem_percent,
            "",
            format_bytes(mem_total)
        )?;
    }
    Ok(())
}

async fn write_namespaces(client: &PrometheusClient, out: &mut impl Write) -> Result<()> {
    section(out, "📦 NAMESPACE RESOURCES")?;
    writeln!(out)?;

    let cpu = query_or_empty(client, NAMESPACE_CPU).await;
    let memory = query_or_empty(client, NAMESPACE_MEMORY).await;
    let pods = query_or_empty(client, NAMESPACE_PODS).await;

    writeln!(
        out,
        "{:<25} {:<8} {:<20} {:<20}",
        "Namespace", "Pods", "CPU Usage", "Memory Usage"
    )?;
    writeln!(out, "{}", "─".repeat(73))?;

    for (namespace, usage) in namespace_usage(&cpu, &memory, &pods) {
        writeln!(
            out,
            "{:<25} {:<8} {:<20} {:<20}",
            namespace,
            usage.pods,
            format_cpu(usage.cpu),
            format_bytes(usage.memory)
        )?;
    }
    Ok(())
}

async fn write_top_pods(client: &PrometheusClient, top: usize, out: &mut impl Write) -> Result<()> {
    section(out, &format!("🔝 TOP {} PODS BY RESOURCE USAGE", top))?;

    let by_cpu = query_or_empty(client, &top_pods_cpu(top)).await;
    writeln!(out, "\nTop Pods by CPU:")?;
    writeln!(out, "{:<50} {:<20}", "Namespace/Pod", "CPU Usage")?;
    writeln!(out, "{}", "─".repeat(70))?;
    for sample in &by_cpu {
        writeln!(out, "{:<50} {:<20}", pod_label(sample), format_cpu(sample.value))?;
    }

    let by_memory = query_or_empty(client, &top_pods_memory(top)).await;
    writeln!(out, "\nTop Pods by Memory:")?;
    writeln!(out, "{:<50} {:<20}", "Namespace/Pod", "Memory Usage")?;
    writeln!(out, "{}", "─".repeat(70))?;
    for sample in &by_memory {
        writeln!(out, "{:<50} {:<20}", pod_label(sample), format_bytes(sample.value))?;
    }
    Ok(())
}

fn pod_label(sample: &Sample) -> String {
    format!(
        "{}/{}",
        sample.label_or_unknown("namespace"),
        sample.label_or_unknown("pod")
    )
}
