//! One-shot health check
//!
//! Healthy means every node reports Ready=True and every pod in the critical
//! namespaces is Running or Succeeded.

use anyhow::{Context, Result};
use std::io::Write;

use kubepulse_k8s::ClusterSource;

use super::banner;

/// What the check found
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CheckOutcome {
    pub unready_nodes: Vec<String>,
    /// "namespace/name" of unhealthy critical pods
    pub unhealthy_pods: Vec<String>,
    /// Namespaces that could not be listed
    pub skipped_namespaces: Vec<String>,
}

impl CheckOutcome {
    pub fn is_healthy(&self) -> bool {
        self.unready_nodes.is_empty() && self.unhealthy_pods.is_empty()
    }
}

pub async fn run<S: ClusterSource>(
    source: &S,
    critical_namespaces: &[String],
    out: &mut impl Write,
) -> Result<CheckOutcome> {
    let mut outcome = CheckOutcome::default();

    banner(out, "KUBERNETES CLUSTER HEALTH CHECK")?;

    writeln!(out, "\n🔍 Checking Nodes...")?;
    let nodes = source.list_nodes().await.context("Failed to list nodes")?;
    for node in &nodes {
        if node.ready() {
            writeln!(out, "✅ Node {} is ready", node.name)?;
        } else {
            let status = node.ready_condition().unwrap_or("missing");
            writeln!(out, "❌ Node {} is NOT ready (Ready: {})", node.name, status)?;
            outcome.unready_nodes.push(node.name.clone());
        }
    }

    writeln!(out, "\n🔍 Checking Critical Pods...")?;
    for namespace in critical_namespaces {
        let pods = match source.list_pods_in_namespace(namespace).await {
            Ok(pods) => pods,
            Err(e) => {
                tracing::warn!(namespace = %namespace, error = %e, "could not list pods");
                writeln!(
                    out,
                    "⚠️  Warning: Could not check namespace {}: {}",
                    namespace, e
                )?;
                outcome.skipped_namespaces.push(namespace.clone());
                continue;
            }
        };

        for pod in pods.iter().filter(|p| !p.is_healthy()) {
            writeln!(out, "❌ Pod {} in {} is {}", pod.name, namespace, pod.phase)?;
            outcome.unhealthy_pods.push(pod.qualified_name());
        }
    }
    if outcome.unhealthy_pods.is_empty() {
        writeln!(out, "✅ All critical pods are running")?;
    }

    writeln!(out)?;
    if outcome.is_healthy() {
        banner(out, "✅ CLUSTER IS HEALTHY")?;
    } else {
        banner(out, "❌ CLUSTER HAS ISSUES")?;
    }

    Ok(outcome)
}
