//! Kubernetes client for kubepulse
//!
//! This crate provides the read-only view of the cluster used by the sampler
//! and the one-shot reports: nodes, pods, deployments, services, endpoints
//! and namespaces.

mod client;
mod convert;
mod source;

pub use client::KubeClient;
pub use source::{ClusterSource, ReadError, ReadResult};

// Re-export types that are used in our public API
pub use kubepulse_types::{
    ContainerStatus, DeploymentStatus, NamespaceInfo, NodeStatus, PodPhase, PodStatus,
    ServerVersion, ServiceStatus,
};
