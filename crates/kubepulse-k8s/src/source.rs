//! Read interface over the cluster

use std::future::Future;

use kubepulse_types::{
    DeploymentStatus, NamespaceInfo, NodeStatus, PodStatus, ServerVersion, ServiceStatus,
};

pub type ReadResult<T> = Result<T, ReadError>;

/// Failure of a single read against the cluster
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    #[error("Cluster unavailable: {0}")]
    Unavailable(String),
}

impl ReadError {
    /// Whether a retry could plausibly succeed (transport failures, throttling, 5xx)
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Api(kube::Error::Api(response)) => {
                response.code == 429 || response.code >= 500
            }
            Self::Api(kube::Error::HyperError(_)) | Self::Api(kube::Error::Service(_)) => true,
            Self::Api(_) => false,
            Self::Unavailable(_) => true,
        }
    }
}

/// Read-only cluster collaborator
///
/// Every method issues fresh API calls; implementations must not cache.
pub trait ClusterSource: Send + Sync {
    fn list_nodes(&self) -> impl Future<Output = ReadResult<Vec<NodeStatus>>> + Send;

    fn list_pods_all_namespaces(&self)
    -> impl Future<Output = ReadResult<Vec<PodStatus>>> + Send;

    fn list_pods_in_namespace(
        &self,
        namespace: &str,
    ) -> impl Future<Output = ReadResult<Vec<PodStatus>>> + Send;

    fn list_deployments_all_namespaces(
        &self,
    ) -> impl Future<Output = ReadResult<Vec<DeploymentStatus>>> + Send;

    fn list_services_all_namespaces(
        &self,
    ) -> impl Future<Output = ReadResult<Vec<ServiceStatus>>> + Send;

    fn list_services_in_namespace(
        &self,
        namespace: &str,
    ) -> impl Future<Output = ReadResult<Vec<ServiceStatus>>> + Send;

    /// Number of ready endpoint addresses behind a service
    fn read_endpoints(
        &self,
        service: &str,
        namespace: &str,
    ) -> impl Future<Output = ReadResult<u32>> + Send;

    fn list_namespaces(&self) -> impl Future<Output = ReadResult<Vec<NamespaceInfo>>> + Send;

    fn server_version(&self) -> impl Future<Output = ReadResult<ServerVersion>> + Send;
}
