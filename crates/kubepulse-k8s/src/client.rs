//! Kubernetes client for kubepulse

use anyhow::{Context, Result};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Endpoints, Namespace, Node, Pod, Service};
use kube::Api;
use kube::api::ListParams;
use kube::config::{KubeConfigOptions, Kubeconfig};

use kubepulse_types::{
    DeploymentStatus, NamespaceInfo, NodeStatus, PodStatus, ServerVersion, ServiceStatus,
};

use crate::convert;
use crate::source::{ClusterSource, ReadResult};

/// Kubernetes client wrapper
#[derive(Clone)]
pub struct KubeClient {
    client: kube::Client,
}

impl KubeClient {
    /// Connect using the kubeconfig, optionally pinned to a named context.
    ///
    /// Without a context the usual inference applies: `$KUBECONFIG` or
    /// `~/.kube/config`, then the in-cluster service account.
    pub async fn connect(context: Option<&str>) -> Result<Self> {
        let config = match context {
            Some(context_name) => {
                let kubeconfig = Kubeconfig::read()
                    .context("Failed to read kubeconfig. Is kubectl configured?")?;

                kube::Config::from_custom_kubeconfig(
                    kubeconfig,
                    &KubeConfigOptions {
                        context: Some(context_name.to_string()),
                        ..Default::default()
                    },
                )
                .await
                .context(format!(
                    "Failed to create config for context: {}",
                    context_name
                ))?
            }
            None => kube::Config::infer()
                .await
                .context("Failed to load Kubernetes configuration. Is kubectl configured?")?,
        };

        tracing::debug!(cluster_url = %config.cluster_url, context = ?context, "loaded kubernetes config");

        let client = kube::Client::try_from(config).context("Failed to create Kubernetes client")?;

        Ok(Self { client })
    }

    /// Validate that the client can make API calls
    pub async fn validate(&self) -> ReadResult<()> {
        let ns: Api<Namespace> = Api::all(self.client.clone());
        // Just try to list with limit 1 to validate auth
        ns.list(&ListParams::default().limit(1)).await?;
        Ok(())
    }
}

impl ClusterSource for KubeClient {
    async fn list_nodes(&self) -> ReadResult<Vec<NodeStatus>> {
        let nodes: Api<Node> = Api::all(self.client.clone());
        let list = nodes.list(&ListParams::default()).await?;
        tracing::debug!(count = list.items.len(), "listed nodes");
        Ok(list.items.into_iter().map(convert::node_status).collect())
    }

    async fn list_pods_all_namespaces(&self) -> ReadResult<Vec<PodStatus>> {
        let pods: Api<Pod> = Api::all(self.client.clone());
        let list = pods.list(&ListParams::default()).await?;
        tracing::debug!(count = list.items.len(), "listed pods");
        Ok(list.items.into_iter().map(convert::pod_status).collect())
    }

    async fn list_pods_in_namespace(&self, namespace: &str) -> ReadResult<Vec<PodStatus>> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let list = pods.list(&ListParams::default()).await?;
        Ok(list.items.into_iter().map(convert::pod_status).collect())
    }

    async fn list_deployments_all_namespaces(&self) -> ReadResult<Vec<DeploymentStatus>> {
        let deployments: Api<Deployment> = Api::all(self.client.clone());
        let list = deployments.list(&ListParams::default()).await?;
        tracing::debug!(count = list.items.len(), "listed deployments");
        Ok(list
            .items
            .into_iter()
            .map(convert::deployment_status)
            .collect())
    }

    async fn list_services_all_namespaces(&self) -> ReadResult<Vec<ServiceStatus>> {
        let services: Api<Service> = Api::all(self.client.clone());
        let list = services.list(&ListParams::default()).await?;
        Ok(list.items.into_iter().map(convert::service_status).collect())
    }

    async fn list_services_in_namespace(&self, namespace: &str) -> ReadResult<Vec<ServiceStatus>> {
        let services: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        let list = services.list(&ListParams::default()).await?;
        Ok(list.items.into_iter().map(convert::service_status).collect())
    }

    async fn read_endpoints(&self, service: &str, namespace: &str) -> ReadResult<u32> {
        let endpoints: Api<Endpoints> = Api::namespaced(self.client.clone(), namespace);
        // ExternalName and selector-less services may have no Endpoints object
        match endpoints.get_opt(service).await? {
            Some(ep) => Ok(convert::ready_endpoint_count(&ep)),
            None => Ok(0),
        }
    }

    async fn list_namespaces(&self) -> ReadResult<Vec<NamespaceInfo>> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let list = namespaces.list(&ListParams::default()).await?;
        Ok(list.items.into_iter().map(convert::namespace_info).collect())
    }

    async fn server_version(&self) -> ReadResult<ServerVersion> {
        let info = self.client.apiserver_version().await?;
        Ok(ServerVersion {
            git_version: info.git_version,
            platform: info.platform,
        })
    }
}
