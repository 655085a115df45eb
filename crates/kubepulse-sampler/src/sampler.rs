//! Cluster sampling
//!
//! A [`Sampler`] reads a fresh [`ClusterSnapshot`] from its source on every
//! call and reduces it to [`HealthIndicators`]. A single failed read fails
//! the whole sample so that no half-computed indicators are ever published.

use futures::{StreamExt, TryStreamExt, stream};
use std::fmt;
use std::future::Future;
use std::time::Duration;

use kubepulse_k8s::{ClusterSource, ReadError, ReadResult};
use kubepulse_types::{ClusterSnapshot, HealthIndicators, RestartScope};

use crate::config::SamplerConfig;
use crate::reduce::reduce;

/// Endpoint reads in flight at once while collecting services
const ENDPOINT_READ_CONCURRENCY: usize = 8;

/// Which read failed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Nodes,
    Pods,
    Deployments,
    Services,
    Endpoints,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Nodes => "nodes",
            Self::Pods => "pods",
            Self::Deployments => "deployments",
            Self::Services => "services",
            Self::Endpoints => "endpoints",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CollectCause {
    #[error(transparent)]
    Read(#[from] ReadError),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl CollectCause {
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Read(e) => e.is_transient(),
            Self::Timeout(_) => true,
        }
    }
}

/// A tick could not read everything it needs
#[derive(Debug, thiserror::Error)]
#[error("failed to collect {kind}: {cause}")]
pub struct CollectionError {
    pub kind: SourceKind,
    #[source]
    pub cause: CollectCause,
}

/// Reads snapshots from a cluster source and reduces them
pub struct Sampler<S> {
    source: S,
    call_timeout: Duration,
    restart_scope: RestartScope,
    include_services: bool,
    retry_attempts: u32,
    retry_backoff: Duration,
}

impl<S: ClusterSource> Sampler<S> {
    pub fn new(source: S, config: &SamplerConfig) -> Self {
        Self {
            source,
            call_timeout: config.call_timeout(),
            restart_scope: config.restart_scope,
            include_services: config.include_services,
            retry_attempts: config.retry_attempts,
            retry_backoff: config.retry_backoff(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn restart_scope(&self) -> RestartScope {
        self.restart_scope
    }

    /// Read one complete snapshot
    pub async fn collect(&self) -> Result<ClusterSnapshot, CollectionError> {
        let nodes = self
            .read(SourceKind::Nodes, || self.source.list_nodes())
            .await?;
        let pods = self
            .read(SourceKind::Pods, || self.source.list_pods_all_namespaces())
            .await?;
        let deployments = self
            .read(SourceKind::Deployments, || {
                self.source.list_deployments_all_namespaces()
            })
            .await?;

        let services = if self.include_services {
            let services = self
                .read(SourceKind::Services, || {
                    self.source.list_services_all_namespaces()
                })
                .await?;

            stream::iter(services)
                .map(|mut svc| async move {
                    let count = self
                        .read(SourceKind::Endpoints, || {
                            self.source.read_endpoints(&svc.name, &svc.namespace)
                        })
                        .await?;
                    svc.ready_endpoint_count = Some(count);
                    Ok::<_, CollectionError>(svc)
                })
                .buffered(ENDPOINT_READ_CONCURRENCY)
                .try_collect::<Vec<_>>()
                .await?
        } else {
            Vec::new()
        };

        Ok(ClusterSnapshot {
            nodes,
            pods,
            deployments,
            services,
        })
    }

    /// Collect a snapshot and reduce it to indicators
    pub async fn sample(&self) -> Result<HealthIndicators, CollectionError> {
        let snapshot = self.collect().await?;
        let indicators = reduce(&snapshot, self.restart_scope);

        tracing::debug!(
            nodes = snapshot.nodes.len(),
            pods = snapshot.pods.len(),
            deployments = snapshot.deployments.len(),
            services = snapshot.services.len(),
            "sampled cluster"
        );

        Ok(indicators)
    }

    /// Run one read under the call timeout, retrying transient failures
    async fn read<T, F, Fut>(&self, source: SourceKind, call: F) -> Result<T, CollectionError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = ReadResult<T>>,
    {
        let mut attempt = 0;

        loop {
            let cause = match tokio::time::timeout(self.call_timeout, call()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => CollectCause::Read(e),
                Err(_) => CollectCause::Timeout(self.call_timeout),
            };

            if attempt < self.retry_attempts && cause.is_transient() {
                attempt += 1;
                tracing::debug!(%source, attempt, error = %cause, "retrying read");
                tokio::time::sleep(self.retry_backoff).await;
                continue;
            }

            return Err(CollectionError { kind: source, cause });
        }
    }
}
