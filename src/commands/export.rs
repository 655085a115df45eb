//! Long-running sampler and exporter

use anyhow::{Context, Result, bail};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use kubepulse_k8s::{ClusterSource, KubeClient};
use kubepulse_sampler::{
    ConsoleSink, Exporter, ExporterConfig, Fanout, MetricsRegistry, MetricsServer, MetricsSink,
    Sampler, Scheduler, SinkKind, TickOutcome,
};

use crate::config::Config;

pub async fn run(config: &Config, once: bool) -> Result<()> {
    let client = KubeClient::connect(config.kube.context.as_deref()).await?;
    let sampler = Sampler::new(client, &config.sampler);

    let cancel = CancellationToken::new();
    let registry = Arc::new(MetricsRegistry::new().context("Failed to create metrics registry")?);
    let exporter = build_exporter(&config.exporter, &registry, &cancel, once).await?;

    if once {
        let outcome = Scheduler::tick(&sampler, &exporter).await;
        return match outcome {
            TickOutcome::Published(_) => Ok(()),
            TickOutcome::SampleFailed => bail!("Failed to sample cluster"),
            TickOutcome::PublishFailed(_) => bail!("Failed to publish indicators"),
        };
    }

    tokio::spawn(cancel_on_signal(cancel.clone()));

    run_loop(&sampler, &exporter, config, cancel).await;
    Ok(())
}

async fn run_loop<S: ClusterSource>(
    sampler: &Sampler<S>,
    exporter: &Fanout,
    config: &Config,
    cancel: CancellationToken,
) {
    tracing::info!(
        interval_secs = config.sampler.interval().as_secs(),
        restart_scope = ?sampler.restart_scope(),
        sinks = exporter.len(),
        "starting exporter"
    );

    let scheduler = Scheduler::new(config.sampler.interval(), cancel.clone());
    let stats = scheduler.run(sampler, exporter).await;

    // stop the scrape listener as well
    cancel.cancel();

    tracing::info!(
        published = stats.published,
        sample_failures = stats.sample_failures,
        publish_failures = stats.publish_failures,
        "exporter stopped"
    );
}

/// Assemble the configured sinks; starts the scrape listener for the metrics sink
async fn build_exporter(
    config: &ExporterConfig,
    registry: &Arc<MetricsRegistry>,
    cancel: &CancellationToken,
    once: bool,
) -> Result<Fanout> {
    let mut sinks: Vec<Box<dyn Exporter>> = Vec::new();

    if config.wants(SinkKind::Metrics) {
        sinks.push(Box::new(MetricsSink::new(Arc::clone(registry))));
        if !once {
            spawn_metrics_server(config, registry, cancel).await;
        }
    }
    if config.wants(SinkKind::Console) {
        sinks.push(Box::new(ConsoleSink::stdout(config.console_format)));
    }

    if sinks.is_empty() {
        bail!("No sinks configured; set exporter.sinks to include \"metrics\" or \"console\"");
    }

    Ok(Fanout::new(sinks))
}

/// A listener that cannot bind is logged; sampling carries on without it
async fn spawn_metrics_server(
    config: &ExporterConfig,
    registry: &Arc<MetricsRegistry>,
    cancel: &CancellationToken,
) {
    let server = match MetricsServer::bind(config.listen).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(listen = %config.listen, error = %e, "failed to bind metrics listener");
            return;
        }
    };

    let registry = Arc::clone(registry);
    let cancel = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = server.serve(registry, cancel).await {
            tracing::error!(error = %e, "metrics server stopped");
        }
    });
}

/// Cancel on Ctrl-C or SIGTERM
async fn cancel_on_signal(cancel: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => tracing::info!("received SIGINT, shutting down"),
                    _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
                    _ = cancel.cancelled() => return,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => tracing::info!("received SIGINT, shutting down"),
                    _ = cancel.cancelled() => return,
                }
            }
        }
    }

    #[cfg(not(unix))]
    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("received Ctrl-C, shutting down"),
        _ = cancel.cancelled() => return,
    }

    cancel.cancel();
}
