//! Periodic sample → publish loop

use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use kubepulse_k8s::ClusterSource;
use kubepulse_types::HealthIndicators;

use crate::exporter::Exporter;
use crate::sampler::Sampler;

/// Result of a single tick
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Published(HealthIndicators),
    /// Nothing was published; previous values stay exposed
    SampleFailed,
    PublishFailed(HealthIndicators),
}

/// Running totals for a scheduler run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickStats {
    pub ticks: u64,
    pub published: u64,
    pub sample_failures: u64,
    pub publish_failures: u64,
}

impl TickStats {
    fn record(&mut self, outcome: &TickOutcome) {
        self.ticks += 1;
        match outcome {
            TickOutcome::Published(_) => self.published += 1,
            TickOutcome::SampleFailed => self.sample_failures += 1,
            TickOutcome::PublishFailed(_) => self.publish_failures += 1,
        }
    }
}

/// Drives ticks at a fixed interval until cancelled
pub struct Scheduler {
    interval: Duration,
    cancel: CancellationToken,
}

impl Scheduler {
    pub fn new(interval: Duration, cancel: CancellationToken) -> Self {
        Self { interval, cancel }
    }

    /// Run one tick: sample, then publish
    pub async fn tick<S: ClusterSource>(
        sampler: &Sampler<S>,
        exporter: &dyn Exporter,
    ) -> TickOutcome {
        let indicators = match sampler.sample().await {
            Ok(indicators) => indicators,
            Err(e) => {
                tracing::warn!(error = %e, "sample failed, skipping tick");
                return TickOutcome::SampleFailed;
            }
        };

        match exporter.publish(&indicators) {
            Ok(()) => {
                tracing::debug!(%indicators, "published indicators");
                TickOutcome::Published(indicators)
            }
            Err(e) => {
                tracing::warn!(exporter = exporter.name(), error = %e, "publish failed");
                TickOutcome::PublishFailed(indicators)
            }
        }
    }

    /// Tick until the cancellation token fires.
    ///
    /// Ticks never overlap. A tick that overruns the interval is followed
    /// immediately by the next one, without catching up on missed ticks.
    pub async fn run<S: ClusterSource>(
        &self,
        sampler: &Sampler<S>,
        exporter: &dyn Exporter,
    ) -> TickStats {
        let mut stats = TickStats::default();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(interval = ?self.interval, "sampling started");

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    tracing::info!("cancelled during tick");
                    break;
                }
                outcome = Self::tick(sampler, exporter) => outcome,
            };

            stats.record(&outcome);
        }

        tracing::info!(
            ticks = stats.ticks,
            published = stats.published,
            sample_failures = stats.sample_failures,
            "sampling stopped"
        );

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SamplerConfig;
    use crate::exporter::ExportError;
    use crate::metrics::{MetricsRegistry, MetricsSink};
    use crate::sampler::SourceKind;
    use crate::testing::{FakeSource, node, pod};
    use kubepulse_types::{ClusterSnapshot, PodPhase};
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Records every publish and cancels after a fixed number of them
    struct StopAfter {
        limit: usize,
        seen: Mutex<Vec<HealthIndicators>>,
        cancel: CancellationToken,
    }

    impl Exporter for StopAfter {
        fn name(&self) -> &'static str {
            "stop-after"
        }

        fn publish(&self, indicators: &HealthIndicators) -> Result<(), ExportError> {
            let mut seen = self.seen.lock();
            seen.push(*indicators);
            if seen.len() >= self.limit {
                self.cancel.cancel();
            }
            Ok(())
        }
    }

    struct Failing;

    impl Exporter for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn publish(&self, _indicators: &HealthIndicators) -> Result<(), ExportError> {
            Err(ExportError::Sinks(vec!["failing"]))
        }
    }

    fn cluster(unhealthy_nodes: usize) -> ClusterSnapshot {
        let mut nodes = vec![node("ready", Some("True"))];
        for i in 0..unhealthy_nodes {
            nodes.push(node(&format!("bad-{}", i), Some("False")));
        }
        ClusterSnapshot {
            nodes,
            pods: vec![pod("web", PodPhase::Running, &[1])],
            ..Default::default()
        }
    }

    fn sampler(snapshot: ClusterSnapshot) -> Sampler<FakeSource> {
        Sampler::new(FakeSource::new(snapshot), &SamplerConfig::default())
    }

    #[tokio::test]
    async fn test_run_until_cancelled() {
        let sampler = sampler(cluster(1));
        let cancel = CancellationToken::new();
        let exporter = StopAfter {
            limit: 3,
            seen: Mutex::new(Vec::new()),
            cancel: cancel.clone(),
        };

        let scheduler = Scheduler::new(Duration::from_millis(10), cancel);
        let stats = scheduler.run(&sampler, &exporter).await;

        assert_eq!(stats.published, 3);
        assert_eq!(stats.ticks, 3);
        let seen = exporter.seen.lock();
        assert!(seen.iter().all(|i| i.unhealthy_node_count == 1));
    }

    #[tokio::test]
    async fn test_cancelled_before_start_runs_nothing() {
        let sampler = sampler(cluster(0));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let exporter = StopAfter {
            limit: 1,
            seen: Mutex::new(Vec::new()),
            cancel: cancel.clone(),
        };
        let stats = Scheduler::new(Duration::from_millis(10), cancel)
            .run(&sampler, &exporter)
            .await;

        assert_eq!(stats, TickStats::default());
        assert_eq!(sampler.source().node_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_in_flight_read() {
        let sampler = sampler(cluster(0));
        sampler.source().delay_nodes(Duration::from_secs(5));
        let cancel = CancellationToken::new();
        let exporter = StopAfter {
            limit: 100,
            seen: Mutex::new(Vec::new()),
            cancel: cancel.clone(),
        };

        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                cancel.cancel();
            })
        };

        let stats = Scheduler::new(Duration::from_secs(30), cancel)
            .run(&sampler, &exporter)
            .await;
        canceller.await.unwrap();

        assert_eq!(stats.ticks, 0);
        assert!(exporter.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_failed_sample_keeps_previous_gauges() {
        let sampler = sampler(cluster(2));
        let registry = Arc::new(MetricsRegistry::new().unwrap());
        let sink = MetricsSink::new(Arc::clone(&registry));

        let first = Scheduler::tick(&sampler, &sink).await;
        assert!(matches!(first, TickOutcome::Published(_)));
        assert_eq!(registry.current().unhealthy_node_count, 2);

        // the cluster changes, but the pod list cannot be read
        sampler.source().set_snapshot(cluster(0));
        sampler.source().fail(SourceKind::Pods);
        assert_eq!(Scheduler::tick(&sampler, &sink).await, TickOutcome::SampleFailed);
        assert_eq!(registry.current().unhealthy_node_count, 2);

        sampler.source().recover();
        Scheduler::tick(&sampler, &sink).await;
        assert_eq!(registry.current().unhealthy_node_count, 0);
    }

    #[tokio::test]
    async fn test_zero_unhealthy_nodes_published_as_zero() {
        let sampler = sampler(cluster(0));
        let registry = Arc::new(MetricsRegistry::new().unwrap());
        registry.set(&HealthIndicators {
            unhealthy_node_count: 4,
            ..Default::default()
        });

        Scheduler::tick(&sampler, &MetricsSink::new(Arc::clone(&registry))).await;
        assert!(registry.encode().unwrap().contains("cluster_node_unhealthy 0"));
    }

    #[tokio::test]
    async fn test_publish_failure_does_not_stop_loop() {
        let sampler = sampler(cluster(0));
        let outcome = Scheduler::tick(&sampler, &Failing).await;
        assert!(matches!(outcome, TickOutcome::PublishFailed(_)));

        // the next tick still samples
        Scheduler::tick(&sampler, &Failing).await;
        assert_eq!(sampler.source().node_calls(), 2);
    }
}
