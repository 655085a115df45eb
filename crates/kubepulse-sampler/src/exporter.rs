//! Indicator sinks

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io::Write;

use kubepulse_types::HealthIndicators;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Failed to encode metrics: {0}")]
    Encode(#[from] prometheus::Error),

    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Sinks failed: {}", .0.join(", "))]
    Sinks(Vec<&'static str>),
}

/// Destination for a completed set of indicators
///
/// Publishing must not block for long: it runs inline in the tick loop.
pub trait Exporter: Send + Sync {
    fn name(&self) -> &'static str;

    fn publish(&self, indicators: &HealthIndicators) -> Result<(), ExportError>;
}

/// Console report layout
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleFormat {
    /// Single human-readable summary line
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

#[derive(Serialize)]
struct ConsoleRecord<'a> {
    timestamp: DateTime<Utc>,
    #[serde(flatten)]
    indicators: &'a HealthIndicators,
}

/// Writes one report per tick
pub struct ConsoleSink {
    writer: Mutex<Box<dyn Write + Send>>,
    format: ConsoleFormat,
}

impl ConsoleSink {
    pub fn new(writer: Box<dyn Write + Send>, format: ConsoleFormat) -> Self {
        Self {
            writer: Mutex::new(writer),
            format,
        }
    }

    pub fn stdout(format: ConsoleFormat) -> Self {
        Self::new(Box::new(std::io::stdout()), format)
    }
}

impl Exporter for ConsoleSink {
    fn name(&self) -> &'static str {
        "console"
    }

    fn publish(&self, indicators: &HealthIndicators) -> Result<(), ExportError> {
        let now = Utc::now();
        let line = match self.format {
            ConsoleFormat::Text => {
                format!("[{}] {}", now.format("%Y-%m-%d %H:%M:%S"), indicators)
            }
            ConsoleFormat::Json => serde_json::to_string(&ConsoleRecord {
                timestamp: now,
                indicators,
            })?,
        };

        let mut writer = self.writer.lock();
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }
}

/// Publishes to every sink, even when some of them fail
pub struct Fanout {
    sinks: Vec<Box<dyn Exporter>>,
}

impl Fanout {
    pub fn new(sinks: Vec<Box<dyn Exporter>>) -> Self {
        Self { sinks }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl Exporter for Fanout {
    fn name(&self) -> &'static str {
        "fanout"
    }

    fn publish(&self, indicators: &HealthIndicators) -> Result<(), ExportError> {
        let mut failed = Vec::new();

        for sink in &self.sinks {
            if let Err(e) = sink.publish(indicators) {
                tracing::warn!(sink = sink.name(), error = %e, "sink failed to publish");
                failed.push(sink.name());
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(ExportError::Sinks(failed))
        }
    }
}
