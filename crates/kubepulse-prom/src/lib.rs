//! Prometheus HTTP API client for kubepulse
//!
//! Point-in-time queries, alerting rules and active alerts, read from the
//! `/api/v1` endpoints of a Prometheus server.

mod client;
mod model;

pub use client::{PrometheusClient, PrometheusError};
pub use model::{Alert, Rule, RuleGroup, Sample};
