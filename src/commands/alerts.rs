//! Alerting rules and active alerts from Prometheus

use anyhow::Result;
use std::io::Write;

use kubepulse_prom::{Alert, PrometheusClient, RuleGroup};

use super::section;

fn severity_marker(severity: &str) -> &'static str {
    match severity {
        "critical" => "🔴",
        "warning" => "🟡",
        _ => "⚪",
    }
}

/// Active alerts split by severity label
#[derive(Debug, Default)]
struct AlertsBySeverity<'a> {
    critical: Vec<&'a Alert>,
    warning: Vec<&'a Alert>,
    other: Vec<&'a Alert>,
}

impl<'a> AlertsBySeverity<'a> {
    fn group(alerts: &'a [Alert]) -> Self {
        let mut grouped = Self::default();
        for alert in alerts {
            match alert.severity() {
                "critical" => grouped.critical.push(alert),
                "warning" => grouped.warning.push(alert),
                _ => grouped.other.push(alert),
            }
        }
        grouped
    }
}

pub async fn run(client: &PrometheusClient, out: &mut impl Write) -> Result<()> {
    writeln!(out, "✅ Connected to Prometheus at {}", client.base_url())?;

    writeln!(out, "\n📥 Fetching alert rules...")?;
    let groups = client.rules().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to fetch alert rules");
        Vec::new()
    });
    if groups.is_empty() {
        writeln!(out, "⚠️  No alert rules found")?;
    } else {
        write_rules(out, &groups)?;
    }

    writeln!(out, "\n📥 Fetching active alerts...")?;
    let alerts = client.alerts().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to fetch active alerts");
        Vec::new()
    });
    write_alerts(out, &alerts)?;

    Ok(())
}

fn write_rules(out: &mut impl Write, groups: &[RuleGroup]) -> std::io::Result<()> {
    section(out, "📋 CONFIGURED ALERT RULES")?;

    let mut total = 0;
    for group in groups {
        let rules: Vec<_> = group.alerting_rules().collect();
        if rules.is_empty() {
            continue;
        }

        writeln!(out, "\n📁 Group: {}", group.name)?;
        writeln!(out, "   Rules: {}\n", rules.len())?;
        for rule in &rules {
            writeln!(out, "   {} {}", severity_marker(rule.severity()), rule.name)?;
            writeln!(
                out,
                "      Severity: {} | Category: {}",
                rule.severity(),
                rule.category()
            )?;
        }
        total += rules.len();
    }

    writeln!(out, "\n✅ Total Alert Rules: {}", total)
}

fn write_alert_list(out: &mut impl Write, title: &str, alerts: &[&Alert]) -> std::io::Result<()> {
    if alerts.is_empty() {
        return Ok(());
    }

    writeln!(out, "{}", title)?;
    for alert in alerts {
        match alert.active_at {
            Some(since) => writeln!(
                out,
                "   • {} ({}, since {})",
                alert.name(),
                alert.state(),
                since.format("%Y-%m-%d %H:%M:%S UTC")
            )?,
            None => writeln!(out, "   • {} ({})", alert.name(), alert.state())?,
        }
        writeln!(out, "     {}", alert.summary())?;
    }
    writeln!(out)
}

fn write_alerts(out: &mut impl Write, alerts: &[Alert]) -> std::io::Result<()> {
    section(out, "🔔 ACTIVE ALERTS")?;
    writeln!(out)?;

    if alerts.is_empty() {
        return writeln!(out, "✅ No alerts currently firing - All systems healthy!");
    }

    let grouped = AlertsBySeverity::group(alerts);
    write_alert_list(out, "🔴 CRITICAL ALERTS:", &grouped.critical)?;
    write_alert_list(out, "🟡 WARNING ALERTS:", &grouped.warning)?;
    write_alert_list(out, "⚪ OTHER ALERTS:", &grouped.other)?;

    writeln!(out, "Total Active Alerts: {}", alerts.len())?;
    writeln!(out, "  Critical: {}", grouped.critical.len())?;
    writeln!(out, "  Warning: {}", grouped.warning.len())?;
    writeln!(out, "  Other: {}", grouped.other.len())
}
