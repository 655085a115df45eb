mod commands;
mod config;

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use kubepulse_k8s::KubeClient;

use crate::commands::report::Section;
use crate::config::Config;

/// Kubepulse - Kubernetes cluster health sampler and status reports
#[derive(Parser, Debug)]
#[command(name = "kubepulse")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML config file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Kubernetes context name (defaults to the current context)
    #[arg(long, global = true)]
    context: Option<String>,

    /// Prometheus base URL
    #[arg(long, global = true, value_name = "URL")]
    prometheus_url: Option<String>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sample cluster health on an interval and export it
    Export {
        /// Seconds between samples
        #[arg(long)]
        interval: Option<u64>,

        /// Address for the metrics listener
        #[arg(long)]
        listen: Option<std::net::SocketAddr>,

        /// Also read services and their endpoints every tick
        #[arg(long)]
        include_services: bool,

        /// Take a single sample, publish it and exit
        #[arg(long)]
        once: bool,
    },

    /// Check node readiness and critical pods; exits 1 when unhealthy
    Check {
        /// Namespaces whose pods must be healthy (repeatable)
        #[arg(long = "namespace", value_name = "NAMESPACE")]
        namespaces: Vec<String>,
    },

    /// Print a cluster report
    Report {
        /// Sections to print (repeatable); all when omitted
        #[arg(long = "section", value_enum)]
        sections: Vec<Section>,

        /// Namespace whose pods and services are shown in detail
        #[arg(long)]
        namespace: Option<String>,
    },

    /// Print CPU and memory usage from Prometheus
    Usage {
        /// Rows in the top-pods tables
        #[arg(long)]
        top: Option<usize>,
    },

    /// Print alerting rules and active alerts from Prometheus
    Alerts,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    // Logs go to stderr so report output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let mut config = Config::load(args.config.as_deref())?;
    config.override_with(args.context, args.prometheus_url);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match args.command {
        Command::Export {
            interval,
            listen,
            include_services,
            once,
        } => {
            if let Some(secs) = interval {
                config.sampler.interval_secs = secs;
            }
            if let Some(addr) = listen {
                config.exporter.listen = addr;
            }
            if include_services {
                config.sampler.include_services = true;
            }
            // the console sink locks stdout itself
            drop(out);
            commands::export::run(&config, once).await?;
            Ok(ExitCode::SUCCESS)
        }

        Command::Check { namespaces } => {
            if !namespaces.is_empty() {
                config.check.critical_namespaces = namespaces;
            }
            let client = connect(&config).await?;
            let outcome =
                commands::check::run(&client, &config.check.critical_namespaces, &mut out).await?;
            out.flush()?;
            Ok(if outcome.is_healthy() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }

        Command::Report { sections, namespace } => {
            if let Some(namespace) = namespace {
                config.report.detail_namespace = namespace;
            }
            let client = connect(&config).await?;
            commands::report::run(&client, &sections, &config.report, &mut out).await?;
            out.flush()?;
            Ok(ExitCode::SUCCESS)
        }

        Command::Usage { top } => {
            let top = top.unwrap_or(config.report.top_pods);
            let client = commands::connect_prometheus(&config.prometheus).await?;
            commands::usage::run(&client, top, &mut out).await?;
            out.flush()?;
            Ok(ExitCode::SUCCESS)
        }

        Command::Alerts => {
            let client = commands::connect_prometheus(&config.prometheus).await?;
            commands::alerts::run(&client, &mut out).await?;
            out.flush()?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn connect(config: &Config) -> Result<KubeClient> {
    let client = KubeClient::connect(config.kube.context.as_deref()).await?;
    client
        .validate()
        .await
        .context("Cannot reach the Kubernetes API server")?;
    Ok(client)
}
