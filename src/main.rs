use std::path::PathBuf;

use anyhow::Context;
use bqe_core::config::Config;
use bqe_core::CollectorKind;
use clap::Parser;

#[derive(Parser)]
#[command(
    name = "bind_query_exporter",
    version,
    about = "Prometheus exporter for the BIND query log"
)]
struct Cli {
    /// TOML configuration file layered over the built-in defaults.
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Path of the BIND query log to follow.
    #[arg(long)]
    log: Option<String>,

    /// Comma-separated collectors to enable (stats, names, sites). Empty enables all.
    #[arg(long)]
    collectors: Option<String>,

    /// Address to serve metrics on.
    #[arg(long)]
    listen_address: Option<String>,

    /// Path under which metrics are exposed.
    #[arg(long)]
    telemetry_path: Option<String>,

    /// Print the metrics each collector exports and exit.
    #[arg(long)]
    print_metrics: bool,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long)]
    debug: bool,
}

impl Cli {
    fn overrides(&self) -> Vec<(&'static str, String)> {
        [
            ("log.path", &self.log),
            ("collectors", &self.collectors),
            ("web.listen_address", &self.listen_address),
            ("web.telemetry_path", &self.telemetry_path),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.clone().map(|v| (key, v)))
        .collect()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    let config = Config::load(cli.config.as_deref(), &cli.overrides()).context("failed to load configuration")?;

    if cli.print_metrics {
        for kind in CollectorKind::ALL {
            println!("{kind}:");
            for (name, help) in bind_query_exporter::describe(&config, kind)? {
                println!("  {name} - {help}");
            }
        }
        return Ok(());
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting bind_query_exporter");
    bind_query_exporter::run(config).await
}
