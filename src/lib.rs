//! bind-query-exporter: Prometheus metrics from a BIND query log.
//!
//! This crate ties the workspace together: it wires the configured collectors
//! to a tailed query log and serves their metrics over HTTP.
//!
//! # Architecture
//!
//! ```text
//! FileTail ──► Dispatcher ──┬──► LineMatcher ──► StatsCollector ──┐
//!                           ├──► LineMatcher ──► NamesCollector ──┼──► MetricsContext ──► HTTP
//!                           └──► LineMatcher ──► SitesCollector ──┘
//! ```
//!
//! Every line goes to every collector, in log order. Each collector owns its
//! matcher, so filters and enrichment are configured per collector.

pub mod server;
pub mod wiring;

use anyhow::Context;
use bqe_core::config::Config;
use bqe_feeds::FileTail;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub use wiring::{describe, Pipeline, Running};

/// Run the exporter until the log becomes unreadable, the server fails, or
/// the process is interrupted.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let pipeline = Pipeline::build(&config)?;
    let app = server::router(pipeline.context(), &config.web.telemetry_path)?;

    let tail = FileTail::open_at_end(&config.log.path)
        .await
        .with_context(|| format!("cannot follow query log {}", config.log.path.display()))?;
    let listener = TcpListener::bind(&config.web.listen_address)
        .await
        .with_context(|| format!("cannot listen on {}", config.web.listen_address))?;

    tracing::info!(log = %config.log.path.display(), "following query log");
    let shutdown = CancellationToken::new();
    let running = pipeline.spawn(tail);
    let mut server = tokio::spawn(server::serve(listener, app, shutdown.clone()));

    let outcome = tokio::select! {
        result = running.wait() => match result {
            Ok(lines) => Err(anyhow::anyhow!("query log ended after {lines} lines")),
            Err(e) => Err(e.context("query log pipeline failed")),
        },
        result = &mut server => match result {
            Ok(Ok(())) => Err(anyhow::anyhow!("HTTP server stopped")),
            Ok(Err(e)) => Err(anyhow::Error::new(e).context("HTTP server failed")),
            Err(e) => Err(anyhow::Error::new(e).context("HTTP server panicked")),
        },
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted, shutting down");
            Ok(())
        }
    };

    shutdown.cancel();
    if !server.is_finished() {
        let _ = server.await;
    }
    outcome
}
