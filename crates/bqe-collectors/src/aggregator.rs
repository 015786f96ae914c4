//! The [`Aggregator`] seam, its ingestion loop and the scrape path.
//!
//! Ingestion and scraping meet only inside an aggregator's counters:
//!
//! ```text
//! endpoint ──► ingest() ──► LineMatcher ──► Aggregator::observe
//!                                               │
//! GET /metrics ──► Exported::collect ──► flush ─┴─► families ──► health
//! ```

use std::sync::Arc;
use std::time::Instant;

use bqe_core::{CollectorKind, LineMatcher, ParsedQuery, RawLine};
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::health::{ScrapeError, ScrapeHealth};

/// One family of related counters and the logic that updates them.
pub trait Aggregator: Send + Sync + 'static {
    fn kind(&self) -> CollectorKind;

    /// Count one matched query. Called only from the aggregator's own
    /// ingestion task.
    fn observe(&self, query: &ParsedQuery);

    /// Move buffered increments into the exported families. Direct-counting
    /// aggregators have nothing to move.
    fn flush(&self) -> Result<(), ScrapeError> {
        Ok(())
    }

    /// Exported families, excluding scrape health.
    fn families(&self) -> Vec<&dyn Collector>;

    fn health(&self) -> &ScrapeHealth;
}

/// Run one scrape of `aggregator`: flush, collect, then record health.
pub fn scrape(aggregator: &dyn Aggregator) -> Vec<MetricFamily> {
    let begun = Instant::now();

    let failed = match aggregator.flush() {
        Ok(()) => false,
        Err(e) => {
            tracing::warn!(collector = %aggregator.kind(), error = %e, "scrape failed");
            true
        }
    };
    let mut families: Vec<MetricFamily> = aggregator.families().into_iter().flat_map(|c| c.collect()).collect();

    aggregator.health().record(begun, failed);
    families.extend(aggregator.health().collect());
    families
}

/// Registry adapter: every registry gather is one scrape of the aggregator.
pub(crate) struct Exported(pub(crate) Arc<dyn Aggregator>);

impl Collector for Exported {
    fn desc(&self) -> Vec<&Desc> {
        self.0
            .families()
            .into_iter()
            .flat_map(|c| c.desc())
            .chain(self.0.health().desc())
            .collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        scrape(self.0.as_ref())
    }
}

/// Consume lines until the endpoint closes, counting matched queries.
/// Returns how many lines were counted.
pub async fn ingest(aggregator: &dyn Aggregator, matcher: &LineMatcher, mut lines: mpsc::Receiver<RawLine>) -> u64 {
    let mut counted = 0u64;
    while let Some(line) = lines.recv().await {
        let query = matcher.extract(&line).await;
        if query.matched {
            aggregator.observe(&query);
            counted += 1;
        }
    }
    tracing::debug!(collector = %aggregator.kind(), counted, "ingestion finished");
    counted
}

/// Spawn the long-lived ingestion task for one aggregator.
pub fn spawn_ingest(
    aggregator: Arc<dyn Aggregator>,
    matcher: LineMatcher,
    lines: mpsc::Receiver<RawLine>,
) -> JoinHandle<u64> {
    tokio::spawn(async move { ingest(aggregator.as_ref(), &matcher, lines).await })
}
