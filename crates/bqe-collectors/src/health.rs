//! Scrape health: metadata about the export path, not the log stream.
//!
//! Each aggregator owns one [`ScrapeHealth`], updated exactly once per
//! scrape after its families have been flushed and collected.

use std::time::Instant;

use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{Gauge, IntCounter, Opts};

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("aggregation buffer lock was poisoned")]
    Poisoned,
}

#[derive(Clone)]
pub struct ScrapeHealth {
    scrapes_total: IntCounter,
    scrape_errors_total: IntCounter,
    last_scrape_error: Gauge,
    last_scrape_timestamp: Gauge,
    last_scrape_duration_seconds: Gauge,
}

impl ScrapeHealth {
    pub fn new(namespace: &str, subsystem: &str) -> prometheus::Result<Self> {
        let opts = |name: &str, help: String| Opts::new(name, help).namespace(namespace).subsystem(subsystem);
        Ok(Self {
            scrapes_total: IntCounter::with_opts(opts(
                "scrapes_total",
                format!("Total number of scrapes for BIND {subsystem} stats."),
            ))?,
            scrape_errors_total: IntCounter::with_opts(opts(
                "scrape_errors_total",
                format!("Total number of scrape errors for BIND {subsystem} stats."),
            ))?,
            last_scrape_error: Gauge::with_opts(opts(
                "last_scrape_error",
                format!("Whether the last scrape of BIND {subsystem} stats resulted in an error (1 for error, 0 for success)."),
            ))?,
            last_scrape_timestamp: Gauge::with_opts(opts(
                "last_scrape_timestamp",
                format!("Number of seconds since 1970 since last scrape of BIND {subsystem} metrics."),
            ))?,
            last_scrape_duration_seconds: Gauge::with_opts(opts(
                "last_scrape_duration_seconds",
                format!("Duration of the last scrape of BIND {subsystem} stats."),
            ))?,
        })
    }

    /// Record one finished scrape that started at `begun`.
    pub fn record(&self, begun: Instant, failed: bool) {
        self.scrapes_total.inc();
        if failed {
            self.scrape_errors_total.inc();
        }
        self.last_scrape_error.set(if failed { 1.0 } else { 0.0 });
        self.last_scrape_timestamp.set(chrono::Utc::now().timestamp() as f64);
        self.last_scrape_duration_seconds.set(begun.elapsed().as_secs_f64());
    }

    pub fn scrapes(&self) -> u64 {
        self.scrapes_total.get()
    }

    pub fn errors(&self) -> u64 {
        self.scrape_errors_total.get()
    }

    pub fn last_failed(&self) -> bool {
        self.last_scrape_error.get() != 0.0
    }

    pub fn last_timestamp(&self) -> f64 {
        self.last_scrape_timestamp.get()
    }

    fn parts(&self) -> [&dyn Collector; 5] {
        [
            &self.scrapes_total,
            &self.scrape_errors_total,
            &self.last_scrape_error,
            &self.last_scrape_timestamp,
            &self.last_scrape_duration_seconds,
        ]
    }

    pub fn desc(&self) -> Vec<&Desc> {
        self.parts().into_iter().flat_map(|c| c.desc()).collect()
    }

    pub fn collect(&self) -> Vec<MetricFamily> {
        self.parts().into_iter().flat_map(|c| c.collect()).collect()
    }
}
