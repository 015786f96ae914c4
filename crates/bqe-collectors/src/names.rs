//! Names: queries per DNS name, optionally per client.

use bqe_core::{CollectorKind, LabelKey, ParsedQuery};
use prometheus::core::Collector;
use prometheus::{IntCounter, Opts};

use crate::aggregator::Aggregator;
use crate::family::CounterFamily;
use crate::health::ScrapeHealth;

const SUBSYSTEM: &str = "names";

pub struct NamesCollector {
    all: CounterFamily,
    total: IntCounter,
    capture_client: bool,
    health: ScrapeHealth,
}

impl NamesCollector {
    pub fn new(namespace: &str, capture_client: bool) -> prometheus::Result<Self> {
        let opts = |name: &str, help: &str| Opts::new(name, help).namespace(namespace).subsystem(SUBSYSTEM);

        let all = if capture_client {
            CounterFamily::new(opts("all", "Queries per DNS name per client"), &["name", "client"])?
        } else {
            CounterFamily::new(opts("all", "Queries per DNS name"), &["name"])?
        };
        let total = IntCounter::with_opts(opts(
            "total",
            "Sum of all queries matched. If no include/exclude filter is present, this will match \
             the stats collector total. It is initialized to 0 to support increase() detection.",
        ))?;

        Ok(Self {
            all,
            total,
            capture_client,
            health: ScrapeHealth::new(namespace, SUBSYSTEM)?,
        })
    }

    /// Series key for `query`: `(name)` or `(name, client)`.
    pub fn key(&self, query: &ParsedQuery) -> LabelKey {
        if self.capture_client {
            LabelKey::new([query.query_name.as_str(), query.client.as_str()])
        } else {
            LabelKey::new([query.query_name.as_str()])
        }
    }

    pub fn total(&self) -> u64 {
        self.total.get()
    }

    pub fn all(&self) -> &CounterFamily {
        &self.all
    }
}

impl Aggregator for NamesCollector {
    fn kind(&self) -> CollectorKind {
        CollectorKind::Names
    }

    fn observe(&self, query: &ParsedQuery) {
        self.total.inc();
        self.all.inc(&self.key(query));
    }

    fn families(&self) -> Vec<&dyn Collector> {
        vec![&self.total, self.all.collector()]
    }

    fn health(&self) -> &ScrapeHealth {
        &self.health
    }
}
