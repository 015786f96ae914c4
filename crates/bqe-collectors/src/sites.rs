//! Sites: queries per DNS name, buffered and moved into the exported
//! counters on each scrape.
//!
//! The ingestion task adds to a pending map behind a mutex. A scrape swaps
//! the whole map for an empty one while holding the lock, releases it, then
//! adds the detached deltas to the exported counters. An increment racing a
//! scrape lands either in the detached map or in the fresh one, so every
//! increment is exported exactly once.

use std::collections::HashMap;
use std::sync::Mutex;

use bqe_core::{CollectorKind, LabelKey, ParsedQuery};
use prometheus::core::Collector;
use prometheus::{IntCounter, Opts};

use crate::aggregator::Aggregator;
use crate::family::CounterFamily;
use crate::health::{ScrapeError, ScrapeHealth};

const SUBSYSTEM: &str = "sites";

pub struct SitesCollector {
    pending: Mutex<HashMap<LabelKey, u64>>,
    names: CounterFamily,
    total: IntCounter,
    health: ScrapeHealth,
}

impl SitesCollector {
    pub fn new(namespace: &str) -> prometheus::Result<Self> {
        let opts = |name: &str, help: &str| Opts::new(name, help).namespace(namespace).subsystem(SUBSYSTEM);

        Ok(Self {
            pending: Mutex::new(HashMap::new()),
            names: CounterFamily::new(opts("names", "Queries per DNS name"), &["domain"])?,
            total: IntCounter::with_opts(opts(
                "total",
                "Sum of all queries matched. If no include/exclude filter is present, this will match \
                 the stats collector total.",
            ))?,
            health: ScrapeHealth::new(namespace, SUBSYSTEM)?,
        })
    }

    /// Increments not yet moved into the exported counters.
    pub fn pending(&self) -> u64 {
        let pending = self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        pending.values().sum()
    }

    pub fn total(&self) -> u64 {
        self.total.get()
    }

    pub fn names(&self) -> &CounterFamily {
        &self.names
    }

    /// Detach the pending map. A poisoned lock still yields its contents so
    /// no counts are dropped, but the scrape is reported as failed.
    fn take_pending(&self) -> (HashMap<LabelKey, u64>, bool) {
        match self.pending.lock() {
            Ok(mut pending) => (std::mem::take(&mut *pending), false),
            Err(poisoned) => {
                let drained = std::mem::take(&mut *poisoned.into_inner());
                self.pending.clear_poison();
                (drained, true)
            }
        }
    }
}

impl Aggregator for SitesCollector {
    fn kind(&self) -> CollectorKind {
        CollectorKind::Sites
    }

    fn observe(&self, query: &ParsedQuery) {
        let mut pending = self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *pending.entry(LabelKey::new([query.query_name.as_str()])).or_default() += 1;
    }

    fn flush(&self) -> Result<(), ScrapeError> {
        let (drained, poisoned) = self.take_pending();
        for (key, delta) in drained {
            self.total.inc_by(delta);
            self.names.inc_by(&key, delta);
        }
        if poisoned {
            return Err(ScrapeError::Poisoned);
        }
        Ok(())
    }

    fn families(&self) -> Vec<&dyn Collector> {
        vec![&self.total, self.names.collector()]
    }

    fn health(&self) -> &ScrapeHealth {
        &self.health
    }
}
