//! Stats: query totals by type, optionally by client.

use bqe_core::{CollectorKind, LabelKey, ParsedQuery};
use prometheus::core::Collector;
use prometheus::{IntCounter, Opts};

use crate::aggregator::Aggregator;
use crate::family::CounterFamily;
use crate::health::ScrapeHealth;

const SUBSYSTEM: &str = "stats";

pub struct StatsCollector {
    total: IntCounter,
    by_type: CounterFamily,
    by_client_and_type: Option<CounterFamily>,
    health: ScrapeHealth,
}

impl StatsCollector {
    /// `capture_client` adds the `{type, client}` family; it can produce a
    /// large number of series.
    pub fn new(namespace: &str, capture_client: bool) -> prometheus::Result<Self> {
        let opts = |name: &str, help: &str| Opts::new(name, help).namespace(namespace).subsystem(SUBSYSTEM);

        let by_client_and_type = if capture_client {
            Some(CounterFamily::new(
                opts("by_client_and_type", "Total queries received by type of query by client"),
                &["type", "client"],
            )?)
        } else {
            None
        };

        Ok(Self {
            total: IntCounter::with_opts(opts("total", "Total queries received"))?,
            by_type: CounterFamily::new(
                opts("total_by_type", "Total queries received by type of query"),
                &["type"],
            )?,
            by_client_and_type,
            health: ScrapeHealth::new(namespace, SUBSYSTEM)?,
        })
    }

    pub fn total(&self) -> u64 {
        self.total.get()
    }

    pub fn by_type(&self) -> &CounterFamily {
        &self.by_type
    }

    pub fn by_client_and_type(&self) -> Option<&CounterFamily> {
        self.by_client_and_type.as_ref()
    }
}

impl Aggregator for StatsCollector {
    fn kind(&self) -> CollectorKind {
        CollectorKind::Stats
    }

    fn observe(&self, query: &ParsedQuery) {
        self.total.inc();
        self.by_type.inc(&LabelKey::new([query.query_type.as_str()]));
        if let Some(family) = &self.by_client_and_type {
            family.inc(&LabelKey::new([query.query_type.as_str(), query.client.as_str()]));
        }
    }

    fn families(&self) -> Vec<&dyn Collector> {
        let mut families: Vec<&dyn Collector> = vec![&self.total, self.by_type.collector()];
        if let Some(family) = &self.by_client_and_type {
            families.push(family.collector());
        }
        families
    }

    fn health(&self) -> &ScrapeHealth {
        &self.health
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn query(name: &str, kind: &str, client: &str) -> ParsedQuery {
        ParsedQuery {
            matched: true,
            client: client.into(),
            query_name: name.into(),
            query_type: kind.into(),
        }
    }

    #[rstest]
    #[case::types_only(false, 2)]
    #[case::with_clients(true, 3)]
    fn client_capture_decides_families(#[case] capture_client: bool, #[case] families: usize) {
        let stats = StatsCollector::new("bind_query", capture_client).unwrap();
        stats.observe(&query("a.com", "A", "10.0.0.1"));
        stats.observe(&query("b.com", "AAAA", "10.0.0.1"));
        stats.observe(&query("c.com", "A", "10.0.0.2"));

        assert_eq!(stats.total(), 3);
        assert_eq!(stats.by_type().get(&LabelKey::new(["A"])), 2);
        assert_eq!(stats.by_type().get(&LabelKey::new(["AAAA"])), 1);
        assert_eq!(stats.by_client_and_type().is_some(), capture_client);
        assert_eq!(stats.families().len(), families);
    }

    #[rstest]
    #[case("A", "10.0.0.1", 2)]
    #[case("A", "10.0.0.2", 1)]
    #[case("AAAA", "10.0.0.1", 0)]
    fn client_family_is_keyed_by_type_then_client(#[case] kind: &str, #[case] client: &str, #[case] expected: u64) {
        let stats = StatsCollector::new("bind_query", true).unwrap();
        stats.observe(&query("a.com", "A", "10.0.0.1"));
        stats.observe(&query("a.com", "A", "10.0.0.1"));
        stats.observe(&query("a.com", "A", "10.0.0.2"));

        let by_client = stats.by_client_and_type().unwrap();
        assert_eq!(by_client.get(&LabelKey::new([kind, client])), expected);
    }
}
