//! Wiring: turns a validated [`Config`] into a running pipeline.
//!
//! Everything that can fail because of configuration (pattern, collector
//! selection, filter files, resolver setup, metric registration) fails inside
//! [`Pipeline::build`], before any task is spawned or the log is opened.

use std::sync::Arc;

use anyhow::Context;
use bqe_collectors::{
    spawn_ingest, Aggregator, MetricsContext, NamesCollector, SitesCollector, StatsCollector,
};
use bqe_core::config::Config;
use bqe_core::{CollectorKind, ConfigError, FilterSet, LineMatcher, QueryPattern, RawLine, ReverseResolver, SystemResolver};
use bqe_feeds::{Dispatcher, FeedError, LineSource};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

struct Stage {
    aggregator: Arc<dyn Aggregator>,
    matcher: LineMatcher,
    lines: mpsc::Receiver<RawLine>,
}

/// Aggregators, their matchers and the dispatcher feeding them, not yet
/// running.
pub struct Pipeline {
    context: Arc<MetricsContext>,
    dispatcher: Dispatcher,
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Build from `config`, using the system resolver for enrichment.
    pub fn build(config: &Config) -> anyhow::Result<Self> {
        Self::build_with_resolver(config, || {
            Ok(Arc::new(SystemResolver::from_system_conf()?) as Arc<dyn ReverseResolver>)
        })
    }

    /// Build from `config`; `make_resolver` is called at most once, and only
    /// if some collector enriches clients.
    pub fn build_with_resolver<F>(config: &Config, make_resolver: F) -> anyhow::Result<Self>
    where
        F: FnOnce() -> Result<Arc<dyn ReverseResolver>, ConfigError>,
    {
        let pattern = QueryPattern::new(&config.log.pattern).context("invalid log.pattern")?;
        let kinds = config.collector_kinds().context("invalid collectors selection")?;
        let namespace = config.metrics.namespace.as_str();
        let context = Arc::new(MetricsContext::new(namespace)?);

        let mut make_resolver = Some(make_resolver);
        let mut resolver: Option<Arc<dyn ReverseResolver>> = None;
        let mut dispatcher = Dispatcher::new();
        let mut stages = Vec::with_capacity(kinds.len());

        for kind in kinds {
            let (aggregator, filters, capture_client, reverse_lookup) = match kind {
                CollectorKind::Stats => (
                    Arc::new(StatsCollector::new(namespace, config.stats.capture_client)?) as Arc<dyn Aggregator>,
                    FilterSet::default(),
                    config.stats.capture_client,
                    config.stats.reverse_lookup,
                ),
                CollectorKind::Names => {
                    let names = &config.names;
                    let filters = FilterSet::load(
                        &names.include_file,
                        &names.exclude_file,
                        &names.include_clients_file,
                        &names.exclude_clients_file,
                    )
                    .context("invalid names filter configuration")?;
                    (
                        Arc::new(NamesCollector::new(namespace, names.capture_client)?) as Arc<dyn Aggregator>,
                        filters,
                        names.capture_client,
                        names.reverse_lookup,
                    )
                }
                CollectorKind::Sites => {
                    let filters = FilterSet::load(&config.sites.include_file, &config.sites.exclude_file, "", "")
                        .context("invalid sites filter configuration")?;
                    (
                        Arc::new(SitesCollector::new(namespace)?) as Arc<dyn Aggregator>,
                        filters,
                        false,
                        false,
                    )
                }
            };

            let mut matcher = LineMatcher::new(pattern.clone()).with_filters(filters);
            if reverse_lookup {
                if capture_client || !matcher.filters().clients.is_empty() {
                    tracing::warn!(
                        collector = %kind,
                        "reverse lookup enabled: the exporter's own PTR queries will reach the DNS server; \
                         if that server logs them, they are matched and trigger more lookups. \
                         Use a caching or forwarding resolver"
                    );
                    let resolver = match &resolver {
                        Some(resolver) => Arc::clone(resolver),
                        None => {
                            let make = make_resolver.take().context("resolver factory already used")?;
                            let made = make().context("failed to set up reverse lookups")?;
                            resolver = Some(Arc::clone(&made));
                            made
                        }
                    };
                    matcher = matcher.with_reverse_lookup(resolver, config.lookup_timeout());
                } else {
                    tracing::warn!(
                        collector = %kind,
                        "reverse lookup has no effect without client capture or client filters, ignoring"
                    );
                }
            }

            context.register(Arc::clone(&aggregator))?;
            tracing::info!(collector = %kind, capture_client, reverse_lookup = matcher.reverse_lookup_enabled(), "collector enabled");
            stages.push(Stage {
                aggregator,
                matcher,
                lines: dispatcher.endpoint(),
            });
        }

        Ok(Self {
            context,
            dispatcher,
            stages,
        })
    }

    pub fn context(&self) -> Arc<MetricsContext> {
        Arc::clone(&self.context)
    }

    pub fn aggregators(&self) -> impl Iterator<Item = &Arc<dyn Aggregator>> {
        self.stages.iter().map(|stage| &stage.aggregator)
    }

    /// Spawn one ingestion task per aggregator plus the pump reading `source`.
    pub fn spawn<S>(self, source: S) -> Running
    where
        S: LineSource + 'static,
    {
        let ingest = self
            .stages
            .into_iter()
            .map(|stage| spawn_ingest(stage.aggregator, stage.matcher, stage.lines))
            .collect();
        let pump = tokio::spawn(self.dispatcher.run(source));
        Running { pump, ingest }
    }
}

/// Handles of a spawned pipeline.
pub struct Running {
    pump: JoinHandle<Result<u64, FeedError>>,
    ingest: Vec<JoinHandle<u64>>,
}

impl Running {
    /// Wait for the source to end and every aggregator to drain its endpoint.
    /// Returns the number of lines read from the source.
    pub async fn wait(self) -> anyhow::Result<u64> {
        let pumped = self.pump.await.context("line pump panicked")??;
        for task in self.ingest {
            task.await.context("ingestion task panicked")?;
        }
        Ok(pumped)
    }
}

/// Metric name and help text of every family a collector exports.
pub fn describe(config: &Config, kind: CollectorKind) -> anyhow::Result<Vec<(String, String)>> {
    let namespace = config.metrics.namespace.as_str();
    let aggregator: Box<dyn Aggregator> = match kind {
        CollectorKind::Stats => Box::new(StatsCollector::new(namespace, config.stats.capture_client)?),
        CollectorKind::Names => Box::new(NamesCollector::new(namespace, config.names.capture_client)?),
        CollectorKind::Sites => Box::new(SitesCollector::new(namespace)?),
    };
    Ok(aggregator
        .families()
        .into_iter()
        .flat_map(|c| c.desc())
        .chain(aggregator.health().desc())
        .map(|desc| (desc.fq_name.clone(), desc.help.clone()))
        .collect())
}
