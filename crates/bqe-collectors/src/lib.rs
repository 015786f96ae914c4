//! bqe-collectors: counting matched queries and exporting the counts.
//!
//! Two counting disciplines live here:
//!
//! - **direct** ([`StatsCollector`], [`NamesCollector`]): every matched query
//!   increments atomic counters immediately; scrapes only read.
//! - **buffered** ([`SitesCollector`]): matched queries accumulate in a
//!   pending map that each scrape swaps out and folds into the exported
//!   counters.
//!
//! Every aggregator also reports the health of its own scrapes.

pub mod aggregator;
pub mod context;
pub mod family;
pub mod health;
pub mod names;
pub mod sites;
pub mod stats;

pub use aggregator::{ingest, scrape, spawn_ingest, Aggregator};
pub use context::{MetricsContext, MetricsError};
pub use family::CounterFamily;
pub use health::{ScrapeError, ScrapeHealth};
pub use names::NamesCollector;
pub use sites::SitesCollector;
pub use stats::StatsCollector;
