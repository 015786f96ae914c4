//! bqe-core: matching layer of bind-query-exporter.
//!
//! This crate owns everything that happens to a single query log line before
//! it is counted: the validated pattern, name/client filters, optional
//! reverse-lookup enrichment, plus the configuration and shared types used by
//! the feed and collector crates.
//!
//! # Architecture
//!
//! ```text
//! Log source ──► Dispatcher ──► Aggregator ─┬─► counters ──► Scrape
//!                               (LineMatcher)│
//!                                            └─► ...one task per aggregator
//! ```

pub mod config;
pub mod error;
pub mod filter;
pub mod matcher;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use filter::{Filter, FilterSet, Normalization};
pub use matcher::{LineMatcher, QueryPattern, DEFAULT_PATTERN};
pub use resolve::{ReverseResolver, SystemResolver};
pub use types::{CollectorKind, LabelKey, ParsedQuery, RawLine};
