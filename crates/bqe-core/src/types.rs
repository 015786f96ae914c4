//! Core types shared by every layer of the exporter.
//!
//! A [`RawLine`] comes off the log source, the matcher turns it into a
//! [`ParsedQuery`], and the aggregators key their counters by [`LabelKey`].
//! [`CollectorKind`] is the selection vocabulary for which aggregators run.

use std::sync::Arc;

use crate::error::ConfigError;

/// One query log record, shared between every dispatcher endpoint.
pub type RawLine = Arc<str>;

/// Structured facts extracted from one query log line.
///
/// Only `matched == true` results are counted. A line that does not fit the
/// pattern comes back as [`ParsedQuery::default`] with every field empty; a
/// line rejected by a filter keeps its extracted fields but is unmatched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedQuery {
    pub matched: bool,
    /// Client address, or its reverse-resolved name when enrichment is on.
    pub client: String,
    /// Queried name, always lowercase.
    pub query_name: String,
    /// Query type token as logged (`A`, `AAAA`, `PTR`, ...).
    pub query_type: String,
}

/// Ordered label values identifying one series within a metric family.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelKey(Vec<String>);

impl LabelKey {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(values.into_iter().map(Into::into).collect())
    }

    /// Label values in order, borrowed for registry lookups.
    pub fn values(&self) -> Vec<&str> {
        self.0.iter().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for LabelKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({})", self.0.join(", "))
    }
}

/// Which aggregator a selection token refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CollectorKind {
    Stats,
    Names,
    Sites,
}

impl CollectorKind {
    pub const ALL: [CollectorKind; 3] = [CollectorKind::Stats, CollectorKind::Names, CollectorKind::Sites];

    /// Parse a comma separated selection such as `"Stats,Names"`.
    ///
    /// Tokens are case-insensitive and trimmed; empty tokens are skipped and
    /// duplicates collapse. An empty selection enables every collector. Any
    /// unknown token fails the whole selection.
    pub fn parse_list(list: &str) -> Result<Vec<CollectorKind>, ConfigError> {
        let mut kinds = Vec::new();
        for token in list.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let kind: CollectorKind = token.parse()?;
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        if kinds.is_empty() {
            return Ok(Self::ALL.to_vec());
        }
        Ok(kinds)
    }

    /// Metric subsystem used by the collector's families.
    pub fn subsystem(self) -> &'static str {
        match self {
            CollectorKind::Stats => "stats",
            CollectorKind::Names => "names",
            CollectorKind::Sites => "sites",
        }
    }
}

impl std::str::FromStr for CollectorKind {
    type Err = ConfigError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token.to_ascii_lowercase().as_str() {
            "stats" => Ok(CollectorKind::Stats),
            "names" => Ok(CollectorKind::Names),
            "sites" => Ok(CollectorKind::Sites),
            _ => Err(ConfigError::UnknownCollector(token.to_string())),
        }
    }
}

impl std::fmt::Display for CollectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectorKind::Stats => write!(f, "Stats"),
            CollectorKind::Names => write!(f, "Names"),
            CollectorKind::Sites => write!(f, "Sites"),
        }
    }
}
