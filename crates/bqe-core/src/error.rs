//! Startup configuration errors.
//!
//! Everything here is fatal: the process refuses to start serving with a
//! partially applied configuration. Per-line outcomes (no match, filtered,
//! failed enrichment) are never errors and never reach this type.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read filter file {}: {source}", path.display())]
    FileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid query pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("query pattern must have exactly 3 capture groups (client, name, type), found {0}")]
    CaptureGroups(usize),

    #[error("unknown collector {0:?} (expected Stats, Names or Sites)")]
    UnknownCollector(String),

    #[error("failed to initialise the system resolver: {0}")]
    Resolver(String),

    #[error("invalid configuration: {0}")]
    Load(#[from] config::ConfigError),
}
