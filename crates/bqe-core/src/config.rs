//! Configuration types for bind-query-exporter.
//!
//! [`Config::load`] layers, lowest precedence first: the embedded defaults,
//! an optional TOML file, `BIND_QUERY_EXPORTER_*` environment variables and
//! finally explicit overrides from the command line. Nested keys use `__` in
//! environment variables, e.g. `BIND_QUERY_EXPORTER_NAMES__CAPTURE_CLIENT`.
//! [`Config::defaults`] returns the embedded defaults only (useful in tests).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::types::CollectorKind;

pub const ENV_PREFIX: &str = "BIND_QUERY_EXPORTER";

// ---------------------------------------------------------------------------
// Embedded defaults
// ---------------------------------------------------------------------------

const DEFAULT_CONFIG: &str = r#"
collectors = "Stats"

[log]
path    = "/var/log/bind/queries.log"
pattern = 'client(?: @0x[0-9a-f]+)? ([^\s#]+).*query: ([^\s]+).*IN ([^\s]+)'

[metrics]
namespace = "bind_query"

[web]
listen_address = "0.0.0.0:9197"
telemetry_path = "/metrics"

[lookup]
timeout_ms = 2000

[stats]
capture_client = false
reverse_lookup = false

[names]
include_file         = ""
exclude_file         = ""
include_clients_file = ""
exclude_clients_file = ""
capture_client       = false
reverse_lookup       = false

[sites]
include_file = ""
exclude_file = ""
"#;

// ---------------------------------------------------------------------------
// Public config types
// ---------------------------------------------------------------------------

/// Top-level exporter configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Comma separated collector selection, see [`CollectorKind::parse_list`].
    pub collectors: String,
    pub log: LogConfig,
    pub metrics: MetricsConfig,
    pub web: WebConfig,
    pub lookup: LookupConfig,
    pub stats: StatsConfig,
    pub names: NamesConfig,
    pub sites: SitesConfig,
}

/// `[log]`: the query log to follow and how to read it.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    pub path: PathBuf,
    /// Regex with three capture groups: client, queried name, query type.
    pub pattern: String,
}

/// `[metrics]`
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub namespace: String,
}

/// `[web]`
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    pub listen_address: String,
    pub telemetry_path: String,
}

/// `[lookup]`: bounds on reverse lookups made for client enrichment.
#[derive(Debug, Clone, Deserialize)]
pub struct LookupConfig {
    pub timeout_ms: u64,
}

/// `[stats]`
#[derive(Debug, Clone, Deserialize)]
pub struct StatsConfig {
    pub capture_client: bool,
    pub reverse_lookup: bool,
}

/// `[names]`. Empty file paths disable the corresponding filter.
#[derive(Debug, Clone, Deserialize)]
pub struct NamesConfig {
    pub include_file: String,
    pub exclude_file: String,
    pub include_clients_file: String,
    pub exclude_clients_file: String,
    pub capture_client: bool,
    pub reverse_lookup: bool,
}

/// `[sites]`. Empty file paths disable the corresponding filter.
#[derive(Debug, Clone, Deserialize)]
pub struct SitesConfig {
    pub include_file: String,
    pub exclude_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Config {
    /// Load the layered configuration. `overrides` are `(key, value)` pairs
    /// in dotted form (`"web.listen_address"`) and win over every other source.
    pub fn load<K, V>(file: Option<&Path>, overrides: &[(K, V)]) -> Result<Self, ConfigError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml));

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        for (key, value) in overrides {
            builder = builder.set_override(key.as_ref(), value.as_ref())?;
        }

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Return the built-in defaults without reading files or the environment.
    pub fn defaults() -> Self {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .build()
            .expect("built-in default config must be valid TOML")
            .try_deserialize()
            .expect("built-in default config must deserialize correctly")
    }

    /// The enabled collectors, validated.
    pub fn collector_kinds(&self) -> Result<Vec<CollectorKind>, ConfigError> {
        CollectorKind::parse_list(&self.collectors)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup.timeout_ms)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
