//! Test builders: configuration, filter list files, a canned resolver and a
//! helper that pushes lines through a pipeline.
//!
//! These panic on invalid input rather than returning `Result`.

use std::collections::HashMap;
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;

use bind_query_exporter::Pipeline;
use bqe_core::config::Config;
use bqe_core::ReverseResolver;
use futures::future::BoxFuture;

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Fluent builder over the built-in defaults, applied as overrides.
///
/// ```rust
/// let config = ConfigBuilder::new()
///     .collectors("Names")
///     .set("names.capture_client", "true")
///     .build();
/// ```
#[derive(Default)]
pub struct ConfigBuilder {
    overrides: Vec<(String, String)>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &str, value: impl Into<String>) -> Self {
        self.overrides.push((key.to_string(), value.into()));
        self
    }

    pub fn collectors(self, list: &str) -> Self {
        self.set("collectors", list)
    }

    pub fn file(self, key: &str, path: &Path) -> Self {
        let path = path.to_str().expect("temp paths are UTF-8").to_string();
        self.set(key, path)
    }

    pub fn build(self) -> Config {
        Config::load(None, &self.overrides).expect("test configuration must load")
    }
}

/// Write `entries` one per line to `dir/name` and return the path.
pub fn write_list(dir: &Path, name: &str, entries: &[&str]) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, entries.join("\n") + "\n").expect("write list file");
    path
}

// ---------------------------------------------------------------------------
// StaticResolver
// ---------------------------------------------------------------------------

/// Answers PTR lookups from a fixed table; unknown addresses have no name.
#[derive(Debug, Default)]
pub struct StaticResolver {
    answers: HashMap<IpAddr, String>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, ip: &str, name: &str) -> Self {
        self.answers.insert(ip.parse().expect("valid ip"), name.to_string());
        self
    }

    pub fn shared(self) -> Arc<dyn ReverseResolver> {
        Arc::new(self)
    }
}

impl ReverseResolver for StaticResolver {
    fn reverse(&self, ip: IpAddr) -> BoxFuture<'_, Option<String>> {
        let answer = self.answers.get(&ip).cloned();
        Box::pin(async move { answer })
    }
}

/// Never answers; lookups only end through the lookup timeout.
#[derive(Debug, Default)]
pub struct HangingResolver;

impl ReverseResolver for HangingResolver {
    fn reverse(&self, _ip: IpAddr) -> BoxFuture<'_, Option<String>> {
        Box::pin(futures::future::pending())
    }
}

// ---------------------------------------------------------------------------
// Pipeline driving
// ---------------------------------------------------------------------------

/// Feed `lines` through `pipeline` from an in-memory source and wait until
/// every collector has handled all of them.
pub async fn feed<I, S>(pipeline: Pipeline, lines: I) -> u64
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let lines: Vec<String> = lines.into_iter().map(Into::into).collect();
    let (tx, rx) = tokio::sync::mpsc::channel(lines.len().max(1));
    for line in lines {
        tx.send(line).await.expect("source channel open");
    }
    drop(tx);
    pipeline.spawn(rx).wait().await.expect("pipeline runs to completion")
}
