//! Metrics context: the registry every aggregator and the HTTP handler share.
//!
//! There is no process-global registry. The wiring layer builds one
//! [`MetricsContext`] at startup and hands it to whoever needs it; tests build
//! as many independent ones as they like.

use std::sync::Arc;

use prometheus::{Encoder, IntGaugeVec, Opts, Registry, TextEncoder};

use crate::aggregator::{Aggregator, Exported};

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("metrics registry error: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("rendered metrics are not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[derive(Clone)]
pub struct MetricsContext {
    registry: Registry,
    namespace: String,
}

impl MetricsContext {
    /// New registry carrying a `<namespace>_exporter_build_info` gauge.
    pub fn new(namespace: &str) -> Result<Self, MetricsError> {
        let registry = Registry::new();
        let build_info = IntGaugeVec::new(
            Opts::new("build_info", "A metric with a constant '1' value labeled by the exporter version.")
                .namespace(namespace)
                .subsystem("exporter"),
            &["version"],
        )?;
        build_info.with_label_values(&[env!("CARGO_PKG_VERSION")]).set(1);
        registry.register(Box::new(build_info))?;

        Ok(Self {
            registry,
            namespace: namespace.to_string(),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Export `aggregator`'s families; each render scrapes it once.
    pub fn register(&self, aggregator: Arc<dyn Aggregator>) -> Result<(), MetricsError> {
        tracing::debug!(collector = %aggregator.kind(), "registering collector");
        self.registry.register(Box::new(Exported(aggregator)))?;
        Ok(())
    }

    /// Render every registered family in the text exposition format.
    pub fn render(&self) -> Result<String, MetricsError> {
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Content type of [`render`](Self::render)'s output.
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
