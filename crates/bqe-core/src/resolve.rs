//! Reverse (PTR) lookups used to enrich client addresses.
//!
//! The matcher only sees the [`ReverseResolver`] trait so tests can plug in
//! canned answers. [`SystemResolver`] is the production implementation backed
//! by hickory and the host's resolver configuration.
//!
//! Enrichment makes DNS queries of its own. If the watched server logs those
//! queries, each lookup produces a new log line and another lookup; pair
//! enrichment with a caching or forwarding resolver.

use std::net::IpAddr;

use futures::future::BoxFuture;
use hickory_resolver::{Resolver, TokioResolver};

use crate::error::ConfigError;

/// Resolves an address to a host name.
///
/// `None` covers every failure (no PTR record, NXDOMAIN, transport error);
/// callers fall back to the address and never treat it as fatal.
pub trait ReverseResolver: Send + Sync {
    fn reverse(&self, addr: IpAddr) -> BoxFuture<'_, Option<String>>;
}

/// PTR lookups through the system resolver configuration.
#[derive(Clone)]
pub struct SystemResolver {
    inner: TokioResolver,
}

impl SystemResolver {
    /// Build from `/etc/resolv.conf` (or the platform equivalent).
    pub fn from_system_conf() -> Result<Self, ConfigError> {
        let inner = Resolver::builder_tokio()
            .map_err(|e| ConfigError::Resolver(e.to_string()))?
            .build();
        Ok(Self { inner })
    }
}

impl ReverseResolver for SystemResolver {
    fn reverse(&self, addr: IpAddr) -> BoxFuture<'_, Option<String>> {
        Box::pin(async move {
            match self.inner.reverse_lookup(addr).await {
                Ok(lookup) => lookup.iter().next().map(|ptr| ptr.to_string()),
                Err(e) => {
                    tracing::debug!(%addr, error = %e, "reverse lookup failed");
                    None
                }
            }
        })
    }
}

impl std::fmt::Debug for SystemResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemResolver").finish_non_exhaustive()
    }
}
