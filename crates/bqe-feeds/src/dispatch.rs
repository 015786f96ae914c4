//! Dispatcher: fans each line out to every aggregator endpoint.
//!
//! Endpoints are bounded channels of capacity one. A line is delivered to
//! endpoint 0, then 1, and so on; a slow endpoint holds up the endpoints after
//! it and the next read from the source. Every aggregator observes the same
//! sequence of lines.

use bqe_core::RawLine;
use tokio::sync::mpsc;

use crate::{FeedError, LineSource};

const ENDPOINT_CAPACITY: usize = 1;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The aggregator behind this endpoint is gone; it can no longer see
    /// every line.
    #[error("dispatcher endpoint {0} is closed")]
    EndpointClosed(usize),
}

#[derive(Debug, Default)]
pub struct Dispatcher {
    endpoints: Vec<mpsc::Sender<RawLine>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new endpoint and return its receiving half.
    pub fn endpoint(&mut self) -> mpsc::Receiver<RawLine> {
        let (tx, rx) = mpsc::channel(ENDPOINT_CAPACITY);
        self.endpoints.push(tx);
        rx
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Deliver one line to every endpoint, in registration order.
    pub async fn dispatch(&self, line: RawLine) -> Result<(), DispatchError> {
        for (index, endpoint) in self.endpoints.iter().enumerate() {
            endpoint
                .send(line.clone())
                .await
                .map_err(|_| DispatchError::EndpointClosed(index))?;
        }
        Ok(())
    }

    /// Pump `source` until it ends, returning the number of lines delivered.
    ///
    /// Endpoints are closed when this returns, which lets the aggregator
    /// tasks finish.
    pub async fn run<S: LineSource>(self, mut source: S) -> Result<u64, FeedError> {
        let mut delivered = 0u64;
        while let Some(line) = source.next_line().await? {
            tracing::trace!(line = %line, "read");
            self.dispatch(line).await?;
            delivered += 1;
        }
        tracing::debug!(delivered, "line source ended");
        Ok(delivered)
    }
}
