//! bqe-feeds: where query log lines come from and how they fan out.
//!
//! A [`LineSource`] yields lines in arrival order; [`FileTail`] is the
//! production source following a BIND query log. The [`Dispatcher`] hands
//! every line to every aggregator endpoint, in order, without buffering.

use std::future::Future;
use std::path::PathBuf;

use bqe_core::RawLine;

pub mod dispatch;
pub mod file;

pub use dispatch::{DispatchError, Dispatcher};
pub use file::FileTail;

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// The log could not be stat'ed or opened at startup. Starting without a
    /// valid offset would re-count or skip data, so this is fatal.
    #[error("query log {} is unavailable: {source}", path.display())]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error reading query log: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// An ordered supply of log lines.
///
/// `Ok(None)` means the source has ended; a followed file never ends.
pub trait LineSource: Send {
    fn next_line(&mut self) -> impl Future<Output = Result<Option<RawLine>, FeedError>> + Send;
}

/// Lines pushed through a channel, e.g. by tests or an in-process producer.
impl LineSource for tokio::sync::mpsc::Receiver<String> {
    async fn next_line(&mut self) -> Result<Option<RawLine>, FeedError> {
        Ok(self.recv().await.map(RawLine::from))
    }
}
