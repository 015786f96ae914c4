//! File tail: follows a growing query log across truncation and rotation.
//!
//! The tail starts at a byte offset (normally the size of the file when the
//! exporter starts) and yields each complete line after it. At end of file it
//! sleeps until the log's directory reports a change or the poll interval
//! elapses, then checks the path again:
//!
//! - the file at the path has a new identity (rotation): the old handle has
//!   already been read to its end, so reopen the path from offset 0;
//! - the file is shorter than the read offset (truncation): seek to 0.
//!
//! A trailing fragment without a newline is held back until the rest of the
//! line is written.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bqe_core::RawLine;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio::sync::mpsc;

use crate::{FeedError, LineSource};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Device and inode of an open file, where the platform exposes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileIdentity(Option<(u64, u64)>);

impl FileIdentity {
    #[cfg(unix)]
    fn of(meta: &std::fs::Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;
        Self(Some((meta.dev(), meta.ino())))
    }

    #[cfg(not(unix))]
    fn of(_meta: &std::fs::Metadata) -> Self {
        Self(None)
    }
}

pub struct FileTail {
    path: PathBuf,
    reader: BufReader<File>,
    identity: FileIdentity,
    position: u64,
    partial: Vec<u8>,
    poll_interval: Duration,
    changes: Option<mpsc::Receiver<()>>,
    _watcher: Option<RecommendedWatcher>,
}

impl FileTail {
    /// Open `path` positioned at its current end.
    ///
    /// Fails with [`FeedError::Unavailable`] if the file cannot be stat'ed or
    /// opened.
    pub async fn open_at_end(path: impl AsRef<Path>) -> Result<Self, FeedError> {
        let path = path.as_ref();
        let meta = tokio::fs::metadata(path).await.map_err(|source| FeedError::Unavailable {
            path: path.to_path_buf(),
            source,
        })?;
        Self::open_at(path, meta.len()).await
    }

    /// Open `path` positioned at `offset`.
    pub async fn open_at(path: impl AsRef<Path>, offset: u64) -> Result<Self, FeedError> {
        let path = path.as_ref().to_path_buf();
        let unavailable = |source| FeedError::Unavailable {
            path: path.clone(),
            source,
        };

        let mut file = File::open(&path).await.map_err(unavailable)?;
        let identity = FileIdentity::of(&file.metadata().await.map_err(unavailable)?);
        file.seek(SeekFrom::Start(offset)).await.map_err(unavailable)?;

        let (changes, watcher) = match watch_directory(&path) {
            Ok((rx, watcher)) => (Some(rx), Some(watcher)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "file watch unavailable, falling back to polling");
                (None, None)
            }
        };

        tracing::info!(path = %path.display(), offset, "tailing query log");
        Ok(Self {
            path,
            reader: BufReader::new(file),
            identity,
            position: offset,
            partial: Vec::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            changes,
            _watcher: watcher,
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Byte offset of the next unread byte in the current file.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn take_line(&mut self) -> RawLine {
        let mut bytes = std::mem::take(&mut self.partial);
        if bytes.last() == Some(&b'\n') {
            bytes.pop();
        }
        if bytes.last() == Some(&b'\r') {
            bytes.pop();
        }
        RawLine::from(String::from_utf8_lossy(&bytes).as_ref())
    }

    /// Reopen or rewind if the path no longer refers to what we are reading.
    /// Returns whether the read position was reset.
    async fn follow_path(&mut self) -> Result<bool, FeedError> {
        let meta = match tokio::fs::metadata(&self.path).await {
            Ok(meta) => meta,
            // between a rotation's rename and the new file's creation
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        let identity = FileIdentity::of(&meta);
        if identity != self.identity {
            tracing::info!(path = %self.path.display(), "query log rotated, reopening");
            self.reader = BufReader::new(File::open(&self.path).await?);
            self.identity = identity;
            self.position = 0;
            return Ok(true);
        }

        if meta.len() < self.position {
            tracing::info!(path = %self.path.display(), size = meta.len(), offset = self.position, "query log truncated, rewinding");
            self.reader.seek(SeekFrom::Start(0)).await?;
            self.position = 0;
            self.partial.clear();
            return Ok(true);
        }

        Ok(false)
    }

    async fn wait_for_change(&mut self) {
        match &mut self.changes {
            Some(rx) => {
                if let Ok(None) = tokio::time::timeout(self.poll_interval, rx.recv()).await {
                    self.changes = None;
                }
            }
            None => tokio::time::sleep(self.poll_interval).await,
        }
    }
}

impl LineSource for FileTail {
    async fn next_line(&mut self) -> Result<Option<RawLine>, FeedError> {
        loop {
            let read = self.reader.read_until(b'\n', &mut self.partial).await?;
            self.position += read as u64;
            if self.partial.last() == Some(&b'\n') {
                return Ok(Some(self.take_line()));
            }

            // at end of file, possibly holding a fragment
            if self.follow_path().await? {
                if !self.partial.is_empty() {
                    // last unterminated line of the rotated file
                    return Ok(Some(self.take_line()));
                }
                continue;
            }
            self.wait_for_change().await;
        }
    }
}

impl std::fmt::Debug for FileTail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileTail")
            .field("path", &self.path)
            .field("position", &self.position)
            .field("watching", &self.changes.is_some())
            .finish()
    }
}

/// Watch the directory holding `path`, coalescing events into a wakeup
/// channel. The directory is watched rather than the file so a rotation's
/// create event is seen.
fn watch_directory(path: &Path) -> notify::Result<(mpsc::Receiver<()>, RecommendedWatcher)> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let (tx, rx) = mpsc::channel(1);
    let mut watcher = notify::recommended_watcher(move |event: notify::Result<notify::Event>| {
        if event.is_ok() {
            // a full channel already holds a pending wakeup
            let _ = tx.try_send(());
        }
    })?;
    watcher.watch(dir, RecursiveMode::NonRecursive)?;
    Ok((rx, watcher))
}
