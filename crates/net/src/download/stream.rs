//! Low-level streaming download mechanics

use super::config::{DownloadConfig, DownloadResult};
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use ifw_config::constants::LOCK_SUFFIX;
use ifw_errors::{Error, NetworkError};
use ifw_events::{ProgressEvent, SpeedMeter};
use ifw_hash::{Hash, HashAlgorithm};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub(super) type ByteStream = BoxStream<'static, Result<Bytes, Error>>;

/// RAII guard for download lock file - ensures cleanup on drop
pub(super) struct LockGuard {
    path: PathBuf,
    _file: File,
}

impl LockGuard {
    pub(super) async fn acquire(dest: &Path) -> Result<Self, Error> {
        let mut lock = dest.as_os_str().to_owned();
        lock.push(LOCK_SUFFIX);
        let lock_path = PathBuf::from(lock);

        let file = OpenOptions::new()
            .write(true)
            .create_new(true) // Atomic - fails if file already exists
            .open(&lock_path)
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    NetworkError::DestinationLocked {
                        path: dest.display().to_string(),
                    }
                    .into()
                } else {
                    Error::io_with_path(&e, &lock_path)
                }
            })?;

        Ok(Self {
            path: lock_path,
            _file: file,
        })
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // Best-effort cleanup - ignore errors
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Parameters of one transfer attempt
pub(super) struct Transfer<'a> {
    pub url: &'a str,
    pub total: Option<u64>,
    pub dest: &'a Path,
    pub algorithm: HashAlgorithm,
    pub cancel: &'a CancellationToken,
    pub config: &'a DownloadConfig,
    pub progress: &'a (dyn Fn(ProgressEvent) + Send + Sync),
}

/// Handle progress reporting during download
fn should_report_progress(last_update: Instant, interval: Duration) -> bool {
    last_update.elapsed() >= interval
}

/// Stream a body into `dest`, hashing as it goes
///
/// The cancellation token and the per-chunk timeout are checked at every
/// chunk boundary. The caller removes `dest` on error.
pub(super) async fn write_stream(mut body: ByteStream, t: Transfer<'_>) -> Result<(Hash, u64), Error> {
    let mut file = File::create(t.dest)
        .await
        .map_err(|e| Error::io_with_path(&e, t.dest))?;
    let mut hasher = t.algorithm.hasher();
    let mut meter = SpeedMeter::new(Duration::from_secs(5));
    let mut received = 0u64;

    (t.progress)(meter.snapshot(0, t.total));
    let mut last_progress_update = Instant::now();

    loop {
        let next = tokio::select! {
            biased;
            () = t.cancel.cancelled() => return Err(Error::Cancelled),
            next = tokio::time::timeout(t.config.chunk_timeout, body.next()) => next,
        };

        match next {
            Ok(Some(chunk)) => {
                let chunk = chunk?;
                hasher.update(&chunk);
                file.write_all(&chunk)
                    .await
                    .map_err(|e| Error::io_with_path(&e, t.dest))?;
                received += chunk.len() as u64;
                meter.record(received, Instant::now());

                if should_report_progress(last_progress_update, t.config.progress_interval) {
                    (t.progress)(meter.snapshot(received, t.total));
                    last_progress_update = Instant::now();
                }
            }
            Ok(None) => break,
            Err(_) => {
                return Err(NetworkError::Timeout {
                    url: t.url.to_string(),
                }
                .into());
            }
        }
    }

    file.flush()
        .await
        .map_err(|e| Error::io_with_path(&e, t.dest))?;
    file.sync_all()
        .await
        .map_err(|e| Error::io_with_path(&e, t.dest))?;
    drop(file);

    if let Some(total) = t.total {
        if received < total {
            return Err(NetworkError::TransferFailed(format!(
                "{}: received {received} of {total} bytes",
                t.url
            ))
            .into());
        }
    }

    (t.progress)(meter.snapshot(received, t.total.or(Some(received))));
    Ok((hasher.finalize(), received))
}

/// A running download: yields progress snapshots, then [`Self::finish`]
/// returns the outcome
pub struct DownloadStream {
    progress: mpsc::UnboundedReceiver<ProgressEvent>,
    handle: JoinHandle<Result<DownloadResult, Error>>,
}

impl DownloadStream {
    pub(super) fn new(
        progress: mpsc::UnboundedReceiver<ProgressEvent>,
        handle: JoinHandle<Result<DownloadResult, Error>>,
    ) -> Self {
        Self { progress, handle }
    }

    /// Wait for the transfer to end
    ///
    /// # Errors
    ///
    /// The download error, `Cancelled`, or `Internal` if the task panicked.
    pub async fn finish(self) -> Result<DownloadResult, Error> {
        self.handle
            .await
            .map_err(|e| Error::internal(format!("download task failed: {e}")))?
    }
}

impl Stream for DownloadStream {
    type Item = ProgressEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.progress.poll_recv(cx)
    }
}
