//! Downloader orchestration

use super::config::{DownloadConfig, DownloadRequest, DownloadResult};
use super::retry::{calculate_backoff_delay, is_retryable};
use super::stream::{write_stream, ByteStream, DownloadStream, LockGuard, Transfer};
use super::validation::{validate_url, Source};
use crate::client::{map_reqwest_error, NetClient};
use bytes::Bytes;
use futures::stream::{FuturesUnordered, StreamExt, TryStreamExt};
use ifw_config::create_semaphore;
use ifw_config::resources_semaphore::acquire_semaphore_permit;
use ifw_errors::{Error, IntegrityError, NetworkError};
use ifw_events::{AppEvent, DownloadEvent, EventEmitter, EventSender, FailureContext, ProgressEvent};
use ifw_hash::Hash;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;

/// Serves `resource:` URLs from data embedded in the running binary
pub trait ResourceProvider: Send + Sync {
    /// Bytes of `name`, or `None` if nothing by that name is embedded
    ///
    /// # Errors
    ///
    /// Read failures of the embedding container.
    fn resource(&self, name: &str) -> Result<Option<Vec<u8>>, Error>;
}

/// Fetches files over every supported transport
#[derive(Clone)]
pub struct Downloader {
    client: NetClient,
    config: DownloadConfig,
    resources: Option<Arc<dyn ResourceProvider>>,
    events: Option<EventSender>,
}

impl std::fmt::Debug for Downloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Downloader")
            .field("client", &self.client)
            .field("config", &self.config)
            .field("resources", &self.resources.is_some())
            .finish_non_exhaustive()
    }
}

impl EventEmitter for Downloader {
    fn event_sender(&self) -> Option<&EventSender> {
        self.events.as_ref()
    }
}

impl Downloader {
    #[must_use]
    pub fn new(client: NetClient, config: DownloadConfig) -> Self {
        Self {
            client,
            config,
            resources: None,
            events: None,
        }
    }

    /// Create with default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn with_defaults() -> Result<Self, Error> {
        Ok(Self::new(NetClient::with_defaults()?, DownloadConfig::default()))
    }

    #[must_use]
    pub fn with_resources(mut self, provider: Arc<dyn ResourceProvider>) -> Self {
        self.resources = Some(provider);
        self
    }

    #[must_use]
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    #[must_use]
    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    /// Download inline, reporting progress as `DownloadEvent::Progress`
    ///
    /// # Errors
    ///
    /// `Cancelled` when the token fires; otherwise the last error after the
    /// retry budget is spent.
    pub async fn download(
        &self,
        request: &DownloadRequest,
        cancel: &CancellationToken,
    ) -> Result<DownloadResult, Error> {
        let url = request.url.clone();
        let events = self.events.clone();
        let progress = move |p: ProgressEvent| events.emit_download_progress(url.clone(), p);
        self.download_with_progress(request, cancel, &progress).await
    }

    /// Start a download in the background and stream its progress
    #[must_use]
    pub fn fetch(&self, request: DownloadRequest, cancel: CancellationToken) -> DownloadStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let this = self.clone();
        let handle = tokio::spawn(async move {
            let progress = move |p: ProgressEvent| {
                // Nobody listening is fine; the result still arrives via finish()
                let _ = tx.send(p);
            };
            this.download_with_progress(&request, &cancel, &progress)
                .await
        });
        DownloadStream::new(rx, handle)
    }

    /// Download a batch through a bounded pool; results keep request order
    ///
    /// The first failure cancels the remaining transfers.
    ///
    /// # Errors
    ///
    /// The first failure, or `Cancelled`.
    pub async fn download_all(
        &self,
        requests: Vec<DownloadRequest>,
        cancel: &CancellationToken,
    ) -> Result<Vec<DownloadResult>, Error> {
        let semaphore = create_semaphore(self.config.max_concurrent);
        let batch = cancel.child_token();
        let mut futures = FuturesUnordered::new();

        for (index, request) in requests.into_iter().enumerate() {
            let semaphore = semaphore.clone();
            let batch = batch.clone();
            futures.push(async move {
                let _permit = acquire_semaphore_permit(semaphore, "download").await?;
                if batch.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                self.download(&request, &batch).await.map(|r| (index, r))
            });
        }

        let mut results = Vec::new();
        let mut first_error: Option<Error> = None;
        while let Some(result) = futures.next().await {
            match result {
                Ok(item) => results.push(item),
                Err(e) => {
                    batch.cancel();
                    // Prefer the real failure over the cancellations it caused
                    if first_error.as_ref().is_none_or(Error::is_cancelled) {
                        first_error = Some(e);
                    }
                }
            }
        }

        if let Some(err) = first_error {
            return Err(err);
        }
        results.sort_by_key(|(index, _)| *index);
        Ok(results.into_iter().map(|(_, r)| r).collect())
    }

    /// Read a whole (small) resource into memory, with the same transports
    /// and retry policy as file downloads
    ///
    /// # Errors
    ///
    /// Transport errors or `Cancelled`.
    pub async fn fetch_bytes(&self, url: &str, cancel: &CancellationToken) -> Result<Vec<u8>, Error> {
        let source = validate_url(url)?;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.read_all(&source, url, cancel).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) if attempt <= self.config.retry.max_retries && is_retryable(&e) => {
                    self.wait_before_retry(url, attempt, &e, cancel).await?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn read_all(&self, source: &Source, url: &str, cancel: &CancellationToken) -> Result<Vec<u8>, Error> {
        let (mut body, total) = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Cancelled),
            opened = self.open(source) => opened?,
        };
        let mut out = Vec::with_capacity(usize::try_from(total.unwrap_or(0)).unwrap_or(0));
        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(Error::Cancelled),
                next = tokio::time::timeout(self.config.chunk_timeout, body.next()) => next,
            };
            match next {
                Ok(Some(chunk)) => out.extend_from_slice(&chunk?),
                Ok(None) => return Ok(out),
                Err(_) => {
                    return Err(NetworkError::Timeout {
                        url: url.to_string(),
                    }
                    .into())
                }
            }
        }
    }

    async fn wait_before_retry(
        &self,
        url: &str,
        attempt: u32,
        err: &Error,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        let delay = calculate_backoff_delay(&self.config.retry, attempt);
        tracing::warn!(url, attempt, error = %err, ?delay, "transient failure, retrying");
        self.emit(AppEvent::Download(DownloadEvent::Retrying {
            url: url.to_string(),
            attempt,
            reason: err.to_string(),
        }));
        tokio::select! {
            () = cancel.cancelled() => Err(Error::Cancelled),
            () = tokio::time::sleep(delay) => Ok(()),
        }
    }

    async fn download_with_progress(
        &self,
        request: &DownloadRequest,
        cancel: &CancellationToken,
        progress: &(dyn Fn(ProgressEvent) + Send + Sync),
    ) -> Result<DownloadResult, Error> {
        let start = Instant::now();
        let source = validate_url(&request.url)?;
        self.emit_download_started(request.url.clone(), request.component.clone(), None);

        let mut attempt = 0;
        loop {
            attempt += 1;
            let outcome = match self.try_download(&source, request, cancel, progress).await {
                Err(e) if !e.is_cancelled() && attempt <= self.config.retry.max_retries && is_retryable(&e) => {
                    match self.wait_before_retry(&request.url, attempt, &e, cancel).await {
                        Ok(()) => continue,
                        Err(cancelled) => Err(cancelled),
                    }
                }
                other => other,
            };

            return match outcome {
                Ok((hash, size)) => {
                    self.emit_download_completed(
                        request.url.clone(),
                        request.component.clone(),
                        size,
                        Some(hash.to_string()),
                    );
                    Ok(DownloadResult {
                        path: request.destination.clone(),
                        hash,
                        size,
                        elapsed: start.elapsed(),
                        attempts: attempt,
                    })
                }
                Err(e) if e.is_cancelled() => {
                    tracing::debug!(url = %request.url, "download cancelled");
                    self.emit(AppEvent::Download(DownloadEvent::Cancelled {
                        url: request.url.clone(),
                    }));
                    Err(Error::Cancelled)
                }
                Err(e) => {
                    self.emit(AppEvent::Download(DownloadEvent::Failed {
                        url: request.url.clone(),
                        failure: FailureContext::from_error(&e),
                    }));
                    Err(e)
                }
            };
        }
    }

    /// One attempt; the destination never survives a failed attempt
    async fn try_download(
        &self,
        source: &Source,
        request: &DownloadRequest,
        cancel: &CancellationToken,
        progress: &(dyn Fn(ProgressEvent) + Send + Sync),
    ) -> Result<(Hash, u64), Error> {
        let dest = &request.destination;
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io_with_path(&e, parent))?;
        }
        let _lock = LockGuard::acquire(dest).await?;

        let result = self.transfer(source, request, cancel, progress).await;
        if result.is_err() {
            let _ = tokio::fs::remove_file(dest).await;
        }
        result
    }

    async fn transfer(
        &self,
        source: &Source,
        request: &DownloadRequest,
        cancel: &CancellationToken,
        progress: &(dyn Fn(ProgressEvent) + Send + Sync),
    ) -> Result<(Hash, u64), Error> {
        let dest = &request.destination;
        let (body, total) = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Cancelled),
            opened = self.open(source) => opened?,
        };
        let algorithm = request
            .expected_hash
            .as_ref()
            .map(Hash::algorithm)
            .unwrap_or_default();
        let (streamed, size) = write_stream(
            body,
            Transfer {
                url: &request.url,
                total,
                dest,
                algorithm,
                cancel,
                config: &self.config,
                progress,
            },
        )
        .await?;

        let Some(expected) = &request.expected_hash else {
            return Ok((streamed, size));
        };
        // Re-read from disk so a bad write is caught too
        let actual = Hash::hash_file(expected.algorithm(), dest).await?;
        if &actual != expected {
            self.emit(AppEvent::Download(DownloadEvent::HashMismatch {
                url: request.url.clone(),
                expected: expected.to_string(),
                actual: actual.to_string(),
            }));
            return Err(IntegrityError::HashMismatch {
                path: dest.display().to_string(),
                expected: expected.to_hex(),
                actual: actual.to_hex(),
            }
            .into());
        }
        Ok((actual, size))
    }

    async fn open(&self, source: &Source) -> Result<(ByteStream, Option<u64>), Error> {
        match source {
            Source::File(path) => {
                let file = tokio::fs::File::open(path)
                    .await
                    .map_err(|e| Error::io_with_path(&e, path))?;
                let total = file.metadata().await.ok().map(|m| m.len());
                let path = path.clone();
                let body = ReaderStream::with_capacity(file, self.config.buffer_size)
                    .map_err(move |e| Error::io_with_path(&e, &path))
                    .boxed();
                Ok((body, total))
            }
            Source::Resource(name) => {
                let provider = self
                    .resources
                    .as_ref()
                    .ok_or_else(|| NetworkError::ResourceNotFound(name.clone()))?;
                let data = provider
                    .resource(name)?
                    .ok_or_else(|| NetworkError::ResourceNotFound(name.clone()))?;
                let total = data.len() as u64;
                let bytes = Bytes::from(data);
                let chunk = self.config.buffer_size.max(1);
                let chunks: Vec<Result<Bytes, Error>> = (0..bytes.len())
                    .step_by(chunk)
                    .map(|i| Ok(bytes.slice(i..(i + chunk).min(bytes.len()))))
                    .collect();
                Ok((futures::stream::iter(chunks).boxed(), Some(total)))
            }
            Source::Http(url) => {
                let response = self.client.get(url).await?;
                let total = response.content_length();
                let url = url.clone();
                let body = response
                    .bytes_stream()
                    .map_err(move |e| map_reqwest_error(&e, &url))
                    .boxed();
                Ok((body, total))
            }
        }
    }
}
