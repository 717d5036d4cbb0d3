//! Download queue for in-scope files
//!
//! Submitting never blocks the crawl loop: each file gets its own task on a
//! `JoinSet`, and a semaphore caps how many are streaming at once. The crawl
//! loop picks up finished results between pages and joins the rest at the end.
//!
//! Bytes are streamed to `<dest>.part` and renamed into place only once the
//! body is complete, so a failed fetch never leaves a file that looks cached.

use crate::archive::CacheProber;
use crate::crawler::fetcher::{describe_error, get_success};
use crate::url::{CanonicalUrl, LinkKind};
use crate::{ArchiveError, Result};
use futures::StreamExt;
use reqwest::{Client, Response};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// How a file ended up in the mirror
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// An earlier run already saved it; nothing was fetched
    Cached,
    /// Fetched and written to disk
    Downloaded { bytes: u64 },
}

/// A resolved download, successful or not
#[derive(Debug)]
pub struct CompletedDownload {
    pub url: CanonicalUrl,
    /// Archive-relative key the file is (or would have been) stored under
    pub key: String,
    pub result: Result<DownloadOutcome>,
}

/// Bounded pool of file downloads
pub struct DownloadQueue {
    client: Client,
    prober: CacheProber,
    use_cache: bool,
    permits: Arc<Semaphore>,
    tasks: JoinSet<CompletedDownload>,
}

impl DownloadQueue {
    /// Creates a queue allowing at most `max_concurrent` fetches in flight
    pub fn new(client: Client, prober: CacheProber, use_cache: bool, max_concurrent: usize) -> Self {
        Self {
            client,
            prober,
            use_cache,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            tasks: JoinSet::new(),
        }
    }

    /// Starts downloading `url` in the background
    pub fn submit(&mut self, url: CanonicalUrl) {
        let client = self.client.clone();
        let prober = self.prober.clone();
        let permits = Arc::clone(&self.permits);
        let use_cache = self.use_cache;

        tracing::debug!("Queued download {}", url);

        self.tasks.spawn(async move {
            let key = prober.layout().relative_key(&url, LinkKind::File);
            let result = download(&client, &prober, use_cache, permits, &url).await;
            CompletedDownload { url, key, result }
        });
    }

    /// A download that has already finished, if any
    pub fn try_next(&mut self) -> Option<Result<CompletedDownload>> {
        self.tasks
            .try_join_next()
            .map(|joined| joined.map_err(ArchiveError::from))
    }

    /// Waits for the next download to finish; `None` once all are done
    pub async fn join_next(&mut self) -> Option<Result<CompletedDownload>> {
        self.tasks
            .join_next()
            .await
            .map(|joined| joined.map_err(ArchiveError::from))
    }

    /// Waits for every outstanding download
    pub async fn join_all(&mut self) -> Vec<Result<CompletedDownload>> {
        let mut finished = Vec::with_capacity(self.tasks.len());
        while let Some(done) = self.join_next().await {
            finished.push(done);
        }
        finished
    }

    /// Downloads submitted but not yet collected
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }
}

async fn download(
    client: &Client,
    prober: &CacheProber,
    use_cache: bool,
    permits: Arc<Semaphore>,
    url: &CanonicalUrl,
) -> Result<DownloadOutcome> {
    if use_cache && prober.has_cached_copy(url).await {
        tracing::debug!("Skipping {} (already in mirror)", url);
        return Ok(DownloadOutcome::Cached);
    }

    let download_error = |message: String| ArchiveError::Download {
        url: url.to_string(),
        message,
    };

    let _permit = permits
        .acquire_owned()
        .await
        .map_err(|e| download_error(e.to_string()))?;

    tracing::info!("Downloading {}", url);
    let dest = prober.layout().archive_path(url, LinkKind::File);
    let bytes = fetch_to_file(client, url.as_str(), &dest)
        .await
        .map_err(download_error)?;

    tracing::debug!("Saved {} ({} bytes)", dest.display(), bytes);
    Ok(DownloadOutcome::Downloaded { bytes })
}

/// Streams `url` to `dest`, creating parent directories as needed
async fn fetch_to_file(client: &Client, url: &str, dest: &Path) -> std::result::Result<u64, String> {
    let response = get_success(client, url).await?;

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
    }

    let partial = partial_path(dest);
    let written = match write_body(response, &partial).await {
        Ok(written) => written,
        Err(e) => {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e);
        }
    };

    if let Err(e) = tokio::fs::rename(&partial, dest).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(format!("Failed to move {} into place: {}", dest.display(), e));
    }

    Ok(written)
}

async fn write_body(response: Response, partial: &Path) -> std::result::Result<u64, String> {
    let mut file = tokio::fs::File::create(partial)
        .await
        .map_err(|e| format!("Failed to create {}: {}", partial.display(), e))?;

    let mut body = response.bytes_stream();
    let mut written = 0u64;
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(describe_error)?;
        file.write_all(&chunk).await.map_err(|e| e.to_string())?;
        written += chunk.len() as u64;
    }

    file.flush().await.map_err(|e| e.to_string())?;
    Ok(written)
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}
