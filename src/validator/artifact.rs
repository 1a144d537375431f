// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Validator artifact cache and one-time acquisition
//!
//! The only process-wide state in html5bot: whether the checker jar is on
//! disk. The flag is set on the first successful acquisition and never
//! cleared. At most one download is in flight at a time; callers that
//! arrive while it runs await its outcome instead of starting another.

use crate::error::AcquisitionError;
use async_trait::async_trait;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub type AcquireOutcome = Result<(), AcquisitionError>;

/// Fetches the validator artifact to a local path
#[async_trait]
pub trait ArtifactDownloader: Send + Sync {
    /// Download to `dest`, returning the number of bytes written
    async fn download(&self, dest: &Path) -> Result<u64, AcquisitionError>;
}

/// Streams the artifact over HTTP into `<dest>.part`, then renames it
pub struct HttpDownloader {
    url: String,
    timeout: Duration,
}

impl HttpDownloader {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }

    async fn stream_to(&self, part: &Path) -> Result<u64, AcquisitionError> {
        let failed = |e: reqwest::Error| AcquisitionError::DownloadFailed(e.to_string());

        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(failed)?;

        let mut response = client
            .get(&self.url)
            .send()
            .await
            .map_err(failed)?
            .error_for_status()
            .map_err(failed)?;

        let total = response.content_length();
        let io_failed = |e: std::io::Error| {
            AcquisitionError::DownloadFailed(format!("{}: {}", part.display(), e))
        };
        let mut file = tokio::fs::File::create(part).await.map_err(io_failed)?;

        let mut downloaded: u64 = 0;
        let mut last_decile = 0;
        while let Some(chunk) = response.chunk().await.map_err(failed)? {
            file.write_all(&chunk).await.map_err(io_failed)?;
            downloaded += chunk.len() as u64;

            if let Some(total) = total.filter(|t| *t > 0) {
                let decile = downloaded * 10 / total;
                if decile > last_decile {
                    last_decile = decile;
                    debug!("Downloading validator ({}%)", decile * 10);
                }
            }
        }
        file.flush().await.map_err(io_failed)?;

        if downloaded == 0 {
            return Err(AcquisitionError::DownloadFailed(format!(
                "{} returned an empty body",
                self.url
            )));
        }

        Ok(downloaded)
    }
}

#[async_trait]
impl ArtifactDownloader for HttpDownloader {
    async fn download(&self, dest: &Path) -> Result<u64, AcquisitionError> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AcquisitionError::DownloadFailed(format!("{}: {}", parent.display(), e))
            })?;
        }

        let mut part = dest.as_os_str().to_owned();
        part.push(".part");
        let part = PathBuf::from(part);

        match self.stream_to(&part).await {
            Ok(bytes) => {
                tokio::fs::rename(&part, dest).await.map_err(|e| {
                    AcquisitionError::DownloadFailed(format!("{}: {}", dest.display(), e))
                })?;
                Ok(bytes)
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&part).await;
                Err(e)
            }
        }
    }
}

type InFlight = Option<watch::Receiver<Option<AcquireOutcome>>>;

/// Process-wide record of the validator artifact.
///
/// Create one per process and share it (`Arc`) between validators.
pub struct ArtifactCache {
    path: PathBuf,
    downloader: Box<dyn ArtifactDownloader>,
    acquired: AtomicBool,
    in_flight: Mutex<InFlight>,
}

impl ArtifactCache {
    pub fn new(path: impl Into<PathBuf>, downloader: Box<dyn ArtifactDownloader>) -> Self {
        Self {
            path: path.into(),
            downloader,
            acquired: AtomicBool::new(false),
            in_flight: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True once the artifact has been acquired, or if it is already on disk
    pub fn is_present(&self) -> bool {
        self.acquired.load(Ordering::Acquire) || self.path.is_file()
    }

    /// Make sure the artifact is on disk, downloading it at most once
    /// concurrently.
    pub async fn acquire(&self) -> AcquireOutcome {
        if self.acquired.load(Ordering::Acquire) {
            return Ok(());
        }
        if self.path.is_file() {
            self.acquired.store(true, Ordering::Release);
            return Ok(());
        }

        let (leader, mut rx) = {
            let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            if self.acquired.load(Ordering::Acquire) {
                return Ok(());
            }
            match slot.as_ref() {
                Some(rx) => (None, rx.clone()),
                None => {
                    let (tx, rx) = watch::channel(None);
                    *slot = Some(rx.clone());
                    (Some(tx), rx)
                }
            }
        };

        let Some(tx) = leader else {
            debug!("Validator download already in flight, waiting");
            return match rx.wait_for(Option::is_some).await {
                Ok(outcome) => outcome.clone().unwrap_or(Ok(())),
                Err(_) => Err(AcquisitionError::DownloadFailed(
                    "concurrent download was interrupted".to_string(),
                )),
            };
        };

        let _clear = ClearInFlight(&self.in_flight);

        info!("Downloading validator to {}", self.path.display());
        let outcome = match self.downloader.download(&self.path).await {
            Ok(bytes) => {
                self.acquired.store(true, Ordering::Release);
                info!("Validator downloaded ({} bytes)", bytes);
                Ok(())
            }
            Err(e) => {
                warn!("Validator download failed: {}", e);
                Err(e)
            }
        };

        let _ = tx.send(Some(outcome.clone()));
        outcome
    }
}

/// Frees the in-flight slot when the leading acquisition ends, including
/// when its future is dropped mid-download.
struct ClearInFlight<'a>(&'a Mutex<InFlight>);

impl Drop for ClearInFlight<'_> {
    fn drop(&mut self) {
        let mut slot = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct WritingDownloader {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ArtifactDownloader for WritingDownloader {
        async fn download(&self, dest: &Path) -> Result<u64, AcquisitionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::fs::write(dest, b"jar").await.unwrap();
            Ok(3)
        }
    }

    #[tokio::test]
    async fn test_existing_file_needs_no_download() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vnu.jar");
        std::fs::write(&path, b"jar").unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let cache = ArtifactCache::new(&path, Box::new(WritingDownloader { calls: calls.clone() }));

        assert!(cache.is_present());
        cache.acquire().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_flag_survives_file_removal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vnu.jar");

        let calls = Arc::new(AtomicUsize::new(0));
        let cache = ArtifactCache::new(&path, Box::new(WritingDownloader { calls: calls.clone() }));

        cache.acquire().await.unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(cache.is_present());
        cache.acquire().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
