// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Headless Chrome/Chromium fetcher
//!
//! Drives the browser binary directly: one `--dump-dom` run for the
//! rendered document and one `--screenshot` run for the preview image.
//! Every child is spawned with `kill_on_drop`, so dropping the fetch future
//! (timeout or user abort) terminates the browser.
//!
//! The command-line browser cannot report where it ended up, so HTTP
//! redirects are resolved with a plain request first and both browser runs
//! load the resolved URL. Redirects made by page scripts are not seen.

use super::{PageFetcher, RenderedPage, Screenshot};
use crate::config::FetcherConfig;
use crate::error::FetchError;
use crate::target::AuditTarget;
use async_trait::async_trait;
use reqwest::Client;
use std::process::{Output, Stdio};
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, info, warn};

pub struct ChromeFetcher {
    client: Client,
    binary: String,
    window_width: u32,
    window_height: u32,
    settle_ms: u64,
}

impl ChromeFetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FetchError::Network(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            binary: config.chrome_binary.clone(),
            window_width: config.window_width,
            window_height: config.window_height,
            settle_ms: config.settle_ms,
        })
    }

    /// Follow HTTP redirects for `target` without reading the body
    async fn resolve(&self, target: &AuditTarget, timeout: Duration) -> Result<String, FetchError> {
        let response = self
            .client
            .get(target.url().clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout(timeout.as_secs())
                } else {
                    FetchError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Network(format!(
                "{} returned HTTP {}",
                target, status
            )));
        }

        let final_url = response.url().to_string();
        if final_url != target.as_str() {
            debug!("{} redirects to {}", target, final_url);
        }
        Ok(final_url)
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--hide-scrollbars")
            .arg(format!(
                "--window-size={},{}",
                self.window_width, self.window_height
            ))
            .arg(format!("--virtual-time-budget={}", self.settle_ms))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn run(&self, mut cmd: Command, timeout: Duration) -> Result<Output, FetchError> {
        let child = cmd.spawn().map_err(|e| {
            FetchError::BrowserUnavailable(format!("failed to launch {}: {}", self.binary, e))
        })?;

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(FetchError::BrowserUnavailable(format!(
                "{} did not complete: {}",
                self.binary, e
            ))),
            Err(_) => Err(FetchError::Timeout(timeout.as_secs())),
        }
    }

    async fn capture_screenshot(&self, url: &str, timeout: Duration) -> Option<Screenshot> {
        let dir = match tempfile::tempdir() {
            Ok(d) => d,
            Err(e) => {
                warn!("Skipping screenshot, no scratch directory: {}", e);
                return None;
            }
        };
        let path = dir.path().join("page_preview.png");

        let mut cmd = self.command();
        cmd.arg(format!("--screenshot={}", path.display())).arg(url);

        match self.run(cmd, timeout).await {
            Ok(output) if output.status.success() => match tokio::fs::read(&path).await {
                Ok(png) => Some(Screenshot::from_png(png)),
                Err(e) => {
                    warn!("Browser wrote no screenshot: {}", e);
                    None
                }
            },
            Ok(output) => {
                warn!("Screenshot run exited with {}", output.status);
                None
            }
            Err(e) => {
                warn!("Screenshot run failed: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl PageFetcher for ChromeFetcher {
    fn name(&self) -> &str {
        "chrome"
    }

    async fn fetch(
        &self,
        target: &AuditTarget,
        timeout: Duration,
    ) -> Result<RenderedPage, FetchError> {
        let start = Instant::now();
        let final_url = self.resolve(target, timeout).await?;
        let remaining = timeout.saturating_sub(start.elapsed());

        let mut cmd = self.command();
        cmd.arg("--dump-dom").arg(&final_url);

        info!("Rendering {} with {}", final_url, self.binary);
        let output = self.run(cmd, remaining).await.map_err(|e| match e {
            FetchError::Timeout(_) => FetchError::Timeout(timeout.as_secs()),
            other => other,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FetchError::Network(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                stderr.trim()
            )));
        }

        let html = String::from_utf8_lossy(&output.stdout).into_owned();
        if html.trim().is_empty() {
            return Err(FetchError::Network(format!(
                "{} rendered an empty document for {}",
                self.binary, final_url
            )));
        }

        let remaining = timeout.saturating_sub(start.elapsed());
        let screenshot = if remaining.is_zero() {
            debug!("No time left for a screenshot of {}", final_url);
            None
        } else {
            self.capture_screenshot(&final_url, remaining).await
        };

        let mut page = RenderedPage::new(html, final_url);
        if let Some(shot) = screenshot {
            debug!("Captured {} byte screenshot", shot.len());
            page = page.with_screenshot(shot);
        }

        Ok(page.with_duration_ms(start.elapsed().as_millis() as u64))
    }
}
