// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Page fetching backends
//!
//! The audit only needs rendered HTML, an optional screenshot and the final
//! URL for a target. How a backend produces them (plain HTTP, a headless
//! browser, a remote rendering service) stays behind [`PageFetcher`].

pub mod chrome;
pub mod http;

use crate::config::{FetcherBackend, FetcherConfig};
use crate::error::FetchError;
use crate::target::AuditTarget;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub use chrome::ChromeFetcher;
pub use http::HttpFetcher;

/// PNG screenshot of the rendered page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screenshot {
    png: Vec<u8>,
}

impl Screenshot {
    pub fn from_png(png: Vec<u8>) -> Self {
        Self { png }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.png
    }

    pub fn len(&self) -> usize {
        self.png.len()
    }

    pub fn is_empty(&self) -> bool {
        self.png.is_empty()
    }
}

/// Output of a successful fetch. Owned by exactly one audit run.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    html: String,
    final_url: String,
    screenshot: Option<Screenshot>,
    duration_ms: u64,
}

impl RenderedPage {
    pub fn new(html: impl Into<String>, final_url: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            final_url: final_url.into(),
            screenshot: None,
            duration_ms: 0,
        }
    }

    pub fn with_screenshot(mut self, screenshot: Screenshot) -> Self {
        self.screenshot = Some(screenshot);
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    /// URL after redirects
    pub fn final_url(&self) -> &str {
        &self.final_url
    }

    pub fn screenshot(&self) -> Option<&Screenshot> {
        self.screenshot.as_ref()
    }

    /// Wall-clock time the backend spent producing this page
    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub(crate) fn into_parts(self) -> (String, String, Option<Screenshot>, u64) {
        (self.html, self.final_url, self.screenshot, self.duration_ms)
    }
}

/// Capability: "give me rendered HTML and a screenshot for this URL".
///
/// Retries, if any, belong to the implementation; callers treat every
/// error as fatal for the scan.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    async fn fetch(&self, target: &AuditTarget, timeout: Duration)
        -> Result<RenderedPage, FetchError>;
}

/// Build the backend selected in configuration
pub fn from_config(config: &FetcherConfig) -> Result<Arc<dyn PageFetcher>, FetchError> {
    Ok(match config.backend {
        FetcherBackend::Http => Arc::new(HttpFetcher::new(config)?),
        FetcherBackend::Chrome => Arc::new(ChromeFetcher::new(config)?),
    })
}
