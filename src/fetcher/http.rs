// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Plain HTTP fetcher (no script execution, no screenshot)

use super::{PageFetcher, RenderedPage};
use crate::config::FetcherConfig;
use crate::error::FetchError;
use crate::target::AuditTarget;
use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::debug;

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FetchError::Network(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(
        &self,
        target: &AuditTarget,
        timeout: Duration,
    ) -> Result<RenderedPage, FetchError> {
        let start = Instant::now();
        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                FetchError::Timeout(timeout.as_secs())
            } else {
                FetchError::Network(e.to_string())
            }
        };

        let response = self
            .client
            .get(target.url().clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Network(format!(
                "{} returned HTTP {}",
                target, status
            )));
        }

        let final_url = response.url().to_string();
        let html = response.text().await.map_err(classify)?;
        let duration_ms = start.elapsed().as_millis() as u64;

        debug!(
            "Fetched {} ({} bytes) in {}ms",
            final_url,
            html.len(),
            duration_ms
        );

        Ok(RenderedPage::new(html, final_url).with_duration_ms(duration_ms))
    }
}
