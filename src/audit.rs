// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Audit orchestration
//!
//! One scan walks `Idle → Fetching → Checking → Validating → Aggregating →
//! Done`. A fetch error ends it in `Failed`, a user abort during the fetch
//! in `Cancelled`; neither produces a report. The checks and the validator
//! run concurrently once the page is in hand.

use crate::checks::CheckRegistry;
use crate::error::{AuditError, FetchError};
use crate::fetcher::PageFetcher;
use crate::report::{PageSummary, Report};
use crate::target::AuditTarget;
use crate::validator::HtmlValidator;
use chrono::Utc;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditState {
    Idle,
    Fetching,
    Checking,
    Validating,
    Aggregating,
    Done,
    Failed,
    Cancelled,
}

impl AuditState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }

    pub fn can_transition_to(&self, next: AuditState) -> bool {
        use AuditState::*;
        matches!(
            (self, next),
            (Idle, Fetching)
                | (Fetching, Checking)
                | (Fetching, Failed)
                | (Fetching, Cancelled)
                | (Checking, Validating)
                | (Validating, Aggregating)
                | (Aggregating, Done)
        )
    }
}

impl fmt::Display for AuditState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Checking => "checking",
            Self::Validating => "validating",
            Self::Aggregating => "aggregating",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Create a linked abort handle and signal for one scan
pub fn abort_pair() -> (AbortHandle, AbortSignal) {
    let (tx, rx) = watch::channel(false);
    (AbortHandle { tx }, AbortSignal { rx })
}

/// Requests cancellation of a scan in flight
#[derive(Debug)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }
}

#[derive(Debug, Clone)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

impl AbortSignal {
    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once abort is requested. Never resolves if the handle is
    /// dropped without aborting.
    pub async fn aborted(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|aborted| *aborted).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// A scan of one raw URL, with optional abort and progress hooks
#[derive(Debug)]
pub struct ScanRequest {
    url: String,
    abort: Option<AbortSignal>,
    progress: Option<mpsc::UnboundedSender<AuditState>>,
}

impl ScanRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            abort: None,
            progress: None,
        }
    }

    pub fn with_abort(mut self, signal: AbortSignal) -> Self {
        self.abort = Some(signal);
        self
    }

    /// Receive every state the scan enters, in order
    pub fn with_progress(mut self, progress: mpsc::UnboundedSender<AuditState>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

struct StateTracker {
    state: AuditState,
    progress: Option<mpsc::UnboundedSender<AuditState>>,
}

impl StateTracker {
    fn new(progress: Option<mpsc::UnboundedSender<AuditState>>) -> Self {
        Self {
            state: AuditState::Idle,
            progress,
        }
    }

    fn advance(&mut self, next: AuditState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        debug!("Audit state {} -> {}", self.state, next);
        self.state = next;
        if let Some(ref progress) = self.progress {
            let _ = progress.send(next);
        }
    }
}

/// Composes a fetcher, the check registry and a validator into scans.
///
/// An `Auditor` holds no per-scan state; concurrent scans share only the
/// validator's artifact cache.
pub struct Auditor {
    fetcher: Arc<dyn PageFetcher>,
    validator: Arc<dyn HtmlValidator>,
    registry: Arc<CheckRegistry>,
    fetch_timeout: Duration,
}

impl Auditor {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        validator: Arc<dyn HtmlValidator>,
        registry: CheckRegistry,
    ) -> Self {
        Self {
            fetcher,
            validator,
            registry: Arc::new(registry),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &CheckRegistry {
        &self.registry
    }

    /// Run one scan to completion.
    pub async fn scan(&self, request: ScanRequest) -> Result<Report, AuditError> {
        let ScanRequest {
            url,
            abort,
            progress,
        } = request;
        let mut tracker = StateTracker::new(progress);

        tracker.advance(AuditState::Fetching);
        let target = match AuditTarget::parse(&url) {
            Ok(target) => target,
            Err(e) => {
                warn!("Rejected scan target: {}", e);
                tracker.advance(AuditState::Failed);
                return Err(FetchError::Network(e).into());
            }
        };

        info!("Fetching {} with {}", target, self.fetcher.name());
        let started = Instant::now();
        let fetch = async {
            match tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch(&target, self.fetch_timeout))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout(self.fetch_timeout.as_secs())),
            }
        };

        let fetched = match abort {
            Some(ref signal) => tokio::select! {
                biased;
                _ = signal.aborted() => None,
                result = fetch => Some(result),
            },
            None => Some(fetch.await),
        };

        let page = match fetched {
            None => {
                info!("Scan of {} cancelled", target);
                tracker.advance(AuditState::Cancelled);
                return Err(AuditError::Cancelled);
            }
            Some(Err(e)) => {
                warn!("Fetch of {} failed: {}", target, e);
                tracker.advance(AuditState::Failed);
                return Err(e.into());
            }
            Some(Ok(page)) => page,
        };

        let (html, final_url, screenshot, duration_ms) = page.into_parts();
        let fetch_duration_ms = if duration_ms > 0 {
            duration_ms
        } else {
            started.elapsed().as_millis() as u64
        };
        info!(
            "Fetched {} ({} bytes in {} ms)",
            final_url,
            html.len(),
            fetch_duration_ms
        );
        tracker.advance(AuditState::Checking);

        let html: Arc<str> = Arc::from(html);
        let registry = Arc::clone(&self.registry);
        let check_html = Arc::clone(&html);

        let checks = async {
            let findings =
                match tokio::task::spawn_blocking(move || registry.run_all(&check_html)).await {
                    Ok(findings) => findings,
                    Err(e) => {
                        warn!("Check task failed: {}", e);
                        self.registry
                            .not_applicable_all(&format!("Checks could not run: {}", e))
                    }
                };
            tracker.advance(AuditState::Validating);
            findings
        };
        let validation = self.validator.validate(&html);

        let (findings, validator) = tokio::join!(checks, validation);
        tracker.advance(AuditState::Aggregating);

        let page = PageSummary {
            final_url,
            fetch_duration_ms,
            html_bytes: html.len(),
        };
        let mut report = Report::new(target, Utc::now(), page, findings, validator);
        if let Some(screenshot) = screenshot {
            report = report.with_screenshot(screenshot);
        }

        tracker.advance(AuditState::Done);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_table() {
        use AuditState::*;
        assert!(Idle.can_transition_to(Fetching));
        assert!(Fetching.can_transition_to(Failed));
        assert!(Fetching.can_transition_to(Cancelled));
        assert!(!Checking.can_transition_to(Failed));
        assert!(!Idle.can_transition_to(Checking));
        assert!(!Done.can_transition_to(Fetching));
        assert!(Done.is_terminal() && Failed.is_terminal() && Cancelled.is_terminal());
        assert!(!Validating.is_terminal());
    }

    #[tokio::test]
    async fn test_abort_signal() {
        let (handle, signal) = abort_pair();
        assert!(!signal.is_aborted());
        handle.abort();
        assert!(signal.is_aborted());
        signal.aborted().await;
    }

    #[tokio::test]
    async fn test_dropped_handle_never_aborts() {
        let (handle, signal) = abort_pair();
        drop(handle);
        let waited = tokio::time::timeout(Duration::from_millis(50), signal.aborted()).await;
        assert!(waited.is_err());
    }
}
