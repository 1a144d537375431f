// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Error types for html5bot

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Html5botError>;

#[derive(Error, Debug)]
pub enum Html5botError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Audit failed: {0}")]
    Audit(#[from] AuditError),

    #[error("Validator acquisition failed: {0}")]
    Acquisition(#[from] AcquisitionError),
}

/// Failure to obtain rendered page content. Always fatal to a scan.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("browser unavailable: {0}")]
    BrowserUnavailable(String),

    #[error("timed out after {0}s")]
    Timeout(u64),
}

/// Failure to make the external validator usable. Never fatal to a scan.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionError {
    #[error("download failed: {0}")]
    DownloadFailed(String),

    #[error("runtime missing")]
    RuntimeMissing,
}

/// A single check could not evaluate the document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
    #[error("invalid selector `{0}`")]
    Selector(String),

    #[error("check panicked: {0}")]
    Panicked(String),
}

/// Terminal failure of an audit run; no report is produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuditError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("scan cancelled")]
    Cancelled,
}
