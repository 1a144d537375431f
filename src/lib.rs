// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! html5bot: Web Page Auditor
//!
//! Audits a single rendered web page for:
//!
//! - HTML5 structure (doctype, document language)
//! - SEO essentials (title, H1, canonical link, robots directives)
//! - Accessibility (image alternative text)
//! - Social metadata (OpenGraph, Twitter Cards)
//!
//! and, when a Java runtime is available, strict conformance through the
//! Nu HTML Checker. Missing validation degrades the report, it never fails
//! the scan.
//!
//! Part of the Hyperpolymath Gitbot Fleet.

pub mod audit;
pub mod checks;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod report;
pub mod target;
pub mod validator;

pub use audit::{abort_pair, AbortHandle, AbortSignal, AuditState, Auditor, ScanRequest};
pub use checks::{Category, Check, CheckInfo, CheckRegistry, Finding, ParsedPage, Status};
pub use config::Config;
pub use error::{AcquisitionError, AuditError, CheckError, FetchError, Html5botError, Result};
pub use fetcher::{PageFetcher, RenderedPage, Screenshot};
pub use report::{render, render_json, OutputFormat, PageSummary, Report};
pub use target::AuditTarget;
pub use validator::{
    ArtifactCache, ExternalValidator, HtmlValidator, UnavailableReason, ValidatorMessage,
    ValidatorResult,
};
