// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Audit reports and their text/JSON renderings
//!
//! A [`Report`] is assembled once per scan and never modified afterwards.
//! [`render`] is pure: the same report always renders to the same text.

use crate::checks::{sort_findings, Category, Finding, Status};
use crate::fetcher::Screenshot;
use crate::target::AuditTarget;
use crate::validator::{UnavailableReason, ValidatorResult};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::fmt;

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// Structured JSON
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}

/// Facts about the fetched page shown in the report header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageSummary {
    /// URL after redirects
    pub final_url: String,
    pub fetch_duration_ms: u64,
    pub html_bytes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    target: AuditTarget,
    timestamp: DateTime<Utc>,
    page: PageSummary,
    findings: Vec<Finding>,
    validator: ValidatorResult,
    #[serde(skip)]
    screenshot: Option<Screenshot>,
}

impl Report {
    /// Findings are put in (category, check id) order regardless of the
    /// order they were produced in.
    pub fn new(
        target: AuditTarget,
        timestamp: DateTime<Utc>,
        page: PageSummary,
        mut findings: Vec<Finding>,
        validator: ValidatorResult,
    ) -> Self {
        sort_findings(&mut findings);
        Self {
            target,
            timestamp,
            page,
            findings,
            validator,
            screenshot: None,
        }
    }

    pub fn with_screenshot(mut self, screenshot: Screenshot) -> Self {
        self.screenshot = Some(screenshot);
        self
    }

    pub fn target(&self) -> &AuditTarget {
        &self.target
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn page(&self) -> &PageSummary {
        &self.page
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn finding(&self, check_id: &str) -> Option<&Finding> {
        self.findings.iter().find(|f| f.check_id == check_id)
    }

    pub fn validator(&self) -> &ValidatorResult {
        &self.validator
    }

    pub fn screenshot(&self) -> Option<&Screenshot> {
        self.screenshot.as_ref()
    }

    pub fn count(&self, status: Status) -> usize {
        self.findings.iter().filter(|f| f.status == status).count()
    }

    /// Any failed check or validator error
    pub fn has_failures(&self) -> bool {
        self.count(Status::Fail) > 0 || self.validator.error_count() > 0
    }
}

const CATEGORIES: [Category; 4] = [
    Category::Structure,
    Category::Seo,
    Category::Accessibility,
    Category::Social,
];

pub fn render_as(report: &Report, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => render(report),
        OutputFormat::Json => render_json(report),
    }
}

/// Render a report as plain text
pub fn render(report: &Report) -> String {
    let mut output = String::new();

    output.push_str("=== html5bot Page Audit Report ===\n\n");
    output.push_str(&format!("Target:    {}\n", report.target));
    if report.page.final_url != report.target.as_str() {
        output.push_str(&format!("Final URL: {}\n", report.page.final_url));
    }
    output.push_str(&format!(
        "Scanned:   {}\n",
        report.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
    ));
    output.push_str(&format!(
        "Fetched:   {} bytes in {} ms\n\n",
        report.page.html_bytes, report.page.fetch_duration_ms
    ));

    output.push_str(&format!(
        "Checks: {} passed, {} failed, {} warning(s), {} not applicable\n\n",
        report.count(Status::Pass),
        report.count(Status::Fail),
        report.count(Status::Warning),
        report.count(Status::NotApplicable)
    ));

    for category in CATEGORIES {
        let findings: Vec<&Finding> = report
            .findings
            .iter()
            .filter(|f| f.category == category)
            .collect();
        if findings.is_empty() {
            continue;
        }

        output.push_str(&format!("--- {} ---\n", category.title()));
        for finding in findings {
            render_finding(&mut output, finding);
        }
        output.push('\n');
    }

    output.push_str("--- HTML5 Validation ---\n");
    render_validator(&mut output, &report.validator);

    output
}

fn render_finding(output: &mut String, finding: &Finding) {
    output.push_str(&format!(
        "[{}] {} {}: {}\n",
        finding.status.label(),
        finding.check_id,
        finding.name,
        finding.message
    ));
    for detail in &finding.details {
        output.push_str(&format!("  - {}\n", detail));
    }
    if let Some(ref suggestion) = finding.suggestion {
        output.push_str(&format!("  Fix: {}\n", suggestion));
    }
}

fn render_validator(output: &mut String, result: &ValidatorResult) {
    match result {
        ValidatorResult::Unavailable { reason } => {
            output.push_str(&format!("Validator unavailable: {}\n", reason));
            if let Some(detail) = reason.detail() {
                output.push_str(&format!("  Cause: {}\n", detail));
            }
            if *reason != UnavailableReason::Disabled {
                output.push_str("Performing basic structural checks only.\n");
            }
        }
        ValidatorResult::Validated { messages } => {
            if result.error_count() == 0 {
                output.push_str("Page is valid HTML5 (no errors)\n");
            } else {
                output.push_str(&format!(
                    "{} error(s) out of {} message(s)\n",
                    result.error_count(),
                    messages.len()
                ));
            }
            for message in messages {
                match message.line {
                    Some(line) => output.push_str(&format!(
                        "{} line {}: {}\n",
                        message.severity.label(),
                        line,
                        message.message
                    )),
                    None => output.push_str(&format!(
                        "{}: {}\n",
                        message.severity.label(),
                        message.message
                    )),
                }
            }
        }
    }
}

/// Render a report as pretty-printed JSON
pub fn render_json(report: &Report) -> String {
    serde_json::to_string_pretty(report).unwrap_or_else(|e| {
        format!("{{\"error\": \"Failed to serialize report: {}\"}}", e)
    })
}
