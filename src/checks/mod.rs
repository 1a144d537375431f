// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Page checks for HTML5 structure, SEO and social metadata
//!
//! Every check is a pure function of the parsed document: no network, no
//! shared mutable state. The registry runs them in registration order,
//! isolates failures, and sorts the findings so the outcome never depends
//! on evaluation order.

pub mod accessibility;
pub mod seo;
pub mod social;
pub mod structure;

use crate::config::ChecksConfig;
use crate::error::CheckError;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

/// Outcome of a single check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Pass,
    Fail,
    Warning,
    NotApplicable,
}

impl Status {
    /// Short label used in text reports
    pub fn label(&self) -> &'static str {
        match self {
            Status::Pass => "PASS",
            Status::Fail => "FAIL",
            Status::Warning => "WARN",
            Status::NotApplicable => "N/A",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Report section a check belongs to. Declaration order is report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Structure,
    Seo,
    Accessibility,
    Social,
}

impl Category {
    pub fn title(&self) -> &'static str {
        match self {
            Category::Structure => "Structure",
            Category::Seo => "SEO Essentials",
            Category::Accessibility => "Accessibility",
            Category::Social => "Social Metadata",
        }
    }
}

/// Static identity of a check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub category: Category,
}

/// One check's output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Check identifier (e.g. "SEO-001")
    pub check_id: String,
    /// Human-readable check name
    pub name: String,
    pub category: Category,
    pub status: Status,
    pub message: String,
    /// Structured detail, e.g. image sources missing alt text
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Finding {
    pub fn new(info: CheckInfo, status: Status, message: &str) -> Self {
        Self {
            check_id: info.id.to_string(),
            name: info.name.to_string(),
            category: info.category,
            status,
            message: message.to_string(),
            details: Vec::new(),
            suggestion: None,
        }
    }

    pub fn pass(info: CheckInfo, message: &str) -> Self {
        Self::new(info, Status::Pass, message)
    }

    pub fn fail(info: CheckInfo, message: &str) -> Self {
        Self::new(info, Status::Fail, message)
    }

    pub fn warning(info: CheckInfo, message: &str) -> Self {
        Self::new(info, Status::Warning, message)
    }

    pub fn not_applicable(info: CheckInfo, message: &str) -> Self {
        Self::new(info, Status::NotApplicable, message)
    }

    pub fn with_details<I, S>(mut self, details: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.details = details.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.suggestion = Some(suggestion.to_string());
        self
    }
}

/// A parsed document handed to every check
pub struct ParsedPage {
    document: Html,
    has_markup: bool,
}

impl ParsedPage {
    pub fn parse(source: &str) -> Self {
        Self {
            document: Html::parse_document(source),
            has_markup: contains_element_tag(source),
        }
    }

    pub fn document(&self) -> &Html {
        &self.document
    }

    /// False for empty or plain-text sources. The HTML parser always
    /// synthesises `<html>`, `<head>` and `<body>`, so this is the only
    /// reliable signal that there is no real document to inspect.
    pub fn has_markup(&self) -> bool {
        self.has_markup
    }

    pub fn select_all(&self, css: &str) -> Result<Vec<scraper::ElementRef<'_>>, CheckError> {
        let selector = selector(css)?;
        Ok(self.document.select(&selector).collect())
    }

    pub fn select_first(&self, css: &str) -> Result<Option<scraper::ElementRef<'_>>, CheckError> {
        let selector = selector(css)?;
        Ok(self.document.select(&selector).next())
    }
}

fn contains_element_tag(source: &str) -> bool {
    let bytes = source.as_bytes();
    bytes
        .windows(2)
        .any(|w| w[0] == b'<' && w[1].is_ascii_alphabetic())
}

pub(crate) fn selector(css: &str) -> Result<Selector, CheckError> {
    Selector::parse(css).map_err(|_| CheckError::Selector(css.to_string()))
}

/// Collapse whitespace runs the way a browser renders text
pub(crate) fn normalize_text<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Trait for all page checks
pub trait Check: Send + Sync {
    fn info(&self) -> CheckInfo;

    /// Short description of what this check verifies
    fn description(&self) -> &str;

    /// Evaluate the document and produce exactly one finding
    fn run(&self, page: &ParsedPage) -> Result<Finding, CheckError>;
}

/// Guard shared by checks that need a real document
pub(crate) fn require_markup(info: CheckInfo, page: &ParsedPage) -> Option<Finding> {
    if page.has_markup() {
        None
    } else {
        Some(Finding::not_applicable(
            info,
            "Document contains no HTML markup.",
        ))
    }
}

/// Ordered set of independent checks
#[derive(Default)]
pub struct CheckRegistry {
    checks: Vec<Box<dyn Check>>,
}

impl CheckRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard check set, configured with the given thresholds
    pub fn with_defaults(config: &ChecksConfig) -> Self {
        let mut registry = Self::new();
        registry
            .register(Box::new(structure::DoctypeCheck))
            .register(Box::new(structure::LangCheck))
            .register(Box::new(seo::TitleCheck::new(
                config.title_min_length,
                config.title_max_length,
            )))
            .register(Box::new(seo::H1Check))
            .register(Box::new(seo::CanonicalCheck))
            .register(Box::new(seo::RobotsCheck))
            .register(Box::new(accessibility::ImageAltCheck))
            .register(Box::new(social::OpenGraphCheck::new(
                config.required_opengraph.clone(),
            )))
            .register(Box::new(social::TwitterCardCheck::new(
                config.required_twitter.clone(),
            )));
        registry
    }

    /// Append a check. A check whose id is already registered is ignored.
    pub fn register(&mut self, check: Box<dyn Check>) -> &mut Self {
        let id = check.info().id;
        if self.checks.iter().any(|c| c.info().id == id) {
            warn!("Check {} already registered, ignoring duplicate", id);
        } else {
            self.checks.push(check);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    pub fn checks(&self) -> impl Iterator<Item = &dyn Check> {
        self.checks.iter().map(|c| c.as_ref())
    }

    /// Run every check against `html`.
    ///
    /// A check that errors or panics yields a not-applicable finding for
    /// itself only. The result is sorted by (category, check id).
    pub fn run_all(&self, html: &str) -> Vec<Finding> {
        let page = ParsedPage::parse(html);

        let mut findings: Vec<Finding> = self
            .checks
            .iter()
            .map(|check| run_isolated(check.as_ref(), &page))
            .collect();

        sort_findings(&mut findings);
        findings
    }

    /// One not-applicable finding per check, used when the checks could
    /// not be evaluated at all.
    pub fn not_applicable_all(&self, reason: &str) -> Vec<Finding> {
        let mut findings: Vec<Finding> = self
            .checks
            .iter()
            .map(|c| Finding::not_applicable(c.info(), reason))
            .collect();
        sort_findings(&mut findings);
        findings
    }
}

pub fn sort_findings(findings: &mut [Finding]) {
    findings.sort_by(|a, b| {
        a.category
            .cmp(&b.category)
            .then_with(|| a.check_id.cmp(&b.check_id))
    });
}

fn run_isolated(check: &dyn Check, page: &ParsedPage) -> Finding {
    let info = check.info();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| check.run(page)))
        .unwrap_or_else(|payload| Err(CheckError::Panicked(panic_message(payload.as_ref()))));

    match outcome {
        Ok(finding) => {
            debug!("{} -> {}", info.id, finding.status);
            finding
        }
        Err(e) => {
            warn!("{} could not run: {}", info.id, e);
            Finding::not_applicable(info, &format!("Check could not run: {}", e))
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <title>Quotes to Scrape - famous quotes</title>
  <link rel="canonical" href="https://quotes.toscrape.com/">
  <meta name="robots" content="index, follow">
  <meta property="og:title" content="Quotes">
  <meta property="og:description" content="Famous quotes">
  <meta property="og:image" content="https://quotes.toscrape.com/og.png">
  <meta name="twitter:card" content="summary">
</head>
<body>
  <h1>Quotes to Scrape</h1>
  <img src="/logo.png" alt="Quotes to Scrape logo">
</body>
</html>"#;

    struct PanickingCheck;

    impl Check for PanickingCheck {
        fn info(&self) -> CheckInfo {
            CheckInfo {
                id: "TST-999",
                name: "Panics",
                category: Category::Structure,
            }
        }

        fn description(&self) -> &str {
            "always panics"
        }

        fn run(&self, _page: &ParsedPage) -> Result<Finding, CheckError> {
            panic!("boom")
        }
    }

    struct ErroringCheck;

    impl Check for ErroringCheck {
        fn info(&self) -> CheckInfo {
            CheckInfo {
                id: "TST-998",
                name: "Errors",
                category: Category::Seo,
            }
        }

        fn description(&self) -> &str {
            "always errors"
        }

        fn run(&self, page: &ParsedPage) -> Result<Finding, CheckError> {
            page.select_all("::not a selector::")?;
            unreachable!("selector must not parse")
        }
    }

    #[test]
    fn test_defaults_register_nine_checks() {
        let registry = CheckRegistry::with_defaults(&ChecksConfig::default());
        assert_eq!(registry.len(), 9);
    }

    #[test]
    fn test_good_page_passes_everything() {
        let registry = CheckRegistry::with_defaults(&ChecksConfig::default());
        let findings = registry.run_all(GOOD_PAGE);
        assert_eq!(findings.len(), 9);
        for f in &findings {
            assert_eq!(f.status, Status::Pass, "{} -> {}: {}", f.check_id, f.status, f.message);
        }
    }

    #[test]
    fn test_failing_checks_do_not_abort_others() {
        let mut registry = CheckRegistry::with_defaults(&ChecksConfig::default());
        registry
            .register(Box::new(PanickingCheck))
            .register(Box::new(ErroringCheck));

        let findings = registry.run_all(GOOD_PAGE);
        assert_eq!(findings.len(), 11);

        let panicked = findings.iter().find(|f| f.check_id == "TST-999").unwrap();
        assert_eq!(panicked.status, Status::NotApplicable);
        assert!(panicked.message.contains("boom"));

        let errored = findings.iter().find(|f| f.check_id == "TST-998").unwrap();
        assert_eq!(errored.status, Status::NotApplicable);
        assert!(errored.message.contains("invalid selector"));

        let passed = findings.iter().filter(|f| f.status == Status::Pass).count();
        assert_eq!(passed, 9);
    }

    #[test]
    fn test_registration_order_does_not_change_findings() {
        let config = ChecksConfig::default();
        let forward = CheckRegistry::with_defaults(&config);

        let mut reversed = CheckRegistry::new();
        reversed
            .register(Box::new(social::TwitterCardCheck::new(config.required_twitter.clone())))
            .register(Box::new(social::OpenGraphCheck::new(config.required_opengraph.clone())))
            .register(Box::new(accessibility::ImageAltCheck))
            .register(Box::new(seo::RobotsCheck))
            .register(Box::new(seo::CanonicalCheck))
            .register(Box::new(seo::H1Check))
            .register(Box::new(seo::TitleCheck::new(
                config.title_min_length,
                config.title_max_length,
            )))
            .register(Box::new(structure::LangCheck))
            .register(Box::new(structure::DoctypeCheck));

        let html = "<html><body><h1>a</h1><h1>b</h1><img src=x.png></body></html>";
        assert_eq!(forward.run_all(html), reversed.run_all(html));
    }

    #[test]
    fn test_duplicate_ids_ignored() {
        let mut registry = CheckRegistry::new();
        registry
            .register(Box::new(structure::DoctypeCheck))
            .register(Box::new(structure::DoctypeCheck));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_plain_text_degrades_dom_checks() {
        let registry = CheckRegistry::with_defaults(&ChecksConfig::default());
        let findings = registry.run_all("just some text, no tags");

        for f in &findings {
            if f.check_id == "STR-001" {
                assert_eq!(f.status, Status::Fail);
            } else {
                assert_eq!(f.status, Status::NotApplicable, "{}", f.check_id);
            }
        }
    }

    #[test]
    fn test_findings_sorted_by_category() {
        let registry = CheckRegistry::with_defaults(&ChecksConfig::default());
        let findings = registry.run_all(GOOD_PAGE);
        let categories: Vec<Category> = findings.iter().map(|f| f.category).collect();
        let mut sorted = categories.clone();
        sorted.sort();
        assert_eq!(categories, sorted);
        assert_eq!(findings[0].check_id, "STR-001");
    }

    #[test]
    fn test_normalize_text() {
        let text = normalize_text(["  Hello\n", "  world  "].into_iter());
        assert_eq!(text, "Hello world");
    }
}
