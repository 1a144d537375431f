// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! SEO essentials: title, H1, canonical link, robots directives

use super::{normalize_text, require_markup, Category, Check, CheckInfo, Finding, ParsedPage};
use crate::error::CheckError;
use scraper::ElementRef;

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Characters of heading text shown in a passing H1 finding
const H1_PREVIEW_CHARS: usize = 50;

/// Checks `<title>` is present and within the recommended length
pub struct TitleCheck {
    min_length: usize,
    max_length: usize,
}

impl TitleCheck {
    const INFO: CheckInfo = CheckInfo {
        id: "SEO-001",
        name: "Title tag",
        category: Category::Seo,
    };

    pub fn new(min_length: usize, max_length: usize) -> Self {
        Self {
            min_length,
            max_length,
        }
    }
}

impl Check for TitleCheck {
    fn info(&self) -> CheckInfo {
        Self::INFO
    }

    fn description(&self) -> &str {
        "Page has a non-empty <title> of recommended length"
    }

    fn run(&self, page: &ParsedPage) -> Result<Finding, CheckError> {
        if let Some(finding) = require_markup(Self::INFO, page) {
            return Ok(finding);
        }

        let Some(title) = page
            .select_all("title")?
            .into_iter()
            .find(is_document_title)
        else {
            return Ok(Finding::warning(Self::INFO, "Title tag missing")
                .with_suggestion("Add a descriptive <title> inside <head>"));
        };

        let text = normalize_text(title.text());
        if text.is_empty() {
            return Ok(Finding::warning(Self::INFO, "Title tag is empty")
                .with_suggestion("Give the page a descriptive title"));
        }

        let length = text.chars().count();
        let message = format!("'{}' ({} chars)", text, length);

        if length < self.min_length || length > self.max_length {
            Ok(Finding::warning(
                Self::INFO,
                &format!(
                    "{} is outside the recommended {}-{} characters",
                    message, self.min_length, self.max_length
                ),
            )
            .with_suggestion("Search results truncate long titles; very short ones say little"))
        } else {
            Ok(Finding::pass(Self::INFO, &message))
        }
    }
}

/// SVG and MathML carry their own `<title>` elements, which label the
/// graphic rather than the page.
fn is_document_title(title: &ElementRef<'_>) -> bool {
    &*title.value().name.ns == HTML_NAMESPACE
        && !title
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|a| matches!(a.value().name(), "svg" | "math"))
}

/// Checks the page has exactly one `<h1>`
pub struct H1Check;

impl H1Check {
    const INFO: CheckInfo = CheckInfo {
        id: "SEO-002",
        name: "H1 tags",
        category: Category::Seo,
    };
}

impl Check for H1Check {
    fn info(&self) -> CheckInfo {
        Self::INFO
    }

    fn description(&self) -> &str {
        "Page has exactly one <h1>"
    }

    fn run(&self, page: &ParsedPage) -> Result<Finding, CheckError> {
        if let Some(finding) = require_markup(Self::INFO, page) {
            return Ok(finding);
        }

        let headings: Vec<String> = page
            .select_all("h1")?
            .into_iter()
            .map(|h| normalize_text(h.text()))
            .collect();

        Ok(match headings.len() {
            0 => Finding::warning(Self::INFO, "No H1 tag found (missing)")
                .with_suggestion("Add a single <h1> describing the page"),
            1 => {
                let preview: String = headings[0].chars().take(H1_PREVIEW_CHARS).collect();
                Finding::pass(Self::INFO, &format!("Found 1 H1: '{}'", preview))
            }
            n => Finding::warning(
                Self::INFO,
                &format!("Found {} H1 tags (multiple, consider 1)", n),
            )
            .with_details(headings),
        })
    }
}

/// Checks for `<link rel="canonical">` with an absolute href
pub struct CanonicalCheck;

impl CanonicalCheck {
    const INFO: CheckInfo = CheckInfo {
        id: "SEO-003",
        name: "Canonical link",
        category: Category::Seo,
    };
}

fn looks_absolute(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("//")
}

impl Check for CanonicalCheck {
    fn info(&self) -> CheckInfo {
        Self::INFO
    }

    fn description(&self) -> &str {
        "Page declares an absolute canonical URL"
    }

    fn run(&self, page: &ParsedPage) -> Result<Finding, CheckError> {
        if let Some(finding) = require_markup(Self::INFO, page) {
            return Ok(finding);
        }

        let hrefs: Vec<String> = page
            .select_all("link[rel]")?
            .into_iter()
            .filter(|link| {
                link.value()
                    .attr("rel")
                    .is_some_and(|rel| {
                        rel.split_ascii_whitespace()
                            .any(|t| t.eq_ignore_ascii_case("canonical"))
                    })
            })
            .map(|link| link.value().attr("href").unwrap_or("").trim().to_string())
            .collect();

        let Some(href) = hrefs.first() else {
            return Ok(Finding::fail(Self::INFO, "Canonical link missing")
                .with_suggestion("Add <link rel=\"canonical\" href=\"https://...\"> in <head>"));
        };

        if href.is_empty() {
            return Ok(Finding::fail(Self::INFO, "Canonical link has an empty href"));
        }

        let mut distinct = hrefs.clone();
        distinct.sort();
        distinct.dedup();
        if distinct.len() > 1 {
            return Ok(Finding::warning(
                Self::INFO,
                &format!("{} conflicting canonical links", distinct.len()),
            )
            .with_details(distinct));
        }

        if looks_absolute(href) {
            Ok(Finding::pass(Self::INFO, href))
        } else {
            Ok(Finding::warning(
                Self::INFO,
                &format!("Canonical href is not absolute: {}", href),
            )
            .with_suggestion("Use a full URL including scheme and host"))
        }
    }
}

/// Directives parsed from a robots meta tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobotsDirectives {
    pub index: bool,
    pub follow: bool,
    pub archive: bool,
    pub snippet: bool,
    pub max_snippet: Option<i64>,
    pub max_image_preview: Option<String>,
    pub unrecognized: Vec<String>,
}

impl Default for RobotsDirectives {
    fn default() -> Self {
        Self {
            index: true,
            follow: true,
            archive: true,
            snippet: true,
            max_snippet: None,
            max_image_preview: None,
            unrecognized: Vec::new(),
        }
    }
}

impl RobotsDirectives {
    /// Parse a comma-separated `content` value. Unknown tokens are kept in
    /// `unrecognized` rather than rejected.
    pub fn parse(content: &str) -> Self {
        let mut directives = Self::default();

        for token in content.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let lower = token.to_ascii_lowercase();
            let (key, value) = match lower.split_once(':') {
                Some((k, v)) => (k.trim(), Some(v.trim())),
                None => (lower.as_str(), None),
            };

            match (key, value) {
                ("index", None) => directives.index = true,
                ("noindex", None) => directives.index = false,
                ("follow", None) => directives.follow = true,
                ("nofollow", None) => directives.follow = false,
                ("noarchive", None) => directives.archive = false,
                ("nosnippet", None) => directives.snippet = false,
                ("max-snippet", Some(v)) if v.parse::<i64>().is_ok() => {
                    directives.max_snippet = v.parse().ok();
                }
                ("max-image-preview", Some(v)) if matches!(v, "none" | "standard" | "large") => {
                    directives.max_image_preview = Some(v.to_string());
                }
                _ => directives.unrecognized.push(token.to_string()),
            }
        }

        directives
    }

    /// Human-readable interpretation, one line per aspect
    pub fn summary(&self) -> Vec<String> {
        let allowed = |b: bool| if b { "Allowed" } else { "Disallowed" };
        let preview = match self.max_image_preview.as_deref() {
            Some("large") => "Large",
            Some("standard") => "Standard",
            Some("none") => "None",
            _ => "Not specified",
        };

        let mut lines = vec![
            format!("Indexing: {}", allowed(self.index)),
            format!("Following Links: {}", allowed(self.follow)),
            format!("Snippets: {}", allowed(self.snippet)),
            format!("Image Previews: {}", preview),
        ];
        if !self.archive {
            lines.push("Archiving: Disallowed".to_string());
        }
        if let Some(n) = self.max_snippet {
            lines.push(format!("Max Snippet: {}", n));
        }
        lines
    }
}

/// Interprets `<meta name="robots">` directives
pub struct RobotsCheck;

impl RobotsCheck {
    const INFO: CheckInfo = CheckInfo {
        id: "SEO-004",
        name: "Robots meta",
        category: Category::Seo,
    };
}

impl Check for RobotsCheck {
    fn info(&self) -> CheckInfo {
        Self::INFO
    }

    fn description(&self) -> &str {
        "Robots meta directives are recognised and allow indexing"
    }

    fn run(&self, page: &ParsedPage) -> Result<Finding, CheckError> {
        if let Some(finding) = require_markup(Self::INFO, page) {
            return Ok(finding);
        }

        let contents: Vec<String> = page
            .select_all("meta[name]")?
            .into_iter()
            .filter(|m| {
                m.value()
                    .attr("name")
                    .is_some_and(|n| n.trim().eq_ignore_ascii_case("robots"))
            })
            .map(|m| m.value().attr("content").unwrap_or("").trim().to_string())
            .collect();

        let tagged = !contents.is_empty();
        let contents: Vec<String> = contents.into_iter().filter(|c| !c.is_empty()).collect();

        if contents.is_empty() {
            let defaults = RobotsDirectives::parse("index,follow");
            let message = if tagged {
                "Robots meta tag has no content; assuming index,follow"
            } else {
                "No robots meta tag; assuming index,follow"
            };
            return Ok(Finding::pass(Self::INFO, message).with_details(defaults.summary()));
        }

        let content = contents.join(", ");
        let directives = RobotsDirectives::parse(&content);
        let mut details = directives.summary();

        if !directives.unrecognized.is_empty() {
            details.extend(
                directives
                    .unrecognized
                    .iter()
                    .map(|t| format!("Unrecognized: {}", t)),
            );
            return Ok(Finding::warning(
                Self::INFO,
                &format!(
                    "Unrecognized robots directives: {}",
                    directives.unrecognized.join(", ")
                ),
            )
            .with_details(details));
        }

        if !directives.index || !directives.follow {
            return Ok(Finding::warning(
                Self::INFO,
                &format!("Robots meta restricts search engines: {}", content),
            )
            .with_details(details)
            .with_suggestion("Remove noindex/nofollow if the page should be discoverable"));
        }

        Ok(Finding::pass(Self::INFO, &content).with_details(details))
    }
}
