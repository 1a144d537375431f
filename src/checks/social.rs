// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Social sharing metadata: OpenGraph and Twitter Cards

use super::{require_markup, Category, Check, CheckInfo, Finding, ParsedPage};
use crate::error::CheckError;
use std::collections::BTreeSet;

/// Collect the lowercase `prefix*` keys declared in `name` or `property`
/// attributes of `<meta>` tags.
fn declared_meta_keys(
    page: &ParsedPage,
    attrs: &[&str],
    prefix: &str,
) -> Result<BTreeSet<String>, CheckError> {
    Ok(page
        .select_all("meta")?
        .into_iter()
        .flat_map(|meta| {
            attrs
                .iter()
                .filter_map(|attr| meta.value().attr(attr))
                .map(|v| v.trim().to_ascii_lowercase())
                .collect::<Vec<_>>()
        })
        .filter(|key| key.starts_with(prefix))
        .collect())
}

fn required_tags_finding(
    info: CheckInfo,
    label: &str,
    required: &[String],
    found: &BTreeSet<String>,
) -> Finding {
    let missing: Vec<String> = required
        .iter()
        .filter(|tag| !found.contains(&tag.to_ascii_lowercase()))
        .cloned()
        .collect();

    let found_list = found.iter().cloned().collect::<Vec<_>>().join(", ");

    if missing.is_empty() {
        Finding::pass(
            info,
            &format!("Found {} {} tags: {}", found.len(), label, found_list),
        )
    } else {
        Finding::fail(
            info,
            &format!(
                "Missing {} of {} required {} tags: {}",
                missing.len(),
                required.len(),
                label,
                missing.join(", ")
            ),
        )
        .with_details(missing)
    }
}

/// Checks the core OpenGraph properties
pub struct OpenGraphCheck {
    required: Vec<String>,
}

impl OpenGraphCheck {
    const INFO: CheckInfo = CheckInfo {
        id: "SOC-001",
        name: "OpenGraph tags",
        category: Category::Social,
    };

    pub fn new(required: Vec<String>) -> Self {
        Self { required }
    }
}

impl Check for OpenGraphCheck {
    fn info(&self) -> CheckInfo {
        Self::INFO
    }

    fn description(&self) -> &str {
        "Page declares og:title, og:description and og:image"
    }

    fn run(&self, page: &ParsedPage) -> Result<Finding, CheckError> {
        if let Some(finding) = require_markup(Self::INFO, page) {
            return Ok(finding);
        }

        let found = declared_meta_keys(page, &["property"], "og:")?;
        let finding = required_tags_finding(Self::INFO, "OpenGraph", &self.required, &found);
        Ok(if finding.details.is_empty() {
            finding
        } else {
            finding.with_suggestion("Add <meta property=\"og:...\" content=\"...\"> tags in <head>")
        })
    }
}

/// Checks for a Twitter Card declaration
pub struct TwitterCardCheck {
    required: Vec<String>,
}

impl TwitterCardCheck {
    const INFO: CheckInfo = CheckInfo {
        id: "SOC-002",
        name: "Twitter Card",
        category: Category::Social,
    };

    pub fn new(required: Vec<String>) -> Self {
        Self { required }
    }
}

impl Check for TwitterCardCheck {
    fn info(&self) -> CheckInfo {
        Self::INFO
    }

    fn description(&self) -> &str {
        "Page declares twitter:card"
    }

    fn run(&self, page: &ParsedPage) -> Result<Finding, CheckError> {
        if let Some(finding) = require_markup(Self::INFO, page) {
            return Ok(finding);
        }

        // Publishers use both attributes for twitter:* in the wild
        let found = declared_meta_keys(page, &["name", "property"], "twitter:")?;
        let finding = required_tags_finding(Self::INFO, "Twitter Card", &self.required, &found);
        Ok(if finding.details.is_empty() {
            finding
        } else {
            finding.with_suggestion("Add <meta name=\"twitter:card\" content=\"summary\">")
        })
    }
}
