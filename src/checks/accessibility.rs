// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Image alternative text (WCAG 1.1.1 Non-text Content)
//!
//! Every `<img>` needs a non-empty `alt`. Offenders are listed by `src`.

use super::{require_markup, Category, Check, CheckInfo, Finding, ParsedPage};
use crate::error::CheckError;

pub struct ImageAltCheck;

impl ImageAltCheck {
    const INFO: CheckInfo = CheckInfo {
        id: "ACC-001",
        name: "Image alt text",
        category: Category::Accessibility,
    };
}

impl Check for ImageAltCheck {
    fn info(&self) -> CheckInfo {
        Self::INFO
    }

    fn description(&self) -> &str {
        "Every <img> has non-empty alt text"
    }

    fn run(&self, page: &ParsedPage) -> Result<Finding, CheckError> {
        if let Some(finding) = require_markup(Self::INFO, page) {
            return Ok(finding);
        }

        let images = page.select_all("img")?;
        if images.is_empty() {
            return Ok(Finding::pass(Self::INFO, "No images found"));
        }

        let offenders: Vec<String> = images
            .iter()
            .filter(|img| {
                img.value()
                    .attr("alt")
                    .map_or(true, |alt| alt.trim().is_empty())
            })
            .map(|img| match img.value().attr("src").map(str::trim) {
                Some(src) if !src.is_empty() => src.to_string(),
                _ => "(no src)".to_string(),
            })
            .collect();

        let message = format!(
            "{}/{} images missing alt text",
            offenders.len(),
            images.len()
        );

        if offenders.is_empty() {
            Ok(Finding::pass(Self::INFO, &message))
        } else {
            Ok(Finding::fail(Self::INFO, &message)
                .with_details(offenders)
                .with_suggestion("Describe informative images in alt; decorative images need role=\"presentation\" and an alt"))
        }
    }
}
