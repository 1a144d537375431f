// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Document structure checks: doctype and page language

use super::{require_markup, Category, Check, CheckInfo, Finding, ParsedPage};
use crate::error::CheckError;
use scraper::Node;

/// Checks for an HTML5 `<!DOCTYPE html>` declaration
pub struct DoctypeCheck;

impl DoctypeCheck {
    const INFO: CheckInfo = CheckInfo {
        id: "STR-001",
        name: "Doctype",
        category: Category::Structure,
    };
}

impl Check for DoctypeCheck {
    fn info(&self) -> CheckInfo {
        Self::INFO
    }

    fn description(&self) -> &str {
        "Document starts with an HTML5 doctype"
    }

    fn run(&self, page: &ParsedPage) -> Result<Finding, CheckError> {
        let doctype = page
            .document()
            .tree
            .root()
            .children()
            .find_map(|node| match node.value() {
                Node::Doctype(d) => Some((
                    d.name().to_string(),
                    d.public_id().to_string(),
                    d.system_id().to_string(),
                )),
                _ => None,
            });

        let Some((name, public_id, system_id)) = doctype else {
            return Ok(Finding::fail(Self::INFO, "Doctype missing")
                .with_details(["missing"])
                .with_suggestion("Start the document with <!DOCTYPE html>"));
        };

        let declared = render_doctype(&name, &public_id, &system_id);

        if !name.eq_ignore_ascii_case("html") {
            return Ok(Finding::fail(
                Self::INFO,
                &format!("Not an HTML doctype: {}", declared),
            )
            .with_details([declared])
            .with_suggestion("Use <!DOCTYPE html>"));
        }

        if public_id.is_empty() {
            Ok(Finding::pass(Self::INFO, &format!("HTML5 doctype present: {}", declared))
                .with_details([declared]))
        } else {
            Ok(Finding::pass(
                Self::INFO,
                &format!("Legacy HTML doctype present: {}", declared),
            )
            .with_details([declared])
            .with_suggestion("The short form <!DOCTYPE html> is all HTML5 requires"))
        }
    }
}

fn render_doctype(name: &str, public_id: &str, system_id: &str) -> String {
    match (public_id.is_empty(), system_id.is_empty()) {
        (true, true) => format!("<!DOCTYPE {}>", name),
        (false, true) => format!("<!DOCTYPE {} PUBLIC \"{}\">", name, public_id),
        (true, false) => format!("<!DOCTYPE {} SYSTEM \"{}\">", name, system_id),
        (false, false) => format!(
            "<!DOCTYPE {} PUBLIC \"{}\" \"{}\">",
            name, public_id, system_id
        ),
    }
}

/// Checks the root element carries a non-empty `lang` attribute
pub struct LangCheck;

impl LangCheck {
    const INFO: CheckInfo = CheckInfo {
        id: "STR-002",
        name: "HTML lang attribute",
        category: Category::Structure,
    };
}

impl Check for LangCheck {
    fn info(&self) -> CheckInfo {
        Self::INFO
    }

    fn description(&self) -> &str {
        "Root <html> element declares the page language"
    }

    fn run(&self, page: &ParsedPage) -> Result<Finding, CheckError> {
        if let Some(finding) = require_markup(Self::INFO, page) {
            return Ok(finding);
        }

        let root = page.select_first("html")?;
        let lang = root.and_then(|el| el.value().attr("lang")).map(str::trim);

        Ok(match lang {
            Some(lang) if !lang.is_empty() => {
                Finding::pass(Self::INFO, &format!("lang=\"{}\"", lang))
            }
            Some(_) => Finding::fail(Self::INFO, "lang attribute is empty")
                .with_suggestion("Set lang to a BCP 47 tag, e.g. lang=\"en\""),
            None => Finding::fail(Self::INFO, "lang attribute missing")
                .with_suggestion("Add lang=\"en\" (or the page language) to <html>"),
        })
    }
}
