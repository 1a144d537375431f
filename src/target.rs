// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Audit target normalisation

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// A normalised, syntactically valid page URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AuditTarget {
    text: String,
    url: Url,
}

impl AuditTarget {
    /// Normalise user input: trim, default the scheme to `http://`, and
    /// require an http(s) URL with a host.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err("URL is empty".to_string());
        }

        let text = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("http://{}", trimmed)
        };

        let url = Url::parse(&text).map_err(|e| format!("invalid URL `{}`: {}", trimmed, e))?;

        match url.scheme() {
            "http" | "https" => {}
            other => return Err(format!("unsupported scheme `{}` in `{}`", other, trimmed)),
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(format!("invalid URL `{}`: missing host", trimmed));
        }

        Ok(Self { text, url })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl fmt::Display for AuditTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl TryFrom<String> for AuditTarget {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AuditTarget> for String {
    fn from(target: AuditTarget) -> Self {
        target.text
    }
}
