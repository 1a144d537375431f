// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Java runtime discovery for the Nu HTML Checker

use crate::config::ValidatorConfig;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Bound on `java -version` probing
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Locate a usable Java launcher: the runtime embedded next to the jar
/// first, then the configured command.
pub async fn find_java(config: &ValidatorConfig) -> Option<String> {
    let embedded = config.embedded_java_path();
    if is_executable(&embedded) {
        debug!("Using embedded runtime {}", embedded.display());
        return Some(embedded.display().to_string());
    }

    if probe(&config.java_command).await {
        debug!("Using runtime `{}`", config.java_command);
        Some(config.java_command.clone())
    } else {
        debug!("No Java runtime found (tried `{}`)", config.java_command);
        None
    }
}

async fn probe(command: &str) -> bool {
    let child = Command::new(command)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn();

    let Ok(mut child) = child else {
        return false;
    };

    // Any exit status counts: the launcher exists and runs.
    matches!(
        tokio::time::timeout(PROBE_TIMEOUT, child.wait()).await,
        Ok(Ok(_))
    )
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
