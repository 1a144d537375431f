// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Optional conformance validation through the Nu HTML Checker (vnu.jar)
//!
//! Validation never fails a scan. When the runtime or the jar is missing,
//! or the checker misbehaves, the outcome is [`ValidatorResult::Unavailable`]
//! with the reason, and the structural checks carry the report alone.

pub mod artifact;
pub mod runtime;

pub use artifact::{ArtifactCache, ArtifactDownloader, HttpDownloader};

use crate::config::ValidatorConfig;
use crate::error::AcquisitionError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Why validation did not run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "kebab-case")]
pub enum UnavailableReason {
    ArtifactMissing,
    RuntimeMissing,
    AcquisitionFailed(String),
    ExecutionFailed(String),
    Disabled,
}

impl UnavailableReason {
    /// Cause that the display string leaves out
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::ExecutionFailed(cause) => Some(cause),
            _ => None,
        }
    }
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArtifactMissing => write!(f, "artifact missing"),
            Self::RuntimeMissing => write!(f, "runtime missing"),
            Self::AcquisitionFailed(cause) => write!(f, "acquisition failed: {}", cause),
            Self::ExecutionFailed(_) => write!(f, "validator execution failed"),
            Self::Disabled => write!(f, "validator disabled"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageSeverity {
    Error,
    Warning,
    Info,
}

impl MessageSeverity {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warning => "WARNING",
            Self::Info => "INFO",
        }
    }
}

/// One conformance message from the checker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorMessage {
    pub severity: MessageSeverity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extract: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ValidatorResult {
    Unavailable { reason: UnavailableReason },
    Validated { messages: Vec<ValidatorMessage> },
}

impl ValidatorResult {
    pub fn unavailable(reason: UnavailableReason) -> Self {
        Self::Unavailable { reason }
    }

    pub fn validated(messages: Vec<ValidatorMessage>) -> Self {
        Self::Validated { messages }
    }

    pub fn is_validated(&self) -> bool {
        matches!(self, Self::Validated { .. })
    }

    pub fn messages(&self) -> &[ValidatorMessage] {
        match self {
            Self::Validated { messages } => messages,
            Self::Unavailable { .. } => &[],
        }
    }

    pub fn error_count(&self) -> usize {
        self.messages()
            .iter()
            .filter(|m| m.severity == MessageSeverity::Error)
            .count()
    }
}

/// Validates a document. Implementations never fail; problems are reported
/// as [`ValidatorResult::Unavailable`].
#[async_trait]
pub trait HtmlValidator: Send + Sync {
    async fn validate(&self, html: &str) -> ValidatorResult;
}

/// Always reports the validator as disabled
pub struct DisabledValidator;

#[async_trait]
impl HtmlValidator for DisabledValidator {
    async fn validate(&self, _html: &str) -> ValidatorResult {
        ValidatorResult::unavailable(UnavailableReason::Disabled)
    }
}

/// Runs vnu.jar under a Java runtime
pub struct ExternalValidator {
    config: ValidatorConfig,
    artifacts: Arc<ArtifactCache>,
}

impl ExternalValidator {
    pub fn new(config: ValidatorConfig, artifacts: Arc<ArtifactCache>) -> Self {
        Self { config, artifacts }
    }

    /// Build the process-wide artifact cache for `config`, downloading over HTTP
    pub fn artifact_cache(config: &ValidatorConfig) -> Arc<ArtifactCache> {
        let downloader = HttpDownloader::new(&config.download_url, config.download_timeout());
        Arc::new(ArtifactCache::new(config.jar_path(), Box::new(downloader)))
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    pub fn artifacts(&self) -> &Arc<ArtifactCache> {
        &self.artifacts
    }

    /// Both the runtime and the jar are present. Never downloads.
    pub async fn is_available(&self) -> bool {
        self.artifacts.is_present() && runtime::find_java(&self.config).await.is_some()
    }

    /// Make the validator usable, downloading the jar if needed.
    /// The runtime is checked first; nothing is downloaded without one.
    pub async fn ensure_available(&self) -> Result<(), AcquisitionError> {
        if runtime::find_java(&self.config).await.is_none() {
            return Err(AcquisitionError::RuntimeMissing);
        }
        self.artifacts.acquire().await
    }

    async fn prepare(&self) -> Result<String, UnavailableReason> {
        if !self.config.enabled {
            return Err(UnavailableReason::Disabled);
        }

        let java = runtime::find_java(&self.config)
            .await
            .ok_or(UnavailableReason::RuntimeMissing)?;

        if !self.artifacts.is_present() {
            if !self.config.auto_download {
                return Err(UnavailableReason::ArtifactMissing);
            }
            self.artifacts
                .acquire()
                .await
                .map_err(|e| UnavailableReason::AcquisitionFailed(e.to_string()))?;
        }

        Ok(java)
    }

    async fn execute(&self, java: &str, html: &str) -> Result<Vec<ValidatorMessage>, String> {
        let document = tempfile::Builder::new()
            .prefix("html5bot-")
            .suffix(".html")
            .tempfile()
            .map_err(|e| format!("temp file: {}", e))?;
        tokio::fs::write(document.path(), html)
            .await
            .map_err(|e| format!("temp file: {}", e))?;

        let output = Command::new(java)
            .arg("-jar")
            .arg(self.artifacts.path())
            .arg("--format")
            .arg("json")
            .arg(document.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let timeout = self.config.run_timeout();
        let output = match tokio::time::timeout(timeout, output).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(format!("failed to start {}: {}", java, e)),
            Err(_) => return Err(format!("timed out after {}s", timeout.as_secs())),
        };

        interpret_output(output.status.code(), &output.stdout, &output.stderr)
    }
}

#[async_trait]
impl HtmlValidator for ExternalValidator {
    async fn validate(&self, html: &str) -> ValidatorResult {
        let java = match self.prepare().await {
            Ok(java) => java,
            Err(reason) => {
                info!("Validator unavailable: {}", reason);
                return ValidatorResult::unavailable(reason);
            }
        };

        match self.execute(&java, html).await {
            Ok(messages) => {
                debug!("Validator reported {} messages", messages.len());
                ValidatorResult::validated(messages)
            }
            Err(cause) => {
                warn!("Validator execution failed: {}", cause);
                ValidatorResult::unavailable(UnavailableReason::ExecutionFailed(cause))
            }
        }
    }
}

/// vnu exits non-zero when the document has errors, so the exit code alone
/// does not mean failure. Output that cannot be parsed does, unless the
/// checker exited cleanly.
fn interpret_output(
    code: Option<i32>,
    stdout: &[u8],
    stderr: &[u8],
) -> Result<Vec<ValidatorMessage>, String> {
    let stderr = String::from_utf8_lossy(stderr);
    let stdout = String::from_utf8_lossy(stdout);

    // The JVM may print notices such as `Picked up JAVA_TOOL_OPTIONS` ahead
    // of the report, on either stream.
    let mut first_error = None;
    for stream in [&*stderr, &*stdout] {
        let Some(json) = locate_report(stream) else {
            continue;
        };
        match parse_vnu_json(json) {
            Ok(messages) => return Ok(messages),
            Err(e) if first_error.is_none() => first_error = Some(e),
            Err(_) => {}
        }
    }

    let raw = if stderr.trim().is_empty() {
        stdout.trim()
    } else {
        stderr.trim()
    };
    match (code, first_error) {
        (Some(0), _) => Ok(Vec::new()),
        (Some(code), Some(e)) => Err(format!(
            "exit code {}, unreadable output ({}): {}",
            code,
            e,
            excerpt(raw)
        )),
        (Some(code), None) => Err(format!("exit code {}, no report: {}", code, excerpt(raw))),
        (None, _) => Err("terminated by signal".to_string()),
    }
}

/// Slice of `stream` holding the JSON report, skipping any leading notices
fn locate_report(stream: &str) -> Option<&str> {
    if let Some(start) = stream.rfind(r#"{"messages""#) {
        return Some(stream[start..].trim());
    }
    let mut offset = 0;
    for line in stream.split_inclusive('\n') {
        if line.trim_start().starts_with('{') {
            return Some(stream[offset..].trim());
        }
        offset += line.len();
    }
    None
}

fn excerpt(raw: &str) -> String {
    raw.chars().take(200).collect()
}

#[derive(Deserialize)]
struct VnuOutput {
    #[serde(default)]
    messages: Vec<VnuMessage>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VnuMessage {
    #[serde(rename = "type")]
    kind: String,
    sub_type: Option<String>,
    #[serde(default)]
    message: String,
    first_line: Option<u32>,
    last_line: Option<u32>,
    first_column: Option<u32>,
    last_column: Option<u32>,
    extract: Option<String>,
}

impl From<VnuMessage> for ValidatorMessage {
    fn from(m: VnuMessage) -> Self {
        let severity = match (m.kind.as_str(), m.sub_type.as_deref()) {
            ("error", _) | ("non-document-error", _) => MessageSeverity::Error,
            ("info", Some("warning")) => MessageSeverity::Warning,
            _ => MessageSeverity::Info,
        };
        Self {
            severity,
            message: m.message,
            line: m.last_line.or(m.first_line),
            column: m.last_column.or(m.first_column),
            extract: m.extract,
        }
    }
}

/// Parse the checker's `--format json` output
pub fn parse_vnu_json(raw: &str) -> Result<Vec<ValidatorMessage>, serde_json::Error> {
    let output: VnuOutput = serde_json::from_str(raw)?;
    Ok(output.messages.into_iter().map(ValidatorMessage::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VNU_SAMPLE: &str = r#"{"messages":[
        {"type":"error","lastLine":12,"lastColumn":7,"firstColumn":1,
         "message":"Stray end tag “div”.","extract":"</p></div>\n"},
        {"type":"info","subType":"warning","lastLine":3,"firstLine":2,"lastColumn":40,
         "message":"Consider adding a “lang” attribute."},
        {"type":"info","message":"Trailing slash on void elements has no effect."},
        {"type":"non-document-error","subType":"io","message":"HTTP resource not retrievable."}
    ]}"#;

    #[test]
    fn test_parse_vnu_severities_and_positions() {
        let messages = parse_vnu_json(VNU_SAMPLE).unwrap();
        assert_eq!(messages.len(), 4);

        assert_eq!(messages[0].severity, MessageSeverity::Error);
        assert_eq!(messages[0].line, Some(12));
        assert_eq!(messages[0].column, Some(7));
        assert!(messages[0].extract.is_some());

        assert_eq!(messages[1].severity, MessageSeverity::Warning);
        assert_eq!(messages[1].line, Some(3));

        assert_eq!(messages[2].severity, MessageSeverity::Info);
        assert_eq!(messages[2].line, None);

        assert_eq!(messages[3].severity, MessageSeverity::Error);
    }

    #[test]
    fn test_nonzero_exit_with_json_is_validated() {
        let messages = interpret_output(Some(1), b"", VNU_SAMPLE.as_bytes()).unwrap();
        assert_eq!(messages.len(), 4);
    }

    #[test]
    fn test_jvm_notice_before_report_is_skipped() {
        let stderr = format!("Picked up JAVA_TOOL_OPTIONS: -Xmx512m\n{}\n", VNU_SAMPLE);

        let messages = interpret_output(Some(1), b"", stderr.as_bytes()).unwrap();
        assert_eq!(messages.len(), 4);

        let messages = interpret_output(Some(0), b"", stderr.as_bytes()).unwrap();
        assert_eq!(messages.len(), 4);
    }

    #[test]
    fn test_report_on_stdout_when_stderr_has_only_notices() {
        let messages = interpret_output(
            Some(1),
            VNU_SAMPLE.as_bytes(),
            b"Picked up _JAVA_OPTIONS: -Djava.awt.headless=true\n",
        )
        .unwrap();
        assert_eq!(messages.len(), 4);
    }

    #[test]
    fn test_pretty_printed_report_is_located() {
        let stderr = "NOTE: using default locale\n{\n  \"messages\": []\n}\n";
        assert_eq!(interpret_output(Some(0), b"", stderr.as_bytes()).unwrap(), Vec::new());
    }

    #[test]
    fn test_clean_exit_without_output_is_valid() {
        assert_eq!(interpret_output(Some(0), b"", b"").unwrap(), Vec::new());
        assert_eq!(
            interpret_output(Some(0), br#"{"messages":[]}"#, b"").unwrap(),
            Vec::new()
        );
    }

    #[test]
    fn test_abnormal_exit_is_execution_failure() {
        let err = interpret_output(Some(1), b"", b"Error: Unable to access jarfile").unwrap_err();
        assert!(err.contains("exit code 1"));
        assert!(interpret_output(None, b"", b"").is_err());
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(UnavailableReason::RuntimeMissing.to_string(), "runtime missing");
        assert_eq!(
            UnavailableReason::ExecutionFailed("exit code 3".into()).to_string(),
            "validator execution failed"
        );
        assert_eq!(
            UnavailableReason::ExecutionFailed("exit code 3".into()).detail(),
            Some("exit code 3")
        );
        assert_eq!(UnavailableReason::ArtifactMissing.detail(), None);
        assert_eq!(
            UnavailableReason::AcquisitionFailed("HTTP 404".into()).to_string(),
            "acquisition failed: HTTP 404"
        );
    }

    #[test]
    fn test_error_count() {
        let result = ValidatorResult::validated(parse_vnu_json(VNU_SAMPLE).unwrap());
        assert!(result.is_validated());
        assert_eq!(result.error_count(), 2);

        let unavailable = ValidatorResult::unavailable(UnavailableReason::Disabled);
        assert!(unavailable.messages().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_in_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = ValidatorConfig {
            enabled: false,
            dir: dir.path().to_path_buf(),
            ..ValidatorConfig::default()
        };
        let validator = ExternalValidator::new(config.clone(), ExternalValidator::artifact_cache(&config));
        assert_eq!(
            validator.validate("<p>x</p>").await,
            ValidatorResult::unavailable(UnavailableReason::Disabled)
        );
    }
}
