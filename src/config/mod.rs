// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Configuration for html5bot

use crate::error::{Html5botError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Latest release of the Nu HTML Checker
pub const VNU_DOWNLOAD_URL: &str =
    "https://github.com/validator/validator/releases/latest/download/vnu.jar";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub checks: ChecksConfig,
    pub validator: ValidatorConfig,
    pub fetcher: FetcherConfig,
}

/// Thresholds and required tags for the DOM checks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChecksConfig {
    /// Shortest recommended `<title>` in characters
    pub title_min_length: usize,
    /// Longest recommended `<title>` in characters
    pub title_max_length: usize,
    pub required_opengraph: Vec<String>,
    pub required_twitter: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub enabled: bool,
    /// Download the checker jar on first use when it is missing
    pub auto_download: bool,
    /// Local cache directory for the jar (and an optional embedded `jre/`)
    pub dir: PathBuf,
    pub jar_name: String,
    pub download_url: String,
    pub download_timeout_secs: u64,
    pub run_timeout_secs: u64,
    /// Java launcher used when no embedded runtime is present
    pub java_command: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetcherBackend {
    /// Plain HTTP GET, no script execution, no screenshot
    Http,
    /// Headless Chrome/Chromium process
    Chrome,
}

impl std::fmt::Display for FetcherBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetcherBackend::Http => write!(f, "http"),
            FetcherBackend::Chrome => write!(f, "chrome"),
        }
    }
}

impl std::str::FromStr for FetcherBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "http" => Ok(FetcherBackend::Http),
            "chrome" | "chromium" => Ok(FetcherBackend::Chrome),
            other => Err(format!("Unknown fetcher backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    pub backend: FetcherBackend,
    pub chrome_binary: String,
    pub timeout_secs: u64,
    pub window_width: u32,
    pub window_height: u32,
    /// Time the browser is given to run page scripts before the DOM is dumped
    pub settle_ms: u64,
    pub user_agent: String,
}

impl Default for ChecksConfig {
    fn default() -> Self {
        Self {
            title_min_length: 10,
            title_max_length: 60,
            required_opengraph: vec![
                "og:title".to_string(),
                "og:description".to_string(),
                "og:image".to_string(),
            ],
            required_twitter: vec!["twitter:card".to_string()],
        }
    }
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_download: true,
            dir: dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("html5bot")
                .join("validator"),
            jar_name: "vnu.jar".to_string(),
            download_url: VNU_DOWNLOAD_URL.to_string(),
            download_timeout_secs: 60,
            run_timeout_secs: 30,
            java_command: "java".to_string(),
        }
    }
}

impl ValidatorConfig {
    pub fn jar_path(&self) -> PathBuf {
        self.dir.join(&self.jar_name)
    }

    /// Location of a runtime shipped next to the jar
    pub fn embedded_java_path(&self) -> PathBuf {
        let exe = if cfg!(windows) { "java.exe" } else { "java" };
        self.dir.join("jre").join("bin").join(exe)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            backend: FetcherBackend::Http,
            chrome_binary: "google-chrome".to_string(),
            timeout_secs: 30,
            window_width: 1400,
            window_height: 1000,
            settle_ms: 2000,
            user_agent: format!("html5bot/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl FetcherConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("html5bot")
        .join("config.yml")
}

pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)?;

    let config: Config = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
        toml::from_str(&content)
            .map_err(|e| Html5botError::Config(format!("TOML parse error: {}", e)))?
    } else {
        serde_yaml::from_str(&content)
            .map_err(|e| Html5botError::Config(format!("YAML parse error: {}", e)))?
    };

    if config.checks.title_min_length > config.checks.title_max_length {
        return Err(Html5botError::Config(format!(
            "title_min_length ({}) exceeds title_max_length ({})",
            config.checks.title_min_length, config.checks.title_max_length
        )));
    }

    Ok(config)
}

pub fn write_default_config(path: &Path) -> Result<()> {
    let config = Config::default();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
        toml::to_string_pretty(&config)
            .map_err(|e| Html5botError::Config(format!("TOML serialize error: {}", e)))?
    } else {
        serde_yaml::to_string(&config)?
    };

    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_config(&dir.path().join("absent.yml")).unwrap();
        assert_eq!(config.checks.title_min_length, 10);
        assert_eq!(config.checks.title_max_length, 60);
        assert_eq!(config.fetcher.backend, FetcherBackend::Http);
        assert!(config.validator.enabled);
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yml");
        std::fs::write(&path, "checks:\n  title_max_length: 70\nfetcher:\n  backend: chrome\n")
            .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.checks.title_max_length, 70);
        assert_eq!(config.checks.title_min_length, 10);
        assert_eq!(config.fetcher.backend, FetcherBackend::Chrome);
        assert_eq!(config.validator.jar_name, "vnu.jar");
    }

    #[test]
    fn test_written_defaults_load_back_in_both_formats() {
        let dir = TempDir::new().unwrap();
        for name in ["config.yml", "config.toml"] {
            let path = dir.path().join("nested").join(name);
            write_default_config(&path).unwrap();
            let config = load_config(&path).unwrap();
            assert_eq!(config.checks.required_opengraph.len(), 3);
            assert_eq!(config.validator.run_timeout_secs, 30);
        }
    }

    #[test]
    fn test_inverted_title_range_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yml");
        std::fs::write(&path, "checks:\n  title_min_length: 80\n  title_max_length: 20\n")
            .unwrap();
        assert!(matches!(load_config(&path), Err(Html5botError::Config(_))));
    }

    #[test]
    fn test_validator_paths() {
        let config = ValidatorConfig {
            dir: PathBuf::from("/opt/v"),
            ..ValidatorConfig::default()
        };
        assert_eq!(config.jar_path(), PathBuf::from("/opt/v/vnu.jar"));
        assert!(config.embedded_java_path().starts_with("/opt/v/jre/bin"));
    }
}
