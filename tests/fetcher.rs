// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell

//! Integration tests for the page fetchers against a wiremock server. The
//! Chrome backend runs against a shell script standing in for the browser.

use html5bot::config::FetcherConfig;
use html5bot::fetcher::{ChromeFetcher, HttpFetcher, PageFetcher};
use html5bot::{AuditTarget, FetchError};
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PAGE: &str = "<!DOCTYPE html><html lang=\"en\"><head><title>Fixture page</title></head><body><h1>Hi</h1></body></html>";

fn fetcher() -> HttpFetcher {
    HttpFetcher::new(&FetcherConfig::default()).unwrap()
}

fn target(server: &MockServer, route: &str) -> AuditTarget {
    AuditTarget::parse(&format!("{}{}", server.uri(), route)).unwrap()
}

#[tokio::test]
async fn test_fetches_page_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .and(header(
            "user-agent",
            format!("html5bot/{}", env!("CARGO_PKG_VERSION")).as_str(),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let page = fetcher()
        .fetch(&target(&server, "/page"), Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(page.html(), PAGE);
    assert_eq!(page.final_url(), format!("{}/page", server.uri()));
    assert!(page.screenshot().is_none());
}

#[tokio::test]
async fn test_records_final_url_after_redirect() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("location", format!("{}/new", server.uri())),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
        .mount(&server)
        .await;

    let page = fetcher()
        .fetch(&target(&server, "/old"), Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(page.final_url(), format!("{}/new", server.uri()));
}

#[tokio::test]
async fn test_server_error_is_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = fetcher()
        .fetch(&target(&server, "/broken"), Duration::from_secs(5))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Network(ref msg) if msg.contains("500")));
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(PAGE)
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let err = fetcher()
        .fetch(&target(&server, "/slow"), Duration::from_secs(1))
        .await
        .unwrap_err();

    assert_eq!(err, FetchError::Timeout(1));
}

#[tokio::test]
async fn test_unreachable_host_is_network_error() {
    // Port 9 (discard) on localhost is reliably closed in CI
    let target = AuditTarget::parse("http://127.0.0.1:9/").unwrap();

    let err = fetcher()
        .fetch(&target, Duration::from_secs(5))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Network(_)));
}

// ============================================================================
// Chrome backend
// ============================================================================

fn chrome_config(binary: &str) -> FetcherConfig {
    FetcherConfig {
        chrome_binary: binary.to_string(),
        ..FetcherConfig::default()
    }
}

#[tokio::test]
async fn test_missing_browser_is_browser_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
        .mount(&server)
        .await;

    let fetcher = ChromeFetcher::new(&chrome_config("/nonexistent/html5bot-test-chrome")).unwrap();
    let err = fetcher
        .fetch(&target(&server, "/page"), Duration::from_secs(5))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::BrowserUnavailable(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_chrome_unreachable_page_is_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = ChromeFetcher::new(&chrome_config("/nonexistent/html5bot-test-chrome")).unwrap();
    let err = fetcher
        .fetch(&target(&server, "/gone"), Duration::from_secs(5))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Network(ref msg) if msg.contains("404")));
}

#[cfg(unix)]
mod scripted_browser {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    /// Shell script that logs its URL argument, prints a fixed DOM and
    /// writes a screenshot wherever `--screenshot=` points
    fn install_browser(dir: &TempDir) -> (String, std::path::PathBuf) {
        let log = dir.path().join("loads.log");
        let script = format!(
            r#"#!/bin/sh
for arg in "$@"; do
  case "$arg" in
    --screenshot=*) printf 'PNGDATA' > "${{arg#--screenshot=}}" ;;
    http*) echo "$arg" >> '{}' ;;
  esac
done
case "$*" in
  *--dump-dom*) echo '{}' ;;
esac
"#,
            log.display(),
            PAGE
        );
        let binary = dir.path().join("fake-chrome");
        std::fs::write(&binary, script).unwrap();
        std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).unwrap();
        (binary.display().to_string(), log)
    }

    #[tokio::test]
    async fn test_chrome_records_redirected_url_for_dom_and_screenshot() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("location", format!("{}/new", server.uri())),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/new"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let (binary, log) = install_browser(&dir);
        let fetcher = ChromeFetcher::new(&chrome_config(&binary)).unwrap();

        let page = fetcher
            .fetch(&target(&server, "/old"), Duration::from_secs(10))
            .await
            .unwrap();

        let new_url = format!("{}/new", server.uri());
        assert_eq!(page.final_url(), new_url);
        assert_eq!(page.html().trim(), PAGE);
        assert_eq!(page.screenshot().unwrap().as_bytes(), b"PNGDATA");

        let loads = std::fs::read_to_string(log).unwrap();
        assert_eq!(loads.lines().collect::<Vec<_>>(), vec![new_url.as_str(), new_url.as_str()]);
    }
}
