// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Benchmarks for html5bot checks and report rendering

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use html5bot::checks::CheckRegistry;
use html5bot::config::ChecksConfig;
use html5bot::report::{render, PageSummary, Report};
use html5bot::validator::{UnavailableReason, ValidatorResult};
use html5bot::AuditTarget;

fn sample_page() -> String {
    let mut html = String::from(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Quotes to Scrape</title>
  <link rel="canonical" href="https://quotes.toscrape.com/">
  <meta name="robots" content="index, follow, max-snippet:120, max-image-preview:large">
  <meta property="og:title" content="Quotes to Scrape">
  <meta property="og:description" content="A collection of quotes">
  <meta name="twitter:card" content="summary">
</head>
<body>
  <h1>Quotes to Scrape</h1>
"#,
    );
    for i in 0..200 {
        html.push_str(&format!(
            "  <div class=\"quote\"><span>Quote number {i}</span><img src=\"/img/{i}.png\"{}></div>\n",
            if i % 3 == 0 { "" } else { " alt=\"Author portrait\"" }
        ));
    }
    html.push_str("</body>\n</html>\n");
    html
}

fn bench_run_all(c: &mut Criterion) {
    let registry = CheckRegistry::with_defaults(&ChecksConfig::default());
    let html = sample_page();

    c.bench_function("registry_run_all", |b| {
        b.iter(|| registry.run_all(black_box(&html)))
    });
}

fn bench_render(c: &mut Criterion) {
    let registry = CheckRegistry::with_defaults(&ChecksConfig::default());
    let html = sample_page();
    let report = Report::new(
        AuditTarget::parse("quotes.toscrape.com").unwrap(),
        Utc::now(),
        PageSummary {
            final_url: "https://quotes.toscrape.com/".to_string(),
            fetch_duration_ms: 300,
            html_bytes: html.len(),
        },
        registry.run_all(&html),
        ValidatorResult::unavailable(UnavailableReason::RuntimeMissing),
    );

    c.bench_function("report_render", |b| b.iter(|| render(black_box(&report))));
}

criterion_group!(benches, bench_run_all, bench_render);
criterion_main!(benches);
