// SPDX-License-Identifier: PMPL-1.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! html5bot CLI - Web Page Auditor

use anyhow::Context;
use clap::{Parser, Subcommand};
use html5bot::config::{self, Config, FetcherBackend};
use html5bot::report::{self, OutputFormat};
use html5bot::validator::runtime;
use html5bot::{
    abort_pair, AuditError, Auditor, CheckRegistry, ExternalValidator, Html5botError, ScanRequest,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// html5bot: Web Page Auditor
///
/// Checks one page for HTML5 structure, SEO essentials, image alt text and
/// social metadata, with optional strict validation by the Nu HTML Checker.
#[derive(Parser)]
#[command(name = "html5bot")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Audit a page
    Scan {
        /// Page URL (scheme defaults to http://)
        url: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Save the page screenshot (PNG) when the fetcher captures one
        #[arg(long)]
        screenshot: Option<PathBuf>,

        /// Page fetcher backend (http, chrome)
        #[arg(long)]
        fetcher: Option<String>,

        /// Skip the Nu HTML Checker
        #[arg(long)]
        no_validator: bool,

        /// Exit with status 2 when a check fails or the validator reports errors
        #[arg(long)]
        strict: bool,
    },

    /// Manage the Nu HTML Checker
    Validator {
        #[command(subcommand)]
        action: ValidatorAction,
    },

    /// Initialize configuration file
    Init {
        /// Output format (yaml, toml)
        #[arg(long, default_value = "yaml")]
        format: String,
    },

    /// Show current configuration
    Show,
}

#[derive(Subcommand)]
enum ValidatorAction {
    /// Report whether the runtime and checker are installed
    Status,
    /// Download the checker if it is missing
    Install,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(&cli.log_level);

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(config::default_config_path);

    let config = match config::load_config(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Command::Scan {
            url,
            format,
            output,
            screenshot,
            fetcher,
            no_validator,
            strict,
        } => {
            let options = ScanOptions {
                format,
                output,
                screenshot,
                fetcher,
                no_validator,
                strict,
            };
            handle_scan(config, &url, options).await
        }
        Command::Validator { action } => handle_validator(&config, action).await,
        Command::Init { format } => handle_init(&config_path, &format),
        Command::Show => handle_show(&config),
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_target(true)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

struct ScanOptions {
    format: String,
    output: Option<PathBuf>,
    screenshot: Option<PathBuf>,
    fetcher: Option<String>,
    no_validator: bool,
    strict: bool,
}

async fn handle_scan(mut config: Config, url: &str, options: ScanOptions) -> ExitCode {
    let format: OutputFormat = match options.format.parse() {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(ref backend) = options.fetcher {
        config.fetcher.backend = match backend.parse::<FetcherBackend>() {
            Ok(b) => b,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        };
    }
    if options.no_validator {
        config.validator.enabled = false;
    }

    let fetcher = match html5bot::fetcher::from_config(&config.fetcher) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let artifacts = ExternalValidator::artifact_cache(&config.validator);
    let validator = Arc::new(ExternalValidator::new(config.validator.clone(), artifacts));
    let registry = CheckRegistry::with_defaults(&config.checks);
    let auditor =
        Auditor::new(fetcher, validator, registry).with_fetch_timeout(config.fetcher.timeout());

    let (abort, signal) = abort_pair();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, aborting scan");
            abort.abort();
        }
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });

    let result = auditor.scan(ScanRequest::new(url).with_abort(signal)).await;
    interrupt.abort();

    let report = match result {
        Ok(report) => report,
        Err(AuditError::Cancelled) => {
            eprintln!("Scan cancelled");
            return ExitCode::from(130);
        }
        Err(e) => {
            eprintln!("Error: {}", Html5botError::from(e));
            return ExitCode::FAILURE;
        }
    };

    if let Some(ref path) = options.screenshot {
        match report.screenshot() {
            Some(shot) => {
                if let Err(e) = std::fs::write(path, shot.as_bytes()) {
                    eprintln!("Error writing screenshot: {}", e);
                    return ExitCode::FAILURE;
                }
                info!("Screenshot saved to {}", path.display());
            }
            None => warn!("The {} fetcher captured no screenshot", config.fetcher.backend),
        }
    }

    let content = report::render_as(&report, format);
    if let Err(e) = write_output(&content, options.output.as_deref()) {
        eprintln!("Error: {:#}", e);
        return ExitCode::FAILURE;
    }

    if options.strict && report.has_failures() {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    }
}

async fn handle_validator(config: &Config, action: ValidatorAction) -> ExitCode {
    let artifacts = ExternalValidator::artifact_cache(&config.validator);
    let validator = ExternalValidator::new(config.validator.clone(), artifacts);

    match action {
        ValidatorAction::Status => {
            println!("\nNu HTML Checker:");
            println!("================\n");
            match runtime::find_java(&config.validator).await {
                Some(java) => println!("  Runtime: {}", java),
                None => println!("  Runtime: missing (tried `{}`)", config.validator.java_command),
            }
            let jar = validator.artifacts().path();
            if validator.artifacts().is_present() {
                println!("  Checker: {}", jar.display());
            } else {
                println!("  Checker: missing ({})", jar.display());
            }
            println!("  Enabled: {}", config.validator.enabled);

            if validator.is_available().await {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        ValidatorAction::Install => match validator
            .ensure_available()
            .await
            .map_err(Html5botError::from)
        {
            Ok(()) => {
                println!(
                    "Validator ready: {}",
                    validator.artifacts().path().display()
                );
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                ExitCode::FAILURE
            }
        },
    }
}

fn handle_init(config_path: &Path, format: &str) -> ExitCode {
    let path = if format == "toml" {
        config_path.with_extension("toml")
    } else {
        config_path.to_path_buf()
    };

    match config::write_default_config(&path) {
        Ok(()) => {
            println!("Created configuration file: {}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error creating config: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn handle_show(config: &Config) -> ExitCode {
    println!("\nCurrent Configuration:");
    println!("======================\n");

    println!("Checks:");
    println!(
        "  Title length: {}-{} chars",
        config.checks.title_min_length, config.checks.title_max_length
    );
    println!("  OpenGraph: {}", config.checks.required_opengraph.join(", "));
    println!("  Twitter: {}", config.checks.required_twitter.join(", "));
    for check in CheckRegistry::with_defaults(&config.checks).checks() {
        let info = check.info();
        println!("  {} {}: {}", info.id, info.name, check.description());
    }
    println!();

    println!("Validator:");
    println!("  Enabled: {}", config.validator.enabled);
    println!("  Auto download: {}", config.validator.auto_download);
    println!("  Checker: {}", config.validator.jar_path().display());
    println!("  Java: {}", config.validator.java_command);
    println!("  Run timeout: {}s", config.validator.run_timeout_secs);
    println!();

    println!("Fetcher:");
    println!("  Backend: {}", config.fetcher.backend);
    println!("  Timeout: {}s", config.fetcher.timeout_secs);
    if config.fetcher.backend == FetcherBackend::Chrome {
        println!("  Chrome: {}", config.fetcher.chrome_binary);
        println!(
            "  Window: {}x{}",
            config.fetcher.window_width, config.fetcher.window_height
        );
    }

    ExitCode::SUCCESS
}

fn write_output(content: &str, path: Option<&Path>) -> anyhow::Result<()> {
    match path {
        Some(p) => {
            std::fs::write(p, content)
                .with_context(|| format!("writing report to {}", p.display()))?;
            eprintln!("Report written to {}", p.display());
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}
