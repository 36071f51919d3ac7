//! # prgate CLI
//!
//! Command-line interface for pull request checks backed by a GitHub App.
//!
//! This module provides CLI commands for:
//! - Classifying the files a pull request changes
//! - Validating and showing the resolved configuration
//! - Generating shell completions

pub mod classifier;
pub mod settings;

use clap::{CommandFactory, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use prgate_github::auth::{ApplicationCredential, InstallationCredential};
use prgate_github::client::GitHubClient;
use prgate_github::files::{fetch_classified_files, FileClassification};
use prgate_github::{ApiError, KeyLoadingError, ValidationError};

use classifier::RegexClassifier;
use settings::{load_settings, Settings};

// ============================================================================
// CLI Structure
// ============================================================================

/// prgate - pull request checks for a GitHub App
#[derive(Parser)]
#[command(name = "prgate")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Pull request checks backed by a GitHub App")]
#[command(
    long_about = "prgate authenticates as a GitHub App installation and inspects pull requests, reading only as many pages of changed files as it needs"
)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "PRGATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Logging level or filter directive (overrides configuration)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long)]
    pub json_logs: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Report whether a pull request touches production code and release notes
    Classify {
        /// Repository API URL, or `owner/repo`
        #[arg(short, long)]
        repository: String,

        /// Pull request number
        #[arg(short, long, required_unless_present = "files_url", conflicts_with = "files_url")]
        pull_request: Option<u64>,

        /// Full URL of the pull request's files collection
        #[arg(long)]
        files_url: Option<String>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Validate configuration
    Config {
        /// Show resolved configuration
        #[arg(short, long)]
        show: bool,

        /// Output format for configuration
        #[arg(short = 'f', long, default_value = "yaml")]
        format: ConfigFormat,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON output
    Json,
}

/// Configuration format options
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ConfigFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

// ============================================================================
// CLI Error Types
// ============================================================================

/// CLI-specific errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Credential error: {0}")]
    Credential(#[from] KeyLoadingError),

    #[error("GitHub API error: {0}")]
    Api(#[from] ApiError),

    #[error("Invalid argument: {arg} - {message}")]
    InvalidArgument { arg: String, message: String },

    #[error("Output error: {message}")]
    Output { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Process exit code for this error.
    ///
    /// A rate-limited run exits with 75 (`EX_TEMPFAIL`) so a scheduler can
    /// retry later instead of reporting a failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) => 1,
            Self::Credential(_) => 2,
            Self::Api(e) if e.is_rate_limited() => 75,
            Self::Api(ApiError::Credential(_)) => 2,
            Self::Api(_) => 3,
            Self::InvalidArgument { .. } => 4,
            Self::Output { .. } | Self::Io(_) => 5,
        }
    }
}

/// Configuration-related errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Missing required configuration: {key}")]
    MissingRequired { key: String },

    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

// ============================================================================
// Main Entry Point
// ============================================================================

/// Main CLI entry point
pub async fn run_cli() -> Result<(), CliError> {
    run(Cli::parse(), &mut std::io::stdout()).await
}

/// Execute a parsed command line, writing command output to `out`.
///
/// Completions need neither configuration nor logging; every other command
/// loads settings and installs logging first.
pub async fn run(cli: Cli, out: &mut dyn Write) -> Result<(), CliError> {
    match cli.command {
        Commands::Completions { shell } => execute_completions_command(shell, out),
        Commands::Classify {
            repository,
            pull_request,
            files_url,
            format,
        } => {
            let settings = prepare(cli.config, cli.log_level, cli.json_logs)?;
            execute_classify_command(&settings, &repository, pull_request, files_url, format, out)
                .await
        }
        Commands::Config { show, format } => {
            let settings = prepare(cli.config, cli.log_level, cli.json_logs)?;
            execute_config_command(&settings, show, format, out)
        }
    }
}

/// Load settings and install logging from them and the global flags.
fn prepare(
    config: Option<PathBuf>,
    log_level: Option<String>,
    json_logs: bool,
) -> Result<Settings, CliError> {
    let settings = load_settings(config.as_deref())?;

    let level = log_level.as_deref().unwrap_or(&settings.logging.level);
    initialize_logging(level, json_logs || settings.logging.json)?;
    debug!(config = ?config, "Configuration loaded");

    Ok(settings)
}

// ============================================================================
// Command Implementations
// ============================================================================

/// Install the global tracing subscriber, writing to stderr.
///
/// `RUST_LOG` takes precedence over `level`. A subscriber that is already
/// installed is left in place.
fn initialize_logging(level: &str, json: bool) -> Result<(), CliError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level).map_err(|e| CliError::InvalidArgument {
            arg: "log-level".to_string(),
            message: e.to_string(),
        })?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };

    if result.is_err() {
        debug!("Tracing subscriber already installed");
    }
    Ok(())
}

/// Execute classify command
async fn execute_classify_command(
    settings: &Settings,
    repository: &str,
    pull_request: Option<u64>,
    files_url: Option<String>,
    format: OutputFormat,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    let repository_url = resolve_repository_url(&settings.github.api_url, repository)?;
    let files_url = match (files_url, pull_request) {
        (Some(url), _) => url,
        (None, Some(number)) => format!("{}/pulls/{}/files?per_page=100", repository_url, number),
        (None, None) => {
            return Err(CliError::InvalidArgument {
                arg: "pull-request".to_string(),
                message: "either --pull-request or --files-url is required".to_string(),
            })
        }
    };

    info!(
        repository_url = %repository_url,
        files_url = %files_url,
        "Classifying pull request files"
    );

    let classifier = RegexClassifier::from_settings(&settings.classification)?;
    let client = GitHubClient::new(settings.github.client_config()?).map_err(ConfigError::from)?;
    let app_credential = Arc::new(ApplicationCredential::new(
        settings.github.app_id()?,
        settings.github.private_key_source()?,
    ));

    let installation =
        InstallationCredential::for_repository(client.clone(), &repository_url, app_credential)
            .await?;

    let classification = fetch_classified_files(
        &client,
        Arc::new(installation),
        &files_url,
        Arc::new(classifier),
    )
    .await?;

    writeln!(out, "{}", render_classification(&classification, format)?)?;
    Ok(())
}

/// Turn `owner/repo` into an API URL; full URLs pass through.
fn resolve_repository_url(api_url: &str, repository: &str) -> Result<String, CliError> {
    let repository = repository.trim().trim_end_matches('/');
    if repository.starts_with("http://") || repository.starts_with("https://") {
        return Ok(repository.to_string());
    }

    match repository.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok(format!("{}/repos/{}/{}", api_url.trim_end_matches('/'), owner, name))
        }
        _ => Err(CliError::InvalidArgument {
            arg: "repository".to_string(),
            message: format!("expected owner/repo or an API URL, got '{}'", repository),
        }),
    }
}

fn render_classification(
    classification: &FileClassification,
    format: OutputFormat,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Text => Ok(format!(
            "touches_production: {}\ntouches_release_notes: {}",
            classification.touches_production, classification.touches_release_notes
        )),
        OutputFormat::Json => {
            serde_json::to_string_pretty(classification).map_err(|e| CliError::Output {
                message: e.to_string(),
            })
        }
    }
}

/// Execute config command
fn execute_config_command(
    settings: &Settings,
    show: bool,
    format: ConfigFormat,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    settings.github.client_config()?;
    RegexClassifier::from_settings(&settings.classification)?;

    if !show {
        writeln!(out, "Configuration is valid")?;
        return Ok(());
    }

    writeln!(out, "{}", render_settings(settings, format)?)?;
    Ok(())
}

fn render_settings(settings: &Settings, format: ConfigFormat) -> Result<String, CliError> {
    let rendered = match format {
        ConfigFormat::Yaml => serde_yaml::to_string(settings).map_err(|e| e.to_string()),
        ConfigFormat::Json => serde_json::to_string_pretty(settings).map_err(|e| e.to_string()),
    };
    rendered.map_err(|message| CliError::Output { message })
}

/// Execute completions command
fn execute_completions_command(
    shell: clap_complete::Shell,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    let mut command = Cli::command();
    clap_complete::generate(shell, &mut command, "prgate", out);
    Ok(())
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
