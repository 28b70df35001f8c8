//! CLI module for EasyDeploy
//!
//! Command-line interface definitions and handlers for the EasyDeploy
//! telemetry client.
//!
//! # Commands
//!
//! - `logs` - Follow a container's log stream
//! - `app-logs` - Follow an application's log output
//! - `metrics` - Watch dashboard metrics
//! - `session` - Inspect or change the persisted session (show, set-token, clear)
//! - `config` - Configuration utilities (init)
//! - `completions` - Generate shell completions
//!
//! # Example
//!
//! ```bash
//! # Store a token, then follow a container
//! easydeploy session set-token eyJhbGciOi...
//! easydeploy logs 3f2a9c
//!
//! # One metrics reading as JSON
//! easydeploy metrics --once --json
//!
//! # Generate shell completions
//! easydeploy completions bash > ~/.bash_completion.d/easydeploy
//! ```

pub mod completions;
pub mod config;
pub mod follow;
pub mod logs;
pub mod metrics;
pub mod output;
pub mod session;

pub use completions::handle_completions;
pub use config::handle_config_init;

use crate::auth::{AuthContext, CookieJar, FileStore};
use crate::config::{AuthConfig, EasyDeployConfig};
use crate::stream::StreamClient;
use clap::{Args, Parser, Subcommand};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

/// EasyDeploy - streaming telemetry client
#[derive(Parser, Debug)]
#[command(
    name = "easydeploy",
    version,
    about = "Follow EasyDeploy container logs and metrics from the terminal"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "easydeploy.toml", global = true)]
    pub config: PathBuf,

    /// Override the backend base URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

impl Default for GlobalArgs {
    fn default() -> Self {
        Self {
            config: PathBuf::from("easydeploy.toml"),
            api_url: None,
            log_level: None,
            no_color: false,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Follow a container's log stream
    Logs(LogsArgs),
    /// Follow an application's log output
    AppLogs(AppLogsArgs),
    /// Watch dashboard metrics
    Metrics(MetricsArgs),
    /// Persisted session utilities
    #[command(subcommand)]
    Session(SessionCommands),
    /// Configuration utilities
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct LogsArgs {
    /// Container ID
    pub container_id: String,
}

#[derive(Args, Debug)]
pub struct AppLogsArgs {
    /// Application ID
    pub app_id: String,
}

#[derive(Args, Debug)]
pub struct MetricsArgs {
    /// Exit after the first reading
    #[arg(long)]
    pub once: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum SessionCommands {
    /// Show the persisted session and where the token resolves from
    Show(SessionShowArgs),
    /// Store a bearer token as an authenticated session
    SetToken(SessionSetTokenArgs),
    /// Remove the persisted session and flat token
    Clear,
}

#[derive(Args, Debug)]
pub struct SessionShowArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct SessionSetTokenArgs {
    /// Bearer token
    pub token: String,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Initialize a new configuration file
    Init(ConfigInitArgs),
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Output file path
    #[arg(short, long, default_value = "easydeploy.toml")]
    pub output: PathBuf,

    /// Overwrite existing file
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}

/// Load configuration with CLI overrides
pub fn load_config_with_overrides(
    args: &GlobalArgs,
) -> Result<EasyDeployConfig, Box<dyn std::error::Error>> {
    // Load from file if it exists, otherwise use defaults
    let mut config = if args.config.exists() {
        EasyDeployConfig::load(Some(&args.config))?
    } else {
        tracing::debug!("Config file not found, using defaults");
        EasyDeployConfig::default()
    };

    // Apply environment variable overrides
    config = config.with_env_overrides();

    // Apply CLI overrides (highest priority)
    if let Some(ref url) = args.api_url {
        config.api.base_url = url.clone();
    }
    if let Some(ref log_level) = args.log_level {
        config.logging.level = log_level.clone();
    }

    config.validate()?;
    Ok(config)
}

/// Build the credentials context from the configured storage file and cookie header.
pub fn auth_context(config: &AuthConfig) -> AuthContext {
    let cookies = config
        .cookie
        .as_deref()
        .map(CookieJar::parse)
        .unwrap_or_default();
    AuthContext::new(Arc::new(FileStore::new(&config.storage_path)), cookies)
}

/// Load config, install tracing and build a stream client for the streaming
/// commands. Also returns whether output should be colored.
pub fn connect(
    global: &GlobalArgs,
) -> Result<(EasyDeployConfig, StreamClient, bool), Box<dyn std::error::Error>> {
    let config = load_config_with_overrides(global)?;
    crate::logging::init_tracing(&config.logging)?;

    let color = !global.no_color && std::io::stdout().is_terminal();
    if !color {
        colored::control::set_override(false);
    }

    let client = StreamClient::from_config(&config, auth_context(&config.auth))?;
    tracing::debug!(base_url = %config.api.base_url, "Stream client ready");
    Ok((config, client, color))
}
