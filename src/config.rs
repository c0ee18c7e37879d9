//! Configuration module for the finger server.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;

/// Command-line arguments for the finger server
#[derive(Parser, Debug)]
#[command(name = "fingerd")]
#[command(author = "fingerd authors")]
#[command(version = "0.1.0")]
#[command(about = "A minimal finger server for local accounts", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind to (e.g., 0.0.0.0:79)
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Credential registry file to scan for login shells
    #[arg(short = 'r', long)]
    pub registry: Option<PathBuf>,

    /// Where display names and home directories come from
    #[arg(long, value_enum)]
    pub identity_source: Option<IdentitySource>,

    /// passwd-format file used when the identity source is `file`
    #[arg(long)]
    pub identity_file: Option<PathBuf>,

    /// Number of worker threads (defaults to number of CPU cores)
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// Per-connection read deadline in milliseconds (0 = none)
    #[arg(long)]
    pub read_timeout_ms: Option<u64>,

    /// Skip the effective-uid check at startup
    #[arg(long)]
    pub no_root_check: bool,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Source of display names and home directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IdentitySource {
    /// The OS account database (NSS via getpwnam_r)
    System,
    /// A passwd-format file
    File,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub accounts: AccountsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Number of worker threads
    pub workers: Option<usize>,
    /// Upper bound on concurrently served connections
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Read deadline for the request line
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Refuse to start unless running as uid 0
    #[serde(default = "default_require_root")]
    pub require_root: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            workers: None,
            max_connections: default_max_connections(),
            read_timeout_ms: default_read_timeout_ms(),
            require_root: default_require_root(),
        }
    }
}

/// Account lookup configuration
#[derive(Debug, Deserialize)]
pub struct AccountsConfig {
    /// Credential registry scanned for shells
    #[serde(default = "default_registry")]
    pub registry: PathBuf,
    #[serde(default = "default_identity_source")]
    pub identity_source: IdentitySource,
    /// Defaults to `registry` when unset
    pub identity_file: Option<PathBuf>,
    /// Name of the forwarding file inside each home directory
    #[serde(default = "default_forward_file")]
    pub forward_file: String,
    /// Byte offset at which a `#` marks a forward-file comment line
    #[serde(default = "default_forward_comment_column")]
    pub forward_comment_column: usize,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            registry: default_registry(),
            identity_source: default_identity_source(),
            identity_file: None,
            forward_file: default_forward_file(),
            forward_comment_column: default_forward_comment_column(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:79".to_string()
}

fn default_max_connections() -> usize {
    1024
}

fn default_read_timeout_ms() -> u64 {
    5000
}

fn default_require_root() -> bool {
    true
}

fn default_registry() -> PathBuf {
    PathBuf::from("/etc/passwd")
}

fn default_identity_source() -> IdentitySource {
    IdentitySource::System
}

fn default_forward_file() -> String {
    ".forward".to_string()
}

fn default_forward_comment_column() -> usize {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub listen: String,
    pub workers: Option<usize>,
    pub max_connections: usize,
    pub read_timeout: Option<Duration>,
    pub require_root: bool,
    pub registry: PathBuf,
    pub identity_source: IdentitySource,
    pub identity_file: PathBuf,
    pub forward_file: String,
    pub forward_comment_column: usize,
    pub log_level: String,
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        let cli = CliArgs::parse();

        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        Ok(Self::merge(cli, toml_config))
    }

    fn merge(cli: CliArgs, toml_config: TomlConfig) -> Self {
        let TomlConfig {
            server,
            accounts,
            logging,
        } = toml_config;

        let registry = cli.registry.unwrap_or(accounts.registry);
        let identity_file = cli
            .identity_file
            .or(accounts.identity_file)
            .unwrap_or_else(|| registry.clone());
        let read_timeout_ms = cli.read_timeout_ms.unwrap_or(server.read_timeout_ms);

        Config {
            listen: cli.listen.unwrap_or(server.listen),
            workers: cli.workers.or(server.workers),
            max_connections: server.max_connections.clamp(1, Semaphore::MAX_PERMITS),
            read_timeout: (read_timeout_ms > 0).then(|| Duration::from_millis(read_timeout_ms)),
            require_root: server.require_root && !cli.no_root_check,
            registry,
            identity_source: cli.identity_source.unwrap_or(accounts.identity_source),
            identity_file,
            forward_file: accounts.forward_file,
            forward_comment_column: accounts.forward_comment_column,
            log_level: cli.log_level.unwrap_or(logging.level),
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {}", .0.display(), .1)]
    FileRead(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse config file '{}': {}", .0.display(), .1)]
    TomlParse(PathBuf, #[source] toml::de::Error),
}
