//! CLI command implementations
//!
//! `init` writes a default config, `start` boots the full stack and
//! serves, `exec` runs one command against a fresh store and prints the
//! envelope. All boot logic lives here; main.rs only delegates.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{PasswordPolicy, SessionConfig};
use crate::http_server::{self, HttpServerConfig};
use crate::interpreter::{CallerContext, Interpreter};
use crate::observability::{Logger, Severity};
use crate::store::MemoryStore;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings
    #[serde(default)]
    pub server: HttpServerConfig,

    /// JWT signing secret
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,

    /// Access token lifetime in minutes
    #[serde(default = "default_access_ttl_minutes")]
    pub access_token_ttl_minutes: i64,

    /// Refresh token lifetime in days
    #[serde(default = "default_refresh_ttl_days")]
    pub refresh_token_ttl_days: i64,

    /// Minimum password length for registration
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,

    /// Minimum log severity: trace, info, warn, error
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_jwt_secret() -> String {
    "CHANGE_THIS_SECRET_IN_PRODUCTION".to_string()
}
fn default_access_ttl_minutes() -> i64 {
    15
}
fn default_refresh_ttl_days() -> i64 {
    30
}
fn default_min_password_length() -> usize {
    8
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: HttpServerConfig::default(),
            jwt_secret: default_jwt_secret(),
            access_token_ttl_minutes: default_access_ttl_minutes(),
            refresh_token_ttl_days: default_refresh_ttl_days(),
            min_password_length: default_min_password_length(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("failed to read config: {}", e)))?;
        serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("failed to parse config: {}", e)))
    }

    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            secret: self.jwt_secret.clone(),
            access_ttl_minutes: self.access_token_ttl_minutes,
            refresh_ttl_days: self.refresh_token_ttl_days,
            issuer: "docshell".to_string(),
        }
    }

    fn password_policy(&self) -> PasswordPolicy {
        PasswordPolicy {
            min_length: self.min_password_length,
        }
    }

    fn min_severity(&self) -> Severity {
        match self.log_level.as_str() {
            "trace" => Severity::Trace,
            "warn" => Severity::Warn,
            "error" => Severity::Error,
            _ => Severity::Info,
        }
    }
}

/// Entry point called from main
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    match cli.command {
        Command::Init { config } => init(&config),
        Command::Start { config } => start(&config),
        Command::Exec { config, command } => exec(&config, &command),
    }
}

/// Write a default configuration file; refuses to overwrite
pub fn init(path: &Path) -> CliResult<()> {
    if path.exists() {
        return Err(CliError::config_error(format!(
            "{} already exists",
            path.display()
        )));
    }

    let content = serde_json::to_string_pretty(&Config::default())
        .map_err(|e| CliError::config_error(e.to_string()))?;
    fs::write(path, content)?;
    Logger::info("CONFIG_WRITTEN", &[("path", &path.display().to_string())]);
    Ok(())
}

/// Boot the stack and serve until interrupted
pub fn start(path: &Path) -> CliResult<()> {
    let config = Config::load(path)?;
    Logger::set_min_severity(config.min_severity());

    let runtime = tokio::runtime::Runtime::new()?;
    let store = Arc::new(MemoryStore::new());
    if let Err(e) = runtime.block_on(http_server::serve(
        store,
        config.server.clone(),
        config.session_config(),
        config.password_policy(),
    )) {
        Logger::fatal("SERVER_FAILED", &[("error", &e.to_string())]);
        return Err(e.into());
    }
    Ok(())
}

/// One-shot execution against a fresh in-memory store.
///
/// The operator runs as an authenticated local caller; identity
/// collections stay denied regardless.
pub fn exec(path: &Path, command: &str) -> CliResult<()> {
    let config = Config::load(path).unwrap_or_default();
    Logger::set_min_severity(config.min_severity());

    let interpreter = Interpreter::new(Arc::new(MemoryStore::new()));
    let ctx = CallerContext::authenticated(Uuid::new_v4(), "local");
    let envelope = interpreter.interpret(command, &ctx);

    let rendered = serde_json::to_string_pretty(&envelope)
        .map_err(|e| CliError::config_error(e.to_string()))?;
    println!("{}", rendered);
    Ok(())
}
