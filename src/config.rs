//! `flagenv.toml` configuration.
//!
//! Values are layered: the TOML file (or defaults when it is missing), then
//! `FLAGENV_*` environment variables, then command-line flags applied by
//! the caller.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::environments::policy::{DeletionPolicy, LinkGuard};
use crate::environments::server::ServerConfig;

/// Directory holding the config file and the default database.
pub const CONFIG_DIR: &str = ".flagenv";
pub const CONFIG_FILE: &str = "flagenv.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => anyhow::bail!("Invalid log format '{}'. Valid values: pretty, json", s),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bind on all interfaces and allow any CORS origin
    #[serde(default)]
    pub dev_mode: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    4242
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            dev_mode: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSection {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    Path::new(CONFIG_DIR).join("environments.db")
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicySection {
    #[serde(default)]
    pub link_guard: LinkGuard,
    #[serde(default = "default_min_enabled")]
    pub min_enabled_environments: usize,
    /// Insert the protected `default` environment into an empty database
    #[serde(default = "default_seed")]
    pub seed_default_environment: bool,
}

fn default_min_enabled() -> usize {
    1
}

fn default_seed() -> bool {
    true
}

impl Default for PolicySection {
    fn default() -> Self {
        Self {
            link_guard: LinkGuard::default(),
            min_enabled_environments: default_min_enabled(),
            seed_default_environment: default_seed(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    /// `EnvFilter` directive, used when neither `RUST_LOG` nor `FLAGENV_LOG` is set
    #[serde(default = "default_filter")]
    pub filter: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            format: LogFormat::default(),
        }
    }
}

/// The complete flagenv.toml configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlagenvConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub policy: PolicySection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl FlagenvConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse flagenv.toml")
    }

    /// Load `path` if it exists, otherwise return the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize flagenv.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize flagenv.toml")
    }

    /// Apply `FLAGENV_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides using `lookup` in place of the process environment.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("FLAGENV_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("FLAGENV_PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("Invalid FLAGENV_PORT '{}'", port))?;
        }
        if let Some(path) = lookup("FLAGENV_DB_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(guard) = lookup("FLAGENV_LINK_GUARD") {
            self.policy.link_guard = guard.parse()?;
        }
        if let Some(min) = lookup("FLAGENV_MIN_ENABLED") {
            self.policy.min_enabled_environments = min
                .parse()
                .with_context(|| format!("Invalid FLAGENV_MIN_ENABLED '{}'", min))?;
        }
        Ok(())
    }

    pub fn deletion_policy(&self) -> DeletionPolicy {
        DeletionPolicy {
            link_guard: self.policy.link_guard,
            min_enabled_environments: self.policy.min_enabled_environments,
        }
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.server.host.clone(),
            port: self.server.port,
            db_path: self.database.path.clone(),
            dev_mode: self.server.dev_mode,
            policy: self.deletion_policy(),
            seed_default: self.policy.seed_default_environment,
        }
    }

    /// Check for values that parse but cannot work; returns warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; the OS will pick a random port".to_string());
        }
        if self.policy.min_enabled_environments == 0 {
            warnings.push(
                "policy.min_enabled_environments is 0; every environment may be deleted"
                    .to_string(),
            );
        }
        if tracing_subscriber::EnvFilter::try_new(&self.logging.filter).is_err() {
            warnings.push(format!(
                "Invalid logging.filter '{}': falling back to 'info'",
                self.logging.filter
            ));
        }

        warnings
    }
}

/// Path of the config file when `--config` is not given.
pub fn default_config_path() -> PathBuf {
    Path::new(CONFIG_DIR).join(CONFIG_FILE)
}
