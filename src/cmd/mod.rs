//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module    | Commands handled            |
//! |-----------|-----------------------------|
//! | `server`  | `Init`, `Serve`             |
//! | `env`     | `Env`                       |
//! | `project` | `Project`                   |
//! | `config`  | `Config`                    |

pub mod config;
pub mod env;
pub mod project;
pub mod server;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use flagenv::config::{FlagenvConfig, default_config_path};
use flagenv::environments::api::AppState;

pub use config::cmd_config;
pub use env::cmd_env;
pub use project::cmd_project;
pub use server::{cmd_init, cmd_serve};

/// Resolve the effective configuration: file, then `FLAGENV_*` variables,
/// then `--db-path`. An explicit `--config` must exist.
pub fn load_config(config_path: Option<&Path>, db_path: Option<&Path>) -> Result<FlagenvConfig> {
    let mut config = match config_path {
        Some(path) => FlagenvConfig::load(path)?,
        None => FlagenvConfig::load_or_default(&default_config_path())?,
    };
    config
        .apply_env_overrides()
        .context("Invalid FLAGENV_* environment variable")?;
    if let Some(path) = db_path {
        config.database.path = path.to_path_buf();
    }
    Ok(config)
}

/// Open the configured database for a one-shot command.
pub async fn open_state(config: &FlagenvConfig) -> Result<Arc<AppState>> {
    flagenv::environments::server::open_state(
        &config.database.path,
        config.deletion_policy(),
        config.policy.seed_default_environment,
    )
    .await
}
