use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::api::{self, AppState};
use super::db::{DbHandle, EnvironmentDb};
use super::policy::DeletionPolicy;

/// Configuration for the environment admin server.
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub dev_mode: bool,
    pub policy: DeletionPolicy,
    pub seed_default: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4242,
            db_path: PathBuf::from(".flagenv/environments.db"),
            dev_mode: false,
            policy: DeletionPolicy::default(),
            seed_default: true,
        }
    }
}

/// Build the full application router with request tracing.
pub fn build_router(state: Arc<AppState>, dev_mode: bool) -> Router {
    let mut app = api::api_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if dev_mode {
        app = app.layer(CorsLayer::permissive());
    }
    app
}

/// Open the store at `path`, creating its directory and optionally seeding
/// the default environment.
pub async fn open_state(
    path: &std::path::Path,
    policy: DeletionPolicy,
    seed_default: bool,
) -> Result<Arc<AppState>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }
    }

    let db = EnvironmentDb::new(path).context("Failed to initialize environment database")?;
    let state = Arc::new(AppState::new(DbHandle::new(db), policy));

    if seed_default {
        state
            .environments
            .seed_default()
            .await
            .context("Failed to seed default environment")?;
    }
    Ok(state)
}

/// Start the environment admin server.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    let state = open_state(&config.db_path, config.policy, config.seed_default).await?;
    let app = build_router(state, config.dev_mode);

    let host = if config.dev_mode {
        "0.0.0.0"
    } else {
        config.host.as_str()
    };
    let addr = format!("{}:{}", host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    info!(
        addr = %local_addr,
        db = %config.db_path.display(),
        link_guard = %config.policy.link_guard,
        "Environment server listening"
    );
    println!("flagenv running at http://{}", local_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    println!("Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    println!("\nShutting down...");
}
