//! Database setup and HTTP server commands (`flagenv init`, `flagenv serve`).

use anyhow::Result;
use flagenv::config::FlagenvConfig;
use flagenv::environments::server::start_server;

pub async fn cmd_init(config: &FlagenvConfig) -> Result<()> {
    let state = super::open_state(config).await?;
    let environments = state.environments.get_all().await?;

    println!(
        "Environment database initialized at {}",
        config.database.path.display()
    );
    println!("  {} environment(s) registered", environments.len());
    Ok(())
}

pub async fn cmd_serve(
    mut config: FlagenvConfig,
    port: Option<u16>,
    host: Option<String>,
    dev: bool,
) -> Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(host) = host {
        config.server.host = host;
    }
    if dev {
        config.server.dev_mode = true;
    }

    for warning in config.validate() {
        tracing::warn!("{}", warning);
    }

    start_server(config.server_config()).await
}
