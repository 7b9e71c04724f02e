use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "flagenv")]
#[command(version, about = "Environment registry for feature-flag projects")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to flagenv.toml (defaults to .flagenv/flagenv.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database path. Overrides the config file and FLAGENV_DB_PATH.
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database and seed the default environment
    Init,
    /// Serve the admin HTTP API
    Serve {
        /// Port to serve on
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Enable dev mode (bind 0.0.0.0, permissive CORS)
        #[arg(long)]
        dev: bool,
    },
    /// Manage global environments
    Env {
        #[command(subcommand)]
        command: EnvCommands,
    },
    /// Manage projects and their environment links
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum EnvCommands {
    /// List environments in display order
    List,
    /// Show one environment
    Show { name: String },
    /// Create a new (disabled) environment
    Create {
        name: String,
        /// Environment type, e.g. production or development
        #[arg(long = "type")]
        environment_type: String,
        /// Display position; defaults to after the last environment
        #[arg(long, allow_negative_numbers = true)]
        sort_order: Option<i32>,
    },
    /// Change an environment's type or sort order
    Update {
        name: String,
        #[arg(long = "type")]
        environment_type: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        sort_order: Option<i32>,
    },
    /// Enable an environment globally
    Enable { name: String },
    /// Disable an environment globally
    Disable { name: String },
    /// Delete an environment
    Delete { name: String },
    /// Check whether a name is well-formed and unused
    Validate { name: String },
    /// Reorder environments atomically: NAME=ORDER...
    Sort {
        #[arg(required = true, allow_negative_numbers = true)]
        orders: Vec<String>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ProjectCommands {
    /// List projects
    List,
    /// Register a project
    Create {
        id: String,
        /// Display name (defaults to the id)
        #[arg(long)]
        name: Option<String>,
    },
    /// Environments currently active for a project
    Envs { id: String },
    /// All links of a project, including inactive ones
    Links { id: String },
    /// Enable an environment for a project
    Link { id: String, environment: String },
    /// Remove an environment from a project
    Unlink { id: String, environment: String },
    /// Disable an environment for a project, keeping the link
    Disable { id: String, environment: String },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Write a default flagenv.toml
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = cmd::load_config(cli.config.as_deref(), cli.db_path.as_deref())?;
    flagenv::logging::init(&config.logging.filter, config.logging.format, cli.verbose);

    match &cli.command {
        Commands::Init => cmd::cmd_init(&config).await?,
        Commands::Serve { port, host, dev } => {
            cmd::cmd_serve(config, *port, host.clone(), *dev).await?
        }
        Commands::Env { command } => cmd::cmd_env(&config, command.clone()).await?,
        Commands::Project { command } => cmd::cmd_project(&config, command.clone()).await?,
        Commands::Config { command } => cmd::cmd_config(&cli, &config, command.clone())?,
    }

    Ok(())
}
