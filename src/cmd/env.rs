//! Global environment commands (`flagenv env`).

use anyhow::{Context, Result};
use flagenv::config::FlagenvConfig;
use flagenv::environments::models::{
    CreateEnvironment, Environment, EnvironmentPatch, SortOrderMap, validate_environment_name,
};

use super::super::EnvCommands;

pub async fn cmd_env(config: &FlagenvConfig, command: EnvCommands) -> Result<()> {
    let state = super::open_state(config).await?;
    let service = &state.environments;

    match command {
        EnvCommands::List => {
            let environments = service.get_all().await?;
            if environments.is_empty() {
                println!("No environments registered.");
                return Ok(());
            }
            print_table(&environments);
        }
        EnvCommands::Show { name } => {
            let env = service.get(&name).await?;
            print_environment(&env);
        }
        EnvCommands::Create {
            name,
            environment_type,
            sort_order,
        } => {
            let env = service
                .create_environment(CreateEnvironment {
                    name,
                    environment_type,
                    sort_order,
                })
                .await?;
            println!(
                "Created environment {} (disabled, sort order {})",
                console::style(&env.name).bold(),
                env.sort_order
            );
        }
        EnvCommands::Update {
            name,
            environment_type,
            sort_order,
        } => {
            let patch = EnvironmentPatch {
                environment_type,
                sort_order,
            };
            if patch.is_empty() {
                println!("Nothing to update. Pass --type or --sort-order.");
                return Ok(());
            }
            let env = service.update_environment(&name, patch).await?;
            println!("Updated environment {}", console::style(&env.name).bold());
            print_environment(&env);
        }
        EnvCommands::Enable { name } => {
            let env = service.toggle_environment(&name, true).await?;
            println!("Environment {} {}", env.name, console::style("enabled").green());
        }
        EnvCommands::Disable { name } => {
            let env = service.toggle_environment(&name, false).await?;
            println!("Environment {} {}", env.name, console::style("disabled").yellow());
        }
        EnvCommands::Delete { name } => {
            service.delete_environment(&name).await?;
            println!("Deleted environment {}", name);
        }
        EnvCommands::Validate { name } => {
            validate_environment_name(&name)?;
            if !service.validate_name(&name).await? {
                anyhow::bail!("'{}' is already taken", name);
            }
            println!("'{}' is available", name);
        }
        EnvCommands::Sort { orders } => {
            let orders = parse_sort_orders(&orders)?;
            let count = orders.len();
            service.update_sort_order(orders).await?;
            println!("Updated sort order of {} environment(s)", count);
            print_table(&service.get_all().await?);
        }
    }

    Ok(())
}

/// Parse `NAME=ORDER` pairs. A repeated name keeps its last value.
pub fn parse_sort_orders(entries: &[String]) -> Result<SortOrderMap> {
    let mut orders = SortOrderMap::new();
    for entry in entries {
        let (name, order) = entry
            .rsplit_once('=')
            .with_context(|| format!("Expected NAME=ORDER, got '{}'", entry))?;
        let order: i32 = order
            .trim()
            .parse()
            .with_context(|| format!("Invalid sort order in '{}'", entry))?;
        orders.insert(name.trim().to_string(), order);
    }
    Ok(orders)
}

fn print_table(environments: &[Environment]) {
    let width = environments
        .iter()
        .map(|e| e.name.len())
        .max()
        .unwrap_or(4)
        .max(4);
    println!(
        "{}",
        console::style(format!(
            "{:<width$}  {:<12}  {:<8}  {:>5}",
            "NAME",
            "TYPE",
            "STATE",
            "ORDER",
            width = width
        ))
        .bold()
    );
    for env in environments {
        let state = if env.enabled {
            console::style(format!("{:<8}", "enabled")).green()
        } else {
            console::style(format!("{:<8}", "disabled")).dim()
        };
        let marker = if env.protected { " *" } else { "" };
        println!(
            "{:<width$}  {:<12}  {}  {:>5}{}",
            env.name,
            env.environment_type,
            state,
            env.sort_order,
            marker,
            width = width
        );
    }
}

fn print_environment(env: &Environment) {
    println!("  name       = {}", env.name);
    println!("  type       = {}", env.environment_type);
    println!("  enabled    = {}", env.enabled);
    println!("  sort_order = {}", env.sort_order);
    println!("  protected  = {}", env.protected);
    println!("  created_at = {}", env.created_at);
}
