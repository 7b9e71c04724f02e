//! Project and link commands (`flagenv project`).

use anyhow::Result;
use flagenv::config::FlagenvConfig;
use flagenv::environments::models::ProjectEnvironment;

use super::super::ProjectCommands;

pub async fn cmd_project(config: &FlagenvConfig, command: ProjectCommands) -> Result<()> {
    let state = super::open_state(config).await?;
    let service = &state.projects;

    match command {
        ProjectCommands::List => {
            let projects = service.list_projects().await?;
            if projects.is_empty() {
                println!("No projects registered.");
            }
            for project in projects {
                println!("{}  {}", console::style(&project.id).bold(), project.name);
            }
        }
        ProjectCommands::Create { id, name } => {
            let project = service.create_project(&id, name).await?;
            println!("Created project {} ({})", project.id, project.name);
        }
        ProjectCommands::Envs { id } => {
            let environments = service.get_project_environments(&id).await?;
            if environments.is_empty() {
                println!("No active environments for project {}.", id);
            }
            for env in environments {
                println!("{}  {}", env.name, console::style(&env.environment_type).dim());
            }
        }
        ProjectCommands::Links { id } => {
            let links = service.list_project_links(&id).await?;
            if links.is_empty() {
                println!("Project {} has no environment links.", id);
            }
            for link in &links {
                print_link(link);
            }
        }
        ProjectCommands::Link { id, environment } => {
            let link = service.enable_for_project(&id, &environment).await?;
            print_link(&link);
        }
        ProjectCommands::Unlink { id, environment } => {
            service.remove_from_project(&id, &environment).await?;
            println!("Removed {} from project {}", environment, id);
        }
        ProjectCommands::Disable { id, environment } => {
            let link = service.disable_for_project(&id, &environment).await?;
            print_link(&link);
        }
    }

    Ok(())
}

fn print_link(link: &ProjectEnvironment) {
    let state = if link.active {
        console::style("active").green()
    } else if link.enabled_for_project {
        console::style("inactive (environment disabled)").yellow()
    } else {
        console::style("disabled for project").dim()
    };
    println!("{}/{}  {}", link.project_id, link.environment_name, state);
}
