//! Project-environment link service.
//!
//! A project sees an environment only while both switches are on: the
//! link's own `enabled` flag and the environment's global flag. Nothing
//! here writes to links when the global flag changes; the filter is
//! applied by the queries in `db.rs`.

use tracing::{debug, info};

use super::db::{DbHandle, EnvironmentDb};
use super::models::*;
use crate::errors::{EnvResult, EnvironmentError};

#[derive(Clone)]
pub struct ProjectEnvironmentService {
    db: DbHandle,
}

fn require_project(db: &EnvironmentDb, id: &str) -> EnvResult<Project> {
    db.get_project(id)?
        .ok_or_else(|| EnvironmentError::project_not_found(id))
}

fn require_link(
    db: &EnvironmentDb,
    project_id: &str,
    environment: &str,
) -> EnvResult<ProjectEnvironment> {
    db.get_link(project_id, environment)?
        .ok_or_else(|| EnvironmentError::LinkNotFound {
            project: project_id.to_string(),
            environment: environment.to_string(),
        })
}

/// A project may not lose its only active environment.
fn ensure_not_sole_active(db: &EnvironmentDb, link: &ProjectEnvironment) -> EnvResult<()> {
    if link.active && db.list_active_environments(&link.project_id)?.len() == 1 {
        return Err(EnvironmentError::InUse {
            name: link.environment_name.clone(),
            reason: format!("only active environment of project {}", link.project_id),
        });
    }
    Ok(())
}

impl ProjectEnvironmentService {
    pub fn new(db: DbHandle) -> Self {
        Self { db }
    }

    pub async fn create_project(&self, id: &str, name: Option<String>) -> EnvResult<Project> {
        validate_name("id", id)?;
        let id = id.to_string();
        let name = name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| id.clone());

        let project = self
            .db
            .call(move |db| {
                db.transaction(|db| -> EnvResult<_> {
                    if db.get_project(&id)?.is_some() {
                        return Err(EnvironmentError::ProjectExists { id });
                    }
                    Ok(db.insert_project(&id, &name)?)
                })
            })
            .await?;

        info!(project = %project.id, "Project created");
        Ok(project)
    }

    pub async fn get_project(&self, id: &str) -> EnvResult<Project> {
        let id = id.to_string();
        self.db.call(move |db| require_project(db, &id)).await
    }

    pub async fn list_projects(&self) -> EnvResult<Vec<Project>> {
        self.db
            .call(|db| -> EnvResult<Vec<Project>> { Ok(db.list_projects()?) })
            .await
    }

    /// Environments currently available to the project, ordered like
    /// `EnvironmentService::get_all`.
    pub async fn get_project_environments(&self, project_id: &str) -> EnvResult<Vec<Environment>> {
        let project_id = project_id.to_string();
        let (project_id, environments) = self
            .db
            .call(move |db| {
                require_project(db, &project_id)?;
                let environments = db.list_active_environments(&project_id)?;
                Ok::<_, EnvironmentError>((project_id, environments))
            })
            .await?;
        debug!(
            project = %project_id,
            count = environments.len(),
            "Listed project environments"
        );
        Ok(environments)
    }

    /// Every link of the project with its computed `active` flag.
    pub async fn list_project_links(&self, project_id: &str) -> EnvResult<Vec<ProjectEnvironment>> {
        let project_id = project_id.to_string();
        self.db
            .call(move |db| -> EnvResult<_> {
                require_project(db, &project_id)?;
                Ok(db.list_links(&project_id)?)
            })
            .await
    }

    /// Link the environment to the project (or re-enable an existing link).
    /// The environment must be globally enabled first.
    pub async fn enable_for_project(
        &self,
        project_id: &str,
        environment: &str,
    ) -> EnvResult<ProjectEnvironment> {
        let project_id = project_id.to_string();
        let environment = environment.to_string();
        let link = self
            .db
            .call(move |db| {
                db.transaction(|db| -> EnvResult<_> {
                    require_project(db, &project_id)?;
                    let env = db
                        .get_environment(&environment)?
                        .ok_or_else(|| EnvironmentError::environment_not_found(&environment))?;
                    if !env.enabled {
                        return Err(EnvironmentError::GloballyDisabled {
                            project: project_id,
                            environment,
                        });
                    }
                    db.upsert_link(&project_id, &environment, true)?;
                    require_link(db, &project_id, &environment)
                })
            })
            .await?;

        info!(
            project = %link.project_id,
            environment = %link.environment_name,
            "Environment enabled for project"
        );
        Ok(link)
    }

    /// Turn off an existing link without removing it. A project may not
    /// lose its only active environment.
    pub async fn disable_for_project(
        &self,
        project_id: &str,
        environment: &str,
    ) -> EnvResult<ProjectEnvironment> {
        let project_id = project_id.to_string();
        let environment = environment.to_string();
        let link = self
            .db
            .call(move |db| {
                db.transaction(|db| -> EnvResult<_> {
                    require_project(db, &project_id)?;
                    if !db.environment_exists(&environment)? {
                        return Err(EnvironmentError::environment_not_found(&environment));
                    }
                    let link = require_link(db, &project_id, &environment)?;
                    ensure_not_sole_active(db, &link)?;
                    db.upsert_link(&project_id, &environment, false)?;
                    require_link(db, &project_id, &environment)
                })
            })
            .await?;

        info!(
            project = %link.project_id,
            environment = %link.environment_name,
            "Environment disabled for project"
        );
        Ok(link)
    }

    /// Remove the link. Same sole-active rule as `disable_for_project`.
    pub async fn remove_from_project(&self, project_id: &str, environment: &str) -> EnvResult<()> {
        let project_id = project_id.to_string();
        let environment = environment.to_string();
        let (project_id, environment) = self
            .db
            .call(move |db| {
                db.transaction(|db| -> EnvResult<_> {
                    require_project(db, &project_id)?;
                    let link = require_link(db, &project_id, &environment)?;
                    ensure_not_sole_active(db, &link)?;
                    db.delete_link(&project_id, &environment)?;
                    Ok((project_id, environment))
                })
            })
            .await?;

        info!(project = %project_id, environment = %environment, "Environment removed from project");
        Ok(())
    }
}
