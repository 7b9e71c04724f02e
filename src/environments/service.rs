//! Environment domain service.
//!
//! Every operation runs as one closure on the `DbHandle`; operations that
//! read before they write do so inside [`EnvironmentDb::transaction`], so
//! a rejected request never leaves partial writes behind.

use tracing::{debug, info};

use super::db::{DbHandle, EnvironmentDb};
use super::models::*;
use super::policy::DeletionPolicy;
use crate::errors::{EnvResult, EnvironmentError};

#[derive(Clone)]
pub struct EnvironmentService {
    db: DbHandle,
    policy: DeletionPolicy,
}

fn require_environment(db: &EnvironmentDb, name: &str) -> EnvResult<Environment> {
    db.get_environment(name)?
        .ok_or_else(|| EnvironmentError::environment_not_found(name))
}

impl EnvironmentService {
    pub fn new(db: DbHandle, policy: DeletionPolicy) -> Self {
        Self { db, policy }
    }

    /// Create a new, globally disabled environment.
    pub async fn create_environment(&self, req: CreateEnvironment) -> EnvResult<Environment> {
        validate_environment_name(&req.name)?;
        validate_type(&req.environment_type)?;

        let created = self
            .db
            .call(move |db| {
                db.transaction(|db| -> EnvResult<_> {
                    if db.environment_exists(&req.name)? {
                        return Err(EnvironmentError::NameTaken { name: req.name });
                    }
                    let sort_order = match req.sort_order {
                        Some(order) => order,
                        None => db.next_sort_order()?,
                    };
                    Ok(db.insert_environment(
                        &req.name,
                        &req.environment_type,
                        sort_order,
                        false,
                        false,
                    )?)
                })
            })
            .await?;

        info!(
            environment = %created.name,
            environment_type = %created.environment_type,
            sort_order = created.sort_order,
            "Environment created"
        );
        Ok(created)
    }

    /// Whether `name` is well formed and not taken.
    pub async fn validate_name(&self, name: &str) -> EnvResult<bool> {
        if !is_valid_name(name) {
            return Ok(false);
        }
        let name = name.to_string();
        let taken = self
            .db
            .call(move |db| -> EnvResult<bool> { Ok(db.environment_exists(&name)?) })
            .await?;
        Ok(!taken)
    }

    pub async fn update_environment(
        &self,
        name: &str,
        patch: EnvironmentPatch,
    ) -> EnvResult<Environment> {
        if let Some(t) = &patch.environment_type {
            validate_type(t)?;
        }
        let name = name.to_string();
        let updated = self
            .db
            .call(move |db| {
                db.transaction(|db| -> EnvResult<_> {
                    let existing = require_environment(db, &name)?;
                    if patch.is_empty() {
                        return Ok(existing);
                    }
                    if existing.protected {
                        return Err(EnvironmentError::Protected { name });
                    }
                    if let Some(t) = &patch.environment_type {
                        db.update_environment_type(&name, t)?;
                    }
                    if let Some(order) = patch.sort_order {
                        db.update_sort_order(&name, order)?;
                    }
                    require_environment(db, &name)
                })
            })
            .await?;

        info!(environment = %updated.name, "Environment updated");
        Ok(updated)
    }

    pub async fn delete_environment(&self, name: &str) -> EnvResult<()> {
        let name = name.to_string();
        let policy = self.policy;
        let (name, removed_links) = self
            .db
            .call(move |db| {
                db.transaction(|db| -> EnvResult<_> {
                    let existing = require_environment(db, &name)?;
                    if existing.protected {
                        return Err(EnvironmentError::Protected { name });
                    }
                    policy.check(db, &existing)?;
                    let removed = db.delete_links_for_environment(&name)?;
                    db.delete_environment(&name)?;
                    Ok((name, removed))
                })
            })
            .await?;

        info!(environment = %name, removed_links, "Environment deleted");
        Ok(())
    }

    /// Set the global flag. Project visibility follows at read time.
    pub async fn toggle_environment(&self, name: &str, enabled: bool) -> EnvResult<Environment> {
        let name = name.to_string();
        let toggled = self
            .db
            .call(move |db| {
                db.transaction(|db| -> EnvResult<_> {
                    if !db.set_environment_enabled(&name, enabled)? {
                        return Err(EnvironmentError::environment_not_found(&name));
                    }
                    require_environment(db, &name)
                })
            })
            .await?;

        info!(environment = %toggled.name, enabled, "Environment toggled");
        Ok(toggled)
    }

    /// All environments, ordered by sort order then name.
    pub async fn get_all(&self) -> EnvResult<Vec<Environment>> {
        let environments = self
            .db
            .call(|db| -> EnvResult<Vec<Environment>> { Ok(db.list_environments()?) })
            .await?;
        debug!(count = environments.len(), "Listed environments");
        Ok(environments)
    }

    pub async fn get(&self, name: &str) -> EnvResult<Environment> {
        let name = name.to_string();
        self.db.call(move |db| require_environment(db, &name)).await
    }

    /// Apply a partial sort-order update. All named environments must
    /// exist and be unprotected; otherwise nothing changes.
    pub async fn update_sort_order(&self, orders: SortOrderMap) -> EnvResult<()> {
        if orders.is_empty() {
            return Ok(());
        }
        let count = orders.len();
        self.db
            .call(move |db| {
                db.transaction(|db| -> EnvResult<_> {
                    for (name, order) in &orders {
                        let existing = require_environment(db, name)?;
                        if existing.protected {
                            return Err(EnvironmentError::Protected {
                                name: existing.name,
                            });
                        }
                        db.update_sort_order(name, *order)?;
                    }
                    Ok(())
                })
            })
            .await?;

        info!(count, "Environment sort order updated");
        Ok(())
    }

    /// Insert the protected `default` environment into an empty store.
    pub async fn seed_default(&self) -> EnvResult<bool> {
        let seeded = self
            .db
            .call(|db| -> EnvResult<bool> { Ok(db.seed_default_environment()?) })
            .await?;
        if seeded {
            info!(environment = DEFAULT_ENVIRONMENT, "Seeded default environment");
        }
        Ok(seeded)
    }
}
