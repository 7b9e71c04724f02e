//! Deletion guard for environments.
//!
//! Whether an environment may be deleted depends on who still uses it.
//! The rule is configurable (`[policy]` in `flagenv.toml`) because
//! deployments disagree on how strict it should be:
//!
//! | `link_guard`  | Blocks deletion when                                   |
//! |---------------|--------------------------------------------------------|
//! | `any_link`    | any project links the environment, enabled or not      |
//! | `sole_active` | the environment is some project's only active one      |
//! | `none`        | never (links are removed with the environment)         |
//!
//! Independently, `min_enabled_environments` keeps at least that many
//! globally enabled environments around.

use serde::{Deserialize, Serialize};

use super::db::EnvironmentDb;
use super::models::Environment;
use crate::errors::{EnvResult, EnvironmentError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkGuard {
    #[default]
    AnyLink,
    SoleActive,
    None,
}

impl LinkGuard {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AnyLink => "any_link",
            Self::SoleActive => "sole_active",
            Self::None => "none",
        }
    }
}

impl std::fmt::Display for LinkGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LinkGuard {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "any_link" => Ok(Self::AnyLink),
            "sole_active" => Ok(Self::SoleActive),
            "none" => Ok(Self::None),
            _ => anyhow::bail!(
                "Invalid link guard '{}'. Valid values: any_link, sole_active, none",
                s
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeletionPolicy {
    pub link_guard: LinkGuard,
    pub min_enabled_environments: usize,
}

impl Default for DeletionPolicy {
    fn default() -> Self {
        Self {
            link_guard: LinkGuard::AnyLink,
            min_enabled_environments: 1,
        }
    }
}

impl DeletionPolicy {
    /// Reject with `InUse` if deleting `environment` would violate the
    /// policy. Must run in the same transaction as the delete.
    pub fn check(&self, db: &EnvironmentDb, environment: &Environment) -> EnvResult<()> {
        let name = &environment.name;

        match self.link_guard {
            LinkGuard::AnyLink => {
                let links = db.count_links_for_environment(name)?;
                if links > 0 {
                    return Err(EnvironmentError::InUse {
                        name: name.clone(),
                        reason: format!("referenced by {} project link(s)", links),
                    });
                }
            }
            LinkGuard::SoleActive => {
                let projects = db.projects_with_sole_active(name)?;
                if !projects.is_empty() {
                    return Err(EnvironmentError::InUse {
                        name: name.clone(),
                        reason: format!(
                            "only active environment of project(s) {}",
                            projects.join(", ")
                        ),
                    });
                }
            }
            LinkGuard::None => {}
        }

        if environment.enabled {
            let remaining = db.count_enabled_environments()?.saturating_sub(1);
            if remaining < self.min_enabled_environments {
                return Err(EnvironmentError::InUse {
                    name: name.clone(),
                    reason: format!(
                        "deleting it would leave {} enabled environment(s), at least {} required",
                        remaining, self.min_enabled_environments
                    ),
                });
            }
        }

        Ok(())
    }
}
