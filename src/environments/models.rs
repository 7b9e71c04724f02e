use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{EnvResult, EnvironmentError};

/// Name of the environment seeded into an empty store.
pub const DEFAULT_ENVIRONMENT: &str = "default";

const MAX_NAME_LEN: usize = 100;

/// Environment names taken by static admin routes under `/environments/`.
pub const RESERVED_ENVIRONMENT_NAMES: &[&str] = &["validate", "sort-order"];

static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._~-]*$").expect("name pattern is a valid regex")
});

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub name: String,
    #[serde(rename = "type")]
    pub environment_type: String,
    pub enabled: bool,
    pub sort_order: i32,
    pub protected: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub created_at: String,
}

/// A project's view of one environment.
///
/// `active` is computed at read time from both flags; disabling an
/// environment globally never rewrites its links.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectEnvironment {
    pub project_id: String,
    pub environment_name: String,
    pub enabled_for_project: bool,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEnvironment {
    pub name: String,
    #[serde(rename = "type")]
    pub environment_type: String,
    #[serde(default)]
    pub sort_order: Option<i32>,
}

/// Allowed field changes for an existing environment. There is no `name`:
/// environments cannot be renamed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentPatch {
    #[serde(default, rename = "type")]
    pub environment_type: Option<String>,
    #[serde(default)]
    pub sort_order: Option<i32>,
}

impl EnvironmentPatch {
    pub fn is_empty(&self) -> bool {
        self.environment_type.is_none() && self.sort_order.is_none()
    }
}

/// Partial sort-order update, keyed by environment name.
pub type SortOrderMap = BTreeMap<String, i32>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentsView {
    pub version: u32,
    pub environments: Vec<Environment>,
}

impl EnvironmentsView {
    pub fn new(environments: Vec<Environment>) -> Self {
        Self {
            version: 1,
            environments,
        }
    }
}

/// Returns true when `name` is usable as an environment name.
pub fn is_valid_name(name: &str) -> bool {
    name.len() <= MAX_NAME_LEN
        && NAME_PATTERN.is_match(name)
        && !RESERVED_ENVIRONMENT_NAMES.contains(&name)
}

pub fn validate_name(field: &'static str, name: &str) -> EnvResult<()> {
    if name.is_empty() {
        return Err(EnvironmentError::Validation {
            field,
            message: "must not be empty".to_string(),
        });
    }
    if name.len() > MAX_NAME_LEN {
        return Err(EnvironmentError::Validation {
            field,
            message: format!("must be at most {} characters", MAX_NAME_LEN),
        });
    }
    if !NAME_PATTERN.is_match(name) {
        return Err(EnvironmentError::Validation {
            field,
            message: format!(
                "'{}' must start with a letter or digit and contain only letters, digits, '.', '_', '~' or '-'",
                name
            ),
        });
    }
    Ok(())
}

/// [`validate_name`] plus the reserved route names.
pub fn validate_environment_name(name: &str) -> EnvResult<()> {
    validate_name("name", name)?;
    if RESERVED_ENVIRONMENT_NAMES.contains(&name) {
        return Err(EnvironmentError::Validation {
            field: "name",
            message: format!("'{}' is reserved", name),
        });
    }
    Ok(())
}

pub fn validate_type(environment_type: &str) -> EnvResult<()> {
    if environment_type.trim().is_empty() {
        return Err(EnvironmentError::Validation {
            field: "type",
            message: "must not be empty".to_string(),
        });
    }
    Ok(())
}
