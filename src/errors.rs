//! Typed error hierarchy for the environment subsystem.
//!
//! `EnvironmentError` is returned by every domain operation. Each variant
//! maps to one stable [`ErrorKind`] so callers (the HTTP layer, the CLI)
//! can branch on "missing" vs "conflict" vs "precondition" without string
//! matching.

use serde::Serialize;
use thiserror::Error;

/// Stable failure classification exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Conflict,
    PreconditionFailed,
    Validation,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::PreconditionFailed => "precondition_failed",
            Self::Validation => "validation",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from the environment and project-link services.
#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("Environment '{name}' not found")]
    EnvironmentNotFound { name: String },

    #[error("Project '{id}' not found")]
    ProjectNotFound { id: String },

    #[error("Environment '{environment}' is not linked to project '{project}'")]
    LinkNotFound { project: String, environment: String },

    #[error("Environment '{name}' already exists")]
    NameTaken { name: String },

    #[error("Project '{id}' already exists")]
    ProjectExists { id: String },

    #[error("Environment '{name}' is in use: {reason}")]
    InUse { name: String, reason: String },

    #[error("Environment '{name}' is protected and cannot be modified")]
    Protected { name: String },

    #[error(
        "Environment '{environment}' is globally disabled; enable it before enabling it for project '{project}'"
    )]
    GloballyDisabled { project: String, environment: String },

    #[error("Invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("Store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl EnvironmentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EnvironmentNotFound { .. }
            | Self::ProjectNotFound { .. }
            | Self::LinkNotFound { .. } => ErrorKind::NotFound,
            Self::NameTaken { .. }
            | Self::ProjectExists { .. }
            | Self::InUse { .. }
            | Self::Protected { .. } => ErrorKind::Conflict,
            Self::GloballyDisabled { .. } => ErrorKind::PreconditionFailed,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Store(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn environment_not_found(name: &str) -> Self {
        Self::EnvironmentNotFound {
            name: name.to_string(),
        }
    }

    pub(crate) fn project_not_found(id: &str) -> Self {
        Self::ProjectNotFound { id: id.to_string() }
    }
}

pub type EnvResult<T> = std::result::Result<T, EnvironmentError>;
