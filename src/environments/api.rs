use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};

use super::db::DbHandle;
#[cfg(test)]
use super::db::EnvironmentDb;
use super::models::{CreateEnvironment, EnvironmentPatch, EnvironmentsView, SortOrderMap};
use super::policy::DeletionPolicy;
use super::projects::ProjectEnvironmentService;
use super::service::EnvironmentService;
use crate::errors::{EnvironmentError, ErrorKind};

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub environments: EnvironmentService,
    pub projects: ProjectEnvironmentService,
}

impl AppState {
    pub fn new(db: DbHandle, policy: DeletionPolicy) -> Self {
        Self {
            environments: EnvironmentService::new(db.clone(), policy),
            projects: ProjectEnvironmentService::new(db),
        }
    }
}

pub type SharedState = Arc<AppState>;

// ── Request payload types ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ValidateNameRequest {
    pub name: String,
}

#[derive(Serialize)]
pub struct ValidateNameResponse {
    pub name: String,
    pub available: bool,
}

#[derive(Deserialize)]
pub struct UpdateEnvironmentRequest {
    /// Accepted only when it matches the path; environments are never renamed.
    pub name: Option<String>,
    #[serde(flatten)]
    pub patch: EnvironmentPatch,
}

#[derive(Deserialize)]
pub struct CreateProjectRequest {
    pub id: String,
    pub name: Option<String>,
}

#[derive(Deserialize)]
pub struct AddEnvironmentRequest {
    pub environment: String,
}

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    PreconditionFailed(String),
    Internal(String),
}

impl ApiError {
    fn kind(&self) -> ErrorKind {
        match self {
            ApiError::NotFound(_) => ErrorKind::NotFound,
            ApiError::BadRequest(_) => ErrorKind::Validation,
            ApiError::Conflict(_) => ErrorKind::Conflict,
            ApiError::PreconditionFailed(_) => ErrorKind::PreconditionFailed,
            ApiError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<EnvironmentError> for ApiError {
    fn from(err: EnvironmentError) -> Self {
        let msg = err.to_string();
        match err.kind() {
            ErrorKind::NotFound => ApiError::NotFound(msg),
            ErrorKind::Conflict => ApiError::Conflict(msg),
            ErrorKind::PreconditionFailed => ApiError::PreconditionFailed(msg),
            ErrorKind::Validation => ApiError::BadRequest(msg),
            ErrorKind::Internal => {
                tracing::error!(error = %format!("{:#}", err), "Store failure");
                ApiError::Internal("Internal server error".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::PreconditionFailed(msg) => (StatusCode::PRECONDITION_FAILED, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (
            status,
            Json(serde_json::json!({"error": message, "kind": kind})),
        )
            .into_response()
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route(
            "/api/admin/environments",
            get(list_environments).post(create_environment),
        )
        .route(
            "/api/admin/environments/validate",
            post(validate_environment_name),
        )
        .route("/api/admin/environments/sort-order", put(update_sort_order))
        .route(
            "/api/admin/environments/{name}",
            get(get_environment)
                .put(update_environment)
                .delete(delete_environment),
        )
        .route("/api/admin/environments/{name}/on", post(enable_environment))
        .route("/api/admin/environments/{name}/off", post(disable_environment))
        .route("/api/admin/projects", get(list_projects).post(create_project))
        .route("/api/admin/projects/{id}", get(get_project))
        .route(
            "/api/admin/projects/{id}/environments",
            get(get_project_environments).post(add_environment_to_project),
        )
        .route("/api/admin/projects/{id}/links", get(list_project_links))
        .route(
            "/api/admin/projects/{id}/environments/{name}",
            axum::routing::delete(remove_environment_from_project),
        )
        .route(
            "/api/admin/projects/{id}/environments/{name}/on",
            post(enable_project_environment),
        )
        .route(
            "/api/admin/projects/{id}/environments/{name}/off",
            post(disable_project_environment),
        )
        .route("/health", get(health_check))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn list_environments(
    State(state): State<SharedState>,
) -> Result<impl IntoResponse, ApiError> {
    let environments = state.environments.get_all().await?;
    Ok(Json(EnvironmentsView::new(environments)))
}

async fn create_environment(
    State(state): State<SharedState>,
    Json(req): Json<CreateEnvironment>,
) -> Result<impl IntoResponse, ApiError> {
    let environment = state.environments.create_environment(req).await?;
    Ok((StatusCode::CREATED, Json(environment)))
}

async fn validate_environment_name(
    State(state): State<SharedState>,
    Json(req): Json<ValidateNameRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let available = state.environments.validate_name(&req.name).await?;
    Ok(Json(ValidateNameResponse {
        name: req.name,
        available,
    }))
}

async fn update_sort_order(
    State(state): State<SharedState>,
    Json(orders): Json<SortOrderMap>,
) -> Result<impl IntoResponse, ApiError> {
    state.environments.update_sort_order(orders).await?;
    let environments = state.environments.get_all().await?;
    Ok(Json(EnvironmentsView::new(environments)))
}

async fn get_environment(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let environment = state.environments.get(&name).await?;
    Ok(Json(environment))
}

async fn update_environment(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    Json(req): Json<UpdateEnvironmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(body_name) = &req.name {
        if body_name != &name {
            return Err(ApiError::BadRequest(format!(
                "Environment names are immutable: cannot rename '{}' to '{}'",
                name, body_name
            )));
        }
    }
    let environment = state
        .environments
        .update_environment(&name, req.patch)
        .await?;
    Ok(Json(environment))
}

async fn delete_environment(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.environments.delete_environment(&name).await?;
    Ok(StatusCode::OK)
}

async fn enable_environment(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let environment = state.environments.toggle_environment(&name, true).await?;
    Ok(Json(environment))
}

async fn disable_environment(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let environment = state.environments.toggle_environment(&name, false).await?;
    Ok(Json(environment))
}

async fn list_projects(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let projects = state.projects.list_projects().await?;
    Ok(Json(projects))
}

async fn create_project(
    State(state): State<SharedState>,
    Json(req): Json<CreateProjectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let project = state.projects.create_project(&req.id, req.name).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

async fn get_project(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let project = state.projects.get_project(&id).await?;
    Ok(Json(project))
}

async fn get_project_environments(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let environments = state.projects.get_project_environments(&id).await?;
    Ok(Json(environments))
}

async fn list_project_links(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let links = state.projects.list_project_links(&id).await?;
    Ok(Json(links))
}

async fn add_environment_to_project(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<AddEnvironmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let link = state
        .projects
        .enable_for_project(&id, &req.environment)
        .await?;
    Ok(Json(link))
}

async fn enable_project_environment(
    State(state): State<SharedState>,
    Path((id, name)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let link = state.projects.enable_for_project(&id, &name).await?;
    Ok(Json(link))
}

async fn disable_project_environment(
    State(state): State<SharedState>,
    Path((id, name)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let link = state.projects.disable_for_project(&id, &name).await?;
    Ok(Json(link))
}

async fn remove_environment_from_project(
    State(state): State<SharedState>,
    Path((id, name)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    state.projects.remove_from_project(&id, &name).await?;
    Ok(StatusCode::OK)
}
