//! Environment registry: global environments, their display order, and the
//! per-project links that decide which environments a project can use.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐   HTTP   ┌──────────────────────────────────────────────────┐
//! │  Client  │ ───────> │  server.rs  (axum Router, ServerConfig)          │
//! │ (admin)  │ <─────── │    └─ api.rs  (route handlers, AppState)         │
//! └──────────┘          │         │                                        │
//!                       │         ├─ service.rs   (EnvironmentService)     │
//!                       │         │     └─ policy.rs (DeletionPolicy)      │
//!                       │         └─ projects.rs  (ProjectEnvironment-     │
//!                       │                          Service)                │
//!                       │         │                                        │
//!                       │         v                                        │
//!                       │  db.rs  (EnvironmentDb, DbHandle, migrations)    │
//!                       └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Supporting Modules
//!
//! | Module     | Responsibility                                             |
//! |------------|------------------------------------------------------------|
//! | `models`   | `Environment`, `Project`, `ProjectEnvironment`, name rules |
//! | `db`       | SQLite access via `DbHandle` (thin `Arc<Mutex<_>>`)        |
//! | `policy`   | Which environments may be deleted (`LinkGuard`)            |
//!
//! ## Visibility rule
//!
//! A project sees an environment only when the link is enabled for the
//! project **and** the environment is enabled globally. The rule is applied
//! when reading; toggling an environment off never touches its links, so
//! turning it back on restores every project's previous view.
//!
//! ## Typical Request Flow (enable environment for a project)
//!
//! 1. `POST /api/admin/projects/{id}/environments` → `api::add_environment_to_project()`
//! 2. `ProjectEnvironmentService::enable_for_project()` checks the project
//!    and environment exist, then rejects globally disabled environments
//!    with a precondition failure.
//! 3. The link is upserted with `enabled = 1` inside one store transaction.

pub mod api;
pub mod db;
pub mod models;
pub mod policy;
pub mod projects;
pub mod server;
pub mod service;
