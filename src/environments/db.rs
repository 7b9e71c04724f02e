use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use rusqlite::{Connection, Row, params};

use super::models::*;

/// Async-safe handle to the environment database.
///
/// Wraps `EnvironmentDb` behind `Arc<Mutex>` and runs all access on tokio's
/// blocking thread pool via `spawn_blocking`, preventing synchronous SQLite
/// I/O from tying up async worker threads.
#[derive(Clone)]
pub struct DbHandle {
    inner: Arc<std::sync::Mutex<EnvironmentDb>>,
}

impl DbHandle {
    pub fn new(db: EnvironmentDb) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(db)),
        }
    }

    /// Run a closure with access to the database on a blocking thread.
    /// All data passed into `f` must be owned (`'static`). The closure's
    /// error type only needs to absorb `anyhow::Error`, so domain errors
    /// pass through untouched.
    pub async fn call<F, R, E>(&self, f: F) -> std::result::Result<R, E>
    where
        F: FnOnce(&EnvironmentDb) -> std::result::Result<R, E> + Send + 'static,
        R: Send + 'static,
        E: From<anyhow::Error> + Send + 'static,
    {
        let db = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db
                .lock()
                .map_err(|e| E::from(anyhow::anyhow!("DB lock poisoned: {}", e)))?;
            f(&guard)
        })
        .await
        .map_err(|e| E::from(anyhow::Error::new(e).context("DB task panicked")))?
    }

    /// Acquire the database mutex synchronously. Never call this from a
    /// request path.
    pub fn lock_sync(&self) -> Result<std::sync::MutexGuard<'_, EnvironmentDb>> {
        self.inner
            .lock()
            .map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))
    }
}

pub struct EnvironmentDb {
    conn: Connection,
}

const ENVIRONMENT_COLUMNS: &str = "name, type, enabled, sort_order, protected, created_at";

fn environment_from_row(row: &Row<'_>) -> rusqlite::Result<Environment> {
    Ok(Environment {
        name: row.get(0)?,
        environment_type: row.get(1)?,
        enabled: row.get(2)?,
        sort_order: row.get(3)?,
        protected: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
    })
}

fn link_from_row(row: &Row<'_>) -> rusqlite::Result<ProjectEnvironment> {
    Ok(ProjectEnvironment {
        project_id: row.get(0)?,
        environment_name: row.get(1)?,
        enabled_for_project: row.get(2)?,
        active: row.get(3)?,
    })
}

impl EnvironmentDb {
    /// Open (or create) a SQLite database at the given path and run migrations.
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn new_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        self.run_migrations().context("Failed to run migrations")?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS environments (
                    name TEXT PRIMARY KEY NOT NULL,
                    type TEXT NOT NULL,
                    enabled INTEGER NOT NULL DEFAULT 0,
                    sort_order INTEGER NOT NULL DEFAULT 0,
                    protected INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE TABLE IF NOT EXISTS projects (
                    id TEXT PRIMARY KEY NOT NULL,
                    name TEXT NOT NULL,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE TABLE IF NOT EXISTS project_environments (
                    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                    environment_name TEXT NOT NULL REFERENCES environments(name),
                    enabled INTEGER NOT NULL DEFAULT 1,
                    PRIMARY KEY (project_id, environment_name)
                );

                CREATE INDEX IF NOT EXISTS idx_environments_order ON environments(sort_order, name);
                CREATE INDEX IF NOT EXISTS idx_project_environments_env ON project_environments(environment_name);
                ",
            )
            .context("Failed to create tables")?;
        Ok(())
    }

    /// Run `f` inside a single SQLite transaction. Any error returned by `f`
    /// drops the transaction, rolling back every write it made.
    ///
    /// Uses `unchecked_transaction` because `DbHandle`'s mutex already
    /// guarantees single-threaded access. Not reentrant: `f` must not call
    /// `transaction` again.
    pub fn transaction<R, E>(
        &self,
        f: impl FnOnce(&Self) -> std::result::Result<R, E>,
    ) -> std::result::Result<R, E>
    where
        E: From<anyhow::Error>,
    {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;
        let out = f(self)?;
        tx.commit().context("Failed to commit transaction")?;
        Ok(out)
    }

    // ── Environment CRUD ──────────────────────────────────────────────

    pub fn insert_environment(
        &self,
        name: &str,
        environment_type: &str,
        sort_order: i32,
        enabled: bool,
        protected: bool,
    ) -> Result<Environment> {
        self.conn
            .execute(
                "INSERT INTO environments (name, type, enabled, sort_order, protected) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![name, environment_type, enabled, sort_order, protected],
            )
            .context("Failed to insert environment")?;
        self.get_environment(name)?
            .context("Environment not found after insert")
    }

    pub fn get_environment(&self, name: &str) -> Result<Option<Environment>> {
        let sql = format!("SELECT {} FROM environments WHERE name = ?1", ENVIRONMENT_COLUMNS);
        let mut stmt = self
            .conn
            .prepare(&sql)
            .context("Failed to prepare get_environment")?;
        let mut rows = stmt
            .query_map(params![name], environment_from_row)
            .context("Failed to query environment")?;
        match rows.next() {
            Some(row) => Ok(Some(row.context("Failed to read environment row")?)),
            None => Ok(None),
        }
    }

    /// All environments ordered by `sort_order`, then `name` (byte order).
    pub fn list_environments(&self) -> Result<Vec<Environment>> {
        let sql = format!(
            "SELECT {} FROM environments ORDER BY sort_order ASC, name ASC",
            ENVIRONMENT_COLUMNS
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .context("Failed to prepare list_environments")?;
        let rows = stmt
            .query_map([], environment_from_row)
            .context("Failed to query environments")?;
        let mut environments = Vec::new();
        for row in rows {
            environments.push(row.context("Failed to read environment row")?);
        }
        Ok(environments)
    }

    pub fn environment_exists(&self, name: &str) -> Result<bool> {
        self.conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM environments WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .context("Failed to check environment existence")
    }

    /// Sort order that places a new environment after all existing ones.
    pub fn next_sort_order(&self) -> Result<i32> {
        let max: i32 = self
            .conn
            .query_row(
                "SELECT COALESCE(MAX(sort_order), 0) FROM environments",
                [],
                |row| row.get(0),
            )
            .context("Failed to get max sort order")?;
        Ok(max.saturating_add(1))
    }

    pub fn update_environment_type(&self, name: &str, environment_type: &str) -> Result<bool> {
        let count = self
            .conn
            .execute(
                "UPDATE environments SET type = ?1 WHERE name = ?2",
                params![environment_type, name],
            )
            .context("Failed to update environment type")?;
        Ok(count > 0)
    }

    pub fn update_sort_order(&self, name: &str, sort_order: i32) -> Result<bool> {
        let count = self
            .conn
            .execute(
                "UPDATE environments SET sort_order = ?1 WHERE name = ?2",
                params![sort_order, name],
            )
            .context("Failed to update environment sort order")?;
        Ok(count > 0)
    }

    pub fn set_environment_enabled(&self, name: &str, enabled: bool) -> Result<bool> {
        let count = self
            .conn
            .execute(
                "UPDATE environments SET enabled = ?1 WHERE name = ?2",
                params![enabled, name],
            )
            .context("Failed to toggle environment")?;
        Ok(count > 0)
    }

    pub fn delete_environment(&self, name: &str) -> Result<bool> {
        let count = self
            .conn
            .execute("DELETE FROM environments WHERE name = ?1", params![name])
            .context("Failed to delete environment")?;
        Ok(count > 0)
    }

    pub fn count_enabled_environments(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM environments WHERE enabled = 1",
                [],
                |row| row.get(0),
            )
            .context("Failed to count enabled environments")?;
        Ok(count as usize)
    }

    /// Insert the protected `default` environment if the table is empty.
    /// Returns whether a row was inserted.
    pub fn seed_default_environment(&self) -> Result<bool> {
        let empty: bool = self
            .conn
            .query_row("SELECT COUNT(*) = 0 FROM environments", [], |row| row.get(0))
            .context("Failed to count environments")?;
        if !empty {
            return Ok(false);
        }
        self.insert_environment(DEFAULT_ENVIRONMENT, "production", 1, true, true)?;
        Ok(true)
    }

    // ── Project CRUD ──────────────────────────────────────────────────

    pub fn insert_project(&self, id: &str, name: &str) -> Result<Project> {
        self.conn
            .execute(
                "INSERT INTO projects (id, name) VALUES (?1, ?2)",
                params![id, name],
            )
            .context("Failed to insert project")?;
        self.get_project(id)?
            .context("Project not found after insert")
    }

    pub fn get_project(&self, id: &str) -> Result<Option<Project>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, created_at FROM projects WHERE id = ?1")
            .context("Failed to prepare get_project")?;
        let mut rows = stmt
            .query_map(params![id], project_from_row)
            .context("Failed to query project")?;
        match rows.next() {
            Some(row) => Ok(Some(row.context("Failed to read project row")?)),
            None => Ok(None),
        }
    }

    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, created_at FROM projects ORDER BY id")
            .context("Failed to prepare list_projects")?;
        let rows = stmt
            .query_map([], project_from_row)
            .context("Failed to query projects")?;
        let mut projects = Vec::new();
        for row in rows {
            projects.push(row.context("Failed to read project row")?);
        }
        Ok(projects)
    }

    // ── Project-environment links ─────────────────────────────────────

    pub fn upsert_link(&self, project_id: &str, environment: &str, enabled: bool) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO project_environments (project_id, environment_name, enabled)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(project_id, environment_name) DO UPDATE SET enabled = excluded.enabled",
                params![project_id, environment, enabled],
            )
            .context("Failed to upsert project environment")?;
        Ok(())
    }

    pub fn get_link(&self, project_id: &str, environment: &str) -> Result<Option<ProjectEnvironment>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT pe.project_id, pe.environment_name, pe.enabled, (pe.enabled = 1 AND e.enabled = 1)
                 FROM project_environments pe
                 JOIN environments e ON e.name = pe.environment_name
                 WHERE pe.project_id = ?1 AND pe.environment_name = ?2",
            )
            .context("Failed to prepare get_link")?;
        let mut rows = stmt
            .query_map(params![project_id, environment], link_from_row)
            .context("Failed to query project environment")?;
        match rows.next() {
            Some(row) => Ok(Some(row.context("Failed to read project environment row")?)),
            None => Ok(None),
        }
    }

    pub fn delete_link(&self, project_id: &str, environment: &str) -> Result<bool> {
        let count = self
            .conn
            .execute(
                "DELETE FROM project_environments WHERE project_id = ?1 AND environment_name = ?2",
                params![project_id, environment],
            )
            .context("Failed to delete project environment")?;
        Ok(count > 0)
    }

    /// Every link of a project, in environment order.
    pub fn list_links(&self, project_id: &str) -> Result<Vec<ProjectEnvironment>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT pe.project_id, pe.environment_name, pe.enabled, (pe.enabled = 1 AND e.enabled = 1)
                 FROM project_environments pe
                 JOIN environments e ON e.name = pe.environment_name
                 WHERE pe.project_id = ?1
                 ORDER BY e.sort_order ASC, e.name ASC",
            )
            .context("Failed to prepare list_links")?;
        let rows = stmt
            .query_map(params![project_id], link_from_row)
            .context("Failed to query project environments")?;
        let mut links = Vec::new();
        for row in rows {
            links.push(row.context("Failed to read project environment row")?);
        }
        Ok(links)
    }

    /// Environments that are enabled both globally and for the project.
    pub fn list_active_environments(&self, project_id: &str) -> Result<Vec<Environment>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT e.name, e.type, e.enabled, e.sort_order, e.protected, e.created_at
                 FROM environments e
                 JOIN project_environments pe ON pe.environment_name = e.name
                 WHERE pe.project_id = ?1 AND pe.enabled = 1 AND e.enabled = 1
                 ORDER BY e.sort_order ASC, e.name ASC",
            )
            .context("Failed to prepare list_active_environments")?;
        let rows = stmt
            .query_map(params![project_id], environment_from_row)
            .context("Failed to query project environments")?;
        let mut environments = Vec::new();
        for row in rows {
            environments.push(row.context("Failed to read environment row")?);
        }
        Ok(environments)
    }

    pub fn count_links_for_environment(&self, environment: &str) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM project_environments WHERE environment_name = ?1",
                params![environment],
                |row| row.get(0),
            )
            .context("Failed to count environment links")?;
        Ok(count as usize)
    }

    /// Projects for which `environment` is the only active environment.
    pub fn projects_with_sole_active(&self, environment: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT pe.project_id
                 FROM project_environments pe
                 JOIN environments e ON e.name = pe.environment_name
                 WHERE pe.environment_name = ?1 AND pe.enabled = 1 AND e.enabled = 1
                   AND NOT EXISTS (
                     SELECT 1 FROM project_environments other
                     JOIN environments oe ON oe.name = other.environment_name
                     WHERE other.project_id = pe.project_id
                       AND other.environment_name != pe.environment_name
                       AND other.enabled = 1 AND oe.enabled = 1
                   )
                 ORDER BY pe.project_id",
            )
            .context("Failed to prepare projects_with_sole_active")?;
        let rows = stmt
            .query_map(params![environment], |row| row.get::<_, String>(0))
            .context("Failed to query sole-active projects")?;
        let mut projects = Vec::new();
        for row in rows {
            projects.push(row.context("Failed to read project id")?);
        }
        Ok(projects)
    }

    pub fn delete_links_for_environment(&self, environment: &str) -> Result<usize> {
        self.conn
            .execute(
                "DELETE FROM project_environments WHERE environment_name = ?1",
                params![environment],
            )
            .context("Failed to delete environment links")
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
