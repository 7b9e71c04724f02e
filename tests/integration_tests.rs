//! Integration tests for the flagenv CLI
//!
//! Each test runs the binary inside its own temporary directory, so the
//! default `.flagenv/` config and database never leak between tests.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const FLAGENV_VARS: &[&str] = &[
    "FLAGENV_HOST",
    "FLAGENV_PORT",
    "FLAGENV_DB_PATH",
    "FLAGENV_LINK_GUARD",
    "FLAGENV_MIN_ENABLED",
    "FLAGENV_LOG",
    "RUST_LOG",
];

/// Helper to create a flagenv Command with a clean environment
fn flagenv(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("flagenv");
    cmd.current_dir(dir.path());
    for var in FLAGENV_VARS {
        cmd.env_remove(var);
    }
    cmd
}

fn run(dir: &TempDir, args: &[&str]) {
    flagenv(dir).args(args).assert().success();
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_help() {
        let dir = TempDir::new().unwrap();
        flagenv(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("env"))
            .stdout(predicate::str::contains("project"));
    }

    #[test]
    fn test_version() {
        let dir = TempDir::new().unwrap();
        flagenv(&dir).arg("--version").assert().success();
    }

    #[test]
    fn test_init_creates_database() {
        let dir = TempDir::new().unwrap();
        flagenv(&dir)
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("Environment database initialized"))
            .stdout(predicate::str::contains("1 environment(s)"));

        assert!(dir.path().join(".flagenv/environments.db").exists());
    }

    #[test]
    fn test_init_idempotent() {
        let dir = TempDir::new().unwrap();
        run(&dir, &["init"]);
        flagenv(&dir)
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("1 environment(s)"));
    }

    #[test]
    fn test_db_path_flag() {
        let dir = TempDir::new().unwrap();
        flagenv(&dir)
            .args(["--db-path", "custom/envs.db", "init"])
            .assert()
            .success();
        assert!(dir.path().join("custom/envs.db").exists());
        assert!(!dir.path().join(".flagenv/environments.db").exists());
    }

    #[test]
    fn test_db_path_env_var() {
        let dir = TempDir::new().unwrap();
        flagenv(&dir)
            .env("FLAGENV_DB_PATH", "from-env.db")
            .arg("init")
            .assert()
            .success();
        assert!(dir.path().join("from-env.db").exists());
    }
}

// =============================================================================
// Environment Commands
// =============================================================================

mod environments {
    use super::*;

    #[test]
    fn test_list_shows_seeded_default() {
        let dir = TempDir::new().unwrap();
        flagenv(&dir)
            .args(["env", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("default"))
            .stdout(predicate::str::contains("production"));
    }

    #[test]
    fn test_create_is_disabled() {
        let dir = TempDir::new().unwrap();
        flagenv(&dir)
            .args(["env", "create", "staging", "--type", "development"])
            .assert()
            .success()
            .stdout(predicate::str::contains("disabled, sort order 2"));

        flagenv(&dir)
            .args(["env", "show", "staging"])
            .assert()
            .success()
            .stdout(predicate::str::contains("enabled    = false"));
    }

    #[test]
    fn test_create_duplicate_fails() {
        let dir = TempDir::new().unwrap();
        run(&dir, &["env", "create", "qa", "--type", "test"]);
        flagenv(&dir)
            .args(["env", "create", "qa", "--type", "production"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("already exists"));

        flagenv(&dir)
            .args(["env", "show", "qa"])
            .assert()
            .success()
            .stdout(predicate::str::contains("type       = test"));
    }

    #[test]
    fn test_create_invalid_name_fails() {
        let dir = TempDir::new().unwrap();
        flagenv(&dir)
            .args(["env", "create", "bad name", "--type", "test"])
            .assert()
            .failure();
    }

    #[test]
    fn test_show_missing_fails() {
        let dir = TempDir::new().unwrap();
        flagenv(&dir)
            .args(["env", "show", "ghost"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("ghost"));
    }

    #[test]
    fn test_enable_and_disable() {
        let dir = TempDir::new().unwrap();
        run(&dir, &["env", "create", "staging", "--type", "development"]);
        flagenv(&dir)
            .args(["env", "enable", "staging"])
            .assert()
            .success()
            .stdout(predicate::str::contains("enabled"));
        flagenv(&dir)
            .args(["env", "show", "staging"])
            .assert()
            .success()
            .stdout(predicate::str::contains("enabled    = true"));
        run(&dir, &["env", "disable", "staging"]);
        flagenv(&dir)
            .args(["env", "show", "staging"])
            .assert()
            .success()
            .stdout(predicate::str::contains("enabled    = false"));
    }

    #[test]
    fn test_update_type_and_sort_order() {
        let dir = TempDir::new().unwrap();
        run(&dir, &["env", "create", "qa", "--type", "test"]);
        run(
            &dir,
            &["env", "update", "qa", "--type", "preview", "--sort-order", "9"],
        );
        flagenv(&dir)
            .args(["env", "show", "qa"])
            .assert()
            .success()
            .stdout(predicate::str::contains("type       = preview"))
            .stdout(predicate::str::contains("sort_order = 9"));
    }

    #[test]
    fn test_validate_name() {
        let dir = TempDir::new().unwrap();
        flagenv(&dir)
            .args(["env", "validate", "fresh"])
            .assert()
            .success()
            .stdout(predicate::str::contains("available"));
        flagenv(&dir)
            .args(["env", "validate", "default"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("already taken"));
        flagenv(&dir)
            .args(["env", "validate", "sort-order"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("reserved"));
        flagenv(&dir)
            .args(["env", "create", "validate", "--type", "development"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("reserved"));
    }

    #[test]
    fn test_sort_reorders_list() {
        let dir = TempDir::new().unwrap();
        run(&dir, &["env", "create", "alpha", "--type", "development"]);
        run(&dir, &["env", "create", "beta", "--type", "development"]);
        flagenv(&dir)
            .args(["env", "sort", "beta=-1", "alpha=0"])
            .assert()
            .success()
            .stdout(predicate::str::is_match("(?s)beta.*alpha.*default").unwrap());
    }

    #[test]
    fn test_sort_with_unknown_name_changes_nothing() {
        let dir = TempDir::new().unwrap();
        run(&dir, &["env", "create", "alpha", "--type", "development"]);
        flagenv(&dir)
            .args(["env", "sort", "alpha=50", "ghost=1"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("ghost"));
        flagenv(&dir)
            .args(["env", "show", "alpha"])
            .assert()
            .success()
            .stdout(predicate::str::contains("sort_order = 2"));
    }

    #[test]
    fn test_default_environment_is_protected() {
        let dir = TempDir::new().unwrap();
        flagenv(&dir)
            .args(["env", "delete", "default"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("protected"));
    }

    #[test]
    fn test_delete_unused_environment() {
        let dir = TempDir::new().unwrap();
        run(&dir, &["env", "create", "scratch", "--type", "development"]);
        run(&dir, &["env", "delete", "scratch"]);
        flagenv(&dir)
            .args(["env", "show", "scratch"])
            .assert()
            .failure();
    }
}

// =============================================================================
// Project Commands
// =============================================================================

mod projects {
    use super::*;

    #[test]
    fn test_staging_scenario() {
        let dir = TempDir::new().unwrap();
        run(&dir, &["env", "create", "staging", "--type", "development"]);
        run(&dir, &["project", "create", "p1"]);

        // Globally disabled environments cannot be linked
        flagenv(&dir)
            .args(["project", "link", "p1", "staging"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("globally disabled"));

        run(&dir, &["env", "enable", "staging"]);
        flagenv(&dir)
            .args(["project", "link", "p1", "staging"])
            .assert()
            .success()
            .stdout(predicate::str::contains("active"));
        flagenv(&dir)
            .args(["project", "envs", "p1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("staging"));

        run(&dir, &["env", "disable", "staging"]);
        flagenv(&dir)
            .args(["project", "envs", "p1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No active environments"));

        // The link survives and comes back when re-enabled
        flagenv(&dir)
            .args(["project", "links", "p1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("inactive"));
        run(&dir, &["env", "enable", "staging"]);
        flagenv(&dir)
            .args(["project", "envs", "p1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("staging"));
    }

    #[test]
    fn test_deleting_linked_environment_conflicts() {
        let dir = TempDir::new().unwrap();
        run(&dir, &["env", "create", "staging", "--type", "development"]);
        run(&dir, &["env", "enable", "staging"]);
        run(&dir, &["project", "create", "p1", "--name", "Project One"]);
        run(&dir, &["project", "link", "p1", "staging"]);

        flagenv(&dir)
            .args(["env", "delete", "staging"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("in use"));
        run(&dir, &["env", "show", "staging"]);
    }

    #[test]
    fn test_unlink_last_active_environment_conflicts() {
        let dir = TempDir::new().unwrap();
        run(&dir, &["project", "create", "p1"]);
        run(&dir, &["project", "link", "p1", "default"]);
        flagenv(&dir)
            .args(["project", "unlink", "p1", "default"])
            .assert()
            .failure();
    }

    #[test]
    fn test_disable_last_active_environment_conflicts() {
        let dir = TempDir::new().unwrap();
        run(&dir, &["env", "create", "staging", "--type", "development"]);
        run(&dir, &["env", "enable", "staging"]);
        run(&dir, &["project", "create", "p1"]);
        run(&dir, &["project", "link", "p1", "default"]);
        run(&dir, &["project", "link", "p1", "staging"]);

        flagenv(&dir)
            .args(["project", "disable", "p1", "staging"])
            .assert()
            .success()
            .stdout(predicate::str::contains("disabled for project"));
        flagenv(&dir)
            .args(["project", "disable", "p1", "default"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("only active environment"));
        flagenv(&dir)
            .args(["project", "envs", "p1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("default"));
    }

    #[test]
    fn test_sole_active_guard_from_env_var() {
        let dir = TempDir::new().unwrap();
        for name in ["dev", "prod"] {
            run(&dir, &["env", "create", name, "--type", "development"]);
            run(&dir, &["env", "enable", name]);
        }
        run(&dir, &["project", "create", "p1"]);
        run(&dir, &["project", "create", "p2"]);
        run(&dir, &["project", "link", "p1", "dev"]);
        run(&dir, &["project", "link", "p2", "dev"]);
        run(&dir, &["project", "link", "p2", "prod"]);

        flagenv(&dir)
            .env("FLAGENV_LINK_GUARD", "sole-active")
            .args(["env", "delete", "dev"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("only active environment of project(s) p1"));

        run(&dir, &["project", "link", "p1", "prod"]);
        flagenv(&dir)
            .env("FLAGENV_LINK_GUARD", "sole-active")
            .args(["env", "delete", "dev"])
            .assert()
            .success();
        for project in ["p1", "p2"] {
            flagenv(&dir)
                .args(["project", "links", project])
                .assert()
                .success()
                .stdout(predicate::str::contains("prod"))
                .stdout(predicate::str::contains("dev").not());
        }
    }

    #[test]
    fn test_project_list_and_duplicate() {
        let dir = TempDir::new().unwrap();
        run(&dir, &["project", "create", "web", "--name", "Web App"]);
        flagenv(&dir)
            .args(["project", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Web App"));
        flagenv(&dir)
            .args(["project", "create", "web"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("already exists"));
    }

    #[test]
    fn test_unknown_project_fails() {
        let dir = TempDir::new().unwrap();
        flagenv(&dir)
            .args(["project", "envs", "nope"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("nope"));
    }
}

// =============================================================================
// Configuration
// =============================================================================

mod configuration {
    use super::*;

    #[test]
    fn test_config_show_defaults() {
        let dir = TempDir::new().unwrap();
        flagenv(&dir)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("using defaults"))
            .stdout(predicate::str::contains("port = 4242"))
            .stdout(predicate::str::contains("link_guard = \"any_link\""));
    }

    #[test]
    fn test_config_init_creates_toml() {
        let dir = TempDir::new().unwrap();
        flagenv(&dir)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Created flagenv.toml"));
        assert!(dir.path().join(".flagenv/flagenv.toml").exists());
    }

    #[test]
    fn test_env_var_overrides_file_and_flag_overrides_env() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".flagenv")).unwrap();
        fs::write(
            dir.path().join(".flagenv/flagenv.toml"),
            "[database]\npath = \"file.db\"\n[server]\nport = 5000\n",
        )
        .unwrap();

        flagenv(&dir)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("port = 5000"))
            .stdout(predicate::str::contains("path = \"file.db\""));

        flagenv(&dir)
            .env("FLAGENV_DB_PATH", "env.db")
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("path = \"env.db\""));

        flagenv(&dir)
            .env("FLAGENV_DB_PATH", "env.db")
            .args(["--db-path", "flag.db", "config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("path = \"flag.db\""));
    }

    #[test]
    fn test_explicit_missing_config_fails() {
        let dir = TempDir::new().unwrap();
        flagenv(&dir)
            .args(["--config", "nope.toml", "env", "list"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("nope.toml"));
    }

    #[test]
    fn test_link_guard_none_allows_deleting_linked_environment() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("flagenv.toml"),
            "[policy]\nlink_guard = \"none\"\n",
        )
        .unwrap();
        let with_config = |args: &[&str]| {
            let mut full = vec!["--config", "flagenv.toml"];
            full.extend_from_slice(args);
            flagenv(&dir).args(full).assert().success();
        };

        with_config(&["env", "create", "staging", "--type", "development"]);
        with_config(&["env", "enable", "staging"]);
        with_config(&["project", "create", "p1"]);
        with_config(&["project", "link", "p1", "staging"]);
        with_config(&["env", "delete", "staging"]);

        flagenv(&dir)
            .args(["--config", "flagenv.toml", "project", "links", "p1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("no environment links"));
    }

    #[test]
    fn test_seeding_disabled_by_config() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("flagenv.toml"),
            "[policy]\nseed_default_environment = false\n",
        )
        .unwrap();
        flagenv(&dir)
            .args(["--config", "flagenv.toml", "env", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No environments registered"));
    }
}
