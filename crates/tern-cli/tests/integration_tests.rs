//! End-to-end tests for the `tern` binary

use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn tern_bin() -> String {
    env!("CARGO_BIN_EXE_tern").to_string()
}

/// Run tern in `dir` and return (stdout, stderr, exit code)
fn run_tern(dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(tern_bin())
        .args(args)
        .current_dir(dir)
        .env_remove("TERN_TARGET")
        .output()
        .expect("Failed to run tern binary");
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

fn run_json(dir: &Path, args: &[&str]) -> (Value, i32) {
    let (stdout, stderr, code) = run_tern(dir, args);
    let json = serde_json::from_str(&stdout)
        .unwrap_or_else(|e| panic!("invalid JSON ({e}): {stdout}\nstderr: {stderr}"));
    (json, code)
}

const CONFIG: &str = r#"name: shop
runner_identifier: shop
database:
  type: duckdb
  path: ledger.duckdb
vars:
  schema: main
"#;

/// A project with one `core` node holding `scripts` (file name, SQL).
fn project(scripts: &[(&str, &str)]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("tern.yml"), CONFIG).unwrap();
    let core = tmp.path().join("migrations/core");
    fs::create_dir_all(&core).unwrap();
    for (name, sql) in scripts {
        fs::write(core.join(name), sql).unwrap();
    }
    tmp
}

fn shop() -> TempDir {
    project(&[
        (
            "0001_users.sql",
            "CREATE TABLE {{ var('schema') }}.users (id INTEGER PRIMARY KEY, email VARCHAR);",
        ),
        (
            "0002_orders.sql",
            "CREATE TABLE orders (id INTEGER, user_id INTEGER);",
        ),
        (
            "0003_seed.sql",
            "INSERT INTO users VALUES (1, 'a@example.com');",
        ),
    ])
}

fn states(status: &Value) -> Vec<(String, String)> {
    status["migrations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| {
            (
                row["migration"].as_str().unwrap().to_string(),
                row["state"].as_str().unwrap().to_string(),
            )
        })
        .collect()
}

#[test]
fn test_init_scaffolds_project() {
    let tmp = TempDir::new().unwrap();
    let (stdout, _, code) = run_tern(tmp.path(), &["init", "shop"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Creating new Tern project: shop"));

    let root = tmp.path().join("shop");
    assert!(root.join("tern.yml").is_file());
    assert!(root.join("migrations/catalogue.yml").is_file());
    assert!(root.join("migrations/core/0001_create_example.sql").is_file());

    let (_, stderr, code) = run_tern(tmp.path(), &["init", "shop"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("already exists"));
}

#[test]
fn test_init_rejects_path_names() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, code) = run_tern(tmp.path(), &["init", "../escape"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("Invalid project name"));
}

#[test]
fn test_scaffolded_project_migrates() {
    let tmp = TempDir::new().unwrap();
    run_tern(tmp.path(), &["init", "shop"]);
    let root = tmp.path().join("shop");

    let (report, code) = run_json(&root, &["migrate", "-o", "json"]);
    assert_eq!(code, 0);
    assert_eq!(report["executed_count"], 1);
    assert_eq!(report["committed"], true);
}

#[test]
fn test_migrate_then_noop() {
    let tmp = shop();

    let (report, code) = run_json(tmp.path(), &["migrate", "-o", "json"]);
    assert_eq!(code, 0);
    assert_eq!(report["runner_identifier"], "shop");
    assert_eq!(report["executed_count"], 3);
    assert_eq!(report["recorded_count"], 3);
    assert_eq!(report["has_errors"], false);
    assert_eq!(report["committed"], true);

    let (again, code) = run_json(tmp.path(), &["migrate", "-o", "json"]);
    assert_eq!(code, 0);
    assert_eq!(again["executed_count"], 0);
    assert_eq!(again["committed"], false);
    assert!(again["outcomes"].as_array().unwrap().is_empty());
}

#[test]
fn test_migrate_text_output() {
    let tmp = shop();
    let (stdout, _, code) = run_tern(tmp.path(), &["migrate"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("core/0001_users"));
    assert!(stdout.contains("executed"));
    assert!(stdout.contains("committed"));

    let (stdout, _, code) = run_tern(tmp.path(), &["migrate"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Nothing to migrate."));
}

#[test]
fn test_failure_rolls_back_and_exits_nonzero() {
    let tmp = project(&[
        ("0001_users.sql", "CREATE TABLE users (id INTEGER);"),
        ("0002_bad.sql", "INSERT INTO missing_table VALUES (1);"),
    ]);

    let (report, code) = run_json(tmp.path(), &["migrate", "-o", "json"]);
    assert_eq!(code, 1);
    assert_eq!(report["has_errors"], true);
    assert_eq!(report["committed"], false);
    let outcomes = report["outcomes"].as_array().unwrap();
    assert_eq!(outcomes[1]["status"], "failed");
    assert!(outcomes[1]["error"].is_string());

    let (status, _) = run_json(tmp.path(), &["status", "-o", "json"]);
    assert_eq!(status["applied"], 0);
    assert_eq!(status["pending"], 2);
}

#[test]
fn test_dry_run_leaves_ledger_untouched() {
    let tmp = shop();
    let (report, code) = run_json(tmp.path(), &["migrate", "--dry-run", "-o", "json"]);
    assert_eq!(code, 0);
    assert_eq!(report["executed_count"], 3);
    assert_eq!(report["committed"], false);

    let (status, _) = run_json(tmp.path(), &["status", "-o", "json"]);
    assert_eq!(status["pending"], 3);
}

#[test]
fn test_until_stops_after_target() {
    let tmp = shop();
    let (report, code) = run_json(
        tmp.path(),
        &["migrate", "--until", "0002_orders", "-o", "json"],
    );
    assert_eq!(code, 0);
    assert_eq!(report["executed_count"], 2);
    let outcomes = report["outcomes"].as_array().unwrap();
    assert_eq!(outcomes[2]["status"], "stopped");

    let (status, _) = run_json(tmp.path(), &["status", "-o", "json"]);
    assert_eq!(
        states(&status),
        vec![
            ("0001_users".to_string(), "applied".to_string()),
            ("0002_orders".to_string(), "applied".to_string()),
            ("0003_seed".to_string(), "pending".to_string()),
        ]
    );
}

#[test]
fn test_skip_leaves_migration_pending() {
    let tmp = shop();
    let (report, code) = run_json(
        tmp.path(),
        &["migrate", "--skip", "0002_orders", "-o", "json"],
    );
    assert_eq!(code, 0);
    assert_eq!(report["executed_count"], 2);
    assert_eq!(report["outcomes"][1]["status"], "jumped");

    let (status, _) = run_json(tmp.path(), &["status", "-o", "json"]);
    assert_eq!(status["pending"], 1);
}

#[test]
fn test_baseline_records_without_running() {
    // The seed would fail if it ran: users does not exist yet.
    let tmp = project(&[("0001_seed.sql", "INSERT INTO users VALUES (1);")]);
    let (report, code) = run_json(tmp.path(), &["migrate", "--baseline", "-o", "json"]);
    assert_eq!(code, 0);
    assert_eq!(report["executed_count"], 0);
    assert_eq!(report["recorded_count"], 1);
    assert_eq!(report["outcomes"][0]["status"], "marked");

    let (status, _) = run_json(tmp.path(), &["status", "-o", "json"]);
    assert_eq!(status["applied"], 1);
}

#[test]
fn test_continue_still_rolls_back_on_error() {
    let tmp = project(&[
        ("0001_bad.sql", "INSERT INTO missing_table VALUES (1);"),
        ("0002_users.sql", "CREATE TABLE users (id INTEGER);"),
    ]);
    let (report, code) = run_json(
        tmp.path(),
        &["migrate", "--on-error", "continue", "-o", "json"],
    );
    assert_eq!(code, 1);
    assert_eq!(report["committed"], false);
    assert_eq!(report["outcomes"].as_array().unwrap().len(), 2);

    let (status, _) = run_json(tmp.path(), &["status", "-o", "json"]);
    assert_eq!(status["pending"], 2);
}

#[test]
fn test_mark_anyway_commits_past_unknown_table() {
    let tmp = project(&[
        ("0001_bad.sql", "INSERT INTO missing_table VALUES (1);"),
        ("0002_users.sql", "CREATE TABLE users (id INTEGER);"),
    ]);
    let (report, code) = run_json(
        tmp.path(),
        &[
            "migrate",
            "--on-error",
            "mark_anyway_and_continue",
            "--commit",
            "always",
            "-o",
            "json",
        ],
    );
    assert_eq!(code, 1);
    assert_eq!(report["committed"], true);
    assert_eq!(report["outcomes"][0]["status"], "failed_marked");
    assert_eq!(report["outcomes"][1]["status"], "executed");

    let (status, _) = run_json(tmp.path(), &["status", "-o", "json"]);
    assert_eq!(status["applied"], 2);
    assert_eq!(status["pending"], 0);
}

#[test]
fn test_unknown_error_policy_is_rejected() {
    let tmp = shop();
    let (_, stderr, code) = run_tern(tmp.path(), &["migrate", "--on-error", "retry"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("[T003]"));
}

#[test]
fn test_identifier_flag_scopes_ledger() {
    let tmp = shop();
    run_tern(tmp.path(), &["migrate"]);

    let (status, _) = run_json(
        tmp.path(),
        &["status", "--identifier", "other", "-o", "json"],
    );
    assert_eq!(status["runner_identifier"], "other");
    assert_eq!(status["applied"], 0);
    assert_eq!(status["pending"], 3);
}

#[test]
fn test_missing_identifier_is_error() {
    let tmp = shop();
    fs::write(
        tmp.path().join("tern.yml"),
        "name: shop\ndatabase:\n  path: ledger.duckdb\n",
    )
    .unwrap();
    for command in ["migrate", "status", "history"] {
        let (_, stderr, code) = run_tern(tmp.path(), &[command]);
        assert_ne!(code, 0, "{command}");
        assert!(stderr.contains("[T001]"), "{command}: {stderr}");
        assert!(!tmp.path().join("ledger.duckdb").exists(), "{command}");
    }
}

#[test]
fn test_migration_id_reused_across_nodes_is_error() {
    let tmp = shop();
    let reporting = tmp.path().join("migrations/reporting");
    fs::create_dir_all(&reporting).unwrap();
    fs::write(reporting.join("0001_users.sql"), "SELECT 1;").unwrap();

    let (_, stderr, code) = run_tern(tmp.path(), &["migrate"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("[C006]"), "{stderr}");
    assert!(!tmp.path().join("ledger.duckdb").exists());
}

#[test]
fn test_status_reports_drift() {
    let tmp = shop();
    run_tern(tmp.path(), &["migrate"]);

    fs::write(
        tmp.path().join("migrations/core/0002_orders.sql"),
        "CREATE TABLE orders (id INTEGER, user_id INTEGER, total DECIMAL);",
    )
    .unwrap();

    let (status, code) = run_json(tmp.path(), &["status", "-o", "json"]);
    assert_eq!(code, 0);
    assert_eq!(status["drifted"], 1);
    assert_eq!(status["migrations"][1]["drifted"], true);
    assert_eq!(status["migrations"][0]["drifted"], false);

    let (stdout, _, _) = run_tern(tmp.path(), &["status"]);
    assert!(stdout.contains("modified since applied"));
}

#[test]
fn test_status_lists_orphaned_entries() {
    let tmp = shop();
    run_tern(tmp.path(), &["migrate"]);
    fs::remove_file(tmp.path().join("migrations/core/0003_seed.sql")).unwrap();

    let (status, _) = run_json(tmp.path(), &["status", "-o", "json"]);
    let orphaned = status["orphaned"].as_array().unwrap();
    assert_eq!(orphaned.len(), 1);
    assert_eq!(orphaned[0]["migration"], "0003_seed");
}

#[test]
fn test_history_lists_recorded_scripts() {
    let tmp = shop();
    run_tern(tmp.path(), &["migrate"]);

    let (stdout, _, code) = run_tern(tmp.path(), &["history", "--show-script"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("3 recorded"));
    assert!(stdout.contains("core/0001_users"));
    // Recorded script is the rendered one.
    assert!(stdout.contains("CREATE TABLE main.users"));
}

#[test]
fn test_node_filter() {
    let tmp = shop();
    let billing = tmp.path().join("migrations/billing");
    fs::create_dir_all(&billing).unwrap();
    fs::write(
        billing.join("0001_invoices.sql"),
        "CREATE TABLE invoices (id INTEGER);",
    )
    .unwrap();

    let (report, code) = run_json(tmp.path(), &["migrate", "--node", "billing", "-o", "json"]);
    assert_eq!(code, 0);
    assert_eq!(report["executed_count"], 1);
    assert_eq!(report["outcomes"][0]["node"], "billing");
}

#[test]
fn test_target_overrides_database() {
    let tmp = shop();
    let config = format!(
        "{CONFIG}targets:\n  staging:\n    database:\n      path: staging.duckdb\n    runner_identifier: staging\n"
    );
    fs::write(tmp.path().join("tern.yml"), config).unwrap();

    let (report, code) = run_json(tmp.path(), &["migrate", "-t", "staging", "-o", "json"]);
    assert_eq!(code, 0);
    assert_eq!(report["runner_identifier"], "staging");
    assert!(tmp.path().join("staging.duckdb").exists());
    assert!(!tmp.path().join("ledger.duckdb").exists());

    let (_, stderr, code) = run_tern(tmp.path(), &["migrate", "-t", "nope"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("Target 'nope' not found"));
}
