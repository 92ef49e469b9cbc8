//! Init command implementation - scaffolds a new Tern project

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tern_core::catalogue::CATALOGUE_FILE;

use crate::cli::InitArgs;

/// Execute the init command
pub(crate) fn execute(args: &InitArgs) -> Result<()> {
    // Reject names that could cause path traversal or confusing directory names
    if args.name.contains('/')
        || args.name.contains('\\')
        || args.name.contains("..")
        || args.name.starts_with('.')
        || args.name.starts_with('-')
    {
        anyhow::bail!(
            "Invalid project name '{}': must not contain '/', '\\', '..', or start with '.' or '-'",
            args.name
        );
    }

    let project_dir = Path::new(&args.name);

    if project_dir.exists() {
        anyhow::bail!(
            "Directory '{}' already exists. Choose a different project name.",
            args.name
        );
    }

    println!("Creating new Tern project: {}\n", args.name);

    for dir in ["", "migrations", "migrations/core"] {
        let path = project_dir.join(dir);
        fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    }

    // Escape YAML special characters in interpolated values
    let safe_name = args.name.replace('"', "\\\"");
    let safe_db_path = args.database_path.replace('"', "\\\"");
    let config_content = format!(
        r#"name: "{name}"
runner_identifier: "{name}"

migrations_path: migrations
ledger_schema: tern

database:
  type: duckdb
  path: "{db_path}"

vars:
  schema: main

policy:
  on_error: stop
  commit: on_success

# targets:
#   prod:
#     database:
#       type: duckdb
#       path: "prod.duckdb"
"#,
        name = safe_name,
        db_path = safe_db_path,
    );
    fs::write(project_dir.join("tern.yml"), config_content).context("Failed to write tern.yml")?;

    let catalogue =
        "# Nodes run in this order. Every node directory must be listed.\nnodes:\n  - core\n";
    fs::write(
        project_dir.join("migrations").join(CATALOGUE_FILE),
        catalogue,
    )
    .context("Failed to write migrations/catalogue.yml")?;

    let example_sql = r#"-- Example migration: scripts in a node run in file-name order
CREATE TABLE IF NOT EXISTS {{ var('schema') }}.example (
    id INTEGER PRIMARY KEY,
    name VARCHAR NOT NULL,
    created_at TIMESTAMP DEFAULT current_timestamp
);
"#;
    fs::write(
        project_dir.join("migrations/core/0001_create_example.sql"),
        example_sql,
    )
    .context("Failed to write example migration")?;

    println!("  Created tern.yml");
    println!("  Created migrations/{CATALOGUE_FILE}");
    println!("  Created migrations/core/0001_create_example.sql");
    println!("\nNext steps:");
    println!("  cd {}", args.name);
    println!("  tern status");
    println!("  tern migrate");

    Ok(())
}
