//! Status command implementation

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tern_core::checksum::{has_drifted, short_checksum};
use tern_core::{
    CatalogueProvider, LedgerEntry, LedgerStore, MigrationInfo, MigrationState, Migrator, NodeId,
    NodeSelection,
};

use crate::cli::{GlobalArgs, OutputFormat, StatusArgs};
use crate::commands::common::{parse_ids, print_json, Project};

/// One catalogued migration as seen by `tern status`
#[derive(Debug, Serialize)]
struct StatusRow {
    node: String,
    migration: String,
    state: MigrationState,
    #[serde(skip_serializing_if = "Option::is_none")]
    applied_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    checksum: Option<String>,
    /// Script changed since it was recorded
    drifted: bool,
}

/// A ledger entry with no migration left in the catalogue
#[derive(Debug, Serialize)]
struct OrphanRow {
    node: String,
    migration: String,
    applied_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct StatusReport {
    runner_identifier: String,
    applied: usize,
    pending: usize,
    drifted: usize,
    migrations: Vec<StatusRow>,
    orphaned: Vec<OrphanRow>,
}

/// Execute the status command
pub(crate) fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let project = Project::load(global)?;
    let map = project.catalogue().migration_map()?;
    let runner = project.runner_identifier(&map, args.identifier.as_deref())?;

    let ledger = project.open_ledger()?;
    let mut migrator = Migrator::new(&ledger).with_identifier(runner);
    if !args.node.is_empty() {
        migrator = migrator.with_filter(NodeSelection::new(parse_ids(
            &args.node,
            "node",
            NodeId::try_new,
        )?));
    }
    let (runner, snapshot) = migrator.status(&map)?;

    let entries = ledger.ledger_entries(&runner)?;
    let by_id: HashMap<&str, &LedgerEntry> = entries
        .iter()
        .map(|entry| (entry.migration_id.as_str(), entry))
        .collect();

    let migrations: Vec<StatusRow> = snapshot
        .iter()
        .map(|(node, info)| status_row(node, info, by_id.get(info.id().as_str()).copied()))
        .collect();

    let catalogued: HashSet<&str> = map
        .nodes()
        .iter()
        .flat_map(|node| node.migrations().map(|m| m.id().as_str()))
        .collect();
    let orphaned: Vec<OrphanRow> = entries
        .iter()
        .filter(|entry| !catalogued.contains(entry.migration_id.as_str()))
        .map(|entry| OrphanRow {
            node: entry.migration_node_id.to_string(),
            migration: entry.migration_id.to_string(),
            applied_at: entry.last_run_date,
        })
        .collect();

    let report = StatusReport {
        runner_identifier: runner.to_string(),
        applied: snapshot.applied_count(),
        pending: snapshot.pending_count(),
        drifted: migrations.iter().filter(|row| row.drifted).count(),
        migrations,
        orphaned,
    };

    match args.output {
        OutputFormat::Text => print_status(&report),
        OutputFormat::Json => print_json(&report)?,
    }
    Ok(())
}

fn status_row(node: &NodeId, info: &MigrationInfo<'_>, entry: Option<&LedgerEntry>) -> StatusRow {
    let mut row = StatusRow {
        node: node.to_string(),
        migration: info.id().to_string(),
        state: info.state(),
        applied_at: None,
        checksum: None,
        drifted: false,
    };
    let Some(entry) = entry.filter(|_| info.state() == MigrationState::Applied) else {
        return row;
    };

    row.applied_at = Some(entry.last_run_date);
    row.checksum = Some(short_checksum(&entry.last_run_script));
    match info.migration().upgrade_sql() {
        Ok(current) => row.drifted = has_drifted(&entry.last_run_script, &current),
        Err(e) => log::warn!("Cannot check {node}/{} for drift: {e}", info.id()),
    }
    row
}

fn print_status(report: &StatusReport) {
    println!("Runner '{}'\n", report.runner_identifier);

    if report.migrations.is_empty() {
        println!("No migrations found.");
    }

    let width = report
        .migrations
        .iter()
        .map(|row| row.node.len() + row.migration.len() + 1)
        .max()
        .unwrap_or(0);
    for row in &report.migrations {
        let label = format!("{}/{}", row.node, row.migration);
        let applied = row
            .applied_at
            .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        let drift = if row.drifted {
            "  (modified since applied)"
        } else {
            ""
        };
        let state = row.state.to_string();
        println!("  {label:<width$}  {state:<8} {applied}{drift}");
    }

    for orphan in &report.orphaned {
        println!(
            "  {}/{}  applied, missing from catalogue",
            orphan.node, orphan.migration
        );
    }

    println!(
        "\nApplied: {}  Pending: {}  Modified: {}",
        report.applied, report.pending, report.drifted
    );
}
