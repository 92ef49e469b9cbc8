//! History command implementation

use anyhow::Result;
use tern_core::checksum::short_checksum;
use tern_core::{CatalogueProvider, LedgerStore};

use crate::cli::{GlobalArgs, HistoryArgs, OutputFormat};
use crate::commands::common::{print_json, Project};

/// Execute the history command
pub(crate) fn execute(args: &HistoryArgs, global: &GlobalArgs) -> Result<()> {
    let project = Project::load(global)?;
    let map = project.catalogue().migration_map()?;
    let runner = project.runner_identifier(&map, args.identifier.as_deref())?;

    let ledger = project.open_ledger()?;
    ledger.upgrade_schema()?;
    let entries = ledger.ledger_entries(&runner)?;

    if args.output == OutputFormat::Json {
        return print_json(&entries);
    }

    if entries.is_empty() {
        println!("No migrations recorded for runner '{runner}'.");
        return Ok(());
    }

    println!("Runner '{runner}': {} recorded\n", entries.len());
    for entry in &entries {
        println!(
            "  {}  {}/{}  {}",
            entry.last_run_date.format("%Y-%m-%d %H:%M:%S"),
            entry.migration_node_id,
            entry.migration_id,
            short_checksum(&entry.last_run_script)
        );
        if args.show_script {
            for line in entry.last_run_script.lines() {
                println!("      {line}");
            }
        }
    }
    Ok(())
}
