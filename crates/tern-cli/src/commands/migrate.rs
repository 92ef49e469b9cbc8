//! Migrate command implementation

use anyhow::{Context, Result};
use tern_core::{
    CatalogueProvider, CommitPolicy, ErrorDecision, ExcludeMigrations, LogObserver, MigrationId,
    MigrationReport, Migrator, NodeId, NodeSelection, OutcomeStatus, PreExecutionDecision,
    SkipListed, StopAfter,
};

use crate::cli::{GlobalArgs, MigrateArgs, OutputFormat};
use crate::commands::common::{parse_ids, print_json, ExitCode, Project};
use crate::observer::ProgressObserver;

/// Execute the migrate command
pub(crate) fn execute(args: &MigrateArgs, global: &GlobalArgs) -> Result<()> {
    let project = Project::load(global)?;
    let map = project.catalogue().migration_map()?;
    let runner = project.runner_identifier(&map, args.identifier.as_deref())?;

    let on_error = match &args.on_error {
        Some(name) => name.parse::<ErrorDecision>()?,
        None => project.config.policy.on_error,
    };
    let commit = if args.dry_run {
        CommitPolicy::Never
    } else {
        match &args.commit {
            Some(name) => name.parse::<CommitPolicy>()?,
            None => project.config.policy.commit,
        }
    };
    log::debug!("Error policy: {on_error}, commit policy: {commit}");

    let ledger = project.open_ledger()?;
    let mut migrator = Migrator::new(&ledger)
        .with_identifier(runner)
        .with_error_policy(on_error)
        .with_completion_policy(commit);

    if !args.node.is_empty() {
        migrator = migrator.with_filter(NodeSelection::new(parse_ids(
            &args.node,
            "node",
            NodeId::try_new,
        )?));
    }
    if !args.exclude.is_empty() {
        migrator = migrator.with_filter(ExcludeMigrations::new(parse_ids(
            &args.exclude,
            "exclude",
            MigrationId::try_new,
        )?));
    }

    let skip = parse_ids(&args.skip, "skip", MigrationId::try_new)?;
    let until = args
        .until
        .as_deref()
        .map(|raw| MigrationId::try_new(raw.trim()).context("--until cannot be blank"))
        .transpose()?;
    migrator = match (args.baseline, until, skip.is_empty()) {
        (true, _, _) => migrator.with_pre_execution(PreExecutionDecision::JumpAndMark),
        (false, Some(target), true) => migrator.with_pre_execution(StopAfter::new(target)),
        (false, Some(target), false) => {
            migrator.with_pre_execution(SkipListed::new(skip, StopAfter::new(target)))
        }
        (false, None, false) => {
            migrator.with_pre_execution(SkipListed::new(skip, PreExecutionDecision::Run))
        }
        (false, None, true) => migrator,
    };

    migrator = match args.output {
        OutputFormat::Text => migrator.with_observer(ProgressObserver::new()),
        OutputFormat::Json => migrator.with_observer(LogObserver),
    };

    let report = migrator.migrate_map(&map)?;

    match args.output {
        OutputFormat::Text => print_report(&report, args.dry_run),
        OutputFormat::Json => print_json(&report)?,
    }

    if report.has_errors {
        return Err(ExitCode(1).into());
    }
    Ok(())
}

fn print_report(report: &MigrationReport, dry_run: bool) {
    println!(
        "Runner '{}' (run {})",
        report.runner_identifier, report.run_id
    );

    if report.outcomes.is_empty() {
        println!("\nNothing to migrate.");
        return;
    }

    println!();
    let width = report
        .outcomes
        .iter()
        .map(|o| o.node.len() + o.migration.len() + 1)
        .max()
        .unwrap_or(0);
    for outcome in &report.outcomes {
        let symbol = match outcome.status {
            OutcomeStatus::Executed | OutcomeStatus::Marked => "\u{2713}",
            OutcomeStatus::Failed | OutcomeStatus::FailedMarked => "\u{2717}",
            OutcomeStatus::Jumped | OutcomeStatus::Stopped => "-",
        };
        let label = format!("{}/{}", outcome.node, outcome.migration);
        match &outcome.error {
            Some(error) => println!("  {symbol} {label:<width$}  {}: {error}", outcome.status),
            None => println!("  {symbol} {label:<width$}  {}", outcome.status),
        }
    }

    let failed = report.with_status(OutcomeStatus::Failed).count()
        + report.with_status(OutcomeStatus::FailedMarked).count();
    let verdict = match (report.committed, dry_run) {
        (true, _) => "committed",
        (false, true) => "rolled back (dry run)",
        (false, false) if report.is_noop() => "nothing to commit",
        (false, false) => "rolled back",
    };
    println!(
        "\nExecuted: {}  Recorded: {}  Failed: {}  ({verdict}, {}ms)",
        report.executed_count,
        report.recorded_count,
        failed,
        (report.finished_at - report.started_at).num_milliseconds()
    );
}
