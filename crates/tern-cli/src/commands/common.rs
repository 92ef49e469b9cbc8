//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tern_core::{Config, CoreError, DirectoryCatalogue, MigrationMap, RunnerIdentifier};
use tern_db::DuckDbLedger;
use tern_jinja::JinjaEnvironment;

use crate::cli::GlobalArgs;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that the open transaction and database connection are dropped properly.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only; nothing should reach stderr.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// A loaded project: its root directory, tern.yml, and the active target.
pub(crate) struct Project {
    pub(crate) root: PathBuf,
    pub(crate) config: Config,
    pub(crate) target: Option<String>,
}

impl Project {
    /// Load tern.yml from `--config` or the project directory and resolve the target.
    pub(crate) fn load(global: &GlobalArgs) -> Result<Self> {
        let root = PathBuf::from(&global.project_dir);
        let config = match &global.config {
            Some(path) => Config::load(Path::new(path)),
            None => Config::load_from_dir(&root),
        }
        .with_context(|| format!("Failed to load project at {}", root.display()))?;

        let target = Config::resolve_target(global.target.as_deref());
        if let Some(name) = &target {
            // Fail on an unknown target before anything is opened.
            config.get_database_config(Some(name))?;
            log::debug!("Using target '{name}'");
        }

        Ok(Self {
            root,
            config,
            target,
        })
    }

    /// Open the ledger database for the active target.
    pub(crate) fn open_ledger(&self) -> Result<DuckDbLedger> {
        let db = self.config.get_database_config(self.target.as_deref())?;
        let path = if db.path == ":memory:" || Path::new(&db.path).is_absolute() {
            db.path.clone()
        } else {
            self.root.join(&db.path).display().to_string()
        };
        log::debug!("Opening {} database at {path}", db.db_type);
        DuckDbLedger::new(&path, &self.config.ledger_schema)
            .with_context(|| format!("Failed to open database: {path}"))
    }

    /// The migrations directory as a catalogue, rendering scripts through
    /// Jinja unless templating is switched off.
    pub(crate) fn catalogue(&self) -> DirectoryCatalogue {
        let catalogue = DirectoryCatalogue::new(self.config.migrations_path_absolute(&self.root));
        if !self.config.templating {
            return catalogue;
        }
        let vars = self.config.get_merged_vars(self.target.as_deref());
        catalogue.with_renderer(Arc::new(JinjaEnvironment::new(&vars)))
    }

    /// The runner identifier for `map`: catalogue.yml wins, then
    /// `--identifier`, then the target, then tern.yml.
    ///
    /// Resolved before the ledger is opened so a missing identifier never
    /// creates a database file.
    pub(crate) fn runner_identifier(
        &self,
        map: &MigrationMap,
        cli_identifier: Option<&str>,
    ) -> Result<RunnerIdentifier> {
        if let Some(id) = map.identifier() {
            return Ok(id.clone());
        }
        let identifier = match cli_identifier {
            Some(raw) => Some(
                RunnerIdentifier::try_new(raw.trim()).context("--identifier cannot be blank")?,
            ),
            None => self.config.get_runner_identifier(self.target.as_deref())?,
        };
        identifier.ok_or_else(|| CoreError::MissingRunnerIdentifier.into())
    }
}

/// Parse repeatable identifier flags, rejecting blank values.
pub(crate) fn parse_ids<T>(
    values: &[String],
    flag: &str,
    parse: fn(String) -> Option<T>,
) -> Result<Vec<T>> {
    values
        .iter()
        .map(|value| {
            parse(value.trim().to_string())
                .with_context(|| format!("--{flag} values cannot be blank"))
        })
        .collect()
}

/// Print a value as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}
