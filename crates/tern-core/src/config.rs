//! Configuration types and parsing for tern.yml

use crate::decision::{CommitPolicy, ErrorDecision};
use crate::error::{CoreError, CoreResult};
use crate::identifier::RunnerIdentifier;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Environment variable consulted when no `--target` is given.
pub const TARGET_ENV_VAR: &str = "TERN_TARGET";

/// Project configuration from tern.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Project name
    pub name: String,

    /// Ledger scope used when neither the CLI nor catalogue.yml sets one
    #[serde(default)]
    pub runner_identifier: Option<String>,

    /// Directory holding one subdirectory per migration node
    #[serde(default = "default_migrations_path")]
    pub migrations_path: String,

    /// Schema that holds the `executed_migrations` ledger table
    #[serde(default = "default_ledger_schema")]
    pub ledger_schema: String,

    /// Render scripts with Jinja before executing them
    #[serde(default = "default_true")]
    pub templating: bool,

    /// Template variables available through `var()`
    #[serde(default)]
    pub vars: HashMap<String, serde_yaml::Value>,

    /// Database connection
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Named overrides selected with `--target` or TERN_TARGET
    #[serde(default)]
    pub targets: HashMap<String, TargetConfig>,

    /// Default decisions for `tern migrate`
    #[serde(default)]
    pub policy: PolicyConfig,
}

/// Target-specific configuration overrides
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    /// Database configuration override
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    /// Runner identifier override
    #[serde(default)]
    pub runner_identifier: Option<String>,

    /// Variable overrides (merged with base vars)
    #[serde(default)]
    pub vars: HashMap<String, serde_yaml::Value>,
}

/// Database type selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    /// DuckDB (default)
    #[default]
    DuckDb,
}

impl std::fmt::Display for DbType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbType::DuckDb => write!(f, "duckdb"),
        }
    }
}

/// Database connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database type
    #[serde(rename = "type", default)]
    pub db_type: DbType,

    /// Database path (file or :memory:)
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: DbType::default(),
            path: default_db_path(),
        }
    }
}

/// Decision defaults applied by `tern migrate` unless overridden by flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    /// What to do when a script fails
    #[serde(default)]
    pub on_error: ErrorDecision,

    /// When to commit the unit of work
    #[serde(default)]
    pub commit: CommitPolicy,
}

const DEFAULT_DB_PATH: &str = ":memory:";

fn default_true() -> bool {
    true
}

fn default_migrations_path() -> String {
    "migrations".to_string()
}

fn default_ledger_schema() -> String {
    "tern".to_string()
}

fn default_db_path() -> String {
    DEFAULT_DB_PATH.to_string()
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a project directory
    /// Looks for tern.yml or tern.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        let yml_path = dir.join("tern.yml");
        let yaml_path = dir.join("tern.yaml");

        if yml_path.exists() {
            Self::load(&yml_path)
        } else if yaml_path.exists() {
            Self::load(&yaml_path)
        } else {
            Err(CoreError::ConfigNotFound {
                path: yml_path.display().to_string(),
            })
        }
    }

    /// Validate the configuration
    fn validate(&self) -> CoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "Project name cannot be empty".to_string(),
            });
        }

        if self.migrations_path.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "migrations_path cannot be empty".to_string(),
            });
        }

        if !is_simple_identifier(&self.ledger_schema) {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "ledger_schema '{}' must contain only letters, digits, and underscores",
                    self.ledger_schema
                ),
            });
        }

        let blank_identifier = std::iter::once(&self.runner_identifier)
            .chain(self.targets.values().map(|t| &t.runner_identifier))
            .flatten()
            .any(|id| id.trim().is_empty());
        if blank_identifier {
            return Err(CoreError::ConfigInvalid {
                message: "runner_identifier cannot be blank".to_string(),
            });
        }

        Ok(())
    }

    /// Absolute path of the migrations directory
    pub fn migrations_path_absolute(&self, root: &Path) -> PathBuf {
        root.join(&self.migrations_path)
    }

    /// Names of configured targets, sorted
    pub fn available_targets(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.targets.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn target(&self, name: &str) -> CoreResult<&TargetConfig> {
        self.targets
            .get(name)
            .ok_or_else(|| CoreError::ConfigInvalid {
                message: format!(
                    "Target '{}' not found. Available targets: {}",
                    name,
                    self.available_targets().join(", ")
                ),
            })
    }

    /// Get database configuration, optionally applying target overrides
    pub fn get_database_config(&self, target: Option<&str>) -> CoreResult<DatabaseConfig> {
        match target {
            Some(name) => Ok(self
                .target(name)?
                .database
                .clone()
                .unwrap_or_else(|| self.database.clone())),
            None => Ok(self.database.clone()),
        }
    }

    /// Get the configured runner identifier, optionally applying target overrides
    pub fn get_runner_identifier(
        &self,
        target: Option<&str>,
    ) -> CoreResult<Option<RunnerIdentifier>> {
        let from_target = match target {
            Some(name) => self.target(name)?.runner_identifier.as_deref(),
            None => None,
        };
        Ok(from_target
            .or(self.runner_identifier.as_deref())
            .and_then(RunnerIdentifier::try_new))
    }

    /// Get variables with target overrides merged in
    pub fn get_merged_vars(
        &self,
        target: Option<&str>,
    ) -> Cow<'_, HashMap<String, serde_yaml::Value>> {
        let target_config = target.and_then(|name| self.targets.get(name));
        match target_config.filter(|tc| !tc.vars.is_empty()) {
            Some(tc) => {
                let mut vars = self.vars.clone();
                for (key, value) in &tc.vars {
                    vars.insert(key.clone(), value.clone());
                }
                Cow::Owned(vars)
            }
            None => Cow::Borrowed(&self.vars),
        }
    }

    /// Resolve target from CLI flag or TERN_TARGET environment variable
    ///
    /// Priority: CLI flag > TERN_TARGET env var > None
    pub fn resolve_target(cli_target: Option<&str>) -> Option<String> {
        cli_target
            .map(String::from)
            .or_else(|| std::env::var(TARGET_ENV_VAR).ok())
            .filter(|t| !t.trim().is_empty())
    }
}

fn is_simple_identifier(s: &str) -> bool {
    !s.is_empty()
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !s.starts_with(|c: char| c.is_ascii_digit())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
