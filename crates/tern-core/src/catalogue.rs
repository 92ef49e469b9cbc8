//! Catalogue providers.
//!
//! The engine asks a [`CatalogueProvider`] for a fresh [`MigrationMap`] on
//! every run. [`DirectoryCatalogue`] is the file-system provider used by the
//! CLI:
//!
//! ```text
//! migrations/
//!   catalogue.yml          # optional: node order and identifier
//!   core/
//!     0001_users.sql
//!     0002_orders.sql
//!   reporting/
//!     0001_views.sql
//! ```

use crate::error::{CoreError, CoreResult};
use crate::identifier::{MigrationId, NodeId, RunnerIdentifier};
use crate::migration::{Migration, MigrationMap, MigrationNode};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Name of the optional ordering file inside the migrations directory.
pub const CATALOGUE_FILE: &str = "catalogue.yml";

/// Supplies the migration map for a run.
pub trait CatalogueProvider {
    fn migration_map(&self) -> CoreResult<MigrationMap>;
}

/// Renders a migration script template into SQL.
pub trait ScriptRenderer {
    fn render(
        &self,
        name: &str,
        template: &str,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;
}

/// A migration read from a `.sql` file.
///
/// The file is read when the catalogue is loaded; rendering, if any, happens
/// each time the script is requested.
pub struct FileMigration {
    id: MigrationId,
    path: PathBuf,
    source: String,
    renderer: Option<Arc<dyn ScriptRenderer>>,
}

impl FileMigration {
    /// Path of the script on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Unrendered script text.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for FileMigration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileMigration")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("templated", &self.renderer.is_some())
            .finish()
    }
}

impl Migration for FileMigration {
    fn id(&self) -> &MigrationId {
        &self.id
    }

    fn upgrade_sql(&self) -> CoreResult<String> {
        match &self.renderer {
            None => Ok(self.source.clone()),
            Some(renderer) => renderer
                .render(&self.path.display().to_string(), &self.source)
                .map_err(|e| CoreError::ScriptResolution {
                    migration: self.id.to_string(),
                    message: e.to_string(),
                }),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogueFile {
    #[serde(default)]
    nodes: Option<Vec<String>>,
    #[serde(default)]
    identifier: Option<String>,
}

/// Loads migrations from `<root>/<node>/<migration>.sql`.
pub struct DirectoryCatalogue {
    root: PathBuf,
    renderer: Option<Arc<dyn ScriptRenderer>>,
}

impl DirectoryCatalogue {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            renderer: None,
        }
    }

    /// Render every script through `renderer` when it is requested.
    pub fn with_renderer(mut self, renderer: Arc<dyn ScriptRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// The migrations directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read_catalogue_file(&self) -> CoreResult<CatalogueFile> {
        let path = self.root.join(CATALOGUE_FILE);
        if !path.exists() {
            return Ok(CatalogueFile::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        if content.trim().is_empty() {
            return Ok(CatalogueFile::default());
        }
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Node directories keyed by name, in lexical order.
    fn node_directories(&self) -> CoreResult<BTreeMap<String, PathBuf>> {
        let mut dirs = BTreeMap::new();
        for entry in read_dir(&self.root)? {
            let path = entry.path();
            if is_hidden(&path) || !path.is_dir() {
                continue;
            }
            dirs.insert(entry_name(&path)?, path);
        }
        Ok(dirs)
    }

    fn load_node(&self, id: NodeId, dir: &Path) -> CoreResult<MigrationNode> {
        let mut scripts = BTreeMap::new();
        for entry in read_dir(dir)? {
            let path = entry.path();
            if is_hidden(&path) || !path.is_file() {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some("sql") {
                log::debug!("Ignoring non-SQL file {}", path.display());
                continue;
            }
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(MigrationId::try_new)
                .ok_or_else(|| CoreError::InvalidCatalogueEntry {
                    path: path.display().to_string(),
                    reason: "file stem is not a usable migration identifier".to_string(),
                })?;
            scripts.insert(stem, path);
        }

        let mut node = MigrationNode::from_id(id);
        for (migration_id, path) in scripts {
            let source = std::fs::read_to_string(&path).map_err(|e| CoreError::IoWithPath {
                path: path.display().to_string(),
                source: e,
            })?;
            node.push(FileMigration {
                id: migration_id,
                path,
                source,
                renderer: self.renderer.clone(),
            });
        }
        if node.is_empty() {
            log::warn!("Node '{}' has no migrations", node.id());
        }
        Ok(node)
    }
}

impl CatalogueProvider for DirectoryCatalogue {
    fn migration_map(&self) -> CoreResult<MigrationMap> {
        if !self.root.is_dir() {
            return Err(CoreError::CatalogueNotFound {
                path: self.root.display().to_string(),
            });
        }

        let file = self.read_catalogue_file()?;
        let mut dirs = self.node_directories()?;

        let order: Vec<String> = match file.nodes {
            None => dirs.keys().cloned().collect(),
            Some(listed) => {
                let mut seen = HashSet::new();
                for node in &listed {
                    if !seen.insert(node.as_str()) {
                        return Err(CoreError::DuplicateNode { node: node.clone() });
                    }
                    if !dirs.contains_key(node) {
                        return Err(CoreError::UnknownCatalogueNode {
                            node: node.clone(),
                            path: self.root.display().to_string(),
                        });
                    }
                }
                if let Some(unlisted) = dirs.keys().find(|d| !seen.contains(d.as_str())) {
                    return Err(CoreError::UnlistedCatalogueNode {
                        node: unlisted.clone(),
                    });
                }
                listed
            }
        };

        let mut map = MigrationMap::new();
        if let Some(identifier) = file.identifier {
            let identifier = RunnerIdentifier::try_new(identifier).ok_or_else(|| {
                CoreError::InvalidCatalogueEntry {
                    path: self.root.join(CATALOGUE_FILE).display().to_string(),
                    reason: "identifier must not be blank".to_string(),
                }
            })?;
            map = map.with_identifier(identifier);
        }

        let mut owners: HashMap<MigrationId, NodeId> = HashMap::new();
        for name in order {
            let Some(dir) = dirs.remove(&name) else {
                continue;
            };
            let id = NodeId::try_new(name).ok_or_else(|| CoreError::InvalidCatalogueEntry {
                path: dir.display().to_string(),
                reason: "node name must not be blank".to_string(),
            })?;
            let node = self.load_node(id, &dir)?;
            for migration in node.migrations() {
                if let Some(first) = owners.insert(migration.id().clone(), node.id().clone()) {
                    return Err(CoreError::DuplicateMigration {
                        migration: migration.id().to_string(),
                        node: node.id().to_string(),
                        first_node: first.to_string(),
                    });
                }
            }
            map.push(node);
        }

        log::debug!(
            "Loaded {} migration(s) in {} node(s) from {}",
            map.migration_count(),
            map.nodes().len(),
            self.root.display()
        );
        Ok(map)
    }
}

fn read_dir(dir: &Path) -> CoreResult<Vec<std::fs::DirEntry>> {
    std::fs::read_dir(dir)
        .and_then(|entries| entries.collect::<Result<Vec<_>, _>>())
        .map_err(|e| CoreError::IoWithPath {
            path: dir.display().to_string(),
            source: e,
        })
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

/// Directory name as UTF-8.
fn entry_name(path: &Path) -> CoreResult<String> {
    match path.file_name().and_then(|n| n.to_str()) {
        Some(name) if !name.trim().is_empty() => Ok(name.to_string()),
        _ => Err(CoreError::InvalidCatalogueEntry {
            path: path.display().to_string(),
            reason: "name is not valid UTF-8".to_string(),
        }),
    }
}

#[cfg(test)]
#[path = "catalogue_test.rs"]
mod tests;
