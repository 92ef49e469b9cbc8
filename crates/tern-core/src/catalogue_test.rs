use super::*;
use std::fs;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn layout() -> TempDir {
    let dir = TempDir::new().unwrap();
    for (rel, sql) in [
        ("core/0002_orders.sql", "CREATE TABLE orders (id INT);"),
        ("core/0001_users.sql", "CREATE TABLE users (id INT);"),
        ("billing/0001_invoices.sql", "CREATE TABLE invoices (id INT);"),
    ] {
        write(dir.path(), rel, sql);
    }
    dir
}

fn node_names(map: &MigrationMap) -> Vec<&str> {
    map.nodes().iter().map(|n| n.id().as_str()).collect()
}

fn migration_names(node: &MigrationNode) -> Vec<&str> {
    node.migrations().map(|m| m.id().as_str()).collect()
}

struct Upper;

impl ScriptRenderer for Upper {
    fn render(
        &self,
        _name: &str,
        template: &str,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        Ok(template.to_uppercase())
    }
}

struct Broken;

impl ScriptRenderer for Broken {
    fn render(
        &self,
        _name: &str,
        _template: &str,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        Err("undefined variable 'schema'".into())
    }
}

#[test]
fn test_lexical_order_without_catalogue_file() {
    let dir = layout();
    let map = DirectoryCatalogue::new(dir.path()).migration_map().unwrap();

    assert_eq!(node_names(&map), vec!["billing", "core"]);
    assert_eq!(
        migration_names(&map.nodes()[1]),
        vec!["0001_users", "0002_orders"]
    );
    assert!(map.identifier().is_none());
}

#[test]
fn test_catalogue_file_sets_order_and_identifier() {
    let dir = layout();
    write(
        dir.path(),
        CATALOGUE_FILE,
        "identifier: shop\nnodes:\n  - core\n  - billing\n",
    );

    let map = DirectoryCatalogue::new(dir.path()).migration_map().unwrap();

    assert_eq!(node_names(&map), vec!["core", "billing"]);
    assert_eq!(map.identifier().unwrap(), "shop");
}

#[test]
fn test_scripts_are_read_verbatim() {
    let dir = layout();
    let map = DirectoryCatalogue::new(dir.path()).migration_map().unwrap();
    let first = map.nodes()[0].migrations().next().unwrap();
    assert_eq!(
        first.upgrade_sql().unwrap(),
        "CREATE TABLE invoices (id INT);"
    );
}

#[test]
fn test_non_sql_and_hidden_files_are_ignored() {
    let dir = layout();
    write(dir.path(), "core/README.md", "notes");
    write(dir.path(), "core/.0003_draft.sql", "SELECT 1");
    write(dir.path(), ".git/config", "");

    let map = DirectoryCatalogue::new(dir.path()).migration_map().unwrap();

    assert_eq!(node_names(&map), vec!["billing", "core"]);
    assert_eq!(map.migration_count(), 3);
}

#[test]
fn test_empty_node_is_kept() {
    let dir = layout();
    fs::create_dir(dir.path().join("empty")).unwrap();
    let map = DirectoryCatalogue::new(dir.path()).migration_map().unwrap();
    assert_eq!(node_names(&map), vec!["billing", "core", "empty"]);
    assert!(map.nodes()[2].is_empty());
}

#[test]
fn test_missing_root() {
    let dir = TempDir::new().unwrap();
    let err = DirectoryCatalogue::new(dir.path().join("nope"))
        .migration_map()
        .unwrap_err();
    assert!(matches!(err, CoreError::CatalogueNotFound { .. }));
    assert!(err.to_string().contains("[C001]"));
}

#[test]
fn test_listed_node_without_directory() {
    let dir = layout();
    write(
        dir.path(),
        CATALOGUE_FILE,
        "nodes: [core, billing, audit]\n",
    );
    let err = DirectoryCatalogue::new(dir.path())
        .migration_map()
        .unwrap_err();
    assert!(matches!(err, CoreError::UnknownCatalogueNode { node, .. } if node == "audit"));
}

#[test]
fn test_unlisted_directory() {
    let dir = layout();
    write(dir.path(), CATALOGUE_FILE, "nodes: [core]\n");
    let err = DirectoryCatalogue::new(dir.path())
        .migration_map()
        .unwrap_err();
    assert!(matches!(err, CoreError::UnlistedCatalogueNode { node } if node == "billing"));
}

#[test]
fn test_duplicate_listed_node() {
    let dir = layout();
    write(dir.path(), CATALOGUE_FILE, "nodes: [core, billing, core]\n");
    let err = DirectoryCatalogue::new(dir.path())
        .migration_map()
        .unwrap_err();
    assert!(matches!(err, CoreError::DuplicateNode { node } if node == "core"));
}

#[test]
fn test_migration_id_reused_in_later_node() {
    let dir = layout();
    write(
        dir.path(),
        "reporting/0001_users.sql",
        "CREATE VIEW active_users AS SELECT 1;",
    );
    let err = DirectoryCatalogue::new(dir.path())
        .migration_map()
        .unwrap_err();
    assert!(matches!(
        &err,
        CoreError::DuplicateMigration { migration, node, first_node }
            if migration == "0001_users" && node == "reporting" && first_node == "core"
    ));
    assert!(err.to_string().contains("[C006]"));
}

#[test]
fn test_same_prefix_different_stems_are_distinct() {
    let dir = layout();
    write(
        dir.path(),
        "reporting/0001_views.sql",
        "CREATE VIEW v AS SELECT 1;",
    );
    let map = DirectoryCatalogue::new(dir.path()).migration_map().unwrap();
    assert_eq!(map.migration_count(), 4);
}

#[test]
fn test_unknown_catalogue_key_rejected() {
    let dir = layout();
    write(dir.path(), CATALOGUE_FILE, "order: [core]\n");
    let err = DirectoryCatalogue::new(dir.path())
        .migration_map()
        .unwrap_err();
    assert!(matches!(err, CoreError::YamlParse(_)));
}

#[test]
fn test_blank_identifier_rejected() {
    let dir = layout();
    write(dir.path(), CATALOGUE_FILE, "identifier: \"  \"\n");
    let err = DirectoryCatalogue::new(dir.path())
        .migration_map()
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidCatalogueEntry { .. }));
}

#[test]
fn test_empty_catalogue_file_is_ignored() {
    let dir = layout();
    write(dir.path(), CATALOGUE_FILE, "");
    let map = DirectoryCatalogue::new(dir.path()).migration_map().unwrap();
    assert_eq!(node_names(&map), vec!["billing", "core"]);
}

#[test]
fn test_renderer_applies_on_demand() {
    let dir = layout();
    let map = DirectoryCatalogue::new(dir.path())
        .with_renderer(Arc::new(Upper))
        .migration_map()
        .unwrap();
    let first = map.nodes()[0].migrations().next().unwrap();
    assert_eq!(
        first.upgrade_sql().unwrap(),
        "CREATE TABLE INVOICES (ID INT);"
    );
}

#[test]
fn test_render_failure_is_script_resolution_error() {
    let dir = layout();
    let map = DirectoryCatalogue::new(dir.path())
        .with_renderer(Arc::new(Broken))
        .migration_map()
        .unwrap();
    let first = map.nodes()[0].migrations().next().unwrap();
    let err = first.upgrade_sql().unwrap_err();
    match err {
        CoreError::ScriptResolution { migration, message } => {
            assert_eq!(migration, "0001_invoices");
            assert!(message.contains("schema"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
