use super::*;
use std::sync::Arc;
use tempfile::TempDir;
use tern_core::{CatalogueProvider, CoreError, DirectoryCatalogue};

fn vars(pairs: &[(&str, &str)]) -> HashMap<String, serde_yaml::Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), serde_yaml::Value::String(v.to_string())))
        .collect()
}

#[test]
fn test_render_plain_sql() {
    let env = JinjaEnvironment::default();
    let result = env.render("CREATE TABLE users (id INT);").unwrap();
    assert_eq!(result, "CREATE TABLE users (id INT);");
}

#[test]
fn test_render_keeps_trailing_newline() {
    let env = JinjaEnvironment::default();
    assert_eq!(env.render("SELECT 1;\n").unwrap(), "SELECT 1;\n");
}

#[test]
fn test_render_with_var() {
    let env = JinjaEnvironment::new(&vars(&[("schema", "analytics")]));
    let result = env
        .render("CREATE SCHEMA IF NOT EXISTS {{ var('schema') }};")
        .unwrap();
    assert_eq!(result, "CREATE SCHEMA IF NOT EXISTS analytics;");
}

#[test]
fn test_render_with_var_default() {
    let env = JinjaEnvironment::default();
    let result = env
        .render("ALTER TABLE t SET retention = {{ var('retention', 30) }};")
        .unwrap();
    assert_eq!(result, "ALTER TABLE t SET retention = 30;");
}

#[test]
fn test_var_missing_no_default() {
    let env = JinjaEnvironment::default();
    let err = env.render("{{ var('missing') }}").unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("[J001]"));
    assert!(msg.contains("missing"));
}

#[test]
fn test_undefined_template_variable_is_error() {
    let env = JinjaEnvironment::default();
    assert!(env.render("SELECT {{ not_a_var }}").is_err());
}

#[test]
fn test_loops_over_sequence_var() {
    let mut vars = HashMap::new();
    vars.insert(
        "tables".to_string(),
        serde_yaml::from_str("[orders, invoices]").unwrap(),
    );
    let env = JinjaEnvironment::new(&vars);
    let result = env
        .render("{% for t in var('tables') %}DROP TABLE {{ t }};{% endfor %}")
        .unwrap();
    assert_eq!(result, "DROP TABLE orders;DROP TABLE invoices;");
}

#[test]
fn test_error_names_the_script() {
    let env = JinjaEnvironment::default();
    let err = env
        .render_named("migrations/core/0001.sql", "{{ var('x') }}")
        .unwrap_err();
    assert!(err.to_string().contains("migrations/core/0001.sql"));
}

#[test]
fn test_renders_directory_catalogue_scripts() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    std::fs::create_dir_all(dir.join("core")).unwrap();
    std::fs::write(
        dir.join("core/0001_schema.sql"),
        "CREATE SCHEMA {{ var('schema') }};",
    )
    .unwrap();
    std::fs::write(dir.join("core/0002_broken.sql"), "{{ var('nope') }}").unwrap();

    let renderer = Arc::new(JinjaEnvironment::new(&vars(&[("schema", "analytics")])));
    let map = DirectoryCatalogue::new(dir)
        .with_renderer(renderer)
        .migration_map()
        .unwrap();
    let mut migrations = map.nodes()[0].migrations();

    let first = migrations.next().unwrap();
    assert_eq!(first.upgrade_sql().unwrap(), "CREATE SCHEMA analytics;");

    let second = migrations.next().unwrap();
    assert!(matches!(
        second.upgrade_sql().unwrap_err(),
        CoreError::ScriptResolution { .. }
    ));
}
