//! Template functions available to migration scripts.

use minijinja::value::Value;
use minijinja::{Error, ErrorKind};
use std::collections::{BTreeMap, HashMap};
use std::env::VarError;
use std::sync::Arc;

/// Project variables, converted to template values once per environment.
#[derive(Debug, Clone, Default)]
pub(crate) struct VarTable(Arc<BTreeMap<String, Value>>);

impl VarTable {
    pub(crate) fn from_yaml(vars: &HashMap<String, serde_yaml::Value>) -> Self {
        let table = vars
            .iter()
            .map(|(name, value)| (name.clone(), yaml_to_value(value)))
            .collect();
        Self(Arc::new(table))
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        self.0.get(name).cloned()
    }
}

/// Build `var(name, default?)` over `table`.
///
/// ```jinja
/// CREATE SCHEMA {{ var('schema') }};
/// ALTER TABLE events SET retention = {{ var('retention_days', 30) }};
/// ```
pub(crate) fn var_fn(
    table: VarTable,
) -> impl Fn(&str, Option<Value>) -> Result<Value, Error> + Send + Sync + 'static {
    move |name: &str, default: Option<Value>| {
        table.lookup(name).or(default).ok_or_else(|| {
            undefined(format!(
                "var('{name}') is not set in the vars of tern.yml and has no default"
            ))
        })
    }
}

/// `env_var(name, default?)`: read a process environment variable.
///
/// ```jinja
/// GRANT SELECT ON orders TO {{ env_var('REPORTING_ROLE', 'reporting') }};
/// ```
pub(crate) fn env_var(name: &str, default: Option<Value>) -> Result<Value, Error> {
    match std::env::var(name) {
        Ok(value) => Ok(Value::from(value)),
        Err(VarError::NotUnicode(_)) => Err(Error::new(
            ErrorKind::InvalidOperation,
            format!("environment variable '{name}' is not valid unicode"),
        )),
        Err(VarError::NotPresent) => default.ok_or_else(|| {
            undefined(format!(
                "env_var('{name}') is not set and has no default"
            ))
        }),
    }
}

fn undefined(message: String) -> Error {
    Error::new(ErrorKind::UndefinedError, message)
}

/// Convert a tern.yml value into a template value.
///
/// Tags are stripped and mapping entries with non-string keys are dropped.
pub(crate) fn yaml_to_value(yaml: &serde_yaml::Value) -> Value {
    match yaml {
        serde_yaml::Value::Null => Value::from(()),
        serde_yaml::Value::Bool(b) => Value::from(*b),
        serde_yaml::Value::Number(n) => number_to_value(n),
        serde_yaml::Value::String(s) => Value::from(s.as_str()),
        serde_yaml::Value::Sequence(items) => {
            Value::from(items.iter().map(yaml_to_value).collect::<Vec<_>>())
        }
        serde_yaml::Value::Mapping(map) => Value::from_iter(map.iter().filter_map(|(k, v)| {
            match k.as_str() {
                Some(key) => Some((key.to_string(), yaml_to_value(v))),
                None => {
                    log::warn!("Ignoring non-string key {k:?} in vars");
                    None
                }
            }
        })),
        serde_yaml::Value::Tagged(tagged) => yaml_to_value(&tagged.value),
    }
}

fn number_to_value(n: &serde_yaml::Number) -> Value {
    if let Some(i) = n.as_i64() {
        Value::from(i)
    } else if let Some(u) = n.as_u64() {
        Value::from(u)
    } else {
        n.as_f64()
            .map(Value::from)
            .unwrap_or_else(|| Value::from(()))
    }
}

#[cfg(test)]
#[path = "functions_test.rs"]
mod tests;
