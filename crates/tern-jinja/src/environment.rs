//! Jinja environment setup for Tern

use crate::error::{JinjaError, JinjaResult};
use crate::functions::{env_var, var_fn, VarTable};
use minijinja::{Environment, UndefinedBehavior};
use std::collections::HashMap;
use tern_core::ScriptRenderer;

/// Name used in error messages for templates rendered without a file name.
const INLINE_TEMPLATE: &str = "<inline>";

/// Jinja templating environment for migration scripts
pub struct JinjaEnvironment<'a> {
    env: Environment<'a>,
}

impl<'a> JinjaEnvironment<'a> {
    /// Create a new Jinja environment with variables from config
    pub fn new(vars: &HashMap<String, serde_yaml::Value>) -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);

        env.add_function("var", var_fn(VarTable::from_yaml(vars)));
        env.add_function("env_var", env_var);

        Self { env }
    }

    /// Render a template string
    pub fn render(&self, template: &str) -> JinjaResult<String> {
        self.render_named(INLINE_TEMPLATE, template)
    }

    /// Render a template string, naming it `name` in error messages
    pub fn render_named(&self, name: &str, template: &str) -> JinjaResult<String> {
        self.env
            .render_named_str(name, template, ())
            .map_err(|e| JinjaError::render(name, e))
    }
}

impl Default for JinjaEnvironment<'_> {
    fn default() -> Self {
        Self::new(&HashMap::new())
    }
}

impl ScriptRenderer for JinjaEnvironment<'_> {
    fn render(
        &self,
        name: &str,
        template: &str,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        log::debug!("Rendering {name}");
        Ok(self.render_named(name, template)?)
    }
}

#[cfg(test)]
#[path = "environment_test.rs"]
mod tests;
