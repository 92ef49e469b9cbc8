//! tern-jinja - Jinja templating layer for Tern
//!
//! Migration scripts are rendered with minijinja before they run. Templates
//! can read project variables with `var(name, default?)` and process
//! environment variables with `env_var(name, default?)`.

pub mod environment;
pub mod error;
mod functions;

pub use environment::JinjaEnvironment;
pub use error::{JinjaError, JinjaResult};
