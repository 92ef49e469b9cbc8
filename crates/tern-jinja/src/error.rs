//! Error types for tern-jinja

use thiserror::Error;

/// Jinja templating errors
#[derive(Error, Debug)]
pub enum JinjaError {
    /// Template render error (J001)
    #[error("[J001] Failed to render '{name}': {message}")]
    RenderError { name: String, message: String },
}

/// Result type alias for JinjaError
pub type JinjaResult<T> = Result<T, JinjaError>;

impl JinjaError {
    pub(crate) fn render(name: &str, err: minijinja::Error) -> Self {
        JinjaError::RenderError {
            name: name.to_string(),
            message: err.to_string(),
        }
    }
}
