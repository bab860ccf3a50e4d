//! Определения ошибок для autoscript.

use thiserror::Error;

use crate::config::ConfigError;
use crate::css::CssParseError;
use crate::duration::DurationError;

/// Основной тип `Result` для библиотеки.
pub type ScriptResult<T> = Result<T, ScriptError>;

/// Нарушение грамматики сценария.
///
/// `field` - путь к проблемному полю в нотации `steps[2].click.selector`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Schema violation at '{field}': {message}")]
pub struct SchemaViolation {
    pub field: String,
    pub message: String,
}

impl SchemaViolation {
    /// Создать нарушение для поля.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Перечисление всех возможных ошибок.
#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Script syntax error: {0}")]
    Syntax(String),

    #[error(transparent)]
    Schema(#[from] SchemaViolation),

    #[error(transparent)]
    Duration(#[from] DurationError),

    #[error("CSS parse error: {0}")]
    Css(#[from] CssParseError),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for ScriptError {
    fn from(e: std::io::Error) -> Self {
        ScriptError::IoError(e.to_string())
    }
}

impl From<serde_json::Error> for ScriptError {
    fn from(e: serde_json::Error) -> Self {
        ScriptError::SerializationError(e.to_string())
    }
}
