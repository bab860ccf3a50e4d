//! Конфигурация компилятора (autoscript.toml).
//!
//! ```toml
//! [compiler]
//! default_timeout = "30s"
//!
//! [analyzer]
//! command = "autoscript"
//! registry = "data/web-features.json"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::duration::Millis;

/// Имя файла конфигурации.
pub const CONFIG_FILE: &str = "autoscript.toml";

/// Таймаут ожидания элементов, если в шаге он не задан.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Команда анализатора по умолчанию.
pub const DEFAULT_ANALYZER_COMMAND: &str = "autoscript";

/// Ошибки работы с конфигурацией.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config '{path}': {message}")]
    Parse { path: PathBuf, message: String },
}

/// Настройки, влияющие на сгенерированную программу.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompileOptions {
    #[serde(default)]
    pub compiler: CompilerSection,
    #[serde(default)]
    pub analyzer: AnalyzerSection,
}

/// Секция `[compiler]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompilerSection {
    #[serde(default = "default_timeout")]
    pub default_timeout: Millis,
}

impl Default for CompilerSection {
    fn default() -> Self {
        Self {
            default_timeout: default_timeout(),
        }
    }
}

fn default_timeout() -> Millis {
    Millis(DEFAULT_TIMEOUT_MS)
}

/// Секция `[analyzer]`: как сгенерированная программа вызывает анализатор.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalyzerSection {
    #[serde(default = "default_command")]
    pub command: String,
    /// Путь к реестру признаков. Относительный путь разрешается от
    /// каталога, где запускается программа.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
}

impl Default for AnalyzerSection {
    fn default() -> Self {
        Self {
            command: default_command(),
            registry: None,
        }
    }
}

fn default_command() -> String {
    DEFAULT_ANALYZER_COMMAND.to_string()
}

impl CompileOptions {
    /// Разобрать текст конфигурации.
    pub fn from_toml(source: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(source).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Загрузить конфигурацию из файла.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content, path)
    }

    /// Найти конфигурацию в каталоге `start` или его родителях.
    pub fn find(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE);
            if config_path.is_file() {
                return Some(config_path);
            }

            if !current.pop() {
                break;
            }
        }

        None
    }

    /// Найти и загрузить конфигурацию; без файла - значения по умолчанию.
    pub fn discover(start: &Path) -> Result<Self, ConfigError> {
        match Self::find(start) {
            Some(path) => {
                log::info!("using config {}", path.display());
                Self::load(path)
            }
            None => {
                log::debug!("no {} above {}, using defaults", CONFIG_FILE, start.display());
                Ok(Self::default())
            }
        }
    }
}
