//! Реестр совместимости.
//!
//! Неизменяемый набор признаков в формате web-features. Загружается
//! тем, кто владеет анализатором, и передаётся в построитель таблицы
//! признаков по ссылке.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ScriptError, ScriptResult};

/// Статусная часть записи реестра.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistryStatus {
    /// Сырое значение: `false`, `"low"`, `"high"` или `true`.
    #[serde(default)]
    pub baseline: Value,
    #[serde(default)]
    pub baseline_low_date: Option<String>,
    #[serde(default)]
    pub baseline_high_date: Option<String>,
    /// Браузер → первая версия с поддержкой.
    #[serde(default)]
    pub support: BTreeMap<String, String>,
}

/// Одна запись реестра.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistryFeature {
    #[serde(skip)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<RegistryStatus>,
    /// Ключи совместимости вида `css.properties.container-type`.
    #[serde(default)]
    pub compat_features: Vec<String>,
}

impl RegistryFeature {
    /// Создать запись с сырым статусом и ключами совместимости.
    pub fn new(id: impl Into<String>, baseline: Value, compat_features: &[&str]) -> Self {
        Self {
            id: id.into(),
            name: None,
            description: None,
            status: Some(RegistryStatus {
                baseline,
                ..RegistryStatus::default()
            }),
            compat_features: compat_features.iter().map(|k| k.to_string()).collect(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_dates(mut self, low: Option<&str>, high: Option<&str>) -> Self {
        let status = self.status.get_or_insert_with(RegistryStatus::default);
        status.baseline_low_date = low.map(str::to_string);
        status.baseline_high_date = high.map(str::to_string);
        self
    }

    pub fn with_support(mut self, browser: &str, version: &str) -> Self {
        let status = self.status.get_or_insert_with(RegistryStatus::default);
        status.support.insert(browser.to_string(), version.to_string());
        self
    }
}

/// Реестр признаков в порядке следования записей в документе.
#[derive(Debug, Clone, Default)]
pub struct CompatRegistry {
    features: Vec<RegistryFeature>,
    rejected: Vec<String>,
}

impl CompatRegistry {
    /// Создать реестр из готовых записей.
    pub fn new(features: Vec<RegistryFeature>) -> Self {
        Self {
            features,
            rejected: Vec::new(),
        }
    }

    /// Разобрать JSON-документ реестра.
    ///
    /// Принимается `{"features": {id: {...}}}` либо просто `{id: {...}}`.
    /// Записи, которые не удаётся декодировать, отбрасываются и
    /// перечисляются в [`CompatRegistry::rejected`].
    pub fn from_json(source: &str) -> ScriptResult<Self> {
        let doc: Value = serde_json::from_str(source)?;
        let root = doc
            .as_object()
            .ok_or_else(|| ScriptError::Registry("registry must be a JSON object".to_string()))?;
        let entries = match root.get("features") {
            Some(Value::Object(features)) => features,
            Some(_) => return Err(ScriptError::Registry("'features' must be an object".to_string())),
            None => root,
        };

        let mut registry = CompatRegistry::default();
        for (id, raw) in entries {
            match serde_json::from_value::<RegistryFeature>(raw.clone()) {
                Ok(mut feature) => {
                    feature.id = id.clone();
                    registry.features.push(feature);
                }
                Err(e) => {
                    log::debug!("registry entry '{}' rejected: {}", id, e);
                    registry.rejected.push(id.clone());
                }
            }
        }
        log::info!(
            "loaded compatibility registry: {} features, {} rejected",
            registry.features.len(),
            registry.rejected.len()
        );
        Ok(registry)
    }

    /// Загрузить реестр из файла.
    pub fn load(path: impl AsRef<Path>) -> ScriptResult<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)
            .map_err(|e| ScriptError::Registry(format!("cannot read '{}': {}", path.display(), e)))?;
        Self::from_json(&source)
    }

    pub fn features(&self) -> &[RegistryFeature] {
        &self.features
    }

    /// Идентификаторы записей, отброшенных при разборе.
    pub fn rejected(&self) -> &[String] {
        &self.rejected
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
