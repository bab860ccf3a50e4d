//! Построитель таблицы признаков.
//!
//! Превращает реестр и конфигурацию сканирования в отображение
//! «идентификатор синтаксиса → запись о признаке». Таблица строится
//! заново для каждого сканирования.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use super::config::AnalysisConfig;
use super::registry::{CompatRegistry, RegistryFeature};
use super::status::BaselineStatus;

/// Ключ для at-правила `@container` с запросами размеров.
pub const SIZE_QUERY_KEY: &str = "container";

/// Ключ для `@container style(...)`.
pub const STYLE_QUERY_KEY: &str = "container-style-queries";

/// Браузеры, для которых в записи всегда есть поле совместимости.
pub const CORE_BROWSERS: [&str; 7] = [
    "chrome",
    "chrome_android",
    "edge",
    "firefox",
    "firefox_android",
    "safari",
    "safari_ios",
];

/// Метаданные признака, общие для всех его идентификаторов.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureRecord {
    pub feature_id: String,
    pub status: BaselineStatus,
    pub description: String,
    pub baseline_year: Option<i32>,
    pub browser_compat: BTreeMap<String, Option<String>>,
}

/// Таблица признаков.
#[derive(Debug, Clone, Default)]
pub struct FeatureLookup {
    entries: HashMap<String, FeatureRecord>,
}

impl FeatureLookup {
    /// Найти признак по идентификатору без учёта регистра.
    pub fn get(&self, identifier: &str) -> Option<&FeatureRecord> {
        if identifier.bytes().any(|b| b.is_ascii_uppercase()) {
            self.entries.get(&identifier.to_ascii_lowercase())
        } else {
            self.entries.get(identifier)
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Вставить запись по правилу приоритета: более строгий статус
    /// побеждает, при равенстве побеждает более поздняя запись.
    pub fn insert(&mut self, identifier: String, record: FeatureRecord) -> bool {
        match self.entries.get(&identifier) {
            Some(existing) if existing.status.restrictiveness() > record.status.restrictiveness() => false,
            _ => {
                self.entries.insert(identifier, record);
                true
            }
        }
    }
}

/// Статистика построения таблицы.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LookupStats {
    /// Записи без распознаваемого статуса.
    pub malformed: usize,
    /// Записи, отсеянные конфигурацией.
    pub filtered: usize,
    /// Ключи совместимости, которые не удалось нормализовать.
    pub unmapped_keys: usize,
}

/// Построить таблицу признаков.
pub fn build_lookup(registry: &CompatRegistry, config: &AnalysisConfig) -> (FeatureLookup, LookupStats) {
    let mut lookup = FeatureLookup::default();
    let mut stats = LookupStats::default();

    for feature in registry.features() {
        let Some((status, high_year, record)) = feature_record(feature) else {
            log::debug!("feature '{}' has no usable baseline status, skipped", feature.id);
            stats.malformed += 1;
            continue;
        };
        if !config.includes(status, high_year) {
            stats.filtered += 1;
            continue;
        }
        for key in &feature.compat_features {
            match normalize_compat_key(key) {
                Some(identifier) => {
                    lookup.insert(identifier, record.clone());
                }
                None => stats.unmapped_keys += 1,
            }
        }
    }

    log::debug!(
        "feature lookup built: {} identifiers ({} malformed, {} filtered)",
        lookup.len(),
        stats.malformed,
        stats.filtered
    );
    (lookup, stats)
}

fn feature_record(feature: &RegistryFeature) -> Option<(BaselineStatus, Option<i32>, FeatureRecord)> {
    let raw = feature.status.as_ref()?;
    let status = BaselineStatus::from_raw(&raw.baseline)?;
    let high_year = raw.baseline_high_date.as_deref().and_then(date_year);
    let low_year = raw.baseline_low_date.as_deref().and_then(date_year);

    let mut browser_compat: BTreeMap<String, Option<String>> =
        CORE_BROWSERS.iter().map(|b| (b.to_string(), None)).collect();
    for (browser, version) in &raw.support {
        browser_compat.insert(browser.clone(), Some(version.clone()));
    }

    let description = feature
        .description
        .clone()
        .or_else(|| feature.name.clone())
        .unwrap_or_else(|| feature.id.clone());

    let record = FeatureRecord {
        feature_id: feature.id.clone(),
        status,
        description,
        baseline_year: high_year.or(low_year),
        browser_compat,
    };
    Some((status, high_year, record))
}

/// Год из даты реестра (`2023-03-14`, `≤2020-07-28`).
pub fn date_year(date: &str) -> Option<i32> {
    let digits: String = date
        .trim_start_matches(|c: char| !c.is_ascii_digit())
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.len() != 4 {
        return None;
    }
    digits.parse().ok()
}

/// Нормализовать ключ совместимости в голый идентификатор.
///
/// `css.properties.gap` → `gap`, `css.properties.display.grid` → `grid`,
/// `css.selectors.has` → `has`, `css.at-rules.layer` → `layer`,
/// `css.types.color.oklch` → `oklch`. Ключи `css.at-rules.container.*`
/// о стилевых запросах сводятся к [`STYLE_QUERY_KEY`].
pub fn normalize_compat_key(key: &str) -> Option<String> {
    let parts: Vec<&str> = key.split('.').filter(|p| !p.is_empty()).collect();
    let (category, rest) = match parts.as_slice() {
        ["css", category, rest @ ..] if !rest.is_empty() => (*category, rest),
        [.., last] if parts.len() > 1 => return Some(last.to_ascii_lowercase()),
        _ => return None,
    };

    let identifier = match (category, rest) {
        ("at-rules", ["container", sub @ ..]) if sub.iter().any(|s| s.contains("style")) => {
            STYLE_QUERY_KEY.to_string()
        }
        ("selectors", [name, ..]) => name.to_string(),
        ("at-rules", [name]) | ("properties", [name]) => name.to_string(),
        (_, [.., last]) => last.to_string(),
        (_, []) => return None,
    };
    Some(identifier.to_ascii_lowercase())
}
