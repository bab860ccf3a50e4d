//! Настройки анализа совместимости.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::status::BaselineStatus;

/// Уровень доступности Baseline, который нужно включать в отчёт.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Low,
    High,
}

impl Availability {
    pub fn as_str(self) -> &'static str {
        match self {
            Availability::Low => "low",
            Availability::High => "high",
        }
    }
}

/// Насколько подробно разбирать значения деклараций.
///
/// - `Relaxed` - только свойства, псевдоклассы и at-правила;
/// - `Standard` - плюс функции, идентификаторы и единицы в значениях,
///   без общеподдерживаемых ключевых слов;
/// - `Strict` - как `Standard`, но ключевые слова не пропускаются.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    Relaxed,
    #[default]
    Standard,
    Strict,
}

impl Strictness {
    pub fn as_str(self) -> &'static str {
        match self {
            Strictness::Relaxed => "relaxed",
            Strictness::Standard => "standard",
            Strictness::Strict => "strict",
        }
    }

    pub fn scans_values(self) -> bool {
        !matches!(self, Strictness::Relaxed)
    }

    pub fn skips_common_keywords(self) -> bool {
        !matches!(self, Strictness::Strict)
    }
}

/// Конфигурация одного сканирования.
///
/// Применяется дважды: при построении таблицы признаков и при финальной
/// фильтрации отчёта.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisConfig {
    #[serde(rename = "availability", default = "default_availability")]
    pub include_availability: BTreeSet<Availability>,
    #[serde(rename = "year", default)]
    pub baseline_year_threshold: Option<i32>,
    #[serde(rename = "notBaseline", default = "default_not_baseline")]
    pub include_not_baseline: bool,
    #[serde(default)]
    pub strictness: Strictness,
}

fn default_availability() -> BTreeSet<Availability> {
    BTreeSet::from([Availability::Low])
}

fn default_not_baseline() -> bool {
    true
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            include_availability: default_availability(),
            baseline_year_threshold: None,
            include_not_baseline: default_not_baseline(),
            strictness: Strictness::default(),
        }
    }
}

impl AnalysisConfig {
    /// Проходит ли статус фильтр по множеству доступности и флагу NotBaseline.
    pub fn includes_status(&self, status: BaselineStatus) -> bool {
        match status {
            BaselineStatus::NotBaseline => self.include_not_baseline,
            BaselineStatus::LowBaseline => self.include_availability.contains(&Availability::Low),
            BaselineStatus::HighBaseline => self.include_availability.contains(&Availability::High),
        }
    }

    /// Полное правило включения записи реестра в таблицу признаков.
    ///
    /// Порог года отсекает HighBaseline-признаки, ставшие широко доступными
    /// в пороговом году или раньше. Признаки без даты не отсекаются.
    pub fn includes(&self, status: BaselineStatus, high_year: Option<i32>) -> bool {
        if !self.includes_status(status) {
            return false;
        }
        match (status, self.baseline_year_threshold, high_year) {
            (BaselineStatus::HighBaseline, Some(threshold), Some(year)) => year > threshold,
            _ => true,
        }
    }
}
