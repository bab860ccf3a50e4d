//! Отчёт о совместимости.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use super::lookup::FeatureRecord;
use super::status::BaselineStatus;

/// Одно использование признака.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// Текст места использования: `display: grid`, `:has`, `@container`.
    pub property: String,
    pub status: BaselineStatus,
    pub feature_id: String,
    pub baseline_year: Option<i32>,
    pub description: String,
    pub browser_compat: BTreeMap<String, Option<String>>,
}

impl Issue {
    pub fn new(property: impl Into<String>, record: &FeatureRecord) -> Self {
        Self {
            property: property.into(),
            status: record.status,
            feature_id: record.feature_id.clone(),
            baseline_year: record.baseline_year,
            description: record.description.clone(),
            browser_compat: record.browser_compat.clone(),
        }
    }

    /// Совпадает ли место использования и признак.
    pub fn same_use(&self, other: &Issue) -> bool {
        self.feature_id == other.feature_id && self.property == other.property
    }
}

/// Проблемы одного селектора или at-правила.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub selector: String,
    pub issues: Vec<Issue>,
}

impl ReportEntry {
    /// Селекторы at-правил начинаются с `@` и не подсвечиваются.
    pub fn is_at_rule(&self) -> bool {
        self.selector.starts_with('@')
    }

    /// Самый строгий статус среди проблем.
    pub fn worst_status(&self) -> Option<BaselineStatus> {
        self.issues.iter().map(|i| i.status).max_by_key(|s| s.restrictiveness())
    }
}

/// Отчёт: записи в порядке первого появления селектора.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Report {
    entries: Vec<ReportEntry>,
}

impl Report {
    /// Собрать отчёт, отбросив пустые записи.
    pub fn new(entries: Vec<ReportEntry>) -> Self {
        Self {
            entries: entries.into_iter().filter(|e| !e.issues.is_empty()).collect(),
        }
    }

    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Общее число проблем.
    pub fn issue_count(&self) -> usize {
        self.entries.iter().map(|e| e.issues.len()).sum()
    }

    /// Человекочитаемый вид для терминала.
    pub fn render_text(&self) -> String {
        if self.entries.is_empty() {
            return "no compatibility issues found\n".to_string();
        }

        let mut out = String::new();
        for entry in &self.entries {
            let _ = writeln!(out, "{}", entry.selector);
            for issue in &entry.issues {
                let year = issue.baseline_year.map(|y| format!(" since {y}")).unwrap_or_default();
                let _ = writeln!(
                    out,
                    "  {:<32} {} ({}{}): {}",
                    issue.property, issue.feature_id, issue.status, year, issue.description
                );
            }
        }
        let _ = writeln!(out, "{} issues in {} selectors", self.issue_count(), self.entries.len());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(property: &str, feature: &str, status: BaselineStatus) -> Issue {
        Issue {
            property: property.into(),
            status,
            feature_id: feature.into(),
            baseline_year: Some(2023),
            description: format!("{feature} feature"),
            browser_compat: BTreeMap::new(),
        }
    }

    #[test]
    fn test_empty_entries_dropped() {
        let report = Report::new(vec![
            ReportEntry {
                selector: "a".into(),
                issues: vec![],
            },
            ReportEntry {
                selector: "b".into(),
                issues: vec![issue(":has", "has", BaselineStatus::LowBaseline)],
            },
        ]);
        assert_eq!(report.len(), 1);
        assert_eq!(report.entries()[0].selector, "b");
    }

    #[test]
    fn test_worst_status() {
        let entry = ReportEntry {
            selector: ".x".into(),
            issues: vec![
                issue("gap", "flex-gap", BaselineStatus::HighBaseline),
                issue("anchor-name", "anchor", BaselineStatus::NotBaseline),
                issue(":has", "has", BaselineStatus::LowBaseline),
            ],
        };
        assert_eq!(entry.worst_status(), Some(BaselineStatus::NotBaseline));
        assert!(!entry.is_at_rule());
    }

    #[test]
    fn test_json_shape() {
        let report = Report::new(vec![ReportEntry {
            selector: "@container".into(),
            issues: vec![issue("@container", "container-queries", BaselineStatus::LowBaseline)],
        }]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json[0]["selector"], "@container");
        assert_eq!(json[0]["issues"][0]["featureId"], "container-queries");
        assert_eq!(json[0]["issues"][0]["status"], "low");
        assert_eq!(json[0]["issues"][0]["baselineYear"], 2023);
    }

    #[test]
    fn test_render_text() {
        assert_eq!(Report::default().render_text(), "no compatibility issues found\n");
        let report = Report::new(vec![ReportEntry {
            selector: ".grid".into(),
            issues: vec![issue("grid-template-rows: masonry", "masonry", BaselineStatus::NotBaseline)],
        }]);
        let text = report.render_text();
        assert!(text.starts_with(".grid\n"));
        assert!(text.contains("masonry (not baseline since 2023)"));
        assert!(text.ends_with("1 issues in 1 selectors\n"));
    }
}
