//! Подсветка элементов по отчёту.
//!
//! Сама работа с DOM живёт в сгенерированной программе; здесь только
//! контракт: какие селекторы отметить, каким цветом и с какой подписью.

use serde::Serialize;
use thiserror::Error;

use super::report::{Report, ReportEntry};
use super::status::BaselineStatus;

/// Отметка одного селектора.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HighlightMark {
    pub selector: String,
    pub color: &'static str,
    pub title: String,
}

impl HighlightMark {
    /// Отметка для записи отчёта. `None` для at-правил и пустых записей.
    pub fn for_entry(entry: &ReportEntry) -> Option<Self> {
        if entry.is_at_rule() {
            return None;
        }
        let worst = entry.worst_status()?;
        let features: Vec<&str> = entry.issues.iter().map(|i| i.feature_id.as_str()).collect();
        Some(Self {
            selector: entry.selector.clone(),
            color: status_color(worst),
            title: format!("{}: {}", worst, features.join(", ")),
        })
    }
}

/// Цвет рамки для статуса.
pub fn status_color(status: BaselineStatus) -> &'static str {
    match status {
        BaselineStatus::NotBaseline => "#e5484d",
        BaselineStatus::LowBaseline => "#f5a524",
        BaselineStatus::HighBaseline => "#30a46c",
    }
}

/// Ошибка подсветки одного селектора.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Cannot highlight '{selector}': {reason}")]
pub struct HighlightError {
    pub selector: String,
    pub reason: String,
}

/// Получатель отметок.
pub trait HighlightSink {
    fn highlight(&mut self, mark: &HighlightMark) -> Result<(), HighlightError>;
}

/// Итог подсветки.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HighlightSummary {
    pub applied: usize,
    pub failed: usize,
    pub skipped_at_rules: usize,
}

/// Передать отметки получателю. Ошибка на одном селекторе логируется и
/// не останавливает остальные.
pub fn emit_highlights(report: &Report, sink: &mut dyn HighlightSink) -> HighlightSummary {
    let mut summary = HighlightSummary::default();

    for entry in report.entries() {
        let Some(mark) = HighlightMark::for_entry(entry) else {
            if entry.is_at_rule() {
                summary.skipped_at_rules += 1;
            }
            continue;
        };
        match sink.highlight(&mark) {
            Ok(()) => summary.applied += 1,
            Err(e) => {
                log::warn!("{}", e);
                summary.failed += 1;
            }
        }
    }

    summary
}

/// Получатель, который только собирает отметки.
#[derive(Debug, Default)]
pub struct PlanSink {
    pub marks: Vec<HighlightMark>,
}

impl HighlightSink for PlanSink {
    fn highlight(&mut self, mark: &HighlightMark) -> Result<(), HighlightError> {
        self.marks.push(mark.clone());
        Ok(())
    }
}
