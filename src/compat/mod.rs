//! Движок анализа совместимости.
//!
//! Поток данных одного сканирования:
//!
//! ```text
//! CompatRegistry + AnalysisConfig ──build_lookup──► FeatureLookup
//! Stylesheet + FeatureLookup ──analyze──► Report ──emit_highlights──► HighlightSink
//! ```
//!
//! Реестр неизменяем и передаётся по ссылке. Таблица признаков и отчёт
//! принадлежат одному сканированию.

pub mod analyzer;
pub mod config;
pub mod highlight;
pub mod lookup;
pub mod registry;
pub mod report;
pub mod status;

pub use analyzer::{analyze, at_rule_key, pseudo_names, run_scan, Analyzer, ScanOutcome, StyleSource};
pub use config::{AnalysisConfig, Availability, Strictness};
pub use highlight::{emit_highlights, HighlightError, HighlightMark, HighlightSink, HighlightSummary, PlanSink};
pub use lookup::{build_lookup, normalize_compat_key, FeatureLookup, FeatureRecord, LookupStats};
pub use registry::{CompatRegistry, RegistryFeature, RegistryStatus};
pub use report::{Issue, Report, ReportEntry};
pub use status::BaselineStatus;
