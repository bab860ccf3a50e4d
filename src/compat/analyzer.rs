//! Структурный анализатор таблиц стилей.
//!
//! Обходит дерево CSS, сверяет имена свойств, функций, ключевых слов,
//! единиц, псевдоклассов и at-правил с таблицей признаков и собирает
//! отчёт, сгруппированный по селекторам.

use std::collections::HashMap;

use serde::Deserialize;

use super::config::AnalysisConfig;
use super::lookup::{FeatureLookup, LookupStats, SIZE_QUERY_KEY, STYLE_QUERY_KEY};
use super::registry::CompatRegistry;
use super::report::{Issue, Report, ReportEntry};
use crate::css::{self, AtRule, Block, ComponentValue, CssNode, CssParseError, Declaration, StyleRule, Stylesheet};

/// Ключевые слова, поддерживаемые всеми браузерами.
const COMMON_KEYWORDS: &[&str] = &[
    "inherit", "initial", "unset", "revert", "auto", "none", "normal", "transparent", "currentcolor", "block",
    "inline", "inline-block", "flex", "absolute", "relative", "fixed", "static", "hidden", "visible", "solid",
    "dashed", "dotted", "bold", "italic", "center", "left", "right", "top", "bottom", "both", "pointer",
    "default", "nowrap", "wrap", "row", "column", "uppercase", "lowercase", "underline", "ease", "linear",
    "ease-in", "ease-out", "ease-in-out", "forwards", "infinite", "cover", "contain", "repeat", "no-repeat",
    "serif", "sans-serif", "monospace", "important", "and", "or", "not",
];

/// Единицы, поддерживаемые всеми браузерами.
const STANDARD_UNITS: &[&str] = &[
    "px", "em", "rem", "ex", "ch", "vh", "vw", "vmin", "vmax", "cm", "mm", "in", "pt", "pc", "deg", "rad", "grad",
    "turn", "s", "ms", "hz", "khz", "dpi", "dpcm", "dppx", "fr",
];

/// Таблица стилей со страницы: адрес (если есть) и текст.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StyleSource {
    #[serde(default)]
    pub href: Option<String>,
    pub text: String,
}

impl StyleSource {
    /// Имя источника для логов.
    pub fn label(&self) -> &str {
        self.href.as_deref().unwrap_or("<inline>")
    }
}

/// Накопитель отчёта для одной или нескольких таблиц стилей.
pub struct Analyzer<'a> {
    lookup: &'a FeatureLookup,
    config: &'a AnalysisConfig,
    entries: Vec<ReportEntry>,
    index: HashMap<String, usize>,
}

impl<'a> Analyzer<'a> {
    pub fn new(lookup: &'a FeatureLookup, config: &'a AnalysisConfig) -> Self {
        Self {
            lookup,
            config,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Проанализировать очередную таблицу стилей.
    pub fn add_stylesheet(&mut self, sheet: &Stylesheet) {
        for node in &sheet.rules {
            self.visit_node(node);
        }
    }

    /// Финальная фильтрация и сборка отчёта.
    pub fn finish(self) -> Report {
        let config = self.config;
        let entries = self
            .entries
            .into_iter()
            .map(|mut entry| {
                entry.issues.retain(|issue| config.includes_status(issue.status));
                entry
            })
            .collect();
        Report::new(entries)
    }

    fn visit_node(&mut self, node: &CssNode) {
        stacker::maybe_grow(32 * 1024, 1024 * 1024, || match node {
            CssNode::Rule(rule) => self.visit_rule(rule),
            CssNode::AtRule(at) => self.visit_at_rule(at),
        })
    }

    fn visit_rule(&mut self, rule: &StyleRule) {
        let lookup = self.lookup;
        for (pseudo, name) in pseudo_names(&rule.selector) {
            if let Some(record) = lookup.get(&name) {
                self.push(&rule.selector, Issue::new(pseudo, record));
            }
        }
        self.visit_block(&rule.selector, &rule.block);
    }

    fn visit_at_rule(&mut self, at: &AtRule) {
        let lookup = self.lookup;
        let selector = at.selector();
        if let Some(record) = lookup.get(at_rule_key(at)) {
            self.push(&selector, Issue::new(format!("@{}", at.name), record));
        }
        if let Some(block) = &at.block {
            self.visit_block(&selector, block);
        }
    }

    fn visit_block(&mut self, selector: &str, block: &Block) {
        for declaration in &block.declarations {
            self.visit_declaration(selector, declaration);
        }
        for node in &block.rules {
            self.visit_node(node);
        }
    }

    fn visit_declaration(&mut self, selector: &str, declaration: &Declaration) {
        if declaration.is_custom_property() {
            return;
        }
        let lookup = self.lookup;
        let property = declaration.property.as_str();
        if let Some(record) = lookup.get(property) {
            self.push(selector, Issue::new(property, record));
        }
        if !self.config.strictness.scans_values() {
            return;
        }

        let skip_common = self.config.strictness.skips_common_keywords();
        let mut found = Vec::new();
        for value in &declaration.value {
            value.walk(&mut |v| match v {
                ComponentValue::Function { name, .. } => {
                    if let Some(record) = lookup.get(name) {
                        found.push(Issue::new(format!("{property}: {name}()"), record));
                    }
                }
                ComponentValue::Ident(ident) => {
                    let ident = ident.to_ascii_lowercase();
                    if ident.starts_with("--") || (skip_common && COMMON_KEYWORDS.contains(&ident.as_str())) {
                        return;
                    }
                    if let Some(record) = lookup.get(&ident) {
                        found.push(Issue::new(format!("{property}: {ident}"), record));
                    }
                }
                ComponentValue::Dimension { unit, .. } => {
                    if skip_common && STANDARD_UNITS.contains(&unit.as_str()) {
                        return;
                    }
                    if let Some(record) = lookup.get(unit) {
                        found.push(Issue::new(format!("{property}: {unit}"), record));
                    }
                }
                _ => {}
            });
        }
        for issue in found {
            self.push(selector, issue);
        }
    }

    /// Добавить проблему, отбросив повтор того же признака в том же месте.
    fn push(&mut self, selector: &str, issue: Issue) {
        let slot = match self.index.get(selector) {
            Some(&slot) => slot,
            None => {
                self.entries.push(ReportEntry {
                    selector: selector.to_string(),
                    issues: Vec::new(),
                });
                self.index.insert(selector.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        let issues = &mut self.entries[slot].issues;
        if !issues.iter().any(|existing| existing.same_use(&issue)) {
            issues.push(issue);
        }
    }
}

/// Проанализировать одну таблицу стилей.
pub fn analyze(sheet: &Stylesheet, lookup: &FeatureLookup, config: &AnalysisConfig) -> Report {
    let mut analyzer = Analyzer::new(lookup, config);
    analyzer.add_stylesheet(sheet);
    analyzer.finish()
}

/// Результат сканирования набора таблиц стилей.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub report: Report,
    pub stats: LookupStats,
    /// Источники, которые не удалось разобрать.
    pub parse_failures: Vec<(String, CssParseError)>,
}

/// Полный цикл сканирования с новой таблицей признаков.
///
/// Таблица стилей, которую не удалось разобрать, пропускается.
pub fn run_scan(registry: &CompatRegistry, config: &AnalysisConfig, sources: &[StyleSource]) -> ScanOutcome {
    let (lookup, stats) = super::build_lookup(registry, config);
    if stats.malformed > 0 {
        log::warn!("{} registry entries have no usable baseline status", stats.malformed);
    }

    let mut analyzer = Analyzer::new(&lookup, config);
    let mut parse_failures = Vec::new();
    for source in sources {
        match css::parse_stylesheet(&source.text) {
            Ok(sheet) => analyzer.add_stylesheet(&sheet),
            Err(e) => {
                log::warn!("stylesheet {} skipped: {}", source.label(), e);
                parse_failures.push((source.label().to_string(), e));
            }
        }
    }

    let report = analyzer.finish();
    log::info!(
        "scan finished: {} sources, {} issues in {} selectors",
        sources.len(),
        report.issue_count(),
        report.len()
    );
    ScanOutcome {
        report,
        stats,
        parse_failures,
    }
}

/// Ключ таблицы признаков для at-правила.
///
/// `@container` со `style(` или `--` в прелюдии считается стилевым
/// запросом, иначе запросом размеров.
pub fn at_rule_key(at: &AtRule) -> &str {
    if at.name == SIZE_QUERY_KEY {
        if at.prelude.contains("style(") || at.prelude.contains("--") {
            STYLE_QUERY_KEY
        } else {
            SIZE_QUERY_KEY
        }
    } else {
        &at.name
    }
}

/// Псевдоклассы и псевдоэлементы селектора: (`::backdrop`, `backdrop`).
pub fn pseudo_names(selector: &str) -> Vec<(String, String)> {
    let chars: Vec<char> = selector.chars().collect();
    let mut names = Vec::new();
    let mut quote: Option<char> = None;
    let mut bracket = 0usize;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match (c, quote) {
            ('\\', _) => i += 1,
            (q, Some(open)) if q == open => quote = None,
            (_, Some(_)) => {}
            ('"' | '\'', None) => quote = Some(c),
            ('[', None) => bracket += 1,
            (']', None) => bracket = bracket.saturating_sub(1),
            (':', None) if bracket == 0 => {
                let mut prefix = String::from(":");
                if chars.get(i + 1) == Some(&':') {
                    prefix.push(':');
                    i += 1;
                }
                let name: String = chars[i + 1..]
                    .iter()
                    .take_while(|ch| ch.is_ascii_alphanumeric() || **ch == '-' || **ch == '_')
                    .collect();
                i += name.len();
                if !name.is_empty() {
                    let name = name.to_ascii_lowercase();
                    names.push((format!("{prefix}{name}"), name));
                }
            }
            _ => {}
        }
        i += 1;
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compat::{build_lookup, Availability, BaselineStatus, RegistryFeature, Strictness};
    use serde_json::json;

    fn registry() -> CompatRegistry {
        CompatRegistry::new(vec![
            RegistryFeature::new("has", json!("low"), &["css.selectors.has"]),
            RegistryFeature::new("backdrop", json!("high"), &["css.selectors.backdrop"]),
            RegistryFeature::new("grid", json!("high"), &["css.properties.display.grid", "css.properties.grid-template-columns"]),
            RegistryFeature::new("subgrid", json!("low"), &["css.properties.grid-template-columns.subgrid"]),
            RegistryFeature::new("clamp", json!("high"), &["css.types.clamp"]),
            RegistryFeature::new("oklch", json!("low"), &["css.types.color.oklch"]),
            RegistryFeature::new("viewport-units", json!("low"), &["css.types.length.dvh"]),
            RegistryFeature::new("container-queries", json!("low"), &["css.at-rules.container"]),
            RegistryFeature::new(
                "container-style-queries",
                json!(false),
                &["css.at-rules.container.style_queries_for_custom_properties"],
            ),
            RegistryFeature::new("anchor-positioning", json!(false), &["css.properties.anchor-name"]),
            RegistryFeature::new("auto-keyword", json!(false), &["css.properties.width.auto"]),
        ])
    }

    fn config(strictness: Strictness) -> AnalysisConfig {
        AnalysisConfig {
            include_availability: [Availability::Low, Availability::High].into(),
            strictness,
            ..AnalysisConfig::default()
        }
    }

    fn run(source: &str, config: &AnalysisConfig) -> Report {
        let (lookup, _) = build_lookup(&registry(), config);
        analyze(&css::parse_stylesheet(source).unwrap(), &lookup, config)
    }

    fn properties(report: &Report, selector: &str) -> Vec<String> {
        report
            .entries()
            .iter()
            .find(|e| e.selector == selector)
            .map(|e| e.issues.iter().map(|i| i.property.clone()).collect())
            .unwrap_or_default()
    }

    fn nested_calc(depth: usize) -> String {
        format!("a {{ width: {}1dvh{} }}", "calc(".repeat(depth), ")".repeat(depth))
    }

    #[test]
    fn test_deeply_nested_sheet_is_analyzed() {
        let config = config(Strictness::Standard);
        let report = run(&nested_calc(3000), &config);
        assert_eq!(properties(&report, "a"), vec!["width: dvh"]);

        let rules = format!("{}color: red{}", ".x:has(p) { ".repeat(3000), " }".repeat(3000));
        let report = run(&rules, &config);
        assert_eq!(properties(&report, ".x:has(p)"), vec![":has"]);
    }

    #[test]
    fn test_too_deep_sheet_is_skipped() {
        let sources = vec![
            StyleSource {
                href: Some("deep.css".into()),
                text: nested_calc(200_000),
            },
            StyleSource {
                href: None,
                text: "li:has(> img) { color: red }".into(),
            },
        ];
        let outcome = run_scan(&registry(), &config(Strictness::Standard), &sources);
        assert_eq!(outcome.parse_failures.len(), 1);
        assert!(matches!(outcome.parse_failures[0].1, CssParseError::TooDeep { .. }));
        assert_eq!(properties(&outcome.report, "li:has(> img)"), vec![":has"]);
    }

    #[test]
    fn test_pseudo_names() {
        let names: Vec<String> = pseudo_names("a:hover, dialog::backdrop, [data-x=\"a:b\"], .a\\:b, li:has(> img)")
            .into_iter()
            .map(|(p, _)| p)
            .collect();
        assert_eq!(names, vec![":hover", "::backdrop", ":has"]);
    }

    #[test]
    fn test_rule_scan() {
        let report = run(
            ".card:has(img) { display: grid; grid-template-columns: subgrid; width: clamp(1rem, 50%, 3rem); color: oklch(70% 0.1 200 / 50%); height: 100dvh; }",
            &config(Strictness::Standard),
        );
        assert_eq!(report.len(), 1);
        assert_eq!(
            properties(&report, ".card:has(img)"),
            vec![
                ":has",
                "display: grid",
                "grid-template-columns",
                "grid-template-columns: subgrid",
                "width: clamp()",
                "color: oklch()",
                "height: dvh",
            ]
        );
    }

    #[test]
    fn test_oklch_is_found_as_function() {
        let (lookup, _) = build_lookup(&registry(), &config(Strictness::Standard));
        assert!(lookup.get("oklch").is_some());
        let report = run("a { color: oklch(70% 0.1 200) }", &config(Strictness::Standard));
        assert_eq!(properties(&report, "a"), vec!["color: oklch()"]);
    }

    #[test]
    fn test_relaxed_skips_values() {
        let report = run(".g { display: grid; grid-template-columns: subgrid }", &config(Strictness::Relaxed));
        assert_eq!(properties(&report, ".g"), vec!["grid-template-columns"]);
    }

    #[test]
    fn test_strict_keeps_common_keywords() {
        let source = ".w { width: auto }";
        assert!(run(source, &config(Strictness::Standard)).is_empty());
        assert_eq!(properties(&run(source, &config(Strictness::Strict)), ".w"), vec!["width: auto"]);
    }

    #[test]
    fn test_container_disambiguation() {
        let report = run(
            "@container card (min-width: 400px) { .t { anchor-name: --a } } @container style(--theme: dark) { .t { color: red } }",
            &config(Strictness::Standard),
        );
        let size = &report.entries()[0];
        assert_eq!(size.selector, "@container card (min-width: 400px)");
        assert_eq!(size.issues[0].feature_id, "container-queries");

        let style = report
            .entries()
            .iter()
            .find(|e| e.selector == "@container style(--theme: dark)")
            .unwrap();
        assert_eq!(style.issues[0].feature_id, "container-style-queries");
        assert_eq!(style.issues[0].status, BaselineStatus::NotBaseline);

        assert_eq!(properties(&report, ".t"), vec!["anchor-name"]);
    }

    #[test]
    fn test_at_rule_block_declarations() {
        let report = run("@supports (display: grid) { display: grid }", &config(Strictness::Standard));
        assert_eq!(properties(&report, "@supports (display: grid)"), vec!["display: grid"]);
    }

    #[test]
    fn test_dedup_and_grouping_order() {
        let report = run(
            "b { display: grid } a { display: grid; display: grid } b { grid-template-columns: 1fr }",
            &config(Strictness::Standard),
        );
        let selectors: Vec<&str> = report.entries().iter().map(|e| e.selector.as_str()).collect();
        assert_eq!(selectors, vec!["b", "a"]);
        assert_eq!(properties(&report, "a"), vec!["display: grid"]);
        assert_eq!(properties(&report, "b"), vec!["display: grid", "grid-template-columns"]);
    }

    #[test]
    fn test_final_filter_drops_empty_selectors() {
        let only_high = AnalysisConfig {
            include_availability: [Availability::High].into(),
            include_not_baseline: false,
            ..AnalysisConfig::default()
        };
        let report = run(".x:has(a) { anchor-name: --a; height: 10dvh }", &only_high);
        assert!(report.is_empty());
    }

    #[test]
    fn test_run_scan_skips_broken_sources() {
        let sources = vec![
            StyleSource {
                href: Some("broken.css".into()),
                text: "a { color: red".into(),
            },
            StyleSource {
                href: None,
                text: "li:has(a) { top: 0 }".into(),
            },
        ];
        let outcome = run_scan(&registry(), &AnalysisConfig::default(), &sources);
        assert_eq!(outcome.parse_failures.len(), 1);
        assert_eq!(outcome.parse_failures[0].0, "broken.css");
        assert_eq!(properties(&outcome.report, "li:has(a)"), vec![":has"]);
    }
}
