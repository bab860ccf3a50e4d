//! Анализ совместимости от JSON-реестра до плана подсветки.

use std::collections::BTreeSet;

use autoscript::compat::{
    build_lookup, emit_highlights, run_scan, AnalysisConfig, Availability, BaselineStatus, CompatRegistry, PlanSink,
    Strictness, StyleSource,
};

const REGISTRY: &str = r#"{
  "features": {
    "has": {
      "name": ":has()",
      "description": "The :has() pseudo-class",
      "status": { "baseline": "low", "baseline_low_date": "2023-12-19", "support": { "chrome": "105", "firefox": "121" } },
      "compat_features": ["css.selectors.has"]
    },
    "anchor-positioning": {
      "status": { "baseline": false, "support": { "chrome": "125" } },
      "compat_features": ["css.properties.anchor-name", "css.properties.position-anchor"]
    },
    "grid": {
      "status": { "baseline": "high", "baseline_high_date": "2020-01-15" },
      "compat_features": ["css.properties.grid-template-columns", "css.properties.display.grid"]
    },
    "container-style-queries": {
      "status": { "baseline": false },
      "compat_features": ["css.at-rules.container.style_queries_for_custom_properties"]
    },
    "container-queries": {
      "status": { "baseline": "low", "baseline_low_date": "2023-02-14" },
      "compat_features": ["css.at-rules.container"]
    },
    "broken": { "status": { "baseline": "someday" }, "compat_features": ["css.properties.zoom"] },
    "odd": "not an object"
  }
}"#;

const SHEET: &str = r#"
.card:has(> img) { anchor-name: --card; display: grid; }
@container style(--theme: dark) { .title { color: red } }
@container sidebar (min-width: 30em) { .title { position-anchor: --card } }
.plain { color: red; }
"#;

fn sources() -> Vec<StyleSource> {
    vec![StyleSource {
        href: Some("https://example.com/site.css".into()),
        text: SHEET.into(),
    }]
}

fn config(availability: &[Availability], not_baseline: bool) -> AnalysisConfig {
    AnalysisConfig {
        include_availability: availability.iter().copied().collect::<BTreeSet<_>>(),
        baseline_year_threshold: None,
        include_not_baseline: not_baseline,
        strictness: Strictness::Standard,
    }
}

#[test]
fn test_registry_rejects_unreadable_entries() {
    let registry = CompatRegistry::from_json(REGISTRY).unwrap();
    assert_eq!(registry.len(), 6);
    assert_eq!(registry.rejected(), ["odd".to_string()]);

    let (_, stats) = build_lookup(&registry, &config(&[Availability::Low, Availability::High], true));
    assert_eq!(stats.malformed, 1);
}

#[test]
fn test_full_scan() {
    let registry = CompatRegistry::from_json(REGISTRY).unwrap();
    let outcome = run_scan(&registry, &config(&[Availability::Low], true), &sources());
    let report = outcome.report;

    let selectors: Vec<&str> = report.entries().iter().map(|e| e.selector.as_str()).collect();
    assert_eq!(
        selectors,
        vec![
            ".card:has(> img)",
            "@container style(--theme: dark)",
            "@container sidebar (min-width: 30em)",
            ".title",
        ]
    );

    let card = &report.entries()[0];
    let ids: Vec<&str> = card.issues.iter().map(|i| i.feature_id.as_str()).collect();
    assert_eq!(ids, vec!["has", "anchor-positioning"]);
    assert_eq!(card.issues[0].browser_compat.get("firefox"), Some(&Some("121".to_string())));

    assert_eq!(report.entries()[1].issues[0].feature_id, "container-style-queries");
    assert_eq!(report.entries()[2].issues[0].feature_id, "container-queries");
    assert_eq!(report.entries()[3].issues[0].property, "position-anchor");
}

#[test]
fn test_high_only_report_is_empty_for_newer_features() {
    let registry = CompatRegistry::from_json(REGISTRY).unwrap();
    let sheet = vec![StyleSource {
        href: None,
        text: ".x:has(p) { anchor-name: --x } @container style(--a: 1) { p { color: red } }".into(),
    }];
    let outcome = run_scan(&registry, &config(&[Availability::High], false), &sheet);
    assert!(outcome.report.is_empty());
    assert_eq!(outcome.report.render_text(), "no compatibility issues found\n");
}

#[test]
fn test_restrictive_status_wins_from_json() {
    let registry = CompatRegistry::from_json(
        r#"{
          "a": { "status": { "baseline": true }, "compat_features": ["css.properties.zoom"] },
          "b": { "status": { "baseline": false }, "compat_features": ["css.properties.zoom"] },
          "c": { "status": { "baseline": "high" }, "compat_features": ["css.properties.zoom"] }
        }"#,
    )
    .unwrap();
    let (lookup, _) = build_lookup(&registry, &config(&[Availability::Low, Availability::High], true));
    let record = lookup.get("zoom").unwrap();
    assert_eq!(record.status, BaselineStatus::NotBaseline);
    assert_eq!(record.feature_id, "b");
}

#[test]
fn test_tie_goes_to_later_entry_in_document() {
    let registry = CompatRegistry::from_json(
        r#"{
          "zeta": { "status": { "baseline": "low" }, "compat_features": ["css.properties.zoom"] },
          "alpha": { "status": { "baseline": "low" }, "compat_features": ["css.properties.zoom"] }
        }"#,
    )
    .unwrap();
    let (lookup, _) = build_lookup(&registry, &config(&[Availability::Low], true));
    assert_eq!(lookup.get("zoom").unwrap().feature_id, "alpha");
}

#[test]
fn test_unparsable_sheet_is_skipped() {
    let registry = CompatRegistry::from_json(REGISTRY).unwrap();
    let mut inputs = sources();
    inputs.insert(
        0,
        StyleSource {
            href: Some("broken.css".into()),
            text: ".a { color: red".into(),
        },
    );
    let outcome = run_scan(&registry, &config(&[Availability::Low], true), &inputs);
    assert_eq!(outcome.parse_failures.len(), 1);
    assert_eq!(outcome.parse_failures[0].0, "broken.css");
    assert_eq!(outcome.report.len(), 4);
}

#[test]
fn test_plan_skips_at_rules() {
    let registry = CompatRegistry::from_json(REGISTRY).unwrap();
    let report = run_scan(&registry, &config(&[Availability::Low], true), &sources()).report;
    let mut sink = PlanSink::default();
    let summary = emit_highlights(&report, &mut sink);

    assert_eq!(summary.applied, 2);
    assert_eq!(summary.skipped_at_rules, 2);
    assert_eq!(sink.marks[0].selector, ".card:has(> img)");
    assert_eq!(sink.marks[0].color, "#e5484d");
}
