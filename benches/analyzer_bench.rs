//! Benchmark for stylesheet parsing and compatibility analysis.

use std::hint::black_box;

use autoscript::compat::{analyze, build_lookup, AnalysisConfig, CompatRegistry, RegistryFeature};
use autoscript::css::parse_stylesheet;
use criterion::{criterion_group, criterion_main, Criterion};
use serde_json::json;

fn registry() -> CompatRegistry {
    let mut features = vec![
        RegistryFeature::new("has", json!("low"), &["css.selectors.has"]),
        RegistryFeature::new("subgrid", json!("low"), &["css.properties.grid-template-columns.subgrid"]),
        RegistryFeature::new("oklch", json!("low"), &["css.types.color.oklch"]),
        RegistryFeature::new("anchor", json!(false), &["css.properties.anchor-name"]),
        RegistryFeature::new("container-queries", json!("low"), &["css.at-rules.container"]),
    ];
    for i in 0..500 {
        features.push(RegistryFeature::new(
            format!("filler-{i}"),
            json!("high"),
            &[format!("css.properties.filler-{i}").as_str()],
        ));
    }
    CompatRegistry::new(features)
}

fn stylesheet(rules: usize) -> String {
    let mut css = String::new();
    for i in 0..rules {
        css.push_str(&format!(
            ".card-{i}:has(img) {{ display: grid; grid-template-columns: subgrid; color: oklch(70% 0.1 {i}); margin: 0 auto; }}\n\
             @container c{i} (min-width: {i}px) {{ .t-{i} {{ anchor-name: --a{i}; padding: 1rem 2rem; }} }}\n"
        ));
    }
    css
}

fn benchmark_parse(c: &mut Criterion) {
    let css = stylesheet(200);
    c.bench_function("parse stylesheet (400 rules)", |b| {
        b.iter(|| black_box(parse_stylesheet(black_box(&css)).unwrap()));
    });
}

fn benchmark_lookup(c: &mut Criterion) {
    let registry = registry();
    let config = AnalysisConfig::default();
    c.bench_function("build lookup (505 features)", |b| {
        b.iter(|| black_box(build_lookup(black_box(&registry), &config)));
    });
}

fn benchmark_analyze(c: &mut Criterion) {
    let registry = registry();
    let config = AnalysisConfig::default();
    let (lookup, _) = build_lookup(&registry, &config);
    let sheet = parse_stylesheet(&stylesheet(200)).unwrap();
    c.bench_function("analyze stylesheet (400 rules)", |b| {
        b.iter(|| black_box(analyze(black_box(&sheet), &lookup, &config)));
    });
}

criterion_group!(benches, benchmark_parse, benchmark_lookup, benchmark_analyze);
criterion_main!(benches);
