//! THE MOST IMPORTANT TEST IN THE PROJECT.
//!
//! Two engines, same seed, same population.
//! They must produce byte-identical serialized results.
//! Any divergence is a blocker; do not merge until fixed.

use forensic_core::{
    config::ForensicConfig,
    engine::RiskEngine,
    record::{ColumnMapping, Record},
};

fn population() -> Vec<Record> {
    (0..300)
        .map(|i: usize| {
            let amount = if i % 50 == 0 {
                250_000.0 + i as f64
            } else {
                (i as f64 * 7_919.0) % 12_000.0 + 15.0
            };
            Record::new(format!("JE-{i:05}"))
                .with_field("amount", amount)
                .with_field("posted", format!("2024-{:02}-{:02} {:02}:{:02}", 1 + i % 12, 1 + i % 28, i % 24, i % 60))
                .with_field("category", ["Travel", "Payroll", "Capex", "Misc"][i % 4])
                .with_field("user", format!("user{}", i % 9))
                .with_field("vendor", format!("Vendor {}", i % 17))
        })
        .collect()
}

fn mapping() -> ColumnMapping {
    ColumnMapping {
        monetary_value: Some("amount".into()),
        date: Some("posted".into()),
        category: Some("category".into()),
        user: Some("user".into()),
        vendor: Some("vendor".into()),
        ..ColumnMapping::default()
    }
}

fn run(seed: u64) -> String {
    let mut config = ForensicConfig::default_test();
    config.isolation_forest.seed = seed;
    let engine = RiskEngine::new(config).expect("valid config");
    let result = engine.analyze(population(), &mapping());
    serde_json::to_string(&result).expect("serialize result")
}

#[test]
fn same_seed_produces_identical_results() {
    const SEED: u64 = 0xDEAD_BEEF_CAFE_1234;

    let a = run(SEED);
    let b = run(SEED);

    assert_eq!(a.len(), b.len(), "Result lengths differ: {} vs {}", a.len(), b.len());
    if let Some(i) = a.bytes().zip(b.bytes()).position(|(x, y)| x != y) {
        let lo = i.saturating_sub(80);
        panic!(
            "Results diverged at byte {i}:\n  A: {}\n  B: {}",
            &a[lo..(i + 80).min(a.len())],
            &b[lo..(i + 80).min(b.len())]
        );
    }
}

#[test]
fn forest_scores_depend_on_the_seed() {
    let scores = |seed: u64| {
        let mut config = ForensicConfig::default_test();
        config.isolation_forest.seed = seed;
        let result = RiskEngine::new(config).expect("valid config").analyze(population(), &mapping());
        result.advanced.isolation_forest.average_score
    };
    assert_ne!(scores(1), scores(2));
}

#[test]
fn reanalyzing_scored_records_gives_the_same_result() {
    let engine = RiskEngine::new(ForensicConfig::default_test()).expect("valid config");
    let first = engine.analyze(population(), &mapping());
    let second = engine.analyze(first.records.clone(), &mapping());
    assert_eq!(first, second);
}
