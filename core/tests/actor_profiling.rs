//! Actor behavior profiling: per-user habits and cross-user patterns.

use chrono::NaiveDate;
use forensic_core::{
    actor_profiler::{longest_daily_streak, ActorAnalysis, ActorPatternKind, ActorProfiler},
    config::ForensicConfig,
    detector::{DetectionContext, ForensicDetector},
    record::{ColumnMapping, Record},
    types::RiskLevel,
};

fn posting(id: &str, user: &str, amount: f64, timestamp: &str) -> Record {
    let mut record = Record::new(id)
        .with_field("user", user)
        .with_field("amount", amount)
        .with_field("entered_at", timestamp);
    record.monetary_value = amount;
    record
}

fn mapping() -> ColumnMapping {
    ColumnMapping {
        user: Some("user".into()),
        monetary_value: Some("amount".into()),
        timestamp: Some("entered_at".into()),
        ..ColumnMapping::default()
    }
}

fn profile(records: &[Record]) -> ActorAnalysis {
    let mapping = mapping();
    let config = ForensicConfig::default_test();
    let ctx = DetectionContext::new(records, &mapping, &config);
    ActorProfiler.detect(&ctx)
}

/// Ten ordinary weekday postings by alice, one by bob, four weekend-night
/// round duplicates by night_owl.
fn office() -> Vec<Record> {
    let mut records: Vec<Record> = (0..10)
        .map(|i| {
            let day = 4 + i / 2;
            posting(&format!("a{i}"), "alice", 101.37 + i as f64, &format!("2024-03-{day:02} 10:00"))
        })
        .collect();
    records.push(posting("b0", "bob", 250.0, "2024-03-05 11:00"));
    for (i, ts) in ["2024-03-16 23:00", "2024-03-17 23:15", "2024-03-23 22:40", "2024-03-24 23:55"]
        .iter()
        .enumerate()
    {
        records.push(posting(&format!("n{i}"), "night_owl", 500.0, ts));
    }
    records
}

#[test]
fn weekend_night_actor_is_high_risk() {
    let analysis = profile(&office());

    assert_eq!(analysis.total_actors, 3);
    assert_eq!(analysis.actors_profiled, 2);
    assert_eq!(analysis.suspicious_actors.len(), 1);

    let owl = analysis.actor("night_owl").expect("night_owl profiled");
    assert_eq!(owl.transaction_count, 4);
    assert_eq!(owl.total_amount, 2_000.0);
    assert_eq!(owl.time_patterns.weekend_count, 4);
    assert_eq!(owl.time_patterns.off_hours_count, 4);
    assert_eq!(owl.time_patterns.max_consecutive_days, 2);
    assert_eq!(owl.amount_patterns.round_count, 4);
    assert_eq!(owl.amount_patterns.duplicate_count, 4);
    assert_eq!(owl.amount_patterns.high_value_count, 4);
    // weekend 15 + off-hours 20 + round 15 + high-value 20 + duplicates 25
    assert_eq!(owl.risk_score, 95);
    assert_eq!(owl.risk_level, RiskLevel::High);
    assert_eq!(owl.reasons.len(), 5);
}

#[test]
fn ordinary_and_single_posting_actors_are_not_listed() {
    let analysis = profile(&office());
    assert!(analysis.actor("alice").is_none());
    assert!(analysis.actor("bob").is_none());
}

#[test]
fn dominant_actor_raises_concentration_pattern() {
    let analysis = profile(&office());
    let concentration = analysis
        .patterns
        .iter()
        .find(|p| p.kind == ActorPatternKind::ActivityConcentration)
        .expect("alice holds 10 of 15 postings");
    assert_eq!(concentration.actors, vec!["alice".to_string()]);
    assert_eq!(concentration.risk_level, RiskLevel::Medium);
}

/// 06:00 and 20:00 sit inside business hours for the actor profiler.
#[test]
fn actor_off_hours_bounds_are_exclusive() {
    let records = vec![
        posting("e0", "edge", 300.0, "2024-03-05 20:00"),
        posting("e1", "edge", 300.0, "2024-03-06 06:00"),
    ];
    let analysis = profile(&records);
    let edge = analysis.actor("edge").expect("round duplicates are scored");
    assert_eq!(edge.time_patterns.off_hours_count, 0);
}

#[test]
fn high_volume_actor_is_flagged() {
    let mut records: Vec<Record> = (0..20)
        .map(|i| posting(&format!("h{i}"), "heavy", 40.0 + i as f64, "2024-03-05 09:00"))
        .collect();
    for i in 0..5 {
        records.push(posting(&format!("l{i}"), &format!("light{i}"), 75.0, "2024-03-05 09:00"));
    }
    let analysis = profile(&records);

    let volume = analysis
        .patterns
        .iter()
        .find(|p| p.kind == ActorPatternKind::HighVolume)
        .expect("heavy posts 20 vs an average of ~4");
    assert_eq!(volume.actors, vec!["heavy".to_string()]);
    assert_eq!(volume.risk_level, RiskLevel::High);
}

#[test]
fn many_weekend_actors_form_a_cluster() {
    let records: Vec<Record> = (0..4)
        .map(|i| posting(&format!("w{i}"), &format!("clerk{i}"), 80.0 + i as f64, "2024-03-16 12:00"))
        .collect();
    let analysis = profile(&records);

    let cluster = analysis
        .patterns
        .iter()
        .find(|p| p.kind == ActorPatternKind::WeekendCluster)
        .expect("four weekend actors");
    assert_eq!(cluster.actors.len(), 4);
    assert_eq!(cluster.risk_level, RiskLevel::Medium);
}

#[test]
fn longest_streak_counts_unique_consecutive_days() {
    let d = |day| NaiveDate::from_ymd_opt(2024, 3, day).unwrap();
    assert_eq!(longest_daily_streak(&[]), 0);
    assert_eq!(longest_daily_streak(&[d(5), d(5), d(6), d(7), d(9)]), 3);
    assert_eq!(longest_daily_streak(&[d(9), d(1), d(2)]), 2);
}

#[test]
fn unmapped_user_column_returns_empty_result() {
    let records = office();
    let mapping = ColumnMapping { user: None, ..mapping() };
    let config = ForensicConfig::default_test();
    let ctx = DetectionContext::new(&records, &mapping, &config);

    assert_eq!(ActorProfiler.detect(&ctx), ActorAnalysis::default());
}

/// The high-value ratio is measured against the actor's own amounts: a clerk
/// whose largest posting dwarfs their others is flagged even though every
/// amount sits far below the rest of the population.
#[test]
fn high_value_share_uses_the_actors_own_top_decile() {
    let mut records = vec![
        posting("x0", "x", 137.0, "2024-03-05 09:00"),
        posting("x1", "x", 251.0, "2024-03-06 09:30"),
        posting("x2", "x", 4_999.0, "2024-03-07 10:00"),
    ];
    for i in 0..30 {
        records.push(posting(
            &format!("p{i}"),
            &format!("payer{i}"),
            20_011.0 + i as f64 * 7.0,
            "2024-03-05 11:00",
        ));
    }
    let analysis = profile(&records);

    let x = analysis.actor("x").expect("own top decile holds 1 of 3 postings");
    assert_eq!(x.amount_patterns.high_value_count, 1);
    assert_eq!(x.risk_score, 20);
    assert_eq!(x.risk_level, RiskLevel::Low);
}

#[test]
fn single_actor_holds_all_activity() {
    let records = vec![
        posting("s0", "solo", 120.5, "2024-03-05 09:00"),
        posting("s1", "solo", 88.25, "2024-03-06 09:00"),
        posting("s2", "solo", 61.75, "2024-03-07 09:00"),
    ];
    let analysis = profile(&records);

    let concentration = analysis
        .patterns
        .iter()
        .find(|p| p.kind == ActorPatternKind::ActivityConcentration)
        .expect("one actor holds 100% of postings");
    assert_eq!(concentration.actors, vec!["solo".to_string()]);
    assert_eq!(concentration.risk_level, RiskLevel::High);
}
