//! Splitting (structuring) detection over 30-day vendor windows.

use forensic_core::{
    config::ForensicConfig,
    detector::{DetectionContext, ForensicDetector},
    record::{ColumnMapping, Record},
    splitting_detector::{SplittingAnalysis, SplittingDetector},
    types::RiskLevel,
};

fn payment(id: &str, vendor: &str, amount: f64, date: &str) -> Record {
    let mut record = Record::new(id)
        .with_field("vendor", vendor)
        .with_field("amount", amount)
        .with_field("date", date);
    record.monetary_value = amount;
    record
}

fn mapping() -> ColumnMapping {
    ColumnMapping {
        vendor: Some("vendor".into()),
        monetary_value: Some("amount".into()),
        date: Some("date".into()),
        ..ColumnMapping::default()
    }
}

fn detect(records: &[Record], mapping: &ColumnMapping) -> SplittingAnalysis {
    let config = ForensicConfig::default_test();
    let ctx = DetectionContext::new(records, mapping, &config);
    SplittingDetector.detect(&ctx)
}

/// Three $9,000 payments in five days: $27,000 total, each under 90% of $25,000.
#[test]
fn three_payments_below_threshold_are_flagged() {
    let records = vec![
        payment("a", "Acme Supplies", 9_000.0, "2024-03-01"),
        payment("b", "Acme Supplies", 9_000.0, "2024-03-03"),
        payment("c", "Acme Supplies", 9_000.0, "2024-03-05"),
    ];
    let analysis = detect(&records, &mapping());

    assert_eq!(analysis.groups.len(), 1);
    let group = &analysis.groups[0];
    assert_eq!(group.vendor, "Acme Supplies");
    assert_eq!(group.members.len(), 3);
    assert_eq!(group.total_amount, 27_000.0);
    assert!(group.evaded_threshold.is_some(), "reasons: {:?}", group.reasons);
    assert!(group.risk_score >= 30, "score {}", group.risk_score);
    assert!(group.reasons.iter().any(|r| r.contains("threshold")));
    // evasion 30 + uniform 15 + cluster 20 + just below 10,000 10
    assert_eq!(group.risk_score, 75);
    assert_eq!(group.risk_level, RiskLevel::High);
    assert_eq!(analysis.high_risk_groups, 1);
    assert!(analysis.group_for("b").is_some());
}

/// Only the first threshold the window evades scores; later ones are not scanned.
#[test]
fn first_matching_threshold_wins() {
    let records = vec![
        payment("a", "Globex", 600.0, "2024-01-10"),
        payment("b", "Globex", 700.0, "2024-01-20"),
    ];
    let analysis = detect(&records, &mapping());

    let group = &analysis.groups[0];
    assert_eq!(group.evaded_threshold, Some(1_000.0));
    assert_eq!(group.risk_score, 30);
    assert_eq!(group.risk_level, RiskLevel::Medium);
}

#[test]
fn payments_more_than_thirty_days_apart_never_share_a_window() {
    let records = vec![
        payment("a", "Initech", 800.0, "2024-01-01"),
        payment("b", "Initech", 800.0, "2024-02-15"),
    ];
    let analysis = detect(&records, &mapping());
    assert!(analysis.groups.is_empty());
    assert_eq!(analysis.vendors_analyzed, 1);
}

#[test]
fn vendors_are_scored_independently() {
    let records = vec![
        payment("a", "Acme", 600.0, "2024-01-10"),
        payment("b", "Globex", 700.0, "2024-01-11"),
    ];
    let analysis = detect(&records, &mapping());
    assert!(analysis.groups.is_empty());
    assert_eq!(analysis.vendors_analyzed, 2);
}

#[test]
fn unmapped_columns_return_empty_result() {
    let records = vec![
        payment("a", "Acme", 9_000.0, "2024-03-01"),
        payment("b", "Acme", 9_000.0, "2024-03-02"),
    ];
    let no_vendor = ColumnMapping { vendor: None, ..mapping() };
    let no_date = ColumnMapping { date: None, ..mapping() };

    assert_eq!(detect(&records, &no_vendor), SplittingAnalysis::default());
    assert_eq!(detect(&records, &no_date), SplittingAnalysis::default());
}
