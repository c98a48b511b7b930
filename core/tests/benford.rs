//! Benford's Law: basic leading-digit test and the enhanced digit tests.

use forensic_core::{
    benford_analyzer::{
        analyze_values, first_digit_probability, BenfordPatternKind, Conformity, LeadingDigitCounts,
    },
    config::BenfordConfig,
    types::RiskLevel,
};

/// Values spread log-uniformly over three decades follow Benford closely.
fn log_uniform(n: usize) -> Vec<f64> {
    (0..n).map(|k| 10f64.powf(1.0 + 3.0 * k as f64 / n as f64)).collect()
}

#[test]
fn first_digit_probabilities_sum_to_one() {
    let total: f64 = (1..=9).map(first_digit_probability).sum();
    assert!((total - 1.0).abs() < 1e-12, "got {total}");
    assert!((first_digit_probability(1) - 0.30103).abs() < 1e-5);
}

#[test]
fn basic_test_flags_overrepresented_leading_digit() {
    let mut counts = LeadingDigitCounts::default();
    for amount in [100.0, 120.0, 150.0, 1_999.0, 17.0, 1.5, 130.0, 110.0, 250.0, 900.0] {
        counts.observe(amount);
    }
    assert_eq!(counts.total(), 10);
    assert_eq!(counts.count(1), 8);
    // 80% observed vs 30.1% expected
    assert!(counts.is_anomalous(140.0, 5.0));

    let summary = counts.summary(5.0);
    assert_eq!(summary.digits.len(), 9);
    assert!(summary.digits[0].flagged);
}

#[test]
fn basic_test_ignores_zero_and_counts_negatives_by_magnitude() {
    let mut counts = LeadingDigitCounts::default();
    counts.observe(0.0);
    counts.observe(-300.0);
    assert_eq!(counts.total(), 1);
    assert_eq!(counts.count(3), 1);
}

/// Fewer than 30 positive values: empty digit lists, CLOSE, no patterns.
#[test]
fn small_samples_return_empty_analysis() {
    let values: Vec<f64> = (1..=29).map(|v| v as f64 * 37.0).collect();
    let analysis = analyze_values(&values, &BenfordConfig::default());

    assert!(analysis.is_empty());
    assert_eq!(analysis.sample_size, 29);
    assert!(analysis.first_digit.digits.is_empty());
    assert_eq!(analysis.first_digit.conformity, Conformity::Close);
    assert!(analysis.patterns.is_empty());
    assert_eq!(analysis.overall_risk, RiskLevel::Low);
}

#[test]
fn negative_and_zero_values_do_not_count_toward_the_minimum() {
    let mut values = vec![0.0; 20];
    values.extend((0..20).map(|v| -(v as f64) - 10.0));
    values.extend(log_uniform(25));
    let analysis = analyze_values(&values, &BenfordConfig::default());
    assert!(analysis.is_empty());
    assert_eq!(analysis.sample_size, 25);
}

#[test]
fn benford_distributed_sample_conforms() {
    let analysis = analyze_values(&log_uniform(1_000), &BenfordConfig::default());

    assert_eq!(analysis.first_digit.digits.len(), 9);
    assert_eq!(analysis.second_digit.digits.len(), 10);
    assert_eq!(analysis.first_two_digits.digits.len(), 90);
    assert_eq!(analysis.first_digit.conformity, Conformity::Close);
    assert!(analysis.first_digit.mad < 0.6, "mad = {}", analysis.first_digit.mad);
    assert!(!analysis
        .patterns
        .iter()
        .any(|p| matches!(p.kind, BenfordPatternKind::LowDigitDeficit | BenfordPatternKind::HighDigitExcess)));
}

/// Every amount starting with 9 is as far from Benford as data gets.
#[test]
fn skewed_sample_raises_composite_patterns() {
    let values: Vec<f64> = (0..60).map(|i| 900.0 + i as f64).collect();
    let analysis = analyze_values(&values, &BenfordConfig::default());

    assert_eq!(analysis.first_digit.conformity, Conformity::Nonconformity);
    assert_eq!(analysis.first_digit.risk_level, RiskLevel::High);
    assert!(analysis.first_digit.suspicious_digits().contains(&9));
    assert!(analysis.first_digit.significance < 1e-6);

    let kinds: Vec<BenfordPatternKind> = analysis.patterns.iter().map(|p| p.kind).collect();
    assert!(kinds.contains(&BenfordPatternKind::FirstDigitDeviation));
    assert!(kinds.contains(&BenfordPatternKind::LowDigitDeficit));
    assert!(kinds.contains(&BenfordPatternKind::HighDigitExcess));
    assert_eq!(analysis.overall_risk, RiskLevel::High);
}

#[test]
fn rounded_second_digits_raise_rounding_pattern() {
    // 1000, 1500, 2000, ... 9500: second digit is always 0 or 5
    let values: Vec<f64> = (0..72)
        .map(|i| ((i % 9) + 1) as f64 * 1000.0 + if i % 2 == 0 { 0.0 } else { 500.0 })
        .collect();
    let analysis = analyze_values(&values, &BenfordConfig::default());

    let rounding = analysis
        .patterns
        .iter()
        .find(|p| p.kind == BenfordPatternKind::SecondDigitRounding)
        .expect("rounding pattern");
    assert_eq!(rounding.risk_level, RiskLevel::High);
    assert_eq!(rounding.digits, vec![0, 5]);
}
