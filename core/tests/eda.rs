//! Exploratory statistics over the amount column.

use forensic_core::eda_statistics::{compute_metrics, EdaMetrics};

fn metrics_of(values: &[f64]) -> EdaMetrics {
    let ids: Vec<String> = (0..values.len()).map(|i| format!("r{i}")).collect();
    compute_metrics(ids.iter().map(String::as_str).zip(values.iter().copied()))
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn mean_and_both_variances() {
    let m = metrics_of(&[1.0, 2.0, 3.0, 4.0, 5.0]);

    assert_eq!(m.count, 5);
    assert!(close(m.mean, 3.0));
    assert!(close(m.variance, 2.5));
    assert!(close(m.population_variance, 2.0));
    assert!(close(m.std_dev, 2.5f64.sqrt()));
    assert!(close(m.skewness, 0.0));
    // excess kurtosis of 1..5 with the sample-adjusted formula
    assert!(close(m.kurtosis, -1.2));
}

#[test]
fn sums_counts_and_extremes_track_owners() {
    let m = metrics_of(&[-40.0, 0.0, 15.0, 250.0, 0.0]);

    assert!(close(m.net_sum, 225.0));
    assert!(close(m.absolute_sum, 305.0));
    assert_eq!((m.positive_count, m.negative_count, m.zero_count), (2, 1, 2));
    assert!(close(m.positive_sum, 265.0));
    assert!(close(m.negative_sum, -40.0));
    assert_eq!(m.min_record_id.as_deref(), Some("r0"));
    assert_eq!(m.max_record_id.as_deref(), Some("r3"));
}

#[test]
fn relative_size_factor_needs_a_positive_runner_up() {
    assert!(close(metrics_of(&[10.0, 50.0, 200.0]).relative_size_factor, 4.0));
    assert_eq!(metrics_of(&[-5.0, 0.0]).relative_size_factor, 0.0);
    assert_eq!(metrics_of(&[7.0]).relative_size_factor, 0.0);
}

#[test]
fn higher_moments_need_enough_values() {
    let m = metrics_of(&[1.0, 9.0]);
    assert_eq!(m.skewness, 0.0);
    assert_eq!(m.kurtosis, 0.0);
    assert!(close(m.variance, 32.0));
}

#[test]
fn quartiles_are_index_based() {
    let mut m = metrics_of(&[5.0, 1.0, 3.0, 2.0, 4.0, 100.0, 6.0, 7.0]);
    // ascending: 1 2 3 4 5 6 7 100; floor(8·0.25) = 2, floor(8·0.75) = 6
    assert_eq!(m.quartiles.q1, 3.0);
    assert_eq!(m.quartiles.median, 5.0);
    assert_eq!(m.quartiles.q3, 7.0);
    assert_eq!(m.quartiles.iqr, 4.0);

    m.set_outlier_fence(1.5, 50_000.0);
    assert_eq!(m.quartiles.outlier_threshold, 13.0);
    assert!(!m.quartiles.fallback_used);
}

#[test]
fn zero_iqr_falls_back() {
    let mut m = metrics_of(&[10.0; 12]);
    m.set_outlier_fence(1.5, 50_000.0);
    assert_eq!(m.quartiles.outlier_threshold, 50_000.0);
    assert!(m.quartiles.fallback_used);
}

#[test]
fn empty_input_is_all_zero() {
    let m = metrics_of(&[]);
    assert_eq!(m.count, 0);
    assert_eq!(m.mean, 0.0);
    assert_eq!(m.min_record_id, None);
    assert_eq!(m.quartiles.q3, 0.0);
}
