//! Exploratory data analysis: descriptive statistics of the amount column.
//!
//! Single pass for sums, counts and extremes; a second pass for central
//! moments; then the IQR fence used by the engine's final outlier pass.

use crate::{record::Record, types::RecordId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EdaMetrics {
    pub count: usize,
    pub net_sum: f64,
    pub absolute_sum: f64,
    pub positive_count: usize,
    pub positive_sum: f64,
    pub negative_count: usize,
    pub negative_sum: f64,
    pub zero_count: usize,
    pub min_value: f64,
    pub min_record_id: Option<RecordId>,
    pub max_value: f64,
    pub max_record_id: Option<RecordId>,
    pub mean: f64,
    /// Sample variance (n − 1 denominator).
    pub variance: f64,
    pub std_dev: f64,
    /// Population variance (n denominator).
    pub population_variance: f64,
    pub population_std_dev: f64,
    /// Adjusted Fisher-Pearson coefficient; 0 when n <= 2.
    pub skewness: f64,
    /// Excess kurtosis; 0 when n <= 3.
    pub kurtosis: f64,
    /// Largest / second-largest value; 0 when undefined.
    pub relative_size_factor: f64,
    pub quartiles: Quartiles,
}

/// Index-based quartiles and the outlier fence derived from them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Quartiles {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub iqr: f64,
    pub outlier_threshold: f64,
    /// True when IQR was zero and the high-value fallback was used.
    pub fallback_used: bool,
    pub outlier_count: usize,
}

/// Compute all descriptive statistics over `(record id, amount)` pairs.
pub fn compute_metrics<'a>(values: impl IntoIterator<Item = (&'a str, f64)>) -> EdaMetrics {
    let mut m = EdaMetrics::default();
    let mut amounts = Vec::new();

    for (id, value) in values {
        if !value.is_finite() {
            continue;
        }
        m.count += 1;
        m.net_sum += value;
        m.absolute_sum += value.abs();
        if value > 0.0 {
            m.positive_count += 1;
            m.positive_sum += value;
        } else if value < 0.0 {
            m.negative_count += 1;
            m.negative_sum += value;
        } else {
            m.zero_count += 1;
        }
        if m.min_record_id.is_none() || value < m.min_value {
            m.min_value = value;
            m.min_record_id = Some(id.to_string());
        }
        if m.max_record_id.is_none() || value > m.max_value {
            m.max_value = value;
            m.max_record_id = Some(id.to_string());
        }
        amounts.push(value);
    }

    if m.count == 0 {
        return m;
    }

    let n = m.count as f64;
    m.mean = m.net_sum / n;

    let (sq, cube, quad) = amounts.iter().fold((0.0, 0.0, 0.0), |(s2, s3, s4), x| {
        let d = x - m.mean;
        (s2 + d * d, s3 + d.powi(3), s4 + d.powi(4))
    });

    m.population_variance = sq / n;
    m.population_std_dev = m.population_variance.sqrt();
    if m.count > 1 {
        m.variance = sq / (n - 1.0);
        m.std_dev = m.variance.sqrt();
    }

    let s = m.std_dev;
    if m.count > 2 && s > 0.0 {
        m.skewness = n / ((n - 1.0) * (n - 2.0)) * (cube / s.powi(3));
    }
    if m.count > 3 && s > 0.0 {
        m.kurtosis = n * (n + 1.0) / ((n - 1.0) * (n - 2.0) * (n - 3.0)) * (quad / s.powi(4))
            - 3.0 * (n - 1.0).powi(2) / ((n - 2.0) * (n - 3.0));
    }

    amounts.sort_by(f64::total_cmp);
    if amounts.len() >= 2 {
        let largest = amounts[amounts.len() - 1];
        let second = amounts[amounts.len() - 2];
        if second > 0.0 {
            m.relative_size_factor = largest / second;
        }
    }

    let len = amounts.len();
    let at = |p: f64| amounts[((len as f64 * p).floor() as usize).min(len - 1)];
    m.quartiles.q1 = at(0.25);
    m.quartiles.median = at(0.5);
    m.quartiles.q3 = at(0.75);
    m.quartiles.iqr = m.quartiles.q3 - m.quartiles.q1;

    m
}

/// Metrics over the engine's parsed amounts.
pub fn metrics_for_records(records: &[Record]) -> EdaMetrics {
    compute_metrics(records.iter().map(|r| (r.id.as_str(), r.monetary_value)))
}

impl EdaMetrics {
    /// Fix the outlier fence: Q3 + k·IQR, or `fallback` when IQR is zero.
    pub fn set_outlier_fence(&mut self, fence_multiplier: f64, fallback: f64) {
        let q = &mut self.quartiles;
        if q.iqr > 0.0 {
            q.outlier_threshold = q.q3 + fence_multiplier * q.iqr;
            q.fallback_used = false;
        } else {
            q.outlier_threshold = fallback;
            q.fallback_used = true;
        }
    }
}
