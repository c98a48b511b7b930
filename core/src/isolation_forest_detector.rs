//! Isolation Forest: unsupervised multivariate anomaly scoring.
//!
//! Five engineered features per record:
//!   0. log10(|amount| + 1)
//!   1. day of week, Sunday = 0   (neutral 3 when the date is missing)
//!   2. hour of day               (neutral 12 when no time is known)
//!   3. length of the unique id
//!   4. category hash: length mod 10 (neutral 5 when missing)
//!
//! Each tree is grown on a random subsample of at most `max_subsample` rows.
//! Anomaly score = 2^(-E[h(x)] / c(ψ)); the threshold is the score at the
//! contamination position of a descending sort.
//!
//! Trees live only for the duration of one `detect` call.

use crate::{
    config::IsolationForestConfig,
    detector::{DetectionContext, ForensicDetector},
    rng::{DetectorRng, RngBank},
    types::{RecordId, RiskLevel},
};
use serde::{Deserialize, Serialize};

// ── Constants ────────────────────────────────────────────────────────────────

pub const FEATURE_COUNT: usize = 5;

const NEUTRAL_DAY_OF_WEEK: f64 = 3.0;
const NEUTRAL_HOUR: f64 = 12.0;
const NEUTRAL_CATEGORY_HASH: f64 = 5.0;

const EULER_GAMMA: f64 = 0.577_215_664_9;

const HIGH_SCORE: f64 = 0.8;
const MEDIUM_SCORE: f64 = 0.7;

/// Average path length of an unsuccessful BST search over `n` points.
pub fn c_factor(n: usize) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    let n = n as f64;
    2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
}

// ── Tree ─────────────────────────────────────────────────────────────────────

enum IsolationTree {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        value: f64,
        left: Box<IsolationTree>,
        right: Box<IsolationTree>,
    },
}

impl IsolationTree {
    fn grow(
        rows: &[[f64; FEATURE_COUNT]],
        indices: Vec<usize>,
        depth: usize,
        max_depth: usize,
        rng: &mut DetectorRng,
    ) -> Self {
        if depth >= max_depth || indices.len() <= 1 {
            return Self::Leaf { size: indices.len() };
        }

        let feature = rng.next_below(FEATURE_COUNT);
        let (min, max) = indices.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
            (lo.min(rows[i][feature]), hi.max(rows[i][feature]))
        });
        if min >= max {
            return Self::Leaf { size: indices.len() };
        }

        let size = indices.len();
        let value = rng.range_f64(min, max);
        let (left, right): (Vec<usize>, Vec<usize>) =
            indices.into_iter().partition(|&i| rows[i][feature] < value);
        if left.is_empty() || right.is_empty() {
            return Self::Leaf { size };
        }

        Self::Split {
            feature,
            value,
            left: Box::new(Self::grow(rows, left, depth + 1, max_depth, rng)),
            right: Box::new(Self::grow(rows, right, depth + 1, max_depth, rng)),
        }
    }

    fn path_length(&self, row: &[f64; FEATURE_COUNT]) -> f64 {
        let mut node = self;
        let mut depth = 0.0;
        loop {
            match node {
                Self::Leaf { size } => return depth + c_factor(*size),
                Self::Split { feature, value, left, right } => {
                    node = if row[*feature] < *value { left } else { right };
                    depth += 1.0;
                }
            }
        }
    }
}

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MlAnomaly {
    pub record_id: RecordId,
    pub score: f64,
    pub risk_level: RiskLevel,
    pub features: [f64; FEATURE_COUNT],
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct IsolationForestAnalysis {
    pub anomalies: Vec<MlAnomaly>,
    pub records_scored: usize,
    pub trees: usize,
    pub subsample_size: usize,
    pub threshold: f64,
    pub average_score: f64,
}

impl IsolationForestAnalysis {
    pub fn anomaly_for(&self, record_id: &str) -> Option<&MlAnomaly> {
        self.anomalies.iter().find(|a| a.record_id == record_id)
    }
}

// ── Detector ─────────────────────────────────────────────────────────────────

pub struct IsolationForestDetector;

impl ForensicDetector for IsolationForestDetector {
    type Output = IsolationForestAnalysis;

    fn name(&self) -> &'static str {
        "isolation_forest"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> IsolationForestAnalysis {
        let config = &ctx.config.isolation_forest;
        if !ctx.mapping.has_monetary() {
            log::warn!("isolation forest skipped: no monetary column mapped");
            return IsolationForestAnalysis::default();
        }

        let (ids, rows) = feature_rows(ctx);
        if rows.len() < config.min_records {
            log::warn!(
                "isolation forest skipped: {} feature rows (< {})",
                rows.len(),
                config.min_records
            );
            return IsolationForestAnalysis::default();
        }

        let scores = score_rows(&rows, config);
        let threshold = anomaly_threshold(&scores, config);

        let mut anomalies: Vec<MlAnomaly> = ids
            .iter()
            .zip(rows.iter().zip(&scores))
            .filter(|(_, (_, score))| **score > threshold)
            .map(|(id, (features, score))| MlAnomaly {
                record_id: (*id).to_string(),
                score: *score,
                risk_level: tier(*score),
                features: *features,
            })
            .collect();
        anomalies.sort_by(|a, b| b.score.total_cmp(&a.score));

        let average_score = scores.iter().sum::<f64>() / scores.len() as f64;
        log::debug!(
            "isolation forest: {} rows, threshold {:.3}, {} anomalies",
            rows.len(),
            threshold,
            anomalies.len()
        );

        IsolationForestAnalysis {
            anomalies,
            records_scored: rows.len(),
            trees: config.trees,
            subsample_size: rows.len().min(config.max_subsample),
            threshold,
            average_score,
        }
    }
}

/// Build the feature matrix. Rows whose amount is not finite are skipped.
fn feature_rows<'a>(ctx: &DetectionContext<'a>) -> (Vec<&'a str>, Vec<[f64; FEATURE_COUNT]>) {
    let mapping = ctx.mapping;
    let mut ids = Vec::new();
    let mut rows = Vec::new();

    for (index, record) in ctx.records.iter().enumerate() {
        let amount = record.monetary_value;
        if !amount.is_finite() {
            continue;
        }
        let day = ctx
            .date(index)
            .map(|d| d.weekday_index() as f64)
            .unwrap_or(NEUTRAL_DAY_OF_WEEK);
        let hour = ctx.hour(index).map(f64::from).unwrap_or(NEUTRAL_HOUR);
        let id_length = record
            .text(mapping.unique_id())
            .unwrap_or_else(|| record.id.clone())
            .chars()
            .count() as f64;
        let category_hash = record
            .text(mapping.category())
            .map(|c| (c.chars().count() % 10) as f64)
            .unwrap_or(NEUTRAL_CATEGORY_HASH);

        ids.push(record.id.as_str());
        rows.push([(amount.abs() + 1.0).log10(), day, hour, id_length, category_hash]);
    }

    (ids, rows)
}

/// Grow the forest and score every row against it.
pub fn score_rows(rows: &[[f64; FEATURE_COUNT]], config: &IsolationForestConfig) -> Vec<f64> {
    let subsample = rows.len().min(config.max_subsample);
    if subsample < 2 || config.trees == 0 {
        return vec![0.0; rows.len()];
    }
    let max_depth = (subsample as f64).log2().ceil() as usize;
    let bank = RngBank::new(config.seed);

    let forest: Vec<IsolationTree> = (0..config.trees)
        .map(|t| {
            let mut rng = bank.for_tree(t);
            let sample = rng.sample_indices(rows.len(), subsample);
            IsolationTree::grow(rows, sample, 0, max_depth, &mut rng)
        })
        .collect();

    let normalizer = c_factor(subsample);
    rows.iter()
        .map(|row| {
            let avg_path = forest.iter().map(|tree| tree.path_length(row)).sum::<f64>()
                / forest.len() as f64;
            2f64.powf(-avg_path / normalizer)
        })
        .collect()
}

/// Score at the contamination position of a descending sort.
fn anomaly_threshold(scores: &[f64], config: &IsolationForestConfig) -> f64 {
    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));
    let position = (sorted.len() as f64 * config.contamination).floor() as usize;
    sorted
        .get(position)
        .copied()
        .filter(|s| s.is_finite())
        .unwrap_or(config.fallback_threshold)
}

fn tier(score: f64) -> RiskLevel {
    if score > HIGH_SCORE {
        RiskLevel::High
    } else if score > MEDIUM_SCORE {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn c_factor_matches_reference_values() {
        assert_eq!(c_factor(0), 0.0);
        assert_eq!(c_factor(1), 0.0);
        // c(2) = 2(ln 1 + γ) − 1 = 2γ − 1
        assert!((c_factor(2) - (2.0 * EULER_GAMMA - 1.0)).abs() < 1e-12);
        assert!(c_factor(256) > c_factor(100));
    }

    #[test]
    fn isolated_point_scores_highest() {
        let mut rows: Vec<[f64; FEATURE_COUNT]> = (0..40)
            .map(|i| [2.0 + (i % 5) as f64 * 0.01, 3.0, 12.0, 6.0, 5.0])
            .collect();
        rows.push([6.0, 0.0, 3.0, 14.0, 1.0]);

        let config = IsolationForestConfig { seed: 9, ..IsolationForestConfig::default() };
        let scores = score_rows(&rows, &config);
        let (best, _) = scores
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .unwrap();
        assert_eq!(best, 40);
    }
}
