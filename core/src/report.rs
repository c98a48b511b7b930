//! Analysis output handed to reporting and persistence collaborators.

use crate::{
    actor_profiler::ActorAnalysis,
    benford_analyzer::{BasicBenfordSummary, EnhancedBenfordAnalysis},
    eda_statistics::EdaMetrics,
    entropy::EntropyAnalysis,
    isolation_forest_detector::IsolationForestAnalysis,
    record::Record,
    sequential_analyzer::SequentialAnalysis,
    splitting_detector::SplittingAnalysis,
    types::{RiskFactor, RiskLevel},
};
use serde::{Deserialize, Serialize};

/// Fixed score histogram buckets: (label, inclusive min, inclusive max).
pub const SCORE_BUCKETS: [(&str, u32, Option<u32>); 4] = [
    ("0-20", 0, Some(20)),
    ("21-40", 21, Some(40)),
    ("41-60", 41, Some(60)),
    (">60", 61, None),
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreBucket {
    pub label: String,
    pub min: u32,
    pub max: Option<u32>,
    pub count: usize,
}

impl ScoreBucket {
    pub fn contains(&self, score: u32) -> bool {
        score >= self.min && self.max.map_or(true, |max| score <= max)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FactorCount {
    pub factor: RiskFactor,
    pub label: String,
    pub count: usize,
    pub severity: RiskLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskProfile {
    pub total_records: usize,
    pub total_score: u64,
    pub average_score: f64,
    pub alert_count: usize,
    pub score_distribution: Vec<ScoreBucket>,
    pub factor_counts: Vec<FactorCount>,
}

impl RiskProfile {
    pub fn build(records: &[Record], alert_count: usize) -> Self {
        let mut score_distribution: Vec<ScoreBucket> = SCORE_BUCKETS
            .iter()
            .map(|(label, min, max)| ScoreBucket {
                label: label.to_string(),
                min: *min,
                max: *max,
                count: 0,
            })
            .collect();

        let mut total_score = 0u64;
        for record in records {
            total_score += u64::from(record.risk_score);
            if let Some(bucket) = score_distribution.iter_mut().find(|b| b.contains(record.risk_score)) {
                bucket.count += 1;
            }
        }

        let factor_counts = RiskFactor::ALL
            .iter()
            .map(|factor| FactorCount {
                factor: *factor,
                label: factor.label().to_string(),
                count: records.iter().filter(|r| r.has_factor(*factor)).count(),
                severity: factor.severity(),
            })
            .collect();

        let average_score = if records.is_empty() {
            0.0
        } else {
            total_score as f64 / records.len() as f64
        };

        Self {
            total_records: records.len(),
            total_score,
            average_score,
            alert_count,
            score_distribution,
            factor_counts,
        }
    }

    pub fn factor_count(&self, factor: RiskFactor) -> usize {
        self.factor_counts
            .iter()
            .find(|f| f.factor == factor)
            .map_or(0, |f| f.count)
    }
}

/// One summary block per detector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AdvancedAnalysis {
    pub basic_benford: BasicBenfordSummary,
    pub enhanced_benford: EnhancedBenfordAnalysis,
    pub splitting: SplittingAnalysis,
    pub sequential: SequentialAnalysis,
    pub isolation_forest: IsolationForestAnalysis,
    pub actors: ActorAnalysis,
    pub entropy: EntropyAnalysis,
    pub eda: EdaMetrics,
    pub duplicate_keys: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskAnalysisResult {
    pub records: Vec<Record>,
    pub profile: RiskProfile,
    pub advanced: AdvancedAnalysis,
}
