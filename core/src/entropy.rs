//! Categorical entropy: collaborator contract.
//!
//! The entropy analyzer is an external component. The engine only consumes
//! its anomalous category combinations; the information-theoretic values are
//! passed through to the report untouched.

use crate::{
    record::{ColumnMapping, Record},
    types::RiskLevel,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnomalousCategory {
    /// `category|subcategory`, matching `ColumnMapping::category_combination`.
    pub combination: String,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct EntropyAnalysis {
    pub category_entropy: f64,
    pub subcategory_entropy: f64,
    pub conditional_entropy: f64,
    pub mutual_information: f64,
    pub information_gain: f64,
    pub anomalous_categories: Vec<AnomalousCategory>,
}

pub trait EntropyAnalyzer {
    fn analyze(&self, records: &[Record], mapping: &ColumnMapping, threshold: f64) -> EntropyAnalysis;
}

/// Default collaborator when none is wired in: no findings.
pub struct NoEntropyAnalyzer;

impl EntropyAnalyzer for NoEntropyAnalyzer {
    fn analyze(&self, _records: &[Record], _mapping: &ColumnMapping, _threshold: f64) -> EntropyAnalysis {
        EntropyAnalysis::default()
    }
}

/// Fixed findings, for callers that computed entropy elsewhere.
pub struct PrecomputedEntropy(pub EntropyAnalysis);

impl EntropyAnalyzer for PrecomputedEntropy {
    fn analyze(&self, _records: &[Record], _mapping: &ColumnMapping, _threshold: f64) -> EntropyAnalysis {
        self.0.clone()
    }
}
