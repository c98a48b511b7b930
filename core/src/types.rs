//! Shared primitive types used across the entire engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Caller-supplied identifier of a single record.
pub type RecordId = String;

/// Identifier of the user / actor who entered a record.
pub type ActorId = String;

/// Severity shared by every detector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }

    /// Map a score onto a level with inclusive lower bounds.
    pub fn from_score(score: f64, high_at: f64, medium_at: f64) -> Self {
        if score >= high_at {
            Self::High
        } else if score >= medium_at {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fixed vocabulary of per-record risk tags.
/// Order here is the order used by the profile's factor counts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskFactor {
    HighValue,
    BenfordAnomaly,
    Weekend,
    OffHours,
    RoundAmount,
    SuspiciousVendor,
    DuplicateTransaction,
    StatisticalOutlier,
    IqrOutlier,
    EntropyAnomaly,
    SplittingDetected,
    SequentialGaps,
    MlAnomaly,
    SuspiciousActor,
    EnhancedBenfordFirst,
    EnhancedBenfordSecond,
}

impl RiskFactor {
    pub const ALL: [RiskFactor; 16] = [
        Self::HighValue,
        Self::BenfordAnomaly,
        Self::Weekend,
        Self::OffHours,
        Self::RoundAmount,
        Self::SuspiciousVendor,
        Self::DuplicateTransaction,
        Self::StatisticalOutlier,
        Self::IqrOutlier,
        Self::EntropyAnomaly,
        Self::SplittingDetected,
        Self::SequentialGaps,
        Self::MlAnomaly,
        Self::SuspiciousActor,
        Self::EnhancedBenfordFirst,
        Self::EnhancedBenfordSecond,
    ];

    /// Score points added when this factor is attached to a record.
    pub fn weight(&self) -> u32 {
        match self {
            Self::HighValue => 25,
            Self::BenfordAnomaly => 15,
            Self::Weekend => 10,
            Self::OffHours => 10,
            Self::RoundAmount => 5,
            Self::SuspiciousVendor => 20,
            Self::DuplicateTransaction => 30,
            Self::StatisticalOutlier => 20,
            Self::IqrOutlier => 15,
            Self::EntropyAnomaly => 20,
            Self::SplittingDetected => 30,
            Self::SequentialGaps => 15,
            Self::MlAnomaly => 20,
            Self::SuspiciousActor => 20,
            Self::EnhancedBenfordFirst => 10,
            Self::EnhancedBenfordSecond => 5,
        }
    }

    pub fn severity(&self) -> RiskLevel {
        match self {
            Self::HighValue
            | Self::DuplicateTransaction
            | Self::StatisticalOutlier
            | Self::SplittingDetected => RiskLevel::High,
            Self::Weekend
            | Self::OffHours
            | Self::RoundAmount
            | Self::EnhancedBenfordFirst
            | Self::EnhancedBenfordSecond => RiskLevel::Low,
            _ => RiskLevel::Medium,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::HighValue => "HIGH_VALUE",
            Self::BenfordAnomaly => "BENFORD_ANOMALY",
            Self::Weekend => "WEEKEND",
            Self::OffHours => "OFF_HOURS",
            Self::RoundAmount => "ROUND_AMOUNT",
            Self::SuspiciousVendor => "SUSPICIOUS_VENDOR",
            Self::DuplicateTransaction => "DUPLICATE_TRANSACTION",
            Self::StatisticalOutlier => "STATISTICAL_OUTLIER",
            Self::IqrOutlier => "IQR_OUTLIER",
            Self::EntropyAnomaly => "ENTROPY_ANOMALY",
            Self::SplittingDetected => "SPLITTING_DETECTED",
            Self::SequentialGaps => "SEQUENTIAL_GAPS",
            Self::MlAnomaly => "ML_ANOMALY",
            Self::SuspiciousActor => "SUSPICIOUS_ACTOR",
            Self::EnhancedBenfordFirst => "ENHANCED_BENFORD_FIRST",
            Self::EnhancedBenfordSecond => "ENHANCED_BENFORD_SECOND",
        }
    }

    /// Human-readable label used in the profile.
    pub fn label(&self) -> &'static str {
        match self {
            Self::HighValue => "High value",
            Self::BenfordAnomaly => "Benford's Law deviation",
            Self::Weekend => "Weekend posting",
            Self::OffHours => "Off-hours posting",
            Self::RoundAmount => "Round amount",
            Self::SuspiciousVendor => "Suspicious vendor",
            Self::DuplicateTransaction => "Duplicate transaction",
            Self::StatisticalOutlier => "Statistical outlier",
            Self::IqrOutlier => "IQR outlier",
            Self::EntropyAnomaly => "Unusual category combination",
            Self::SplittingDetected => "Transaction splitting",
            Self::SequentialGaps => "Sequence gap",
            Self::MlAnomaly => "Isolation Forest anomaly",
            Self::SuspiciousActor => "Suspicious user behavior",
            Self::EnhancedBenfordFirst => "Enhanced Benford (first digit)",
            Self::EnhancedBenfordSecond => "Enhanced Benford (second digit)",
        }
    }
}

impl fmt::Display for RiskFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
