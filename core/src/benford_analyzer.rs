//! Benford's Law analysis: basic leading-digit test and enhanced digit tests.
//!
//! Basic (Pass A/B):
//!   Population leading-digit counts; a record is flagged when its own
//!   leading digit deviates from P(d) = log10(1 + 1/d) by more than the
//!   configured percentage points.
//!
//! Enhanced (independent detector):
//!   1. First digit, second digit and first-two-digit distributions
//!   2. z-score per bucket (normal approximation to the binomial)
//!   3. Chi-square and MAD conformity per distribution
//!   4. Composite patterns: rounding, low-digit deficit, high-digit excess
//!
//! The significance value is exp(-chi_square / 2). It is an index kept for
//! comparability with earlier reports, not a p-value.

use crate::{
    config::BenfordConfig,
    detector::{DetectionContext, ForensicDetector},
    parse::significant_digits,
    types::RiskLevel,
};
use serde::{Deserialize, Serialize};

// ── Constants ────────────────────────────────────────────────────────────────

/// Approximate second-digit probabilities (%), digits 0..=9.
pub const SECOND_DIGIT_EXPECTED_PCT: [f64; 10] =
    [11.968, 11.389, 10.882, 10.433, 10.031, 9.668, 9.337, 9.035, 8.757, 8.500];

const MAD_CLOSE: f64 = 0.6;
const MAD_ACCEPTABLE: f64 = 1.2;
const MAD_MARGINAL: f64 = 1.5;

/// A single flagged digit escalates to HIGH beyond this |z|.
const DIGIT_Z_HIGH: f64 = 3.0;

const ROUNDING_EXCESS_MEDIUM: f64 = 10.0;
const ROUNDING_EXCESS_HIGH: f64 = 20.0;
const LOW_DIGIT_DEFICIT_MEDIUM: f64 = 15.0;
const LOW_DIGIT_DEFICIT_HIGH: f64 = 25.0;
const HIGH_DIGIT_EXCESS_MEDIUM: f64 = 10.0;
const HIGH_DIGIT_EXCESS_HIGH: f64 = 20.0;

/// Second-digit and two-digit tests need a second significant digit.
const MIN_VALUE_FOR_SECOND_DIGIT: f64 = 10.0;

pub fn first_digit_probability(digit: u8) -> f64 {
    if !(1..=9).contains(&digit) {
        return 0.0;
    }
    (1.0 + 1.0 / digit as f64).log10()
}

pub fn second_digit_probability(digit: u8) -> f64 {
    SECOND_DIGIT_EXPECTED_PCT
        .get(digit as usize)
        .map(|pct| pct / 100.0)
        .unwrap_or(0.0)
}

/// Expected probability of the two-digit bucket `first·10 + second`:
/// P(first) × [log10(1 + 1/(10·first + second)) − log10(1 + 1/(10·first))].
pub fn first_two_probability(first: u8, second: u8) -> f64 {
    let base = 10.0 * first as f64;
    first_digit_probability(first)
        * ((1.0 + 1.0 / (base + second as f64)).log10() - (1.0 + 1.0 / base).log10())
}

// ── Basic test ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct LeadingDigitCounts {
    counts: [u64; 9],
    total: u64,
}

impl LeadingDigitCounts {
    pub fn observe(&mut self, amount: f64) {
        if let Some((first, _)) = significant_digits(amount.abs()) {
            self.counts[(first - 1) as usize] += 1;
            self.total += 1;
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn count(&self, digit: u8) -> u64 {
        if (1..=9).contains(&digit) {
            self.counts[(digit - 1) as usize]
        } else {
            0
        }
    }

    pub fn observed_pct(&self, digit: u8) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.count(digit) as f64 / self.total as f64 * 100.0
    }

    /// Observed minus expected, in percentage points.
    pub fn deviation_pct(&self, digit: u8) -> f64 {
        self.observed_pct(digit) - first_digit_probability(digit) * 100.0
    }

    pub fn is_anomalous(&self, amount: f64, threshold_pct: f64) -> bool {
        match significant_digits(amount.abs()) {
            Some((first, _)) => self.deviation_pct(first).abs() > threshold_pct,
            None => false,
        }
    }

    pub fn summary(&self, threshold_pct: f64) -> BasicBenfordSummary {
        let digits = (1..=9u8)
            .map(|digit| {
                let deviation = self.deviation_pct(digit);
                BasicDigitCount {
                    digit,
                    count: self.count(digit),
                    observed_pct: self.observed_pct(digit),
                    expected_pct: first_digit_probability(digit) * 100.0,
                    deviation_pct: deviation,
                    flagged: self.total > 0 && deviation.abs() > threshold_pct,
                }
            })
            .collect();
        BasicBenfordSummary { total: self.total, digits }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BasicDigitCount {
    pub digit: u8,
    pub count: u64,
    pub observed_pct: f64,
    pub expected_pct: f64,
    pub deviation_pct: f64,
    pub flagged: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BasicBenfordSummary {
    pub total: u64,
    pub digits: Vec<BasicDigitCount>,
}

// ── Enhanced test: public types ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Conformity {
    #[default]
    Close,
    Acceptable,
    Marginal,
    Nonconformity,
}

impl Conformity {
    pub fn from_mad(mad_pct: f64) -> Self {
        if mad_pct < MAD_CLOSE {
            Self::Close
        } else if mad_pct < MAD_ACCEPTABLE {
            Self::Acceptable
        } else if mad_pct < MAD_MARGINAL {
            Self::Marginal
        } else {
            Self::Nonconformity
        }
    }

    pub fn risk_level(&self) -> RiskLevel {
        match self {
            Self::Close | Self::Acceptable => RiskLevel::Low,
            Self::Marginal => RiskLevel::Medium,
            Self::Nonconformity => RiskLevel::High,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BenfordDigitResult {
    /// 1..=9 (first), 0..=9 (second) or 10..=99 (first two).
    pub digit: u8,
    pub expected_pct: f64,
    pub observed_pct: f64,
    pub count: u64,
    /// Observed minus expected, percentage points.
    pub deviation: f64,
    pub z_score: f64,
    pub suspicious: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DigitAnalysis {
    pub sample_size: usize,
    pub digits: Vec<BenfordDigitResult>,
    pub chi_square: f64,
    /// Mean absolute deviation, percentage points.
    pub mad: f64,
    pub conformity: Conformity,
    pub risk_level: RiskLevel,
    pub significance: f64,
}

impl Default for DigitAnalysis {
    fn default() -> Self {
        Self {
            sample_size: 0,
            digits: Vec::new(),
            chi_square: 0.0,
            mad: 0.0,
            conformity: Conformity::Close,
            risk_level: RiskLevel::Low,
            significance: 1.0,
        }
    }
}

impl DigitAnalysis {
    pub fn suspicious_digits(&self) -> Vec<u8> {
        self.digits.iter().filter(|d| d.suspicious).map(|d| d.digit).collect()
    }

    fn pct_of(&self, wanted: &[u8]) -> (f64, f64) {
        self.digits
            .iter()
            .filter(|d| wanted.contains(&d.digit))
            .fold((0.0, 0.0), |(obs, exp), d| (obs + d.observed_pct, exp + d.expected_pct))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BenfordPatternKind {
    FirstDigitDeviation,
    SecondDigitDeviation,
    SecondDigitRounding,
    LowDigitDeficit,
    HighDigitExcess,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BenfordPattern {
    pub kind: BenfordPatternKind,
    pub description: String,
    pub digits: Vec<u8>,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnhancedBenfordAnalysis {
    pub sample_size: usize,
    pub first_digit: DigitAnalysis,
    pub second_digit: DigitAnalysis,
    pub first_two_digits: DigitAnalysis,
    pub patterns: Vec<BenfordPattern>,
    pub overall_risk: RiskLevel,
}

impl EnhancedBenfordAnalysis {
    pub fn empty(sample_size: usize) -> Self {
        Self {
            sample_size,
            first_digit: DigitAnalysis::default(),
            second_digit: DigitAnalysis::default(),
            first_two_digits: DigitAnalysis::default(),
            patterns: Vec::new(),
            overall_risk: RiskLevel::Low,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.first_digit.digits.is_empty()
    }
}

impl Default for EnhancedBenfordAnalysis {
    fn default() -> Self {
        Self::empty(0)
    }
}

// ── Enhanced test: detector ──────────────────────────────────────────────────

pub struct EnhancedBenfordAnalyzer;

impl ForensicDetector for EnhancedBenfordAnalyzer {
    type Output = EnhancedBenfordAnalysis;

    fn name(&self) -> &'static str {
        "enhanced_benford"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> EnhancedBenfordAnalysis {
        if !ctx.mapping.has_monetary() {
            return EnhancedBenfordAnalysis::empty(0);
        }
        let values: Vec<f64> = ctx
            .records
            .iter()
            .map(|r| r.monetary_value)
            .filter(|v| v.is_finite() && *v > 0.0)
            .collect();
        analyze_values(&values, &ctx.config.benford)
    }
}

/// Run all three digit tests over a set of amounts.
pub fn analyze_values(values: &[f64], config: &BenfordConfig) -> EnhancedBenfordAnalysis {
    let positive: Vec<f64> = values.iter().copied().filter(|v| v.is_finite() && *v > 0.0).collect();
    if positive.len() < config.min_sample_size {
        log::debug!(
            "enhanced benford skipped: {} positive values (< {})",
            positive.len(),
            config.min_sample_size
        );
        return EnhancedBenfordAnalysis::empty(positive.len());
    }

    let mut first_counts = [0u64; 10];
    let mut second_counts = [0u64; 10];
    let mut two_digit_counts = [0u64; 100];
    let mut first_n = 0usize;
    let mut second_n = 0usize;

    for value in &positive {
        let Some((first, second)) = significant_digits(*value) else {
            continue;
        };
        first_counts[first as usize] += 1;
        first_n += 1;
        if *value >= MIN_VALUE_FOR_SECOND_DIGIT {
            second_counts[second as usize] += 1;
            two_digit_counts[(first * 10 + second) as usize] += 1;
            second_n += 1;
        }
    }

    let first_digit = digit_analysis(
        (1..=9u8).map(|d| (d, first_counts[d as usize], first_digit_probability(d))),
        first_n,
        config,
    );
    let second_digit = digit_analysis(
        (0..=9u8).map(|d| (d, second_counts[d as usize], second_digit_probability(d))),
        second_n,
        config,
    );
    let first_two_digits = digit_analysis(
        (10..=99u8).map(|d| (d, two_digit_counts[d as usize], first_two_probability(d / 10, d % 10))),
        second_n,
        config,
    );

    let patterns = detect_patterns(&first_digit, &second_digit);
    let overall_risk = patterns
        .iter()
        .map(|p| p.risk_level)
        .chain([first_digit.risk_level, second_digit.risk_level])
        .max()
        .unwrap_or(RiskLevel::Low);

    log::debug!(
        "enhanced benford: n={} first={:?} second={:?} patterns={}",
        positive.len(),
        first_digit.conformity,
        second_digit.conformity,
        patterns.len()
    );

    EnhancedBenfordAnalysis {
        sample_size: positive.len(),
        first_digit,
        second_digit,
        first_two_digits,
        patterns,
        overall_risk,
    }
}

fn digit_analysis(
    buckets: impl Iterator<Item = (u8, u64, f64)>,
    n: usize,
    config: &BenfordConfig,
) -> DigitAnalysis {
    if n == 0 {
        return DigitAnalysis::default();
    }
    let total = n as f64;
    let mut chi_square = 0.0;
    let mut abs_deviation_sum = 0.0;
    let mut digits = Vec::new();

    for (digit, count, p) in buckets {
        let expected_count = total * p;
        let observed_pct = count as f64 / total * 100.0;
        let expected_pct = p * 100.0;
        let deviation = observed_pct - expected_pct;

        // Non-positive expectations carry no z-score or chi-square weight.
        let variance = expected_count * (1.0 - p);
        let z_score = if expected_count > 0.0 && variance > 0.0 {
            (count as f64 - expected_count) / variance.sqrt()
        } else {
            0.0
        };
        if expected_count > 0.0 {
            chi_square += (count as f64 - expected_count).powi(2) / expected_count;
        }

        abs_deviation_sum += deviation.abs();
        digits.push(BenfordDigitResult {
            digit,
            expected_pct,
            observed_pct,
            count,
            deviation,
            z_score,
            suspicious: z_score.abs() > config.z_critical
                || deviation.abs() > config.deviation_pct_threshold,
        });
    }

    let mad = if digits.is_empty() { 0.0 } else { abs_deviation_sum / digits.len() as f64 };
    let conformity = Conformity::from_mad(mad);

    DigitAnalysis {
        sample_size: n,
        digits,
        chi_square,
        mad,
        conformity,
        risk_level: conformity.risk_level(),
        significance: (-chi_square / 2.0).exp(),
    }
}

fn detect_patterns(first: &DigitAnalysis, second: &DigitAnalysis) -> Vec<BenfordPattern> {
    let mut patterns = Vec::new();

    // Pattern 1: individual digit flags
    for (analysis, kind, label) in [
        (first, BenfordPatternKind::FirstDigitDeviation, "First digit"),
        (second, BenfordPatternKind::SecondDigitDeviation, "Second digit"),
    ] {
        for d in analysis.digits.iter().filter(|d| d.suspicious) {
            let direction = if d.deviation > 0.0 { "over" } else { "under" };
            patterns.push(BenfordPattern {
                kind,
                description: format!(
                    "{label} {} {direction}-represented: {:.1}% observed vs {:.1}% expected (z = {:.2})",
                    d.digit, d.observed_pct, d.expected_pct, d.z_score
                ),
                digits: vec![d.digit],
                risk_level: if d.z_score.abs() > DIGIT_Z_HIGH { RiskLevel::High } else { RiskLevel::Medium },
            });
        }
    }

    // Pattern 2: rounding, excess mass on second digits 0 and 5
    if !second.digits.is_empty() {
        let (observed, expected) = second.pct_of(&[0, 5]);
        let excess = observed - expected;
        if let Some(level) = graded(excess, ROUNDING_EXCESS_MEDIUM, ROUNDING_EXCESS_HIGH) {
            patterns.push(BenfordPattern {
                kind: BenfordPatternKind::SecondDigitRounding,
                description: format!(
                    "Second digits 0/5 exceed expectation by {excess:.1} points (possible rounding)"
                ),
                digits: vec![0, 5],
                risk_level: level,
            });
        }
    }

    if !first.digits.is_empty() {
        // Pattern 3: deficit on first digits 1-3
        let (observed, expected) = first.pct_of(&[1, 2, 3]);
        let deficit = expected - observed;
        if let Some(level) = graded(deficit, LOW_DIGIT_DEFICIT_MEDIUM, LOW_DIGIT_DEFICIT_HIGH) {
            patterns.push(BenfordPattern {
                kind: BenfordPatternKind::LowDigitDeficit,
                description: format!("First digits 1-3 fall {deficit:.1} points short of expectation"),
                digits: vec![1, 2, 3],
                risk_level: level,
            });
        }

        // Pattern 4: excess on first digits 7-9
        let (observed, expected) = first.pct_of(&[7, 8, 9]);
        let excess = observed - expected;
        if let Some(level) = graded(excess, HIGH_DIGIT_EXCESS_MEDIUM, HIGH_DIGIT_EXCESS_HIGH) {
            patterns.push(BenfordPattern {
                kind: BenfordPatternKind::HighDigitExcess,
                description: format!("First digits 7-9 exceed expectation by {excess:.1} points"),
                digits: vec![7, 8, 9],
                risk_level: level,
            });
        }
    }

    patterns
}

fn graded(value: f64, medium_above: f64, high_above: f64) -> Option<RiskLevel> {
    if value > high_above {
        Some(RiskLevel::High)
    } else if value > medium_above {
        Some(RiskLevel::Medium)
    } else {
        None
    }
}
