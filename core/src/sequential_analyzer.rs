//! Sequential integrity: gaps in document numbering.
//!
//! This analyzer:
//!   1. Extracts the numeric part of every sequential id
//!   2. Deduplicates and sorts ascending
//!   3. Records each gap between consecutive numbers
//!   4. Flags population-level deletion / concealment patterns

use crate::{
    detector::{DetectionContext, ForensicDetector},
    parse::extract_sequence_number,
    types::RiskLevel,
};
use serde::{Deserialize, Serialize};

// ── Constants ────────────────────────────────────────────────────────────────

const GAP_HIGH_SIZE: f64 = 50.0;
const GAP_MEDIUM_SIZE: f64 = 10.0;

const SYSTEMATIC_GAP_SIZE: u64 = 10;
const SYSTEMATIC_GAP_COUNT: usize = 3;
const RECENT_CONCEALMENT_SIZE: u64 = 100;
const REGULAR_PATTERN_TOLERANCE: f64 = 0.30;
const REGULAR_PATTERN_COUNT: usize = 3;
const INTEGRITY_MISSING_RATIO: f64 = 0.20;

/// Missing ids listed per gap. Sizes and totals stay exact.
pub const MAX_LISTED_MISSING: u64 = 100;

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SequentialGap {
    pub start: u64,
    pub end: u64,
    pub size: u64,
    pub risk_level: RiskLevel,
    pub missing_ids: Vec<u64>,
    pub missing_ids_truncated: bool,
}

impl SequentialGap {
    fn between(previous: u64, next: u64) -> Self {
        let start = previous + 1;
        let end = next - 1;
        let size = end - start + 1;
        let listed_end = end.min(start.saturating_add(MAX_LISTED_MISSING - 1));
        Self {
            start,
            end,
            size,
            risk_level: RiskLevel::from_score(size as f64, GAP_HIGH_SIZE, GAP_MEDIUM_SIZE),
            missing_ids: (start..=listed_end).collect(),
            missing_ids_truncated: listed_end < end,
        }
    }

    /// True when `number` is the last id before or the first id after the gap.
    pub fn borders(&self, number: u64) -> bool {
        number.checked_add(1) == Some(self.start) || self.end.checked_add(1) == Some(number)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SequencePatternKind {
    SystematicDeletion,
    RecentConcealment,
    RegularPattern,
    IntegrityCompromised,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SequencePattern {
    pub kind: SequencePatternKind,
    pub description: String,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SequentialAnalysis {
    pub gaps: Vec<SequentialGap>,
    pub unique_numbers: usize,
    pub sequence_start: Option<u64>,
    pub sequence_end: Option<u64>,
    pub total_missing: u64,
    pub largest_gap: u64,
    /// total_missing / (max − min); 0 when the range is empty.
    pub missing_ratio: f64,
    pub patterns: Vec<SequencePattern>,
}

impl SequentialAnalysis {
    pub fn overall_risk(&self) -> RiskLevel {
        self.gaps
            .iter()
            .map(|g| g.risk_level)
            .chain(self.patterns.iter().map(|p| p.risk_level))
            .max()
            .unwrap_or(RiskLevel::Low)
    }

    /// The gap bordered by `number`, preferring the most severe.
    pub fn gap_bordering(&self, number: u64) -> Option<&SequentialGap> {
        self.gaps
            .iter()
            .filter(|g| g.borders(number))
            .max_by_key(|g| g.risk_level)
    }
}

// ── Analyzer ─────────────────────────────────────────────────────────────────

pub struct SequentialAnalyzer;

impl ForensicDetector for SequentialAnalyzer {
    type Output = SequentialAnalysis;

    fn name(&self) -> &'static str {
        "sequential_integrity"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> SequentialAnalysis {
        let Some(column) = ctx.mapping.sequential_id() else {
            log::warn!("sequential analyzer skipped: no sequential-id column mapped");
            return SequentialAnalysis::default();
        };
        let numbers: Vec<u64> = ctx
            .records
            .iter()
            .filter_map(|r| r.text(Some(column)))
            .filter_map(|id| extract_sequence_number(&id))
            .collect();
        analyze_sequence(numbers)
    }
}

/// Gap analysis over raw sequence numbers (any order, duplicates allowed).
pub fn analyze_sequence(mut numbers: Vec<u64>) -> SequentialAnalysis {
    numbers.sort_unstable();
    numbers.dedup();

    let (Some(&first), Some(&last)) = (numbers.first(), numbers.last()) else {
        return SequentialAnalysis::default();
    };

    let gaps: Vec<SequentialGap> = numbers
        .windows(2)
        .filter(|w| w[1] - w[0] > 1)
        .map(|w| SequentialGap::between(w[0], w[1]))
        .collect();

    let total_missing: u64 = gaps.iter().map(|g| g.size).sum();
    let largest_gap = gaps.iter().map(|g| g.size).max().unwrap_or(0);
    let range = last - first;
    let missing_ratio = if range > 0 { total_missing as f64 / range as f64 } else { 0.0 };

    let patterns = detect_patterns(&gaps, missing_ratio);
    if !gaps.is_empty() {
        log::debug!(
            "sequential: {} gaps, {} missing ids, largest gap {}",
            gaps.len(),
            total_missing,
            largest_gap
        );
    }

    SequentialAnalysis {
        unique_numbers: numbers.len(),
        sequence_start: Some(first),
        sequence_end: Some(last),
        gaps,
        total_missing,
        largest_gap,
        missing_ratio,
        patterns,
    }
}

fn detect_patterns(gaps: &[SequentialGap], missing_ratio: f64) -> Vec<SequencePattern> {
    let mut patterns = Vec::new();

    let large_gaps = gaps.iter().filter(|g| g.size >= SYSTEMATIC_GAP_SIZE).count();
    if large_gaps >= SYSTEMATIC_GAP_COUNT {
        patterns.push(SequencePattern {
            kind: SequencePatternKind::SystematicDeletion,
            description: format!("{large_gaps} gaps of {SYSTEMATIC_GAP_SIZE} or more missing numbers"),
            risk_level: RiskLevel::High,
        });
    }

    if let Some(final_gap) = gaps.last().filter(|g| g.size >= RECENT_CONCEALMENT_SIZE) {
        patterns.push(SequencePattern {
            kind: SequencePatternKind::RecentConcealment,
            description: format!(
                "Final gap of {} numbers ({}-{}) near the end of the sequence",
                final_gap.size, final_gap.start, final_gap.end
            ),
            risk_level: RiskLevel::High,
        });
    }

    if !gaps.is_empty() {
        let mean = gaps.iter().map(|g| g.size as f64).sum::<f64>() / gaps.len() as f64;
        let regular = gaps
            .iter()
            .filter(|g| (g.size as f64 - mean).abs() <= mean * REGULAR_PATTERN_TOLERANCE)
            .count();
        if regular >= REGULAR_PATTERN_COUNT {
            patterns.push(SequencePattern {
                kind: SequencePatternKind::RegularPattern,
                description: format!("{regular} gaps of similar size (mean {mean:.1})"),
                risk_level: RiskLevel::Medium,
            });
        }
    }

    if missing_ratio > INTEGRITY_MISSING_RATIO {
        patterns.push(SequencePattern {
            kind: SequencePatternKind::IntegrityCompromised,
            description: format!("{:.1}% of the numbering range is missing", missing_ratio * 100.0),
            risk_level: RiskLevel::High,
        });
    }

    patterns
}
