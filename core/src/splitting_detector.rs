//! Splitting (structuring) detector.
//!
//! Finds payments to one vendor broken into several smaller amounts that,
//! together, pass an approval or reporting threshold none of them reaches
//! on its own.
//!
//! For every vendor, records are sorted chronologically and every start index
//! opens a window extended while `days_since_start <= time_window_days`.
//! Windows with at least two members are scored (additive):
//!   1. Threshold evasion (+30): the FIRST ascending threshold the total
//!      exceeds while every member stays below `margin × threshold`. Scanning
//!      stops at the first match.
//!   2. Uniform amounts (+15): 3+ members, std-dev below 10% of the mean.
//!   3. Tight cluster (+20): 3+ members within a 7-day span.
//!   4. Just-below-round (+10 each): 2+ members in [0.8·t, t) for each round t.
//!
//! Only the single best window per vendor is kept (ties: the earliest).

use crate::{
    config::SplittingConfig,
    detector::{DetectionContext, ForensicDetector},
    parse::ParsedDate,
    types::{RecordId, RiskLevel},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Constants ────────────────────────────────────────────────────────────────

const EVASION_POINTS: u32 = 30;
const UNIFORM_AMOUNT_POINTS: u32 = 15;
const CLUSTER_POINTS: u32 = 20;
const ROUND_BAND_POINTS: u32 = 10;

const UNIFORM_VARIATION_LIMIT: f64 = 0.10;
const MIN_MEMBERS: usize = 2;
const MIN_PATTERN_MEMBERS: usize = 3;
const MIN_ROUND_BAND_MEMBERS: usize = 2;

const HIGH_RISK_SCORE: f64 = 40.0;
const MEDIUM_RISK_SCORE: f64 = 20.0;

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SplittingMember {
    pub record_id: RecordId,
    pub amount: f64,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SplittingGroup {
    pub vendor: String,
    pub members: Vec<SplittingMember>,
    pub total_amount: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Threshold evaded by the window, when rule 1 fired.
    pub evaded_threshold: Option<f64>,
    pub risk_score: u32,
    pub risk_level: RiskLevel,
    pub reasons: Vec<String>,
}

impl SplittingGroup {
    pub fn contains(&self, record_id: &str) -> bool {
        self.members.iter().any(|m| m.record_id == record_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SplittingAnalysis {
    pub groups: Vec<SplittingGroup>,
    pub vendors_analyzed: usize,
    pub total_suspicious_amount: f64,
    pub high_risk_groups: usize,
}

impl SplittingAnalysis {
    /// Group containing `record_id`, if any.
    pub fn group_for(&self, record_id: &str) -> Option<&SplittingGroup> {
        self.groups.iter().find(|g| g.contains(record_id))
    }
}

// ── Detector ─────────────────────────────────────────────────────────────────

pub struct SplittingDetector;

struct Candidate<'a> {
    record_id: &'a str,
    amount: f64,
    date: ParsedDate,
}

impl ForensicDetector for SplittingDetector {
    type Output = SplittingAnalysis;

    fn name(&self) -> &'static str {
        "splitting"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> SplittingAnalysis {
        let mapping = ctx.mapping;
        if mapping.vendor.is_none() || !mapping.has_monetary() || !mapping.has_date() {
            log::warn!("splitting detector skipped: vendor, amount and date must all be mapped");
            return SplittingAnalysis::default();
        }

        // BTreeMap keeps vendor iteration (and therefore output) stable.
        let mut by_vendor: BTreeMap<String, Vec<Candidate<'_>>> = BTreeMap::new();
        for (index, record) in ctx.records.iter().enumerate() {
            let (Some(vendor), Some(date)) = (record.text(mapping.vendor()), ctx.date(index)) else {
                continue;
            };
            if record.monetary_value <= 0.0 {
                continue;
            }
            by_vendor.entry(vendor).or_default().push(Candidate {
                record_id: &record.id,
                amount: record.monetary_value,
                date: *date,
            });
        }

        let vendors_analyzed = by_vendor.len();
        let mut groups = Vec::new();
        for (vendor, mut candidates) in by_vendor {
            candidates.sort_by_key(|c| c.date.datetime);
            if let Some(group) = best_window(&vendor, &candidates, &ctx.config.splitting) {
                groups.push(group);
            }
        }

        groups.sort_by(|a, b| b.risk_score.cmp(&a.risk_score).then_with(|| a.vendor.cmp(&b.vendor)));
        let total_suspicious_amount = groups.iter().map(|g| g.total_amount).sum();
        let high_risk_groups = groups.iter().filter(|g| g.risk_level == RiskLevel::High).count();

        log::debug!(
            "splitting: {} vendors analyzed, {} groups ({} high risk)",
            vendors_analyzed,
            groups.len(),
            high_risk_groups
        );

        SplittingAnalysis {
            groups,
            vendors_analyzed,
            total_suspicious_amount,
            high_risk_groups,
        }
    }
}

/// Score every window of one vendor and keep the best.
fn best_window(vendor: &str, candidates: &[Candidate<'_>], config: &SplittingConfig) -> Option<SplittingGroup> {
    let mut best: Option<SplittingGroup> = None;

    for start in 0..candidates.len() {
        let anchor = &candidates[start].date;
        let end = candidates[start..]
            .iter()
            .take_while(|c| c.date.days_since(anchor) <= config.time_window_days)
            .count()
            + start;
        let window = &candidates[start..end];
        if window.len() < MIN_MEMBERS {
            continue;
        }

        let Some(group) = score_window(vendor, window, config) else {
            continue;
        };
        if best.as_ref().map_or(true, |b| group.risk_score > b.risk_score) {
            best = Some(group);
        }
    }

    best
}

fn score_window(vendor: &str, window: &[Candidate<'_>], config: &SplittingConfig) -> Option<SplittingGroup> {
    let amounts: Vec<f64> = window.iter().map(|c| c.amount).collect();
    let total: f64 = amounts.iter().sum();
    let max_amount = amounts.iter().copied().fold(f64::MIN, f64::max);

    let mut score = 0u32;
    let mut reasons = Vec::new();
    let mut evaded_threshold = None;

    // Rule 1: first threshold match wins
    for &threshold in &config.thresholds {
        if total > threshold && max_amount < threshold * config.evasion_margin {
            score += EVASION_POINTS;
            evaded_threshold = Some(threshold);
            reasons.push(format!(
                "{} payments totaling {:.2} exceed the {:.0} threshold while each stays below {:.0}% of it",
                window.len(),
                total,
                threshold,
                config.evasion_margin * 100.0
            ));
            break;
        }
    }

    // Rule 2: near-identical amounts
    if window.len() >= MIN_PATTERN_MEMBERS {
        let mean = total / window.len() as f64;
        let variance = amounts.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / window.len() as f64;
        if mean > 0.0 && variance.sqrt() / mean < UNIFORM_VARIATION_LIMIT {
            score += UNIFORM_AMOUNT_POINTS;
            reasons.push(format!(
                "{} payments of near-identical amounts (mean {:.2})",
                window.len(),
                mean
            ));
        }
    }

    // Rule 3: three or more payments inside the cluster window
    if window.len() >= MIN_PATTERN_MEMBERS {
        let clustered = window.windows(MIN_PATTERN_MEMBERS).any(|w| {
            w[MIN_PATTERN_MEMBERS - 1].date.days_since(&w[0].date) <= config.cluster_window_days
        });
        if clustered {
            score += CLUSTER_POINTS;
            reasons.push(format!(
                "3 or more payments within {:.0} days",
                config.cluster_window_days
            ));
        }
    }

    // Rule 4: amounts just below round thresholds (cumulative)
    for &threshold in &config.round_thresholds {
        let floor = threshold * config.round_band_floor;
        let in_band = amounts.iter().filter(|a| **a >= floor && **a < threshold).count();
        if in_band >= MIN_ROUND_BAND_MEMBERS {
            score += ROUND_BAND_POINTS;
            reasons.push(format!("{in_band} payments just below {threshold:.0}"));
        }
    }

    if score == 0 {
        return None;
    }

    let first = window.first()?;
    let last = window.last()?;
    Some(SplittingGroup {
        vendor: vendor.to_string(),
        members: window
            .iter()
            .map(|c| SplittingMember {
                record_id: c.record_id.to_string(),
                amount: c.amount,
                date: c.date.date(),
            })
            .collect(),
        total_amount: total,
        start_date: first.date.date(),
        end_date: last.date.date(),
        evaded_threshold,
        risk_score: score,
        risk_level: RiskLevel::from_score(score as f64, HIGH_RISK_SCORE, MEDIUM_RISK_SCORE),
        reasons,
    })
}
