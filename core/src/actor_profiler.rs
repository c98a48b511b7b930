//! Actor behavior profiling: per-user and cross-user risk.
//!
//! This profiler:
//!   1. Groups records by the user/actor column
//!   2. Scores every actor with 2+ transactions on time and amount habits
//!   3. Detects cross-actor patterns: high volume, activity concentration,
//!      weekend clusters
//!
//! Off-hours here is exclusive (hour < 6 or hour > 20), unlike the base
//! scorer's inclusive rule. Both bounds are configurable.

use crate::{
    config::ActorConfig,
    detector::{DetectionContext, ForensicDetector},
    types::{ActorId, RiskLevel},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// ── Constants ────────────────────────────────────────────────────────────────

const MIN_TRANSACTIONS: usize = 2;

const WEEKEND_RATIO_LIMIT: f64 = 0.3;
const OFF_HOURS_RATIO_LIMIT: f64 = 0.4;
const CONSECUTIVE_DAYS_LIMIT: u32 = 5;
const ROUND_RATIO_LIMIT: f64 = 0.5;
const HIGH_VALUE_RATIO_LIMIT: f64 = 0.2;
const DUPLICATE_RATIO_LIMIT: f64 = 0.3;

const WEEKEND_POINTS: u32 = 15;
const OFF_HOURS_POINTS: u32 = 20;
const CONSECUTIVE_DAYS_POINTS: u32 = 10;
const ROUND_POINTS: u32 = 15;
const HIGH_VALUE_POINTS: u32 = 20;
const DUPLICATE_POINTS: u32 = 25;

const HIGH_RISK_SCORE: f64 = 50.0;
const MEDIUM_RISK_SCORE: f64 = 25.0;

const ROUND_UNIT: f64 = 100.0;
const HIGH_VALUE_PERCENTILE: f64 = 0.9;

const HIGH_VOLUME_MULTIPLIER: f64 = 3.0;
const HIGH_VOLUME_HIGH_COUNT: usize = 5;
const TOP_ACTOR_SHARE: f64 = 0.10;
const CONCENTRATION_MEDIUM: f64 = 0.50;
const CONCENTRATION_HIGH: f64 = 0.70;
const WEEKEND_ACTOR_SHARE: f64 = 0.30;
const WEEKEND_CLUSTER_MEDIUM: usize = 3;
const WEEKEND_CLUSTER_HIGH: usize = 10;

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TimePatterns {
    pub weekend_count: usize,
    pub off_hours_count: usize,
    pub max_consecutive_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AmountPatterns {
    pub round_count: usize,
    pub high_value_count: usize,
    pub duplicate_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuspiciousActor {
    pub actor_id: ActorId,
    pub transaction_count: usize,
    pub total_amount: f64,
    pub average_amount: f64,
    pub risk_score: u32,
    pub risk_level: RiskLevel,
    pub reasons: Vec<String>,
    pub time_patterns: TimePatterns,
    pub amount_patterns: AmountPatterns,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActorPatternKind {
    HighVolume,
    ActivityConcentration,
    WeekendCluster,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActorPattern {
    pub kind: ActorPatternKind,
    pub description: String,
    pub actors: Vec<ActorId>,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ActorAnalysis {
    pub suspicious_actors: Vec<SuspiciousActor>,
    pub patterns: Vec<ActorPattern>,
    pub total_actors: usize,
    pub actors_profiled: usize,
}

impl ActorAnalysis {
    pub fn actor(&self, actor_id: &str) -> Option<&SuspiciousActor> {
        self.suspicious_actors.iter().find(|a| a.actor_id == actor_id)
    }
}

// ── Profiler ─────────────────────────────────────────────────────────────────

pub struct ActorProfiler;

#[derive(Default)]
struct ActorActivity {
    amounts: Vec<f64>,
    days: Vec<NaiveDate>,
    weekend_count: usize,
    off_hours_count: usize,
}

impl ForensicDetector for ActorProfiler {
    type Output = ActorAnalysis;

    fn name(&self) -> &'static str {
        "actor_behavior"
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> ActorAnalysis {
        let Some(column) = ctx.mapping.user() else {
            log::warn!("actor profiler skipped: no user column mapped");
            return ActorAnalysis::default();
        };

        let mut activity: BTreeMap<ActorId, ActorActivity> = BTreeMap::new();
        for (index, record) in ctx.records.iter().enumerate() {
            let Some(actor) = record.text(Some(column)) else {
                continue;
            };
            let entry = activity.entry(actor).or_default();
            entry.amounts.push(record.monetary_value);

            if let Some(date) = ctx.date(index) {
                entry.days.push(date.date());
                if date.is_weekend() {
                    entry.weekend_count += 1;
                }
            }
            if ctx.hour(index).is_some_and(|h| is_off_hours(h, &ctx.config.actors)) {
                entry.off_hours_count += 1;
            }
        }

        let mut suspicious_actors: Vec<SuspiciousActor> = activity
            .iter()
            .filter(|(_, a)| a.amounts.len() >= MIN_TRANSACTIONS)
            .filter_map(|(id, a)| score_actor(id, a))
            .collect();
        suspicious_actors.sort_by(|a, b| {
            b.risk_score.cmp(&a.risk_score).then_with(|| a.actor_id.cmp(&b.actor_id))
        });

        let patterns = cross_actor_patterns(&activity);
        let actors_profiled = activity.values().filter(|a| a.amounts.len() >= MIN_TRANSACTIONS).count();

        log::debug!(
            "actor profiler: {} actors, {} suspicious, {} patterns",
            activity.len(),
            suspicious_actors.len(),
            patterns.len()
        );

        ActorAnalysis {
            suspicious_actors,
            patterns,
            total_actors: activity.len(),
            actors_profiled,
        }
    }
}

fn is_off_hours(hour: u32, config: &ActorConfig) -> bool {
    hour < config.off_hours_before || hour > config.off_hours_after
}

/// Postings at or above the actor's own amount at index floor(p·n) ascending.
fn own_top_percentile_count(amounts: &[f64], p: f64) -> usize {
    if amounts.is_empty() {
        return 0;
    }
    let mut sorted = amounts.to_vec();
    sorted.sort_by(f64::total_cmp);
    let index = ((sorted.len() as f64 * p).floor() as usize).min(sorted.len() - 1);
    let floor = sorted[index];
    amounts.iter().filter(|a| **a >= floor).count()
}

fn score_actor(actor_id: &str, activity: &ActorActivity) -> Option<SuspiciousActor> {
    let count = activity.amounts.len();
    let n = count as f64;

    let round_count = activity
        .amounts
        .iter()
        .filter(|a| **a >= ROUND_UNIT && a.rem_euclid(ROUND_UNIT) == 0.0)
        .count();
    let duplicate_count = duplicate_amount_count(&activity.amounts);
    let high_value_count = own_top_percentile_count(&activity.amounts, HIGH_VALUE_PERCENTILE);
    let max_consecutive_days = longest_daily_streak(&activity.days);

    let weekend_ratio = activity.weekend_count as f64 / n;
    let off_hours_ratio = activity.off_hours_count as f64 / n;
    let round_ratio = round_count as f64 / n;
    let duplicate_ratio = duplicate_count as f64 / n;
    let high_value_ratio = high_value_count as f64 / n;

    let mut score = 0u32;
    let mut reasons = Vec::new();

    if weekend_ratio > WEEKEND_RATIO_LIMIT {
        score += WEEKEND_POINTS;
        reasons.push(format!("{:.0}% of postings on weekends", weekend_ratio * 100.0));
    }
    if off_hours_ratio > OFF_HOURS_RATIO_LIMIT {
        score += OFF_HOURS_POINTS;
        reasons.push(format!("{:.0}% of postings outside business hours", off_hours_ratio * 100.0));
    }
    if max_consecutive_days > CONSECUTIVE_DAYS_LIMIT {
        score += CONSECUTIVE_DAYS_POINTS;
        reasons.push(format!("Active {max_consecutive_days} consecutive days"));
    }
    if round_ratio > ROUND_RATIO_LIMIT {
        score += ROUND_POINTS;
        reasons.push(format!("{:.0}% round amounts", round_ratio * 100.0));
    }
    if high_value_ratio > HIGH_VALUE_RATIO_LIMIT {
        score += HIGH_VALUE_POINTS;
        reasons.push(format!(
            "{:.0}% of postings in the actor's own top decile",
            high_value_ratio * 100.0
        ));
    }
    if duplicate_ratio > DUPLICATE_RATIO_LIMIT {
        score += DUPLICATE_POINTS;
        reasons.push(format!("{:.0}% repeated amounts", duplicate_ratio * 100.0));
    }

    if score == 0 {
        return None;
    }

    let total_amount: f64 = activity.amounts.iter().sum();
    Some(SuspiciousActor {
        actor_id: actor_id.to_string(),
        transaction_count: count,
        total_amount,
        average_amount: total_amount / n,
        risk_score: score,
        risk_level: RiskLevel::from_score(score as f64, HIGH_RISK_SCORE, MEDIUM_RISK_SCORE),
        reasons,
        time_patterns: TimePatterns {
            weekend_count: activity.weekend_count,
            off_hours_count: activity.off_hours_count,
            max_consecutive_days,
        },
        amount_patterns: AmountPatterns {
            round_count,
            high_value_count,
            duplicate_count,
        },
    })
}

/// Transactions whose exact amount occurs more than once for this actor.
fn duplicate_amount_count(amounts: &[f64]) -> usize {
    let mut frequency: HashMap<u64, usize> = HashMap::new();
    for amount in amounts {
        *frequency.entry(amount.to_bits()).or_insert(0) += 1;
    }
    frequency.values().filter(|c| **c > 1).sum()
}

/// Longest run of consecutive calendar days with at least one posting.
pub fn longest_daily_streak(days: &[NaiveDate]) -> u32 {
    let mut unique = days.to_vec();
    unique.sort_unstable();
    unique.dedup();

    let mut longest = 0u32;
    let mut current = 0u32;
    let mut previous: Option<NaiveDate> = None;
    for day in unique {
        current = match previous {
            Some(p) if (day - p).num_days() == 1 => current + 1,
            _ => 1,
        };
        longest = longest.max(current);
        previous = Some(day);
    }
    longest
}

fn cross_actor_patterns(activity: &BTreeMap<ActorId, ActorActivity>) -> Vec<ActorPattern> {
    let mut patterns = Vec::new();
    if activity.is_empty() {
        return patterns;
    }

    let total_transactions: usize = activity.values().map(|a| a.amounts.len()).sum();
    let average = total_transactions as f64 / activity.len() as f64;

    // Pattern 1: individual actors far above the average volume
    for (actor, a) in activity {
        let count = a.amounts.len();
        if count as f64 > average * HIGH_VOLUME_MULTIPLIER {
            patterns.push(ActorPattern {
                kind: ActorPatternKind::HighVolume,
                description: format!(
                    "{actor} posted {count} transactions ({:.1}x the average of {average:.1})",
                    count as f64 / average
                ),
                actors: vec![actor.clone()],
                risk_level: if count > HIGH_VOLUME_HIGH_COUNT { RiskLevel::High } else { RiskLevel::Medium },
            });
        }
    }

    // Pattern 2: top 10% of actors hold most of the activity
    let mut by_volume: Vec<(&ActorId, usize)> =
        activity.iter().map(|(id, a)| (id, a.amounts.len())).collect();
    by_volume.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    let top_n = ((activity.len() as f64 * TOP_ACTOR_SHARE).ceil() as usize).max(1);
    let top_volume: usize = by_volume.iter().take(top_n).map(|(_, c)| c).sum();
    let share = if total_transactions > 0 { top_volume as f64 / total_transactions as f64 } else { 0.0 };
    if share > CONCENTRATION_MEDIUM {
        patterns.push(ActorPattern {
            kind: ActorPatternKind::ActivityConcentration,
            description: format!("Top {top_n} actor(s) hold {:.0}% of all transactions", share * 100.0),
            actors: by_volume.iter().take(top_n).map(|(id, _)| (*id).clone()).collect(),
            risk_level: if share > CONCENTRATION_HIGH { RiskLevel::High } else { RiskLevel::Medium },
        });
    }

    // Pattern 3: several actors working weekends
    let weekend_actors: Vec<ActorId> = activity
        .iter()
        .filter(|(_, a)| {
            !a.amounts.is_empty() && a.weekend_count as f64 / a.amounts.len() as f64 > WEEKEND_ACTOR_SHARE
        })
        .map(|(id, _)| id.clone())
        .collect();
    if weekend_actors.len() > WEEKEND_CLUSTER_MEDIUM {
        patterns.push(ActorPattern {
            kind: ActorPatternKind::WeekendCluster,
            description: format!("{} actors post more than 30% of their work on weekends", weekend_actors.len()),
            risk_level: if weekend_actors.len() > WEEKEND_CLUSTER_HIGH { RiskLevel::High } else { RiskLevel::Medium },
            actors: weekend_actors,
        });
    }

    patterns
}
