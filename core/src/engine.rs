//! The risk engine: orchestrates every pass over one population.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   A. Global aggregates: parse amounts, leading-digit counts, duplicate keys
//!   B. Base score per record (value, Benford, calendar, vendor, duplicates)
//!   -  Independent detectors, once each over the full population:
//!        enhanced Benford, splitting, sequential integrity,
//!        Isolation Forest, actor behavior, entropy (collaborator)
//!   C. Attribution: detector findings merged onto records by id,
//!      actor or category combination
//!   D. EDA statistics, then the IQR outlier pass
//!   -  Assembly of the profile and the per-detector summaries
//!
//! RULES:
//!   - Pass A completes before Pass B reads any aggregate.
//!   - Detectors read an immutable context; only the engine writes records.
//!   - Scores only ever grow: every factor adds its fixed weight once.
//!   - Nothing here fails on data. Missing columns and bad cells degrade
//!     to empty detector results and neutral values.

use crate::{
    actor_profiler::{ActorAnalysis, ActorProfiler},
    benford_analyzer::{EnhancedBenfordAnalysis, EnhancedBenfordAnalyzer, LeadingDigitCounts},
    config::ForensicConfig,
    detector::{DetectionContext, ForensicDetector},
    duplicates::DuplicateIndex,
    eda_statistics::metrics_for_records,
    entropy::{EntropyAnalysis, EntropyAnalyzer, NoEntropyAnalyzer},
    error::ForensicResult,
    isolation_forest_detector::{IsolationForestAnalysis, IsolationForestDetector},
    parse::{extract_sequence_number, parse_amount, significant_digits},
    record::{ColumnMapping, Record},
    report::{AdvancedAnalysis, RiskAnalysisResult, RiskProfile},
    sequential_analyzer::{SequentialAnalysis, SequentialAnalyzer},
    splitting_detector::{SplittingAnalysis, SplittingDetector},
    types::{RiskFactor, RiskLevel},
};
use std::collections::{HashMap, HashSet};

pub struct RiskEngine {
    config: ForensicConfig,
    entropy: Box<dyn EntropyAnalyzer>,
}

/// Outputs of the independent detectors for one analysis.
struct Findings {
    enhanced_benford: EnhancedBenfordAnalysis,
    splitting: SplittingAnalysis,
    sequential: SequentialAnalysis,
    isolation_forest: IsolationForestAnalysis,
    actors: ActorAnalysis,
    entropy: EntropyAnalysis,
}

/// Lookup tables from findings to the severity attributed to a record.
struct AttributionIndex<'f> {
    splitting: HashMap<&'f str, RiskLevel>,
    ml: HashMap<&'f str, RiskLevel>,
    actors: HashMap<&'f str, RiskLevel>,
    entropy: HashMap<&'f str, RiskLevel>,
    sequential: &'f SequentialAnalysis,
    benford_first: HashSet<u8>,
    benford_second: HashSet<u8>,
}

impl<'f> AttributionIndex<'f> {
    fn build(findings: &'f Findings) -> Self {
        let mut splitting = HashMap::new();
        for group in &findings.splitting.groups {
            for member in &group.members {
                raise(&mut splitting, member.record_id.as_str(), group.risk_level);
            }
        }

        let ml = findings
            .isolation_forest
            .anomalies
            .iter()
            .map(|a| (a.record_id.as_str(), a.risk_level))
            .collect();

        let actors = findings
            .actors
            .suspicious_actors
            .iter()
            .map(|a| (a.actor_id.as_str(), a.risk_level))
            .collect();

        let mut entropy = HashMap::new();
        for anomaly in &findings.entropy.anomalous_categories {
            raise(&mut entropy, anomaly.combination.as_str(), anomaly.risk_level);
        }

        Self {
            splitting,
            ml,
            actors,
            entropy,
            sequential: &findings.sequential,
            benford_first: findings.enhanced_benford.first_digit.suspicious_digits().into_iter().collect(),
            benford_second: findings.enhanced_benford.second_digit.suspicious_digits().into_iter().collect(),
        }
    }
}

/// Keep the most severe level seen for a key.
fn raise<K: std::hash::Hash + Eq>(map: &mut HashMap<K, RiskLevel>, key: K, level: RiskLevel) {
    let entry = map.entry(key).or_insert(level);
    if level > *entry {
        *entry = level;
    }
}

impl RiskEngine {
    /// Build an engine after validating the configuration.
    pub fn new(config: ForensicConfig) -> ForensicResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            entropy: Box::new(NoEntropyAnalyzer),
        })
    }

    /// Engine with the stock thresholds; they always validate.
    pub fn with_defaults() -> Self {
        Self {
            config: ForensicConfig::default(),
            entropy: Box::new(NoEntropyAnalyzer),
        }
    }

    /// Wire in the categorical entropy collaborator.
    pub fn with_entropy_analyzer(mut self, analyzer: Box<dyn EntropyAnalyzer>) -> Self {
        self.entropy = analyzer;
        self
    }

    pub fn config(&self) -> &ForensicConfig {
        &self.config
    }

    /// Score one population. Pure: the same input and config give the same result.
    pub fn analyze(&self, mut records: Vec<Record>, mapping: &ColumnMapping) -> RiskAnalysisResult {
        let config = &self.config;

        // ── Pass A: global aggregates ───────────────────────────────────────
        let mut digits = LeadingDigitCounts::default();
        for record in &mut records {
            record.risk_score = 0;
            record.risk_factors.clear();
            record.monetary_value = if mapping.has_monetary() {
                parse_amount(record.field(mapping.monetary_value()))
            } else {
                0.0
            };
            if record.monetary_value != 0.0 {
                digits.observe(record.monetary_value);
            }
        }
        let duplicates = DuplicateIndex::build(&records, mapping);
        log::debug!(
            "pass A: {} records, {} leading digits, {} duplicated keys",
            records.len(),
            digits.total(),
            duplicates.duplicated_key_count()
        );

        // ── Pass B inputs, detectors and Pass C inputs (read-only) ─────────
        let (base_factors, findings, attributions) = {
            let ctx = DetectionContext::new(&records, mapping, config);
            let base_factors: Vec<Vec<RiskFactor>> = (0..ctx.len())
                .map(|i| self.base_factors(&ctx, i, &digits, &duplicates))
                .collect();

            let findings = self.run_detectors(&ctx);
            let attributions: Vec<Vec<(RiskFactor, RiskLevel)>> = {
                let index = AttributionIndex::build(&findings);
                ctx.records.iter().map(|r| attribute(r, mapping, &index)).collect()
            };
            (base_factors, findings, attributions)
        };

        // ── Pass B: base score ──────────────────────────────────────────────
        let mut alert_count = 0usize;
        for (record, factors) in records.iter_mut().zip(base_factors) {
            for factor in factors {
                record.add_factor(factor);
            }
            if record.risk_score > config.scoring.alert_score_threshold {
                alert_count += 1;
            }
        }
        log::debug!("pass B: {alert_count} records above the alert threshold");

        // ── Pass C: attribution merge ───────────────────────────────────────
        for (record, found) in records.iter_mut().zip(attributions) {
            for (factor, level) in found {
                if record.add_factor(factor) && level == RiskLevel::High {
                    alert_count += 1;
                }
            }
        }

        // ── Pass D: EDA and IQR outliers ────────────────────────────────────
        let mut eda = if mapping.has_monetary() {
            metrics_for_records(&records)
        } else {
            Default::default()
        };
        if eda.count > 0 {
            eda.set_outlier_fence(
                config.iqr.fence_multiplier,
                config.scoring.high_value_threshold * config.iqr.fallback_multiplier,
            );
            let fence = eda.quartiles.outlier_threshold;
            for record in &mut records {
                let already_flagged = record.has_factor(RiskFactor::StatisticalOutlier)
                    || record.has_factor(RiskFactor::IqrOutlier);
                if record.monetary_value > fence && !already_flagged {
                    record.add_factor(RiskFactor::IqrOutlier);
                    eda.quartiles.outlier_count += 1;
                }
            }
        }

        // ── Assembly ────────────────────────────────────────────────────────
        let profile = RiskProfile::build(&records, alert_count);
        log::info!(
            "analysis complete: {} records, average score {:.1}, {} alerts",
            profile.total_records,
            profile.average_score,
            profile.alert_count
        );

        let advanced = AdvancedAnalysis {
            basic_benford: digits.summary(config.scoring.basic_benford_deviation_pct),
            enhanced_benford: findings.enhanced_benford,
            splitting: findings.splitting,
            sequential: findings.sequential,
            isolation_forest: findings.isolation_forest,
            actors: findings.actors,
            entropy: findings.entropy,
            eda,
            duplicate_keys: duplicates.duplicated_key_count(),
        };

        RiskAnalysisResult { records, profile, advanced }
    }

    /// Pass B rules for record `index`.
    fn base_factors(
        &self,
        ctx: &DetectionContext<'_>,
        index: usize,
        digits: &LeadingDigitCounts,
        duplicates: &DuplicateIndex,
    ) -> Vec<RiskFactor> {
        let scoring = &self.config.scoring;
        let record = &ctx.records[index];
        let mapping = ctx.mapping;
        let mut factors = Vec::new();

        if mapping.has_monetary() {
            let amount = record.monetary_value;
            if amount > scoring.high_value_threshold {
                factors.push(RiskFactor::HighValue);
            }
            if amount != 0.0 && digits.is_anomalous(amount, scoring.basic_benford_deviation_pct) {
                factors.push(RiskFactor::BenfordAnomaly);
            }
        }

        if let Some(date) = ctx.date(index) {
            if date.is_weekend() {
                factors.push(RiskFactor::Weekend);
            }
        }
        if let Some(hour) = ctx.hour(index) {
            if hour >= scoring.off_hours_start || hour <= scoring.off_hours_end {
                factors.push(RiskFactor::OffHours);
            }
        }

        if mapping.has_monetary() {
            let amount = record.monetary_value.abs();
            if amount >= scoring.round_amount_unit && amount % scoring.round_amount_unit == 0.0 {
                factors.push(RiskFactor::RoundAmount);
            }
        }

        if let Some(vendor) = record.text(mapping.vendor()) {
            let vendor = vendor.to_lowercase();
            let suspicious = scoring
                .suspicious_vendor_keywords
                .iter()
                .any(|k| !k.is_empty() && vendor.contains(&k.to_lowercase()));
            if suspicious {
                factors.push(RiskFactor::SuspiciousVendor);
            }
        }

        if duplicates.is_duplicate(record, mapping) {
            factors.push(RiskFactor::DuplicateTransaction);
        }

        if mapping.has_monetary()
            && record.monetary_value > scoring.high_value_threshold * scoring.statistical_outlier_multiplier
        {
            factors.push(RiskFactor::StatisticalOutlier);
        }

        factors
    }

    fn run_detectors(&self, ctx: &DetectionContext<'_>) -> Findings {
        let findings = Findings {
            enhanced_benford: run(&EnhancedBenfordAnalyzer, ctx),
            splitting: run(&SplittingDetector, ctx),
            sequential: run(&SequentialAnalyzer, ctx),
            isolation_forest: run(&IsolationForestDetector, ctx),
            actors: run(&ActorProfiler, ctx),
            entropy: self.entropy.analyze(ctx.records, ctx.mapping, self.config.entropy.threshold),
        };
        log::debug!(
            "detectors: {} splitting groups, {} gaps, {} ml anomalies, {} suspicious actors, {} entropy findings",
            findings.splitting.groups.len(),
            findings.sequential.gaps.len(),
            findings.isolation_forest.anomalies.len(),
            findings.actors.suspicious_actors.len(),
            findings.entropy.anomalous_categories.len()
        );
        findings
    }
}

fn run<D: ForensicDetector>(detector: &D, ctx: &DetectionContext<'_>) -> D::Output {
    log::debug!("running detector '{}'", detector.name());
    detector.detect(ctx)
}

/// Pass C rules for one record.
fn attribute(record: &Record, mapping: &ColumnMapping, index: &AttributionIndex<'_>) -> Vec<(RiskFactor, RiskLevel)> {
    let mut found = Vec::new();

    if let Some(level) = index.splitting.get(record.id.as_str()) {
        found.push((RiskFactor::SplittingDetected, *level));
    }

    if let Some(level) = mapping
        .category_combination(record)
        .and_then(|combination| index.entropy.get(combination.as_str()).copied())
    {
        found.push((RiskFactor::EntropyAnomaly, level));
    }

    if let Some(level) = record
        .text(mapping.sequential_id())
        .and_then(|id| extract_sequence_number(&id))
        .and_then(|number| index.sequential.gap_bordering(number))
        .map(|gap| gap.risk_level)
    {
        found.push((RiskFactor::SequentialGaps, level));
    }

    if let Some(level) = index.ml.get(record.id.as_str()) {
        found.push((RiskFactor::MlAnomaly, *level));
    }

    if let Some(level) = record
        .text(mapping.user())
        .and_then(|actor| index.actors.get(actor.as_str()).copied())
    {
        found.push((RiskFactor::SuspiciousActor, level));
    }

    if let Some((first, second)) = significant_digits(record.monetary_value) {
        if index.benford_first.contains(&first) {
            found.push((RiskFactor::EnhancedBenfordFirst, RiskFactor::EnhancedBenfordFirst.severity()));
        }
        if record.monetary_value >= 10.0 && index.benford_second.contains(&second) {
            found.push((RiskFactor::EnhancedBenfordSecond, RiskFactor::EnhancedBenfordSecond.severity()));
        }
    }

    found
}
