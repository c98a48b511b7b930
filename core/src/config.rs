use crate::error::{ForensicError, ForensicResult};
use serde::{Deserialize, Serialize};

// ── Defaults ─────────────────────────────────────────────────────────────────

pub const DEFAULT_HIGH_VALUE_THRESHOLD: f64 = 10_000.0;
pub const DEFAULT_SPLITTING_THRESHOLDS: [f64; 6] =
    [1_000.0, 5_000.0, 10_000.0, 25_000.0, 50_000.0, 100_000.0];
pub const DEFAULT_ROUND_THRESHOLDS: [f64; 5] = [1_000.0, 5_000.0, 10_000.0, 25_000.0, 50_000.0];
pub const DEFAULT_FOREST_SEED: u64 = 0x5EED_F0E5_7A11_D17E;

const DEFAULT_SUSPICIOUS_VENDOR_KEYWORDS: &[&str] = &[
    "cash", "test", "temp", "dummy", "unknown", "misc", "varios", "efectivo",
];

// ── Sections ─────────────────────────────────────────────────────────────────

/// Base per-record scoring (Pass B) and the alert cut-off.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringConfig {
    pub high_value_threshold: f64,
    /// STATISTICAL_OUTLIER fires above `high_value_threshold × multiplier`.
    pub statistical_outlier_multiplier: f64,
    /// Records scoring strictly above this count as alerts.
    pub alert_score_threshold: u32,
    /// Basic Benford: percentage-point deviation of the record's leading digit.
    pub basic_benford_deviation_pct: f64,
    pub round_amount_unit: f64,
    /// Inclusive off-hours bounds: hour >= start or hour <= end.
    pub off_hours_start: u32,
    pub off_hours_end: u32,
    pub suspicious_vendor_keywords: Vec<String>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            high_value_threshold: DEFAULT_HIGH_VALUE_THRESHOLD,
            statistical_outlier_multiplier: 5.0,
            alert_score_threshold: 40,
            basic_benford_deviation_pct: 5.0,
            round_amount_unit: 1_000.0,
            off_hours_start: 20,
            off_hours_end: 6,
            suspicious_vendor_keywords: DEFAULT_SUSPICIOUS_VENDOR_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SplittingConfig {
    /// Ascending. The first threshold the window evades wins.
    pub thresholds: Vec<f64>,
    pub time_window_days: f64,
    /// Every member must stay below `threshold × evasion_margin`.
    pub evasion_margin: f64,
    pub cluster_window_days: f64,
    pub round_thresholds: Vec<f64>,
    /// Members in `[threshold × floor, threshold)` count as just-below.
    pub round_band_floor: f64,
}

impl Default for SplittingConfig {
    fn default() -> Self {
        Self {
            thresholds: DEFAULT_SPLITTING_THRESHOLDS.to_vec(),
            time_window_days: 30.0,
            evasion_margin: 0.9,
            cluster_window_days: 7.0,
            round_thresholds: DEFAULT_ROUND_THRESHOLDS.to_vec(),
            round_band_floor: 0.8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BenfordConfig {
    pub min_sample_size: usize,
    pub z_critical: f64,
    pub deviation_pct_threshold: f64,
}

impl Default for BenfordConfig {
    fn default() -> Self {
        Self {
            min_sample_size: 30,
            z_critical: 1.96,
            deviation_pct_threshold: 1.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IsolationForestConfig {
    pub trees: usize,
    pub max_subsample: usize,
    pub min_records: usize,
    /// Share of the population above the anomaly threshold.
    pub contamination: f64,
    pub fallback_threshold: f64,
    pub seed: u64,
}

impl Default for IsolationForestConfig {
    fn default() -> Self {
        Self {
            trees: 50,
            max_subsample: 256,
            min_records: 10,
            contamination: 0.05,
            fallback_threshold: 0.6,
            seed: DEFAULT_FOREST_SEED,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ActorConfig {
    /// Exclusive off-hours bounds: hour < before or hour > after.
    pub off_hours_before: u32,
    pub off_hours_after: u32,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            off_hours_before: 6,
            off_hours_after: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EntropyConfig {
    pub threshold: f64,
}

impl Default for EntropyConfig {
    fn default() -> Self {
        Self { threshold: 0.1 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IqrConfig {
    pub fence_multiplier: f64,
    /// Fence used when IQR is zero: `high_value_threshold × fallback_multiplier`.
    pub fallback_multiplier: f64,
}

impl Default for IqrConfig {
    fn default() -> Self {
        Self {
            fence_multiplier: 1.5,
            fallback_multiplier: 5.0,
        }
    }
}

// ── Root ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ForensicConfig {
    pub scoring: ScoringConfig,
    pub splitting: SplittingConfig,
    pub benford: BenfordConfig,
    pub isolation_forest: IsolationForestConfig,
    pub actors: ActorConfig,
    pub entropy: EntropyConfig,
    pub iqr: IqrConfig,
}

impl ForensicConfig {
    /// Load overrides from a JSON file. Missing keys keep their defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: ForensicConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Config with hardcoded defaults for use in tests: fixed seed, fewer trees.
    pub fn default_test() -> Self {
        let mut config = Self::default();
        config.isolation_forest.trees = 25;
        config.isolation_forest.seed = 42;
        config
    }

    pub fn validate(&self) -> ForensicResult<()> {
        ensure_ascending("splitting.thresholds", &self.splitting.thresholds)?;
        ensure_ascending("splitting.round_thresholds", &self.splitting.round_thresholds)?;

        if self.scoring.high_value_threshold <= 0.0 {
            return Err(ForensicError::Config {
                message: "scoring.high_value_threshold must be positive".into(),
            });
        }
        if self.isolation_forest.trees == 0 || self.isolation_forest.max_subsample < 2 {
            return Err(ForensicError::Config {
                message: "isolation_forest needs at least one tree and a subsample of 2".into(),
            });
        }
        if !(0.0..1.0).contains(&self.isolation_forest.contamination) {
            return Err(ForensicError::Config {
                message: "isolation_forest.contamination must be in [0, 1)".into(),
            });
        }
        if self.splitting.time_window_days < self.splitting.cluster_window_days {
            return Err(ForensicError::Config {
                message: "splitting.time_window_days must cover cluster_window_days".into(),
            });
        }
        Ok(())
    }
}

fn ensure_ascending(field: &str, values: &[f64]) -> ForensicResult<()> {
    let ascending = values.windows(2).all(|w| w[0] < w[1]);
    if values.is_empty() || !ascending || values.iter().any(|v| *v <= 0.0) {
        return Err(ForensicError::InvalidThresholds { field: field.to_string() });
    }
    Ok(())
}
