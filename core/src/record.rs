//! Typed records: the field map every detector reads from.
//!
//! RULE: Detectors never index `raw` directly.
//! All access goes through `Record::field` / `Record::text`,
//! which return `None` for missing, null or blank values.

use crate::types::{RecordId, RiskFactor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single scalar cell of an imported row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Render as text. Integral numbers lose their trailing `.0`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Bool(b) => Some(b.to_string()),
            Self::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
                Some(format!("{}", *n as i64))
            }
            Self::Number(n) => Some(n.to_string()),
            Self::Text(s) => Some(s.clone()),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

pub type FieldMap = BTreeMap<String, FieldValue>;

/// One row of the population, plus the engine's annotations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Record {
    pub id: RecordId,
    #[serde(default)]
    pub raw: FieldMap,
    #[serde(default)]
    pub monetary_value: f64,
    #[serde(default)]
    pub risk_score: u32,
    #[serde(default)]
    pub risk_factors: Vec<RiskFactor>,
}

impl Record {
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Builder used by tests and importers.
    pub fn with_field(mut self, column: &str, value: impl Into<FieldValue>) -> Self {
        self.raw.insert(column.to_string(), value.into());
        self
    }

    /// Look up a mapped column. `None` when unmapped, absent or blank.
    pub fn field(&self, column: Option<&str>) -> Option<&FieldValue> {
        let value = self.raw.get(column?)?;
        if value.is_blank() {
            None
        } else {
            Some(value)
        }
    }

    /// Trimmed, non-empty text of a mapped column.
    pub fn text(&self, column: Option<&str>) -> Option<String> {
        self.field(column)
            .and_then(FieldValue::as_text)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn has_factor(&self, factor: RiskFactor) -> bool {
        self.risk_factors.contains(&factor)
    }

    /// Attach a factor and add its weight. A factor is attached at most once;
    /// returns false when it was already present.
    pub fn add_factor(&mut self, factor: RiskFactor) -> bool {
        if self.has_factor(factor) {
            return false;
        }
        self.risk_factors.push(factor);
        self.risk_score += factor.weight();
        true
    }
}

/// Column names the caller resolved for this population.
/// Every entry is optional; detectors whose columns are unmapped
/// return their empty result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct ColumnMapping {
    pub unique_id: Option<String>,
    pub monetary_value: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub date: Option<String>,
    pub user: Option<String>,
    pub vendor: Option<String>,
    pub timestamp: Option<String>,
    pub sequential_id: Option<String>,
}

impl ColumnMapping {
    pub fn unique_id(&self) -> Option<&str> {
        self.unique_id.as_deref()
    }

    pub fn monetary_value(&self) -> Option<&str> {
        self.monetary_value.as_deref()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn subcategory(&self) -> Option<&str> {
        self.subcategory.as_deref()
    }

    pub fn date(&self) -> Option<&str> {
        self.date.as_deref()
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn vendor(&self) -> Option<&str> {
        self.vendor.as_deref()
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.timestamp.as_deref()
    }

    pub fn sequential_id(&self) -> Option<&str> {
        self.sequential_id.as_deref()
    }

    pub fn has_monetary(&self) -> bool {
        self.monetary_value.is_some()
    }

    pub fn has_date(&self) -> bool {
        self.date.is_some() || self.timestamp.is_some()
    }

    /// `category|subcategory` key used to match entropy findings.
    pub fn category_combination(&self, record: &Record) -> Option<String> {
        if self.category.is_none() && self.subcategory.is_none() {
            return None;
        }
        let category = record.text(self.category()).unwrap_or_default();
        let subcategory = record.text(self.subcategory()).unwrap_or_default();
        Some(format!("{category}|{subcategory}"))
    }
}
