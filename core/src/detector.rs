//! Detector trait and the shared read-only context.
//!
//! RULE: Every population-level detector implements ForensicDetector.
//! Detectors only read the context; they never touch record scores.
//! Attribution back onto records is the engine's job (Pass C).
//! Execution order is fixed and documented in engine.rs.

use crate::{
    config::ForensicConfig,
    parse::{parse_date, ParsedDate},
    record::{ColumnMapping, Record},
};

/// The contract every detector must fulfill.
pub trait ForensicDetector {
    type Output;

    /// Unique stable name for this detector.
    fn name(&self) -> &'static str;

    /// Run once over the full population. Must not fail: unmapped
    /// columns or too little data produce the empty output.
    fn detect(&self, ctx: &DetectionContext<'_>) -> Self::Output;
}

/// Everything a detector may read. Built once after Pass A.
pub struct DetectionContext<'a> {
    pub records: &'a [Record],
    pub mapping: &'a ColumnMapping,
    pub config: &'a ForensicConfig,
    dates: Vec<Option<ParsedDate>>,
    times: Vec<Option<ParsedDate>>,
}

impl<'a> DetectionContext<'a> {
    pub fn new(records: &'a [Record], mapping: &'a ColumnMapping, config: &'a ForensicConfig) -> Self {
        let dates: Vec<Option<ParsedDate>> = records
            .iter()
            .map(|r| {
                parse_date(r.field(mapping.date()))
                    .or_else(|| parse_date(r.field(mapping.timestamp())))
            })
            .collect();

        // Time of day prefers the timestamp column, then a timed date cell.
        let times = records
            .iter()
            .zip(&dates)
            .map(|(r, date)| {
                parse_date(r.field(mapping.timestamp()))
                    .filter(|t| t.has_time)
                    .or_else(|| (*date).filter(|d| d.has_time))
            })
            .collect();

        Self { records, mapping, config, dates, times }
    }

    /// Calendar date of record `index`, from the date column or the timestamp.
    pub fn date(&self, index: usize) -> Option<&ParsedDate> {
        self.dates.get(index).and_then(Option::as_ref)
    }

    /// Hour of day of record `index`, when a time component was present.
    pub fn hour(&self, index: usize) -> Option<u32> {
        self.times
            .get(index)
            .and_then(Option::as_ref)
            .and_then(ParsedDate::hour)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
