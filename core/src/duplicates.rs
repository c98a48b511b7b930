//! Duplicate keying: composite keys and their population frequency.
//!
//! Key composition, in priority order:
//!   1. The mapped unique-id value is always included.
//!   2. With a monetary column, the parsed amount is appended (stop).
//!   3. Else with category or subcategory, both are appended (stop).
//!   4. Else the unique-id alone.
//!
//! A record whose key occurs more than once is a DUPLICATE_TRANSACTION.

use crate::record::{ColumnMapping, Record};
use std::collections::HashMap;

pub fn duplicate_key(record: &Record, mapping: &ColumnMapping) -> Option<String> {
    let unique_id = record.text(mapping.unique_id()).unwrap_or_default();

    if mapping.has_monetary() {
        return Some(format!("{unique_id}|{}", record.monetary_value));
    }

    if mapping.category.is_some() || mapping.subcategory.is_some() {
        let category = record.text(mapping.category()).unwrap_or_default();
        let subcategory = record.text(mapping.subcategory()).unwrap_or_default();
        return Some(format!("{unique_id}|{category}|{subcategory}"));
    }

    // An empty key would collide across the whole population.
    (!unique_id.is_empty()).then_some(unique_id)
}

/// Frequency of every composite key across the population.
#[derive(Debug, Default)]
pub struct DuplicateIndex {
    counts: HashMap<String, usize>,
}

impl DuplicateIndex {
    pub fn build(records: &[Record], mapping: &ColumnMapping) -> Self {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for record in records {
            if let Some(key) = duplicate_key(record, mapping) {
                *counts.entry(key).or_insert(0) += 1;
            }
        }
        Self { counts }
    }

    pub fn is_duplicate(&self, record: &Record, mapping: &ColumnMapping) -> bool {
        duplicate_key(record, mapping)
            .and_then(|key| self.counts.get(&key))
            .is_some_and(|count| *count > 1)
    }

    /// Number of distinct keys seen more than once.
    pub fn duplicated_key_count(&self) -> usize {
        self.counts.values().filter(|c| **c > 1).count()
    }
}
