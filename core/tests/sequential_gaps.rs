//! Sequential integrity: gaps in document numbering.

use forensic_core::{
    config::ForensicConfig,
    detector::{DetectionContext, ForensicDetector},
    record::{ColumnMapping, Record},
    sequential_analyzer::{analyze_sequence, SequencePatternKind, SequentialAnalyzer, MAX_LISTED_MISSING},
    types::RiskLevel,
};

#[test]
fn gaps_are_reported_with_sizes_and_totals() {
    let analysis = analyze_sequence(vec![1, 2, 3, 7, 8, 20]);

    assert_eq!(analysis.gaps.len(), 2);
    let first = &analysis.gaps[0];
    assert_eq!((first.start, first.end, first.size), (4, 6, 3));
    assert_eq!(first.missing_ids, vec![4, 5, 6]);
    assert_eq!(first.risk_level, RiskLevel::Low);

    let second = &analysis.gaps[1];
    assert_eq!((second.start, second.end, second.size), (9, 19, 11));
    assert_eq!(second.risk_level, RiskLevel::Medium);

    assert_eq!(analysis.total_missing, 14);
    assert_eq!(analysis.largest_gap, 11);
    assert_eq!(analysis.sequence_start, Some(1));
    assert_eq!(analysis.sequence_end, Some(20));
}

#[test]
fn unsorted_and_duplicated_ids_are_normalized() {
    let analysis = analyze_sequence(vec![8, 3, 1, 20, 2, 7, 7, 3]);
    assert_eq!(analysis.unique_numbers, 6);
    assert_eq!(analysis.total_missing, 14);
}

#[test]
fn contiguous_sequence_has_no_gaps() {
    let analysis = analyze_sequence((100..200).collect());
    assert!(analysis.gaps.is_empty());
    assert!(analysis.patterns.is_empty());
    assert_eq!(analysis.missing_ratio, 0.0);
    assert_eq!(analysis.overall_risk(), RiskLevel::Low);
}

#[test]
fn large_gaps_list_at_most_the_cap() {
    let analysis = analyze_sequence(vec![1, 500]);
    let gap = &analysis.gaps[0];
    assert_eq!(gap.size, 498);
    assert_eq!(gap.missing_ids.len() as u64, MAX_LISTED_MISSING);
    assert!(gap.missing_ids_truncated);
    assert_eq!(gap.risk_level, RiskLevel::High);
}

#[test]
fn deletion_patterns_are_detected() {
    // three gaps of 12 and a final gap of 150
    let analysis = analyze_sequence(vec![1, 14, 27, 40, 191]);
    let kinds: Vec<SequencePatternKind> = analysis.patterns.iter().map(|p| p.kind).collect();

    assert!(kinds.contains(&SequencePatternKind::SystematicDeletion));
    assert!(kinds.contains(&SequencePatternKind::RecentConcealment));
    assert!(kinds.contains(&SequencePatternKind::IntegrityCompromised));
    assert_eq!(analysis.overall_risk(), RiskLevel::High);
}

#[test]
fn regular_gap_sizes_are_a_pattern() {
    // gaps of 2, 2, 2 between 1, 4, 7, 10 and a long contiguous tail
    let mut ids = vec![1, 4, 7];
    ids.extend(10..60);
    let analysis = analyze_sequence(ids);
    let kinds: Vec<SequencePatternKind> = analysis.patterns.iter().map(|p| p.kind).collect();
    assert_eq!(kinds, vec![SequencePatternKind::RegularPattern]);
}

#[test]
fn gap_borders_are_the_neighbouring_ids() {
    let analysis = analyze_sequence(vec![1, 2, 3, 7, 8, 20]);
    assert!(analysis.gap_bordering(3).is_some());
    assert!(analysis.gap_bordering(7).is_some());
    assert_eq!(analysis.gap_bordering(20).map(|g| g.start), Some(9));
    assert!(analysis.gap_bordering(2).is_none());
}

#[test]
fn detector_extracts_numbers_from_prefixed_ids() {
    let records: Vec<Record> = ["INV-0001", "INV-0002", "INV-0005", "", "draft"]
        .iter()
        .enumerate()
        .map(|(i, inv)| Record::new(i.to_string()).with_field("invoice", *inv))
        .collect();
    let mapping = ColumnMapping { sequential_id: Some("invoice".into()), ..ColumnMapping::default() };
    let config = ForensicConfig::default_test();
    let ctx = DetectionContext::new(&records, &mapping, &config);

    let analysis = SequentialAnalyzer.detect(&ctx);
    assert_eq!(analysis.unique_numbers, 3);
    assert_eq!(analysis.gaps.len(), 1);
    assert_eq!(analysis.gaps[0].missing_ids, vec![3, 4]);
}

#[test]
fn unmapped_sequential_column_returns_empty_result() {
    let records = vec![Record::new("1").with_field("invoice", "INV-1")];
    let mapping = ColumnMapping::default();
    let config = ForensicConfig::default_test();
    let ctx = DetectionContext::new(&records, &mapping, &config);

    let analysis = SequentialAnalyzer.detect(&ctx);
    assert!(analysis.gaps.is_empty());
    assert_eq!(analysis.sequence_start, None);
}
