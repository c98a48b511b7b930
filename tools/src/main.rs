//! forensic-runner: headless risk analysis of one audit population.
//!
//! Usage:
//!   forensic-runner --records rows.json --mapping mapping.json
//!   forensic-runner --records rows.json --mapping mapping.json --config forensic.json \
//!                   --id-field invoice_no --output report.json

use anyhow::{bail, Context, Result};
use forensic_core::{
    config::ForensicConfig,
    engine::RiskEngine,
    record::{ColumnMapping, FieldMap, FieldValue, Record},
    report::RiskAnalysisResult,
    types::RiskFactor,
};
use serde::Serialize;
use std::env;

#[derive(Serialize)]
struct Report<'a> {
    report_id: String,
    generated_at: String,
    records_file: &'a str,
    #[serde(flatten)]
    result: &'a RiskAnalysisResult,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let Some(records_path) = flag_value(&args, "--records") else {
        bail!("missing --records <file>");
    };
    let Some(mapping_path) = flag_value(&args, "--mapping") else {
        bail!("missing --mapping <file>");
    };
    let config_path = flag_value(&args, "--config");
    let id_field = flag_value(&args, "--id-field");
    let output = flag_value(&args, "--output");

    eprintln!("forensic-runner");
    eprintln!("  records:   {records_path}");
    eprintln!("  mapping:   {mapping_path}");
    eprintln!("  config:    {}", config_path.unwrap_or("(defaults)"));
    eprintln!("  id field:  {}", id_field.unwrap_or("(row number)"));
    eprintln!();

    let config = match config_path {
        Some(path) => ForensicConfig::load(path)?,
        None => ForensicConfig::default(),
    };
    let mapping: ColumnMapping = read_json(mapping_path)?;
    let rows: Vec<serde_json::Value> = read_json(records_path)?;
    let records = rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| to_record(i, row, id_field))
        .collect::<Result<Vec<_>>>()?;
    log::info!("loaded {} records from {records_path}", records.len());

    let engine = RiskEngine::new(config)?;
    let result = engine.analyze(records, &mapping);

    let report = Report {
        report_id: uuid::Uuid::new_v4().to_string(),
        generated_at: chrono::Utc::now().to_rfc3339(),
        records_file: records_path,
        result: &result,
    };
    print_summary(&report);

    let json = serde_json::to_string_pretty(&report)?;
    match output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("Cannot write {path}"))?;
            eprintln!("  report written to {path}");
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// A row is either a plain object of cells, or an `{id, raw}` record.
fn to_record(index: usize, row: serde_json::Value, id_field: Option<&str>) -> Result<Record> {
    let serde_json::Value::Object(object) = row else {
        bail!("row {} is not a JSON object", index + 1);
    };

    if matches!(object.get("raw"), Some(serde_json::Value::Object(_))) {
        let record: Record = serde_json::from_value(serde_json::Value::Object(object))
            .with_context(|| format!("row {} is not a valid record", index + 1))?;
        return Ok(record);
    }

    let mut raw = FieldMap::new();
    for (column, value) in object {
        raw.insert(column, to_field(value));
    }

    let id = id_field
        .and_then(|f| raw.get(f))
        .and_then(FieldValue::as_text)
        .unwrap_or_else(|| (index + 1).to_string());

    Ok(Record { id, raw, ..Record::default() })
}

/// Nested arrays and objects are kept as their JSON text.
fn to_field(value: serde_json::Value) -> FieldValue {
    match value {
        serde_json::Value::Null => FieldValue::Null,
        serde_json::Value::Bool(b) => FieldValue::Bool(b),
        serde_json::Value::Number(n) => n.as_f64().map_or(FieldValue::Null, FieldValue::Number),
        serde_json::Value::String(s) => FieldValue::Text(s),
        other => FieldValue::Text(other.to_string()),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T> {
    let content = std::fs::read_to_string(path).with_context(|| format!("Cannot read {path}"))?;
    serde_json::from_str(&content).with_context(|| format!("Cannot parse {path}"))
}

fn print_summary(report: &Report<'_>) {
    let profile = &report.result.profile;
    let advanced = &report.result.advanced;

    eprintln!("=== ANALYSIS SUMMARY ===");
    eprintln!("  report_id:      {}", report.report_id);
    eprintln!("  generated_at:   {}", report.generated_at);
    eprintln!("  records:        {}", profile.total_records);
    eprintln!("  average score:  {:.1}", profile.average_score);
    eprintln!("  alerts:         {}", profile.alert_count);
    for bucket in &profile.score_distribution {
        eprintln!("  score {:<8} {}", bucket.label, bucket.count);
    }

    eprintln!();
    eprintln!("=== DETECTORS ===");
    eprintln!(
        "  benford:        {} values, first digit {:?}",
        advanced.enhanced_benford.sample_size, advanced.enhanced_benford.first_digit.conformity
    );
    eprintln!(
        "  splitting:      {} groups, ${:.0} suspicious",
        advanced.splitting.groups.len(),
        advanced.splitting.total_suspicious_amount
    );
    eprintln!(
        "  sequential:     {} gaps, {} missing",
        advanced.sequential.gaps.len(),
        advanced.sequential.total_missing
    );
    eprintln!(
        "  isolation:      {} anomalies (threshold {:.3})",
        advanced.isolation_forest.anomalies.len(),
        advanced.isolation_forest.threshold
    );
    eprintln!("  actors:         {} suspicious", advanced.actors.suspicious_actors.len());
    eprintln!("  iqr outliers:   {}", advanced.eda.quartiles.outlier_count);

    let mut top: Vec<(RiskFactor, usize)> = RiskFactor::ALL
        .iter()
        .map(|f| (*f, profile.factor_count(*f)))
        .filter(|(_, n)| *n > 0)
        .collect();
    top.sort_by(|a, b| b.1.cmp(&a.1));
    if !top.is_empty() {
        eprintln!();
        eprintln!("=== TOP FACTORS ===");
        for (factor, count) in top.iter().take(5) {
            eprintln!("  {:<24} {count}", factor.tag());
        }
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}
