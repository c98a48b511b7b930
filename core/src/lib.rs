//! forensic-core: risk scoring and anomaly detection over audit populations.
//!
//! Entry point is `engine::RiskEngine::analyze`. Each population-level
//! detector lives in its own module and implements `detector::ForensicDetector`.

pub mod actor_profiler;
pub mod benford_analyzer;
pub mod config;
pub mod detector;
pub mod duplicates;
pub mod eda_statistics;
pub mod engine;
pub mod entropy;
pub mod error;
pub mod isolation_forest_detector;
pub mod parse;
pub mod record;
pub mod report;
pub mod rng;
pub mod sequential_analyzer;
pub mod splitting_detector;
pub mod types;
