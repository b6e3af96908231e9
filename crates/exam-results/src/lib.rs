//! Result computation and ranking engine for examination batches.
//!
//! Raw marks flow through [`results::ScoringSchemeEvaluator`] and
//! [`results::ResultAggregator`] into stored results, and every mutation of a batch ends with one
//! [`results::RankEngine`] pass so stored ranks always reflect the current standing.

pub mod config;
pub mod error;
pub mod results;
pub mod telemetry;
