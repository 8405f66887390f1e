//! Error types for the fleet KPI pipeline

use thiserror::Error;

/// Errors that can escape the pipeline boundary.
///
/// Per-field problems (unparseable money, bad dates, non-numeric
/// quantities) never surface here; they resolve locally to defaults
/// during normalization. Only source-level failures are reported, and
/// consumers treat them as "no data" rather than hard errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid JSON in record source: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unrecognized record collection shape: {0}")]
    UnrecognizedShape(String),
}
