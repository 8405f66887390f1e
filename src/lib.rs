//! Fleet KPI - cleaning and KPI derivation engine for fleet transport trip records
//!
//! The crate takes raw, inconsistently formatted trip records (fuel, cost,
//! time, load quantities) and produces a validated, typed dataset plus a
//! fixed set of fleet-performance indicators through a deterministic
//! pipeline: record loading → value normalization → dataset cleaning → KPI
//! derivation.
//!
//! Web serving, dashboard rendering, and file plumbing are the callers' job:
//! they hand the pipeline a raw JSON record collection and get back a
//! [`KpiReport`] and/or a cleaned [`Dataset`]. Every invocation recomputes
//! from the full record set; the crate holds no cross-invocation state.

pub mod cleaner;
pub mod error;
pub mod kpi;
pub mod loader;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod types;

pub use cleaner::{CleanStats, DatasetCleaner};
pub use error::PipelineError;
pub use kpi::KpiEngine;
pub use loader::RecordLoader;
pub use pipeline::{kpis_from_json, KpiPipeline, PipelineConfig};
pub use report::{fallback_report, ReportEnvelope};
pub use types::{Dataset, Field, KpiReport, KpiValue, TripRecord};

/// Engine version embedded in report envelopes
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for report envelopes
pub const PRODUCER_NAME: &str = "fleet-kpi";
