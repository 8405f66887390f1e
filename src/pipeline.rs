//! Pipeline orchestration
//!
//! This module provides the public API for the crate: one invocation runs
//! loader → cleaner → KPI engine over a raw record collection. Each run is a
//! synchronous, side-effect-free transformation over its own dataset; the
//! pipeline holds no state across invocations and is safe to call from
//! concurrent request contexts.

use crate::cleaner::{CleanStats, DatasetCleaner};
use crate::error::PipelineError;
use crate::kpi::{KpiEngine, DEFAULT_SERIES_WINDOW};
use crate::loader::RecordLoader;
use crate::types::{Dataset, KpiReport};
use serde_json::Value;

/// Year appended to year-less `FECHA` values before parsing.
pub const DEFAULT_ANCHOR_YEAR: i32 = 2024;

/// Pipeline configuration, constructor-injected. No process-wide paths or
/// globals.
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    /// Year assumed for `DD-Mon` date strings.
    pub anchor_year: i32,
    /// Month buckets kept per monthly series.
    pub series_window: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            anchor_year: DEFAULT_ANCHOR_YEAR,
            series_window: DEFAULT_SERIES_WINDOW,
        }
    }
}

/// Compute the KPI report for a raw JSON record collection with default
/// configuration.
///
/// # Example
/// ```ignore
/// let report = fleet_kpi::kpis_from_json(&raw_json)?;
/// println!("{}", report.to_json()?);
/// ```
pub fn kpis_from_json(raw_json: &str) -> Result<KpiReport, PipelineError> {
    KpiPipeline::default().run(raw_json)
}

/// The full cleaning + KPI-derivation pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct KpiPipeline {
    config: PipelineConfig,
}

impl KpiPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the full pipeline over JSON text.
    pub fn run(&self, raw_json: &str) -> Result<KpiReport, PipelineError> {
        let (dataset, _) = self.clean(raw_json)?;
        Ok(self.engine().compute(&dataset))
    }

    /// Run the full pipeline over an already-parsed record collection.
    pub fn run_value(&self, value: &Value) -> Result<KpiReport, PipelineError> {
        let loaded = self.loader().load_value(value)?;
        let (dataset, _) = DatasetCleaner::clean(loaded);
        Ok(self.engine().compute(&dataset))
    }

    /// Load and clean without computing KPIs, for consumers that persist the
    /// cleaned form or inspect the row accounting.
    pub fn clean(&self, raw_json: &str) -> Result<(Dataset, CleanStats), PipelineError> {
        let loaded = self.loader().load_str(raw_json)?;
        Ok(DatasetCleaner::clean(loaded))
    }

    fn loader(&self) -> RecordLoader {
        RecordLoader::new(self.config.anchor_year)
    }

    fn engine(&self) -> KpiEngine {
        KpiEngine::new(self.config.series_window)
    }
}
