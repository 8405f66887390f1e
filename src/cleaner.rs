//! Dataset validation and cleaning
//!
//! Applies the dataset-wide invariants on top of the loader's field-level
//! normalization, in order:
//! 1. drop rows whose key measures (fuel consumed, distance traveled) are
//!    missing,
//! 2. drop rows where either key measure is negative,
//! 3. remove exact-duplicate rows, keeping the first occurrence.
//!
//! If a key-measure column is absent from the input schema entirely, the
//! result is an empty dataset rather than an error. Cleaning is idempotent.

use crate::types::{Dataset, Field, TripRecord};
use serde::Serialize;

/// Row accounting for one cleaning pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanStats {
    /// Rows received from the loader.
    pub input_rows: usize,
    /// Rows dropped for a missing key measure.
    pub dropped_missing: usize,
    /// Rows dropped for a negative key measure.
    pub dropped_negative: usize,
    /// Exact duplicates removed.
    pub dropped_duplicates: usize,
    /// Rows surviving all steps.
    pub output_rows: usize,
}

/// Cleaner enforcing the dataset invariants.
pub struct DatasetCleaner;

impl DatasetCleaner {
    /// Clean a loaded dataset. Every surviving row has non-missing,
    /// non-negative fuel-consumed and distance values.
    pub fn clean(dataset: Dataset) -> (Dataset, CleanStats) {
        let mut stats = CleanStats {
            input_rows: dataset.len(),
            ..Default::default()
        };

        let has_key_measures =
            dataset.has_field(Field::FuelConsumed) && dataset.has_field(Field::Distance);
        let fields = dataset.fields().clone();

        if !has_key_measures {
            tracing::warn!(
                input_rows = stats.input_rows,
                "key measure columns absent, yielding empty dataset"
            );
            return (Dataset::new(Vec::new(), fields), stats);
        }

        let mut kept: Vec<TripRecord> = Vec::with_capacity(dataset.len());

        for row in dataset.into_rows() {
            let (fuel, distance) = match (row.fuel_consumed, row.distance_km) {
                (Some(f), Some(d)) => (f, d),
                _ => {
                    stats.dropped_missing += 1;
                    continue;
                }
            };
            if fuel < 0.0 || distance < 0.0 {
                stats.dropped_negative += 1;
                continue;
            }
            if kept.contains(&row) {
                stats.dropped_duplicates += 1;
                continue;
            }
            kept.push(row);
        }

        stats.output_rows = kept.len();
        tracing::debug!(?stats, "dataset cleaned");
        (Dataset::new(kept, fields), stats)
    }
}
