//! Record loading
//!
//! The loader accepts a raw record collection — either a wrapper object with
//! a `DatosTransporte` array or a bare array of records — validates its
//! shape, and produces a [`Dataset`] by applying the value normalizers
//! field-by-field. Fields absent from the input schema are never invented;
//! the observed field set travels with the dataset so the KPI engine can
//! skip indicators whose columns never existed.

use crate::error::PipelineError;
use crate::normalize::{coerce_numeric, normalize_duration, normalize_monetary, normalize_month};
use crate::types::{Dataset, Field, TripRecord};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Wrapper key under which the record source nests its record array.
pub const RECORDS_KEY: &str = "DatosTransporte";

/// Loader for raw trip record collections.
pub struct RecordLoader {
    anchor_year: i32,
}

impl RecordLoader {
    /// Create a loader that anchors year-less `FECHA` values to the given year.
    pub fn new(anchor_year: i32) -> Self {
        Self { anchor_year }
    }

    /// Parse JSON text and load it. Invalid JSON is a load failure, not a panic.
    pub fn load_str(&self, raw_json: &str) -> Result<Dataset, PipelineError> {
        let value: Value = serde_json::from_str(raw_json)?;
        self.load_value(&value)
    }

    /// Load an already-parsed record collection.
    pub fn load_value(&self, value: &Value) -> Result<Dataset, PipelineError> {
        let records = match value {
            Value::Object(map) => match map.get(RECORDS_KEY) {
                Some(Value::Array(items)) => items.as_slice(),
                Some(other) => {
                    return Err(PipelineError::UnrecognizedShape(format!(
                        "'{}' holds {} instead of an array",
                        RECORDS_KEY,
                        json_kind(other)
                    )))
                }
                None => {
                    return Err(PipelineError::UnrecognizedShape(format!(
                        "object is missing the '{}' key",
                        RECORDS_KEY
                    )))
                }
            },
            Value::Array(items) => items.as_slice(),
            other => {
                return Err(PipelineError::UnrecognizedShape(format!(
                    "expected an object or array, got {}",
                    json_kind(other)
                )))
            }
        };

        let fields = observed_fields(records);
        let mut rows = Vec::with_capacity(records.len());

        for (index, record) in records.iter().enumerate() {
            match record {
                Value::Object(obj) => rows.push(self.build_row(obj)),
                other => {
                    tracing::warn!(
                        index,
                        kind = json_kind(other),
                        "skipping non-object entry in record collection"
                    );
                }
            }
        }

        tracing::debug!(rows = rows.len(), fields = fields.len(), "records loaded");
        Ok(Dataset::new(rows, fields))
    }

    fn build_row(&self, obj: &Map<String, Value>) -> TripRecord {
        let money = |field: Field| {
            obj.get(field.as_str())
                .map(normalize_monetary)
                .unwrap_or(0.0)
        };
        let duration = |field: Field| {
            obj.get(field.as_str())
                .map(normalize_duration)
                .unwrap_or_else(chrono::Duration::zero)
        };
        let numeric = |field: Field| obj.get(field.as_str()).and_then(coerce_numeric);
        let label = |field: Field| obj.get(field.as_str()).and_then(text_value);

        let month = obj
            .get(Field::Date.as_str())
            .and_then(Value::as_str)
            .and_then(|raw| normalize_month(raw, self.anchor_year));

        TripRecord {
            labor_cost: money(Field::LaborCost),
            fuel_cost: money(Field::FuelCost),
            toll_cost: money(Field::TollCost),
            lodging_cost: money(Field::Lodging),
            misc_cost: money(Field::Misc),
            freight_charge: money(Field::Freight),
            trip_time: duration(Field::TripTime),
            engine_hours: duration(Field::EngineHours),
            loading_time: duration(Field::LoadingTime),
            idle_time: duration(Field::IdleTime),
            month,
            origin: label(Field::Origin),
            destination: label(Field::Destination),
            loaded_qty: numeric(Field::LoadedQty),
            unloaded_qty: numeric(Field::UnloadedQty),
            travel_days: numeric(Field::TravelDays),
            fuel_consumed: numeric(Field::FuelConsumed),
            distance_km: numeric(Field::Distance),
        }
    }
}

/// Union of known fields present across all records. Unknown keys are ignored.
fn observed_fields(records: &[Value]) -> BTreeSet<Field> {
    let mut fields = BTreeSet::new();
    for record in records {
        if let Value::Object(obj) = record {
            for key in obj.keys() {
                if let Some(field) = Field::from_name(key) {
                    fields.insert(field);
                }
            }
        }
    }
    fields
}

fn text_value(raw: &Value) -> Option<String> {
    match raw {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
