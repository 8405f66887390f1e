//! Core types for the fleet KPI pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: the known record fields, the cleaned trip record, the dataset
//! handed to the KPI engine, and the KPI report returned to consumers.

use chrono::Duration;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};

/// Known record fields, named after the uppercase Spanish identifiers used by
/// the record source. Any field may be absent from a given source; the
/// observed set is carried on the [`Dataset`] so downstream aggregation can
/// skip indicators whose columns never existed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Field {
    /// COSTO_MANO_DE_OBRA - labor cost
    LaborCost,
    /// COSTO_ACPM - fuel (diesel) cost
    FuelCost,
    /// VALOR_PEAJES - toll charges
    TollCost,
    /// ALOJAM - lodging
    Lodging,
    /// DIVERSOS - miscellaneous expenses
    Misc,
    /// FLETE - freight charge
    Freight,
    /// TIEMPO_EN_EL_VIAJE - trip time (milliseconds)
    TripTime,
    /// HORAS_MOTOR - engine hours (milliseconds)
    EngineHours,
    /// TIEMPO_DE_CARGUE - loading time (milliseconds)
    LoadingTime,
    /// TIEMPO_MUERTO - idle time (milliseconds)
    IdleTime,
    /// FECHA - trip date, `DD-Mon` without a year
    Date,
    /// ORIGEN - route origin
    Origin,
    /// DESTINO - route destination
    Destination,
    /// CANTIDAD_CARGADA - loaded quantity
    LoadedQty,
    /// CANTIDAD_DESCARGADA - unloaded quantity
    UnloadedQty,
    /// DIAS_DE_VIAJE - travel days
    TravelDays,
    /// CONSUMO_ACPM - fuel consumed (key measure)
    FuelConsumed,
    /// DISTANCIA_RECORRIDA - distance traveled (key measure)
    Distance,
}

impl Field {
    /// Every known field, in source order.
    pub const ALL: [Field; 18] = [
        Field::LaborCost,
        Field::FuelCost,
        Field::TollCost,
        Field::Lodging,
        Field::Misc,
        Field::Freight,
        Field::TripTime,
        Field::EngineHours,
        Field::LoadingTime,
        Field::IdleTime,
        Field::Date,
        Field::Origin,
        Field::Destination,
        Field::LoadedQty,
        Field::UnloadedQty,
        Field::TravelDays,
        Field::FuelConsumed,
        Field::Distance,
    ];

    /// Source-side name of the field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::LaborCost => "COSTO_MANO_DE_OBRA",
            Field::FuelCost => "COSTO_ACPM",
            Field::TollCost => "VALOR_PEAJES",
            Field::Lodging => "ALOJAM",
            Field::Misc => "DIVERSOS",
            Field::Freight => "FLETE",
            Field::TripTime => "TIEMPO_EN_EL_VIAJE",
            Field::EngineHours => "HORAS_MOTOR",
            Field::LoadingTime => "TIEMPO_DE_CARGUE",
            Field::IdleTime => "TIEMPO_MUERTO",
            Field::Date => "FECHA",
            Field::Origin => "ORIGEN",
            Field::Destination => "DESTINO",
            Field::LoadedQty => "CANTIDAD_CARGADA",
            Field::UnloadedQty => "CANTIDAD_DESCARGADA",
            Field::TravelDays => "DIAS_DE_VIAJE",
            Field::FuelConsumed => "CONSUMO_ACPM",
            Field::Distance => "DISTANCIA_RECORRIDA",
        }
    }

    /// Look up a field by its source-side name. Unknown names yield `None`
    /// and are ignored by the loader.
    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.iter().copied().find(|f| f.as_str() == name)
    }
}

/// Cost components that participate in the per-row total cost. Freight is
/// revenue-side and excluded.
pub const COST_FIELDS: [Field; 5] = [
    Field::LaborCost,
    Field::TollCost,
    Field::FuelCost,
    Field::Lodging,
    Field::Misc,
];

/// One trip record after field-level normalization.
///
/// Monetary fields default to 0 on null/unparseable input; duration fields
/// default to a zero duration. Quantity fields stay `None` when the raw value
/// cannot be coerced to a number — missing, not zero — so the cleaner can
/// drop rows rather than silently count them. `month` is the `YYYY-MM`
/// bucket derived from `FECHA`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripRecord {
    #[serde(rename = "COSTO_MANO_DE_OBRA")]
    pub labor_cost: f64,
    #[serde(rename = "COSTO_ACPM")]
    pub fuel_cost: f64,
    #[serde(rename = "VALOR_PEAJES")]
    pub toll_cost: f64,
    #[serde(rename = "ALOJAM")]
    pub lodging_cost: f64,
    #[serde(rename = "DIVERSOS")]
    pub misc_cost: f64,
    #[serde(rename = "FLETE")]
    pub freight_charge: f64,
    #[serde(rename = "TIEMPO_EN_EL_VIAJE", serialize_with = "ser_duration_ms")]
    pub trip_time: Duration,
    #[serde(rename = "HORAS_MOTOR", serialize_with = "ser_duration_ms")]
    pub engine_hours: Duration,
    #[serde(rename = "TIEMPO_DE_CARGUE", serialize_with = "ser_duration_ms")]
    pub loading_time: Duration,
    #[serde(rename = "TIEMPO_MUERTO", serialize_with = "ser_duration_ms")]
    pub idle_time: Duration,
    #[serde(rename = "MES")]
    pub month: Option<String>,
    #[serde(rename = "ORIGEN")]
    pub origin: Option<String>,
    #[serde(rename = "DESTINO")]
    pub destination: Option<String>,
    #[serde(rename = "CANTIDAD_CARGADA")]
    pub loaded_qty: Option<f64>,
    #[serde(rename = "CANTIDAD_DESCARGADA")]
    pub unloaded_qty: Option<f64>,
    #[serde(rename = "DIAS_DE_VIAJE")]
    pub travel_days: Option<f64>,
    #[serde(rename = "CONSUMO_ACPM")]
    pub fuel_consumed: Option<f64>,
    #[serde(rename = "DISTANCIA_RECORRIDA")]
    pub distance_km: Option<f64>,
}

impl Default for TripRecord {
    fn default() -> Self {
        Self {
            labor_cost: 0.0,
            fuel_cost: 0.0,
            toll_cost: 0.0,
            lodging_cost: 0.0,
            misc_cost: 0.0,
            freight_charge: 0.0,
            trip_time: Duration::zero(),
            engine_hours: Duration::zero(),
            loading_time: Duration::zero(),
            idle_time: Duration::zero(),
            month: None,
            origin: None,
            destination: None,
            loaded_qty: None,
            unloaded_qty: None,
            travel_days: None,
            fuel_consumed: None,
            distance_km: None,
        }
    }
}

fn ser_duration_ms<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_i64(d.num_milliseconds())
}

/// An ordered sequence of trip records plus the set of fields observed in the
/// raw input. Built fresh per pipeline invocation; immutable once handed to
/// the KPI engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    rows: Vec<TripRecord>,
    fields: BTreeSet<Field>,
}

impl Dataset {
    pub fn new(rows: Vec<TripRecord>, fields: BTreeSet<Field>) -> Self {
        Self { rows, fields }
    }

    pub fn rows(&self) -> &[TripRecord] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<TripRecord> {
        self.rows
    }

    /// Whether the raw input carried this field at all. Distinct from a
    /// per-row missing value.
    pub fn has_field(&self, field: Field) -> bool {
        self.fields.contains(&field)
    }

    pub fn fields(&self) -> &BTreeSet<Field> {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A single indicator value: a scalar, or a series keyed by month bucket or
/// by `"{origin}-{destination}"` route.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum KpiValue {
    Scalar(f64),
    Series(BTreeMap<String, f64>),
}

impl KpiValue {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            KpiValue::Scalar(v) => Some(*v),
            KpiValue::Series(_) => None,
        }
    }

    pub fn as_series(&self) -> Option<&BTreeMap<String, f64>> {
        match self {
            KpiValue::Scalar(_) => None,
            KpiValue::Series(s) => Some(s),
        }
    }
}

/// The KPI result mapping, produced once per invocation and never mutated
/// after return. Serializes as a plain JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct KpiReport(BTreeMap<String, KpiValue>);

impl KpiReport {
    pub fn insert(&mut self, name: impl Into<String>, value: KpiValue) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&KpiValue> {
        self.0.get(name)
    }

    pub fn scalar(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(KpiValue::as_scalar)
    }

    pub fn series(&self, name: &str) -> Option<&BTreeMap<String, f64>> {
        self.get(name).and_then(KpiValue::as_series)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &KpiValue)> {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_field_name_round_trip() {
        for field in Field::ALL {
            assert_eq!(Field::from_name(field.as_str()), Some(field));
        }
        assert_eq!(Field::from_name("PLACA"), None);
    }

    #[test]
    fn test_trip_record_serializes_source_names() {
        let record = TripRecord {
            fuel_cost: 1500.0,
            trip_time: Duration::milliseconds(3_600_000),
            month: Some("2024-01".to_string()),
            origin: Some("Bogota".to_string()),
            fuel_consumed: Some(10.0),
            distance_km: Some(120.0),
            ..Default::default()
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["COSTO_ACPM"], 1500.0);
        assert_eq!(value["TIEMPO_EN_EL_VIAJE"], 3_600_000i64);
        assert_eq!(value["MES"], "2024-01");
        assert_eq!(value["DISTANCIA_RECORRIDA"], 120.0);
    }

    #[test]
    fn test_kpi_value_serialization() {
        let scalar = serde_json::to_value(KpiValue::Scalar(6.3)).unwrap();
        assert_eq!(scalar, serde_json::json!(6.3));

        let mut buckets = BTreeMap::new();
        buckets.insert("2024-01".to_string(), 0.15);
        let series = serde_json::to_value(KpiValue::Series(buckets)).unwrap();
        assert_eq!(series, serde_json::json!({"2024-01": 0.15}));
    }

    #[test]
    fn test_report_accessors() {
        let mut report = KpiReport::default();
        report.insert("consumo_acpm_km", KpiValue::Scalar(0.15));
        assert_eq!(report.scalar("consumo_acpm_km"), Some(0.15));
        assert_eq!(report.series("consumo_acpm_km"), None);
        assert_eq!(report.scalar("missing"), None);
        assert_eq!(report.len(), 1);
    }
}
