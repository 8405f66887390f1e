//! KPI derivation
//!
//! Reduces a cleaned dataset into the fixed fleet-performance indicator set:
//! scalar ratios, monthly time series, and route-level breakdowns. An
//! indicator whose prerequisite fields never appeared in the input schema is
//! omitted from the report (route times and undelivered-load degrade to an
//! empty series / 0 instead). Every ratio shares one zero-denominator
//! policy: the bucket or scalar yields 0, never a non-finite value.

use crate::normalize::duration_hours;
use crate::types::{Dataset, Field, KpiReport, KpiValue, TripRecord, COST_FIELDS};
use std::collections::BTreeMap;

/// Report keys, fixed by the consumer contract.
pub mod keys {
    pub const CONSUMO_ACPM_KM: &str = "consumo_acpm_km";
    pub const CONSUMO_MENSUAL: &str = "consumo_mensual";
    pub const COSTO_COMBUSTIBLE_VIAJE: &str = "costo_combustible_viaje";
    pub const COSTO_COMBUSTIBLE_VIAJE_MENSUAL: &str = "costo_combustible_viaje_mensual";
    pub const PRODUCTIVIDAD_FLOTA: &str = "productividad_flota";
    pub const PRODUCTIVIDAD_MENSUAL: &str = "productividad_mensual";
    pub const COSTO_TOTAL_KM: &str = "costo_total_km";
    pub const COSTO_TOTAL_MENSUAL: &str = "costo_total_mensual";
    pub const TENDENCIA_COSTOS: &str = "tendencia_costos";
    pub const TIEMPO_POR_RUTA: &str = "tiempo_por_ruta";
    pub const PORCENTAJE_NO_ENTREGADO: &str = "porcentaje_no_entregado";
}

/// Default number of month buckets kept in every monthly series.
pub const DEFAULT_SERIES_WINDOW: usize = 6;

/// Engine computing the fixed KPI set over a cleaned dataset.
pub struct KpiEngine {
    window: usize,
}

impl Default for KpiEngine {
    fn default() -> Self {
        Self::new(DEFAULT_SERIES_WINDOW)
    }
}

impl KpiEngine {
    /// Create an engine keeping the chronologically last `window` month
    /// buckets in each monthly series.
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    /// Compute the KPI report. An empty dataset produces an empty report;
    /// consumers substitute their fallback values in that case.
    pub fn compute(&self, dataset: &Dataset) -> KpiReport {
        let mut report = KpiReport::default();
        if dataset.is_empty() {
            return report;
        }

        self.fuel_economy(dataset, &mut report);
        self.fuel_cost_per_trip(dataset, &mut report);
        self.fleet_productivity(dataset, &mut report);
        self.total_cost(dataset, &mut report);
        self.route_times(dataset, &mut report);
        self.undelivered_load(dataset, &mut report);

        report
    }

    /// `consumo_acpm_km` and `consumo_mensual`: fuel consumed per kilometer.
    fn fuel_economy(&self, dataset: &Dataset, report: &mut KpiReport) {
        if !dataset.has_field(Field::FuelConsumed) || !dataset.has_field(Field::Distance) {
            return;
        }

        let fuel: f64 = dataset.rows().iter().filter_map(|r| r.fuel_consumed).sum();
        let distance: f64 = dataset.rows().iter().filter_map(|r| r.distance_km).sum();
        report.insert(
            keys::CONSUMO_ACPM_KM,
            KpiValue::Scalar(round2(safe_ratio(fuel, distance))),
        );

        if dataset.has_field(Field::Date) {
            let series = self.monthly_ratio(
                dataset,
                |r| r.fuel_consumed.unwrap_or(0.0),
                |r| r.distance_km.unwrap_or(0.0),
            );
            report.insert(keys::CONSUMO_MENSUAL, KpiValue::Series(series));
        }
    }

    /// `costo_combustible_viaje` and its monthly series: mean fuel cost per trip.
    fn fuel_cost_per_trip(&self, dataset: &Dataset, report: &mut KpiReport) {
        if !dataset.has_field(Field::FuelCost) {
            return;
        }

        let total: f64 = dataset.rows().iter().map(|r| r.fuel_cost).sum();
        let mean = safe_ratio(total, dataset.len() as f64);
        report.insert(keys::COSTO_COMBUSTIBLE_VIAJE, KpiValue::Scalar(round2(mean)));

        if dataset.has_field(Field::Date) {
            let series = self.monthly_mean(dataset, |r| r.fuel_cost);
            report.insert(keys::COSTO_COMBUSTIBLE_VIAJE_MENSUAL, KpiValue::Series(series));
        }
    }

    /// `productividad_flota` and its monthly series: kilometers per travel day.
    fn fleet_productivity(&self, dataset: &Dataset, report: &mut KpiReport) {
        if !dataset.has_field(Field::Distance) || !dataset.has_field(Field::TravelDays) {
            return;
        }

        let distance: f64 = dataset.rows().iter().filter_map(|r| r.distance_km).sum();
        let days: f64 = dataset.rows().iter().filter_map(|r| r.travel_days).sum();
        report.insert(
            keys::PRODUCTIVIDAD_FLOTA,
            KpiValue::Scalar(round2(safe_ratio(distance, days))),
        );

        if dataset.has_field(Field::Date) {
            let series = self.monthly_ratio(
                dataset,
                |r| r.distance_km.unwrap_or(0.0),
                |r| r.travel_days.unwrap_or(0.0),
            );
            report.insert(keys::PRODUCTIVIDAD_MENSUAL, KpiValue::Series(series));
        }
    }

    /// `costo_total_km`, `costo_total_mensual` and `tendencia_costos`: summed
    /// per-row cost (over the cost fields actually present) per kilometer.
    ///
    /// Historically the two monthly series diverged on zero-distance buckets
    /// (only one was guarded); both now share the single guard policy and are
    /// kept as separate keys for consumer compatibility.
    fn total_cost(&self, dataset: &Dataset, report: &mut KpiReport) {
        let present: Vec<Field> = COST_FIELDS
            .iter()
            .copied()
            .filter(|f| dataset.has_field(*f))
            .collect();
        if present.is_empty() || !dataset.has_field(Field::Distance) {
            return;
        }

        let row_cost = |r: &TripRecord| -> f64 {
            present.iter().map(|f| cost_component(r, *f)).sum()
        };

        let total_cost: f64 = dataset.rows().iter().map(row_cost).sum();
        let distance: f64 = dataset.rows().iter().filter_map(|r| r.distance_km).sum();
        report.insert(
            keys::COSTO_TOTAL_KM,
            KpiValue::Scalar(round2(safe_ratio(total_cost, distance))),
        );

        if dataset.has_field(Field::Date) {
            let series =
                self.monthly_ratio(dataset, row_cost, |r| r.distance_km.unwrap_or(0.0));
            report.insert(keys::COSTO_TOTAL_MENSUAL, KpiValue::Series(series.clone()));
            report.insert(keys::TENDENCIA_COSTOS, KpiValue::Series(series));
        }
    }

    /// `tiempo_por_ruta`: mean trip time in hours per distinct
    /// origin-destination pair, keyed `"{origin}-{destination}"`. Emitted as
    /// an empty series when any prerequisite field is absent.
    fn route_times(&self, dataset: &Dataset, report: &mut KpiReport) {
        let mut series = BTreeMap::new();

        if dataset.has_field(Field::TripTime)
            && dataset.has_field(Field::Origin)
            && dataset.has_field(Field::Destination)
        {
            let mut groups: BTreeMap<String, (f64, usize)> = BTreeMap::new();
            for row in dataset.rows() {
                if let (Some(origin), Some(destination)) = (&row.origin, &row.destination) {
                    let entry = groups
                        .entry(format!("{}-{}", origin, destination))
                        .or_insert((0.0, 0));
                    entry.0 += row.trip_time.num_milliseconds() as f64;
                    entry.1 += 1;
                }
            }
            for (route, (total_ms, count)) in groups {
                let mean = chrono::Duration::milliseconds((total_ms / count as f64) as i64);
                series.insert(route, round2(duration_hours(mean)));
            }
        }

        report.insert(keys::TIEMPO_POR_RUTA, KpiValue::Series(series));
    }

    /// `porcentaje_no_entregado`: share of loaded quantity that never got
    /// unloaded, clipped at zero per row. 0 when nothing was loaded or the
    /// quantity fields are absent.
    fn undelivered_load(&self, dataset: &Dataset, report: &mut KpiReport) {
        let mut pct = 0.0;

        if dataset.has_field(Field::LoadedQty) && dataset.has_field(Field::UnloadedQty) {
            let undelivered: f64 = dataset
                .rows()
                .iter()
                .filter_map(|r| match (r.loaded_qty, r.unloaded_qty) {
                    (Some(loaded), Some(unloaded)) => Some((loaded - unloaded).max(0.0)),
                    _ => None,
                })
                .sum();
            let loaded: f64 = dataset.rows().iter().filter_map(|r| r.loaded_qty).sum();
            if loaded > 0.0 {
                pct = undelivered / loaded * 100.0;
            }
        }

        report.insert(keys::PORCENTAJE_NO_ENTREGADO, KpiValue::Scalar(round2(pct)));
    }

    /// Per-bucket ratio of summed numerator to summed denominator over the
    /// last `window` month buckets, ascending. Rows without a month bucket
    /// are excluded.
    fn monthly_ratio<N, D>(&self, dataset: &Dataset, num: N, den: D) -> BTreeMap<String, f64>
    where
        N: Fn(&TripRecord) -> f64,
        D: Fn(&TripRecord) -> f64,
    {
        let mut sums: BTreeMap<String, (f64, f64)> = BTreeMap::new();
        for row in dataset.rows() {
            if let Some(month) = &row.month {
                let entry = sums.entry(month.clone()).or_insert((0.0, 0.0));
                entry.0 += num(row);
                entry.1 += den(row);
            }
        }
        let buckets = sums
            .into_iter()
            .map(|(month, (n, d))| (month, round2(safe_ratio(n, d))))
            .collect();
        last_buckets(buckets, self.window)
    }

    /// Per-bucket mean over the last `window` month buckets, ascending.
    fn monthly_mean<F>(&self, dataset: &Dataset, value: F) -> BTreeMap<String, f64>
    where
        F: Fn(&TripRecord) -> f64,
    {
        let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
        for row in dataset.rows() {
            if let Some(month) = &row.month {
                let entry = sums.entry(month.clone()).or_insert((0.0, 0));
                entry.0 += value(row);
                entry.1 += 1;
            }
        }
        let buckets = sums
            .into_iter()
            .map(|(month, (total, count))| (month, round2(safe_ratio(total, count as f64))))
            .collect();
        last_buckets(buckets, self.window)
    }
}

fn cost_component(row: &TripRecord, field: Field) -> f64 {
    match field {
        Field::LaborCost => row.labor_cost,
        Field::TollCost => row.toll_cost,
        Field::FuelCost => row.fuel_cost,
        Field::Lodging => row.lodging_cost,
        Field::Misc => row.misc_cost,
        _ => 0.0,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Keep the chronologically last `n` buckets; `YYYY-MM` keys sort
/// lexicographically, which equals chronological order.
fn last_buckets(buckets: BTreeMap<String, f64>, n: usize) -> BTreeMap<String, f64> {
    let skip = buckets.len().saturating_sub(n);
    buckets.into_iter().skip(skip).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;

    fn fields(list: &[Field]) -> BTreeSet<Field> {
        list.iter().copied().collect()
    }

    fn trip(fuel: f64, distance: f64) -> TripRecord {
        TripRecord {
            fuel_consumed: Some(fuel),
            distance_km: Some(distance),
            ..Default::default()
        }
    }

    #[test]
    fn test_fuel_economy_ratio() {
        let dataset = Dataset::new(
            vec![trip(10.0, 100.0), trip(20.0, 100.0)],
            fields(&[Field::FuelConsumed, Field::Distance]),
        );
        let report = KpiEngine::default().compute(&dataset);
        // 30 / 200 = 0.15
        assert_eq!(report.scalar(keys::CONSUMO_ACPM_KM), Some(0.15));
        // No FECHA column, so no monthly series.
        assert_eq!(report.get(keys::CONSUMO_MENSUAL), None);
    }

    #[test]
    fn test_undelivered_load_percentage() {
        let mut first = trip(1.0, 1.0);
        first.loaded_qty = Some(100.0);
        first.unloaded_qty = Some(80.0);
        let mut second = trip(1.0, 1.0);
        second.loaded_qty = Some(50.0);
        second.unloaded_qty = Some(50.0);

        let dataset = Dataset::new(
            vec![first, second],
            fields(&[
                Field::FuelConsumed,
                Field::Distance,
                Field::LoadedQty,
                Field::UnloadedQty,
            ]),
        );
        let report = KpiEngine::default().compute(&dataset);
        // 100 * (20 + 0) / 150 = 13.33
        assert_eq!(report.scalar(keys::PORCENTAJE_NO_ENTREGADO), Some(13.33));
    }

    #[test]
    fn test_undelivered_load_over_delivery_clips_to_zero() {
        let mut row = trip(1.0, 1.0);
        row.loaded_qty = Some(40.0);
        row.unloaded_qty = Some(60.0);

        let dataset = Dataset::new(
            vec![row],
            fields(&[
                Field::FuelConsumed,
                Field::Distance,
                Field::LoadedQty,
                Field::UnloadedQty,
            ]),
        );
        let report = KpiEngine::default().compute(&dataset);
        assert_eq!(report.scalar(keys::PORCENTAJE_NO_ENTREGADO), Some(0.0));
    }

    #[test]
    fn test_undelivered_load_defaults_to_zero_without_fields() {
        let dataset = Dataset::new(
            vec![trip(1.0, 1.0)],
            fields(&[Field::FuelConsumed, Field::Distance]),
        );
        let report = KpiEngine::default().compute(&dataset);
        assert_eq!(report.scalar(keys::PORCENTAJE_NO_ENTREGADO), Some(0.0));
    }

    #[test]
    fn test_route_times_grouped_by_pair() {
        let mut bog_cali_1 = trip(1.0, 1.0);
        bog_cali_1.origin = Some("Bogota".to_string());
        bog_cali_1.destination = Some("Cali".to_string());
        bog_cali_1.trip_time = Duration::milliseconds(7_200_000); // 2h

        let mut bog_cali_2 = bog_cali_1.clone();
        bog_cali_2.trip_time = Duration::milliseconds(10_800_000); // 3h

        let mut med_cart = trip(1.0, 1.0);
        med_cart.origin = Some("Medellin".to_string());
        med_cart.destination = Some("Cartagena".to_string());
        med_cart.trip_time = Duration::milliseconds(3_600_000); // 1h

        let mut no_route = trip(1.0, 1.0);
        no_route.trip_time = Duration::milliseconds(99_000_000);

        let dataset = Dataset::new(
            vec![bog_cali_1, bog_cali_2, med_cart, no_route],
            fields(&[
                Field::FuelConsumed,
                Field::Distance,
                Field::TripTime,
                Field::Origin,
                Field::Destination,
            ]),
        );
        let report = KpiEngine::default().compute(&dataset);
        let series = report.series(keys::TIEMPO_POR_RUTA).unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.get("Bogota-Cali"), Some(&2.5));
        assert_eq!(series.get("Medellin-Cartagena"), Some(&1.0));
    }

    #[test]
    fn test_route_times_empty_without_route_fields() {
        let dataset = Dataset::new(
            vec![trip(1.0, 1.0)],
            fields(&[Field::FuelConsumed, Field::Distance, Field::TripTime]),
        );
        let report = KpiEngine::default().compute(&dataset);
        assert_eq!(report.series(keys::TIEMPO_POR_RUTA).unwrap().len(), 0);
    }

    #[test]
    fn test_monthly_series_window_and_order() {
        let months = [
            "2024-01", "2024-02", "2024-03", "2024-04", "2024-05", "2024-06", "2024-07",
            "2024-08",
        ];
        let rows: Vec<TripRecord> = months
            .iter()
            .map(|m| {
                let mut r = trip(10.0, 100.0);
                r.month = Some(m.to_string());
                r
            })
            .collect();

        let dataset = Dataset::new(
            rows,
            fields(&[Field::FuelConsumed, Field::Distance, Field::Date]),
        );
        let report = KpiEngine::default().compute(&dataset);
        let series = report.series(keys::CONSUMO_MENSUAL).unwrap();

        assert_eq!(series.len(), 6);
        let buckets: Vec<&String> = series.keys().collect();
        assert_eq!(buckets.first().map(|s| s.as_str()), Some("2024-03"));
        assert_eq!(buckets.last().map(|s| s.as_str()), Some("2024-08"));
        assert!(series.values().all(|v| *v == 0.1));
    }

    #[test]
    fn test_total_cost_uses_present_cost_fields_only() {
        let mut row = trip(10.0, 100.0);
        row.fuel_cost = 500.0;
        row.toll_cost = 100.0;
        row.labor_cost = 400.0; // column not declared present, must be ignored

        let dataset = Dataset::new(
            vec![row],
            fields(&[
                Field::FuelConsumed,
                Field::Distance,
                Field::FuelCost,
                Field::TollCost,
            ]),
        );
        let report = KpiEngine::default().compute(&dataset);
        // (500 + 100) / 100 = 6.0
        assert_eq!(report.scalar(keys::COSTO_TOTAL_KM), Some(6.0));
    }

    #[test]
    fn test_cost_trend_matches_monthly_cost() {
        let mut january = trip(10.0, 100.0);
        january.month = Some("2024-01".to_string());
        january.fuel_cost = 300.0;
        let mut february = trip(10.0, 0.0); // zero-distance bucket
        february.month = Some("2024-02".to_string());
        february.fuel_cost = 200.0;

        let dataset = Dataset::new(
            vec![january, february],
            fields(&[
                Field::FuelConsumed,
                Field::Distance,
                Field::FuelCost,
                Field::Date,
            ]),
        );
        let report = KpiEngine::default().compute(&dataset);
        let monthly = report.series(keys::COSTO_TOTAL_MENSUAL).unwrap();
        let trend = report.series(keys::TENDENCIA_COSTOS).unwrap();

        assert_eq!(monthly, trend);
        assert_eq!(monthly.get("2024-01"), Some(&3.0));
        // Zero-distance bucket yields 0 instead of a non-finite value.
        assert_eq!(monthly.get("2024-02"), Some(&0.0));
    }

    #[test]
    fn test_zero_distance_scalar_is_guarded() {
        let dataset = Dataset::new(
            vec![trip(10.0, 0.0)],
            fields(&[Field::FuelConsumed, Field::Distance]),
        );
        let report = KpiEngine::default().compute(&dataset);
        assert_eq!(report.scalar(keys::CONSUMO_ACPM_KM), Some(0.0));
    }

    #[test]
    fn test_productivity_requires_travel_days_field() {
        let dataset = Dataset::new(
            vec![trip(10.0, 100.0)],
            fields(&[Field::FuelConsumed, Field::Distance]),
        );
        let report = KpiEngine::default().compute(&dataset);
        assert_eq!(report.get(keys::PRODUCTIVIDAD_FLOTA), None);

        let mut row = trip(10.0, 300.0);
        row.travel_days = Some(2.0);
        let dataset = Dataset::new(
            vec![row],
            fields(&[Field::FuelConsumed, Field::Distance, Field::TravelDays]),
        );
        let report = KpiEngine::default().compute(&dataset);
        assert_eq!(report.scalar(keys::PRODUCTIVIDAD_FLOTA), Some(150.0));
    }

    #[test]
    fn test_fuel_cost_mean() {
        let mut cheap = trip(1.0, 1.0);
        cheap.fuel_cost = 1000.0;
        let mut pricey = trip(1.0, 2.0);
        pricey.fuel_cost = 2000.0;

        let dataset = Dataset::new(
            vec![cheap, pricey],
            fields(&[Field::FuelConsumed, Field::Distance, Field::FuelCost]),
        );
        let report = KpiEngine::default().compute(&dataset);
        assert_eq!(report.scalar(keys::COSTO_COMBUSTIBLE_VIAJE), Some(1500.0));
    }

    #[test]
    fn test_empty_dataset_yields_empty_report() {
        let dataset = Dataset::new(
            Vec::new(),
            fields(&[Field::FuelConsumed, Field::Distance]),
        );
        let report = KpiEngine::default().compute(&dataset);
        assert!(report.is_empty());
    }
}
