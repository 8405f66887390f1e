//! Presentation contract
//!
//! Serialization helpers for the consumers of the KPI report: the dashboard
//! renderer embeds the mapping as a JSON string, the REST endpoint returns it
//! directly. Also home to the static fallback report the dashboard
//! substitutes when the pipeline yields nothing — the fallback values live
//! here as data; serving them is the consumer's job.

use crate::error::PipelineError;
use crate::kpi::keys;
use crate::types::{KpiReport, KpiValue};
use crate::{ENGINE_VERSION, PRODUCER_NAME};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

impl KpiReport {
    /// Serialize the report as a compact JSON object.
    pub fn to_json(&self) -> Result<String, PipelineError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serialize the report as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, PipelineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Producer metadata attached to enveloped reports.
#[derive(Debug, Clone, Serialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
}

/// KPI report wrapped with provenance, for consumers that want to trace
/// which engine produced a result and when.
#[derive(Debug, Clone, Serialize)]
pub struct ReportEnvelope {
    pub report_id: String,
    pub producer: Producer,
    pub generated_at_utc: String,
    pub kpis: KpiReport,
}

impl ReportEnvelope {
    pub fn new(kpis: KpiReport) -> Self {
        Self {
            report_id: Uuid::new_v4().to_string(),
            producer: Producer {
                name: PRODUCER_NAME.to_string(),
                version: ENGINE_VERSION.to_string(),
            },
            generated_at_utc: Utc::now().to_rfc3339(),
            kpis,
        }
    }

    pub fn to_json(&self) -> Result<String, PipelineError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, PipelineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// The hard-coded KPI set the dashboard falls back to when the pipeline
/// produces no report (load failure or empty dataset).
pub fn fallback_report() -> KpiReport {
    let mut report = KpiReport::default();

    report.insert(keys::CONSUMO_ACPM_KM, KpiValue::Scalar(6.3));
    report.insert(keys::COSTO_COMBUSTIBLE_VIAJE, KpiValue::Scalar(1450.80));
    report.insert(keys::PRODUCTIVIDAD_FLOTA, KpiValue::Scalar(310.2));
    report.insert(keys::COSTO_TOTAL_KM, KpiValue::Scalar(9.2));
    report.insert(keys::PORCENTAJE_NO_ENTREGADO, KpiValue::Scalar(5.1));

    let mut rutas = BTreeMap::new();
    rutas.insert("Ruta A-B".to_string(), 7.5);
    rutas.insert("Ruta C-D".to_string(), 8.0);
    rutas.insert("Ruta E-F".to_string(), 6.8);
    report.insert(keys::TIEMPO_POR_RUTA, KpiValue::Series(rutas));

    let mut tendencia = BTreeMap::new();
    tendencia.insert("2024-01".to_string(), 10000.0);
    tendencia.insert("2024-02".to_string(), 12000.0);
    tendencia.insert("2024-03".to_string(), 11000.0);
    tendencia.insert("2024-04".to_string(), 11500.0);
    tendencia.insert("2024-05".to_string(), 11800.0);
    tendencia.insert("2024-06".to_string(), 12500.0);
    report.insert(keys::TENDENCIA_COSTOS, KpiValue::Series(tendencia));

    report
}
