// [libs/domain/models/src/speedtest.rs]
/*!
 * =================================================================
 * APARATO: SPEED TEST WIRE MODELS
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CONTRATOS DE PRUEBAS DE VELOCIDAD Y PAGINACIÓN
 *
 * Los nombres camelCase son bit-estables: el front-end consume estas
 * tramas tal cual.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opciones de ejecución aceptadas en `POST /api/speedtest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestOptions {
    #[serde(default = "default_true")]
    pub enable_download: bool,
    #[serde(default = "default_true")]
    pub enable_upload: bool,
    #[serde(default)]
    pub enable_jitter: bool,
    #[serde(default)]
    pub multi_server: bool,
    #[serde(default)]
    pub use_iperf: bool,
    #[serde(default)]
    pub use_librespeed: bool,
    #[serde(default)]
    pub server_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            enable_download: true,
            enable_upload: true,
            enable_jitter: false,
            multi_server: false,
            use_iperf: false,
            use_librespeed: false,
            server_ids: Vec::new(),
            server_host: None,
            server_name: None,
        }
    }
}

impl TestOptions {
    /// Runner efectivo según las banderas (`iperf` gana a `librespeed`).
    pub fn runner_label(&self) -> &'static str {
        if self.use_iperf {
            "iperf3"
        } else if self.use_librespeed {
            "librespeed"
        } else {
            "speedtest"
        }
    }
}

/// Resultado persistido de una prueba de velocidad.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedTestResult {
    pub id: i64,
    pub server_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_host: Option<String>,
    /// Runner que produjo el resultado: speedtest | iperf3 | librespeed.
    pub test_type: String,
    pub ping_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jitter_ms: Option<f64>,
    pub download_mbps: f64,
    pub upload_mbps: f64,
    pub is_scheduled: bool,
    /// Mensaje de error cuando la ejecución terminó en fallo.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fase reportada en una trama de progreso.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SpeedUpdateKind {
    Ping,
    Download,
    Upload,
    Complete,
}

/// Trama de progreso consumida por `GET /api/speedtest/status`.
///
/// Valor global de proceso: una única celda protegida por mutex que el
/// runner activo sobrescribe y los handlers copian.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedUpdate {
    #[serde(rename = "type")]
    pub kind: SpeedUpdateKind,
    pub server_name: String,
    /// Velocidad instantánea en Mbps (0 durante la fase de ping).
    pub speed: f64,
    pub progress: f64,
    pub is_complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency: Option<f64>,
    pub is_scheduled: bool,
}

/// Rango temporal aceptado por el historial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRange {
    Day,
    ThreeDays,
    Week,
    Month,
    All,
}

impl TimeRange {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "1d" => Some(TimeRange::Day),
            "3d" => Some(TimeRange::ThreeDays),
            "1w" => Some(TimeRange::Week),
            "1m" => Some(TimeRange::Month),
            "all" => Some(TimeRange::All),
            _ => None,
        }
    }

    /// Límite inferior del rango respecto de `now`; None cubre todo.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            TimeRange::Day => Some(now - chrono::Duration::days(1)),
            TimeRange::ThreeDays => Some(now - chrono::Duration::days(3)),
            TimeRange::Week => Some(now - chrono::Duration::weeks(1)),
            TimeRange::Month => Some(now - chrono::Duration::days(30)),
            TimeRange::All => None,
        }
    }
}

/// Sobre de paginación genérico de la API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
}
