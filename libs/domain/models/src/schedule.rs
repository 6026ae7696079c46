// [libs/domain/models/src/schedule.rs]
/*!
 * =================================================================
 * APARATO: SCHEDULE DOMAIN MODELS
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CONTRATO DE FILAS DE PLANIFICACIÓN
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Familia de prueba despachada por el planificador.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MonitorKind {
    /// Prueba de velocidad (nativa, iperf3 o LibreSpeed según opciones).
    Speedtest,
    /// Monitor de pérdida de paquetes (ICMP/MTR).
    Packetloss,
}

impl MonitorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorKind::Speedtest => "speedtest",
            MonitorKind::Packetloss => "packetloss",
        }
    }

    pub fn from_str_tolerant(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "speedtest" => Some(MonitorKind::Speedtest),
            "packetloss" => Some(MonitorKind::Packetloss),
            _ => None,
        }
    }
}

/// Fila de planificación persistida.
///
/// # Invariante:
/// En reposo, toda fila habilitada cumple `next_run > now()`. Las columnas
/// `next_run` y `last_run` tienen un único escritor: el planificador.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub id: i64,
    pub monitor_kind: MonitorKind,
    /// Referencia al objetivo de la prueba (identificador de servidor,
    /// host remoto o cadena vacía para la selección automática).
    pub target_ref: String,
    /// Expresión de intervalo en la gramática `<n><s|m|h>` o `exact:HH:MM,…`.
    pub interval_expr: String,
    pub enabled: bool,
    pub next_run: DateTime<Utc>,
    pub last_run: Option<DateTime<Utc>>,
    /// Opciones del runner serializadas (TestOptions para speedtest).
    pub options_blob: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload de creación/actualización aceptado por la API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleDraft {
    pub monitor_kind: MonitorKind,
    #[serde(default)]
    pub target_ref: String,
    pub interval_expr: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub options_blob: Option<String>,
}

fn default_enabled() -> bool {
    true
}
