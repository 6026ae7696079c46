// [libs/domain/models/src/packetloss.rs]
/*!
 * =================================================================
 * APARATO: PACKET LOSS DOMAIN MODELS
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CONTRATOS DE MONITORES ICMP/MTR Y SUS RESULTADOS
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Definición persistida de un monitor de pérdida de paquetes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacketLossMonitor {
    pub id: i64,
    /// Host objetivo. Puede llevar sufijo de puerto; se elimina antes de sondear.
    pub host: String,
    pub name: String,
    pub interval_expr: String,
    /// Cantidad de sondas por ejecución (≥ 1).
    pub packet_count: i64,
    /// Umbral de alerta en porcentaje [0, 100].
    pub threshold_percent: f64,
    pub enabled: bool,
    pub next_run: DateTime<Utc>,
    pub last_run: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PacketLossMonitor {
    /// Host efectivo para el subproceso de sondeo: sin sufijo `:puerto`.
    /// Un literal IPv6 sin corchetes se respeta tal cual.
    pub fn probe_host(&self) -> &str {
        let trimmed = self.host.trim();
        match trimmed.rfind(':') {
            // Más de un ':' sin corchetes => literal IPv6 crudo, se conserva.
            Some(index) if trimmed.matches(':').count() == 1 => {
                let (candidate_host, candidate_port) = trimmed.split_at(index);
                if candidate_port[1..].chars().all(|c| c.is_ascii_digit())
                    && !candidate_port[1..].is_empty()
                {
                    candidate_host
                } else {
                    trimmed
                }
            }
            _ => trimmed,
        }
    }
}

/// Payload de creación/actualización aceptado por la API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacketLossMonitorDraft {
    pub host: String,
    #[serde(default)]
    pub name: String,
    pub interval_expr: String,
    pub packet_count: i64,
    pub threshold_percent: f64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Resultado sellado de una ejecución completada.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacketLossResult {
    pub id: i64,
    pub monitor_id: i64,
    pub started_at: DateTime<Utc>,
    pub packet_loss_pct: f64,
    pub min_rtt_ms: f64,
    pub avg_rtt_ms: f64,
    pub max_rtt_ms: f64,
    pub stddev_rtt_ms: Option<f64>,
    pub packets_sent: i64,
    pub packets_received: i64,
    pub used_mtr: bool,
    pub hop_count: Option<i64>,
    /// Reporte MTR crudo (JSON) cuando la ejecución usó MTR.
    pub mtr_blob: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fase de la máquina de estados por monitor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunPhase {
    Idle,
    Running,
    Completed,
    Failed,
}

/// Pulso de progreso publicado durante una ejecución en vivo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacketLossProgress {
    pub monitor_id: i64,
    pub phase: RunPhase,
    pub packets_sent: i64,
    pub packets_received: i64,
    pub progress_pct: f64,
    pub used_mtr: bool,
}
