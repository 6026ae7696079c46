// [libs/domain/models/src/agent.rs]
/*!
 * =================================================================
 * APARATO: MONITOR AGENT DOMAIN MODELS
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: ENTIDADES DE AGENTES REMOTOS Y SUS INSTANTÁNEAS
 * =================================================================
 */

use crate::livedata::{MonitorLiveData, LIVE_DATA_PATH};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Agente remoto registrado (manual o auto-descubierto).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorAgent {
    pub id: i64,
    pub name: String,
    /// URL canónica del stream en vivo; termina en `/events?stream=live-data`.
    /// El resto de endpoints se deriva eliminando ese sufijo.
    pub url: String,
    pub api_key: Option<String>,
    pub enabled: bool,
    /// Interfaz de red preferida en el agente (None = la elegida por vnstat).
    pub interface: Option<String>,
    pub is_tailscale: bool,
    pub tailscale_hostname: Option<String>,
    pub discovered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MonitorAgent {
    /// URL base del agente: la URL canónica sin el sufijo del stream.
    pub fn base_url(&self) -> &str {
        self.url
            .strip_suffix(LIVE_DATA_PATH)
            .unwrap_or(self.url.as_str())
            .trim_end_matches('/')
    }

    /// Construye la URL canónica a partir de host y puerto de sondeo.
    pub fn canonical_url(host: &str, port: u16) -> String {
        format!("http://{}:{}{}", host, port, LIVE_DATA_PATH)
    }
}

/// Payload de alta/edición aceptado por la API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorAgentDraft {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub interface: Option<String>,
}

fn default_enabled() -> bool {
    true
}

/// Identidad de sistema del agente, upsert 1:1 por agente.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSystemInfo {
    pub agent_id: i64,
    pub hostname: String,
    pub kernel: String,
    pub uptime_seconds: i64,
    pub vnstat_version: String,
    pub cpu_model: String,
    pub cpu_cores: i64,
    pub cpu_threads: i64,
    pub total_memory_bytes: i64,
}

/// Interfaz de red reportada por el agente. Se reemplaza en bloque al upsert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentInterface {
    pub agent_id: i64,
    pub name: String,
    pub alias: String,
    pub ipv4: String,
    /// Velocidad de enlace en Mbps; -1 marca interfaces virtuales/bridge.
    pub link_speed_mbps: i64,
    pub bytes_total: i64,
}

/// Picos de tasa observados. Monótonos no-decrecientes por vida del agente;
/// un reconnect jamás los reinicia.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentPeakStats {
    pub agent_id: i64,
    pub peak_rx_bps: i64,
    pub peak_tx_bps: i64,
    pub peak_rx_at: DateTime<Utc>,
    pub peak_tx_at: DateTime<Utc>,
}

impl AgentPeakStats {
    /// Fusiona dos lecturas de picos conservando el máximo por dirección.
    pub fn merged_with(&self, other: &AgentPeakStats) -> AgentPeakStats {
        let (peak_rx_bps, peak_rx_at) = if other.peak_rx_bps > self.peak_rx_bps {
            (other.peak_rx_bps, other.peak_rx_at)
        } else {
            (self.peak_rx_bps, self.peak_rx_at)
        };
        let (peak_tx_bps, peak_tx_at) = if other.peak_tx_bps > self.peak_tx_bps {
            (other.peak_tx_bps, other.peak_tx_at)
        } else {
            (self.peak_tx_bps, self.peak_tx_at)
        };
        AgentPeakStats {
            agent_id: self.agent_id,
            peak_rx_bps,
            peak_tx_bps,
            peak_rx_at,
            peak_tx_at,
        }
    }
}

/// Fila append-only de recursos del host del agente.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResourceSnapshot {
    pub agent_id: i64,
    pub cpu_pct: f64,
    pub mem_pct: f64,
    pub swap_pct: f64,
    /// Particiones serializadas (JSON de `Vec<DiskStats>`).
    pub disks_blob: String,
    /// Sensores térmicos serializados (JSON de `Vec<TempReading>`).
    pub temps_blob: String,
    pub uptime_s: i64,
    pub created_at: DateTime<Utc>,
}

/// Granularidad de una instantánea histórica de vnstat.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotPeriod {
    Hourly,
    Daily,
    Monthly,
}

impl SnapshotPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotPeriod::Hourly => "hourly",
            SnapshotPeriod::Daily => "daily",
            SnapshotPeriod::Monthly => "monthly",
        }
    }
}

/// Volcado histórico de vnstat por interfaz y periodo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentHistoricalSnapshot {
    pub agent_id: i64,
    pub interface: String,
    pub period_type: SnapshotPeriod,
    pub data_blob: String,
    pub created_at: DateTime<Utc>,
}

/// Estado en vivo de un agente, propiedad exclusiva de su supervisor (C6).
/// Los lectores reciben copias; `from_cache` marca el repliegue a la última
/// fila persistida cuando el agente está fuera de línea.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveAgentState {
    pub agent_id: i64,
    pub connected: bool,
    pub last_frame: Option<MonitorLiveData>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub from_cache: bool,
}

impl LiveAgentState {
    pub fn offline(agent_id: i64) -> Self {
        Self {
            agent_id,
            connected: false,
            last_frame: None,
            updated_at: None,
            from_cache: false,
        }
    }
}
