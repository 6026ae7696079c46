// [libs/domain/models/src/livedata.rs]
/*!
 * =================================================================
 * APARATO: LIVE DATA WIRE MODELS
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: TRAMAS SSE DE VNSTAT Y DOCUMENTOS DE IDENTIDAD
 *
 * Los nombres de campo replican bit a bit la salida de
 * `vnstat --live --json`; cada trama es una instantánea completa,
 * nunca un delta.
 * =================================================================
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sufijo canónico de la URL de un agente registrado.
pub const LIVE_DATA_PATH: &str = "/events?stream=live-data";

/// Discriminador del documento de identidad del descubrimiento.
pub const AGENT_IDENTITY_TYPE: &str = "netronome-agent";

/// Contadores direccionales de una trama en vivo (rx o tx).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TrafficEyeball {
    pub ratestring: String,
    pub bytespersecond: u64,
    pub packetspersecond: u64,
    pub bytes: u64,
    pub packets: u64,
    #[serde(default)]
    pub totalbytes: u64,
    #[serde(default)]
    pub totalpackets: u64,
}

/// Trama completa emitida por `vnstat --live --json` y retransmitida por SSE.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MonitorLiveData {
    pub index: u64,
    pub seconds: u64,
    pub rx: TrafficEyeball,
    pub tx: TrafficEyeball,
}

/// Documento de identidad servido en `GET /netronome/info`.
///
/// El descubrimiento (C7) exige `type == "netronome-agent"` antes de
/// registrar un peer como agente.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentIdentity {
    #[serde(rename = "type")]
    pub kind: String,
    pub version: String,
    pub hostname: String,
}

impl AgentIdentity {
    pub fn is_netronome_agent(&self) -> bool {
        self.kind == AGENT_IDENTITY_TYPE
    }
}

/// Descriptor de servicio servido en `GET /` del agente.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub service: String,
    pub version: String,
    pub port: u16,
    /// Mapa nominal `nombre -> ruta` de los endpoints expuestos.
    pub endpoints: BTreeMap<String, String>,
    /// `open` cuando no hay API key configurada, `api-key` en caso contrario.
    pub auth_mode: String,
}
