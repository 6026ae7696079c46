// [libs/domain/models/src/hardware.rs]
/*!
 * =================================================================
 * APARATO: HARDWARE SNAPSHOT MODELS
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: INSTANTÁNEAS DE SILICIO SERVIDAS POR EL AGENTE
 * =================================================================
 */

use serde::{Deserialize, Serialize};

/// Instantánea de CPU en el momento de la captura.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CpuStats {
    pub model: String,
    pub cores: i64,
    pub threads: i64,
    pub frequency_mhz: u64,
    pub usage_pct: f64,
    /// Promedios de carga 1/5/15 minutos.
    pub load_avg: [f64; 3],
}

/// Memoria principal. En Linux `used = total - free` y
/// `used_pct = used / total`, sin descontar caches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStats {
    pub total_bytes: u64,
    pub free_bytes: u64,
    pub used_bytes: u64,
    pub used_pct: f64,
}

/// Partición de disco superviviente del filtro include/exclude.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiskStats {
    pub path: String,
    pub fstype: String,
    pub total_bytes: u64,
    pub free_bytes: u64,
    pub used_bytes: u64,
    pub used_pct: f64,
    /// Modelo del dispositivo físico cuando SMART está disponible.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_c: Option<f64>,
}

/// Lectura térmica superviviente del saneo (0 < t ≤ 200 °C, PMU deduplicado).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TempReading {
    pub sensor: String,
    pub temperature_c: f64,
}

/// Instantánea agregada servida en `GET /system/hardware`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HardwareStats {
    pub cpu: CpuStats,
    pub memory: MemoryStats,
    pub swap: MemoryStats,
    pub disks: Vec<DiskStats>,
    pub temperatures: Vec<TempReading>,
    pub uptime_seconds: u64,
}

/// Identidad de sistema servida en `GET /system/info`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemInfo {
    pub hostname: String,
    pub kernel: String,
    pub uptime_seconds: u64,
    pub vnstat_version: String,
    pub cpu_model: String,
    pub cpu_cores: i64,
    pub cpu_threads: i64,
    pub total_memory_bytes: u64,
}
