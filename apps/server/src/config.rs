// [apps/server/src/config.rs]
/*!
 * =================================================================
 * APARATO: SERVER CONFIGURATION
 * CLASIFICACIÓN: APPLICATION LAYER (ESTRATO L1-APP)
 * RESPONSABILIDAD: CARGA TOML + OVERRIDES NETRONOME__<SECCION>_<CLAVE>
 *
 * Orden de precedencia: valores por defecto < fichero TOML < entorno.
 * =================================================================
 */

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Prefijo de las variables de entorno de override.
const ENV_OVERRIDE_PREFIX: &str = "NETRONOME__";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub host: String,
    pub port: u16,
    /// API key del panel; ausente => API abierta.
    pub api_key: Option<String>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 7575,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Único backend soportado: sqlite.
    pub backend: String,
    pub path: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            path: "netronome.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedtestSettings {
    /// Plazo duro por ejecución de prueba (subproceso incluido).
    pub timeout_seconds: u64,
    pub ping_threshold_ms: Option<f64>,
    pub download_threshold_mbps: Option<f64>,
    pub upload_threshold_mbps: Option<f64>,
}

impl Default for SpeedtestSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: 180,
            ping_threshold_ms: None,
            download_threshold_mbps: None,
            upload_threshold_mbps: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PacketLossSettings {
    /// Ancho del semáforo de admisión.
    pub max_concurrent_monitors: usize,
    /// Intervalo entre sondas ICMP, en milisegundos.
    pub probe_interval_ms: u64,
    /// Timeout por sonda individual, en segundos.
    pub probe_timeout_seconds: u64,
    /// Preferir MTR cuando el binario y los privilegios lo permiten.
    pub prefer_mtr: bool,
    /// Disparar cada monitor habilitado una vez al arrancar.
    pub restore_monitors_on_startup: bool,
}

impl Default for PacketLossSettings {
    fn default() -> Self {
        Self {
            max_concurrent_monitors: 10,
            probe_interval_ms: 1000,
            probe_timeout_seconds: 5,
            prefer_mtr: true,
            restore_monitors_on_startup: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentsSettings {
    /// Base del backoff exponencial de reconexión SSE.
    pub reconnect_interval_seconds: u64,
    /// Cadencia de persistencia de instantáneas.
    pub snapshot_interval_seconds: u64,
}

impl Default for AgentsSettings {
    fn default() -> Self {
        Self {
            reconnect_interval_seconds: 30,
            snapshot_interval_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoverySettings {
    pub enabled: bool,
    pub interval_seconds: u64,
    /// Puerto único de sondeo en toda la flota.
    pub port: u16,
    /// Filtro opcional de prefijo sobre el hostname del peer.
    pub prefix: Option<String>,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_seconds: 300,
            port: 8200,
            prefix: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub enabled: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Configuración completa del servidor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: HttpSettings,
    pub database: DatabaseSettings,
    pub speedtest: SpeedtestSettings,
    pub packetloss: PacketLossSettings,
    pub agents: AgentsSettings,
    pub discovery: DiscoverySettings,
    pub notifications: NotificationSettings,
}

impl ServerConfig {
    /// Carga el fichero (si existe) y aplica los overrides de entorno.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut document: toml::Value = match config_path {
            Some(path) if path.exists() => {
                info!("🧭 [CONFIG]: Loading configuration from [{}].", path.display());
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("unreadable config file {}", path.display()))?;
                raw.parse::<toml::Value>().context("malformed TOML configuration")?
            }
            Some(path) => {
                anyhow::bail!("config file not found: {}", path.display());
            }
            None => toml::Value::Table(toml::map::Map::new()),
        };

        apply_environment_overrides(&mut document);

        document
            .try_into::<ServerConfig>()
            .context("configuration does not match the expected shape")
    }

    /// Render del fichero por defecto para `generate-config`.
    pub fn render_default() -> String {
        toml::to_string_pretty(&ServerConfig::default())
            .unwrap_or_else(|_| String::from("# configuration render failure"))
    }
}

/// Overrides `NETRONOME__<SECCION>_<CLAVE>`; la clave puede llevar guiones
/// bajos adicionales (p. ej. PACKETLOSS_MAX_CONCURRENT_MONITORS).
fn apply_environment_overrides(document: &mut toml::Value) {
    for (variable_name, raw_value) in std::env::vars() {
        let Some(stripped) = variable_name.strip_prefix(ENV_OVERRIDE_PREFIX) else {
            continue;
        };
        let Some((section_segment, key_segment)) = stripped.split_once('_') else {
            continue;
        };

        let section = section_segment.to_ascii_lowercase();
        let key = key_segment.to_ascii_lowercase();

        let root_table = match document.as_table_mut() {
            Some(table) => table,
            None => continue,
        };

        let section_value = root_table
            .entry(section.clone())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));

        if let Some(section_table) = section_value.as_table_mut() {
            debug!("🧭 [CONFIG]: Override {}.{} applied from environment.", section, key);
            section_table.insert(key, coerce_scalar(&raw_value));
        }
    }
}

/// Coerción de tipos: entero, flotante, booleano y por último cadena.
fn coerce_scalar(raw: &str) -> toml::Value {
    if let Ok(integer) = raw.parse::<i64>() {
        return toml::Value::Integer(integer);
    }
    if let Ok(float) = raw.parse::<f64>() {
        return toml::Value::Float(float);
    }
    if let Ok(boolean) = raw.parse::<bool>() {
        return toml::Value::Boolean(boolean);
    }
    toml::Value::String(raw.to_string())
}
