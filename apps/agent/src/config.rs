// [apps/agent/src/config.rs]
/*!
 * =================================================================
 * APARATO: AGENT CONFIGURATION
 * CLASIFICACIÓN: APPLICATION LAYER (ESTRATO L1-APP)
 * RESPONSABILIDAD: DIRECTIVAS DE ARRANQUE DEL AGENTE
 * =================================================================
 */

use std::str::FromStr;

/// Método de integración con la malla Tailscale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailscaleMethod {
    /// `tsnet` si hay auth key configurada; `host` en caso contrario.
    Auto,
    /// Usa el `tailscaled` del sistema operativo vía CLI local.
    Host,
    /// Nodo embebido gestionado por el propio agente bajo un state dir.
    Tsnet,
}

impl FromStr for TailscaleMethod {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "auto" => Ok(TailscaleMethod::Auto),
            "host" => Ok(TailscaleMethod::Host),
            "tsnet" => Ok(TailscaleMethod::Tsnet),
            other => Err(format!("unknown tailscale method '{}'", other)),
        }
    }
}

impl TailscaleMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            TailscaleMethod::Auto => "auto",
            TailscaleMethod::Host => "host",
            TailscaleMethod::Tsnet => "tsnet",
        }
    }
}

/// Ajustes de la integración Tailscale del agente.
#[derive(Debug, Clone)]
pub struct TailscaleSettings {
    pub enabled: bool,
    pub method: TailscaleMethod,
    pub auth_key: Option<String>,
    pub hostname: Option<String>,
    pub ephemeral: bool,
    /// Directorio de estado del nodo embebido; admite prefijo `~/`.
    pub state_dir: String,
    /// URL de control alternativa (Headscale).
    pub control_url: Option<String>,
}

impl Default for TailscaleSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            method: TailscaleMethod::Auto,
            auth_key: None,
            hostname: None,
            ephemeral: false,
            state_dir: "~/.netronome-agent/tsnet".to_string(),
            control_url: None,
        }
    }
}

impl TailscaleSettings {
    /// Resolución del modo efectivo: `auto` elige `tsnet` si y solo si
    /// hay una auth key configurada.
    pub fn effective_method(&self) -> TailscaleMethod {
        match self.method {
            TailscaleMethod::Auto => {
                if self.auth_key.is_some() {
                    TailscaleMethod::Tsnet
                } else {
                    TailscaleMethod::Host
                }
            }
            explicit => explicit,
        }
    }
}

/// Configuración completa del agente, poblada desde la CLI.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub host: String,
    pub port: u16,
    /// Interfaz vigilada por vnstat (None = la elegida por vnstat).
    pub interface: Option<String>,
    /// API key; ausente => endpoints abiertos.
    pub api_key: Option<String>,
    pub disk_includes: Vec<String>,
    pub disk_excludes: Vec<String>,
    pub tailscale: TailscaleSettings,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8200,
            interface: None,
            api_key: None,
            disk_includes: Vec::new(),
            disk_excludes: Vec::new(),
            tailscale: TailscaleSettings::default(),
        }
    }
}

impl AgentConfig {
    /// Modo de autenticación publicado en el descriptor de servicio.
    pub fn auth_mode_label(&self) -> &'static str {
        if self.api_key.is_some() {
            "api-key"
        } else {
            "open"
        }
    }
}
