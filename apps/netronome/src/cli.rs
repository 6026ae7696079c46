// [apps/netronome/src/cli.rs]
/*!
 * =================================================================
 * APARATO: NETRONOME COMMAND LINE
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L3)
 * RESPONSABILIDAD: GRAMÁTICA DE SUBCOMANDOS Y DIRECTIVAS DE ARRANQUE
 * =================================================================
 */

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Directivas de mando de la plataforma Netronome.
#[derive(Parser, Debug)]
#[command(
    name = "netronome",
    author = "Netronome Engineering",
    version,
    about = "Distributed network performance and host telemetry platform"
)]
pub struct NetronomeDirectives {
    #[command(subcommand)]
    pub command: NetronomeCommand,
}

#[derive(Subcommand, Debug)]
pub enum NetronomeCommand {
    /// Arranca el servidor central (planificador, motores y API).
    Serve {
        /// Ruta del fichero TOML de configuración.
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Arranca el agente remoto (tailer de vnstat + endpoints SSE).
    Agent(AgentDirectives),

    /// Escribe la configuración por defecto en stdout o en un fichero.
    GenerateConfig {
        /// Destino; por defecto stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Alta de un operador del panel.
    CreateUser {
        name: String,
        /// Ruta del fichero de configuración (para localizar la base).
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Rotación de la contraseña de un operador.
    ChangePassword {
        name: String,
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Imprime la versión del binario.
    Version,

    /// Comprueba si hay una versión publicada más reciente.
    Update,
}

/// Banderas del modo agente (espejo de la documentación pública).
#[derive(Args, Debug)]
pub struct AgentDirectives {
    /// Dirección de escucha.
    #[arg(long, env = "NETRONOME_AGENT_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Puerto de escucha.
    #[arg(long, env = "NETRONOME_AGENT_PORT", default_value_t = 8200)]
    pub port: u16,

    /// Interfaz vigilada por vnstat.
    #[arg(long)]
    pub interface: Option<String>,

    /// API key de los endpoints protegidos; ausente => abierto.
    #[arg(long, env = "NETRONOME_AGENT_API_KEY")]
    pub api_key: Option<String>,

    /// Patrón include de particiones (repetible; gana a los excludes).
    #[arg(long = "disk-include")]
    pub disk_includes: Vec<String>,

    /// Patrón exclude de particiones (repetible).
    #[arg(long = "disk-exclude")]
    pub disk_excludes: Vec<String>,

    /// Habilita la integración Tailscale.
    #[arg(long)]
    pub tailscale: bool,

    /// Método: auto | host | tsnet.
    #[arg(long = "tailscale-method", default_value = "auto")]
    pub tailscale_method: String,

    /// Auth key del nodo embebido (implica tsnet bajo auto).
    #[arg(long = "tailscale-auth-key", env = "NETRONOME_TS_AUTHKEY")]
    pub tailscale_auth_key: Option<String>,

    /// Hostname anunciado en la malla.
    #[arg(long = "tailscale-hostname")]
    pub tailscale_hostname: Option<String>,

    /// Nodo efímero: la identidad se libera al cerrar sesión.
    #[arg(long = "tailscale-ephemeral")]
    pub tailscale_ephemeral: bool,

    /// Directorio de estado del nodo embebido (admite ~/).
    #[arg(long = "tailscale-state-dir", default_value = "~/.netronome-agent/tsnet")]
    pub tailscale_state_dir: String,

    /// URL de control alternativa (Headscale).
    #[arg(long = "tailscale-control-url")]
    pub tailscale_control_url: Option<String>,
}
