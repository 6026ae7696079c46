// [apps/agent/src/tailscale.rs]
/*!
 * =================================================================
 * APARATO: TAILSCALE RUNTIME
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: MODOS host/tsnet Y DOCUMENTO DE ESTADO DE MALLA
 *
 * Modo host: consulta el tailscaled del sistema vía CLI local.
 * Modo tsnet: nodo gestionado por el agente (tailscaled hijo con
 * state dir propio, socket dedicado y login opcional por auth key).
 * =================================================================
 */

use crate::config::{TailscaleMethod, TailscaleSettings};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::{info, warn};

/// Documento publicado en `GET /tailscale/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TailscaleStatusDocument {
    pub enabled: bool,
    /// Modo efectivo tras resolver `auto`.
    pub method: String,
    pub hostname: Option<String>,
    pub self_ip: Option<String>,
    pub backend_state: Option<String>,
}

/// Subconjunto del JSON de `tailscale status --json` que interesa aquí.
#[derive(Debug, Deserialize)]
struct StatusJson {
    #[serde(rename = "BackendState")]
    backend_state: Option<String>,
    #[serde(rename = "Self")]
    self_node: Option<SelfNode>,
}

#[derive(Debug, Deserialize)]
struct SelfNode {
    #[serde(rename = "HostName")]
    host_name: Option<String>,
    #[serde(rename = "TailscaleIPs")]
    tailscale_ips: Option<Vec<String>>,
}

pub struct TailscaleRuntime {
    settings: TailscaleSettings,
    effective_method: TailscaleMethod,
    /// tailscaled hijo del modo tsnet; None en modo host.
    managed_daemon: Option<Child>,
    /// Socket del daemon gestionado (tsnet) o None para el del sistema.
    socket_path: Option<PathBuf>,
}

impl TailscaleRuntime {
    /// Ignición de la integración. En tsnet levanta y autentica el nodo
    /// embebido antes de devolver el control.
    pub async fn ignite(settings: TailscaleSettings) -> Result<Self> {
        let effective_method = settings.effective_method();

        let mut runtime = Self {
            settings,
            effective_method,
            managed_daemon: None,
            socket_path: None,
        };

        match effective_method {
            TailscaleMethod::Host | TailscaleMethod::Auto => {
                info!("🕸️  [TAILSCALE]: Host mode; using the system tailscaled.");
            }
            TailscaleMethod::Tsnet => runtime.ignite_managed_node().await?,
        }

        Ok(runtime)
    }

    /// Levanta el tailscaled gestionado y ejecuta el login inicial.
    async fn ignite_managed_node(&mut self) -> Result<()> {
        let state_dir = expand_home(&self.settings.state_dir);
        tokio::fs::create_dir_all(&state_dir)
            .await
            .context("tsnet state dir not claimable")?;

        let socket_path = state_dir.join("tailscaled.sock");

        info!("🕸️  [TAILSCALE]: Igniting managed node under [{}].", state_dir.display());

        let daemon = Command::new("tailscaled")
            .arg("--statedir")
            .arg(&state_dir)
            .arg("--socket")
            .arg(&socket_path)
            .arg("--tun")
            .arg("userspace-networking")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .context("tailscaled binary not spawnable")?;

        self.managed_daemon = Some(daemon);
        self.socket_path = Some(socket_path.clone());

        // Espera de cortesía a que el socket exista antes del login.
        tokio::time::sleep(Duration::from_secs(2)).await;

        let auth_key = self
            .settings
            .auth_key
            .clone()
            .context("tsnet mode requires an auth key")?;

        let mut login_command = Command::new("tailscale");
        login_command
            .arg("--socket")
            .arg(&socket_path)
            .arg("up")
            .arg("--authkey")
            .arg(&auth_key);

        if let Some(hostname) = &self.settings.hostname {
            login_command.arg("--hostname").arg(hostname);
        }
        if let Some(control_url) = &self.settings.control_url {
            login_command.arg("--login-server").arg(control_url);
        }

        let login_output = tokio::time::timeout(Duration::from_secs(60), login_command.output())
            .await
            .context("tailscale up timed out")??;

        if !login_output.status.success() {
            anyhow::bail!(
                "tailscale up failed: {}",
                String::from_utf8_lossy(&login_output.stderr).trim()
            );
        }

        info!("🕸️  [TAILSCALE]: Managed node authenticated and online.");
        Ok(())
    }

    fn status_command(&self) -> Command {
        let mut command = Command::new("tailscale");
        if let Some(socket_path) = &self.socket_path {
            command.arg("--socket").arg(socket_path);
        }
        command
    }

    /// Estado efectivo de la malla para `GET /tailscale/status`.
    pub async fn status_document(&self) -> TailscaleStatusDocument {
        let mut document = TailscaleStatusDocument {
            enabled: self.settings.enabled,
            method: self.effective_method.as_str().to_string(),
            hostname: self.settings.hostname.clone(),
            self_ip: None,
            backend_state: None,
        };

        let output = self
            .status_command()
            .arg("status")
            .arg("--json")
            .stdout(Stdio::piped())
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => {
                if let Ok(parsed) = serde_json::from_slice::<StatusJson>(&output.stdout) {
                    document.backend_state = parsed.backend_state;
                    if let Some(self_node) = parsed.self_node {
                        if document.hostname.is_none() {
                            document.hostname = self_node.host_name;
                        }
                        document.self_ip = self_node
                            .tailscale_ips
                            .and_then(|ips| ips.into_iter().next());
                    }
                }
            }
            Ok(output) => {
                warn!(
                    "🕸️  [TAILSCALE]: Status probe rejected ({}).",
                    output.status
                );
            }
            Err(fault) => {
                warn!("🕸️  [TAILSCALE]: Status probe failed: {}.", fault);
            }
        }

        document
    }

    /// Dirección IPv4 de malla del propio nodo, si existe.
    pub async fn self_ipv4(&self) -> Option<String> {
        let output = self.status_command().arg("ip").arg("-4").output().await.ok()?;
        if !output.status.success() {
            return None;
        }
        let text = String::from_utf8_lossy(&output.stdout);
        text.lines().next().map(|line| line.trim().to_string())
    }

    /// Apagado ordenado: los nodos efímeros cierran sesión para que el
    /// plano de control libere la identidad.
    pub async fn shutdown(&mut self) {
        if self.settings.ephemeral && self.effective_method == TailscaleMethod::Tsnet {
            let _ = self.status_command().arg("logout").output().await;
        }

        if let Some(mut daemon) = self.managed_daemon.take() {
            let _ = daemon.kill().await;
            let _ = daemon.wait().await;
            info!("🕸️  [TAILSCALE]: Managed node reaped.");
        }
    }
}

/// Expande el prefijo `~/` contra $HOME.
fn expand_home(raw_path: &str) -> PathBuf {
    if let Some(relative) = raw_path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(relative);
        }
    }
    PathBuf::from(raw_path)
}
