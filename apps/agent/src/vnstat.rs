// [apps/agent/src/vnstat.rs]
/*!
 * =================================================================
 * APARATO: VNSTAT LIVE TAILER
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: TAIL DE `vnstat --live --json` Y EXPORTES HISTÓRICOS
 *
 * Contrato de ingreso: canal acotado (100) con descarte en lleno.
 * Una trama es una instantánea completa; perderla no corrompe nada.
 * =================================================================
 */

use crate::peaks::PeakTracker;
use anyhow::{Context, Result};
use chrono::{Local, Offset, Utc};
use netronome_domain_models::MonitorLiveData;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Capacidad del canal de ingreso hacia el broadcaster.
pub const INGRESS_BUFFER_CAPACITY: usize = 100;

/// Pausa antes de relanzar un hijo vnstat caído.
const RESPAWN_DELAY: Duration = Duration::from_secs(5);

pub struct VnstatTailer {
    monitored_interface: Option<String>,
    peak_tracker: Arc<PeakTracker>,
    ingress_sender: mpsc::Sender<String>,
}

impl VnstatTailer {
    pub fn new(
        monitored_interface: Option<String>,
        peak_tracker: Arc<PeakTracker>,
        ingress_sender: mpsc::Sender<String>,
    ) -> Self {
        Self {
            monitored_interface,
            peak_tracker,
            ingress_sender,
        }
    }

    /// Bucle de vigilancia: un único hijo vnstat a la vez; si muere y no
    /// hay apagado en curso, se relanza tras una pausa corta.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "📟 [VNSTAT]: Live tailer online (interface: {}).",
            self.monitored_interface.as_deref().unwrap_or("auto")
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.tail_one_child(&mut shutdown).await {
                Ok(true) => break, // apagado ordenado
                Ok(false) => {
                    warn!("📟 [VNSTAT]: Child exited; respawning in {:?}.", RESPAWN_DELAY);
                }
                Err(fault) => {
                    warn!("📟 [VNSTAT]: Tail fault: {}. Respawning in {:?}.", fault, RESPAWN_DELAY);
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(RESPAWN_DELAY) => {}
                _ = shutdown.changed() => break,
            }
        }

        info!("📟 [VNSTAT]: Live tailer drained and closed.");
    }

    /// Devuelve Ok(true) si el cierre vino por apagado; Ok(false) si el
    /// hijo terminó por su cuenta (EOF en stdout).
    async fn tail_one_child(&self, shutdown: &mut watch::Receiver<bool>) -> Result<bool> {
        let mut command = Command::new("vnstat");
        command.arg("--live").arg("--json");
        if let Some(interface) = &self.monitored_interface {
            command.arg("--iface").arg(interface);
        }

        let mut child = command
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .context("vnstat binary not spawnable")?;

        let stdout = child
            .stdout
            .take()
            .context("vnstat stdout not captured")?;
        let mut line_reader = BufReader::new(stdout).lines();

        loop {
            tokio::select! {
                maybe_line = line_reader.next_line() => {
                    match maybe_line {
                        Ok(Some(line)) => self.ingest_line(line),
                        Ok(None) => {
                            let _ = child.wait().await;
                            return Ok(false);
                        }
                        Err(fault) => {
                            let _ = child.kill().await;
                            let _ = child.wait().await;
                            return Err(fault.into());
                        }
                    }
                }
                _ = shutdown.changed() => {
                    let _ = child.kill().await;
                    let _ = child.wait().await;
                    return Ok(true);
                }
            }
        }
    }

    /// Parseo tolerante: línea malformada => warn y descarte de la trama.
    fn ingest_line(&self, line: String) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return;
        }

        match serde_json::from_str::<MonitorLiveData>(trimmed) {
            Ok(frame) => {
                self.peak_tracker.observe(&frame);

                // Oferta no bloqueante: buffer lleno => trama descartada.
                if let Err(mpsc::error::TrySendError::Full(_)) =
                    self.ingress_sender.try_send(trimmed.to_string())
                {
                    debug!("📟 [VNSTAT]: Ingress buffer full; frame dropped.");
                }
            }
            Err(fault) => {
                warn!("📟 [VNSTAT]: Unparseable live frame discarded: {}.", fault);
            }
        }
    }
}

/// Versión de vnstat instalada (`vnstat --version`, segundo token).
pub async fn vnstat_version() -> String {
    let output = Command::new("vnstat").arg("--version").output().await;

    match output {
        Ok(output) if output.status.success() => {
            let first_line = String::from_utf8_lossy(&output.stdout);
            first_line
                .lines()
                .next()
                .and_then(|line| line.split_whitespace().nth(1))
                .unwrap_or("unknown")
                .to_string()
        }
        _ => "unavailable".to_string(),
    }
}

/// Volcado histórico (`vnstat --json`) enriquecido con la hora del agente.
pub async fn historical_export(interface: Option<&str>) -> Result<serde_json::Value> {
    let mut command = Command::new("vnstat");
    command.arg("--json");
    if let Some(name) = interface {
        command.arg("--iface").arg(name);
    }

    let output = tokio::time::timeout(Duration::from_secs(15), command.output())
        .await
        .context("vnstat export timed out")??;

    if !output.status.success() {
        anyhow::bail!("vnstat export exited with {}", output.status);
    }

    let mut document: serde_json::Value =
        serde_json::from_slice(&output.stdout).context("vnstat export is not valid JSON")?;

    let now_utc = Utc::now();
    let timezone_offset_seconds = Local::now().offset().fix().local_minus_utc();

    if let Some(object) = document.as_object_mut() {
        object.insert("server_time".into(), serde_json::json!(now_utc.to_rfc3339()));
        object.insert("server_time_unix".into(), serde_json::json!(now_utc.timestamp()));
        object.insert("timezone_offset".into(), serde_json::json!(timezone_offset_seconds));
    }

    Ok(document)
}
