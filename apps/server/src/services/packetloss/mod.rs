// [apps/server/src/services/packetloss/mod.rs]
/*!
 * =================================================================
 * APARATO: PACKET LOSS ENGINE
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: EJECUCIONES ICMP/MTR CONCURRENTES Y CANCELABLES
 *
 * Control de admisión: semáforo de ancho max_concurrent_monitors.
 * Sin hueco => `busy` inmediato, sin cola; el planificador volverá
 * a disparar en el próximo ciclo.
 *
 * Máquina de estados por monitor:
 *   Idle -> Running -> (Completed | Failed) -> Idle
 * Stop durante Running cancela el hijo; la fila registra lo recibido.
 * =================================================================
 */

pub mod parsers;

use crate::config::PacketLossSettings;
use crate::services::event_bus::EventBus;
use crate::services::notifier::NotificationDispatcher;
use chrono::Utc;
use netronome_domain_notification::NotificationEvent;
use netronome_domain_models::{
    PacketLossMonitor, PacketLossProgress, PacketLossResult, RunPhase,
};
use netronome_infra_db::repositories::PacketLossRepository;
use parsers::{ProbeCounts, RttSummary};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore};
use tracing::{info, instrument, warn};

#[derive(Error, Debug)]
pub enum EngineError {
    /// Tope de admisión alcanzado o monitor ya en ejecución.
    #[error("[ENGINE_BUSY]: ADMISSION_CAP_REACHED")]
    Busy,
}

/// Falla interna de una ejecución individual.
#[derive(Error, Debug)]
enum RunFault {
    #[error("probe subprocess fault: {0}")]
    Subprocess(String),
    #[error("probe output unparseable")]
    Parse,
    #[error("run cancelled by operator")]
    Cancelled,
}

struct ActiveRunHandle {
    cancel_sender: watch::Sender<bool>,
    progress: Arc<Mutex<PacketLossProgress>>,
}

pub struct PacketLossEngine {
    repository: Arc<PacketLossRepository>,
    event_bus: EventBus,
    notifier: NotificationDispatcher,
    admission_semaphore: Arc<Semaphore>,
    active_runs: Mutex<HashMap<i64, ActiveRunHandle>>,
    settings: PacketLossSettings,
}

impl PacketLossEngine {
    pub fn new(
        repository: Arc<PacketLossRepository>,
        event_bus: EventBus,
        notifier: NotificationDispatcher,
        settings: PacketLossSettings,
    ) -> Self {
        Self {
            repository,
            event_bus,
            notifier,
            admission_semaphore: Arc::new(Semaphore::new(settings.max_concurrent_monitors.max(1))),
            active_runs: Mutex::new(HashMap::new()),
            settings,
        }
    }

    /// Progreso en vuelo de un monitor, si hay ejecución activa.
    pub fn in_flight_progress(&self, monitor_id: i64) -> Option<PacketLossProgress> {
        self.active_runs
            .lock()
            .expect("FATAL: Engine registry lock poisoned")
            .get(&monitor_id)
            .map(|handle| {
                handle
                    .progress
                    .lock()
                    .expect("FATAL: Progress lock poisoned")
                    .clone()
            })
    }

    pub fn active_run_count(&self) -> usize {
        self.active_runs
            .lock()
            .expect("FATAL: Engine registry lock poisoned")
            .len()
    }

    /// Señal de cancelación para una ejecución en vuelo.
    pub fn cancel_run(&self, monitor_id: i64) -> bool {
        let registry = self
            .active_runs
            .lock()
            .expect("FATAL: Engine registry lock poisoned");

        match registry.get(&monitor_id) {
            Some(handle) => handle.cancel_sender.send(true).is_ok(),
            None => false,
        }
    }

    /// Entrada del planificador: el rechazo por admisión se registra y el
    /// siguiente disparo lo recogerá.
    #[instrument(skip(self, monitor), fields(monitor_id = monitor.id))]
    pub fn run_scheduled(self: &Arc<Self>, monitor: PacketLossMonitor) {
        if let Err(EngineError::Busy) = self.spawn_run(monitor, true) {
            info!("🚦 [ENGINE]: Scheduled run rejected (busy); next fire will retry.");
        }
    }

    /// Admisión + despegue de una ejecución. No bloquea al llamante.
    pub fn spawn_run(
        self: &Arc<Self>,
        monitor: PacketLossMonitor,
        scheduled: bool,
    ) -> Result<(), EngineError> {
        let permit = Arc::clone(&self.admission_semaphore)
            .try_acquire_owned()
            .map_err(|_| EngineError::Busy)?;

        let use_mtr = self.should_use_mtr();
        let (cancel_sender, cancel_receiver) = watch::channel(false);
        let progress = Arc::new(Mutex::new(PacketLossProgress {
            monitor_id: monitor.id,
            phase: RunPhase::Running,
            packets_sent: 0,
            packets_received: 0,
            progress_pct: 0.0,
            used_mtr: use_mtr,
        }));

        {
            let mut registry = self
                .active_runs
                .lock()
                .expect("FATAL: Engine registry lock poisoned");

            if registry.contains_key(&monitor.id) {
                return Err(EngineError::Busy);
            }
            registry.insert(
                monitor.id,
                ActiveRunHandle {
                    cancel_sender,
                    progress: Arc::clone(&progress),
                },
            );
        }

        let engine = Arc::clone(self);
        tokio::spawn(async move {
            engine
                .execute_run(permit, monitor, cancel_receiver, progress, use_mtr, scheduled)
                .await;
        });

        Ok(())
    }

    /// Cuerpo completo de una ejecución, del despegue al sellado.
    async fn execute_run(
        self: Arc<Self>,
        _permit: OwnedSemaphorePermit,
        monitor: PacketLossMonitor,
        cancel_receiver: watch::Receiver<bool>,
        progress: Arc<Mutex<PacketLossProgress>>,
        use_mtr: bool,
        scheduled: bool,
    ) {
        let started_at = Utc::now();
        self.publish_progress(&progress, |p| p.phase = RunPhase::Running);

        let outcome = if use_mtr {
            self.run_mtr_probe(&monitor, cancel_receiver.clone()).await
        } else {
            self.run_ping_probe(&monitor, cancel_receiver.clone(), &progress)
                .await
        };

        match outcome {
            Ok((counts, rtt, hop_count, mtr_blob)) => {
                let result = PacketLossResult {
                    id: 0,
                    monitor_id: monitor.id,
                    started_at,
                    packet_loss_pct: counts.loss_pct,
                    min_rtt_ms: rtt.min_ms,
                    avg_rtt_ms: rtt.avg_ms,
                    max_rtt_ms: rtt.max_ms,
                    stddev_rtt_ms: Some(rtt.stddev_ms),
                    packets_sent: counts.transmitted,
                    packets_received: counts.received,
                    used_mtr: use_mtr,
                    hop_count,
                    mtr_blob,
                    created_at: Utc::now(),
                };

                if let Err(fault) = self.repository.insert_result(&result).await {
                    warn!("🚦 [ENGINE]: Result persistence failed: {}.", fault);
                }

                if result.packet_loss_pct > monitor.threshold_percent {
                    self.notifier
                        .dispatch(NotificationEvent::packet_loss_breach(&monitor, &result));
                }

                self.publish_progress(&progress, |p| {
                    p.phase = RunPhase::Completed;
                    p.packets_sent = result.packets_sent;
                    p.packets_received = result.packets_received;
                    p.progress_pct = 100.0;
                });

                info!(
                    "🚦 [ENGINE]: Monitor {} completed ({:.1}% loss, {}).",
                    monitor.id,
                    result.packet_loss_pct,
                    if use_mtr { "mtr" } else { "ping" },
                );
            }
            Err(RunFault::Cancelled) => {
                // Sellado parcial: la fila registra lo recibido hasta el corte.
                let snapshot = progress
                    .lock()
                    .expect("FATAL: Progress lock poisoned")
                    .clone();

                if snapshot.packets_received > 0 {
                    let sent = monitor.packet_count.max(snapshot.packets_received);
                    let loss_pct =
                        ((sent - snapshot.packets_received) as f64 / sent as f64) * 100.0;
                    let partial = PacketLossResult {
                        id: 0,
                        monitor_id: monitor.id,
                        started_at,
                        packet_loss_pct: loss_pct,
                        min_rtt_ms: 0.0,
                        avg_rtt_ms: 0.0,
                        max_rtt_ms: 0.0,
                        stddev_rtt_ms: None,
                        packets_sent: sent,
                        packets_received: snapshot.packets_received,
                        used_mtr: use_mtr,
                        hop_count: None,
                        mtr_blob: None,
                        created_at: Utc::now(),
                    };
                    if let Err(fault) = self.repository.insert_result(&partial).await {
                        warn!("🚦 [ENGINE]: Partial result persistence failed: {}.", fault);
                    }
                }

                self.publish_progress(&progress, |p| p.phase = RunPhase::Idle);
                info!("🚦 [ENGINE]: Monitor {} run cancelled.", monitor.id);
            }
            Err(fault) => {
                // Fallo de parseo o subproceso: sin fila persistida.
                warn!("🚦 [ENGINE]: Monitor {} run failed: {}.", monitor.id, fault);
                self.publish_progress(&progress, |p| p.phase = RunPhase::Failed);
            }
        }

        if !scheduled {
            // Ejecuciones manuales vuelven a Idle visible de inmediato.
            self.publish_progress(&progress, |p| {
                if p.phase == RunPhase::Running {
                    p.phase = RunPhase::Idle;
                }
            });
        }

        self.active_runs
            .lock()
            .expect("FATAL: Engine registry lock poisoned")
            .remove(&monitor.id);
    }

    fn publish_progress<F>(&self, progress: &Arc<Mutex<PacketLossProgress>>, mutate: F)
    where
        F: FnOnce(&mut PacketLossProgress),
    {
        let snapshot = {
            let mut guard = progress.lock().expect("FATAL: Progress lock poisoned");
            mutate(&mut guard);
            guard.clone()
        };
        self.event_bus.publish_packet_loss_pulse(snapshot);
    }

    // --- SELECCIÓN DE MÉTODO ---

    /// MTR cuando el binario existe y (en Linux) el proceso porta
    /// CAP_NET_RAW; en Docker sin esa capacidad MTR degrada a sondas UDP
    /// por sí mismo. En el resto de casos, ping del sistema.
    fn should_use_mtr(&self) -> bool {
        if !self.settings.prefer_mtr || !binary_available("mtr") {
            return false;
        }
        if cfg!(target_os = "linux") {
            return process_has_net_raw();
        }
        true
    }

    // --- SONDA PING ---

    async fn run_ping_probe(
        &self,
        monitor: &PacketLossMonitor,
        mut cancel_receiver: watch::Receiver<bool>,
        progress: &Arc<Mutex<PacketLossProgress>>,
    ) -> Result<(ProbeCounts, RttSummary, Option<i64>, Option<String>), RunFault> {
        let host = monitor.probe_host().to_string();
        let packet_count = monitor.packet_count.max(1);

        let mut command = Command::new("ping");
        if cfg!(target_os = "windows") {
            command
                .arg("-n")
                .arg(packet_count.to_string())
                .arg("-w")
                .arg((self.settings.probe_timeout_seconds * 1000).to_string());
        } else {
            command
                .arg("-c")
                .arg(packet_count.to_string())
                .arg("-i")
                .arg(format!("{:.1}", self.settings.probe_interval_ms as f64 / 1000.0))
                .arg("-W")
                .arg(self.settings.probe_timeout_seconds.to_string());
        }
        command.arg(&host);

        let mut child = command
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|fault| RunFault::Subprocess(fault.to_string()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RunFault::Subprocess("stdout not captured".into()))?;
        let mut line_reader = BufReader::new(stdout).lines();

        let run_deadline = Duration::from_millis(
            packet_count as u64 * self.settings.probe_interval_ms
                + self.settings.probe_timeout_seconds * 1000
                + 10_000,
        );
        let deadline = tokio::time::Instant::now() + run_deadline;

        let mut captured_output = String::new();
        let mut replies_observed: i64 = 0;

        loop {
            tokio::select! {
                maybe_line = line_reader.next_line() => {
                    match maybe_line {
                        Ok(Some(line)) => {
                            if parsers::is_reply_line(&line) {
                                replies_observed += 1;
                                let observed = replies_observed;
                                self.publish_progress(progress, |p| {
                                    p.packets_sent = observed;
                                    p.packets_received = observed;
                                    p.progress_pct =
                                        (observed as f64 / packet_count as f64 * 100.0).min(100.0);
                                });
                            }
                            captured_output.push_str(&line);
                            captured_output.push('\n');
                        }
                        Ok(None) => break,
                        Err(fault) => {
                            let _ = child.kill().await;
                            let _ = child.wait().await;
                            return Err(RunFault::Subprocess(fault.to_string()));
                        }
                    }
                }
                _ = cancel_receiver.changed() => {
                    let _ = child.kill().await;
                    let _ = child.wait().await;
                    return Err(RunFault::Cancelled);
                }
                _ = tokio::time::sleep_until(deadline) => {
                    let _ = child.kill().await;
                    let _ = child.wait().await;
                    return Err(RunFault::Subprocess("probe deadline exceeded".into()));
                }
            }
        }

        // ping sale con código != 0 ante pérdida total: el resumen manda.
        let _ = child.wait().await;

        let counts = parsers::parse_counts(&captured_output).ok_or(RunFault::Parse)?;
        let rtt = parsers::parse_rtt(&captured_output).unwrap_or(RttSummary {
            min_ms: 0.0,
            avg_ms: 0.0,
            max_ms: 0.0,
            stddev_ms: 0.0,
        });

        if counts.received > 0 && rtt.max_ms == 0.0 && rtt.avg_ms == 0.0 {
            // Hubo ecos pero el bloque de latencias no apareció: parse roto.
            return Err(RunFault::Parse);
        }

        Ok((counts, rtt, None, None))
    }

    // --- SONDA MTR ---

    async fn run_mtr_probe(
        &self,
        monitor: &PacketLossMonitor,
        mut cancel_receiver: watch::Receiver<bool>,
    ) -> Result<(ProbeCounts, RttSummary, Option<i64>, Option<String>), RunFault> {
        let host = monitor.probe_host().to_string();
        let packet_count = monitor.packet_count.max(1);

        let mut command = Command::new("mtr");
        command
            .arg("--json")
            .arg("-c")
            .arg(packet_count.to_string())
            .arg("--no-dns")
            .arg(&host);

        let mut child = command
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|fault| RunFault::Subprocess(fault.to_string()))?;

        let run_deadline = Duration::from_millis(
            packet_count as u64 * self.settings.probe_interval_ms.max(1000) * 2 + 30_000,
        );

        let collected = tokio::select! {
            outcome = child.wait_with_output() => {
                outcome.map_err(|fault| RunFault::Subprocess(fault.to_string()))?
            }
            _ = cancel_receiver.changed() => {
                return Err(RunFault::Cancelled);
            }
            _ = tokio::time::sleep(run_deadline) => {
                return Err(RunFault::Subprocess("mtr deadline exceeded".into()));
            }
        };

        if !collected.status.success() {
            return Err(RunFault::Subprocess(format!(
                "mtr exited with {}",
                collected.status
            )));
        }

        let raw_json = String::from_utf8_lossy(&collected.stdout).to_string();
        let summary = parsers::parse_mtr_report(&raw_json).ok_or(RunFault::Parse)?;

        Ok((
            summary.counts,
            summary.rtt,
            Some(summary.hop_count),
            Some(raw_json),
        ))
    }
}

/// Busca un binario por los directorios de $PATH.
fn binary_available(binary_name: &str) -> bool {
    let Ok(path_variable) = std::env::var("PATH") else {
        return false;
    };

    std::env::split_paths(&path_variable).any(|directory| {
        let candidate = directory.join(binary_name);
        candidate.is_file()
    })
}

/// CAP_NET_RAW (bit 13) en la máscara CapEff de /proc/self/status.
/// Un proceso root porta la máscara completa, así que queda cubierto.
fn process_has_net_raw() -> bool {
    const CAP_NET_RAW_BIT: u64 = 1 << 13;

    let Ok(status_text) = std::fs::read_to_string("/proc/self/status") else {
        return false;
    };

    status_text
        .lines()
        .find_map(|line| line.strip_prefix("CapEff:"))
        .and_then(|hex| u64::from_str_radix(hex.trim(), 16).ok())
        .map(|mask| mask & CAP_NET_RAW_BIT != 0)
        .unwrap_or(false)
}
