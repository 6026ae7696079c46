// [apps/server/src/services/scheduler.rs]
/*!
 * =================================================================
 * APARATO: SCHEDULER DRIVER
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: DESPACHO AT-MOST-ONCE DE FILAS PLANIFICADAS
 *
 * Contrato: los disparos perdidos con el proceso detenido se
 * DESCARTAN. En el arranque, antes de entrar al bucle conductor, cada
 * fila habilitada recibe next_run := next_after(expr, now()).
 * El conductor es el único escritor de next_run/last_run; el sellado
 * ocurre ANTES de entregar el trabajo y la entrega jamás lo bloquea.
 * =================================================================
 */

use crate::services::packetloss::PacketLossEngine;
use crate::services::speedtest::SpeedTestService;
use chrono::{DateTime, Utc};
use netronome_core_schedule::{Clock, ScheduleExpression, SystemClock, ThreadRngJitter};
use netronome_domain_models::{MonitorKind, TestOptions};
use netronome_infra_db::repositories::{PacketLossRepository, ScheduleRepository};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tracing::{debug, info, instrument, warn};

/// Tope de siesta del conductor cuando no hay filas habilitadas.
const IDLE_NAP: Duration = Duration::from_secs(30);

/// Retardo de cortesía del arranque restaurado.
const RESTORE_STAGGER: Duration = Duration::from_secs(5);

/// Trabajo vencido, ya normalizado para el orden de despacho.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DueFamily {
    Schedule,
    Monitor,
}

#[derive(Debug, Clone)]
struct DueJob {
    family: DueFamily,
    row_id: i64,
    next_run: DateTime<Utc>,
}

pub struct SchedulerService {
    schedules: Arc<ScheduleRepository>,
    packetloss: Arc<PacketLossRepository>,
    engine: Arc<PacketLossEngine>,
    speedtest: Arc<SpeedTestService>,
    clock: SystemClock,
    jitter: ThreadRngJitter,
    /// Señal de recomputo inmediato tras mutaciones CRUD.
    wake_signal: Arc<Notify>,
    restore_monitors_on_startup: bool,
}

impl SchedulerService {
    pub fn new(
        schedules: Arc<ScheduleRepository>,
        packetloss: Arc<PacketLossRepository>,
        engine: Arc<PacketLossEngine>,
        speedtest: Arc<SpeedTestService>,
        restore_monitors_on_startup: bool,
    ) -> Self {
        Self {
            schedules,
            packetloss,
            engine,
            speedtest,
            clock: SystemClock,
            jitter: ThreadRngJitter,
            wake_signal: Arc::new(Notify::new()),
            restore_monitors_on_startup,
        }
    }

    pub fn wake_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.wake_signal)
    }

    /// Próximo disparo jittered para una expresión textual.
    pub fn compute_next_run(&self, interval_expr: &str) -> Result<DateTime<Utc>, String> {
        let expression =
            ScheduleExpression::parse(interval_expr).map_err(|fault| fault.to_string())?;
        Ok(expression.next_after(self.clock.now(), &self.jitter))
    }

    /// Bucle conductor. Una única tarea por proceso.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        self.recompute_all_on_startup().await;

        if self.restore_monitors_on_startup {
            self.restore_startup_monitors().await;
        }

        info!("🗓️  [SCHEDULER]: Driver loop online.");

        loop {
            let nap = self.nap_until_next_due().await;

            tokio::select! {
                _ = tokio::time::sleep(nap) => {}
                _ = self.wake_signal.notified() => {
                    debug!("🗓️  [SCHEDULER]: Woken by mutation signal.");
                    continue;
                }
                _ = shutdown.changed() => break,
            }

            if *shutdown.borrow() {
                break;
            }

            self.dispatch_due_jobs().await;
        }

        info!("🗓️  [SCHEDULER]: Driver loop drained and closed.");
    }

    /// Descarta disparos perdidos: todo habilitado se re-ancla al futuro.
    #[instrument(skip(self))]
    pub async fn recompute_all_on_startup(&self) {
        let now = self.clock.now();
        let mut recomputed_rows = 0usize;

        match self.schedules.list_enabled().await {
            Ok(rows) => {
                for row in rows {
                    match ScheduleExpression::parse(&row.interval_expr) {
                        Ok(expression) => {
                            let next = expression.next_after(now, &self.jitter);
                            if let Err(fault) = self.schedules.reset_next_run(row.id, next).await {
                                warn!("🗓️  [SCHEDULER]: Reset failed for schedule {}: {}.", row.id, fault);
                            } else {
                                recomputed_rows += 1;
                            }
                        }
                        Err(fault) => {
                            warn!("🗓️  [SCHEDULER]: Schedule {} carries an invalid expression: {}.", row.id, fault);
                        }
                    }
                }
            }
            Err(fault) => warn!("🗓️  [SCHEDULER]: Enabled schedules unreadable: {}.", fault),
        }

        match self.packetloss.list_enabled_monitors().await {
            Ok(rows) => {
                for row in rows {
                    match ScheduleExpression::parse(&row.interval_expr) {
                        Ok(expression) => {
                            let next = expression.next_after(now, &self.jitter);
                            if let Err(fault) = self.packetloss.reset_next_run(row.id, next).await {
                                warn!("🗓️  [SCHEDULER]: Reset failed for monitor {}: {}.", row.id, fault);
                            } else {
                                recomputed_rows += 1;
                            }
                        }
                        Err(fault) => {
                            warn!("🗓️  [SCHEDULER]: Monitor {} carries an invalid expression: {}.", row.id, fault);
                        }
                    }
                }
            }
            Err(fault) => warn!("🗓️  [SCHEDULER]: Enabled monitors unreadable: {}.", fault),
        }

        info!(
            "🗓️  [SCHEDULER]: Startup recompute sealed ({} rows re-anchored; missed fires dropped).",
            recomputed_rows
        );
    }

    /// `restore_monitors_on_startup`: un disparo inmediato por monitor
    /// habilitado, luego planificación normal.
    async fn restore_startup_monitors(&self) {
        tokio::time::sleep(RESTORE_STAGGER).await;

        match self.packetloss.list_enabled_monitors().await {
            Ok(rows) => {
                info!("🗓️  [SCHEDULER]: Startup restore firing {} monitors.", rows.len());
                for monitor in rows {
                    self.engine.run_scheduled(monitor);
                }
            }
            Err(fault) => warn!("🗓️  [SCHEDULER]: Startup restore unreadable: {}.", fault),
        }
    }

    /// Siesta hasta el mínimo next_run habilitado (acotada por IDLE_NAP).
    async fn nap_until_next_due(&self) -> Duration {
        let now = self.clock.now();
        let mut earliest: Option<DateTime<Utc>> = None;

        if let Ok(rows) = self.schedules.list_enabled().await {
            if let Some(row) = rows.first() {
                earliest = Some(row.next_run);
            }
        }
        if let Ok(rows) = self.packetloss.list_enabled_monitors().await {
            if let Some(row) = rows.first() {
                earliest = match earliest {
                    Some(current) if current <= row.next_run => Some(current),
                    _ => Some(row.next_run),
                };
            }
        }

        match earliest {
            Some(instant) if instant <= now => Duration::from_millis(50),
            Some(instant) => (instant - now)
                .to_std()
                .unwrap_or(IDLE_NAP)
                .min(IDLE_NAP),
            None => IDLE_NAP,
        }
    }

    /// Despacho de todo lo vencido, ordenado por (ventana de 1 s, id).
    async fn dispatch_due_jobs(&self) {
        let now = self.clock.now();
        let mut due_jobs: Vec<DueJob> = Vec::new();

        if let Ok(rows) = self.schedules.list_enabled().await {
            for row in rows.into_iter().filter(|row| row.next_run <= now) {
                due_jobs.push(DueJob {
                    family: DueFamily::Schedule,
                    row_id: row.id,
                    next_run: row.next_run,
                });
            }
        }
        if let Ok(rows) = self.packetloss.list_enabled_monitors().await {
            for row in rows.into_iter().filter(|row| row.next_run <= now) {
                due_jobs.push(DueJob {
                    family: DueFamily::Monitor,
                    row_id: row.id,
                    next_run: row.next_run,
                });
            }
        }

        // Desempate: dentro de la misma ventana de 1 s gana el id menor.
        due_jobs.sort_by_key(|job| (job.next_run.timestamp(), job.row_id));

        for job in due_jobs {
            match job.family {
                DueFamily::Schedule => self.fire_schedule(job.row_id, now).await,
                DueFamily::Monitor => self.fire_monitor(job.row_id, now).await,
            }
        }
    }

    /// Relee, sella (last_run + próximo next_run) y entrega. El sellado
    /// condicionado a enabled=1 preserva at-most-once por disparo.
    async fn fire_schedule(&self, schedule_id: i64, now: DateTime<Utc>) {
        let row = match self.schedules.fetch(schedule_id).await {
            Ok(row) if row.enabled && row.next_run <= now => row,
            Ok(_) => return,
            Err(fault) => {
                warn!("🗓️  [SCHEDULER]: Due schedule {} re-read failed: {}.", schedule_id, fault);
                return;
            }
        };

        let Ok(expression) = ScheduleExpression::parse(&row.interval_expr) else {
            warn!("🗓️  [SCHEDULER]: Schedule {} expression drifted; skipping.", row.id);
            return;
        };
        let next_run = expression.next_after(now, &self.jitter);

        match self.schedules.commit_dispatch(row.id, now, next_run).await {
            Ok(true) => {}
            Ok(false) => return, // deshabilitada entre lectura y sellado
            Err(fault) => {
                warn!("🗓️  [SCHEDULER]: Dispatch seal failed for schedule {}: {}.", row.id, fault);
                return;
            }
        }

        match row.monitor_kind {
            MonitorKind::Speedtest => {
                let options = row
                    .options_blob
                    .as_deref()
                    .and_then(|blob| serde_json::from_str::<TestOptions>(blob).ok())
                    .unwrap_or_default();

                let speedtest = Arc::clone(&self.speedtest);
                tokio::spawn(async move {
                    // El fallo queda en la fila de error; el conductor sigue.
                    let _ = speedtest.run(options, true).await;
                });
            }
            MonitorKind::Packetloss => {
                let Ok(monitor_id) = row.target_ref.parse::<i64>() else {
                    warn!("🗓️  [SCHEDULER]: Schedule {} target_ref is not a monitor id.", row.id);
                    return;
                };
                match self.packetloss.fetch_monitor(monitor_id).await {
                    Ok(monitor) => self.engine.run_scheduled(monitor),
                    Err(fault) => {
                        warn!("🗓️  [SCHEDULER]: Schedule {} target unavailable: {}.", row.id, fault);
                    }
                }
            }
        }

        debug!("🗓️  [SCHEDULER]: Schedule {} fired; next at {}.", row.id, next_run);
    }

    async fn fire_monitor(&self, monitor_id: i64, now: DateTime<Utc>) {
        let monitor = match self.packetloss.fetch_monitor(monitor_id).await {
            Ok(row) if row.enabled && row.next_run <= now => row,
            Ok(_) => return,
            Err(fault) => {
                warn!("🗓️  [SCHEDULER]: Due monitor {} re-read failed: {}.", monitor_id, fault);
                return;
            }
        };

        let Ok(expression) = ScheduleExpression::parse(&monitor.interval_expr) else {
            warn!("🗓️  [SCHEDULER]: Monitor {} expression drifted; skipping.", monitor.id);
            return;
        };
        let next_run = expression.next_after(now, &self.jitter);

        match self
            .packetloss
            .commit_dispatch(monitor.id, now, next_run)
            .await
        {
            Ok(true) => {}
            Ok(false) => return,
            Err(fault) => {
                warn!("🗓️  [SCHEDULER]: Dispatch seal failed for monitor {}: {}.", monitor.id, fault);
                return;
            }
        }

        self.engine.run_scheduled(monitor);
        debug!("🗓️  [SCHEDULER]: Monitor {} fired; next at {}.", monitor_id, next_run);
    }
}
