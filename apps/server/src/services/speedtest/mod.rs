// [apps/server/src/services/speedtest/mod.rs]
/*!
 * =================================================================
 * APARATO: SPEED TEST SERVICE
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: ORQUESTACIÓN DE RUNNERS, PROGRESO Y PERSISTENCIA
 *
 * Una ejecución a la vez: la celda global de estado pertenece al
 * runner activo. Los fallos se persisten como fila de error.
 * =================================================================
 */

pub mod runners;

use crate::config::SpeedtestSettings;
use crate::services::event_bus::EventBus;
use crate::services::notifier::NotificationDispatcher;
use crate::state::speed_status::SpeedStatusCell;
use chrono::Utc;
use netronome_domain_notification::NotificationEvent;
use netronome_domain_models::{SpeedTestResult, SpeedUpdate, SpeedUpdateKind, TestOptions};
use netronome_infra_db::repositories::SpeedtestRepository;
use runners::RunnerFault;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument, warn};

#[derive(Error, Debug)]
pub enum SpeedTestError {
    #[error("speed test failed: {0}")]
    Execution(String),
}

pub struct SpeedTestService {
    repository: Arc<SpeedtestRepository>,
    status_cell: Arc<SpeedStatusCell>,
    event_bus: EventBus,
    notifier: NotificationDispatcher,
    settings: SpeedtestSettings,
    /// Serializa ejecuciones: la celda de estado es única en el proceso.
    run_serializer: tokio::sync::Mutex<()>,
}

impl SpeedTestService {
    pub fn new(
        repository: Arc<SpeedtestRepository>,
        status_cell: Arc<SpeedStatusCell>,
        event_bus: EventBus,
        notifier: NotificationDispatcher,
        settings: SpeedtestSettings,
    ) -> Self {
        Self {
            repository,
            status_cell,
            event_bus,
            notifier,
            settings,
            run_serializer: tokio::sync::Mutex::new(()),
        }
    }

    fn publish_update(&self, update: SpeedUpdate) {
        self.status_cell.overwrite(update.clone());
        self.event_bus.publish_speed_pulse(update);
    }

    /// Ejecuta una prueba completa bajo el plazo global configurado.
    #[instrument(skip(self, options), fields(runner = options.runner_label()))]
    pub async fn run(
        &self,
        options: TestOptions,
        scheduled: bool,
    ) -> Result<SpeedTestResult, SpeedTestError> {
        let _serializer_guard = self.run_serializer.lock().await;

        let provisional_name = options
            .server_name
            .clone()
            .unwrap_or_else(|| options.runner_label().to_string());

        self.publish_update(SpeedUpdate {
            kind: SpeedUpdateKind::Ping,
            server_name: provisional_name.clone(),
            speed: 0.0,
            progress: 0.0,
            is_complete: false,
            latency: None,
            is_scheduled: scheduled,
        });

        let deadline = Duration::from_secs(self.settings.timeout_seconds.max(30));
        let outcome = tokio::time::timeout(deadline, runners::run_for_options(&options)).await;

        let runner_result: Result<runners::RunnerOutcome, RunnerFault> = match outcome {
            Ok(inner) => inner,
            Err(_) => Err(RunnerFault::Subprocess("test deadline exceeded".into())),
        };

        match runner_result {
            Ok(measured) => {
                let result = SpeedTestResult {
                    id: 0,
                    server_name: measured.server_name.clone(),
                    server_host: measured.server_host.clone(),
                    test_type: options.runner_label().to_string(),
                    ping_ms: measured.ping_ms,
                    jitter_ms: measured.jitter_ms,
                    download_mbps: measured.download_mbps,
                    upload_mbps: measured.upload_mbps,
                    is_scheduled: scheduled,
                    error: None,
                    created_at: Utc::now(),
                };

                let persisted_id = self
                    .repository
                    .insert_result(&result)
                    .await
                    .map_err(|fault| SpeedTestError::Execution(fault.to_string()))?;

                let sealed = SpeedTestResult {
                    id: persisted_id,
                    ..result
                };

                self.surface_threshold_breaches(&sealed);

                self.publish_update(SpeedUpdate {
                    kind: SpeedUpdateKind::Complete,
                    server_name: sealed.server_name.clone(),
                    speed: sealed.download_mbps.max(sealed.upload_mbps),
                    progress: 100.0,
                    is_complete: true,
                    latency: Some(sealed.ping_ms),
                    is_scheduled: scheduled,
                });

                info!(
                    "🏁 [SPEEDTEST]: {} complete — {:.1}/{:.1} Mbps, {:.1} ms.",
                    sealed.test_type, sealed.download_mbps, sealed.upload_mbps, sealed.ping_ms
                );

                Ok(sealed)
            }
            Err(fault) => {
                // Fila de error: el historial conserva el fallo.
                let error_row = SpeedTestResult {
                    id: 0,
                    server_name: provisional_name.clone(),
                    server_host: options.server_host.clone(),
                    test_type: options.runner_label().to_string(),
                    ping_ms: 0.0,
                    jitter_ms: None,
                    download_mbps: 0.0,
                    upload_mbps: 0.0,
                    is_scheduled: scheduled,
                    error: Some(fault.to_string()),
                    created_at: Utc::now(),
                };

                if let Err(persist_fault) = self.repository.insert_result(&error_row).await {
                    warn!("🏁 [SPEEDTEST]: Error row persistence failed: {}.", persist_fault);
                }

                self.publish_update(SpeedUpdate {
                    kind: SpeedUpdateKind::Complete,
                    server_name: provisional_name,
                    speed: 0.0,
                    progress: 100.0,
                    is_complete: true,
                    latency: None,
                    is_scheduled: scheduled,
                });

                warn!("🏁 [SPEEDTEST]: Run failed: {}.", fault);
                Err(SpeedTestError::Execution(fault.to_string()))
            }
        }
    }

    /// Brechas respecto de los umbrales globales => señal de alerta.
    fn surface_threshold_breaches(&self, result: &SpeedTestResult) {
        let mut breaches = Vec::new();

        if let Some(threshold) = self.settings.ping_threshold_ms {
            if result.ping_ms > threshold {
                breaches.push(format!("ping {:.1} ms > {:.1} ms", result.ping_ms, threshold));
            }
        }
        if let Some(threshold) = self.settings.download_threshold_mbps {
            if result.download_mbps < threshold {
                breaches.push(format!(
                    "download {:.1} Mbps < {:.1} Mbps",
                    result.download_mbps, threshold
                ));
            }
        }
        if let Some(threshold) = self.settings.upload_threshold_mbps {
            if result.upload_mbps < threshold {
                breaches.push(format!(
                    "upload {:.1} Mbps < {:.1} Mbps",
                    result.upload_mbps, threshold
                ));
            }
        }

        if !breaches.is_empty() {
            self.notifier
                .dispatch(NotificationEvent::speedtest_alert(result, &breaches.join("; ")));
        }
    }
}
