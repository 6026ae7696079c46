// [tests/mirror/apps/server/admission_control.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE CONTROL DE ADMISIÓN
 * CLASIFICACIÓN: PROVING GROUNDS (ESTRATO L4-MIRROR)
 * RESPONSABILIDAD: TOPE max_concurrent_monitors SIN COLA NI FILAS
 * =================================================================
 */

use chrono::{Duration, Utc};
use netronome_domain_models::PacketLossMonitorDraft;
use netronome_infra_db::repositories::{NotificationRepository, PacketLossRepository};
use netronome_infra_db::StorageClient;
use netronome_server::config::PacketLossSettings;
use netronome_server::services::packetloss::{EngineError, PacketLossEngine};
use netronome_server::services::{EventBus, NotificationDispatcher};
use std::sync::Arc;
use tokio::sync::watch;

async fn scratch_engine(
    max_concurrent: usize,
) -> (tempfile::TempDir, Arc<PacketLossRepository>, Arc<PacketLossEngine>) {
    let scratch_directory = tempfile::tempdir().expect("scratch dir");
    let database_path = scratch_directory.path().join("netronome-test.db");
    let client = StorageClient::connect(database_path.to_str().expect("utf8 path"))
        .await
        .expect("storage ignition");

    let repository = Arc::new(PacketLossRepository::new(client.clone()));
    let notifications = Arc::new(NotificationRepository::new(client));
    let (_shutdown_sender, shutdown_receiver) = watch::channel(false);
    let (dispatcher, _sink_task) =
        NotificationDispatcher::spawn(notifications, false, shutdown_receiver);

    let settings = PacketLossSettings {
        max_concurrent_monitors: max_concurrent,
        probe_interval_ms: 1000,
        probe_timeout_seconds: 2,
        prefer_mtr: false,
        restore_monitors_on_startup: false,
    };

    let engine = Arc::new(PacketLossEngine::new(
        Arc::clone(&repository),
        EventBus::new(),
        dispatcher,
        settings,
    ));

    (scratch_directory, repository, engine)
}

fn loopback_draft(sequence: usize) -> PacketLossMonitorDraft {
    PacketLossMonitorDraft {
        host: "127.0.0.1".to_string(),
        name: format!("cap-probe-{}", sequence),
        interval_expr: "60s".to_string(),
        packet_count: 5,
        threshold_percent: 50.0,
        enabled: true,
    }
}

#[tokio::test]
async fn five_simultaneous_triggers_admit_two_and_reject_three() {
    let (_scratch, repository, engine) = scratch_engine(2).await;

    let mut monitors = Vec::new();
    for sequence in 0..5 {
        monitors.push(
            repository
                .create_monitor(&loopback_draft(sequence), Utc::now() + Duration::minutes(1))
                .await
                .expect("create"),
        );
    }

    // Cinco disparos manuales en la misma vuelta del reactor: la admisión
    // se resuelve de forma síncrona, antes de que ninguna sonda avance.
    let mut admitted = Vec::new();
    let mut rejected = Vec::new();

    for monitor in &monitors {
        match engine.spawn_run(monitor.clone(), false) {
            Ok(()) => admitted.push(monitor.id),
            Err(EngineError::Busy) => rejected.push(monitor.id),
        }
    }

    assert_eq!(admitted.len(), 2, "exactly the cap is admitted");
    assert_eq!(rejected.len(), 3, "the surplus is rejected, not queued");
    assert_eq!(engine.active_run_count(), 2);

    // Los rechazados no dejan rastro: ni fila ni progreso en vuelo.
    for monitor_id in &rejected {
        assert!(engine.in_flight_progress(*monitor_id).is_none());
    }

    tokio::time::sleep(std::time::Duration::from_millis(300)).await;

    for monitor_id in rejected {
        let rows = repository.recent_results(monitor_id, 100).await.expect("history");
        assert!(rows.is_empty(), "rejected monitor {} must not persist rows", monitor_id);
    }
}

#[tokio::test]
async fn the_same_monitor_cannot_run_twice_concurrently() {
    let (_scratch, repository, engine) = scratch_engine(4).await;

    let monitor = repository
        .create_monitor(&loopback_draft(99), Utc::now() + Duration::minutes(1))
        .await
        .expect("create");

    assert!(engine.spawn_run(monitor.clone(), false).is_ok());
    assert!(
        matches!(engine.spawn_run(monitor, false), Err(EngineError::Busy)),
        "second concurrent run of one monitor must be busy"
    );
}
