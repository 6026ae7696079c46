// [tests/mirror/apps/server/scheduler_recompute.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE RECOMPUTO DE ARRANQUE
 * CLASIFICACIÓN: PROVING GROUNDS (ESTRATO L4-MIRROR)
 * RESPONSABILIDAD: DESCARTE DE DISPAROS PERDIDOS SIN REPLAY
 * =================================================================
 */

use chrono::{Duration, Utc};
use netronome_domain_models::{MonitorKind, PacketLossMonitorDraft, ScheduleDraft};
use netronome_infra_db::repositories::{
    NotificationRepository, PacketLossRepository, ScheduleRepository, SpeedtestRepository,
};
use netronome_infra_db::StorageClient;
use netronome_server::config::{PacketLossSettings, SpeedtestSettings};
use netronome_server::services::packetloss::PacketLossEngine;
use netronome_server::services::{
    EventBus, NotificationDispatcher, SchedulerService, SpeedTestService,
};
use netronome_server::state::speed_status::SpeedStatusCell;
use std::sync::Arc;
use tokio::sync::watch;

async fn scratch_scheduler() -> (
    tempfile::TempDir,
    Arc<ScheduleRepository>,
    Arc<PacketLossRepository>,
    SchedulerService,
) {
    let scratch_directory = tempfile::tempdir().expect("scratch dir");
    let database_path = scratch_directory.path().join("netronome-test.db");
    let client = StorageClient::connect(database_path.to_str().expect("utf8 path"))
        .await
        .expect("storage ignition");

    let schedules = Arc::new(ScheduleRepository::new(client.clone()));
    let packetloss = Arc::new(PacketLossRepository::new(client.clone()));
    let speedtests = Arc::new(SpeedtestRepository::new(client.clone()));
    let notifications = Arc::new(NotificationRepository::new(client));

    let (_shutdown_sender, shutdown_receiver) = watch::channel(false);
    let (dispatcher, _sink_task) =
        NotificationDispatcher::spawn(notifications, false, shutdown_receiver);

    let engine = Arc::new(PacketLossEngine::new(
        Arc::clone(&packetloss),
        EventBus::new(),
        dispatcher.clone(),
        PacketLossSettings::default(),
    ));

    let speedtest_service = Arc::new(SpeedTestService::new(
        speedtests,
        Arc::new(SpeedStatusCell::new()),
        EventBus::new(),
        dispatcher,
        SpeedtestSettings::default(),
    ));

    let scheduler = SchedulerService::new(
        Arc::clone(&schedules),
        Arc::clone(&packetloss),
        engine,
        speedtest_service,
        false,
    );

    (scratch_directory, schedules, packetloss, scheduler)
}

#[tokio::test]
async fn startup_recompute_reanchors_every_enabled_row_to_the_future() {
    let (_scratch, schedules, packetloss, scheduler) = scratch_scheduler().await;

    // Filas varadas horas en el pasado: un proceso detenido se las perdió.
    let stale_instant = Utc::now() - Duration::hours(26);

    let stale_schedule = schedules
        .create(
            &ScheduleDraft {
                monitor_kind: MonitorKind::Speedtest,
                target_ref: String::new(),
                interval_expr: "1h".to_string(),
                enabled: true,
                options_blob: None,
            },
            stale_instant,
        )
        .await
        .expect("create schedule");

    let stale_monitor = packetloss
        .create_monitor(
            &PacketLossMonitorDraft {
                host: "gateway.lan".to_string(),
                name: String::new(),
                interval_expr: "exact:12:00".to_string(),
                packet_count: 5,
                threshold_percent: 5.0,
                enabled: true,
            },
            stale_instant,
        )
        .await
        .expect("create monitor");

    scheduler.recompute_all_on_startup().await;

    let now = Utc::now();

    let schedule_row = schedules.fetch(stale_schedule.id).await.expect("fetch");
    assert!(
        schedule_row.next_run > now,
        "schedule must be re-anchored strictly into the future"
    );
    assert!(schedule_row.last_run.is_none(), "no replay: missed fires leave no last_run");

    let monitor_row = packetloss.fetch_monitor(stale_monitor.id).await.expect("fetch");
    assert!(monitor_row.next_run > now, "monitor must be re-anchored");
    assert!(monitor_row.last_run.is_none());
}

#[tokio::test]
async fn disabled_rows_are_left_untouched_by_the_recompute() {
    let (_scratch, schedules, _packetloss, scheduler) = scratch_scheduler().await;

    let stale_instant = Utc::now() - Duration::hours(3);
    let disabled = schedules
        .create(
            &ScheduleDraft {
                monitor_kind: MonitorKind::Speedtest,
                target_ref: String::new(),
                interval_expr: "1h".to_string(),
                enabled: false,
                options_blob: None,
            },
            stale_instant,
        )
        .await
        .expect("create");

    scheduler.recompute_all_on_startup().await;

    let reloaded = schedules.fetch(disabled.id).await.expect("fetch");
    assert_eq!(
        reloaded.next_run.timestamp(),
        stale_instant.timestamp(),
        "disabled rows stay parked"
    );
}

#[tokio::test]
async fn compute_next_run_always_lands_in_the_future() {
    let (_scratch, _schedules, _packetloss, scheduler) = scratch_scheduler().await;

    for expression in ["1s", "60s", "1h", "exact:00:00", "exact:23:59"] {
        let next = scheduler.compute_next_run(expression).expect("well-formed");
        assert!(next > Utc::now(), "{} produced a non-future next_run", expression);
    }

    assert!(scheduler.compute_next_run("not-a-schedule").is_err());
}
