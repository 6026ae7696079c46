// [tests/mirror/libs/infra_db/schedule_persistence.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE PERSISTENCIA DE PLANIFICACIÓN
 * CLASIFICACIÓN: PROVING GROUNDS (ESTRATO L3-MIRROR)
 * RESPONSABILIDAD: CICLO RESET -> DISPATCH Y DISCIPLINA SINGLE-WRITER
 * =================================================================
 */

use chrono::{Duration, Utc};
use netronome_domain_models::{MonitorKind, ScheduleDraft};
use netronome_infra_db::repositories::ScheduleRepository;
use netronome_infra_db::StorageClient;

async fn scratch_repository() -> (tempfile::TempDir, ScheduleRepository) {
    let scratch_directory = tempfile::tempdir().expect("scratch dir");
    let database_path = scratch_directory.path().join("netronome-test.db");
    let client = StorageClient::connect(database_path.to_str().expect("utf8 path"))
        .await
        .expect("storage ignition");
    (scratch_directory, ScheduleRepository::new(client))
}

fn speedtest_draft() -> ScheduleDraft {
    ScheduleDraft {
        monitor_kind: MonitorKind::Speedtest,
        target_ref: String::new(),
        interval_expr: "1h".to_string(),
        enabled: true,
        options_blob: None,
    }
}

#[tokio::test]
async fn created_rows_round_trip_with_their_timing_columns() {
    let (_scratch, repository) = scratch_repository().await;
    let initial_next_run = Utc::now() + Duration::minutes(90);

    let created = repository
        .create(&speedtest_draft(), initial_next_run)
        .await
        .expect("create");

    assert_eq!(created.monitor_kind, MonitorKind::Speedtest);
    assert!(created.enabled);
    assert!(created.last_run.is_none());
    assert_eq!(created.next_run.timestamp(), initial_next_run.timestamp());

    let fetched = repository.fetch(created.id).await.expect("fetch");
    assert_eq!(fetched.interval_expr, "1h");
}

#[tokio::test]
async fn reset_next_run_reanchors_a_stale_row_to_the_future() {
    let (_scratch, repository) = scratch_repository().await;

    let stale_instant = Utc::now() - Duration::hours(4);
    let created = repository
        .create(&speedtest_draft(), stale_instant)
        .await
        .expect("create");

    let fresh_instant = Utc::now() + Duration::minutes(5);
    repository
        .reset_next_run(created.id, fresh_instant)
        .await
        .expect("reset");

    let reloaded = repository.fetch(created.id).await.expect("fetch");
    assert!(reloaded.next_run > Utc::now(), "row still anchored in the past");
    // last_run intacto: el recomputo de arranque no fabrica historia.
    assert!(reloaded.last_run.is_none());
}

#[tokio::test]
async fn commit_dispatch_seals_last_run_and_respects_the_enabled_flag() {
    let (_scratch, repository) = scratch_repository().await;

    let created = repository
        .create(&speedtest_draft(), Utc::now())
        .await
        .expect("create");

    let fired_at = Utc::now();
    let upcoming = fired_at + Duration::hours(1);

    let sealed = repository
        .commit_dispatch(created.id, fired_at, upcoming)
        .await
        .expect("dispatch");
    assert!(sealed, "enabled row must seal");

    let reloaded = repository.fetch(created.id).await.expect("fetch");
    assert_eq!(
        reloaded.last_run.map(|instant| instant.timestamp()),
        Some(fired_at.timestamp())
    );

    // Fila deshabilitada: el sellado debe rehusarse (at-most-once).
    repository.set_enabled(created.id, false).await.expect("disable");
    let resealed = repository
        .commit_dispatch(created.id, Utc::now(), upcoming)
        .await
        .expect("dispatch call");
    assert!(!resealed, "disabled row must not seal");
}

#[tokio::test]
async fn list_enabled_orders_by_next_run_then_id() {
    let (_scratch, repository) = scratch_repository().await;
    let base = Utc::now() + Duration::minutes(10);

    let first = repository.create(&speedtest_draft(), base).await.expect("create");
    let second = repository
        .create(&speedtest_draft(), base - Duration::minutes(5))
        .await
        .expect("create");
    let third = repository.create(&speedtest_draft(), base).await.expect("create");

    let enabled_rows = repository.list_enabled().await.expect("list");
    let ordered_ids: Vec<i64> = enabled_rows.iter().map(|row| row.id).collect();

    assert_eq!(ordered_ids, vec![second.id, first.id, third.id]);
}
