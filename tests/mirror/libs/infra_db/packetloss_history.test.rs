// [tests/mirror/libs/infra_db/packetloss_history.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DEL HISTORIAL DE PÉRDIDA DE PAQUETES
 * CLASIFICACIÓN: PROVING GROUNDS (ESTRATO L3-MIRROR)
 * RESPONSABILIDAD: ORDEN DESCENDENTE, TOPE 1000 Y BAJA EN CASCADA
 * =================================================================
 */

use chrono::{Duration, Utc};
use netronome_domain_models::{PacketLossMonitorDraft, PacketLossResult};
use netronome_infra_db::repositories::PacketLossRepository;
use netronome_infra_db::StorageClient;

async fn scratch_repository() -> (tempfile::TempDir, PacketLossRepository) {
    let scratch_directory = tempfile::tempdir().expect("scratch dir");
    let database_path = scratch_directory.path().join("netronome-test.db");
    let client = StorageClient::connect(database_path.to_str().expect("utf8 path"))
        .await
        .expect("storage ignition");
    (scratch_directory, PacketLossRepository::new(client))
}

fn monitor_draft(host: &str) -> PacketLossMonitorDraft {
    PacketLossMonitorDraft {
        host: host.to_string(),
        name: String::new(),
        interval_expr: "60s".to_string(),
        packet_count: 10,
        threshold_percent: 5.0,
        enabled: true,
    }
}

fn sealed_result(monitor_id: i64, sequence: i64) -> PacketLossResult {
    let instant = Utc::now() - Duration::minutes(10 - sequence);
    PacketLossResult {
        id: 0,
        monitor_id,
        started_at: instant,
        packet_loss_pct: sequence as f64,
        min_rtt_ms: 1.0,
        avg_rtt_ms: 2.0,
        max_rtt_ms: 3.0,
        stddev_rtt_ms: Some(0.5),
        packets_sent: 10,
        packets_received: 10 - sequence,
        used_mtr: false,
        hop_count: None,
        mtr_blob: None,
        created_at: instant,
    }
}

#[tokio::test]
async fn empty_name_defaults_to_the_host() {
    let (_scratch, repository) = scratch_repository().await;

    let monitor = repository
        .create_monitor(&monitor_draft("gateway.example.net"), Utc::now() + Duration::minutes(1))
        .await
        .expect("create");

    assert_eq!(monitor.name, "gateway.example.net");
}

#[tokio::test]
async fn recent_results_come_back_descending_and_clamped() {
    let (_scratch, repository) = scratch_repository().await;

    let monitor = repository
        .create_monitor(&monitor_draft("8.8.8.8"), Utc::now() + Duration::minutes(1))
        .await
        .expect("create");

    for sequence in 0..5 {
        repository
            .insert_result(&sealed_result(monitor.id, sequence))
            .await
            .expect("insert");
    }

    let recent = repository.recent_results(monitor.id, 3).await.expect("history");
    assert_eq!(recent.len(), 3);
    assert!(
        recent.windows(2).all(|pair| pair[0].created_at >= pair[1].created_at),
        "history must be descending"
    );

    // Límite desbordado: el tope duro de 1000 absorbe la petición.
    let clamped = repository.recent_results(monitor.id, 50_000).await.expect("history");
    assert_eq!(clamped.len(), 5);

    let latest = repository
        .latest_result(monitor.id)
        .await
        .expect("latest")
        .expect("present");
    assert_eq!(latest.packet_loss_pct, 4.0);
}

#[tokio::test]
async fn deleting_a_monitor_cascades_to_its_results() {
    let (_scratch, repository) = scratch_repository().await;

    let monitor = repository
        .create_monitor(&monitor_draft("1.1.1.1"), Utc::now() + Duration::minutes(1))
        .await
        .expect("create");

    for sequence in 0..3 {
        repository
            .insert_result(&sealed_result(monitor.id, sequence))
            .await
            .expect("insert");
    }

    repository.delete_monitor(monitor.id).await.expect("delete");

    let orphaned = repository.recent_results(monitor.id, 100).await.expect("history");
    assert!(orphaned.is_empty(), "results must not survive their monitor");
}
