// [tests/mirror/libs/infra_db/agent_registry.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DEL REGISTRO DE AGENTES
 * CLASIFICACIÓN: PROVING GROUNDS (ESTRATO L3-MIRROR)
 * RESPONSABILIDAD: IDEMPOTENCIA DEL UPSERT Y QUIETUD DE updated_at
 * =================================================================
 */

use chrono::Utc;
use netronome_domain_models::{AgentPeakStats, AgentSystemInfo};
use netronome_infra_db::repositories::AgentRepository;
use netronome_infra_db::StorageClient;

async fn scratch_client() -> (tempfile::TempDir, StorageClient) {
    let scratch_directory = tempfile::tempdir().expect("scratch dir");
    let database_path = scratch_directory.path().join("netronome-test.db");
    let client = StorageClient::connect(database_path.to_str().expect("utf8 path"))
        .await
        .expect("storage ignition");
    (scratch_directory, client)
}

#[tokio::test]
async fn discovery_upsert_is_idempotent_over_repeated_passes() {
    let (_scratch, client) = scratch_client().await;
    let repository = AgentRepository::new(client);

    let peer_urls = [
        "http://100.64.0.10:8200/events?stream=live-data",
        "http://100.64.0.11:8200/events?stream=live-data",
    ];

    let mut first_pass_ids = Vec::new();

    // Diez pasadas de descubrimiento sobre los mismos dos peers.
    for pass in 0..10 {
        for (index, url) in peer_urls.iter().enumerate() {
            let agent = repository
                .upsert_discovered(&format!("edge-{}", index), url, &format!("ts-edge-{}", index))
                .await
                .expect("upsert");

            if pass == 0 {
                first_pass_ids.push(agent.id);
            } else {
                assert_eq!(agent.id, first_pass_ids[index], "id drifted across passes");
            }
        }
    }

    let registered = repository.list().await.expect("list");
    assert_eq!(registered.len(), 2, "exactly one row per peer");
    assert!(registered.iter().all(|agent| agent.is_tailscale));
    assert!(registered.iter().all(|agent| agent.discovered_at.is_some()));
}

#[tokio::test]
async fn system_info_upsert_only_advances_updated_at_on_change() {
    let (_scratch, client) = scratch_client().await;
    let repository = AgentRepository::new(client.clone());

    let identity = AgentSystemInfo {
        agent_id: 7,
        hostname: "edge-07".to_string(),
        kernel: "6.8.0".to_string(),
        uptime_seconds: 1000,
        vnstat_version: "2.10".to_string(),
        cpu_model: "Ryzen 5".to_string(),
        cpu_cores: 6,
        cpu_threads: 12,
        total_memory_bytes: 32_000_000_000,
    };

    repository.upsert_system_info(&identity).await.expect("first upsert");

    let read_updated_at = |client: StorageClient| async move {
        let connection = client.get_connection().expect("connection");
        let mut rows = connection
            .query("SELECT updated_at FROM agent_system_info WHERE agent_id = 7", ())
            .await
            .expect("query");
        let row = rows.next().await.expect("next").expect("row");
        row.get::<String>(0).expect("column")
    };

    let stamp_after_first = read_updated_at(client.clone()).await;

    // Cuerpo idéntico: una fila, sin avance de updated_at.
    repository.upsert_system_info(&identity).await.expect("second upsert");
    let stamp_after_identical = read_updated_at(client.clone()).await;
    assert_eq!(stamp_after_first, stamp_after_identical);

    // Cambio real: updated_at avanza.
    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
    let mut changed = identity.clone();
    changed.uptime_seconds = 2000;
    repository.upsert_system_info(&changed).await.expect("third upsert");
    let stamp_after_change = read_updated_at(client).await;
    assert_ne!(stamp_after_first, stamp_after_change);
}

#[tokio::test]
async fn peak_stats_merge_is_monotone_and_survives_lower_readings() {
    let (_scratch, client) = scratch_client().await;
    let repository = AgentRepository::new(client);

    let genesis = Utc::now();
    let high_watermark = AgentPeakStats {
        agent_id: 3,
        peak_rx_bps: 900_000,
        peak_tx_bps: 500_000,
        peak_rx_at: genesis,
        peak_tx_at: genesis,
    };
    repository.merge_peak_stats(&high_watermark).await.expect("seed");

    // Lecturas inferiores (p. ej. tras un reconnect del agente) no degradan.
    let lower_reading = AgentPeakStats {
        agent_id: 3,
        peak_rx_bps: 100,
        peak_tx_bps: 700_000,
        peak_rx_at: Utc::now(),
        peak_tx_at: Utc::now(),
    };
    let merged = repository.merge_peak_stats(&lower_reading).await.expect("merge");

    assert_eq!(merged.peak_rx_bps, 900_000, "rx peak must never regress");
    assert_eq!(merged.peak_tx_bps, 700_000, "tx peak must rise");

    let stored = repository
        .fetch_peak_stats(3)
        .await
        .expect("fetch")
        .expect("row present");
    assert_eq!(stored.peak_rx_bps, 900_000);
    assert_eq!(stored.peak_tx_bps, 700_000);
}
