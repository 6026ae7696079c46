// [tests/mirror/apps/server/discovery_idempotence.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE IDEMPOTENCIA DEL DESCUBRIMIENTO
 * CLASIFICACIÓN: PROVING GROUNDS (ESTRATO L4-MIRROR)
 * RESPONSABILIDAD: SONDA DE IDENTIDAD + UPSERT ESTABLE SOBRE HTTP REAL
 * =================================================================
 */

use axum::routing::get;
use axum::{Json, Router};
use netronome_domain_models::MonitorAgent;
use netronome_infra_agent_client::{AgentClientError, AgentHttpClient};
use netronome_infra_db::repositories::AgentRepository;
use netronome_infra_db::StorageClient;
use serde_json::json;
use std::future::IntoFuture;

/// Levanta un endpoint de identidad en un puerto efímero.
async fn spawn_identity_endpoint(document: serde_json::Value) -> u16 {
    let router = Router::new().route(
        "/netronome/info",
        get(move || {
            let payload = document.clone();
            async move { Json(payload) }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("ephemeral bind");
    let port = listener.local_addr().expect("local addr").port();

    tokio::spawn(axum::serve(listener, router).into_future());
    port
}

#[tokio::test(flavor = "multi_thread")]
async fn ten_discovery_passes_over_two_peers_yield_two_stable_rows() {
    let scratch_directory = tempfile::tempdir().expect("scratch dir");
    let database_path = scratch_directory.path().join("netronome-test.db");
    let client = StorageClient::connect(database_path.to_str().expect("utf8 path"))
        .await
        .expect("storage ignition");
    let repository = AgentRepository::new(client);

    let peer_ports = [
        spawn_identity_endpoint(
            json!({"type": "netronome-agent", "version": "0.1.0", "hostname": "edge-01"}),
        )
        .await,
        spawn_identity_endpoint(
            json!({"type": "netronome-agent", "version": "0.1.0", "hostname": "edge-02"}),
        )
        .await,
    ];

    let probe_client = reqwest::Client::new();
    let mut first_pass_ids: Vec<i64> = Vec::new();

    for pass in 0..10 {
        for (index, port) in peer_ports.iter().enumerate() {
            let identity = AgentHttpClient::probe_identity(&probe_client, "127.0.0.1", *port)
                .await
                .expect("identity probe");
            assert!(identity.is_netronome_agent());

            let canonical_url = MonitorAgent::canonical_url("127.0.0.1", *port);
            let agent = repository
                .upsert_discovered(&identity.hostname, &canonical_url, &identity.hostname)
                .await
                .expect("upsert");

            if pass == 0 {
                first_pass_ids.push(agent.id);
            } else {
                assert_eq!(agent.id, first_pass_ids[index], "agent id drifted on pass {}", pass);
            }
        }
    }

    let registered = repository.list().await.expect("list");
    assert_eq!(registered.len(), 2, "exactly one row per advertised peer");
}

#[tokio::test(flavor = "multi_thread")]
async fn peers_with_a_foreign_identity_are_not_registered() {
    let foreign_port = spawn_identity_endpoint(
        json!({"type": "some-other-service", "version": "9.9", "hostname": "impostor"}),
    )
    .await;

    let probe_client = reqwest::Client::new();
    let outcome = AgentHttpClient::probe_identity(&probe_client, "127.0.0.1", foreign_port).await;

    assert!(
        matches!(outcome, Err(AgentClientError::NotAnAgent)),
        "foreign identity must be rejected"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_peers_surface_as_transport_faults() {
    let probe_client = reqwest::Client::new();
    // Puerto reservado sin listener.
    let outcome = AgentHttpClient::probe_identity(&probe_client, "127.0.0.1", 9).await;

    assert!(
        matches!(outcome, Err(AgentClientError::Transport(_))),
        "dead peer must surface as transport fault"
    );
}
