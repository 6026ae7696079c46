// [apps/agent/src/runtime.rs]
/*!
 * =================================================================
 * APARATO: AGENT RUNTIME SHELL
 * CLASIFICACIÓN: COMPOSITION ROOT (ESTRATO L1-APP)
 * RESPONSABILIDAD: IGNICIÓN DE TAREAS, BIND HTTP Y APAGADO ORDENADO
 *
 * Cada bucle de larga vida (tailer, broadcaster, servidor) es una
 * tarea propia bajo la señal de cancelación global; el apagado
 * concede 5 s de drenaje.
 * =================================================================
 */

use crate::broadcaster::LiveBroadcaster;
use crate::config::AgentConfig;
use crate::disks::DiskFilter;
use crate::http::{create_agent_router, AgentState};
use crate::peaks::PeakTracker;
use crate::tailscale::TailscaleRuntime;
use crate::vnstat::{VnstatTailer, INGRESS_BUFFER_CAPACITY};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

/// Plazo de drenaje de tareas en el apagado.
const SHUTDOWN_DRAIN_WINDOW: Duration = Duration::from_secs(5);

pub struct AgentRuntime;

impl AgentRuntime {
    /// Ignición completa del agente. Bloquea hasta la señal de apagado.
    pub async fn launch(config: AgentConfig) -> Result<()> {
        info!("💠 [AGENT]: Ignition sequence starting on port {}.", config.port);

        let shared_config = Arc::new(config);
        let (shutdown_sender, shutdown_receiver) = watch::channel(false);

        // --- 1. ESTADO COMPARTIDO ---
        let peak_tracker = Arc::new(PeakTracker::new());
        let broadcaster = Arc::new(LiveBroadcaster::new());
        let disk_filter = Arc::new(DiskFilter::new(
            shared_config.disk_includes.clone(),
            shared_config.disk_excludes.clone(),
        ));

        // --- 2. INTEGRACIÓN TAILSCALE (OPCIONAL) ---
        let mut bind_host = shared_config.host.clone();
        let tailscale_runtime = if shared_config.tailscale.enabled {
            let runtime = TailscaleRuntime::ignite(shared_config.tailscale.clone())
                .await
                .context("tailscale ignition failed")?;

            if let Some(mesh_ip) = runtime.self_ipv4().await {
                info!("🕸️  [AGENT]: Binding on Tailscale address {}.", mesh_ip);
                bind_host = mesh_ip;
            } else {
                warn!("🕸️  [AGENT]: Mesh address unavailable; binding on {}.", bind_host);
            }
            Some(runtime)
        } else {
            None
        };
        let tailscale_cell = Arc::new(tokio::sync::Mutex::new(tailscale_runtime));

        // --- 3. CADENA TAILER -> BROADCASTER ---
        let (ingress_sender, ingress_receiver) = mpsc::channel(INGRESS_BUFFER_CAPACITY);

        let broadcaster_task = tokio::spawn(
            Arc::clone(&broadcaster).run(ingress_receiver, shutdown_receiver.clone()),
        );

        let tailer = VnstatTailer::new(
            shared_config.interface.clone(),
            Arc::clone(&peak_tracker),
            ingress_sender,
        );
        let tailer_task = tokio::spawn(tailer.run(shutdown_receiver.clone()));

        // --- 4. SERVIDOR HTTP ---
        let state = AgentState {
            config: Arc::clone(&shared_config),
            peak_tracker,
            broadcaster,
            disk_filter,
            tailscale: Arc::clone(&tailscale_cell),
        };

        let router = create_agent_router(state);
        let bind_address: SocketAddr = format!("{}:{}", bind_host, shared_config.port)
            .parse()
            .context("invalid bind address")?;

        let listener = tokio::net::TcpListener::bind(bind_address)
            .await
            .with_context(|| format!("bind failure on {}", bind_address))?;

        info!("🚀 [AGENT]: HTTP surface online at http://{}.", bind_address);

        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await
            .context("agent http server collapsed")?;

        // --- 5. APAGADO ORDENADO ---
        info!("🛑 [AGENT]: Shutdown signal received; draining tasks.");
        let _ = shutdown_sender.send(true);

        let drain = async {
            let _ = tailer_task.await;
            let _ = broadcaster_task.await;
        };
        if tokio::time::timeout(SHUTDOWN_DRAIN_WINDOW, drain).await.is_err() {
            warn!("🛑 [AGENT]: Drain window expired; forcing exit.");
        }

        if let Some(mut runtime) = tailscale_cell.lock().await.take() {
            runtime.shutdown().await;
        }

        info!("🛑 [AGENT]: Shutdown complete.");
        Ok(())
    }
}
