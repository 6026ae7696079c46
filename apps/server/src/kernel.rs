// [apps/server/src/kernel.rs]
/*!
 * =================================================================
 * APARATO: SERVER KERNEL
 * CLASIFICACIÓN: COMPOSITION ROOT (ESTRATO L1-APP)
 * RESPONSABILIDAD: BOOTSTRAP DE INFRAESTRUCTURA E IGNICIÓN SEGURA
 *
 * Placa base donde se conectan todos los servicios: persistencia,
 * planificador, motor de pérdida, flota de supervisores y
 * descubrimiento, más la superficie HTTP.
 * =================================================================
 */

use crate::config::ServerConfig;
use crate::routes::create_server_router;
use crate::services::{DiscoveryService, SchedulerService};
use crate::state::AppState;
use anyhow::{Context, Result};
use netronome_infra_db::StorageClient;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// Plazo de drenaje global del apagado.
const SHUTDOWN_DRAIN_WINDOW: Duration = Duration::from_secs(5);

pub struct ServerKernel {
    pub application_state: AppState,
    notifier_task: tokio::task::JoinHandle<()>,
    shutdown_sender: watch::Sender<bool>,
    shutdown_receiver: watch::Receiver<bool>,
}

impl ServerKernel {
    /// Establece la conexión a la base antes de levantar servicios.
    pub async fn ignite(config: ServerConfig) -> Result<Self> {
        if config.database.backend != "sqlite" {
            anyhow::bail!(
                "unsupported database backend '{}' (only sqlite)",
                config.database.backend
            );
        }

        let database_client = StorageClient::connect(&config.database.path)
            .await
            .context("database link collapse; ignition aborted")?;

        let (shutdown_sender, shutdown_receiver) = watch::channel(false);
        let (application_state, notifier_task) =
            AppState::new(config, database_client, shutdown_receiver.clone());

        Ok(Self {
            application_state,
            notifier_task,
            shutdown_sender,
            shutdown_receiver,
        })
    }

    /// Lanza daemons y servidor HTTP; bloquea hasta el apagado.
    pub async fn launch(self) -> Result<()> {
        let state = self.application_state.clone();

        // --- 1. CONDUCTOR DE PLANIFICACIÓN ---
        let scheduler: Arc<SchedulerService> = Arc::clone(&state.scheduler);
        let scheduler_task = tokio::spawn(scheduler.run(self.shutdown_receiver.clone()));

        // --- 2. FLOTA DE SUPERVISORES DE AGENTES ---
        state.fleet.launch_enabled().await;

        // --- 3. DESCUBRIMIENTO TAILSCALE ---
        let discovery = Arc::new(DiscoveryService::new(
            Arc::clone(&state.agent_repository),
            Arc::clone(&state.fleet),
            state.config.discovery.clone(),
        ));
        let discovery_task = tokio::spawn(discovery.run(self.shutdown_receiver.clone()));

        // --- 4. SUPERFICIE HTTP ---
        let bind_address: SocketAddr = format!(
            "{}:{}",
            state.config.server.host, state.config.server.port
        )
        .parse()
        .context("invalid bind address")?;

        let listener = tokio::net::TcpListener::bind(bind_address)
            .await
            .with_context(|| format!("bind failure on {}", bind_address))?;

        info!("🚀 [SERVER]: Command center online at http://{}.", bind_address);

        let router = create_server_router(state.clone());
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await
            .context("http server collapsed")?;

        // --- 5. APAGADO ORDENADO (drenaje <= 5 s por tarea) ---
        info!("🛑 [SERVER]: Shutdown signal received; draining daemons.");
        let _ = self.shutdown_sender.send(true);

        state.fleet.stop_all().await;

        let drain = async {
            let _ = scheduler_task.await;
            let _ = discovery_task.await;
            let _ = self.notifier_task.await;
        };
        if tokio::time::timeout(SHUTDOWN_DRAIN_WINDOW, drain).await.is_err() {
            warn!("🛑 [SERVER]: Drain window expired; forcing exit.");
        }

        info!("🛑 [SERVER]: Shutdown complete.");
        Ok(())
    }
}
