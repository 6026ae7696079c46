// [apps/server/src/state/mod.rs]
/*!
 * =================================================================
 * APARATO: SERVER STATE HUB
 * CLASIFICACIÓN: APPLICATION STATE (ESTRATO L1-APP)
 * RESPONSABILIDAD: COMPOSICIÓN DE REPOSITORIOS, SERVICIOS Y CACHES
 *
 * DAG de propiedad: el estado posee los servicios; los handlers
 * consultan por copia; ningún servicio guarda referencias de vuelta
 * al servidor.
 * =================================================================
 */

pub mod live_cache;
pub mod speed_status;

use crate::config::ServerConfig;
use crate::services::{
    AgentFleetManager, EventBus, NotificationDispatcher, PacketLossEngine, SchedulerService,
    SpeedTestService,
};
use live_cache::LiveCacheManager;
use netronome_infra_db::repositories::{
    AgentRepository, NotificationRepository, PacketLossRepository, ScheduleRepository,
    SpeedtestRepository, UserRepository,
};
use netronome_infra_db::StorageClient;
use speed_status::SpeedStatusCell;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Contenedor de estado compartido (thread-safe) del servidor.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub database_client: StorageClient,
    pub event_bus: EventBus,
    pub live_cache: Arc<LiveCacheManager>,
    pub speed_status: Arc<SpeedStatusCell>,

    // --- REPOSITORIOS (ESTRATO L3) ---
    pub schedule_repository: Arc<ScheduleRepository>,
    pub packetloss_repository: Arc<PacketLossRepository>,
    pub agent_repository: Arc<AgentRepository>,
    pub speedtest_repository: Arc<SpeedtestRepository>,
    pub notification_repository: Arc<NotificationRepository>,
    pub user_repository: Arc<UserRepository>,

    // --- SERVICIOS (ESTRATO L4) ---
    pub engine: Arc<PacketLossEngine>,
    pub speedtest: Arc<SpeedTestService>,
    pub scheduler: Arc<SchedulerService>,
    pub fleet: Arc<AgentFleetManager>,
}

impl AppState {
    /// Forja el estado completo. Devuelve además la tarea del sumidero
    /// de notificaciones para su drenaje en el apagado.
    pub fn new(
        config: ServerConfig,
        database_client: StorageClient,
        shutdown: watch::Receiver<bool>,
    ) -> (Self, JoinHandle<()>) {
        debug!("🧬 [APP_STATE]: Ignition sequence starting.");

        let shared_config = Arc::new(config);
        let event_bus = EventBus::new();
        let live_cache = Arc::new(LiveCacheManager::new());
        let speed_status = Arc::new(SpeedStatusCell::new());

        let schedule_repository = Arc::new(ScheduleRepository::new(database_client.clone()));
        let packetloss_repository = Arc::new(PacketLossRepository::new(database_client.clone()));
        let agent_repository = Arc::new(AgentRepository::new(database_client.clone()));
        let speedtest_repository = Arc::new(SpeedtestRepository::new(database_client.clone()));
        let notification_repository =
            Arc::new(NotificationRepository::new(database_client.clone()));
        let user_repository = Arc::new(UserRepository::new(database_client.clone()));

        let (notifier, notifier_task) = NotificationDispatcher::spawn(
            Arc::clone(&notification_repository),
            shared_config.notifications.enabled,
            shutdown.clone(),
        );

        let engine = Arc::new(PacketLossEngine::new(
            Arc::clone(&packetloss_repository),
            event_bus.clone(),
            notifier.clone(),
            shared_config.packetloss.clone(),
        ));

        let speedtest = Arc::new(SpeedTestService::new(
            Arc::clone(&speedtest_repository),
            Arc::clone(&speed_status),
            event_bus.clone(),
            notifier,
            shared_config.speedtest.clone(),
        ));

        let scheduler = Arc::new(SchedulerService::new(
            Arc::clone(&schedule_repository),
            Arc::clone(&packetloss_repository),
            Arc::clone(&engine),
            Arc::clone(&speedtest),
            shared_config.packetloss.restore_monitors_on_startup,
        ));

        let fleet = Arc::new(AgentFleetManager::new(
            Arc::clone(&agent_repository),
            Arc::clone(&live_cache),
            shared_config.agents.clone(),
            shutdown,
        ));

        (
            Self {
                config: shared_config,
                database_client,
                event_bus,
                live_cache,
                speed_status,
                schedule_repository,
                packetloss_repository,
                agent_repository,
                speedtest_repository,
                notification_repository,
                user_repository,
                engine,
                speedtest,
                scheduler,
                fleet,
            },
            notifier_task,
        )
    }
}
