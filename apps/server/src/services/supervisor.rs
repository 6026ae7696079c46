// [apps/server/src/services/supervisor.rs]
/*!
 * =================================================================
 * APARATO: AGENT SUPERVISOR FLEET
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: SESIONES SSE RESILIENTES, CACHE VIVO E INSTANTÁNEAS
 *
 * Un supervisor por agente habilitado. Ciclo de sesión:
 *   Disconnected -> Connecting -> Streaming -> Backoff -> Connecting…
 * Backoff exponencial: base reconnect_interval, tope 5 min, ±20%.
 * El supervisor es el escritor único de su cache vivo y de sus filas
 * de instantáneas.
 * =================================================================
 */

use crate::config::AgentsSettings;
use crate::state::live_cache::LiveCacheManager;
use chrono::Utc;
use futures_util::StreamExt;
use netronome_domain_models::{
    AgentHistoricalSnapshot, AgentInterface, AgentPeakStats, AgentResourceSnapshot,
    AgentSystemInfo, MonitorAgent, MonitorLiveData, SnapshotPeriod,
};
use netronome_infra_agent_client::{AgentHttpClient, SseFrameDecoder};
use netronome_infra_db::repositories::AgentRepository;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Tope del backoff exponencial.
const BACKOFF_CAP: Duration = Duration::from_secs(300);

/// Plazo concedido a un supervisor para drenar en el stop.
const STOP_DRAIN_WINDOW: Duration = Duration::from_secs(5);

/// Retardo de reconexión para el intento `attempt` (1-based):
/// exponencial desde `base`, tope 5 min, ±20% de jitter.
pub fn backoff_for(attempt: u32, base: Duration) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    let raw = base.as_secs_f64() * 2f64.powi(exponent as i32);
    let capped = raw.min(BACKOFF_CAP.as_secs_f64());
    let jitter_factor = rand::thread_rng().gen_range(0.8..=1.2);
    Duration::from_secs_f64((capped * jitter_factor).max(1.0))
}

struct SupervisorHandle {
    cancel_sender: watch::Sender<bool>,
    task: JoinHandle<()>,
}

pub struct AgentFleetManager {
    agents: Arc<AgentRepository>,
    live_cache: Arc<LiveCacheManager>,
    settings: AgentsSettings,
    registry: Mutex<HashMap<i64, SupervisorHandle>>,
    global_shutdown: watch::Receiver<bool>,
}

impl AgentFleetManager {
    pub fn new(
        agents: Arc<AgentRepository>,
        live_cache: Arc<LiveCacheManager>,
        settings: AgentsSettings,
        global_shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            agents,
            live_cache,
            settings,
            registry: Mutex::new(HashMap::new()),
            global_shutdown,
        }
    }

    /// Levanta un supervisor por cada agente habilitado.
    pub async fn launch_enabled(self: &Arc<Self>) {
        match self.agents.list_enabled().await {
            Ok(agent_rows) => {
                info!("🛰️  [FLEET]: Launching {} agent supervisors.", agent_rows.len());
                for agent in agent_rows {
                    self.start_agent(agent).await;
                }
            }
            Err(fault) => warn!("🛰️  [FLEET]: Enabled agents unreadable: {}.", fault),
        }
    }

    /// Idempotente: un supervisor vivo por agente como máximo.
    #[instrument(skip(self, agent), fields(agent_id = agent.id))]
    pub async fn start_agent(self: &Arc<Self>, agent: MonitorAgent) {
        let mut registry = self.registry.lock().await;

        if let Some(handle) = registry.get(&agent.id) {
            if !handle.task.is_finished() {
                debug!("🛰️  [FLEET]: Supervisor {} already streaming; start is a no-op.", agent.id);
                return;
            }
        }

        let (cancel_sender, cancel_receiver) = watch::channel(false);
        let supervisor = AgentSupervisor {
            agent: agent.clone(),
            agents: Arc::clone(&self.agents),
            live_cache: Arc::clone(&self.live_cache),
            settings: self.settings.clone(),
        };

        let global_shutdown = self.global_shutdown.clone();
        let task = tokio::spawn(supervisor.run(cancel_receiver, global_shutdown));

        registry.insert(agent.id, SupervisorHandle { cancel_sender, task });
        info!("🛰️  [FLEET]: Supervisor {} launched.", agent.id);
    }

    /// Termina la sesión y libera recursos. El cache conserva la última
    /// trama para el repliegue de lectores.
    #[instrument(skip(self))]
    pub async fn stop_agent(&self, agent_id: i64) {
        let maybe_handle = self.registry.lock().await.remove(&agent_id);

        if let Some(handle) = maybe_handle {
            let _ = handle.cancel_sender.send(true);
            if tokio::time::timeout(STOP_DRAIN_WINDOW, handle.task).await.is_err() {
                warn!("🛰️  [FLEET]: Supervisor {} drain window expired.", agent_id);
            }
            self.live_cache.mark_streaming(agent_id, false);
            info!("🛰️  [FLEET]: Supervisor {} stopped.", agent_id);
        }
    }

    /// UpdateAgent implica stop-then-start.
    pub async fn restart_agent(self: &Arc<Self>, agent: MonitorAgent) {
        self.stop_agent(agent.id).await;
        if agent.enabled {
            self.start_agent(agent).await;
        }
    }

    /// Baja definitiva: sesión fuera y cache purgado.
    pub async fn forget_agent(&self, agent_id: i64) {
        self.stop_agent(agent_id).await;
        self.live_cache.remove(agent_id);
    }

    pub async fn stop_all(&self) {
        let drained: Vec<i64> = self.registry.lock().await.keys().copied().collect();
        for agent_id in drained {
            self.stop_agent(agent_id).await;
        }
    }
}

/// Sesión de larga vida de un único agente.
struct AgentSupervisor {
    agent: MonitorAgent,
    agents: Arc<AgentRepository>,
    live_cache: Arc<LiveCacheManager>,
    settings: AgentsSettings,
}

impl AgentSupervisor {
    async fn run(
        self,
        mut cancel: watch::Receiver<bool>,
        mut global_shutdown: watch::Receiver<bool>,
    ) {
        let client = match AgentHttpClient::new(self.agent.base_url(), self.agent.api_key.as_deref())
        {
            Ok(client) => client,
            Err(fault) => {
                warn!("🛰️  [SUPERVISOR {}]: Client ignition failed: {}.", self.agent.id, fault);
                return;
            }
        };

        let base_backoff = Duration::from_secs(self.settings.reconnect_interval_seconds.max(1));
        let mut attempt: u32 = 0;

        loop {
            if *cancel.borrow() || *global_shutdown.borrow() {
                break;
            }

            match client.open_live_stream().await {
                Ok(response) => {
                    // Instantánea de conexión antes de drenar el stream.
                    self.snapshot_pass(&client).await;

                    let session_closed_by_stop = self
                        .stream_session(response, &client, &mut cancel, &mut global_shutdown)
                        .await;

                    self.live_cache.mark_streaming(self.agent.id, false);

                    if session_closed_by_stop {
                        break;
                    }
                    attempt = 1;
                }
                Err(fault) => {
                    attempt = attempt.saturating_add(1);
                    warn!(
                        "🛰️  [SUPERVISOR {}]: Connect attempt {} failed: {}.",
                        self.agent.id, attempt, fault
                    );
                }
            }

            let delay = backoff_for(attempt.max(1), base_backoff);
            debug!(
                "🛰️  [SUPERVISOR {}]: Backoff {}s before reconnect.",
                self.agent.id,
                delay.as_secs()
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.changed() => break,
                _ = global_shutdown.changed() => break,
            }
        }

        debug!("🛰️  [SUPERVISOR {}]: Session closed.", self.agent.id);
    }

    /// Drena la sesión SSE. Devuelve true si el cierre vino por stop.
    async fn stream_session(
        &self,
        response: reqwest::Response,
        client: &AgentHttpClient,
        cancel: &mut watch::Receiver<bool>,
        global_shutdown: &mut watch::Receiver<bool>,
    ) -> bool {
        let mut byte_stream = response.bytes_stream();
        let mut frame_decoder = SseFrameDecoder::new();

        let snapshot_cadence = Duration::from_secs(self.settings.snapshot_interval_seconds.max(10));
        let mut snapshot_ticker = tokio::time::interval(snapshot_cadence);
        snapshot_ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        snapshot_ticker.reset();

        self.live_cache.mark_streaming(self.agent.id, true);
        info!("🛰️  [SUPERVISOR {}]: Streaming.", self.agent.id);

        loop {
            tokio::select! {
                maybe_chunk = byte_stream.next() => {
                    match maybe_chunk {
                        Some(Ok(chunk)) => {
                            for payload in frame_decoder.push_chunk(&chunk) {
                                self.ingest_payload(&payload);
                            }
                        }
                        Some(Err(fault)) => {
                            warn!("🛰️  [SUPERVISOR {}]: Stream severed: {}.", self.agent.id, fault);
                            return false;
                        }
                        None => {
                            warn!("🛰️  [SUPERVISOR {}]: Stream EOF.", self.agent.id);
                            return false;
                        }
                    }
                }
                _ = snapshot_ticker.tick() => {
                    self.snapshot_pass(client).await;
                }
                _ = cancel.changed() => return true,
                _ = global_shutdown.changed() => return true,
            }
        }
    }

    /// Payload SSE -> trama tipada -> cache. Malformado: warn y la sesión
    /// continúa intacta.
    fn ingest_payload(&self, payload: &str) {
        match serde_json::from_str::<MonitorLiveData>(payload) {
            Ok(frame) => self.live_cache.record_frame(self.agent.id, frame),
            Err(fault) => {
                warn!(
                    "🛰️  [SUPERVISOR {}]: Malformed live frame skipped: {}.",
                    self.agent.id, fault
                );
            }
        }
    }

    /// Captura y persistencia de instantáneas. Cada fallo se registra y
    /// el supervisor continúa; el cache de lectores repliega a la última
    /// fila persistida.
    #[instrument(skip(self, client), fields(agent_id = self.agent.id))]
    async fn snapshot_pass(&self, client: &AgentHttpClient) {
        match client.fetch_system_info().await {
            Ok(info) => {
                let row = AgentSystemInfo {
                    agent_id: self.agent.id,
                    hostname: info.hostname,
                    kernel: info.kernel,
                    uptime_seconds: info.uptime_seconds as i64,
                    vnstat_version: info.vnstat_version,
                    cpu_model: info.cpu_model,
                    cpu_cores: info.cpu_cores,
                    cpu_threads: info.cpu_threads,
                    total_memory_bytes: info.total_memory_bytes as i64,
                };
                if let Err(fault) = self.agents.upsert_system_info(&row).await {
                    warn!("🛰️  [SUPERVISOR {}]: System info upsert failed: {}.", self.agent.id, fault);
                }
            }
            Err(fault) => {
                warn!("🛰️  [SUPERVISOR {}]: System info fetch failed: {}.", self.agent.id, fault);
            }
        }

        match client.fetch_hardware().await {
            Ok(hardware) => {
                let snapshot = AgentResourceSnapshot {
                    agent_id: self.agent.id,
                    cpu_pct: hardware.cpu.usage_pct,
                    mem_pct: hardware.memory.used_pct,
                    swap_pct: hardware.swap.used_pct,
                    disks_blob: serde_json::to_string(&hardware.disks).unwrap_or_else(|_| "[]".into()),
                    temps_blob: serde_json::to_string(&hardware.temperatures)
                        .unwrap_or_else(|_| "[]".into()),
                    uptime_s: hardware.uptime_seconds as i64,
                    created_at: Utc::now(),
                };
                if let Err(fault) = self.agents.append_resource_snapshot(&snapshot).await {
                    warn!("🛰️  [SUPERVISOR {}]: Resource snapshot append failed: {}.", self.agent.id, fault);
                }
            }
            Err(fault) => {
                warn!("🛰️  [SUPERVISOR {}]: Hardware fetch failed: {}.", self.agent.id, fault);
            }
        }

        match client.fetch_peaks().await {
            Ok(peaks) => {
                let incoming = AgentPeakStats {
                    agent_id: self.agent.id,
                    peak_rx_bps: peaks.peak_rx_bps,
                    peak_tx_bps: peaks.peak_tx_bps,
                    peak_rx_at: peaks.peak_rx_at,
                    peak_tx_at: peaks.peak_tx_at,
                };
                if let Err(fault) = self.agents.merge_peak_stats(&incoming).await {
                    warn!("🛰️  [SUPERVISOR {}]: Peak merge failed: {}.", self.agent.id, fault);
                }
            }
            Err(fault) => {
                warn!("🛰️  [SUPERVISOR {}]: Peaks fetch failed: {}.", self.agent.id, fault);
            }
        }

        match client.fetch_historical(self.agent.interface.as_deref()).await {
            Ok(document) => self.persist_historical(&document).await,
            Err(fault) => {
                warn!("🛰️  [SUPERVISOR {}]: Historical fetch failed: {}.", self.agent.id, fault);
            }
        }
    }

    /// Del volcado vnstat: interfaces reemplazadas en bloque y un blob
    /// histórico por (interfaz, periodo).
    async fn persist_historical(&self, document: &serde_json::Value) {
        let Some(interfaces) = document.get("interfaces").and_then(|v| v.as_array()) else {
            return;
        };

        let mut interface_rows = Vec::new();

        for interface_document in interfaces {
            let name = interface_document
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            if name.is_empty() {
                continue;
            }

            let alias = interface_document
                .get("alias")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();

            let traffic = interface_document.get("traffic");
            let total_rx = traffic
                .and_then(|t| t.get("total"))
                .and_then(|t| t.get("rx"))
                .and_then(|v| v.as_i64())
                .unwrap_or(0);
            let total_tx = traffic
                .and_then(|t| t.get("total"))
                .and_then(|t| t.get("tx"))
                .and_then(|v| v.as_i64())
                .unwrap_or(0);

            interface_rows.push(AgentInterface {
                agent_id: self.agent.id,
                name: name.clone(),
                alias,
                ipv4: String::new(),
                link_speed_mbps: -1,
                bytes_total: total_rx + total_tx,
            });

            for (period, key) in [
                (SnapshotPeriod::Hourly, "hour"),
                (SnapshotPeriod::Daily, "day"),
                (SnapshotPeriod::Monthly, "month"),
            ] {
                let Some(series) = traffic.and_then(|t| t.get(key)) else {
                    continue;
                };
                let snapshot = AgentHistoricalSnapshot {
                    agent_id: self.agent.id,
                    interface: name.clone(),
                    period_type: period,
                    data_blob: series.to_string(),
                    created_at: Utc::now(),
                };
                if let Err(fault) = self.agents.upsert_historical_snapshot(&snapshot).await {
                    warn!(
                        "🛰️  [SUPERVISOR {}]: Historical upsert failed: {}.",
                        self.agent.id, fault
                    );
                }
            }
        }

        if !interface_rows.is_empty() {
            if let Err(fault) = self
                .agents
                .replace_interfaces(self.agent.id, &interface_rows)
                .await
            {
                warn!("🛰️  [SUPERVISOR {}]: Interface replace failed: {}.", self.agent.id, fault);
            }
        }
    }
}
