// [apps/server/src/state/live_cache.rs]
/*!
 * =================================================================
 * APARATO: AGENT LIVE CACHE
 * CLASIFICACIÓN: APPLICATION STATE ATOM (ESTRATO L1-APP)
 * RESPONSABILIDAD: ÚLTIMA TRAMA CONOCIDA POR AGENTE
 *
 * Escritor único: el supervisor de cada agente. Los lectores reciben
 * copias inmutables. `connected` exige sesión Streaming y trama
 * recibida dentro de los últimos 10 segundos.
 * =================================================================
 */

use chrono::{DateTime, Duration, Utc};
use netronome_domain_models::{LiveAgentState, MonitorLiveData};
use std::collections::HashMap;
use std::sync::RwLock;

/// Ventana de frescura de la conexión.
const LIVENESS_WINDOW_SECONDS: i64 = 10;

#[derive(Debug, Default, Clone)]
struct CacheEntry {
    streaming: bool,
    last_frame: Option<MonitorLiveData>,
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
pub struct LiveCacheManager {
    entries: RwLock<HashMap<i64, CacheEntry>>,
}

impl LiveCacheManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra una trama recién decodificada del stream del agente.
    pub fn record_frame(&self, agent_id: i64, frame: MonitorLiveData) {
        let mut guard = self.entries.write().expect("FATAL: Live cache lock poisoned");
        let entry = guard.entry(agent_id).or_default();
        entry.streaming = true;
        entry.last_frame = Some(frame);
        entry.updated_at = Some(Utc::now());
    }

    /// Marca la transición de sesión (Streaming <-> Backoff/Stopped).
    pub fn mark_streaming(&self, agent_id: i64, streaming: bool) {
        let mut guard = self.entries.write().expect("FATAL: Live cache lock poisoned");
        guard.entry(agent_id).or_default().streaming = streaming;
    }

    /// Baja definitiva del agente (StopAgent / DeleteAgent).
    pub fn remove(&self, agent_id: i64) {
        self.entries
            .write()
            .expect("FATAL: Live cache lock poisoned")
            .remove(&agent_id);
    }

    /// Copia del estado en vivo. `connected` se evalúa en el momento de
    /// la lectura contra la ventana de frescura.
    pub fn snapshot(&self, agent_id: i64) -> LiveAgentState {
        let guard = self.entries.read().expect("FATAL: Live cache lock poisoned");

        match guard.get(&agent_id) {
            Some(entry) => {
                let fresh = entry
                    .updated_at
                    .map(|at| Utc::now() - at <= Duration::seconds(LIVENESS_WINDOW_SECONDS))
                    .unwrap_or(false);

                LiveAgentState {
                    agent_id,
                    connected: entry.streaming && fresh,
                    last_frame: entry.last_frame.clone(),
                    updated_at: entry.updated_at,
                    from_cache: false,
                }
            }
            None => LiveAgentState::offline(agent_id),
        }
    }
}
