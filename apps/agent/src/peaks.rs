// [apps/agent/src/peaks.rs]
/*!
 * =================================================================
 * APARATO: PEAK RATE TRACKER
 * CLASIFICACIÓN: APPLICATION STATE ATOM (ESTRATO L1-APP)
 * RESPONSABILIDAD: MÁXIMOS HISTÓRICOS DE TASA RX/TX
 *
 * Los picos son monótonos no-decrecientes durante la vida del proceso;
 * cada nuevo máximo registra su marca de tiempo.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use netronome_domain_models::MonitorLiveData;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Documento publicado en `GET /stats/peaks`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeakRates {
    pub peak_rx_bps: u64,
    pub peak_tx_bps: u64,
    pub peak_rx_at: DateTime<Utc>,
    pub peak_tx_at: DateTime<Utc>,
}

pub struct PeakTracker {
    internal_state: RwLock<PeakRates>,
}

impl PeakTracker {
    #[must_use]
    pub fn new() -> Self {
        let genesis = Utc::now();
        Self {
            internal_state: RwLock::new(PeakRates {
                peak_rx_bps: 0,
                peak_tx_bps: 0,
                peak_rx_at: genesis,
                peak_tx_at: genesis,
            }),
        }
    }

    /// Compara la trama contra los máximos vigentes y los eleva si procede.
    pub fn observe(&self, frame: &MonitorLiveData) {
        let now = Utc::now();
        let mut guard = self
            .internal_state
            .write()
            .expect("FATAL: Peak tracker lock poisoned");

        if frame.rx.bytespersecond > guard.peak_rx_bps {
            guard.peak_rx_bps = frame.rx.bytespersecond;
            guard.peak_rx_at = now;
        }
        if frame.tx.bytespersecond > guard.peak_tx_bps {
            guard.peak_tx_bps = frame.tx.bytespersecond;
            guard.peak_tx_at = now;
        }
    }

    /// Copia inmutable para los handlers.
    pub fn snapshot(&self) -> PeakRates {
        self.internal_state
            .read()
            .expect("FATAL: Peak tracker lock poisoned")
            .clone()
    }
}

impl Default for PeakTracker {
    fn default() -> Self {
        Self::new()
    }
}
