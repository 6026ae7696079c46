// [apps/server/src/services/event_bus.rs]
/*!
 * =================================================================
 * APARATO: MONITOR EVENT BUS
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: DIFUSIÓN DE PULSOS DE PROGRESO EN TIEMPO REAL
 *
 * Emisión lock-free sobre un canal broadcast: la pérdida de un
 * suscriptor rezagado jamás afecta al emisor.
 * =================================================================
 */

use netronome_domain_models::{PacketLossProgress, SpeedUpdate};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

/// Capacidad del canal de difusión.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Señal publicada hacia los handlers de estado.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum MonitorEvent {
    PacketLossPulse(PacketLossProgress),
    SpeedPulse(SpeedUpdate),
}

#[derive(Debug, Clone)]
pub struct EventBus {
    internal_transmission_channel: broadcast::Sender<MonitorEvent>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            internal_transmission_channel: sender,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.internal_transmission_channel.subscribe()
    }

    pub fn publish_packet_loss_pulse(&self, pulse: PacketLossProgress) {
        self.dispatch(MonitorEvent::PacketLossPulse(pulse));
    }

    pub fn publish_speed_pulse(&self, pulse: SpeedUpdate) {
        self.dispatch(MonitorEvent::SpeedPulse(pulse));
    }

    fn dispatch(&self, event: MonitorEvent) {
        // send falla solo sin receptores; eso es un estado válido.
        let receiver_count = self.internal_transmission_channel.send(event).unwrap_or(0);
        trace!("📣 [EVENT_BUS]: Pulse dispatched to {} receivers.", receiver_count);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
