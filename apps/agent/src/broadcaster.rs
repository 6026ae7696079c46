// [apps/agent/src/broadcaster.rs]
/*!
 * =================================================================
 * APARATO: LIVE DATA BROADCASTER
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: DIFUSIÓN SIN BLOQUEO A N SUSCRIPTORES SSE
 *
 * Contrato de backpressure: el fan-out es estrictamente no bloqueante.
 * Buffer lleno en un suscriptor => la trama se pierde SOLO para ese
 * suscriptor. Cada trama es una instantánea completa, no un delta,
 * así que los huecos son aceptables.
 * =================================================================
 */

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, trace};

/// Capacidad del buffer de cada suscriptor.
const SUBSCRIBER_BUFFER_CAPACITY: usize = 100;

pub struct LiveBroadcaster {
    /// Conjunto mutable de suscriptores; escritor único para altas/bajas.
    subscribers: Mutex<HashMap<u64, mpsc::Sender<String>>>,
    next_subscriber_identifier: AtomicU64,
}

/// Resguardo de suscripción: la baja ocurre al soltarlo (desconexión SSE).
pub struct SubscriberGuard {
    broadcaster: Arc<LiveBroadcaster>,
    subscriber_identifier: u64,
}

impl Drop for SubscriberGuard {
    fn drop(&mut self) {
        self.broadcaster.unsubscribe(self.subscriber_identifier);
    }
}

impl LiveBroadcaster {
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            next_subscriber_identifier: AtomicU64::new(1),
        }
    }

    /// Alta de un suscriptor. El canal devuelto se cierra tras la baja.
    pub fn subscribe(self: &Arc<Self>) -> (SubscriberGuard, mpsc::Receiver<String>) {
        let (sender, receiver) = mpsc::channel(SUBSCRIBER_BUFFER_CAPACITY);
        let subscriber_identifier = self.next_subscriber_identifier.fetch_add(1, Ordering::Relaxed);

        self.subscribers
            .lock()
            .expect("FATAL: Broadcaster registry lock poisoned")
            .insert(subscriber_identifier, sender);

        debug!("📻 [BROADCASTER]: Subscriber {} attached.", subscriber_identifier);

        let guard = SubscriberGuard {
            broadcaster: Arc::clone(self),
            subscriber_identifier,
        };
        (guard, receiver)
    }

    fn unsubscribe(&self, subscriber_identifier: u64) {
        let removed = self
            .subscribers
            .lock()
            .expect("FATAL: Broadcaster registry lock poisoned")
            .remove(&subscriber_identifier);

        if removed.is_some() {
            debug!("📻 [BROADCASTER]: Subscriber {} detached.", subscriber_identifier);
        }
    }

    /// Fan-out de una trama. `try_send` en cada canal: lleno => se descarta
    /// la trama para ese suscriptor; cerrado => baja inmediata.
    fn fan_out(&self, frame: &str) {
        let mut severed_subscribers = Vec::new();

        {
            let registry = self
                .subscribers
                .lock()
                .expect("FATAL: Broadcaster registry lock poisoned");

            for (subscriber_identifier, sender) in registry.iter() {
                match sender.try_send(frame.to_string()) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        trace!(
                            "📻 [BROADCASTER]: Frame dropped for slow subscriber {}.",
                            subscriber_identifier
                        );
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        severed_subscribers.push(*subscriber_identifier);
                    }
                }
            }
        }

        for subscriber_identifier in severed_subscribers {
            self.unsubscribe(subscriber_identifier);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .expect("FATAL: Broadcaster registry lock poisoned")
            .len()
    }

    /// Bucle único de drenaje del canal de ingreso del tailer.
    pub async fn run(
        self: Arc<Self>,
        mut ingress: mpsc::Receiver<String>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!("📻 [BROADCASTER]: Fan-out loop online.");

        loop {
            tokio::select! {
                maybe_frame = ingress.recv() => {
                    match maybe_frame {
                        Some(frame) => self.fan_out(&frame),
                        None => break,
                    }
                }
                _ = shutdown.changed() => break,
            }
        }

        // Vaciar el registro suelta los senders y cierra cada canal.
        self.subscribers
            .lock()
            .expect("FATAL: Broadcaster registry lock poisoned")
            .clear();

        info!("📻 [BROADCASTER]: Fan-out loop drained and closed.");
    }
}

impl Default for LiveBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
