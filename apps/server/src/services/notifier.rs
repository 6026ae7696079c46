// [apps/server/src/services/notifier.rs]
/*!
 * =================================================================
 * APARATO: NOTIFICATION DISPATCHER
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: ENTREGA BEST-EFFORT DE SEÑALES DE UMBRAL
 *
 * Contrato: `dispatch` jamás bloquea al motor emisor. Cola llena =>
 * la señal se pierde con un warn; el sumidero persiste y registra.
 * =================================================================
 */

use netronome_domain_notification::NotificationEvent;
use netronome_infra_db::repositories::NotificationRepository;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Profundidad de la cola de señales pendientes.
const SIGNAL_QUEUE_DEPTH: usize = 64;

#[derive(Clone)]
pub struct NotificationDispatcher {
    signal_sender: mpsc::Sender<NotificationEvent>,
    delivery_enabled: bool,
}

impl NotificationDispatcher {
    /// Levanta el sumidero y devuelve el despachador clonable.
    pub fn spawn(
        repository: Arc<NotificationRepository>,
        delivery_enabled: bool,
        mut shutdown: watch::Receiver<bool>,
    ) -> (Self, JoinHandle<()>) {
        let (signal_sender, mut signal_receiver) = mpsc::channel::<NotificationEvent>(SIGNAL_QUEUE_DEPTH);

        let sink_task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    maybe_event = signal_receiver.recv() => {
                        match maybe_event {
                            Some(event) => {
                                info!(
                                    "🔔 [NOTIFIER]: {} — {}",
                                    event.title, event.body
                                );
                                if let Err(fault) = repository.append(&event).await {
                                    warn!("🔔 [NOTIFIER]: Signal persistence failed: {}.", fault);
                                }
                            }
                            None => break,
                        }
                    }
                    _ = shutdown.changed() => break,
                }
            }
        });

        (
            Self {
                signal_sender,
                delivery_enabled,
            },
            sink_task,
        )
    }

    /// Encolado no bloqueante; descarta con warn si la cola está llena.
    pub fn dispatch(&self, event: NotificationEvent) {
        if !self.delivery_enabled {
            return;
        }

        if let Err(fault) = self.signal_sender.try_send(event) {
            warn!("🔔 [NOTIFIER]: Signal dropped (queue saturated): {}.", fault);
        }
    }
}
