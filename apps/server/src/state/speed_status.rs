// [apps/server/src/state/speed_status.rs]
/*!
 * =================================================================
 * APARATO: SPEED STATUS CELL
 * CLASIFICACIÓN: APPLICATION STATE ATOM (ESTRATO L1-APP)
 * RESPONSABILIDAD: ÚLTIMA TRAMA DE PROGRESO DE PRUEBA DE VELOCIDAD
 *
 * Valor global de proceso: una única celda protegida por mutex que el
 * runner activo sobrescribe y los lectores copian. Se inicializa al
 * arrancar; no hay teardown.
 * =================================================================
 */

use netronome_domain_models::SpeedUpdate;
use std::sync::Mutex;

#[derive(Default)]
pub struct SpeedStatusCell {
    last_update: Mutex<Option<SpeedUpdate>>,
}

impl SpeedStatusCell {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sobrescritura por el runner activo.
    pub fn overwrite(&self, update: SpeedUpdate) {
        *self
            .last_update
            .lock()
            .expect("FATAL: Speed status lock poisoned") = Some(update);
    }

    /// Copia bajo el candado para los handlers.
    pub fn snapshot(&self) -> Option<SpeedUpdate> {
        self.last_update
            .lock()
            .expect("FATAL: Speed status lock poisoned")
            .clone()
    }
}
