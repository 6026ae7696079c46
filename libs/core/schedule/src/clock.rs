// [libs/core/schedule/src/clock.rs]
/*!
 * =================================================================
 * APARATO: CLOCK & JITTER SOURCE
 * CLASIFICACIÓN: CORE LOGIC (ESTRATO L1)
 * RESPONSABILIDAD: "AHORA" INYECTABLE Y JITTER UNIFORME ANTI-ESTAMPIDA
 * =================================================================
 */

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

/// Jitter de expresiones de duración: segundos enteros uniformes en [1, 300].
const DURATION_JITTER_MAX_SECONDS: i64 = 300;

/// Jitter de expresiones de hora exacta: segundos enteros uniformes en [1, 60].
const EXACT_JITTER_MAX_SECONDS: i64 = 60;

/// Fuente de tiempo inyectable. Los tests sustituyen la implementación
/// de sistema por relojes congelados.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Reloj de sistema (UTC).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fuente de retardo aleatorio añadido a cada próximo disparo calculado.
/// Desincroniza monitores gemelos para impedir la estampida simultánea.
pub trait JitterSource: Send + Sync {
    /// Segundos enteros uniformes en [1, 300].
    fn duration_jitter(&self) -> Duration;

    /// Segundos enteros uniformes en [1, 60].
    fn exact_jitter(&self) -> Duration;
}

/// Implementación sobre el PRNG del hilo (no criptográfico, sembrado
/// desde entropía del sistema; el determinismo no es un requisito).
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngJitter;

impl JitterSource for ThreadRngJitter {
    fn duration_jitter(&self) -> Duration {
        Duration::seconds(rand::thread_rng().gen_range(1..=DURATION_JITTER_MAX_SECONDS))
    }

    fn exact_jitter(&self) -> Duration {
        Duration::seconds(rand::thread_rng().gen_range(1..=EXACT_JITTER_MAX_SECONDS))
    }
}
