// [libs/core/schedule/src/lib.rs]
/*!
 * =================================================================
 * APARATO: SCHEDULE CORE
 * CLASIFICACIÓN: CORE LOGIC (ESTRATO L1)
 * RESPONSABILIDAD: RELOJ, JITTER Y GRAMÁTICA DE EXPRESIONES
 * =================================================================
 */

pub mod clock;
pub mod expression;

pub use clock::{Clock, JitterSource, SystemClock, ThreadRngJitter};
pub use expression::{ScheduleError, ScheduleExpression};
