// [libs/infra/db/src/repositories/mod.rs]
/*!
 * =================================================================
 * APARATO: REPOSITORY REGISTRY
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: REGISTRO DE REPOSITORIOS Y AYUDAS DE MAPEO
 * =================================================================
 */

pub mod agents;
pub mod notifications;
pub mod packetloss;
pub mod schedules;
pub mod speedtest;
pub mod users;

pub use agents::AgentRepository;
pub use notifications::NotificationRepository;
pub use packetloss::PacketLossRepository;
pub use schedules::ScheduleRepository;
pub use speedtest::SpeedtestRepository;
pub use users::UserRepository;

use crate::errors::DbError;
use chrono::{DateTime, Utc};

/// Lee una columna TEXT RFC 3339 obligatoria como instante UTC.
pub(crate) fn read_timestamp(row: &libsql::Row, index: i32) -> Result<DateTime<Utc>, DbError> {
    let raw: String = row.get(index)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|fault| DbError::MappingError(format!("TIMESTAMP_DRIFT[{}]: {}", index, fault)))
}

/// Lee una columna TEXT RFC 3339 opcional.
pub(crate) fn read_optional_timestamp(
    row: &libsql::Row,
    index: i32,
) -> Result<Option<DateTime<Utc>>, DbError> {
    match row.get::<Option<String>>(index)? {
        Some(raw) => DateTime::parse_from_rfc3339(&raw)
            .map(|parsed| Some(parsed.with_timezone(&Utc)))
            .map_err(|fault| {
                DbError::MappingError(format!("TIMESTAMP_DRIFT[{}]: {}", index, fault))
            }),
        None => Ok(None),
    }
}

/// Lee una columna INTEGER como booleano.
pub(crate) fn read_flag(row: &libsql::Row, index: i32) -> Result<bool, DbError> {
    Ok(row.get::<i64>(index)? != 0)
}
