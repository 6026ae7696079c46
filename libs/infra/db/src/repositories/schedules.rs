// [libs/infra/db/src/repositories/schedules.rs]
/*!
 * =================================================================
 * APARATO: SCHEDULE REPOSITORY
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA DE FILAS DE PLANIFICACIÓN
 *
 * Las columnas next_run/last_run tienen un único escritor (el
 * planificador); los lectores pueden observar valores rezagados.
 * =================================================================
 */

use crate::errors::DbError;
use crate::repositories::{read_flag, read_optional_timestamp, read_timestamp};
use crate::StorageClient;
use chrono::{DateTime, Utc};
use libsql::params;
use netronome_domain_models::{MonitorKind, Schedule, ScheduleDraft};
use tracing::{debug, instrument};

const SCHEDULE_COLUMNS: &str =
    "id, monitor_kind, target_ref, interval_expr, enabled, next_run, last_run, options_blob, created_at, updated_at";

pub struct ScheduleRepository {
    database_client: StorageClient,
}

impl ScheduleRepository {
    #[must_use]
    pub fn new(database_client: StorageClient) -> Self {
        Self { database_client }
    }

    fn map_row(row: &libsql::Row) -> Result<Schedule, DbError> {
        let kind_raw: String = row.get(1)?;
        let monitor_kind = MonitorKind::from_str_tolerant(&kind_raw)
            .ok_or_else(|| DbError::MappingError(format!("UNKNOWN_MONITOR_KIND: {}", kind_raw)))?;

        Ok(Schedule {
            id: row.get(0)?,
            monitor_kind,
            target_ref: row.get(2)?,
            interval_expr: row.get(3)?,
            enabled: read_flag(row, 4)?,
            next_run: read_timestamp(row, 5)?,
            last_run: read_optional_timestamp(row, 6)?,
            options_blob: row.get::<Option<String>>(7)?,
            created_at: read_timestamp(row, 8)?,
            updated_at: read_timestamp(row, 9)?,
        })
    }

    /// Alta de una fila; el llamante provee el next_run inicial ya jittered.
    #[instrument(skip(self, draft))]
    pub async fn create(
        &self,
        draft: &ScheduleDraft,
        initial_next_run: DateTime<Utc>,
    ) -> Result<Schedule, DbError> {
        let connection = self.database_client.get_connection()?;
        let now = Utc::now().to_rfc3339();

        connection
            .execute(
                "INSERT INTO schedules (monitor_kind, target_ref, interval_expr, enabled, next_run, options_blob, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                params![
                    draft.monitor_kind.as_str(),
                    draft.target_ref.clone(),
                    draft.interval_expr.clone(),
                    draft.enabled as i64,
                    initial_next_run.to_rfc3339(),
                    draft.options_blob.clone(),
                    now
                ],
            )
            .await?;

        let mut rows = connection
            .query(
                &format!(
                    "SELECT {} FROM schedules WHERE id = last_insert_rowid()",
                    SCHEDULE_COLUMNS
                ),
                (),
            )
            .await?;

        match rows.next().await? {
            Some(row) => Self::map_row(&row),
            None => Err(DbError::NotFound),
        }
    }

    pub async fn fetch(&self, schedule_id: i64) -> Result<Schedule, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                &format!("SELECT {} FROM schedules WHERE id = ?1", SCHEDULE_COLUMNS),
                params![schedule_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Self::map_row(&row),
            None => Err(DbError::NotFound),
        }
    }

    pub async fn list(&self) -> Result<Vec<Schedule>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                &format!("SELECT {} FROM schedules ORDER BY id ASC", SCHEDULE_COLUMNS),
                (),
            )
            .await?;

        let mut collection = Vec::new();
        while let Some(row) = rows.next().await? {
            collection.push(Self::map_row(&row)?);
        }
        Ok(collection)
    }

    /// Filas candidatas del bucle conductor, ordenadas por (next_run, id).
    pub async fn list_enabled(&self) -> Result<Vec<Schedule>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                &format!(
                    "SELECT {} FROM schedules WHERE enabled = 1 ORDER BY next_run ASC, id ASC",
                    SCHEDULE_COLUMNS
                ),
                (),
            )
            .await?;

        let mut collection = Vec::new();
        while let Some(row) = rows.next().await? {
            collection.push(Self::map_row(&row)?);
        }
        Ok(collection)
    }

    #[instrument(skip(self, draft))]
    pub async fn update(
        &self,
        schedule_id: i64,
        draft: &ScheduleDraft,
        recomputed_next_run: DateTime<Utc>,
    ) -> Result<Schedule, DbError> {
        let connection = self.database_client.get_connection()?;

        let affected = connection
            .execute(
                "UPDATE schedules
                 SET monitor_kind = ?2, target_ref = ?3, interval_expr = ?4, enabled = ?5,
                     next_run = ?6, options_blob = ?7, updated_at = ?8
                 WHERE id = ?1",
                params![
                    schedule_id,
                    draft.monitor_kind.as_str(),
                    draft.target_ref.clone(),
                    draft.interval_expr.clone(),
                    draft.enabled as i64,
                    recomputed_next_run.to_rfc3339(),
                    draft.options_blob.clone(),
                    Utc::now().to_rfc3339()
                ],
            )
            .await?;

        if affected == 0 {
            return Err(DbError::NotFound);
        }
        self.fetch(schedule_id).await
    }

    pub async fn delete(&self, schedule_id: i64) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        let affected = connection
            .execute("DELETE FROM schedules WHERE id = ?1", params![schedule_id])
            .await?;
        if affected == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    pub async fn set_enabled(&self, schedule_id: i64, enabled: bool) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        let affected = connection
            .execute(
                "UPDATE schedules SET enabled = ?2, updated_at = ?3 WHERE id = ?1",
                params![schedule_id, enabled as i64, Utc::now().to_rfc3339()],
            )
            .await?;
        if affected == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    /// Recalculo de arranque: descarta disparos perdidos sin replay.
    #[instrument(skip(self))]
    pub async fn reset_next_run(
        &self,
        schedule_id: i64,
        next_run: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "UPDATE schedules SET next_run = ?2 WHERE id = ?1",
                params![schedule_id, next_run.to_rfc3339()],
            )
            .await?;
        debug!("🗓️  [SCHEDULES]: next_run reset for row {}.", schedule_id);
        Ok(())
    }

    /// Sellado de un disparo: last_run y el próximo next_run en una pasada.
    /// Solo procede si la fila sigue habilitada (disciplina single-writer).
    pub async fn commit_dispatch(
        &self,
        schedule_id: i64,
        fired_at: DateTime<Utc>,
        next_run: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        let connection = self.database_client.get_connection()?;
        let affected = connection
            .execute(
                "UPDATE schedules SET last_run = ?2, next_run = ?3 WHERE id = ?1 AND enabled = 1",
                params![schedule_id, fired_at.to_rfc3339(), next_run.to_rfc3339()],
            )
            .await?;
        Ok(affected > 0)
    }
}
