// [libs/infra/db/src/repositories/packetloss.rs]
/*!
 * =================================================================
 * APARATO: PACKET LOSS REPOSITORY
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA DE MONITORES ICMP/MTR Y RESULTADOS
 * =================================================================
 */

use crate::errors::DbError;
use crate::repositories::{read_flag, read_optional_timestamp, read_timestamp};
use crate::StorageClient;
use chrono::{DateTime, Utc};
use libsql::params;
use netronome_domain_models::{PacketLossMonitor, PacketLossMonitorDraft, PacketLossResult};
use tracing::{debug, instrument};

/// Tope duro del historial servido por la API.
const HISTORY_LIMIT_CEILING: i64 = 1000;

const MONITOR_COLUMNS: &str =
    "id, host, name, interval_expr, packet_count, threshold_percent, enabled, next_run, last_run, created_at, updated_at";

const RESULT_COLUMNS: &str =
    "id, monitor_id, started_at, packet_loss_pct, min_rtt_ms, avg_rtt_ms, max_rtt_ms, stddev_rtt_ms, packets_sent, packets_received, used_mtr, hop_count, mtr_blob, created_at";

pub struct PacketLossRepository {
    database_client: StorageClient,
}

impl PacketLossRepository {
    #[must_use]
    pub fn new(database_client: StorageClient) -> Self {
        Self { database_client }
    }

    fn map_monitor_row(row: &libsql::Row) -> Result<PacketLossMonitor, DbError> {
        Ok(PacketLossMonitor {
            id: row.get(0)?,
            host: row.get(1)?,
            name: row.get(2)?,
            interval_expr: row.get(3)?,
            packet_count: row.get(4)?,
            threshold_percent: row.get(5)?,
            enabled: read_flag(row, 6)?,
            next_run: read_timestamp(row, 7)?,
            last_run: read_optional_timestamp(row, 8)?,
            created_at: read_timestamp(row, 9)?,
            updated_at: read_timestamp(row, 10)?,
        })
    }

    fn map_result_row(row: &libsql::Row) -> Result<PacketLossResult, DbError> {
        Ok(PacketLossResult {
            id: row.get(0)?,
            monitor_id: row.get(1)?,
            started_at: read_timestamp(row, 2)?,
            packet_loss_pct: row.get(3)?,
            min_rtt_ms: row.get(4)?,
            avg_rtt_ms: row.get(5)?,
            max_rtt_ms: row.get(6)?,
            stddev_rtt_ms: row.get::<Option<f64>>(7)?,
            packets_sent: row.get(8)?,
            packets_received: row.get(9)?,
            used_mtr: read_flag(row, 10)?,
            hop_count: row.get::<Option<i64>>(11)?,
            mtr_blob: row.get::<Option<String>>(12)?,
            created_at: read_timestamp(row, 13)?,
        })
    }

    // --- ESTRATO DE MONITORES ---

    #[instrument(skip(self, draft))]
    pub async fn create_monitor(
        &self,
        draft: &PacketLossMonitorDraft,
        initial_next_run: DateTime<Utc>,
    ) -> Result<PacketLossMonitor, DbError> {
        let connection = self.database_client.get_connection()?;
        let now = Utc::now().to_rfc3339();

        let monitor_name = if draft.name.trim().is_empty() {
            draft.host.clone()
        } else {
            draft.name.clone()
        };

        connection
            .execute(
                "INSERT INTO packetloss_monitors (host, name, interval_expr, packet_count, threshold_percent, enabled, next_run, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                params![
                    draft.host.clone(),
                    monitor_name,
                    draft.interval_expr.clone(),
                    draft.packet_count,
                    draft.threshold_percent,
                    draft.enabled as i64,
                    initial_next_run.to_rfc3339(),
                    now
                ],
            )
            .await?;

        let mut rows = connection
            .query(
                &format!(
                    "SELECT {} FROM packetloss_monitors WHERE id = last_insert_rowid()",
                    MONITOR_COLUMNS
                ),
                (),
            )
            .await?;

        match rows.next().await? {
            Some(row) => Self::map_monitor_row(&row),
            None => Err(DbError::NotFound),
        }
    }

    pub async fn fetch_monitor(&self, monitor_id: i64) -> Result<PacketLossMonitor, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                &format!(
                    "SELECT {} FROM packetloss_monitors WHERE id = ?1",
                    MONITOR_COLUMNS
                ),
                params![monitor_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Self::map_monitor_row(&row),
            None => Err(DbError::NotFound),
        }
    }

    pub async fn list_monitors(&self) -> Result<Vec<PacketLossMonitor>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                &format!(
                    "SELECT {} FROM packetloss_monitors ORDER BY id ASC",
                    MONITOR_COLUMNS
                ),
                (),
            )
            .await?;

        let mut collection = Vec::new();
        while let Some(row) = rows.next().await? {
            collection.push(Self::map_monitor_row(&row)?);
        }
        Ok(collection)
    }

    pub async fn list_enabled_monitors(&self) -> Result<Vec<PacketLossMonitor>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                &format!(
                    "SELECT {} FROM packetloss_monitors WHERE enabled = 1 ORDER BY next_run ASC, id ASC",
                    MONITOR_COLUMNS
                ),
                (),
            )
            .await?;

        let mut collection = Vec::new();
        while let Some(row) = rows.next().await? {
            collection.push(Self::map_monitor_row(&row)?);
        }
        Ok(collection)
    }

    #[instrument(skip(self, draft))]
    pub async fn update_monitor(
        &self,
        monitor_id: i64,
        draft: &PacketLossMonitorDraft,
        recomputed_next_run: DateTime<Utc>,
    ) -> Result<PacketLossMonitor, DbError> {
        let connection = self.database_client.get_connection()?;

        let affected = connection
            .execute(
                "UPDATE packetloss_monitors
                 SET host = ?2, name = ?3, interval_expr = ?4, packet_count = ?5,
                     threshold_percent = ?6, enabled = ?7, next_run = ?8, updated_at = ?9
                 WHERE id = ?1",
                params![
                    monitor_id,
                    draft.host.clone(),
                    draft.name.clone(),
                    draft.interval_expr.clone(),
                    draft.packet_count,
                    draft.threshold_percent,
                    draft.enabled as i64,
                    recomputed_next_run.to_rfc3339(),
                    Utc::now().to_rfc3339()
                ],
            )
            .await?;

        if affected == 0 {
            return Err(DbError::NotFound);
        }
        self.fetch_monitor(monitor_id).await
    }

    /// Baja del monitor y de todo su historial.
    pub async fn delete_monitor(&self, monitor_id: i64) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "DELETE FROM packetloss_results WHERE monitor_id = ?1",
                params![monitor_id],
            )
            .await?;
        let affected = connection
            .execute(
                "DELETE FROM packetloss_monitors WHERE id = ?1",
                params![monitor_id],
            )
            .await?;
        if affected == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    pub async fn set_monitor_enabled(&self, monitor_id: i64, enabled: bool) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        let affected = connection
            .execute(
                "UPDATE packetloss_monitors SET enabled = ?2, updated_at = ?3 WHERE id = ?1",
                params![monitor_id, enabled as i64, Utc::now().to_rfc3339()],
            )
            .await?;
        if affected == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    /// Recalculo de arranque: descarta disparos perdidos sin replay.
    pub async fn reset_next_run(
        &self,
        monitor_id: i64,
        next_run: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "UPDATE packetloss_monitors SET next_run = ?2 WHERE id = ?1",
                params![monitor_id, next_run.to_rfc3339()],
            )
            .await?;
        debug!("🗓️  [PACKETLOSS]: next_run reset for monitor {}.", monitor_id);
        Ok(())
    }

    pub async fn commit_dispatch(
        &self,
        monitor_id: i64,
        fired_at: DateTime<Utc>,
        next_run: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        let connection = self.database_client.get_connection()?;
        let affected = connection
            .execute(
                "UPDATE packetloss_monitors SET last_run = ?2, next_run = ?3 WHERE id = ?1 AND enabled = 1",
                params![monitor_id, fired_at.to_rfc3339(), next_run.to_rfc3339()],
            )
            .await?;
        Ok(affected > 0)
    }

    // --- ESTRATO DE RESULTADOS ---

    #[instrument(skip(self, result))]
    pub async fn insert_result(&self, result: &PacketLossResult) -> Result<i64, DbError> {
        let connection = self.database_client.get_connection()?;

        connection
            .execute(
                "INSERT INTO packetloss_results (monitor_id, started_at, packet_loss_pct, min_rtt_ms, avg_rtt_ms, max_rtt_ms, stddev_rtt_ms, packets_sent, packets_received, used_mtr, hop_count, mtr_blob, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    result.monitor_id,
                    result.started_at.to_rfc3339(),
                    result.packet_loss_pct,
                    result.min_rtt_ms,
                    result.avg_rtt_ms,
                    result.max_rtt_ms,
                    result.stddev_rtt_ms,
                    result.packets_sent,
                    result.packets_received,
                    result.used_mtr as i64,
                    result.hop_count,
                    result.mtr_blob.clone(),
                    result.created_at.to_rfc3339()
                ],
            )
            .await?;

        let mut rows = connection
            .query("SELECT last_insert_rowid()", ())
            .await?;
        match rows.next().await? {
            Some(row) => Ok(row.get(0)?),
            None => Err(DbError::NotFound),
        }
    }

    /// Resultados recientes en orden descendente; `limit` acotado a 1000.
    pub async fn recent_results(
        &self,
        monitor_id: i64,
        limit: i64,
    ) -> Result<Vec<PacketLossResult>, DbError> {
        let connection = self.database_client.get_connection()?;
        let effective_limit = limit.clamp(1, HISTORY_LIMIT_CEILING);

        let mut rows = connection
            .query(
                &format!(
                    "SELECT {} FROM packetloss_results WHERE monitor_id = ?1 ORDER BY created_at DESC, id DESC LIMIT ?2",
                    RESULT_COLUMNS
                ),
                params![monitor_id, effective_limit],
            )
            .await?;

        let mut collection = Vec::new();
        while let Some(row) = rows.next().await? {
            collection.push(Self::map_result_row(&row)?);
        }
        Ok(collection)
    }

    /// Último resultado sellado (resumen para el estado del monitor).
    pub async fn latest_result(
        &self,
        monitor_id: i64,
    ) -> Result<Option<PacketLossResult>, DbError> {
        Ok(self.recent_results(monitor_id, 1).await?.into_iter().next())
    }
}
