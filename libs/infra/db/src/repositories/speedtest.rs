// [libs/infra/db/src/repositories/speedtest.rs]
/*!
 * =================================================================
 * APARATO: SPEED TEST REPOSITORY
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA Y PAGINACIÓN DE RESULTADOS
 * =================================================================
 */

use crate::errors::DbError;
use crate::repositories::{read_flag, read_timestamp};
use crate::StorageClient;
use chrono::{DateTime, Utc};
use libsql::params;
use netronome_domain_models::{PaginatedResponse, SpeedTestResult};
use tracing::instrument;

const RESULT_COLUMNS: &str =
    "id, server_name, server_host, test_type, ping_ms, jitter_ms, download_mbps, upload_mbps, is_scheduled, error, created_at";

pub struct SpeedtestRepository {
    database_client: StorageClient,
}

impl SpeedtestRepository {
    #[must_use]
    pub fn new(database_client: StorageClient) -> Self {
        Self { database_client }
    }

    fn map_row(row: &libsql::Row) -> Result<SpeedTestResult, DbError> {
        Ok(SpeedTestResult {
            id: row.get(0)?,
            server_name: row.get(1)?,
            server_host: row.get::<Option<String>>(2)?,
            test_type: row.get(3)?,
            ping_ms: row.get(4)?,
            jitter_ms: row.get::<Option<f64>>(5)?,
            download_mbps: row.get(6)?,
            upload_mbps: row.get(7)?,
            is_scheduled: read_flag(row, 8)?,
            error: row.get::<Option<String>>(9)?,
            created_at: read_timestamp(row, 10)?,
        })
    }

    #[instrument(skip(self, result))]
    pub async fn insert_result(&self, result: &SpeedTestResult) -> Result<i64, DbError> {
        let connection = self.database_client.get_connection()?;

        connection
            .execute(
                "INSERT INTO speedtest_results (server_name, server_host, test_type, ping_ms, jitter_ms, download_mbps, upload_mbps, is_scheduled, error, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    result.server_name.clone(),
                    result.server_host.clone(),
                    result.test_type.clone(),
                    result.ping_ms,
                    result.jitter_ms,
                    result.download_mbps,
                    result.upload_mbps,
                    result.is_scheduled as i64,
                    result.error.clone(),
                    result.created_at.to_rfc3339()
                ],
            )
            .await?;

        let mut rows = connection.query("SELECT last_insert_rowid()", ()).await?;
        match rows.next().await? {
            Some(row) => Ok(row.get(0)?),
            None => Err(DbError::NotFound),
        }
    }

    /// Historial paginado, descendente, acotado por `cutoff` cuando aplica.
    pub async fn history(
        &self,
        cutoff: Option<DateTime<Utc>>,
        page: i64,
        limit: i64,
    ) -> Result<PaginatedResponse<SpeedTestResult>, DbError> {
        let connection = self.database_client.get_connection()?;
        let effective_limit = limit.clamp(1, 500);
        let effective_page = page.max(1);
        let offset = (effective_page - 1) * effective_limit;
        let cutoff_text = cutoff
            .map(|c| c.to_rfc3339())
            .unwrap_or_else(|| "1970-01-01T00:00:00+00:00".to_string());

        let mut count_rows = connection
            .query(
                "SELECT COUNT(*) FROM speedtest_results WHERE created_at >= ?1",
                params![cutoff_text.clone()],
            )
            .await?;
        let total: i64 = match count_rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };

        let mut rows = connection
            .query(
                &format!(
                    "SELECT {} FROM speedtest_results WHERE created_at >= ?1
                     ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3",
                    RESULT_COLUMNS
                ),
                params![cutoff_text, effective_limit, offset],
            )
            .await?;

        let mut data = Vec::new();
        while let Some(row) = rows.next().await? {
            data.push(Self::map_row(&row)?);
        }

        Ok(PaginatedResponse {
            data,
            page: effective_page,
            limit: effective_limit,
            total,
        })
    }

    pub async fn latest(&self) -> Result<Option<SpeedTestResult>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                &format!(
                    "SELECT {} FROM speedtest_results ORDER BY created_at DESC, id DESC LIMIT 1",
                    RESULT_COLUMNS
                ),
                (),
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(Self::map_row(&row)?)),
            None => Ok(None),
        }
    }
}
