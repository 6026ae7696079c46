// [libs/infra/db/src/repositories/agents.rs]
/*!
 * =================================================================
 * APARATO: MONITOR AGENT REPOSITORY
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: REGISTRO DE AGENTES, IDENTIDAD E INSTANTÁNEAS
 *
 * Propiedad: las filas de agentes las mutan el descubrimiento y la
 * capa de handlers; las instantáneas, solo el supervisor del agente.
 * =================================================================
 */

use crate::errors::DbError;
use crate::repositories::{read_flag, read_optional_timestamp, read_timestamp};
use crate::StorageClient;
use chrono::Utc;
use libsql::params;
use netronome_domain_models::{
    AgentHistoricalSnapshot, AgentInterface, AgentPeakStats, AgentResourceSnapshot,
    AgentSystemInfo, MonitorAgent, MonitorAgentDraft,
};
use tracing::{debug, info, instrument};

const AGENT_COLUMNS: &str =
    "id, name, url, api_key, enabled, interface, is_tailscale, tailscale_hostname, discovered_at, created_at, updated_at";

pub struct AgentRepository {
    database_client: StorageClient,
}

impl AgentRepository {
    #[must_use]
    pub fn new(database_client: StorageClient) -> Self {
        Self { database_client }
    }

    fn map_agent_row(row: &libsql::Row) -> Result<MonitorAgent, DbError> {
        Ok(MonitorAgent {
            id: row.get(0)?,
            name: row.get(1)?,
            url: row.get(2)?,
            api_key: row.get::<Option<String>>(3)?,
            enabled: read_flag(row, 4)?,
            interface: row.get::<Option<String>>(5)?,
            is_tailscale: read_flag(row, 6)?,
            tailscale_hostname: row.get::<Option<String>>(7)?,
            discovered_at: read_optional_timestamp(row, 8)?,
            created_at: read_timestamp(row, 9)?,
            updated_at: read_timestamp(row, 10)?,
        })
    }

    // --- ESTRATO DE REGISTRO ---

    #[instrument(skip(self, draft))]
    pub async fn create(&self, draft: &MonitorAgentDraft) -> Result<MonitorAgent, DbError> {
        let connection = self.database_client.get_connection()?;
        let now = Utc::now().to_rfc3339();

        connection
            .execute(
                "INSERT INTO monitor_agents (name, url, api_key, enabled, interface, is_tailscale, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?6)",
                params![
                    draft.name.clone(),
                    draft.url.clone(),
                    draft.api_key.clone(),
                    draft.enabled as i64,
                    draft.interface.clone(),
                    now
                ],
            )
            .await?;

        let mut rows = connection
            .query(
                &format!(
                    "SELECT {} FROM monitor_agents WHERE id = last_insert_rowid()",
                    AGENT_COLUMNS
                ),
                (),
            )
            .await?;

        match rows.next().await? {
            Some(row) => Self::map_agent_row(&row),
            None => Err(DbError::NotFound),
        }
    }

    pub async fn fetch(&self, agent_id: i64) -> Result<MonitorAgent, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                &format!("SELECT {} FROM monitor_agents WHERE id = ?1", AGENT_COLUMNS),
                params![agent_id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Self::map_agent_row(&row),
            None => Err(DbError::NotFound),
        }
    }

    pub async fn list(&self) -> Result<Vec<MonitorAgent>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                &format!("SELECT {} FROM monitor_agents ORDER BY id ASC", AGENT_COLUMNS),
                (),
            )
            .await?;

        let mut collection = Vec::new();
        while let Some(row) = rows.next().await? {
            collection.push(Self::map_agent_row(&row)?);
        }
        Ok(collection)
    }

    pub async fn list_enabled(&self) -> Result<Vec<MonitorAgent>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                &format!(
                    "SELECT {} FROM monitor_agents WHERE enabled = 1 ORDER BY id ASC",
                    AGENT_COLUMNS
                ),
                (),
            )
            .await?;

        let mut collection = Vec::new();
        while let Some(row) = rows.next().await? {
            collection.push(Self::map_agent_row(&row)?);
        }
        Ok(collection)
    }

    #[instrument(skip(self, draft))]
    pub async fn update(
        &self,
        agent_id: i64,
        draft: &MonitorAgentDraft,
    ) -> Result<MonitorAgent, DbError> {
        let connection = self.database_client.get_connection()?;
        let affected = connection
            .execute(
                "UPDATE monitor_agents
                 SET name = ?2, url = ?3, api_key = ?4, enabled = ?5, interface = ?6, updated_at = ?7
                 WHERE id = ?1",
                params![
                    agent_id,
                    draft.name.clone(),
                    draft.url.clone(),
                    draft.api_key.clone(),
                    draft.enabled as i64,
                    draft.interface.clone(),
                    Utc::now().to_rfc3339()
                ],
            )
            .await?;
        if affected == 0 {
            return Err(DbError::NotFound);
        }
        self.fetch(agent_id).await
    }

    pub async fn delete(&self, agent_id: i64) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        for purge_sql in [
            "DELETE FROM agent_system_info WHERE agent_id = ?1",
            "DELETE FROM agent_interfaces WHERE agent_id = ?1",
            "DELETE FROM agent_peak_stats WHERE agent_id = ?1",
            "DELETE FROM agent_resource_snapshots WHERE agent_id = ?1",
            "DELETE FROM agent_historical_snapshots WHERE agent_id = ?1",
        ] {
            connection.execute(purge_sql, params![agent_id]).await?;
        }

        let affected = connection
            .execute("DELETE FROM monitor_agents WHERE id = ?1", params![agent_id])
            .await?;
        if affected == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    pub async fn set_enabled(&self, agent_id: i64, enabled: bool) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        let affected = connection
            .execute(
                "UPDATE monitor_agents SET enabled = ?2, updated_at = ?3 WHERE id = ?1",
                params![agent_id, enabled as i64, Utc::now().to_rfc3339()],
            )
            .await?;
        if affected == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    /// Upsert idempotente del descubrimiento: si la URL ya existe, solo se
    /// actualizan los campos de identidad; el id permanece estable.
    #[instrument(skip(self))]
    pub async fn upsert_discovered(
        &self,
        name: &str,
        url: &str,
        tailscale_hostname: &str,
    ) -> Result<MonitorAgent, DbError> {
        let connection = self.database_client.get_connection()?;
        let now = Utc::now().to_rfc3339();

        let mut existing = connection
            .query(
                "SELECT id FROM monitor_agents WHERE url = ?1",
                params![url],
            )
            .await?;

        if let Some(row) = existing.next().await? {
            let agent_id: i64 = row.get(0)?;
            connection
                .execute(
                    "UPDATE monitor_agents
                     SET is_tailscale = 1, tailscale_hostname = ?2, updated_at = ?3
                     WHERE id = ?1",
                    params![agent_id, tailscale_hostname, now],
                )
                .await?;
            debug!("🛰️  [DISCOVERY]: Identity refreshed for agent {}.", agent_id);
            return self.fetch(agent_id).await;
        }

        connection
            .execute(
                "INSERT INTO monitor_agents (name, url, enabled, is_tailscale, tailscale_hostname, discovered_at, created_at, updated_at)
                 VALUES (?1, ?2, 1, 1, ?3, ?4, ?4, ?4)",
                params![name, url, tailscale_hostname, now],
            )
            .await?;

        let mut rows = connection
            .query(
                &format!(
                    "SELECT {} FROM monitor_agents WHERE id = last_insert_rowid()",
                    AGENT_COLUMNS
                ),
                (),
            )
            .await?;

        match rows.next().await? {
            Some(row) => {
                let agent = Self::map_agent_row(&row)?;
                info!("🛰️  [DISCOVERY]: New agent registered [{}] -> {}.", agent.name, agent.url);
                Ok(agent)
            }
            None => Err(DbError::NotFound),
        }
    }

    // --- ESTRATO DE INSTANTÁNEAS (escritor único: el supervisor) ---

    /// Upsert 1:1. `updated_at` solo avanza cuando el contenido cambió.
    #[instrument(skip(self, info))]
    pub async fn upsert_system_info(&self, info: &AgentSystemInfo) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;

        let mut existing = connection
            .query(
                "SELECT hostname, kernel, uptime_seconds, vnstat_version, cpu_model, cpu_cores, cpu_threads, total_memory_bytes
                 FROM agent_system_info WHERE agent_id = ?1",
                params![info.agent_id],
            )
            .await?;

        if let Some(row) = existing.next().await? {
            let unchanged = row.get::<String>(0)? == info.hostname
                && row.get::<String>(1)? == info.kernel
                && row.get::<i64>(2)? == info.uptime_seconds
                && row.get::<String>(3)? == info.vnstat_version
                && row.get::<String>(4)? == info.cpu_model
                && row.get::<i64>(5)? == info.cpu_cores
                && row.get::<i64>(6)? == info.cpu_threads
                && row.get::<i64>(7)? == info.total_memory_bytes;

            if unchanged {
                return Ok(());
            }

            connection
                .execute(
                    "UPDATE agent_system_info
                     SET hostname = ?2, kernel = ?3, uptime_seconds = ?4, vnstat_version = ?5,
                         cpu_model = ?6, cpu_cores = ?7, cpu_threads = ?8, total_memory_bytes = ?9,
                         updated_at = ?10
                     WHERE agent_id = ?1",
                    params![
                        info.agent_id,
                        info.hostname.clone(),
                        info.kernel.clone(),
                        info.uptime_seconds,
                        info.vnstat_version.clone(),
                        info.cpu_model.clone(),
                        info.cpu_cores,
                        info.cpu_threads,
                        info.total_memory_bytes,
                        Utc::now().to_rfc3339()
                    ],
                )
                .await?;
            return Ok(());
        }

        connection
            .execute(
                "INSERT INTO agent_system_info (agent_id, hostname, kernel, uptime_seconds, vnstat_version, cpu_model, cpu_cores, cpu_threads, total_memory_bytes, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    info.agent_id,
                    info.hostname.clone(),
                    info.kernel.clone(),
                    info.uptime_seconds,
                    info.vnstat_version.clone(),
                    info.cpu_model.clone(),
                    info.cpu_cores,
                    info.cpu_threads,
                    info.total_memory_bytes,
                    Utc::now().to_rfc3339()
                ],
            )
            .await?;
        Ok(())
    }

    pub async fn fetch_system_info(&self, agent_id: i64) -> Result<Option<AgentSystemInfo>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT agent_id, hostname, kernel, uptime_seconds, vnstat_version, cpu_model, cpu_cores, cpu_threads, total_memory_bytes
                 FROM agent_system_info WHERE agent_id = ?1",
                params![agent_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(AgentSystemInfo {
                agent_id: row.get(0)?,
                hostname: row.get(1)?,
                kernel: row.get(2)?,
                uptime_seconds: row.get(3)?,
                vnstat_version: row.get(4)?,
                cpu_model: row.get(5)?,
                cpu_cores: row.get(6)?,
                cpu_threads: row.get(7)?,
                total_memory_bytes: row.get(8)?,
            })),
            None => Ok(None),
        }
    }

    /// Reemplazo en bloque de las interfaces reportadas.
    #[instrument(skip(self, interfaces))]
    pub async fn replace_interfaces(
        &self,
        agent_id: i64,
        interfaces: &[AgentInterface],
    ) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;

        connection
            .execute(
                "DELETE FROM agent_interfaces WHERE agent_id = ?1",
                params![agent_id],
            )
            .await?;

        for interface in interfaces {
            connection
                .execute(
                    "INSERT INTO agent_interfaces (agent_id, name, alias, ipv4, link_speed_mbps, bytes_total)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        agent_id,
                        interface.name.clone(),
                        interface.alias.clone(),
                        interface.ipv4.clone(),
                        interface.link_speed_mbps,
                        interface.bytes_total
                    ],
                )
                .await?;
        }
        Ok(())
    }

    pub async fn list_interfaces(&self, agent_id: i64) -> Result<Vec<AgentInterface>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT agent_id, name, alias, ipv4, link_speed_mbps, bytes_total
                 FROM agent_interfaces WHERE agent_id = ?1 ORDER BY name ASC",
                params![agent_id],
            )
            .await?;

        let mut collection = Vec::new();
        while let Some(row) = rows.next().await? {
            collection.push(AgentInterface {
                agent_id: row.get(0)?,
                name: row.get(1)?,
                alias: row.get(2)?,
                ipv4: row.get(3)?,
                link_speed_mbps: row.get(4)?,
                bytes_total: row.get(5)?,
            });
        }
        Ok(collection)
    }

    /// Fusión monótona: los picos jamás retroceden, ni en reconexión.
    #[instrument(skip(self, incoming))]
    pub async fn merge_peak_stats(&self, incoming: &AgentPeakStats) -> Result<AgentPeakStats, DbError> {
        let connection = self.database_client.get_connection()?;

        let merged = match self.fetch_peak_stats(incoming.agent_id).await? {
            Some(current) => current.merged_with(incoming),
            None => incoming.clone(),
        };

        connection
            .execute(
                "INSERT INTO agent_peak_stats (agent_id, peak_rx_bps, peak_tx_bps, peak_rx_at, peak_tx_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(agent_id) DO UPDATE SET
                     peak_rx_bps = excluded.peak_rx_bps,
                     peak_tx_bps = excluded.peak_tx_bps,
                     peak_rx_at = excluded.peak_rx_at,
                     peak_tx_at = excluded.peak_tx_at",
                params![
                    merged.agent_id,
                    merged.peak_rx_bps,
                    merged.peak_tx_bps,
                    merged.peak_rx_at.to_rfc3339(),
                    merged.peak_tx_at.to_rfc3339()
                ],
            )
            .await?;

        Ok(merged)
    }

    pub async fn fetch_peak_stats(&self, agent_id: i64) -> Result<Option<AgentPeakStats>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT agent_id, peak_rx_bps, peak_tx_bps, peak_rx_at, peak_tx_at
                 FROM agent_peak_stats WHERE agent_id = ?1",
                params![agent_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(AgentPeakStats {
                agent_id: row.get(0)?,
                peak_rx_bps: row.get(1)?,
                peak_tx_bps: row.get(2)?,
                peak_rx_at: read_timestamp(&row, 3)?,
                peak_tx_at: read_timestamp(&row, 4)?,
            })),
            None => Ok(None),
        }
    }

    pub async fn append_resource_snapshot(
        &self,
        snapshot: &AgentResourceSnapshot,
    ) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "INSERT INTO agent_resource_snapshots (agent_id, cpu_pct, mem_pct, swap_pct, disks_blob, temps_blob, uptime_s, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    snapshot.agent_id,
                    snapshot.cpu_pct,
                    snapshot.mem_pct,
                    snapshot.swap_pct,
                    snapshot.disks_blob.clone(),
                    snapshot.temps_blob.clone(),
                    snapshot.uptime_s,
                    snapshot.created_at.to_rfc3339()
                ],
            )
            .await?;
        Ok(())
    }

    /// Última fila de recursos persistida: repliegue para agentes offline.
    pub async fn latest_resource_snapshot(
        &self,
        agent_id: i64,
    ) -> Result<Option<AgentResourceSnapshot>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT agent_id, cpu_pct, mem_pct, swap_pct, disks_blob, temps_blob, uptime_s, created_at
                 FROM agent_resource_snapshots WHERE agent_id = ?1
                 ORDER BY created_at DESC, id DESC LIMIT 1",
                params![agent_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(AgentResourceSnapshot {
                agent_id: row.get(0)?,
                cpu_pct: row.get(1)?,
                mem_pct: row.get(2)?,
                swap_pct: row.get(3)?,
                disks_blob: row.get(4)?,
                temps_blob: row.get(5)?,
                uptime_s: row.get(6)?,
                created_at: read_timestamp(&row, 7)?,
            })),
            None => Ok(None),
        }
    }

    /// Filas de recursos recientes, descendentes, para el historial.
    pub async fn recent_resource_snapshots(
        &self,
        agent_id: i64,
        limit: i64,
    ) -> Result<Vec<AgentResourceSnapshot>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT agent_id, cpu_pct, mem_pct, swap_pct, disks_blob, temps_blob, uptime_s, created_at
                 FROM agent_resource_snapshots WHERE agent_id = ?1
                 ORDER BY created_at DESC, id DESC LIMIT ?2",
                params![agent_id, limit.clamp(1, 1000)],
            )
            .await?;

        let mut collection = Vec::new();
        while let Some(row) = rows.next().await? {
            collection.push(AgentResourceSnapshot {
                agent_id: row.get(0)?,
                cpu_pct: row.get(1)?,
                mem_pct: row.get(2)?,
                swap_pct: row.get(3)?,
                disks_blob: row.get(4)?,
                temps_blob: row.get(5)?,
                uptime_s: row.get(6)?,
                created_at: read_timestamp(&row, 7)?,
            });
        }
        Ok(collection)
    }

    /// Conserva el volcado más reciente por (agente, interfaz, periodo).
    pub async fn upsert_historical_snapshot(
        &self,
        snapshot: &AgentHistoricalSnapshot,
    ) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        connection
            .execute(
                "INSERT INTO agent_historical_snapshots (agent_id, interface, period_type, data_blob, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(agent_id, interface, period_type) DO UPDATE SET
                     data_blob = excluded.data_blob,
                     created_at = excluded.created_at",
                params![
                    snapshot.agent_id,
                    snapshot.interface.clone(),
                    snapshot.period_type.as_str(),
                    snapshot.data_blob.clone(),
                    snapshot.created_at.to_rfc3339()
                ],
            )
            .await?;
        Ok(())
    }
}
