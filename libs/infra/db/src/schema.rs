// [libs/infra/db/src/schema.rs]
/*!
 * =================================================================
 * APARATO: NETRONOME DATABASE SCHEMA
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: GOBERNANZA ESTRUCTURAL E IDEMPOTENCIA TOTAL
 *
 * Propiedad de columnas: el planificador es el único escritor de
 * next_run/last_run; cada supervisor de agente es el único escritor
 * de sus filas de instantáneas.
 * =================================================================
 */

use crate::errors::DbError;
use libsql::Connection;
use tracing::{debug, instrument};

/// ESTRATO 1: Génesis de tablas.
const CORE_TABLES: &[(&str, &str)] = &[
    ("TABLE_SCHEDULES", r#"
        CREATE TABLE IF NOT EXISTS schedules (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            monitor_kind TEXT NOT NULL,
            target_ref TEXT NOT NULL DEFAULT '',
            interval_expr TEXT NOT NULL,
            enabled INTEGER NOT NULL DEFAULT 1,
            next_run TEXT NOT NULL,
            last_run TEXT,
            options_blob TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
    "#),
    ("TABLE_PACKETLOSS_MONITORS", r#"
        CREATE TABLE IF NOT EXISTS packetloss_monitors (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            host TEXT NOT NULL,
            name TEXT NOT NULL DEFAULT '',
            interval_expr TEXT NOT NULL,
            packet_count INTEGER NOT NULL,
            threshold_percent REAL NOT NULL,
            enabled INTEGER NOT NULL DEFAULT 1,
            next_run TEXT NOT NULL,
            last_run TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
    "#),
    ("TABLE_PACKETLOSS_RESULTS", r#"
        CREATE TABLE IF NOT EXISTS packetloss_results (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            monitor_id INTEGER NOT NULL,
            started_at TEXT NOT NULL,
            packet_loss_pct REAL NOT NULL,
            min_rtt_ms REAL NOT NULL DEFAULT 0,
            avg_rtt_ms REAL NOT NULL DEFAULT 0,
            max_rtt_ms REAL NOT NULL DEFAULT 0,
            stddev_rtt_ms REAL,
            packets_sent INTEGER NOT NULL,
            packets_received INTEGER NOT NULL,
            used_mtr INTEGER NOT NULL DEFAULT 0,
            hop_count INTEGER,
            mtr_blob TEXT,
            created_at TEXT NOT NULL
        );
    "#),
    ("TABLE_SPEEDTEST_RESULTS", r#"
        CREATE TABLE IF NOT EXISTS speedtest_results (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            server_name TEXT NOT NULL,
            server_host TEXT,
            test_type TEXT NOT NULL,
            ping_ms REAL NOT NULL DEFAULT 0,
            jitter_ms REAL,
            download_mbps REAL NOT NULL DEFAULT 0,
            upload_mbps REAL NOT NULL DEFAULT 0,
            is_scheduled INTEGER NOT NULL DEFAULT 0,
            error TEXT,
            created_at TEXT NOT NULL
        );
    "#),
    ("TABLE_MONITOR_AGENTS", r#"
        CREATE TABLE IF NOT EXISTS monitor_agents (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            url TEXT NOT NULL UNIQUE,
            api_key TEXT,
            enabled INTEGER NOT NULL DEFAULT 1,
            interface TEXT,
            is_tailscale INTEGER NOT NULL DEFAULT 0,
            tailscale_hostname TEXT,
            discovered_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
    "#),
    ("TABLE_AGENT_SYSTEM_INFO", r#"
        CREATE TABLE IF NOT EXISTS agent_system_info (
            agent_id INTEGER PRIMARY KEY,
            hostname TEXT NOT NULL,
            kernel TEXT NOT NULL,
            uptime_seconds INTEGER NOT NULL,
            vnstat_version TEXT NOT NULL,
            cpu_model TEXT NOT NULL,
            cpu_cores INTEGER NOT NULL,
            cpu_threads INTEGER NOT NULL,
            total_memory_bytes INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        );
    "#),
    ("TABLE_AGENT_INTERFACES", r#"
        CREATE TABLE IF NOT EXISTS agent_interfaces (
            agent_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            alias TEXT NOT NULL DEFAULT '',
            ipv4 TEXT NOT NULL DEFAULT '',
            link_speed_mbps INTEGER NOT NULL DEFAULT -1,
            bytes_total INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (agent_id, name)
        );
    "#),
    ("TABLE_AGENT_PEAK_STATS", r#"
        CREATE TABLE IF NOT EXISTS agent_peak_stats (
            agent_id INTEGER PRIMARY KEY,
            peak_rx_bps INTEGER NOT NULL DEFAULT 0,
            peak_tx_bps INTEGER NOT NULL DEFAULT 0,
            peak_rx_at TEXT NOT NULL,
            peak_tx_at TEXT NOT NULL
        );
    "#),
    ("TABLE_AGENT_RESOURCE_SNAPSHOTS", r#"
        CREATE TABLE IF NOT EXISTS agent_resource_snapshots (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            agent_id INTEGER NOT NULL,
            cpu_pct REAL NOT NULL,
            mem_pct REAL NOT NULL,
            swap_pct REAL NOT NULL,
            disks_blob TEXT NOT NULL,
            temps_blob TEXT NOT NULL,
            uptime_s INTEGER NOT NULL,
            created_at TEXT NOT NULL
        );
    "#),
    ("TABLE_AGENT_HISTORICAL_SNAPSHOTS", r#"
        CREATE TABLE IF NOT EXISTS agent_historical_snapshots (
            agent_id INTEGER NOT NULL,
            interface TEXT NOT NULL,
            period_type TEXT NOT NULL,
            data_blob TEXT NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (agent_id, interface, period_type)
        );
    "#),
    ("TABLE_USERS", r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
    "#),
    ("TABLE_NOTIFICATIONS", r#"
        CREATE TABLE IF NOT EXISTS notifications (
            identifier TEXT PRIMARY KEY,
            severity TEXT NOT NULL,
            category TEXT NOT NULL,
            title TEXT NOT NULL,
            body TEXT NOT NULL,
            metadata_json TEXT,
            created_at TEXT NOT NULL
        );
    "#),
];

/// ESTRATO 2: Índices de aceleración de las rutas calientes.
const ACCELERATION_INDICES: &[(&str, &str)] = &[
    ("IDX_SCHEDULES_DUE", "CREATE INDEX IF NOT EXISTS idx_schedules_due ON schedules (enabled, next_run, id);"),
    ("IDX_PLMON_DUE", "CREATE INDEX IF NOT EXISTS idx_plmon_due ON packetloss_monitors (enabled, next_run, id);"),
    ("IDX_PLRES_HISTORY", "CREATE INDEX IF NOT EXISTS idx_plres_history ON packetloss_results (monitor_id, created_at DESC);"),
    ("IDX_SPEED_HISTORY", "CREATE INDEX IF NOT EXISTS idx_speed_history ON speedtest_results (created_at DESC);"),
    ("IDX_AGENT_SNAPSHOTS", "CREATE INDEX IF NOT EXISTS idx_agent_snapshots ON agent_resource_snapshots (agent_id, created_at DESC);"),
];

/// Aplica el esquema completo. Idempotente: seguro en cada arranque.
#[instrument(skip(connection))]
pub async fn apply_schema(connection: &Connection) -> Result<(), DbError> {
    for (table_label, table_ddl) in CORE_TABLES {
        connection.execute(table_ddl, ()).await?;
        debug!("🏗️  [SCHEMA]: {} verified.", table_label);
    }

    for (index_label, index_ddl) in ACCELERATION_INDICES {
        connection.execute(index_ddl, ()).await?;
        debug!("🏗️  [SCHEMA]: {} verified.", index_label);
    }

    Ok(())
}
