// [libs/domain/notification/src/lib.rs]
/*!
 * =================================================================
 * APARATO: THRESHOLD NOTIFICATION ENGINE
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: DEFINICIÓN DE SEÑALES DE ALERTA DE UMBRAL
 *
 * La entrega es best-effort: los productores publican con `try_send`
 * y jamás bloquean al motor que detectó la brecha.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use netronome_domain_models::{PacketLossMonitor, PacketLossResult, SpeedTestResult};
use serde::{Deserialize, Serialize};

/// Clasificación semántica de la urgencia de la señal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationSeverity {
    /// Información general de sistema o mantenimiento.
    Info,
    /// Brecha de umbral configurado.
    Warning,
    /// Fallo crítico de infraestructura.
    Critical,
}

/// Unidad atómica de comunicación dirigida al operador.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    /// Identificador único universal (UUID v4) del mensaje.
    pub identifier: String,
    pub severity: NotificationSeverity,
    /// Etiqueta corta de la categoría: packetloss | speedtest | system.
    pub category: String,
    pub title: String,
    pub body: String,
    /// Metadatos estructurados del evento (JSON).
    pub metadata_json: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NotificationEvent {
    /// Señal de brecha de pérdida de paquetes: el porcentaje medido superó
    /// el umbral del monitor.
    pub fn packet_loss_breach(monitor: &PacketLossMonitor, result: &PacketLossResult) -> Self {
        let mode_label = if result.used_mtr { "MTR" } else { "ICMP" };

        let mut body = format!(
            "{} ({}): {:.1}% packet loss over {} packets ({} received). RTT min/avg/max {:.1}/{:.1}/{:.1} ms. Mode: {}.",
            monitor.name,
            monitor.host,
            result.packet_loss_pct,
            result.packets_sent,
            result.packets_received,
            result.min_rtt_ms,
            result.avg_rtt_ms,
            result.max_rtt_ms,
            mode_label,
        );

        if let Some(hop_count) = result.hop_count {
            body.push_str(&format!(" Hops: {}.", hop_count));
        }

        let metadata = serde_json::json!({
            "monitor_id": monitor.id,
            "host": monitor.host,
            "threshold_percent": monitor.threshold_percent,
            "packet_loss_pct": result.packet_loss_pct,
            "used_mtr": result.used_mtr,
            "hop_count": result.hop_count,
        });

        Self {
            identifier: uuid::Uuid::new_v4().to_string(),
            severity: NotificationSeverity::Warning,
            category: "packetloss".to_string(),
            title: format!("Packet loss threshold breached on {}", monitor.name),
            body,
            metadata_json: serde_json::to_string(&metadata).ok(),
            created_at: Utc::now(),
        }
    }

    /// Señal de degradación de una prueba de velocidad respecto de los
    /// umbrales globales configurados.
    pub fn speedtest_alert(result: &SpeedTestResult, detail: &str) -> Self {
        let metadata = serde_json::json!({
            "server_name": result.server_name,
            "test_type": result.test_type,
            "ping_ms": result.ping_ms,
            "download_mbps": result.download_mbps,
            "upload_mbps": result.upload_mbps,
        });

        Self {
            identifier: uuid::Uuid::new_v4().to_string(),
            severity: NotificationSeverity::Warning,
            category: "speedtest".to_string(),
            title: format!("Speed test degraded: {}", result.server_name),
            body: detail.to_string(),
            metadata_json: serde_json::to_string(&metadata).ok(),
            created_at: Utc::now(),
        }
    }
}
