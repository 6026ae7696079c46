// [libs/infra/db/src/repositories/notifications.rs]
/*!
 * =================================================================
 * APARATO: NOTIFICATION REPOSITORY
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: SELLADO DE SEÑALES DE ALERTA DE UMBRAL
 * =================================================================
 */

use crate::errors::DbError;
use crate::repositories::read_timestamp;
use crate::StorageClient;
use libsql::params;
use netronome_domain_notification::{NotificationEvent, NotificationSeverity};
use tracing::{info, instrument};

pub struct NotificationRepository {
    database_client: StorageClient,
}

impl NotificationRepository {
    #[must_use]
    pub fn new(database_client: StorageClient) -> Self {
        Self { database_client }
    }

    #[instrument(skip(self, event))]
    pub async fn append(&self, event: &NotificationEvent) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;

        let severity_label = serde_json::to_string(&event.severity)
            .map_err(|fault| DbError::MappingError(format!("SEVERITY_DRIFT: {}", fault)))?
            .trim_matches('"')
            .to_string();

        connection
            .execute(
                "INSERT INTO notifications (identifier, severity, category, title, body, metadata_json, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    event.identifier.clone(),
                    severity_label,
                    event.category.clone(),
                    event.title.clone(),
                    event.body.clone(),
                    event.metadata_json.clone(),
                    event.created_at.to_rfc3339()
                ],
            )
            .await?;

        info!("🔔 [NOTIFICATIONS]: Signal {} crystallized ({}).", event.identifier, event.category);
        Ok(())
    }

    pub async fn recent(&self, limit: i64) -> Result<Vec<NotificationEvent>, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT identifier, severity, category, title, body, metadata_json, created_at
                 FROM notifications ORDER BY created_at DESC LIMIT ?1",
                params![limit.clamp(1, 500)],
            )
            .await?;

        let mut collection = Vec::new();
        while let Some(row) = rows.next().await? {
            let severity_raw: String = row.get(1)?;
            let severity = match severity_raw.as_str() {
                "critical" => NotificationSeverity::Critical,
                "warning" => NotificationSeverity::Warning,
                _ => NotificationSeverity::Info,
            };

            collection.push(NotificationEvent {
                identifier: row.get(0)?,
                severity,
                category: row.get(2)?,
                title: row.get(3)?,
                body: row.get(4)?,
                metadata_json: row.get::<Option<String>>(5)?,
                created_at: read_timestamp(&row, 6)?,
            });
        }
        Ok(collection)
    }
}
