// [libs/infra/db/src/client.rs]
/*!
 * =================================================================
 * APARATO: DATABASE CONNECTION CLIENT
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: GESTIÓN DE ENLACES SQLITE Y APLICACIÓN DE ESQUEMA
 *
 * En modo ':memory:' el cliente mantiene una conexión ancla viva;
 * sin ella SQLite purga la base al cerrar la última conexión y el
 * esquema dejaría de ser visible entre tareas.
 * =================================================================
 */

use crate::errors::DbError;
use crate::schema::apply_schema;
use libsql::{Builder, Connection, Database};
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Clone)]
pub struct StorageClient {
    internal_database_driver: Arc<Database>,
    /// Mantiene viva la base en memoria evitando que SQLite la purgue.
    _memory_persistence_anchor: Option<Arc<Connection>>,
}

impl StorageClient {
    /// Abre (o crea) la base local y aplica el esquema idempotente.
    #[instrument(skip(database_path))]
    pub async fn connect(database_path: &str) -> Result<Self, DbError> {
        if database_path.is_empty() {
            return Err(DbError::ConfigurationError("DATABASE_PATH_UNDEFINED".into()));
        }

        info!("🔌 [DATABASE]: Opening SQLite store at [{}]", database_path);

        let is_memory =
            database_path.contains(":memory:") || database_path.contains("mode=memory");

        let database_driver = Builder::new_local(database_path)
            .build()
            .await
            .map_err(|e| DbError::ConnectionError(format!("DRIVER_IGNITION_FAILURE: {}", e)))?;

        let shared_driver = Arc::new(database_driver);
        let mut anchor = None;

        if is_memory {
            // El ancla se abre ANTES de cualquier otra operación y el esquema
            // se aplica sobre ella para que resida en el segmento compartido.
            let anchor_connection = shared_driver
                .connect()
                .map_err(|e| DbError::ConnectionError(format!("ANCHOR_FAULT: {}", e)))?;

            apply_schema(&anchor_connection).await?;
            anchor = Some(Arc::new(anchor_connection));
            info!("⚓ [DATABASE]: In-memory store solidified and anchored.");
        } else {
            let bootstrap_connection = shared_driver
                .connect()
                .map_err(|e| DbError::ConnectionError(format!("BOOTSTRAP_LINK_FAULT: {}", e)))?;
            apply_schema(&bootstrap_connection).await?;
        }

        Ok(Self {
            internal_database_driver: shared_driver,
            _memory_persistence_anchor: anchor,
        })
    }

    pub fn get_connection(&self) -> Result<Connection, DbError> {
        self.internal_database_driver
            .connect()
            .map_err(|e| DbError::ConnectionError(e.to_string()))
    }
}
