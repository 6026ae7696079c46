// [libs/infra/db/src/repositories/users.rs]
/*!
 * =================================================================
 * APARATO: USER REPOSITORY
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: ALTA DE OPERADORES Y ROTACIÓN DE CREDENCIALES
 *
 * El hash llega ya derivado (PBKDF2) desde la capa de mando; este
 * repositorio jamás ve contraseñas en claro.
 * =================================================================
 */

use crate::errors::DbError;
use crate::StorageClient;
use chrono::Utc;
use libsql::params;
use tracing::{info, instrument};

pub struct UserRepository {
    database_client: StorageClient,
}

impl UserRepository {
    #[must_use]
    pub fn new(database_client: StorageClient) -> Self {
        Self { database_client }
    }

    #[instrument(skip(self, password_hash))]
    pub async fn create_user(&self, username: &str, password_hash: &str) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        let now = Utc::now().to_rfc3339();

        connection
            .execute(
                "INSERT INTO users (username, password_hash, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?3)",
                params![username, password_hash, now],
            )
            .await?;

        info!("👤 [USERS]: Operator [{}] registered.", username);
        Ok(())
    }

    #[instrument(skip(self, password_hash))]
    pub async fn update_password(&self, username: &str, password_hash: &str) -> Result<(), DbError> {
        let connection = self.database_client.get_connection()?;
        let affected = connection
            .execute(
                "UPDATE users SET password_hash = ?2, updated_at = ?3 WHERE username = ?1",
                params![username, password_hash, Utc::now().to_rfc3339()],
            )
            .await?;

        if affected == 0 {
            return Err(DbError::NotFound);
        }
        info!("🔑 [USERS]: Credentials rotated for [{}].", username);
        Ok(())
    }

    pub async fn fetch_password_hash(&self, username: &str) -> Result<String, DbError> {
        let connection = self.database_client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT password_hash FROM users WHERE username = ?1",
                params![username],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(row.get(0)?),
            None => Err(DbError::NotFound),
        }
    }
}
