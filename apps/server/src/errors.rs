// [apps/server/src/errors.rs]
/*!
 * =================================================================
 * APARATO: API ERROR TRANSLATION
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: TAXONOMÍA DE FALLOS -> JSON {error, message}
 * =================================================================
 */

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use netronome_infra_db::DbError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Entrada malformada: expresión inválida, host vacío, conteo negativo.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Identificador desconocido.
    #[error("not found")]
    NotFound,

    /// Tope de admisión alcanzado; el llamante puede reintentar luego.
    #[error("engine busy")]
    Busy,

    /// Fallo de enlace con agentes o subprocesos.
    #[error("transient io: {0}")]
    TransientIo(String),

    /// Fallo interno no clasificado.
    #[error("internal: {0}")]
    Internal(String),
}

impl ApiError {
    fn status_and_label(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "invalid-input"),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "not-found"),
            ApiError::Busy => (StatusCode::CONFLICT, "busy"),
            ApiError::TransientIo(_) => (StatusCode::BAD_GATEWAY, "transient-io"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "fatal"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, label) = self.status_and_label();
        (
            status,
            Json(json!({
                "error": label,
                "message": self.to_string(),
            })),
        )
            .into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(fault: DbError) -> Self {
        match fault {
            DbError::NotFound => ApiError::NotFound,
            other => ApiError::Internal(other.to_string()),
        }
    }
}
