// [apps/server/src/middleware.rs]
//! =================================================================
//! APARATO: SERVER API-KEY GUARD
//! CLASIFICACIÓN: SECURITY STRATUM (ESTRATO L4)
//! RESPONSABILIDAD: PROTECCIÓN DE /api/** CON CLAVE ESTÁTICA
//!
//! Sesiones y OIDC quedan fuera de este núcleo; la clave estática es
//! el perímetro mínimo. Sin clave configurada la API queda abierta.
//! =================================================================

use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::warn;

const API_KEY_HEADER: &str = "x-api-key";

pub async fn api_key_guard(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected_key) = state.config.server.api_key.as_deref() else {
        return next.run(request).await;
    };

    let presented = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    match presented {
        Some(candidate) if candidate == expected_key => next.run(request).await,
        _ => {
            warn!("⛔ [API_GUARD]: Request rejected on {}.", request.uri().path());
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "unauthorized",
                    "message": "missing or invalid api key"
                })),
            )
                .into_response()
        }
    }
}
