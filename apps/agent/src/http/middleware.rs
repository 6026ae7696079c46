// [apps/agent/src/http/middleware.rs]
/*!
 * =================================================================
 * APARATO: AGENT API-KEY GUARD
 * CLASIFICACIÓN: SECURITY STRATUM (ESTRATO L4)
 * RESPONSABILIDAD: VALIDACIÓN DE CABECERA X-API-Key O QUERY apikey
 *
 * Sin API key configurada el agente opera en modo abierto.
 * =================================================================
 */

use crate::http::AgentState;
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
const API_KEY_QUERY: &str = "apikey";

pub async fn api_key_guard(
    State(state): State<AgentState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected_key) = state.config.api_key.as_deref() else {
        return next.run(request).await;
    };

    let header_candidate = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let query_candidate = request.uri().query().and_then(extract_apikey_parameter);

    let presented = header_candidate.or(query_candidate);

    match presented {
        Some(candidate) if candidate == expected_key => next.run(request).await,
        _ => {
            warn!("⛔ [AGENT_GUARD]: Request rejected on {}.", request.uri().path());
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

fn extract_apikey_parameter(query: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if key == API_KEY_QUERY {
            Some(value.to_string())
        } else {
            None
        }
    })
}
