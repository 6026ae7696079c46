// [apps/server/src/handlers/speedtest.rs]
/*!
 * =================================================================
 * APARATO: SPEED TEST HANDLERS
 * CLASIFICACIÓN: API HANDLER (ESTRATO L4)
 * RESPONSABILIDAD: EJECUCIÓN MANUAL, ESTADO E HISTORIAL
 * =================================================================
 */

use crate::errors::ApiError;
use crate::services::speedtest::SpeedTestError;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use netronome_domain_models::{TestOptions, TimeRange};
use serde::Deserialize;
use tracing::instrument;

/// `POST /api/speedtest` — ejecuta una prueba y devuelve el resultado.
#[instrument(skip(state, options))]
pub async fn handle_run_speed_test(
    State(state): State<AppState>,
    Json(options): Json<TestOptions>,
) -> Result<Json<netronome_domain_models::SpeedTestResult>, ApiError> {
    if options.use_iperf && options.server_host.as_deref().unwrap_or("").is_empty() {
        return Err(ApiError::Validation(
            "iperf runs require serverHost".to_string(),
        ));
    }

    match state.speedtest.run(options, false).await {
        Ok(result) => Ok(Json(result)),
        Err(SpeedTestError::Execution(message)) => Err(ApiError::TransientIo(message)),
    }
}

/// `GET /api/speedtest/status` — última trama de progreso conocida.
#[instrument(skip(state))]
pub async fn handle_speed_status(State(state): State<AppState>) -> Json<serde_json::Value> {
    match state.speed_status.snapshot() {
        Some(update) => Json(serde_json::to_value(update).unwrap_or(serde_json::Value::Null)),
        None => Json(serde_json::Value::Null),
    }
}

#[derive(Debug, Deserialize)]
pub struct HistorySelector {
    #[serde(rename = "timeRange", default)]
    time_range: Option<String>,
    #[serde(default)]
    page: Option<i64>,
    #[serde(default)]
    limit: Option<i64>,
}

/// `GET /api/speedtest/history?timeRange=&page=&limit=`
#[instrument(skip(state, selector))]
pub async fn handle_speed_history(
    State(state): State<AppState>,
    Query(selector): Query<HistorySelector>,
) -> Result<Json<netronome_domain_models::PaginatedResponse<netronome_domain_models::SpeedTestResult>>, ApiError>
{
    let range_label = selector.time_range.as_deref().unwrap_or("all");
    let range = TimeRange::parse(range_label)
        .ok_or_else(|| ApiError::Validation(format!("unknown timeRange '{}'", range_label)))?;

    let page = selector.page.unwrap_or(1);
    let limit = selector.limit.unwrap_or(20);

    let envelope = state
        .speedtest_repository
        .history(range.cutoff(Utc::now()), page, limit)
        .await?;

    Ok(Json(envelope))
}
