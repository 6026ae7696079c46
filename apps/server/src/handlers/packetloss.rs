// [apps/server/src/handlers/packetloss.rs]
/*!
 * =================================================================
 * APARATO: PACKET LOSS HANDLERS
 * CLASIFICACIÓN: API HANDLER (ESTRATO L4)
 * RESPONSABILIDAD: CRUD DE MONITORES + CONTROLES MANUALES
 *
 * Start/Stop solo mutan `enabled` (el planificador decide cuándo
 * disparar); Stop además cancela la ejecución en vuelo.
 * =================================================================
 */

use crate::errors::ApiError;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use netronome_domain_models::{PacketLossMonitor, PacketLossMonitorDraft, PacketLossResult};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

fn validate_draft(draft: &PacketLossMonitorDraft) -> Result<(), ApiError> {
    if draft.host.trim().is_empty() {
        return Err(ApiError::Validation("host must not be empty".into()));
    }
    if draft.packet_count < 1 {
        return Err(ApiError::Validation("packet_count must be >= 1".into()));
    }
    if !(0.0..=100.0).contains(&draft.threshold_percent) {
        return Err(ApiError::Validation(
            "threshold_percent must lie in [0, 100]".into(),
        ));
    }
    Ok(())
}

/// `GET /api/packetloss/monitors`
#[instrument(skip(state))]
pub async fn handle_list(
    State(state): State<AppState>,
) -> Result<Json<Vec<PacketLossMonitor>>, ApiError> {
    Ok(Json(state.packetloss_repository.list_monitors().await?))
}

/// `POST /api/packetloss/monitors`
#[instrument(skip(state, draft))]
pub async fn handle_create(
    State(state): State<AppState>,
    Json(draft): Json<PacketLossMonitorDraft>,
) -> Result<Json<PacketLossMonitor>, ApiError> {
    validate_draft(&draft)?;

    let initial_next_run = state
        .scheduler
        .compute_next_run(&draft.interval_expr)
        .map_err(ApiError::Validation)?;

    let created = state
        .packetloss_repository
        .create_monitor(&draft, initial_next_run)
        .await?;

    state.scheduler.wake_handle().notify_one();
    Ok(Json(created))
}

/// `GET /api/packetloss/monitors/:id`
#[instrument(skip(state))]
pub async fn handle_fetch(
    State(state): State<AppState>,
    Path(monitor_id): Path<i64>,
) -> Result<Json<PacketLossMonitor>, ApiError> {
    Ok(Json(
        state.packetloss_repository.fetch_monitor(monitor_id).await?,
    ))
}

/// `PUT /api/packetloss/monitors/:id`
#[instrument(skip(state, draft))]
pub async fn handle_update(
    State(state): State<AppState>,
    Path(monitor_id): Path<i64>,
    Json(draft): Json<PacketLossMonitorDraft>,
) -> Result<Json<PacketLossMonitor>, ApiError> {
    validate_draft(&draft)?;

    let recomputed_next_run = state
        .scheduler
        .compute_next_run(&draft.interval_expr)
        .map_err(ApiError::Validation)?;

    let updated = state
        .packetloss_repository
        .update_monitor(monitor_id, &draft, recomputed_next_run)
        .await?;

    state.scheduler.wake_handle().notify_one();
    Ok(Json(updated))
}

/// `DELETE /api/packetloss/monitors/:id`
#[instrument(skip(state))]
pub async fn handle_delete(
    State(state): State<AppState>,
    Path(monitor_id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.engine.cancel_run(monitor_id);
    state.packetloss_repository.delete_monitor(monitor_id).await?;
    state.scheduler.wake_handle().notify_one();
    Ok(Json(json!({ "deleted": monitor_id })))
}

/// `POST /api/packetloss/monitors/:id/start` — habilita y re-ancla.
#[instrument(skip(state))]
pub async fn handle_start(
    State(state): State<AppState>,
    Path(monitor_id): Path<i64>,
) -> Result<Json<PacketLossMonitor>, ApiError> {
    let monitor = state.packetloss_repository.fetch_monitor(monitor_id).await?;

    let next_run = state
        .scheduler
        .compute_next_run(&monitor.interval_expr)
        .map_err(ApiError::Validation)?;

    state
        .packetloss_repository
        .set_monitor_enabled(monitor_id, true)
        .await?;
    state
        .packetloss_repository
        .reset_next_run(monitor_id, next_run)
        .await?;

    state.scheduler.wake_handle().notify_one();
    Ok(Json(
        state.packetloss_repository.fetch_monitor(monitor_id).await?,
    ))
}

/// `POST /api/packetloss/monitors/:id/stop` — deshabilita y cancela.
#[instrument(skip(state))]
pub async fn handle_stop(
    State(state): State<AppState>,
    Path(monitor_id): Path<i64>,
) -> Result<Json<PacketLossMonitor>, ApiError> {
    state
        .packetloss_repository
        .set_monitor_enabled(monitor_id, false)
        .await?;

    if state.engine.cancel_run(monitor_id) {
        tracing::info!("🚦 [HANDLERS]: In-flight run of monitor {} cancelled.", monitor_id);
    }

    state.scheduler.wake_handle().notify_one();
    Ok(Json(
        state.packetloss_repository.fetch_monitor(monitor_id).await?,
    ))
}

/// `GET /api/packetloss/monitors/:id/status` — progreso en vuelo o el
/// último resumen sellado.
#[instrument(skip(state))]
pub async fn handle_status(
    State(state): State<AppState>,
    Path(monitor_id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let monitor = state.packetloss_repository.fetch_monitor(monitor_id).await?;

    if let Some(progress) = state.engine.in_flight_progress(monitor_id) {
        return Ok(Json(json!({
            "monitor_id": monitor_id,
            "enabled": monitor.enabled,
            "in_flight": true,
            "progress": progress,
        })));
    }

    let last_result = state.packetloss_repository.latest_result(monitor_id).await?;
    Ok(Json(json!({
        "monitor_id": monitor_id,
        "enabled": monitor.enabled,
        "in_flight": false,
        "last_result": last_result,
        "next_run": monitor.next_run,
        "last_run": monitor.last_run,
    })))
}

#[derive(Debug, Deserialize)]
pub struct HistorySelector {
    #[serde(default)]
    limit: Option<i64>,
}

/// `GET /api/packetloss/monitors/:id/history?limit=` — tope duro 1000.
#[instrument(skip(state, selector))]
pub async fn handle_history(
    State(state): State<AppState>,
    Path(monitor_id): Path<i64>,
    Query(selector): Query<HistorySelector>,
) -> Result<Json<Vec<PacketLossResult>>, ApiError> {
    // Verificación de existencia: 404 antes que lista vacía ambigua.
    state.packetloss_repository.fetch_monitor(monitor_id).await?;

    let limit = selector.limit.unwrap_or(100);
    Ok(Json(
        state
            .packetloss_repository
            .recent_results(monitor_id, limit)
            .await?,
    ))
}
