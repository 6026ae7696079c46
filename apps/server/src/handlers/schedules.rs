// [apps/server/src/handlers/schedules.rs]
/*!
 * =================================================================
 * APARATO: SCHEDULE HANDLERS
 * CLASIFICACIÓN: API HANDLER (ESTRATO L4)
 * RESPONSABILIDAD: CRUD DE FILAS DE PLANIFICACIÓN + START/STOP
 *
 * Cada mutación despierta al conductor para que recalcule su siesta.
 * =================================================================
 */

use crate::errors::ApiError;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use netronome_domain_models::{MonitorKind, Schedule, ScheduleDraft, TestOptions};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

/// Validación transversal de un draft de planificación.
fn validate_draft(draft: &ScheduleDraft) -> Result<(), ApiError> {
    if let Some(blob) = draft.options_blob.as_deref() {
        if draft.monitor_kind == MonitorKind::Speedtest
            && serde_json::from_str::<TestOptions>(blob).is_err()
        {
            return Err(ApiError::Validation("options_blob is not TestOptions".into()));
        }
    }

    if draft.monitor_kind == MonitorKind::Packetloss && draft.target_ref.parse::<i64>().is_err() {
        return Err(ApiError::Validation(
            "packetloss schedules require a numeric monitor id in target_ref".into(),
        ));
    }

    Ok(())
}

/// `GET /api/schedules`
#[instrument(skip(state))]
pub async fn handle_list(State(state): State<AppState>) -> Result<Json<Vec<Schedule>>, ApiError> {
    Ok(Json(state.schedule_repository.list().await?))
}

/// `POST /api/schedules`
#[instrument(skip(state, draft))]
pub async fn handle_create(
    State(state): State<AppState>,
    Json(draft): Json<ScheduleDraft>,
) -> Result<Json<Schedule>, ApiError> {
    validate_draft(&draft)?;

    let initial_next_run = state
        .scheduler
        .compute_next_run(&draft.interval_expr)
        .map_err(ApiError::Validation)?;

    let created = state
        .schedule_repository
        .create(&draft, initial_next_run)
        .await?;

    state.scheduler.wake_handle().notify_one();
    Ok(Json(created))
}

/// `GET /api/schedules/:id`
#[instrument(skip(state))]
pub async fn handle_fetch(
    State(state): State<AppState>,
    Path(schedule_id): Path<i64>,
) -> Result<Json<Schedule>, ApiError> {
    Ok(Json(state.schedule_repository.fetch(schedule_id).await?))
}

/// `PUT /api/schedules/:id`
#[instrument(skip(state, draft))]
pub async fn handle_update(
    State(state): State<AppState>,
    Path(schedule_id): Path<i64>,
    Json(draft): Json<ScheduleDraft>,
) -> Result<Json<Schedule>, ApiError> {
    validate_draft(&draft)?;

    let recomputed_next_run = state
        .scheduler
        .compute_next_run(&draft.interval_expr)
        .map_err(ApiError::Validation)?;

    let updated = state
        .schedule_repository
        .update(schedule_id, &draft, recomputed_next_run)
        .await?;

    state.scheduler.wake_handle().notify_one();
    Ok(Json(updated))
}

/// `DELETE /api/schedules/:id`
#[instrument(skip(state))]
pub async fn handle_delete(
    State(state): State<AppState>,
    Path(schedule_id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.schedule_repository.delete(schedule_id).await?;
    state.scheduler.wake_handle().notify_one();
    Ok(Json(json!({ "deleted": schedule_id })))
}

/// `POST /api/schedules/:id/start` — habilita y re-ancla el próximo disparo.
#[instrument(skip(state))]
pub async fn handle_start(
    State(state): State<AppState>,
    Path(schedule_id): Path<i64>,
) -> Result<Json<Schedule>, ApiError> {
    let row = state.schedule_repository.fetch(schedule_id).await?;

    let next_run = state
        .scheduler
        .compute_next_run(&row.interval_expr)
        .map_err(ApiError::Validation)?;

    state.schedule_repository.set_enabled(schedule_id, true).await?;
    state
        .schedule_repository
        .reset_next_run(schedule_id, next_run)
        .await?;

    state.scheduler.wake_handle().notify_one();
    Ok(Json(state.schedule_repository.fetch(schedule_id).await?))
}

/// `POST /api/schedules/:id/stop`
#[instrument(skip(state))]
pub async fn handle_stop(
    State(state): State<AppState>,
    Path(schedule_id): Path<i64>,
) -> Result<Json<Schedule>, ApiError> {
    state.schedule_repository.set_enabled(schedule_id, false).await?;
    state.scheduler.wake_handle().notify_one();
    Ok(Json(state.schedule_repository.fetch(schedule_id).await?))
}

/// `GET /api/schedules/:id/status`
#[instrument(skip(state))]
pub async fn handle_status(
    State(state): State<AppState>,
    Path(schedule_id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let row = state.schedule_repository.fetch(schedule_id).await?;
    Ok(Json(json!({
        "id": row.id,
        "enabled": row.enabled,
        "next_run": row.next_run,
        "last_run": row.last_run,
    })))
}

#[derive(Debug, Deserialize)]
pub struct HistorySelector {
    #[serde(default)]
    limit: Option<i64>,
}

/// `GET /api/schedules/:id/history` — últimos resultados planificados de
/// la familia del schedule.
#[instrument(skip(state, selector))]
pub async fn handle_history(
    State(state): State<AppState>,
    Path(schedule_id): Path<i64>,
    Query(selector): Query<HistorySelector>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let row = state.schedule_repository.fetch(schedule_id).await?;
    let limit = selector.limit.unwrap_or(50);

    match row.monitor_kind {
        MonitorKind::Speedtest => {
            let envelope = state.speedtest_repository.history(None, 1, limit).await?;
            let scheduled_only: Vec<_> = envelope
                .data
                .into_iter()
                .filter(|result| result.is_scheduled)
                .collect();
            Ok(Json(json!({ "data": scheduled_only })))
        }
        MonitorKind::Packetloss => {
            let monitor_id: i64 = row
                .target_ref
                .parse()
                .map_err(|_| ApiError::Validation("target_ref drifted".into()))?;
            let results = state
                .packetloss_repository
                .recent_results(monitor_id, limit)
                .await?;
            Ok(Json(json!({ "data": results })))
        }
    }
}
