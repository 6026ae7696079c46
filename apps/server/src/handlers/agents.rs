// [apps/server/src/handlers/agents.rs]
/*!
 * =================================================================
 * APARATO: MONITOR AGENT HANDLERS
 * CLASIFICACIÓN: API HANDLER (ESTRATO L4)
 * RESPONSABILIDAD: CRUD DE AGENTES, ESTADO VIVO E HISTORIAL
 *
 * Lectura de estado: cache vivo del supervisor; agente offline =>
 * repliegue a la última fila persistida con `from_cache: true`.
 * =================================================================
 */

use crate::errors::ApiError;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use netronome_domain_models::{MonitorAgent, MonitorAgentDraft};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

fn validate_draft(draft: &MonitorAgentDraft) -> Result<(), ApiError> {
    if draft.name.trim().is_empty() {
        return Err(ApiError::Validation("name must not be empty".into()));
    }
    if !draft.url.starts_with("http://") && !draft.url.starts_with("https://") {
        return Err(ApiError::Validation("url must be absolute http(s)".into()));
    }
    Ok(())
}

/// `GET /api/monitor/agents`
#[instrument(skip(state))]
pub async fn handle_list(
    State(state): State<AppState>,
) -> Result<Json<Vec<MonitorAgent>>, ApiError> {
    Ok(Json(state.agent_repository.list().await?))
}

/// `POST /api/monitor/agents`
#[instrument(skip(state, draft))]
pub async fn handle_create(
    State(state): State<AppState>,
    Json(draft): Json<MonitorAgentDraft>,
) -> Result<Json<MonitorAgent>, ApiError> {
    validate_draft(&draft)?;

    let created = state.agent_repository.create(&draft).await?;
    if created.enabled {
        state.fleet.start_agent(created.clone()).await;
    }
    Ok(Json(created))
}

/// `GET /api/monitor/agents/:id`
#[instrument(skip(state))]
pub async fn handle_fetch(
    State(state): State<AppState>,
    Path(agent_id): Path<i64>,
) -> Result<Json<MonitorAgent>, ApiError> {
    Ok(Json(state.agent_repository.fetch(agent_id).await?))
}

/// `PUT /api/monitor/agents/:id` — implica stop-then-start.
#[instrument(skip(state, draft))]
pub async fn handle_update(
    State(state): State<AppState>,
    Path(agent_id): Path<i64>,
    Json(draft): Json<MonitorAgentDraft>,
) -> Result<Json<MonitorAgent>, ApiError> {
    validate_draft(&draft)?;

    let updated = state.agent_repository.update(agent_id, &draft).await?;
    state.fleet.restart_agent(updated.clone()).await;
    Ok(Json(updated))
}

/// `DELETE /api/monitor/agents/:id`
#[instrument(skip(state))]
pub async fn handle_delete(
    State(state): State<AppState>,
    Path(agent_id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.fleet.forget_agent(agent_id).await;
    state.agent_repository.delete(agent_id).await?;
    Ok(Json(json!({ "deleted": agent_id })))
}

/// `POST /api/monitor/agents/:id/start` — idempotente.
#[instrument(skip(state))]
pub async fn handle_start(
    State(state): State<AppState>,
    Path(agent_id): Path<i64>,
) -> Result<Json<MonitorAgent>, ApiError> {
    state.agent_repository.set_enabled(agent_id, true).await?;
    let agent = state.agent_repository.fetch(agent_id).await?;
    state.fleet.start_agent(agent.clone()).await;
    Ok(Json(agent))
}

/// `POST /api/monitor/agents/:id/stop`
#[instrument(skip(state))]
pub async fn handle_stop(
    State(state): State<AppState>,
    Path(agent_id): Path<i64>,
) -> Result<Json<MonitorAgent>, ApiError> {
    state.agent_repository.set_enabled(agent_id, false).await?;
    state.fleet.stop_agent(agent_id).await;
    Ok(Json(state.agent_repository.fetch(agent_id).await?))
}

/// `GET /api/monitor/agents/:id/status` — estado vivo + identidad + picos.
#[instrument(skip(state))]
pub async fn handle_status(
    State(state): State<AppState>,
    Path(agent_id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    // 404 si el agente no existe.
    state.agent_repository.fetch(agent_id).await?;

    let mut live = state.live_cache.snapshot(agent_id);
    let system_info = state.agent_repository.fetch_system_info(agent_id).await?;
    let peaks = state.agent_repository.fetch_peak_stats(agent_id).await?;

    // Agente fuera de línea: repliegue a la última fila persistida.
    let resource_snapshot = if live.connected {
        None
    } else {
        live.from_cache = true;
        state
            .agent_repository
            .latest_resource_snapshot(agent_id)
            .await?
    };

    let from_cache = live.from_cache;
    Ok(Json(json!({
        "live": live,
        "from_cache": from_cache,
        "system_info": system_info,
        "peak_stats": peaks,
        "cached_resources": resource_snapshot,
    })))
}

#[derive(Debug, Deserialize)]
pub struct HistorySelector {
    #[serde(default)]
    limit: Option<i64>,
}

/// `GET /api/monitor/agents/:id/history?limit=` — filas de recursos.
#[instrument(skip(state, selector))]
pub async fn handle_history(
    State(state): State<AppState>,
    Path(agent_id): Path<i64>,
    Query(selector): Query<HistorySelector>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.agent_repository.fetch(agent_id).await?;

    let limit = selector.limit.unwrap_or(100);
    let snapshots = state
        .agent_repository
        .recent_resource_snapshots(agent_id, limit)
        .await?;
    let interfaces = state.agent_repository.list_interfaces(agent_id).await?;

    Ok(Json(json!({
        "resource_snapshots": snapshots,
        "interfaces": interfaces,
    })))
}
