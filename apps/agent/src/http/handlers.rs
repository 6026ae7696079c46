// [apps/agent/src/http/handlers.rs]
/*!
 * =================================================================
 * APARATO: AGENT HTTP HANDLERS
 * CLASIFICACIÓN: API HANDLER (ESTRATO L4)
 * RESPONSABILIDAD: ENDPOINTS DE IDENTIDAD, STREAM E INSTANTÁNEAS
 * =================================================================
 */

use crate::hardware;
use crate::http::AgentState;
use crate::tailscale::TailscaleStatusDocument;
use crate::vnstat;
use crate::AGENT_VERSION;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::IntoResponse,
    Json,
};
use futures::stream::Stream;
use futures::StreamExt;
use netronome_domain_models::{AgentIdentity, ServiceDescriptor, AGENT_IDENTITY_TYPE};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::ReceiverStream;
use tracing::instrument;

/// `GET /` — descriptor del servicio y mapa de endpoints.
#[instrument(skip(state))]
pub async fn handle_service_descriptor(State(state): State<AgentState>) -> impl IntoResponse {
    let mut endpoints = BTreeMap::new();
    endpoints.insert("identity".to_string(), "/netronome/info".to_string());
    endpoints.insert("live_data".to_string(), "/events?stream=live-data".to_string());
    endpoints.insert("historical".to_string(), "/export/historical".to_string());
    endpoints.insert("system_info".to_string(), "/system/info".to_string());
    endpoints.insert("hardware".to_string(), "/system/hardware".to_string());
    endpoints.insert("peaks".to_string(), "/stats/peaks".to_string());
    endpoints.insert("tailscale".to_string(), "/tailscale/status".to_string());

    Json(ServiceDescriptor {
        service: "netronome-agent".to_string(),
        version: AGENT_VERSION.to_string(),
        port: state.config.port,
        endpoints,
        auth_mode: state.config.auth_mode_label().to_string(),
    })
}

/// `GET /netronome/info` — documento de identidad del descubrimiento.
#[instrument]
pub async fn handle_identity_document() -> impl IntoResponse {
    Json(AgentIdentity {
        kind: AGENT_IDENTITY_TYPE.to_string(),
        version: AGENT_VERSION.to_string(),
        hostname: sysinfo::System::host_name().unwrap_or_else(|| "unknown".to_string()),
    })
}

#[derive(Debug, Deserialize)]
pub struct StreamSelector {
    #[serde(default)]
    stream: Option<String>,
}

/// `GET /events?stream=live-data` — stream SSE de tramas en vivo.
///
/// La baja del suscriptor ocurre al soltarse el stream (desconexión);
/// el resguardo viaja dentro del propio stream.
#[instrument(skip(state, selector))]
pub async fn handle_live_events(
    State(state): State<AgentState>,
    Query(selector): Query<StreamSelector>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, impl IntoResponse> {
    if selector.stream.as_deref() != Some("live-data") {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "invalid-input",
                "message": "unknown stream selector"
            })),
        ));
    }

    let (subscriber_guard, receiver) = state.broadcaster.subscribe();

    let event_stream = ReceiverStream::new(receiver).map(move |frame| {
        // El resguardo vive mientras viva el stream del cliente.
        let _keepalive = &subscriber_guard;
        Ok(Event::default().data(frame))
    });

    Ok(Sse::new(event_stream)
        .keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("keep-alive")))
}

#[derive(Debug, Deserialize)]
pub struct HistoricalSelector {
    #[serde(default)]
    interface: Option<String>,
}

/// `GET /export/historical[?interface=…]` — volcado vnstat enriquecido.
#[instrument(skip(state, selector))]
pub async fn handle_historical_export(
    State(state): State<AgentState>,
    Query(selector): Query<HistoricalSelector>,
) -> impl IntoResponse {
    let interface = selector
        .interface
        .as_deref()
        .or(state.config.interface.as_deref());

    match vnstat::historical_export(interface).await {
        Ok(document) => (StatusCode::OK, Json(document)).into_response(),
        Err(fault) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({
                "error": "transient-io",
                "message": fault.to_string()
            })),
        )
            .into_response(),
    }
}

/// `GET /system/info` — identidad de sistema.
#[instrument(skip(_state))]
pub async fn handle_system_info(State(_state): State<AgentState>) -> impl IntoResponse {
    let vnstat_version = vnstat::vnstat_version().await;
    Json(hardware::collect_system_info(vnstat_version))
}

/// `GET /system/hardware` — instantánea de silicio.
#[instrument(skip(state))]
pub async fn handle_hardware_snapshot(State(state): State<AgentState>) -> impl IntoResponse {
    Json(hardware::collect_hardware(&state.disk_filter).await)
}

/// `GET /stats/peaks` — máximos de tasa con marcas de tiempo.
#[instrument(skip(state))]
pub async fn handle_peak_stats(State(state): State<AgentState>) -> impl IntoResponse {
    Json(state.peak_tracker.snapshot())
}

/// `GET /tailscale/status` — modo efectivo e identidad de malla.
#[instrument(skip(state))]
pub async fn handle_tailscale_status(State(state): State<AgentState>) -> impl IntoResponse {
    let guard = state.tailscale.lock().await;

    match guard.as_ref() {
        Some(runtime) => Json(runtime.status_document().await).into_response(),
        None => Json(TailscaleStatusDocument {
            enabled: false,
            method: "disabled".to_string(),
            hostname: None,
            self_ip: None,
            backend_state: None,
        })
        .into_response(),
    }
}
