// [apps/agent/src/http/mod.rs]
/*!
 * =================================================================
 * APARATO: AGENT HTTP SURFACE
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: MATRIZ DE RUTAS DEL AGENTE Y ESTADO COMPARTIDO
 * =================================================================
 */

pub mod handlers;
pub mod middleware;

use crate::broadcaster::LiveBroadcaster;
use crate::config::AgentConfig;
use crate::disks::DiskFilter;
use crate::peaks::PeakTracker;
use crate::tailscale::TailscaleRuntime;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

/// Estado compartido del agente (thread-safe, clonable por handler).
#[derive(Clone)]
pub struct AgentState {
    pub config: Arc<AgentConfig>,
    pub peak_tracker: Arc<PeakTracker>,
    pub broadcaster: Arc<LiveBroadcaster>,
    pub disk_filter: Arc<DiskFilter>,
    /// Runtime de malla; None cuando Tailscale está deshabilitado.
    pub tailscale: Arc<tokio::sync::Mutex<Option<TailscaleRuntime>>>,
}

/// Construye la matriz de rutas: descriptor e identidad abiertos; el
/// resto tras el guardia de API key.
pub fn create_agent_router(state: AgentState) -> Router {
    let network_security_shield = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET])
        .allow_headers([axum::http::header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    let open_stratum = Router::new()
        .route("/", get(handlers::handle_service_descriptor))
        .route("/netronome/info", get(handlers::handle_identity_document));

    let guarded_stratum = Router::new()
        .route("/events", get(handlers::handle_live_events))
        .route("/export/historical", get(handlers::handle_historical_export))
        .route("/system/info", get(handlers::handle_system_info))
        .route("/system/hardware", get(handlers::handle_hardware_snapshot))
        .route("/stats/peaks", get(handlers::handle_peak_stats))
        .route("/tailscale/status", get(handlers::handle_tailscale_status))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::api_key_guard,
        ));

    open_stratum
        .merge(guarded_stratum)
        .layer(network_security_shield)
        .with_state(state)
}
