// [apps/server/src/routes.rs]
/*!
 * =================================================================
 * APARATO: SERVER ROUTING MATRIX
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L3)
 * RESPONSABILIDAD: TOPOLOGÍA /api DE PRUEBAS, MONITORES Y AGENTES
 * =================================================================
 */

use crate::handlers::{agents, packetloss, schedules, speedtest};
use crate::middleware::api_key_guard;
use crate::state::AppState;
use axum::{
    http::{header, Method},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::json;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

pub fn create_server_router(application_shared_state: AppState) -> Router {
    let network_security_shield = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    // ESTRATO DE PRUEBAS DE VELOCIDAD
    let speedtest_stratum = Router::new()
        .route("/", post(speedtest::handle_run_speed_test))
        .route("/status", get(speedtest::handle_speed_status))
        .route("/history", get(speedtest::handle_speed_history));

    // ESTRATO DE PLANIFICACIÓN
    let schedules_stratum = Router::new()
        .route("/", get(schedules::handle_list).post(schedules::handle_create))
        .route("/:id", get(schedules::handle_fetch))
        .route("/:id", put(schedules::handle_update))
        .route("/:id", delete(schedules::handle_delete))
        .route("/:id/status", get(schedules::handle_status))
        .route("/:id/history", get(schedules::handle_history))
        .route("/:id/start", post(schedules::handle_start))
        .route("/:id/stop", post(schedules::handle_stop));

    // ESTRATO DE PÉRDIDA DE PAQUETES
    let packetloss_stratum = Router::new()
        .route("/", get(packetloss::handle_list).post(packetloss::handle_create))
        .route("/:id", get(packetloss::handle_fetch))
        .route("/:id", put(packetloss::handle_update))
        .route("/:id", delete(packetloss::handle_delete))
        .route("/:id/status", get(packetloss::handle_status))
        .route("/:id/history", get(packetloss::handle_history))
        .route("/:id/start", post(packetloss::handle_start))
        .route("/:id/stop", post(packetloss::handle_stop));

    // ESTRATO DE AGENTES
    let agents_stratum = Router::new()
        .route("/", get(agents::handle_list).post(agents::handle_create))
        .route("/:id", get(agents::handle_fetch))
        .route("/:id", put(agents::handle_update))
        .route("/:id", delete(agents::handle_delete))
        .route("/:id/status", get(agents::handle_status))
        .route("/:id/history", get(agents::handle_history))
        .route("/:id/start", post(agents::handle_start))
        .route("/:id/stop", post(agents::handle_stop));

    let api_stratum = Router::new()
        .nest("/speedtest", speedtest_stratum)
        .nest("/schedules", schedules_stratum)
        .nest("/packetloss/monitors", packetloss_stratum)
        .nest("/monitor/agents", agents_stratum)
        .route_layer(axum::middleware::from_fn_with_state(
            application_shared_state.clone(),
            api_key_guard,
        ));

    Router::new()
        .route("/health", get(|| async { Json(json!({ "status": "ok" })) }))
        .nest("/api", api_stratum)
        .layer(network_security_shield)
        .with_state(application_shared_state)
}
