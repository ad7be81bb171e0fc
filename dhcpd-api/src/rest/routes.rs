use axum::{Json, Router, middleware, routing::get};
use std::sync::Arc;
use utoipa::OpenApi;

use super::auth::require_basic_auth;
use super::handlers::{self, AppState};
use crate::lease::NetworkStats;

/// Path of the OpenAPI document.
pub const OPENAPI_PATH: &str = "/api/v1/dhcp/openapi.json";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "dhcpd API",
        version = "0.1.0",
        description = "Management API for DHCP leases, interface statistics, debug flags and per-MAC/per-network option overrides.",
        license(name = "MIT")
    ),
    tags(
        (name = "leases", description = "MAC/IP binding lookup and release"),
        (name = "stats", description = "Interface and network statistics"),
        (name = "debug", description = "Per-interface, per-role debug flags"),
        (name = "options", description = "Option overrides by MAC or network")
    ),
    paths(
        // Leases
        handlers::mac_to_ip,
        handlers::release_ip,
        handlers::ip_to_mac,
        // Stats
        handlers::all_stats,
        handlers::interface_network_stats,
        handlers::interface_stats,
        // Debug
        handlers::debug_flag,
        // Options
        handlers::set_network_override,
        handlers::clear_network_override,
        handlers::get_network_override,
        handlers::set_mac_override,
        handlers::clear_mac_override,
        handlers::get_mac_override,
    ),
    components(schemas(
        handlers::ApiError,
        handlers::Binding,
        handlers::Released,
        handlers::DebugFlag,
        handlers::OverrideRecord,
        handlers::OverrideCleared,
        NetworkStats,
    ))
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the router: basic-auth gate in front of the OpenAPI document and the
/// route table dispatcher.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(OPENAPI_PATH, get(openapi_json).fallback(handlers::dispatch))
        .fallback(handlers::dispatch)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_basic_auth,
        ))
        .with_state(state)
}
