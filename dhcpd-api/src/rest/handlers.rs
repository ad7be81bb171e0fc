use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error};
use utoipa::ToSchema;

use super::auth::Credentials;
use super::dispatch::{Endpoint, PathParams, RouteError, RouteTable};
use crate::audit::AuditLogger;
use crate::lease::{EngineError, LeaseEngine, NetworkStats};
use crate::params::{InterfaceName, Ipv4Param, MacAddr, RoleName};
use crate::store::{KeyValueStore, OverrideScope, StoreError};

/// Shared application state
pub struct AppState {
    pub store: Arc<dyn KeyValueStore>,
    pub engine: Arc<dyn LeaseEngine>,
    pub audit: Arc<AuditLogger>,
    pub credentials: Credentials,
    pub routes: RouteTable,
}

impl AppState {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        engine: Arc<dyn LeaseEngine>,
        audit: Arc<AuditLogger>,
        credentials: Credentials,
    ) -> Result<Self, RouteError> {
        Ok(Self {
            store,
            engine,
            audit,
            credentials,
            routes: RouteTable::dhcp_api()?,
        })
    }
}

/// API error response
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiError {
    pub error: String,
    pub code: u32,
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            code: 404,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            code: 400,
        }
    }

    pub fn unauthorized() -> Self {
        Self {
            error: "Unauthorized".to_string(),
            code: 401,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.code {
            400 => StatusCode::BAD_REQUEST,
            401 => StatusCode::UNAUTHORIZED,
            404 => StatusCode::NOT_FOUND,
            503 => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InvalidKey(_) | StoreError::InvalidValue(_) => {
                ApiError::bad_request(e.to_string())
            }
            StoreError::DuplicateKey { .. } | StoreError::Database(_) => {
                // Internal details stay in the log.
                error!(error = %e, "Store operation failed");
                ApiError {
                    error: "Internal storage error".to_string(),
                    code: 500,
                }
            }
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        error!(error = %e, "Lease engine query failed");
        ApiError {
            error: "Lease engine unavailable".to_string(),
            code: 503,
        }
    }
}

/// Parse a captured parameter. The dispatcher already checked its shape, so
/// a failure here is treated like a non-matching route.
fn param<T: FromStr>(params: &PathParams, name: &str) -> Result<T, ApiError> {
    params
        .get(name)
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| ApiError::not_found("Not found"))
}

fn mac_scope(params: &PathParams) -> Result<OverrideScope, ApiError> {
    Ok(OverrideScope::Mac(param(params, "mac")?))
}

fn network_scope(params: &PathParams) -> Result<OverrideScope, ApiError> {
    Ok(OverrideScope::Network(param(params, "network")?))
}

/// Route a request through the table and run the bound handler.
pub async fn dispatch(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    let Some((endpoint, params)) = state.routes.resolve(&method, uri.path()) else {
        debug!(%method, path = uri.path(), "No route matched");
        return ApiError::not_found("Not found").into_response();
    };

    let state = state.as_ref();
    let result = match endpoint {
        Endpoint::MacToIp => mac_to_ip(state, &params).await.map(IntoResponse::into_response),
        Endpoint::ReleaseIp => release_ip(state, &params).await.map(IntoResponse::into_response),
        Endpoint::IpToMac => ip_to_mac(state, &params).await.map(IntoResponse::into_response),
        Endpoint::AllStats => all_stats(state).await.map(IntoResponse::into_response),
        Endpoint::InterfaceNetworkStats => interface_network_stats(state, &params)
            .await
            .map(IntoResponse::into_response),
        Endpoint::InterfaceStats => interface_stats(state, &params)
            .await
            .map(IntoResponse::into_response),
        Endpoint::Debug => debug_flag(state, &params).await.map(IntoResponse::into_response),
        Endpoint::SetNetworkOverride => set_network_override(state, &params, body)
            .await
            .map(IntoResponse::into_response),
        Endpoint::ClearNetworkOverride => clear_network_override(state, &params)
            .await
            .map(IntoResponse::into_response),
        Endpoint::GetNetworkOverride => get_network_override(state, &params)
            .await
            .map(IntoResponse::into_response),
        Endpoint::SetMacOverride => set_mac_override(state, &params, body)
            .await
            .map(IntoResponse::into_response),
        Endpoint::ClearMacOverride => clear_mac_override(state, &params)
            .await
            .map(IntoResponse::into_response),
        Endpoint::GetMacOverride => get_mac_override(state, &params)
            .await
            .map(IntoResponse::into_response),
    };

    result.unwrap_or_else(IntoResponse::into_response)
}

// === Leases ===

/// MAC/IP binding
#[derive(Debug, Serialize, ToSchema)]
pub struct Binding {
    pub mac: String,
    pub ip: String,
}

/// Look up the IP bound to a MAC
#[utoipa::path(
    get,
    path = "/api/v1/dhcp/mac/{mac}",
    params(("mac" = String, Path, description = "MAC address (xx:xx:xx:xx:xx:xx)")),
    responses(
        (status = 200, description = "Current binding", body = Binding),
        (status = 404, description = "No lease for this MAC", body = ApiError)
    ),
    tag = "leases"
)]
pub async fn mac_to_ip(state: &AppState, params: &PathParams) -> Result<Json<Binding>, ApiError> {
    let mac: MacAddr = param(params, "mac")?;

    match state.engine.lookup_mac_to_ip(&mac).await? {
        Some(ip) => Ok(Json(Binding {
            mac: mac.to_string(),
            ip: ip.to_string(),
        })),
        None => Err(ApiError::not_found(format!("No lease for {}", mac))),
    }
}

/// Look up the MAC holding an IP
#[utoipa::path(
    get,
    path = "/api/v1/dhcp/ip/{ip}",
    params(("ip" = String, Path, description = "IPv4 address")),
    responses(
        (status = 200, description = "Current binding", body = Binding),
        (status = 404, description = "No lease for this IP", body = ApiError)
    ),
    tag = "leases"
)]
pub async fn ip_to_mac(state: &AppState, params: &PathParams) -> Result<Json<Binding>, ApiError> {
    let ip: Ipv4Param = param(params, "ip")?;
    let not_found = || ApiError::not_found(format!("No lease for {}", ip));

    let addr = ip.to_addr().ok_or_else(not_found)?;
    match state.engine.lookup_ip_to_mac(addr).await? {
        Some(mac) => Ok(Json(Binding {
            mac: mac.to_string(),
            ip: addr.to_string(),
        })),
        None => Err(not_found()),
    }
}

/// Released lease
#[derive(Debug, Serialize, ToSchema)]
pub struct Released {
    pub mac: String,
    pub ip: String,
    pub released: bool,
}

/// Release the IP bound to a MAC
#[utoipa::path(
    delete,
    path = "/api/v1/dhcp/mac/{mac}",
    params(("mac" = String, Path, description = "MAC address (xx:xx:xx:xx:xx:xx)")),
    responses(
        (status = 200, description = "Lease released", body = Released),
        (status = 404, description = "No lease for this MAC", body = ApiError)
    ),
    tag = "leases"
)]
pub async fn release_ip(state: &AppState, params: &PathParams) -> Result<Json<Released>, ApiError> {
    let mac: MacAddr = param(params, "mac")?;

    let ip = state
        .engine
        .release(&mac)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No lease for {}", mac)))?;

    let ip = ip.to_string();
    state.audit.lease_released(&mac, &ip);
    Ok(Json(Released {
        mac: mac.to_string(),
        ip,
        released: true,
    }))
}

// === Stats ===

/// Statistics for every interface
#[utoipa::path(
    get,
    path = "/api/v1/dhcp/stats",
    responses(
        (status = 200, description = "Network statistics", body = Vec<NetworkStats>)
    ),
    tag = "stats"
)]
pub async fn all_stats(state: &AppState) -> Result<Json<Vec<NetworkStats>>, ApiError> {
    Ok(Json(state.engine.stats(None, None).await?))
}

/// Statistics for one interface
#[utoipa::path(
    get,
    path = "/api/v1/dhcp/stats/{int}",
    params(("int" = String, Path, description = "Interface name")),
    responses(
        (status = 200, description = "Network statistics", body = Vec<NetworkStats>),
        (status = 404, description = "Unknown interface", body = ApiError)
    ),
    tag = "stats"
)]
pub async fn interface_stats(
    state: &AppState,
    params: &PathParams,
) -> Result<Json<Vec<NetworkStats>>, ApiError> {
    let interface: InterfaceName = param(params, "int")?;

    let stats = state.engine.stats(Some(interface.as_str()), None).await?;
    if stats.is_empty() {
        return Err(ApiError::not_found(format!(
            "No statistics for interface {}",
            interface.as_str()
        )));
    }
    Ok(Json(stats))
}

/// Statistics for one network on one interface
#[utoipa::path(
    get,
    path = "/api/v1/dhcp/stats/{int}/{network}",
    params(
        ("int" = String, Path, description = "Interface name"),
        ("network" = String, Path, description = "Network identifier")
    ),
    responses(
        (status = 200, description = "Network statistics", body = Vec<NetworkStats>),
        (status = 404, description = "Unknown interface or network", body = ApiError)
    ),
    tag = "stats"
)]
pub async fn interface_network_stats(
    state: &AppState,
    params: &PathParams,
) -> Result<Json<Vec<NetworkStats>>, ApiError> {
    let interface: InterfaceName = param(params, "int")?;
    let network: Ipv4Param = param(params, "network")?;

    let stats = state
        .engine
        .stats(Some(interface.as_str()), Some(network.as_str()))
        .await?;
    if stats.is_empty() {
        return Err(ApiError::not_found(format!(
            "No statistics for {} on interface {}",
            network,
            interface.as_str()
        )));
    }
    Ok(Json(stats))
}

// === Debug ===

/// Debug flag for an interface/role pair
#[derive(Debug, Serialize, ToSchema)]
pub struct DebugFlag {
    pub interface: String,
    pub role: String,
    pub enabled: bool,
}

/// Read the debug flag for an interface and role
#[utoipa::path(
    get,
    path = "/api/v1/dhcp/debug/{int}/{role}",
    params(
        ("int" = String, Path, description = "Interface name"),
        ("role" = String, Path, description = "Role name")
    ),
    responses(
        (status = 200, description = "Debug flag", body = DebugFlag),
        (status = 404, description = "Unknown interface/role pair", body = ApiError)
    ),
    tag = "debug"
)]
pub async fn debug_flag(state: &AppState, params: &PathParams) -> Result<Json<DebugFlag>, ApiError> {
    let interface: InterfaceName = param(params, "int")?;
    let role: RoleName = param(params, "role")?;

    let enabled = state
        .engine
        .debug_flag(interface.as_str(), role.as_str())
        .await?
        .ok_or_else(|| {
            ApiError::not_found(format!(
                "No role {} on interface {}",
                role.as_str(),
                interface.as_str()
            ))
        })?;

    Ok(Json(DebugFlag {
        interface: interface.as_str().to_string(),
        role: role.as_str().to_string(),
        enabled,
    }))
}

// === Option overrides ===

/// Stored option override
#[derive(Debug, Serialize, ToSchema)]
pub struct OverrideRecord {
    /// "mac" or "network"
    pub scope: String,
    pub id: String,
    pub value: String,
}

/// Cleared option override
#[derive(Debug, Serialize, ToSchema)]
pub struct OverrideCleared {
    pub scope: String,
    pub id: String,
}

async fn set_override(
    state: &AppState,
    scope: OverrideScope,
    body: Bytes,
) -> Result<Json<OverrideRecord>, ApiError> {
    let value = String::from_utf8(body.to_vec())
        .map_err(|_| ApiError::bad_request("Option payload must be UTF-8"))?;
    if value.is_empty() {
        return Err(ApiError::bad_request("Option payload must not be empty"));
    }

    state.store.put(&scope.logical_key(), &value).await?;
    state.audit.override_set(&scope, value.len());

    Ok(Json(OverrideRecord {
        scope: scope.kind().to_string(),
        id: scope.id().to_string(),
        value,
    }))
}

async fn clear_override(
    state: &AppState,
    scope: OverrideScope,
) -> Result<Json<OverrideCleared>, ApiError> {
    state.store.delete(&scope.logical_key()).await?;
    state.audit.override_cleared(&scope);

    Ok(Json(OverrideCleared {
        scope: scope.kind().to_string(),
        id: scope.id().to_string(),
    }))
}

async fn get_override(
    state: &AppState,
    scope: OverrideScope,
) -> Result<Json<OverrideRecord>, ApiError> {
    let value = state
        .store
        .get(&scope.logical_key())
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No override for {}", scope)))?;

    Ok(Json(OverrideRecord {
        scope: scope.kind().to_string(),
        id: scope.id().to_string(),
        value,
    }))
}

/// Set the option override for a network
#[utoipa::path(
    post,
    path = "/api/v1/dhcp/options/network/{network}",
    params(("network" = String, Path, description = "Network identifier")),
    request_body(content = String, description = "Option payload", content_type = "text/plain"),
    responses(
        (status = 200, description = "Override stored", body = OverrideRecord),
        (status = 400, description = "Empty or non UTF-8 payload", body = ApiError),
        (status = 500, description = "Storage failure", body = ApiError)
    ),
    tag = "options"
)]
pub async fn set_network_override(
    state: &AppState,
    params: &PathParams,
    body: Bytes,
) -> Result<Json<OverrideRecord>, ApiError> {
    set_override(state, network_scope(params)?, body).await
}

/// Clear the option override for a network
#[utoipa::path(
    delete,
    path = "/api/v1/dhcp/options/network/{network}",
    params(("network" = String, Path, description = "Network identifier")),
    responses(
        (status = 200, description = "Override cleared (also when none existed)", body = OverrideCleared),
        (status = 500, description = "Storage failure", body = ApiError)
    ),
    tag = "options"
)]
pub async fn clear_network_override(
    state: &AppState,
    params: &PathParams,
) -> Result<Json<OverrideCleared>, ApiError> {
    clear_override(state, network_scope(params)?).await
}

/// Read the option override for a network
#[utoipa::path(
    get,
    path = "/api/v1/dhcp/options/network/{network}",
    params(("network" = String, Path, description = "Network identifier")),
    responses(
        (status = 200, description = "Stored override", body = OverrideRecord),
        (status = 404, description = "No override stored", body = ApiError)
    ),
    tag = "options"
)]
pub async fn get_network_override(
    state: &AppState,
    params: &PathParams,
) -> Result<Json<OverrideRecord>, ApiError> {
    get_override(state, network_scope(params)?).await
}

/// Set the option override for a MAC
#[utoipa::path(
    post,
    path = "/api/v1/dhcp/options/mac/{mac}",
    params(("mac" = String, Path, description = "MAC address (xx:xx:xx:xx:xx:xx)")),
    request_body(content = String, description = "Option payload", content_type = "text/plain"),
    responses(
        (status = 200, description = "Override stored", body = OverrideRecord),
        (status = 400, description = "Empty or non UTF-8 payload", body = ApiError),
        (status = 500, description = "Storage failure", body = ApiError)
    ),
    tag = "options"
)]
pub async fn set_mac_override(
    state: &AppState,
    params: &PathParams,
    body: Bytes,
) -> Result<Json<OverrideRecord>, ApiError> {
    set_override(state, mac_scope(params)?, body).await
}

/// Clear the option override for a MAC
#[utoipa::path(
    delete,
    path = "/api/v1/dhcp/options/mac/{mac}",
    params(("mac" = String, Path, description = "MAC address (xx:xx:xx:xx:xx:xx)")),
    responses(
        (status = 200, description = "Override cleared (also when none existed)", body = OverrideCleared),
        (status = 500, description = "Storage failure", body = ApiError)
    ),
    tag = "options"
)]
pub async fn clear_mac_override(
    state: &AppState,
    params: &PathParams,
) -> Result<Json<OverrideCleared>, ApiError> {
    clear_override(state, mac_scope(params)?).await
}

/// Read the option override for a MAC
#[utoipa::path(
    get,
    path = "/api/v1/dhcp/options/mac/{mac}",
    params(("mac" = String, Path, description = "MAC address (xx:xx:xx:xx:xx:xx)")),
    responses(
        (status = 200, description = "Stored override", body = OverrideRecord),
        (status = 404, description = "No override stored", body = ApiError)
    ),
    tag = "options"
)]
pub async fn get_mac_override(
    state: &AppState,
    params: &PathParams,
) -> Result<Json<OverrideRecord>, ApiError> {
    get_override(state, mac_scope(params)?).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lease::MemoryLeaseEngine;
    use crate::store::MemoryKeyValueStore;
    use async_trait::async_trait;
    use std::net::Ipv4Addr;

    /// Store whose every call fails the way a dropped database connection does.
    struct FailingStore;

    #[async_trait]
    impl KeyValueStore for FailingStore {
        async fn put(&self, _key: &str, _value: &str) -> crate::store::Result<()> {
            Err(StoreError::Database(sqlx::Error::PoolClosed))
        }

        async fn get(&self, _key: &str) -> crate::store::Result<Option<String>> {
            Err(StoreError::Database(sqlx::Error::PoolClosed))
        }

        async fn delete(&self, _key: &str) -> crate::store::Result<()> {
            Err(StoreError::Database(sqlx::Error::PoolClosed))
        }
    }

    fn state_with(store: Arc<dyn KeyValueStore>) -> AppState {
        AppState::new(
            store,
            Arc::new(MemoryLeaseEngine::new()),
            Arc::new(AuditLogger::new_noop()),
            Credentials::new("admin", "secret"),
        )
        .unwrap()
    }

    fn mac_params(mac: &str) -> PathParams {
        RouteTable::dhcp_api()
            .unwrap()
            .resolve(&Method::POST, &format!("/api/v1/dhcp/options/mac/{}", mac))
            .unwrap()
            .1
    }

    #[tokio::test]
    async fn test_set_override_normalizes_mac_key() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let state = state_with(store.clone());

        let Json(record) = set_mac_override(
            &state,
            &mac_params("AA:BB:CC:DD:EE:FF"),
            Bytes::from_static(b"vendor-class-id"),
        )
        .await
        .unwrap();

        assert_eq!(record.scope, "mac");
        assert_eq!(record.id, "aa:bb:cc:dd:ee:ff");
        assert_eq!(store.raw_keys().await, vec!["/dhcpd/aa:bb:cc:dd:ee:ff"]);
    }

    #[tokio::test]
    async fn test_empty_payload_never_reaches_store() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let state = state_with(store.clone());

        let err = set_mac_override(&state, &mac_params("AA:BB:CC:DD:EE:FF"), Bytes::new())
            .await
            .unwrap_err();
        assert_eq!(err.code, 400);
        assert_eq!(store.operations(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_is_generic_500() {
        let state = state_with(Arc::new(FailingStore));
        let params = mac_params("AA:BB:CC:DD:EE:FF");

        let err = set_mac_override(&state, &params, Bytes::from_static(b"opt"))
            .await
            .unwrap_err();
        assert_eq!(err.code, 500);
        assert_eq!(err.error, "Internal storage error");

        let err = clear_mac_override(&state, &params).await.unwrap_err();
        assert_eq!(err.code, 500);
        assert!(!err.error.contains("pool"));
    }

    #[tokio::test]
    async fn test_ip_lookup_with_out_of_range_octet_is_not_found() {
        let engine = Arc::new(MemoryLeaseEngine::new());
        engine
            .insert_lease("aa:bb:cc:dd:ee:ff".parse().unwrap(), Ipv4Addr::new(10, 0, 0, 1))
            .await;
        let state = AppState::new(
            Arc::new(MemoryKeyValueStore::new()),
            engine,
            Arc::new(AuditLogger::new_noop()),
            Credentials::new("admin", "secret"),
        )
        .unwrap();

        let (_, params) = state
            .routes
            .resolve(&Method::GET, "/api/v1/dhcp/ip/999.0.0.1")
            .unwrap();
        let err = ip_to_mac(&state, &params).await.unwrap_err();
        assert_eq!(err.code, 404);
    }
}
