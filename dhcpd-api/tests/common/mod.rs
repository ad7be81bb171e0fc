//! Shared test utilities for dhcpd-api integration tests.

use dhcpd_api::lease::NetworkStats;
use dhcpd_api::{
    AppState, AuditLogger, Credentials, LeaseEngine, MemoryKeyValueStore, MemoryLeaseEngine,
    ServerConfig, build_app,
};
use reqwest::{Client, RequestBuilder, Response as ReqwestResponse};
use std::collections::BTreeMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;

pub const USER: &str = "webservices";
pub const PASSWORD: &str = "s3cret";

/// Test server wrapper running the full router over an in-memory store and
/// a seeded lease engine.
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    pub store: Arc<MemoryKeyValueStore>,
    /// Handle to the in-memory engine, for seeding from tests.
    pub engine: Arc<MemoryLeaseEngine>,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
}

impl TestServer {
    /// Spawn a server over the seeded lease engine with default timeouts.
    pub async fn spawn() -> Self {
        let engine = seeded_engine().await;
        Self::spawn_with(engine.clone(), engine, ServerConfig::default()).await
    }

    /// Spawn a server over `engine`, keeping `handle` for direct engine access.
    pub async fn spawn_with(
        engine: Arc<dyn LeaseEngine>,
        handle: Arc<MemoryLeaseEngine>,
        config: ServerConfig,
    ) -> Self {
        let store = Arc::new(MemoryKeyValueStore::new());

        let state = Arc::new(
            AppState::new(
                store.clone(),
                engine,
                Arc::new(AuditLogger::new_noop()),
                Credentials::new(USER, PASSWORD),
            )
            .expect("Failed to build route table"),
        );

        let router = build_app(state, &config);

        // Bind to port 0 to let the OS choose an available port
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let listener = TcpListener::bind(&addr).await.expect("Failed to bind");
        let actual_addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("Server error");
        });

        Self {
            addr: actual_addr,
            client: Client::new(),
            store,
            engine: handle,
            shutdown_tx,
        }
    }

    /// Get base URL for the DHCP API.
    pub fn base_url(&self) -> String {
        format!("http://{}/api/v1/dhcp", self.addr)
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.basic_auth(USER, Some(PASSWORD))
    }

    /// Perform an authenticated GET request.
    pub async fn get(&self, path: &str) -> ReqwestResponse {
        self.authed(self.client.get(format!("{}{}", self.base_url(), path)))
            .send()
            .await
            .expect("Request failed")
    }

    /// Perform an authenticated POST request with a text body.
    pub async fn post_text(&self, path: &str, body: &str) -> ReqwestResponse {
        self.authed(self.client.post(format!("{}{}", self.base_url(), path)))
            .body(body.to_string())
            .send()
            .await
            .expect("Request failed")
    }

    /// Perform an authenticated DELETE request.
    pub async fn delete(&self, path: &str) -> ReqwestResponse {
        self.authed(self.client.delete(format!("{}{}", self.base_url(), path)))
            .send()
            .await
            .expect("Request failed")
    }

    /// Shutdown the server.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Lease engine with one lease, two networks and a debug flag.
pub async fn seeded_engine() -> Arc<MemoryLeaseEngine> {
    let engine = Arc::new(MemoryLeaseEngine::new());
    engine
        .insert_lease(
            "00:11:22:33:44:55".parse().unwrap(),
            Ipv4Addr::new(10, 0, 0, 10),
        )
        .await;
    engine.add_network(network_stats("eth0", "10.0.0.0")).await;
    engine.add_network(network_stats("eth1.100", "192.168.100.0")).await;
    engine.set_debug_flag("eth0", "registration", true).await;
    engine
}

pub fn network_stats(interface: &str, network: &str) -> NetworkStats {
    NetworkStats {
        interface: interface.to_string(),
        network: network.to_string(),
        category: "registration".to_string(),
        size: 253,
        free: 252,
        options: BTreeMap::from([("router".to_string(), "10.0.0.1".to_string())]),
    }
}
