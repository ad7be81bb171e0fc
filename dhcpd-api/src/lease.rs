//! Read/release surface of the lease engine.
//!
//! The DHCP engine that owns bindings and pool counters lives outside this
//! service. Handlers reach it only through [`LeaseEngine`], a narrow async
//! capability trait. [`MemoryLeaseEngine`] is the in-process implementation,
//! loaded from a JSON snapshot or populated directly in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::net::Ipv4Addr;
use std::path::Path;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;
use utoipa::ToSchema;

use crate::params::MacAddr;

/// Errors reported by a lease engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Engine could not answer the query.
    #[error("lease engine unavailable: {0}")]
    Unavailable(String),

    /// Snapshot file could not be read or parsed.
    #[error("invalid lease snapshot: {0}")]
    Snapshot(String),
}

/// Counters for one network served on one interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NetworkStats {
    /// Interface the network is served on
    pub interface: String,
    /// Network identifier (e.g., "10.0.0.0")
    pub network: String,
    /// Role or category the pool belongs to
    #[serde(default)]
    pub category: String,
    /// Number of addresses in the pool
    pub size: u32,
    /// Number of free addresses in the pool
    pub free: u32,
    /// DHCP options announced on this network
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

/// Capability interface over the external lease engine.
#[async_trait]
pub trait LeaseEngine: Send + Sync {
    /// IP currently bound to `mac`.
    async fn lookup_mac_to_ip(&self, mac: &MacAddr) -> Result<Option<Ipv4Addr>, EngineError>;

    /// MAC currently holding `ip`.
    async fn lookup_ip_to_mac(&self, ip: Ipv4Addr) -> Result<Option<MacAddr>, EngineError>;

    /// Release the binding held by `mac`. Returns the released IP, if any.
    async fn release(&self, mac: &MacAddr) -> Result<Option<Ipv4Addr>, EngineError>;

    /// Network counters, optionally narrowed to an interface and a network.
    async fn stats(
        &self,
        interface: Option<&str>,
        network: Option<&str>,
    ) -> Result<Vec<NetworkStats>, EngineError>;

    /// Debug flag for an interface/role pair, `None` when the pair is unknown.
    async fn debug_flag(&self, interface: &str, role: &str) -> Result<Option<bool>, EngineError>;
}

/// Binding entry in a lease snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseEntry {
    pub mac: MacAddr,
    pub ip: Ipv4Addr,
}

/// Debug flag entry in a lease snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugEntry {
    pub interface: String,
    pub role: String,
    pub enabled: bool,
}

/// On-disk snapshot format accepted by `--leases`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeaseSnapshot {
    #[serde(default)]
    pub leases: Vec<LeaseEntry>,
    #[serde(default)]
    pub networks: Vec<NetworkStats>,
    #[serde(default)]
    pub debug: Vec<DebugEntry>,
}

#[derive(Default)]
struct LeaseTable {
    by_mac: HashMap<MacAddr, Ipv4Addr>,
    by_ip: HashMap<Ipv4Addr, MacAddr>,
    networks: Vec<NetworkStats>,
    debug: HashMap<(String, String), bool>,
}

impl LeaseTable {
    fn bind(&mut self, mac: MacAddr, ip: Ipv4Addr) {
        if let Some(old_ip) = self.by_mac.insert(mac.clone(), ip) {
            if old_ip != ip {
                self.by_ip.remove(&old_ip);
            }
        }
        if let Some(old_mac) = self.by_ip.insert(ip, mac.clone()) {
            if old_mac != mac {
                self.by_mac.remove(&old_mac);
            }
        }
    }
}

/// In-process lease engine.
#[derive(Default)]
pub struct MemoryLeaseEngine {
    table: RwLock<LeaseTable>,
}

impl MemoryLeaseEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: LeaseSnapshot) -> Self {
        let mut table = LeaseTable::default();
        for lease in snapshot.leases {
            table.bind(lease.mac, lease.ip);
        }
        table.networks = snapshot.networks;
        for entry in snapshot.debug {
            table.debug.insert((entry.interface, entry.role), entry.enabled);
        }
        Self {
            table: RwLock::new(table),
        }
    }

    /// Load a JSON snapshot from disk.
    pub async fn from_snapshot_file(path: &Path) -> Result<Self, EngineError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| EngineError::Snapshot(format!("{}: {}", path.display(), e)))?;
        let snapshot: LeaseSnapshot = serde_json::from_str(&raw)
            .map_err(|e| EngineError::Snapshot(format!("{}: {}", path.display(), e)))?;

        info!(
            path = %path.display(),
            leases = snapshot.leases.len(),
            networks = snapshot.networks.len(),
            "Loaded lease snapshot"
        );
        Ok(Self::from_snapshot(snapshot))
    }

    /// Record a binding, replacing any previous binding of either side.
    pub async fn insert_lease(&self, mac: MacAddr, ip: Ipv4Addr) {
        self.table.write().await.bind(mac, ip);
    }

    pub async fn add_network(&self, stats: NetworkStats) {
        self.table.write().await.networks.push(stats);
    }

    pub async fn set_debug_flag(&self, interface: &str, role: &str, enabled: bool) {
        self.table
            .write()
            .await
            .debug
            .insert((interface.to_string(), role.to_string()), enabled);
    }
}

#[async_trait]
impl LeaseEngine for MemoryLeaseEngine {
    async fn lookup_mac_to_ip(&self, mac: &MacAddr) -> Result<Option<Ipv4Addr>, EngineError> {
        Ok(self.table.read().await.by_mac.get(mac).copied())
    }

    async fn lookup_ip_to_mac(&self, ip: Ipv4Addr) -> Result<Option<MacAddr>, EngineError> {
        Ok(self.table.read().await.by_ip.get(&ip).cloned())
    }

    async fn release(&self, mac: &MacAddr) -> Result<Option<Ipv4Addr>, EngineError> {
        let mut table = self.table.write().await;
        let released = table.by_mac.remove(mac);
        if let Some(ip) = released {
            table.by_ip.remove(&ip);
        }
        Ok(released)
    }

    async fn stats(
        &self,
        interface: Option<&str>,
        network: Option<&str>,
    ) -> Result<Vec<NetworkStats>, EngineError> {
        let table = self.table.read().await;
        Ok(table
            .networks
            .iter()
            .filter(|s| interface.is_none_or(|i| s.interface == i))
            .filter(|s| network.is_none_or(|n| s.network == n))
            .cloned()
            .collect())
    }

    async fn debug_flag(&self, interface: &str, role: &str) -> Result<Option<bool>, EngineError> {
        Ok(self
            .table
            .read()
            .await
            .debug
            .get(&(interface.to_string(), role.to_string()))
            .copied())
    }
}
