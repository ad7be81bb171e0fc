use tracing::{info, warn};

use crate::params::MacAddr;
use crate::store::OverrideScope;

/// Audit logger for administrative mutations.
///
/// Events go to the `dhcpd_api::audit` tracing target so they can be routed
/// separately from request logs with an `EnvFilter` directive.
pub struct AuditLogger {
    enabled: bool,
}

impl AuditLogger {
    pub fn new() -> Self {
        Self { enabled: true }
    }

    pub fn new_noop() -> Self {
        Self { enabled: false }
    }

    // Override events
    pub fn override_set(&self, scope: &OverrideScope, value_len: usize) {
        if self.enabled {
            info!(
                target: "dhcpd_api::audit",
                scope = scope.kind(),
                id = scope.id(),
                value_len,
                "Option override set"
            );
        }
    }

    pub fn override_cleared(&self, scope: &OverrideScope) {
        if self.enabled {
            info!(
                target: "dhcpd_api::audit",
                scope = scope.kind(),
                id = scope.id(),
                "Option override cleared"
            );
        }
    }

    // Lease events
    pub fn lease_released(&self, mac: &MacAddr, ip: &str) {
        if self.enabled {
            info!(target: "dhcpd_api::audit", %mac, ip, "Lease released");
        }
    }

    // Access events
    pub fn auth_rejected(&self, method: &str, path: &str) {
        if self.enabled {
            warn!(target: "dhcpd_api::audit", method, path, "Rejected unauthenticated request");
        }
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new()
    }
}
