//! Namespacing of override keys.
//!
//! Every key this service persists is `NAMESPACE_PREFIX` followed by a logical
//! key. Logical keys come from [`OverrideScope::logical_key`]: the normalized
//! MAC for MAC-scoped overrides and the dotted identifier for network-scoped
//! ones. A MAC always contains `:` and a network identifier never does, so the
//! two scopes cannot collide.

use std::fmt;

use super::error::{Result, StoreError};
use crate::params::{Ipv4Param, MacAddr};

/// Prefix shared by all rows this service writes to `key_value_storage`.
pub const NAMESPACE_PREFIX: &str = "/dhcpd/";

/// Target of an option override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideScope {
    Mac(MacAddr),
    Network(Ipv4Param),
}

impl OverrideScope {
    /// Scope kind as exposed in API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            OverrideScope::Mac(_) => "mac",
            OverrideScope::Network(_) => "network",
        }
    }

    /// Scope identifier (normalized MAC or network).
    pub fn id(&self) -> &str {
        match self {
            OverrideScope::Mac(mac) => mac.as_str(),
            OverrideScope::Network(network) => network.as_str(),
        }
    }

    /// Key handed to the store; the store adds the namespace prefix.
    pub fn logical_key(&self) -> String {
        self.id().to_string()
    }
}

impl fmt::Display for OverrideScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind(), self.id())
    }
}

/// Build the persisted row id for a logical key.
pub fn storage_key(logical: &str) -> Result<String> {
    if logical.is_empty() || logical.starts_with(NAMESPACE_PREFIX) {
        return Err(StoreError::InvalidKey(logical.to_string()));
    }
    Ok(format!("{NAMESPACE_PREFIX}{logical}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_key_prefixes_logical_key() {
        assert_eq!(
            storage_key("aa:bb:cc:dd:ee:ff").unwrap(),
            "/dhcpd/aa:bb:cc:dd:ee:ff"
        );
    }

    #[test]
    fn test_storage_key_rejects_empty_and_prefixed() {
        assert!(matches!(storage_key(""), Err(StoreError::InvalidKey(_))));
        assert!(matches!(
            storage_key("/dhcpd/10.0.0.0"),
            Err(StoreError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_scopes_produce_distinct_keys() {
        let mac = OverrideScope::Mac("AA:BB:CC:DD:EE:FF".parse().unwrap());
        let network = OverrideScope::Network("10.0.0.0".parse().unwrap());

        assert_eq!(mac.kind(), "mac");
        assert_eq!(mac.logical_key(), "aa:bb:cc:dd:ee:ff");
        assert_eq!(network.kind(), "network");
        assert_eq!(network.logical_key(), "10.0.0.0");
        assert_ne!(mac.logical_key(), network.logical_key());
        assert_eq!(mac.to_string(), "mac/aa:bb:cc:dd:ee:ff");
    }
}
