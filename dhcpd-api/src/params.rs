//! Typed path parameters and the shape constraints the dispatcher enforces.
//!
//! Every parameter kind has a single regex fragment. The route table embeds
//! the fragment in its compiled pattern, and the `FromStr` impls below check
//! the same fragment anchored, so a value that reached a handler always
//! satisfies its constraint.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

/// Shape constraint attached to a named path parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Six colon-separated hex byte pairs.
    Mac,
    /// Dotted numeric groups (`ip` and `network`).
    Ipv4,
    /// Free-form interface identifier, may span slashes.
    Interface,
    /// Free-form role name without slashes.
    Role,
}

impl ParamKind {
    /// Regex fragment (unanchored) for this kind.
    pub fn pattern(self) -> &'static str {
        match self {
            ParamKind::Mac => r"(?:[0-9A-Fa-f]{2}:){5}[0-9A-Fa-f]{2}",
            ParamKind::Ipv4 => r"(?:[0-9]{1,3}\.){3}[0-9]{1,3}",
            ParamKind::Interface => r".*",
            ParamKind::Role => r"[^/]*",
        }
    }

    /// Kind bound to a parameter name in route templates.
    pub fn for_name(name: &str) -> Option<Self> {
        match name {
            "mac" => Some(ParamKind::Mac),
            "ip" | "network" => Some(ParamKind::Ipv4),
            "int" => Some(ParamKind::Interface),
            "role" => Some(ParamKind::Role),
            _ => None,
        }
    }
}

fn anchored(kind: ParamKind) -> Regex {
    Regex::new(&format!("^{}$", kind.pattern())).expect("parameter patterns are static")
}

static MAC_RE: LazyLock<Regex> = LazyLock::new(|| anchored(ParamKind::Mac));
static IPV4_RE: LazyLock<Regex> = LazyLock::new(|| anchored(ParamKind::Ipv4));
static ROLE_RE: LazyLock<Regex> = LazyLock::new(|| anchored(ParamKind::Role));

/// Path parameter validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamError {
    #[error("Invalid MAC address: {0}")]
    InvalidMac(String),

    #[error("Invalid IPv4 address: {0}")]
    InvalidIpv4(String),

    #[error("Invalid role name: {0}")]
    InvalidRole(String),
}

/// A MAC address in lowercase colon-separated form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddr(String);

impl MacAddr {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for MacAddr {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if MAC_RE.is_match(s) {
            Ok(Self(s.to_ascii_lowercase()))
        } else {
            Err(ParamError::InvalidMac(s.to_string()))
        }
    }
}

impl TryFrom<String> for MacAddr {
    type Error = ParamError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<MacAddr> for String {
    fn from(mac: MacAddr) -> Self {
        mac.0
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Dotted numeric identifier used for both `ip` and `network` segments.
///
/// The shape check does not bound each group to 255; `to_addr` returns
/// `None` for values such as `999.1.1.1`, which handlers treat as a miss.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ipv4Param(String);

impl Ipv4Param {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_addr(&self) -> Option<Ipv4Addr> {
        self.0.parse().ok()
    }
}

impl FromStr for Ipv4Param {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if IPV4_RE.is_match(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(ParamError::InvalidIpv4(s.to_string()))
        }
    }
}

impl fmt::Display for Ipv4Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Interface identifier. Any string is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterfaceName(String);

impl InterfaceName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for InterfaceName {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

/// Role name, never containing a slash.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoleName(String);

impl RoleName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for RoleName {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if ROLE_RE.is_match(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(ParamError::InvalidRole(s.to_string()))
        }
    }
}
