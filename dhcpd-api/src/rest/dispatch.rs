//! Ordered route table with regex-constrained path parameters.
//!
//! Templates use brace syntax (`/api/v1/dhcp/mac/{mac}`). Each parameter name
//! maps to a [`ParamKind`] whose fragment is spliced into one anchored regex
//! per route. Resolution walks routes in registration order and returns the
//! first whose method and pattern both match. A path whose parameter breaks
//! its constraint matches nothing and never reaches a handler.

use axum::http::Method;
use regex::Regex;
use thiserror::Error;

use crate::params::ParamKind;

/// Handler bound to a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    MacToIp,
    ReleaseIp,
    IpToMac,
    AllStats,
    InterfaceNetworkStats,
    InterfaceStats,
    Debug,
    SetNetworkOverride,
    ClearNetworkOverride,
    SetMacOverride,
    ClearMacOverride,
    GetNetworkOverride,
    GetMacOverride,
}

/// Route template errors.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("unknown parameter {{{name}}} in {template}")]
    UnknownParam { template: String, name: String },

    #[error("unclosed parameter in {0}")]
    Unclosed(String),

    #[error("invalid pattern for {template}: {source}")]
    Pattern {
        template: String,
        #[source]
        source: regex::Error,
    },
}

/// Parameters captured from a matched path, in template order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(Vec<(&'static str, String)>);

impl PathParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

struct Route {
    method: Method,
    template: &'static str,
    regex: Regex,
    params: Vec<&'static str>,
    endpoint: Endpoint,
}

/// Ordered set of route entries.
#[derive(Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The DHCP management API, in matching order.
    pub fn dhcp_api() -> Result<Self, RouteError> {
        let mut table = Self::new();
        table
            .register(Method::GET, "/api/v1/dhcp/mac/{mac}", Endpoint::MacToIp)?
            .register(Method::DELETE, "/api/v1/dhcp/mac/{mac}", Endpoint::ReleaseIp)?
            .register(Method::GET, "/api/v1/dhcp/ip/{ip}", Endpoint::IpToMac)?
            .register(Method::GET, "/api/v1/dhcp/stats", Endpoint::AllStats)?
            .register(
                Method::GET,
                "/api/v1/dhcp/stats/{int}/{network}",
                Endpoint::InterfaceNetworkStats,
            )?
            .register(Method::GET, "/api/v1/dhcp/stats/{int}", Endpoint::InterfaceStats)?
            .register(Method::GET, "/api/v1/dhcp/debug/{int}/{role}", Endpoint::Debug)?
            .register(
                Method::POST,
                "/api/v1/dhcp/options/network/{network}",
                Endpoint::SetNetworkOverride,
            )?
            .register(
                Method::DELETE,
                "/api/v1/dhcp/options/network/{network}",
                Endpoint::ClearNetworkOverride,
            )?
            .register(
                Method::POST,
                "/api/v1/dhcp/options/mac/{mac}",
                Endpoint::SetMacOverride,
            )?
            .register(
                Method::DELETE,
                "/api/v1/dhcp/options/mac/{mac}",
                Endpoint::ClearMacOverride,
            )?
            .register(
                Method::GET,
                "/api/v1/dhcp/options/network/{network}",
                Endpoint::GetNetworkOverride,
            )?
            .register(
                Method::GET,
                "/api/v1/dhcp/options/mac/{mac}",
                Endpoint::GetMacOverride,
            )?;
        Ok(table)
    }

    /// Append a route. Earlier registrations win on overlap.
    pub fn register(
        &mut self,
        method: Method,
        template: &'static str,
        endpoint: Endpoint,
    ) -> Result<&mut Self, RouteError> {
        let (regex, params) = compile(template)?;
        self.routes.push(Route {
            method,
            template,
            regex,
            params,
            endpoint,
        });
        Ok(self)
    }

    /// Find the first route matching `method` and `path`.
    pub fn resolve(&self, method: &Method, path: &str) -> Option<(Endpoint, PathParams)> {
        self.routes
            .iter()
            .filter(|route| route.method == *method)
            .find_map(|route| {
                let caps = route.regex.captures(path)?;
                let params = route
                    .params
                    .iter()
                    .map(|&name| {
                        let value = caps.name(name).map_or("", |m| m.as_str());
                        (name, value.to_string())
                    })
                    .collect();
                Some((route.endpoint, PathParams(params)))
            })
    }

    /// Registered (method, template) pairs in matching order.
    pub fn templates(&self) -> impl Iterator<Item = (&Method, &'static str)> {
        self.routes.iter().map(|r| (&r.method, r.template))
    }
}

fn compile(template: &'static str) -> Result<(Regex, Vec<&'static str>), RouteError> {
    let mut pattern = String::from("^");
    let mut params = Vec::new();
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        pattern.push_str(&regex::escape(&rest[..open]));
        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or_else(|| RouteError::Unclosed(template.to_string()))?;
        let name = &after[..close];
        let kind = ParamKind::for_name(name).ok_or_else(|| RouteError::UnknownParam {
            template: template.to_string(),
            name: name.to_string(),
        })?;
        pattern.push_str(&format!("(?P<{}>{})", name, kind.pattern()));
        params.push(name);
        rest = &after[close + 1..];
    }
    pattern.push_str(&regex::escape(rest));
    pattern.push('$');

    let regex = Regex::new(&pattern).map_err(|source| RouteError::Pattern {
        template: template.to_string(),
        source,
    })?;
    Ok((regex, params))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RouteTable {
        RouteTable::dhcp_api().unwrap()
    }

    fn resolve(method: Method, path: &str) -> Option<(Endpoint, PathParams)> {
        table().resolve(&method, path)
    }

    #[test]
    fn test_mac_routes_by_method() {
        let (endpoint, params) =
            resolve(Method::GET, "/api/v1/dhcp/mac/AA:BB:CC:DD:EE:FF").unwrap();
        assert_eq!(endpoint, Endpoint::MacToIp);
        assert_eq!(params.get("mac"), Some("AA:BB:CC:DD:EE:FF"));

        let (endpoint, _) =
            resolve(Method::DELETE, "/api/v1/dhcp/mac/aa:bb:cc:dd:ee:ff").unwrap();
        assert_eq!(endpoint, Endpoint::ReleaseIp);
    }

    #[test]
    fn test_invalid_mac_matches_nothing() {
        for method in [Method::GET, Method::DELETE, Method::POST] {
            assert!(resolve(method.clone(), "/api/v1/dhcp/mac/ZZ:11:22:33:44:55").is_none());
            assert!(
                resolve(method, "/api/v1/dhcp/options/mac/ZZ:11:22:33:44:55").is_none()
            );
        }
        assert!(resolve(Method::GET, "/api/v1/dhcp/mac/aa:bb:cc:dd:ee").is_none());
    }

    #[test]
    fn test_ip_route_requires_dotted_groups() {
        let (endpoint, params) = resolve(Method::GET, "/api/v1/dhcp/ip/10.0.0.1").unwrap();
        assert_eq!(endpoint, Endpoint::IpToMac);
        assert_eq!(params.get("ip"), Some("10.0.0.1"));

        assert!(resolve(Method::GET, "/api/v1/dhcp/ip/10x0x0x1").is_none());
        assert!(resolve(Method::GET, "/api/v1/dhcp/ip/aa:bb:cc:dd:ee:ff").is_none());
    }

    #[test]
    fn test_stats_routes_in_registration_order() {
        let (endpoint, params) = resolve(Method::GET, "/api/v1/dhcp/stats").unwrap();
        assert_eq!(endpoint, Endpoint::AllStats);
        assert!(params.is_empty());

        let (endpoint, params) =
            resolve(Method::GET, "/api/v1/dhcp/stats/eth0/10.0.0.0").unwrap();
        assert_eq!(endpoint, Endpoint::InterfaceNetworkStats);
        assert_eq!(params.get("int"), Some("eth0"));
        assert_eq!(params.get("network"), Some("10.0.0.0"));

        let (endpoint, params) = resolve(Method::GET, "/api/v1/dhcp/stats/eth0").unwrap();
        assert_eq!(endpoint, Endpoint::InterfaceStats);
        assert_eq!(params.get("int"), Some("eth0"));
    }

    #[test]
    fn test_interface_may_contain_slashes() {
        let (endpoint, params) =
            resolve(Method::GET, "/api/v1/dhcp/stats/bond0/vlan10/10.0.0.0").unwrap();
        assert_eq!(endpoint, Endpoint::InterfaceNetworkStats);
        assert_eq!(params.get("int"), Some("bond0/vlan10"));

        // No trailing network, so the whole tail is the interface.
        let (endpoint, params) =
            resolve(Method::GET, "/api/v1/dhcp/stats/bond0/vlan10").unwrap();
        assert_eq!(endpoint, Endpoint::InterfaceStats);
        assert_eq!(params.get("int"), Some("bond0/vlan10"));
    }

    #[test]
    fn test_debug_route_splits_on_last_slash() {
        let (endpoint, params) =
            resolve(Method::GET, "/api/v1/dhcp/debug/eth0.100/registration").unwrap();
        assert_eq!(endpoint, Endpoint::Debug);
        assert_eq!(params.get("int"), Some("eth0.100"));
        assert_eq!(params.get("role"), Some("registration"));

        let (_, params) = resolve(Method::GET, "/api/v1/dhcp/debug/a/b/c").unwrap();
        assert_eq!(params.get("int"), Some("a/b"));
        assert_eq!(params.get("role"), Some("c"));
    }

    #[test]
    fn test_override_routes() {
        let network = "/api/v1/dhcp/options/network/10.0.0.0";
        let mac = "/api/v1/dhcp/options/mac/AA:BB:CC:DD:EE:FF";
        let cases = [
            (Method::POST, network, Endpoint::SetNetworkOverride),
            (Method::DELETE, network, Endpoint::ClearNetworkOverride),
            (Method::GET, network, Endpoint::GetNetworkOverride),
            (Method::POST, mac, Endpoint::SetMacOverride),
            (Method::DELETE, mac, Endpoint::ClearMacOverride),
            (Method::GET, mac, Endpoint::GetMacOverride),
        ];
        for (method, path, expected) in cases {
            let (endpoint, params) = resolve(method, path).unwrap();
            assert_eq!(endpoint, expected, "{path}");
            assert_eq!(params.len(), 1);
        }

        assert!(resolve(Method::POST, "/api/v1/dhcp/options/network/eth0").is_none());
    }

    #[test]
    fn test_unmatched_method_and_path() {
        assert!(resolve(Method::PUT, "/api/v1/dhcp/mac/AA:BB:CC:DD:EE:FF").is_none());
        assert!(resolve(Method::POST, "/api/v1/dhcp/stats").is_none());
        assert!(resolve(Method::GET, "/api/v1/dhcp/unknown").is_none());
        assert!(resolve(Method::GET, "/api/v1/dhcp/mac/AA:BB:CC:DD:EE:FF/extra").is_none());
    }

    #[test]
    fn test_first_registration_wins() {
        let mut table = RouteTable::new();
        table
            .register(Method::GET, "/x/{int}", Endpoint::InterfaceStats)
            .unwrap()
            .register(Method::GET, "/x/{ip}", Endpoint::IpToMac)
            .unwrap();

        let (endpoint, _) = table.resolve(&Method::GET, "/x/10.0.0.1").unwrap();
        assert_eq!(endpoint, Endpoint::InterfaceStats);
    }

    #[test]
    fn test_template_errors() {
        let mut table = RouteTable::new();
        assert!(matches!(
            table.register(Method::GET, "/x/{vlan}", Endpoint::AllStats),
            Err(RouteError::UnknownParam { .. })
        ));
        assert!(matches!(
            table.register(Method::GET, "/x/{mac", Endpoint::AllStats),
            Err(RouteError::Unclosed(_))
        ));
        assert_eq!(table.templates().count(), 0);
    }

    #[test]
    fn test_templates_preserve_order() {
        let table = table();
        let templates: Vec<_> = table.templates().map(|(_, t)| t).collect();
        assert_eq!(templates.len(), 13);
        assert_eq!(templates[0], "/api/v1/dhcp/mac/{mac}");
        assert_eq!(templates[4], "/api/v1/dhcp/stats/{int}/{network}");
        assert_eq!(templates[5], "/api/v1/dhcp/stats/{int}");
    }
}
