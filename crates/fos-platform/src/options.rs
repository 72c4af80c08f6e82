//! Tunnel Options
//!
//! The read-only descriptor the engine supplies once at tunnel startup.
//! Prefixes arrive typed; the DNS server stays a string because the engine
//! may hand over a value that does not parse.

use crate::error::{PlatformError, PlatformResult};
use ipnet::{Ipv4Net, Ipv6Net};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Default tunnel MTU
pub const DEFAULT_MTU: u32 = 9000;

/// HTTP proxy descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpProxyOptions {
    /// Proxy host (usually the engine's local listener)
    pub server: String,
    /// Proxy port
    pub port: u16,
    /// Domains that must not go through the proxy
    pub bypass_domains: Vec<String>,
    /// Domains eligible for proxying (empty = all)
    pub match_domains: Vec<String>,
}

impl HttpProxyOptions {
    pub fn new(server: impl Into<String>, port: u16) -> Self {
        Self {
            server: server.into(),
            port,
            ..Self::default()
        }
    }
}

/// Tunnel options from the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunOptions {
    pub mtu: u32,
    /// Install addresses, DNS and routes for the tunnel
    pub auto_route: bool,
    pub dns_server_address: String,
    pub inet4_address: Vec<Ipv4Net>,
    pub inet6_address: Vec<Ipv6Net>,
    pub inet4_route_address: Vec<Ipv4Net>,
    pub inet6_route_address: Vec<Ipv6Net>,
    pub inet4_route_exclude_address: Vec<Ipv4Net>,
    pub inet6_route_exclude_address: Vec<Ipv6Net>,
    pub http_proxy: Option<HttpProxyOptions>,
}

impl Default for TunOptions {
    fn default() -> Self {
        Self {
            mtu: DEFAULT_MTU,
            auto_route: false,
            dns_server_address: String::new(),
            inet4_address: Vec::new(),
            inet6_address: Vec::new(),
            inet4_route_address: Vec::new(),
            inet6_route_address: Vec::new(),
            inet4_route_exclude_address: Vec::new(),
            inet6_route_exclude_address: Vec::new(),
            http_proxy: None,
        }
    }
}

impl TunOptions {
    /// Parse options handed over by the engine as JSON
    pub fn from_json(content: &str) -> PlatformResult<Self> {
        serde_json::from_str(content).map_err(|e| PlatformError::InvalidOptions(e.to_string()))
    }

    /// Parsed DNS server address
    pub fn dns_server(&self) -> PlatformResult<IpAddr> {
        let raw = self.dns_server_address.trim();
        if raw.is_empty() {
            return Err(PlatformError::InvalidOptions(
                "missing DNS server address".into(),
            ));
        }
        raw.parse().map_err(|_| {
            PlatformError::InvalidOptions(format!("invalid DNS server address: {raw}"))
        })
    }
}
