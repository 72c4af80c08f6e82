//! System Proxy Settings
//!
//! Builds the HTTP/HTTPS proxy part of the network configuration from the
//! engine's proxy descriptor.
//!
//! One server serves both protocol roles. The server is always filled in
//! when a descriptor exists, even with the system proxy disabled, so a later
//! toggle only flips the two `enabled` flags.

use crate::options::HttpProxyOptions;
use serde::Serialize;
use std::fmt;

/// Domain of the auxiliary (push notification) service
pub const AUXILIARY_SERVICE_DOMAIN: &str = "push.apple.com";

/// Proxy server address
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProxyServer {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for ProxyServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Proxy part of a network configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProxySettings {
    pub http_server: Option<ProxyServer>,
    pub http_enabled: bool,
    pub https_server: Option<ProxyServer>,
    pub https_enabled: bool,
    /// Bypass list
    pub exception_list: Vec<String>,
    /// Empty means every domain is eligible
    pub match_domains: Vec<String>,
}

impl ProxySettings {
    /// Whether a proxy server is configured at all
    pub fn is_available(&self) -> bool {
        self.http_server.is_some()
    }

    /// Current enablement (both roles move together)
    pub fn is_enabled(&self) -> bool {
        self.http_enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.http_enabled = enabled;
        self.https_enabled = enabled;
    }
}

/// Builds [`ProxySettings`] under fixed policy flags
#[derive(Debug, Clone, Copy, Default)]
pub struct ProxyConfigBuilder {
    /// Turn the protocol roles on
    pub system_proxy_enabled: bool,
    /// Keep the auxiliary service off the proxy
    pub exclude_auxiliary: bool,
}

impl ProxyConfigBuilder {
    pub fn new(system_proxy_enabled: bool, exclude_auxiliary: bool) -> Self {
        Self {
            system_proxy_enabled,
            exclude_auxiliary,
        }
    }

    /// `None` when no proxying was requested
    pub fn build(&self, descriptor: Option<&HttpProxyOptions>) -> Option<ProxySettings> {
        let descriptor = descriptor?;

        let server = (!descriptor.server.is_empty()).then(|| ProxyServer {
            host: descriptor.server.clone(),
            port: descriptor.port,
        });

        let mut exception_list = descriptor.bypass_domains.clone();
        if self.exclude_auxiliary && !exception_list.iter().any(|d| d == AUXILIARY_SERVICE_DOMAIN) {
            exception_list.push(AUXILIARY_SERVICE_DOMAIN.to_string());
        }

        let enabled = self.system_proxy_enabled && server.is_some();
        Some(ProxySettings {
            http_server: server.clone(),
            http_enabled: enabled,
            https_server: server,
            https_enabled: enabled,
            exception_list,
            match_domains: descriptor.match_domains.clone(),
        })
    }
}
