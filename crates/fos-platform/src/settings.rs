//! Network Configuration
//!
//! The payload handed to the configuration sink: addresses, DNS, routes,
//! proxy and MTU for the tunnel interface.

use crate::proxy::ProxySettings;
use crate::routes::RouteSet;
use ipnet::{Ipv4Net, Ipv6Net};
use serde::Serialize;
use std::net::IpAddr;

/// Remote address the sink requires for the tunnel. Never routed to.
pub const TUNNEL_REMOTE_ADDRESS: &str = "127.0.0.1";

/// DNS part of the configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DnsSettings {
    pub servers: Vec<IpAddr>,
    /// `[""]` matches every domain
    pub match_domains: Vec<String>,
    /// Do not append these domains as search suffixes
    pub match_domains_no_search: bool,
}

impl DnsSettings {
    /// Send every query to `server`, without search suffixes
    pub fn match_all(server: IpAddr) -> Self {
        Self {
            servers: vec![server],
            match_domains: vec![String::new()],
            match_domains_no_search: true,
        }
    }
}

/// Addresses and routes for one family
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FamilySettings<N> {
    pub addresses: Vec<N>,
    pub routes: RouteSet<N>,
}

pub type Ipv4Settings = FamilySettings<Ipv4Net>;
pub type Ipv6Settings = FamilySettings<Ipv6Net>;

/// Complete tunnel network configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkConfiguration {
    pub tunnel_remote_address: String,
    pub mtu: Option<u32>,
    pub dns: Option<DnsSettings>,
    pub ipv4: Option<Ipv4Settings>,
    pub ipv6: Option<Ipv6Settings>,
    pub proxy: Option<ProxySettings>,
}

impl NetworkConfiguration {
    /// Empty configuration: only the remote address is set
    pub fn new() -> Self {
        Self {
            tunnel_remote_address: TUNNEL_REMOTE_ADDRESS.to_string(),
            mtu: None,
            dns: None,
            ipv4: None,
            ipv6: None,
            proxy: None,
        }
    }

    /// Serialize for logging and the dry-run planner
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl Default for NetworkConfiguration {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_configuration() {
        let config = NetworkConfiguration::default();
        assert_eq!(config.tunnel_remote_address, "127.0.0.1");
        assert!(config.mtu.is_none());
        assert!(config.dns.is_none() && config.proxy.is_none());
    }

    #[test]
    fn test_match_all_dns() {
        let dns = DnsSettings::match_all("172.19.0.2".parse().unwrap());
        assert_eq!(dns.match_domains, vec![String::new()]);
        assert!(dns.match_domains_no_search);
    }

    #[test]
    fn test_json_prefixes_as_strings() {
        let mut config = NetworkConfiguration::new();
        config.ipv4 = Some(FamilySettings {
            addresses: vec!["172.19.0.1/30".parse().unwrap()],
            routes: RouteSet {
                included: vec!["0.0.0.0/0".parse().unwrap()],
                excluded: Vec::new(),
            },
        });

        let json = config.to_json().unwrap();
        assert!(json.contains("\"172.19.0.1/30\""));
        assert!(json.contains("\"0.0.0.0/0\""));
    }
}
