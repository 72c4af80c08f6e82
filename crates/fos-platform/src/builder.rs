//! Network Configuration Builder
//!
//! Turns the engine's [`TunOptions`] into a [`NetworkConfiguration`],
//! installs it and resolves the tunnel's data-plane handle.
//!
//! Failures before submission leave no trace: nothing reaches the sink and
//! nothing is retained.

use crate::error::{PlatformError, PlatformResult};
use crate::options::TunOptions;
use crate::policy::Policy;
use crate::proxy::ProxyConfigBuilder;
use crate::routes::RouteSetComputer;
use crate::settings::{DnsSettings, FamilySettings, NetworkConfiguration};
use crate::sink::{self, ConfigurationSink, HandleSource, TunnelHandle};
use crate::store::ConfigurationStore;
use tracing::{debug, info};

/// Builds and installs the tunnel configuration under a fixed policy
#[derive(Debug, Clone)]
pub struct NetworkConfigurationBuilder {
    policy: Policy,
}

impl NetworkConfigurationBuilder {
    pub fn new(policy: Policy) -> Self {
        Self { policy }
    }

    /// Assemble the configuration without side effects
    pub fn assemble(&self, options: Option<&TunOptions>) -> PlatformResult<NetworkConfiguration> {
        let options = options
            .ok_or_else(|| PlatformError::InvalidOptions("missing tunnel options".into()))?;

        let mut config = NetworkConfiguration::new();
        if !options.auto_route {
            debug!("Auto route disabled, configuration carries no routing state");
            return Ok(config);
        }

        let dns_server = options.dns_server()?;
        config.mtu = Some(options.mtu);
        config.dns = Some(DnsSettings::match_all(dns_server));

        let routes = RouteSetComputer::new(self.policy.route_policy());

        if !options.inet4_address.is_empty() {
            config.ipv4 = Some(FamilySettings {
                addresses: options.inet4_address.clone(),
                routes: routes.ipv4(
                    &options.inet4_route_address,
                    &options.inet4_route_exclude_address,
                ),
            });
        }

        if !options.inet6_address.is_empty() {
            config.ipv6 = Some(FamilySettings {
                addresses: options.inet6_address.clone(),
                routes: routes.ipv6(
                    &options.inet6_route_address,
                    &options.inet6_route_exclude_address,
                ),
            });
        }

        config.proxy = ProxyConfigBuilder::new(
            self.policy.system_proxy_enabled,
            self.policy.exclude_auxiliary_service_route,
        )
        .build(options.http_proxy.as_ref());

        Ok(config)
    }

    /// Assemble, submit (blocking, bounded), retain, then resolve the handle
    pub fn build(
        &self,
        options: Option<&TunOptions>,
        sink: &dyn ConfigurationSink,
        handles: &dyn HandleSource,
        store: &ConfigurationStore,
    ) -> PlatformResult<TunnelHandle> {
        let config = self.assemble(options)?;

        info!(
            "Applying tunnel configuration (mtu: {:?}, ipv4: {}, ipv6: {}, proxy: {})",
            config.mtu,
            config.ipv4.is_some(),
            config.ipv6.is_some(),
            config.proxy.is_some()
        );
        store.install(config, sink, self.policy.sink_timeout())?;

        sink::resolve_handle(sink, handles)
    }
}
