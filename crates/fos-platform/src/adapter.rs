//! Platform Adapter
//!
//! The long-lived object the engine talks to. It is shared by the one-shot
//! tunnel setup, the monitor's background delivery and UI-triggered proxy
//! and resolver operations.
//!
//! # Usage
//!
//! ```rust,ignore
//! let adapter = PlatformAdapter::builder(sink, policy)
//!     .path_observer(observer)
//!     .build();
//!
//! let handle = adapter.open_tun(Some(&options))?;
//! let first = adapter.start_default_interface_monitor(listener)?;
//!
//! if adapter.system_proxy_status().available {
//!     adapter.set_system_proxy_enabled(true)?;
//! }
//!
//! adapter.close();
//! ```

use crate::builder::NetworkConfigurationBuilder;
use crate::capability::{Capability, CapabilitySet};
use crate::error::{PlatformError, PlatformResult};
use crate::monitor::{
    DefaultInterface, DefaultInterfaceMonitor, InterfaceListener, NetworkInterface, PathObserver,
};
use crate::options::TunOptions;
use crate::policy::Policy;
use crate::settings::NetworkConfiguration;
use crate::sink::{ConfigurationSink, GlobalHandleRegistry, HandleSource, TunnelHandle};
use crate::store::ConfigurationStore;
use crate::system_proxy::{CacheClear, ProxyUpdate, SystemProxyController, SystemProxyStatus};
use std::sync::Arc;
use tracing::info;

/// Builder for [`PlatformAdapter`]
pub struct PlatformAdapterBuilder {
    sink: Arc<dyn ConfigurationSink>,
    policy: Policy,
    handles: Arc<dyn HandleSource>,
    observer: Option<Arc<dyn PathObserver>>,
}

impl PlatformAdapterBuilder {
    /// Fallback handle source (defaults to the global registry)
    pub fn fallback_handles(mut self, handles: Arc<dyn HandleSource>) -> Self {
        self.handles = handles;
        self
    }

    /// Path facility; without one the monitor capabilities are absent
    pub fn path_observer(mut self, observer: Arc<dyn PathObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn build(self) -> PlatformAdapter {
        let store = Arc::new(ConfigurationStore::new());
        let proxy = SystemProxyController::new(
            store.clone(),
            self.sink.clone(),
            self.policy.sink_timeout(),
        );
        let monitor = self.observer.map(|observer| {
            DefaultInterfaceMonitor::new(observer, self.policy.first_observation_timeout())
        });

        let mut capabilities = CapabilitySet::empty()
            .with(Capability::TunnelSetup)
            .with(Capability::SystemProxy)
            .with(Capability::ResolverCacheClear);
        if monitor.is_some() {
            capabilities = capabilities
                .with(Capability::DefaultInterfaceMonitor)
                .with(Capability::InterfaceSnapshot);
        }

        info!(
            "Platform adapter ready ({})",
            capabilities.iter().map(|c| c.name()).collect::<Vec<_>>().join(", ")
        );

        PlatformAdapter {
            builder: NetworkConfigurationBuilder::new(self.policy),
            sink: self.sink,
            handles: self.handles,
            store,
            proxy,
            monitor,
            capabilities,
        }
    }
}

/// Engine-facing platform integration
pub struct PlatformAdapter {
    builder: NetworkConfigurationBuilder,
    sink: Arc<dyn ConfigurationSink>,
    handles: Arc<dyn HandleSource>,
    store: Arc<ConfigurationStore>,
    proxy: SystemProxyController,
    monitor: Option<DefaultInterfaceMonitor>,
    capabilities: CapabilitySet,
}

impl PlatformAdapter {
    pub fn builder(sink: Arc<dyn ConfigurationSink>, policy: Policy) -> PlatformAdapterBuilder {
        PlatformAdapterBuilder {
            sink,
            policy,
            handles: Arc::new(GlobalHandleRegistry),
            observer: None,
        }
    }

    pub fn capabilities(&self) -> CapabilitySet {
        self.capabilities
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(capability)
    }

    /// Build and install the tunnel configuration, returning the
    /// data-plane handle
    pub fn open_tun(&self, options: Option<&TunOptions>) -> PlatformResult<TunnelHandle> {
        let handle = self
            .builder
            .build(options, self.sink.as_ref(), self.handles.as_ref(), &self.store)?;
        info!("Tunnel opened ({})", handle);
        Ok(handle)
    }

    /// Copy of the configuration currently applied
    pub fn configuration(&self) -> Option<NetworkConfiguration> {
        self.store.snapshot()
    }

    /// Start pushing default interface changes to `listener`; returns the
    /// first observation once the listener has seen it
    pub fn start_default_interface_monitor(
        &self,
        listener: Arc<dyn InterfaceListener>,
    ) -> PlatformResult<DefaultInterface> {
        self.monitor(Capability::DefaultInterfaceMonitor)?.start(listener)
    }

    pub fn close_default_interface_monitor(&self) -> PlatformResult<()> {
        self.monitor(Capability::DefaultInterfaceMonitor)?.cancel();
        Ok(())
    }

    pub fn get_interfaces(&self) -> PlatformResult<Vec<NetworkInterface>> {
        self.monitor(Capability::InterfaceSnapshot)?.get_interfaces()
    }

    pub fn system_proxy_status(&self) -> SystemProxyStatus {
        self.proxy.status()
    }

    pub fn set_system_proxy_enabled(&self, enabled: bool) -> PlatformResult<ProxyUpdate> {
        self.proxy.set_enabled(enabled)
    }

    pub fn clear_resolver_cache(&self) -> PlatformResult<CacheClear> {
        self.proxy.clear_resolver_cache()
    }

    /// Teardown: stop observing and discard the retained configuration
    pub fn close(&self) {
        if let Some(monitor) = &self.monitor {
            monitor.cancel();
        }
        self.store.discard();
        info!("Platform adapter closed");
    }

    fn monitor(&self, capability: Capability) -> PlatformResult<&DefaultInterfaceMonitor> {
        self.monitor
            .as_ref()
            .ok_or(PlatformError::Unsupported(capability))
    }
}
