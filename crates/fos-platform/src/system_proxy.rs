//! System Proxy Controller
//!
//! Runtime mutations of an already-applied configuration: toggling the
//! system HTTP/HTTPS proxy and forcing the OS resolver to drop its cache.
//! Neither tears the tunnel down.

use crate::error::PlatformResult;
use crate::sink::{self, ConfigurationSink};
use crate::store::ConfigurationStore;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// System proxy status as reported to the UI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SystemProxyStatus {
    /// A proxy server is configured
    pub available: bool,
    pub enabled: bool,
}

/// Outcome of a proxy toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyUpdate {
    /// Resubmitted with the new state
    Applied,
    /// Already in the requested state
    Unchanged,
    /// No configuration or no proxy server
    Unavailable,
}

/// Outcome of a resolver cache clear
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheClear {
    Cleared,
    /// No configuration applied
    Unavailable,
}

/// Marks the tunnel as reasserting until dropped
struct Reasserting<'a> {
    sink: &'a dyn ConfigurationSink,
}

impl<'a> Reasserting<'a> {
    fn begin(sink: &'a dyn ConfigurationSink) -> Self {
        debug!("Tunnel reasserting");
        sink.set_reasserting(true);
        Self { sink }
    }
}

impl Drop for Reasserting<'_> {
    fn drop(&mut self) {
        self.sink.set_reasserting(false);
        debug!("Tunnel reassert finished");
    }
}

/// Mutates the retained configuration after setup
pub struct SystemProxyController {
    store: Arc<ConfigurationStore>,
    sink: Arc<dyn ConfigurationSink>,
    sink_timeout: Duration,
}

impl SystemProxyController {
    pub fn new(
        store: Arc<ConfigurationStore>,
        sink: Arc<dyn ConfigurationSink>,
        sink_timeout: Duration,
    ) -> Self {
        Self {
            store,
            sink,
            sink_timeout,
        }
    }

    /// Reflects the last acknowledged configuration. Does not wait for an
    /// in-flight submission.
    pub fn status(&self) -> SystemProxyStatus {
        self.store
            .snapshot()
            .and_then(|config| config.proxy)
            .filter(|proxy| proxy.is_available())
            .map(|proxy| SystemProxyStatus {
                available: true,
                enabled: proxy.is_enabled(),
            })
            .unwrap_or_default()
    }

    /// Flip both proxy roles and resubmit the whole configuration.
    ///
    /// Asking for the current state is a no-op: a full reapplication is
    /// expensive and briefly disrupts traffic.
    pub fn set_enabled(&self, enabled: bool) -> PlatformResult<ProxyUpdate> {
        let exclusive = self.store.exclusive();

        let Some(config) = exclusive.get() else {
            return Ok(ProxyUpdate::Unavailable);
        };
        let Some(proxy) = config.proxy.as_ref().filter(|p| p.is_available()) else {
            return Ok(ProxyUpdate::Unavailable);
        };
        if proxy.is_enabled() == enabled {
            debug!("System proxy already {}", on_off(enabled));
            return Ok(ProxyUpdate::Unchanged);
        }

        let mut updated = config;
        if let Some(proxy) = updated.proxy.as_mut() {
            proxy.set_enabled(enabled);
        }

        sink::submit(self.sink.as_ref(), Some(updated.clone()), self.sink_timeout)?;
        exclusive.replace(Some(updated));

        info!("System proxy {}", on_off(enabled));
        Ok(ProxyUpdate::Applied)
    }

    /// Withdraw and immediately reapply the retained configuration, the
    /// only way to make the OS resolver forget entries tied to the previous
    /// DNS settings.
    ///
    /// If the withdrawal is acknowledged but the reapplication fails, the OS
    /// holds no configuration and none is retained either.
    pub fn clear_resolver_cache(&self) -> PlatformResult<CacheClear> {
        let exclusive = self.store.exclusive();
        let Some(config) = exclusive.get() else {
            return Ok(CacheClear::Unavailable);
        };

        let _reasserting = Reasserting::begin(self.sink.as_ref());
        sink::submit(self.sink.as_ref(), None, self.sink_timeout)?;
        if let Err(e) = sink::submit(self.sink.as_ref(), Some(config), self.sink_timeout) {
            exclusive.replace(None);
            warn!("Configuration withdrawn but not reapplied: {}", e);
            return Err(e);
        }

        info!("Resolver cache cleared");
        Ok(CacheClear::Cleared)
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "enabled" } else { "disabled" }
}
