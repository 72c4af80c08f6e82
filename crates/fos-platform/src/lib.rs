//! fOS Platform - Tunnel Platform Integration
//!
//! The boundary between the packet-processing tunnel engine and the host
//! network stack. Translates the engine's tunnel options into the routing,
//! DNS and proxy state the OS installs, and reports the OS's default
//! network path back to the engine.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  TunOptions   ┌──────────────────────────────────────┐
//! │    Tunnel    │──────────────▶│           PlatformAdapter            │
//! │    Engine    │◀──────────────│                                      │
//! └──────────────┘ handle, iface │  Builder ─▶ Store ◀─ ProxyController │
//!        ▲                       │     │         │            │         │
//!        │ default interface     │     ▼         ▼            ▼         │
//!        │                       │  ┌──────────────────────────────┐    │
//!        └───────────────────────┤  │      Configuration Sink      │    │
//!             Monitor ◀── OS path│  └──────────────────────────────┘    │
//!                                └──────────────────────────────────────┘
//! ```
//!
//! # Features
//!
//! - **Sub-range default route**: eight discrete prefixes instead of a
//!   literal catch-all, with foot-block and auxiliary service carve-outs
//! - **Blocking first observation**: the monitor returns the default
//!   interface synchronously, then delivers changes asynchronously
//! - **Runtime proxy toggle**: flips the system proxy without tearing the
//!   tunnel down
//! - **Resolver cache clear**: withdraw/reapply cycle under a reasserting mark

mod adapter;
mod builder;
mod capability;
mod error;
mod monitor;
mod options;
mod policy;
mod proxy;
mod routes;
mod settings;
mod sink;
mod store;
mod system_proxy;

#[cfg(test)]
mod testing;

pub use adapter::{PlatformAdapter, PlatformAdapterBuilder};
pub use builder::NetworkConfigurationBuilder;
pub use capability::{Capability, CapabilitySet};
pub use error::{PlatformError, PlatformResult};
pub use monitor::{
    DefaultInterface, DefaultInterfaceMonitor, InterfaceListener, InterfaceType,
    NetworkInterface, NetworkPath, PathObserver, PathStatus, PathUpdateHandler,
};
pub use options::{HttpProxyOptions, TunOptions, DEFAULT_MTU};
pub use policy::Policy;
pub use proxy::{ProxyConfigBuilder, ProxyServer, ProxySettings, AUXILIARY_SERVICE_DOMAIN};
pub use routes::{
    compute_routes, RouteFamily, RoutePolicy, RouteSet, RouteSetComputer,
    AUXILIARY_SERVICE_V4, DEFAULT_ROUTE_FOOT_V4, SUB_RANGE_COUNT,
};
pub use settings::{
    DnsSettings, FamilySettings, Ipv4Settings, Ipv6Settings, NetworkConfiguration,
    TUNNEL_REMOTE_ADDRESS,
};
pub use sink::{
    clear_fallback_handle, register_fallback_handle, resolve_handle, submit, Completion,
    ConfigurationSink, GlobalHandleRegistry, HandleSource, TunnelHandle,
};
pub use store::ConfigurationStore;
pub use system_proxy::{CacheClear, ProxyUpdate, SystemProxyController, SystemProxyStatus};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock, recovering from poisoning. Every guarded value here is replaced
/// whole, so a panicked holder cannot leave it half-written.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
