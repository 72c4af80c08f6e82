//! Platform capability set
//!
//! The adapter declares up front which platform capabilities it carries.
//! Callers query the set instead of probing a capability and handling a
//! runtime failure.

use std::fmt;

/// A single optional platform capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    /// Build and install the tunnel network configuration
    TunnelSetup,
    /// Push default interface changes to the engine
    DefaultInterfaceMonitor,
    /// Point-in-time interface list
    InterfaceSnapshot,
    /// Toggle the system HTTP/HTTPS proxy at runtime
    SystemProxy,
    /// Withdraw and reapply the configuration to flush the OS resolver
    ResolverCacheClear,
    /// Map a connection to its owning process
    ConnectionOwnerLookup,
    /// Map a uid to a package name
    PackageNameLookup,
    /// Read the current Wi-Fi SSID/BSSID
    WifiState,
}

impl Capability {
    /// Every known capability
    pub fn all() -> &'static [Capability] {
        &[
            Capability::TunnelSetup,
            Capability::DefaultInterfaceMonitor,
            Capability::InterfaceSnapshot,
            Capability::SystemProxy,
            Capability::ResolverCacheClear,
            Capability::ConnectionOwnerLookup,
            Capability::PackageNameLookup,
            Capability::WifiState,
        ]
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Capability::TunnelSetup => "tunnel-setup",
            Capability::DefaultInterfaceMonitor => "default-interface-monitor",
            Capability::InterfaceSnapshot => "interface-snapshot",
            Capability::SystemProxy => "system-proxy",
            Capability::ResolverCacheClear => "resolver-cache-clear",
            Capability::ConnectionOwnerLookup => "connection-owner-lookup",
            Capability::PackageNameLookup => "package-name-lookup",
            Capability::WifiState => "wifi-state",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fixed set of capabilities, decided at construction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    bits: u16,
}

impl CapabilitySet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with(mut self, capability: Capability) -> Self {
        self.bits |= capability.bit();
        self
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.bits & capability.bit() != 0
    }

    /// Present capabilities, in declaration order
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::all().iter().copied().filter(|c| self.contains(*c))
    }

    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), CapabilitySet::with)
    }
}
