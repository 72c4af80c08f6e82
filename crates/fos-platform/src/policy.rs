//! Tunnel Policy
//!
//! Caller-supplied flags that live for the whole process, plus the bounds
//! placed on OS calls that are not guaranteed to return.

use crate::error::{PlatformError, PlatformResult};
use crate::routes::RoutePolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Policy flags and timeouts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    /// Replace the literal default route with its sub-range decomposition
    pub use_sub_range_default_route: bool,
    /// Carve the two-address foot block out of IPv4 routing
    pub exclude_default_route: bool,
    /// Carve the auxiliary service block (and domain) out of the tunnel
    pub exclude_auxiliary_service_route: bool,
    /// Enable the system HTTP/HTTPS proxy roles when a descriptor is present
    pub system_proxy_enabled: bool,
    /// Upper bound on a single sink submission
    pub sink_timeout_ms: u64,
    /// Upper bound on the monitor's first observation
    pub first_observation_timeout_ms: u64,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            use_sub_range_default_route: false,
            exclude_default_route: false,
            exclude_auxiliary_service_route: false,
            system_proxy_enabled: false,
            sink_timeout_ms: 30_000,
            first_observation_timeout_ms: 10_000,
        }
    }
}

impl Policy {
    /// Load from TOML file
    pub fn from_toml_file(path: &Path) -> PlatformResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PlatformError::InvalidPolicy(format!("{}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    /// Load from TOML string
    pub fn from_toml(content: &str) -> PlatformResult<Self> {
        toml::from_str(content).map_err(|e| PlatformError::InvalidPolicy(e.to_string()))
    }

    /// Load from JSON string
    pub fn from_json(content: &str) -> PlatformResult<Self> {
        serde_json::from_str(content).map_err(|e| PlatformError::InvalidPolicy(e.to_string()))
    }

    pub fn sink_timeout(&self) -> Duration {
        Duration::from_millis(self.sink_timeout_ms)
    }

    pub fn first_observation_timeout(&self) -> Duration {
        Duration::from_millis(self.first_observation_timeout_ms)
    }

    /// The route-related subset of the policy
    pub fn route_policy(&self) -> RoutePolicy {
        RoutePolicy {
            use_sub_ranges: self.use_sub_range_default_route,
            exclude_default_route: self.exclude_default_route,
            exclude_auxiliary_service_route: self.exclude_auxiliary_service_route,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let policy = Policy::default();
        assert!(!policy.system_proxy_enabled);
        assert_eq!(policy.sink_timeout(), Duration::from_secs(30));
        assert_eq!(policy.first_observation_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_partial_toml() {
        let policy = Policy::from_toml(
            r#"
            use_sub_range_default_route = true
            exclude_auxiliary_service_route = true
            sink_timeout_ms = 500
            "#,
        )
        .unwrap();

        assert!(policy.use_sub_range_default_route);
        assert!(policy.exclude_auxiliary_service_route);
        assert!(!policy.exclude_default_route);
        assert_eq!(policy.sink_timeout(), Duration::from_millis(500));
        assert_eq!(policy.first_observation_timeout_ms, 10_000);
    }

    #[test]
    fn test_json() {
        let policy = Policy::from_json(r#"{ "system_proxy_enabled": true }"#).unwrap();
        assert!(policy.system_proxy_enabled);
    }

    #[test]
    fn test_invalid_toml() {
        let result = Policy::from_toml("use_sub_range_default_route = \"yes\"");
        assert!(matches!(result, Err(PlatformError::InvalidPolicy(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = Policy::from_toml_file(Path::new("/nonexistent/fos-policy.toml"));
        assert!(matches!(result, Err(PlatformError::InvalidPolicy(_))));
    }
}
