//! Retained configuration
//!
//! The configuration last acknowledged by the sink is the only mutable state
//! shared between tunnel setup, the proxy toggle and the resolver cache
//! clear. It is absent before setup, after teardown and after a withdrawal
//! that could not be undone.
//!
//! Every read-modify-submit sequence holds the submission lock across the
//! sink call, so submissions are serialized and a stale copy is never
//! applied over a newer one. The retained value has its own lock, held only
//! to copy or swap it, so readers never wait on the sink.

use crate::error::PlatformResult;
use crate::lock;
use crate::settings::NetworkConfiguration;
use crate::sink::{self, ConfigurationSink};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Default)]
pub struct ConfigurationStore {
    current: Mutex<Option<NetworkConfiguration>>,
    submission: Mutex<()>,
}

impl ConfigurationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the retained configuration
    pub fn snapshot(&self) -> Option<NetworkConfiguration> {
        lock(&self.current).clone()
    }

    pub fn is_present(&self) -> bool {
        lock(&self.current).is_some()
    }

    /// Submit `config` and retain it once acknowledged.
    ///
    /// On failure the previously retained configuration is kept.
    pub fn install(
        &self,
        config: NetworkConfiguration,
        sink: &dyn ConfigurationSink,
        timeout: Duration,
    ) -> PlatformResult<()> {
        let exclusive = self.exclusive();
        sink::submit(sink, Some(config.clone()), timeout)?;
        exclusive.replace(Some(config));
        Ok(())
    }

    /// Drop the retained configuration (teardown). Waits for an in-flight
    /// submission to finish.
    pub fn discard(&self) {
        if self.exclusive().replace(None).is_some() {
            debug!("Retained configuration discarded");
        }
    }

    /// Exclusive access for a read-modify-submit sequence
    pub(crate) fn exclusive(&self) -> Exclusive<'_> {
        Exclusive {
            store: self,
            _submission: lock(&self.submission),
        }
    }
}

/// Held across a read-modify-submit sequence
pub(crate) struct Exclusive<'a> {
    store: &'a ConfigurationStore,
    _submission: MutexGuard<'a, ()>,
}

impl Exclusive<'_> {
    pub(crate) fn get(&self) -> Option<NetworkConfiguration> {
        self.store.snapshot()
    }

    /// Swap the retained configuration, returning the previous one
    pub(crate) fn replace(
        &self,
        config: Option<NetworkConfiguration>,
    ) -> Option<NetworkConfiguration> {
        std::mem::replace(&mut *lock(&self.store.current), config)
    }
}
