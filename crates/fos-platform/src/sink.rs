//! Configuration Sink
//!
//! The OS facility that installs a [`NetworkConfiguration`] into the live
//! routing, DNS and proxy tables. Installation is asynchronous on the OS
//! side; [`submit`] turns it into a blocking call with an upper bound,
//! since acknowledgment is not guaranteed in finite time.

use crate::error::{PlatformError, PlatformResult};
use crate::settings::NetworkConfiguration;
use crossbeam_channel::{RecvTimeoutError, Sender};
use std::fmt;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;
use tracing::{debug, error, info};

/// Data-plane handle of the tunnel (a raw descriptor)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TunnelHandle(i32);

impl TunnelHandle {
    /// `None` for negative descriptors
    pub fn new(raw: i32) -> Option<Self> {
        (raw >= 0).then_some(Self(raw))
    }

    pub fn raw(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for TunnelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fd {}", self.0)
    }
}

/// One-shot acknowledgment handed to [`ConfigurationSink::apply`]
pub struct Completion {
    tx: Sender<Result<(), String>>,
}

impl Completion {
    pub fn complete(self, result: Result<(), String>) {
        // Receiver gone means the submitter already timed out
        let _ = self.tx.send(result);
    }

    pub fn succeed(self) {
        self.complete(Ok(()));
    }

    pub fn fail(self, reason: impl Into<String>) {
        self.complete(Err(reason.into()));
    }
}

/// OS configuration installer, as seen from the platform layer
pub trait ConfigurationSink: Send + Sync {
    /// Install `config`, or withdraw the installed one when `None`.
    ///
    /// `completion` must be called once, from any thread.
    fn apply(&self, config: Option<NetworkConfiguration>, completion: Completion);

    /// Mark routing as transiently unstable for dependents
    fn set_reasserting(&self, reasserting: bool);

    /// Descriptor behind the sink's packet flow, if it exposes one
    fn packet_flow_handle(&self) -> Option<TunnelHandle>;
}

/// Submit to the sink and wait for its answer, at most `timeout`.
///
/// A rejection is surfaced unchanged and never retried: the same input
/// reproduces the same conflict.
pub fn submit(
    sink: &dyn ConfigurationSink,
    config: Option<NetworkConfiguration>,
    timeout: Duration,
) -> PlatformResult<()> {
    let action = if config.is_some() { "apply" } else { "withdraw" };
    let (tx, rx) = crossbeam_channel::bounded(1);

    debug!("Submitting configuration ({})", action);
    sink.apply(config, Completion { tx });

    match rx.recv_timeout(timeout) {
        Ok(Ok(())) => {
            debug!("Configuration {} acknowledged", action);
            Ok(())
        }
        Ok(Err(reason)) => {
            error!("Configuration {} rejected: {}", action, reason);
            Err(PlatformError::SinkRejected(reason))
        }
        Err(RecvTimeoutError::Timeout) => {
            error!("Configuration {} not acknowledged within {:?}", action, timeout);
            Err(PlatformError::SinkTimeout(timeout))
        }
        Err(RecvTimeoutError::Disconnected) => {
            error!("Configuration {} dropped without an answer", action);
            Err(PlatformError::SinkRejected(
                "completion dropped without a result".into(),
            ))
        }
    }
}

/// Fallback source for the tunnel handle
pub trait HandleSource: Send + Sync {
    fn fallback_handle(&self) -> Option<TunnelHandle>;
}

static REGISTERED_HANDLE: AtomicI32 = AtomicI32::new(-1);

/// Register the engine's global fallback handle
pub fn register_fallback_handle(handle: TunnelHandle) {
    REGISTERED_HANDLE.store(handle.raw(), Ordering::SeqCst);
}

pub fn clear_fallback_handle() {
    REGISTERED_HANDLE.store(-1, Ordering::SeqCst);
}

/// Reads the handle registered with [`register_fallback_handle`]
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalHandleRegistry;

impl HandleSource for GlobalHandleRegistry {
    fn fallback_handle(&self) -> Option<TunnelHandle> {
        TunnelHandle::new(REGISTERED_HANDLE.load(Ordering::SeqCst))
    }
}

/// Packet flow first, then the fallback source
pub fn resolve_handle(
    sink: &dyn ConfigurationSink,
    fallback: &dyn HandleSource,
) -> PlatformResult<TunnelHandle> {
    if let Some(handle) = sink.packet_flow_handle() {
        info!("Tunnel handle resolved from packet flow ({})", handle);
        return Ok(handle);
    }
    if let Some(handle) = fallback.fallback_handle() {
        info!("Tunnel handle resolved from fallback registry ({})", handle);
        return Ok(handle);
    }
    error!("No tunnel handle from packet flow or fallback registry");
    Err(PlatformError::HandleUnavailable)
}
