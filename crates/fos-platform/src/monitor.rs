//! Default Interface Monitor
//!
//! Watches the OS's default network path and reports it to the engine.
//!
//! # Two-phase start
//!
//! [`DefaultInterfaceMonitor::start`] blocks until the first observation has
//! been delivered to the listener and returns it, so the engine has a
//! default-interface answer as soon as start returns. Every later
//! observation goes through a dedicated delivery thread and never blocks the
//! OS queue or any caller.
//!
//! ```text
//! OS path queue ──▶ handler ──▶ channel ──▶ delivery thread ──▶ listener
//!                                                │
//!                         first observation ◀────┘ (unblocks start)
//! ```
//!
//! [`DefaultInterfaceMonitor::cancel`] joins the delivery thread: once it
//! returns, no callback fires.

use crate::error::{PlatformError, PlatformResult};
use crate::lock;
use crossbeam_channel::{select, Receiver, RecvTimeoutError, Sender};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Interface kind, as far as the engine cares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum InterfaceType {
    WiFi,
    Cellular,
    Ethernet,
    Other,
}

/// An interface reported by the path facility
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkInterface {
    pub name: String,
    pub index: i32,
    pub kind: InterfaceType,
}

impl NetworkInterface {
    pub fn new(name: impl Into<String>, index: i32, kind: InterfaceType) -> Self {
        Self {
            name: name.into(),
            index,
            kind,
        }
    }
}

/// Path status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStatus {
    Satisfied,
    Unsatisfied,
    /// Usable once a connection is brought up (e.g. on-demand cellular)
    RequiresConnection,
}

/// One update from the path facility
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkPath {
    pub status: PathStatus,
    /// Preferred interface first
    pub available_interfaces: Vec<NetworkInterface>,
    pub is_expensive: bool,
    pub is_constrained: bool,
}

impl NetworkPath {
    pub fn unsatisfied() -> Self {
        Self {
            status: PathStatus::Unsatisfied,
            available_interfaces: Vec::new(),
            is_expensive: false,
            is_constrained: false,
        }
    }

    pub fn satisfied(available_interfaces: Vec<NetworkInterface>) -> Self {
        Self {
            status: PathStatus::Satisfied,
            available_interfaces,
            is_expensive: false,
            is_constrained: false,
        }
    }
}

/// Callback the path facility invokes on its own queue
pub type PathUpdateHandler = Arc<dyn Fn(NetworkPath) + Send + Sync>;

/// OS path-observation facility
pub trait PathObserver: Send + Sync {
    /// Begin observing. The facility calls `handler` for the current path
    /// and again on every change.
    fn start(&self, handler: PathUpdateHandler);

    /// Stop observing and drop the handler
    fn cancel(&self);

    /// Latest path, if the facility has produced one
    fn current_path(&self) -> Option<NetworkPath>;
}

/// The engine's view of the default interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DefaultInterface {
    pub name: String,
    pub index: i32,
    pub is_expensive: bool,
    pub is_constrained: bool,
}

impl DefaultInterface {
    /// Index of the "no interface" sentinel
    pub const NO_INDEX: i32 = -1;

    /// No usable default interface
    pub fn none() -> Self {
        Self {
            name: String::new(),
            index: Self::NO_INDEX,
            is_expensive: false,
            is_constrained: false,
        }
    }

    pub fn is_none(&self) -> bool {
        self.index == Self::NO_INDEX
    }

    /// The first available interface of a satisfied path is the default.
    ///
    /// A satisfied path with no interfaces is reported as no interface.
    pub fn from_path(path: &NetworkPath) -> Self {
        if path.status != PathStatus::Satisfied {
            return Self::none();
        }
        match path.available_interfaces.first() {
            Some(interface) => Self {
                name: interface.name.clone(),
                index: interface.index,
                is_expensive: path.is_expensive,
                is_constrained: path.is_constrained,
            },
            None => {
                warn!("Satisfied network path without available interfaces, reporting none");
                Self::none()
            }
        }
    }
}

/// Receives default interface updates
pub trait InterfaceListener: Send + Sync {
    fn update_default_interface(&self, interface: &DefaultInterface);
}

impl<F> InterfaceListener for F
where
    F: Fn(&DefaultInterface) + Send + Sync,
{
    fn update_default_interface(&self, interface: &DefaultInterface) {
        self(interface)
    }
}

struct Subscription {
    active: Arc<AtomicBool>,
    /// Dropped to stop the delivery thread
    shutdown: Sender<()>,
    delivery: thread::JoinHandle<()>,
}

/// Observes the default network path for the engine
pub struct DefaultInterfaceMonitor {
    observer: Arc<dyn PathObserver>,
    first_observation_timeout: Duration,
    subscription: Mutex<Option<Subscription>>,
    current: Arc<Mutex<Option<DefaultInterface>>>,
}

impl DefaultInterfaceMonitor {
    pub fn new(observer: Arc<dyn PathObserver>, first_observation_timeout: Duration) -> Self {
        Self {
            observer,
            first_observation_timeout,
            subscription: Mutex::new(None),
            current: Arc::new(Mutex::new(None)),
        }
    }

    /// Start observing and block until `listener` has received the first
    /// observation, which is also returned.
    ///
    /// A monitor that is already observing is cancelled first, so only one
    /// listener is ever active. A concurrent [`cancel`](Self::cancel) ends
    /// the wait early with [`PlatformError::NotStarted`].
    pub fn start(&self, listener: Arc<dyn InterfaceListener>) -> PlatformResult<DefaultInterface> {
        if self.is_observing() {
            warn!("Default interface monitor restarted while observing");
            self.cancel();
        }

        let active = Arc::new(AtomicBool::new(true));
        let (update_tx, update_rx) = crossbeam_channel::unbounded();
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(0);
        let (first_tx, first_rx) = crossbeam_channel::bounded(1);

        let delivery = {
            let active = active.clone();
            let current = self.current.clone();
            thread::Builder::new()
                .name("default-interface-monitor".to_string())
                .spawn(move || {
                    debug!("Default interface delivery started");
                    run_delivery_loop(update_rx, shutdown_rx, first_tx, listener, current, active);
                    debug!("Default interface delivery stopped");
                })
                .expect("Failed to spawn default interface monitor thread")
        };

        *lock(&self.subscription) = Some(Subscription {
            active: active.clone(),
            shutdown: shutdown_tx,
            delivery,
        });

        self.observer.start(Arc::new(move |path: NetworkPath| {
            if !active.load(Ordering::Acquire) {
                return;
            }
            // Unbounded: the OS queue never waits on the listener
            let _ = update_tx.send(DefaultInterface::from_path(&path));
        }));

        match first_rx.recv_timeout(self.first_observation_timeout) {
            Ok(first) => {
                info!(
                    "Default interface monitor started ({} index {})",
                    display_name(&first),
                    first.index
                );
                Ok(first)
            }
            Err(RecvTimeoutError::Disconnected) => {
                info!("Default interface monitor cancelled before first observation");
                Err(PlatformError::NotStarted)
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "No network path observation within {:?}",
                    self.first_observation_timeout
                );
                self.cancel();
                Err(PlatformError::FirstObservationTimeout(
                    self.first_observation_timeout,
                ))
            }
        }
    }

    /// Stop observing and clear state. No listener callback fires after
    /// this returns (unless called from inside the callback itself).
    pub fn cancel(&self) {
        let Some(subscription) = lock(&self.subscription).take() else {
            return;
        };

        subscription.active.store(false, Ordering::Release);
        self.observer.cancel();
        drop(subscription.shutdown);

        if subscription.delivery.thread().id() != thread::current().id() {
            let _ = subscription.delivery.join();
        }

        *lock(&self.current) = None;
        info!("Default interface monitor cancelled");
    }

    pub fn is_observing(&self) -> bool {
        lock(&self.subscription).is_some()
    }

    /// The observation currently held
    pub fn current(&self) -> Option<DefaultInterface> {
        lock(&self.current).clone()
    }

    /// Point-in-time interface list; empty when the path is not satisfied
    pub fn get_interfaces(&self) -> PlatformResult<Vec<NetworkInterface>> {
        if !self.is_observing() {
            return Err(PlatformError::NotStarted);
        }

        match self.observer.current_path() {
            Some(path) if path.status == PathStatus::Satisfied => Ok(path.available_interfaces),
            _ => Ok(Vec::new()),
        }
    }
}

impl Drop for DefaultInterfaceMonitor {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn run_delivery_loop(
    updates: Receiver<DefaultInterface>,
    shutdown: Receiver<()>,
    first: Sender<DefaultInterface>,
    listener: Arc<dyn InterfaceListener>,
    current: Arc<Mutex<Option<DefaultInterface>>>,
    active: Arc<AtomicBool>,
) {
    let mut first = Some(first);

    loop {
        let interface = select! {
            recv(updates) -> msg => match msg {
                Ok(interface) => interface,
                Err(_) => break,
            },
            recv(shutdown) -> _ => break,
        };

        if !active.load(Ordering::Acquire) {
            break;
        }

        debug!(
            "Default interface update: {} index {} (expensive: {}, constrained: {})",
            display_name(&interface),
            interface.index,
            interface.is_expensive,
            interface.is_constrained
        );

        *lock(&current) = Some(interface.clone());
        listener.update_default_interface(&interface);

        if let Some(first) = first.take() {
            let _ = first.send(interface);
        }
    }
}

fn display_name(interface: &DefaultInterface) -> &str {
    if interface.is_none() {
        "<none>"
    } else {
        &interface.name
    }
}
