//! Test doubles for the OS-facing seams.

use crate::lock;
use crate::monitor::{NetworkPath, PathObserver, PathUpdateHandler};
use crate::settings::NetworkConfiguration;
use crate::sink::{Completion, ConfigurationSink, HandleSource, TunnelHandle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

/// How the recording sink answers
#[derive(Debug, Clone)]
pub enum SinkBehavior {
    Accept,
    /// Acknowledge from another thread after a delay
    AcceptLater(Duration),
    Reject(String),
    /// Accept withdrawals, reject every configuration
    RejectInstalls(String),
    /// Keep the completion and never answer
    Hang,
    /// Drop the completion without answering
    Drop,
}

pub struct RecordingSink {
    behavior: Mutex<SinkBehavior>,
    applied: Mutex<Vec<Option<NetworkConfiguration>>>,
    reasserting: Mutex<Vec<bool>>,
    held: Mutex<Vec<Completion>>,
    packet_flow: Option<TunnelHandle>,
}

impl RecordingSink {
    pub fn new(behavior: SinkBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            applied: Mutex::new(Vec::new()),
            reasserting: Mutex::new(Vec::new()),
            held: Mutex::new(Vec::new()),
            packet_flow: None,
        }
    }

    pub fn with_packet_flow(mut self, handle: Option<TunnelHandle>) -> Self {
        self.packet_flow = handle;
        self
    }

    pub fn set_behavior(&self, behavior: SinkBehavior) {
        *lock(&self.behavior) = behavior;
    }

    /// Every submission, in order (`None` = withdraw)
    pub fn applied(&self) -> Vec<Option<NetworkConfiguration>> {
        lock(&self.applied).clone()
    }

    pub fn last_applied(&self) -> Option<NetworkConfiguration> {
        lock(&self.applied).last().cloned().flatten()
    }

    pub fn reasserting_transitions(&self) -> Vec<bool> {
        lock(&self.reasserting).clone()
    }
}

impl ConfigurationSink for RecordingSink {
    fn apply(&self, config: Option<NetworkConfiguration>, completion: Completion) {
        let withdraw = config.is_none();
        lock(&self.applied).push(config);

        let behavior = lock(&self.behavior).clone();
        match behavior {
            SinkBehavior::Accept => completion.succeed(),
            SinkBehavior::AcceptLater(delay) => {
                thread::spawn(move || {
                    thread::sleep(delay);
                    completion.succeed();
                });
            }
            SinkBehavior::Reject(reason) => completion.fail(reason),
            SinkBehavior::RejectInstalls(_) if withdraw => completion.succeed(),
            SinkBehavior::RejectInstalls(reason) => completion.fail(reason),
            SinkBehavior::Hang => lock(&self.held).push(completion),
            SinkBehavior::Drop => drop(completion),
        }
    }

    fn set_reasserting(&self, reasserting: bool) {
        lock(&self.reasserting).push(reasserting);
    }

    fn packet_flow_handle(&self) -> Option<TunnelHandle> {
        self.packet_flow
    }
}

/// Fallback source returning a fixed answer
pub struct FixedHandle(pub Option<TunnelHandle>);

impl HandleSource for FixedHandle {
    fn fallback_handle(&self) -> Option<TunnelHandle> {
        self.0
    }
}

/// Path observer driven by the test, delivering from its own threads like
/// an OS queue
pub struct ScriptedPathObserver {
    handler: Mutex<Option<PathUpdateHandler>>,
    current: Mutex<Option<NetworkPath>>,
    starts: AtomicUsize,
}

impl ScriptedPathObserver {
    /// `initial` is delivered on every start; `None` never delivers
    pub fn new(initial: Option<NetworkPath>) -> Self {
        Self {
            handler: Mutex::new(None),
            current: Mutex::new(initial),
            starts: AtomicUsize::new(0),
        }
    }

    /// Change the path and deliver it to the registered handler
    pub fn push(&self, path: NetworkPath) {
        *lock(&self.current) = Some(path.clone());
        let handler = lock(&self.handler).clone();
        if let Some(handler) = handler {
            let _ = thread::spawn(move || handler(path)).join();
        }
    }

    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }
}

impl PathObserver for ScriptedPathObserver {
    fn start(&self, handler: PathUpdateHandler) {
        self.starts.fetch_add(1, Ordering::SeqCst);
        *lock(&self.handler) = Some(handler.clone());

        if let Some(path) = lock(&self.current).clone() {
            thread::spawn(move || handler(path));
        }
    }

    fn cancel(&self) {
        *lock(&self.handler) = None;
    }

    fn current_path(&self) -> Option<NetworkPath> {
        lock(&self.current).clone()
    }
}
