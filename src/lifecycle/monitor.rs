//! Lifecycle controller for the two background listeners
//!
//! Owns the directory watcher and the optional hotkey listener, starts
//! both, and on shutdown requests stop on both before joining either, so
//! teardown waits at most about one poll interval.

use std::path::Path;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::events::{ListenerKind, MonitorEvent, Notifier};
use crate::hotkey::{HotkeyError, HotkeyListener, KeySession, X11Session};
use crate::index::PathIndex;
use crate::watcher::DirectoryWatcher;

use super::worker::{ListenerState, StateHandle};

/// Outcome of `Monitor::start`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartReport {
    /// Directories with an installed watch; `None` if the watcher failed to start
    pub watched: Option<usize>,
    pub hotkey_running: bool,
}

/// Read-only view for status reporting, safe to hand to other tasks
#[derive(Debug, Clone)]
pub struct MonitorStatus {
    pub index: PathIndex,
    pub binding: Option<String>,
    watcher: StateHandle,
    hotkey: Option<StateHandle>,
}

impl MonitorStatus {
    pub fn watcher_state(&self) -> ListenerState {
        self.watcher.get()
    }

    /// `None` when no hotkey listener was configured
    pub fn hotkey_state(&self) -> Option<ListenerState> {
        self.hotkey.as_ref().map(StateHandle::get)
    }
}

/// Starts, stops and joins the directory watcher and hotkey listener
pub struct Monitor<S: KeySession = X11Session> {
    watcher: DirectoryWatcher,
    hotkey: Option<HotkeyListener<S>>,
    notifier: Notifier,
    poll_interval: Duration,
}

impl<S: KeySession> Monitor<S> {
    /// Create a monitor and the receiver the consumer loop drains
    pub fn new(poll_interval: Duration) -> (Self, mpsc::UnboundedReceiver<MonitorEvent>) {
        let (notifier, rx) = Notifier::channel();
        let watcher = DirectoryWatcher::new(PathIndex::new(), notifier.clone(), poll_interval);
        let monitor = Self {
            watcher,
            hotkey: None,
            notifier,
            poll_interval,
        };
        (monitor, rx)
    }

    /// Register every directory in `dirs`; returns how many were accepted
    pub fn register_directories<I, P>(&mut self, dirs: I) -> usize
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        dirs.into_iter()
            .filter(|dir| self.watcher.register(dir))
            .count()
    }

    /// Attach a hotkey listener on `session` and bind `combo`.
    ///
    /// Returns whether a grab was installed. The listener is kept either
    /// way so a session without a binding is still owned and released.
    pub fn bind_hotkey(&mut self, session: S, combo: &str) -> Result<bool, HotkeyError> {
        let mut listener = HotkeyListener::new(session, self.notifier.clone(), self.poll_interval);
        let bound = listener.bind(combo)?;
        self.hotkey = Some(listener);
        Ok(bound)
    }

    pub fn index(&self) -> &PathIndex {
        self.watcher.index()
    }

    pub fn status(&self) -> MonitorStatus {
        MonitorStatus {
            index: self.watcher.index().clone(),
            binding: self
                .hotkey
                .as_ref()
                .and_then(HotkeyListener::binding)
                .map(ToString::to_string),
            watcher: self.watcher.state_handle(),
            hotkey: self.hotkey.as_ref().map(HotkeyListener::state_handle),
        }
    }

    /// Start both listeners.
    ///
    /// A listener that fails to start is logged and reported as
    /// `ListenerFailed`; the other one keeps going.
    pub fn start(&mut self) -> StartReport {
        let watched = match self.watcher.start() {
            Ok(count) => Some(count),
            Err(e) => {
                error!(error = %e, "failed to start directory watcher");
                self.notifier.failed(ListenerKind::Watcher, e.to_string());
                None
            }
        };

        let hotkey_running = match self.hotkey.as_mut() {
            Some(listener) => match listener.start() {
                Ok(()) => true,
                Err(e) => {
                    error!(error = %e, "failed to start hotkey listener");
                    self.notifier.failed(ListenerKind::Hotkey, e.to_string());
                    false
                }
            },
            None => {
                warn!("no hotkey listener configured");
                false
            }
        };

        info!(
            ?watched,
            watcher = %self.watcher.state(),
            hotkey_running,
            "monitor started"
        );
        StartReport {
            watched,
            hotkey_running,
        }
    }

    /// Request both loops to exit. Does not block; safe to call repeatedly.
    pub fn stop(&self) {
        self.watcher.stop();
        if let Some(listener) = &self.hotkey {
            listener.stop();
        }
    }

    /// Stop both loops and wait until both threads have exited
    pub fn shutdown(&mut self) {
        self.stop();
        self.watcher.join();
        if let Some(listener) = self.hotkey.as_mut() {
            listener.join();
        }
        info!("monitor shut down");
    }
}

impl<S: KeySession> Drop for Monitor<S> {
    fn drop(&mut self) {
        self.stop();
        self.watcher.join();
        if let Some(listener) = self.hotkey.as_mut() {
            listener.join();
        }
    }
}
