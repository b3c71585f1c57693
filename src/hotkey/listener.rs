//! Global hotkey listener using X11 passive key grabs
//!
//! The grab restricts delivery to the bound combination, so every
//! key-press the session reports is treated as an activation. Runs on a
//! dedicated thread that polls the session with a bounded sleep so a stop
//! request is observed within one poll interval.

use std::thread;
use std::time::Duration;

use tracing::{debug, error, info, warn};
use x11rb::errors::{ConnectError, ConnectionError, ReplyError};

use crate::events::{ListenerKind, MonitorEvent, Notifier};
use crate::lifecycle::{ListenerState, StateHandle, StopToken, Worker, WorkerError};

use super::keys::{parse_combo, HotkeyBinding};
use super::session::{InputEvent, KeySession, X11Session};

const THREAD_NAME: &str = "hotkey-listener";

/// Errors that can occur in the hotkey listener
#[derive(Debug, thiserror::Error)]
pub enum HotkeyError {
    #[error("unable to open display: {0}")]
    Connect(#[from] ConnectError),

    #[error("display connection failed: {0}")]
    Connection(#[from] ConnectionError),

    #[error("X11 request failed: {0}")]
    Reply(#[from] ReplyError),

    #[error("display has no screen {0}")]
    NoScreen(usize),

    #[error("session already handed to the listener thread")]
    SessionInUse,

    #[error(transparent)]
    Worker(#[from] WorkerError),
}

/// Listener owning one key grab on the display session
pub struct HotkeyListener<S: KeySession = X11Session> {
    /// Moved into the loop thread on start
    session: Option<S>,
    binding: Option<HotkeyBinding>,
    notifier: Notifier,
    poll_interval: Duration,
    worker: Worker,
}

impl<S: KeySession> HotkeyListener<S> {
    /// Create a new hotkey listener
    pub fn new(session: S, notifier: Notifier, poll_interval: Duration) -> Self {
        Self {
            session: Some(session),
            binding: None,
            notifier,
            poll_interval,
            worker: Worker::new(THREAD_NAME),
        }
    }

    /// Parse `combo` and grab it on the session.
    ///
    /// Returns `Ok(false)` without grabbing anything when the string has no
    /// `+` or names a key the keyboard cannot produce. A previous binding
    /// is released first; only one binding is active at a time.
    pub fn bind(&mut self, combo: &str) -> Result<bool, HotkeyError> {
        let session = self.session.as_mut().ok_or(HotkeyError::SessionInUse)?;

        let Some(parsed) = parse_combo(combo) else {
            info!(combo, "hotkey string has no key segment, nothing bound");
            return Ok(false);
        };
        let Some(keycode) = session.keycode_for(parsed.keysym)? else {
            warn!(combo, "hotkey key is not on the current keyboard, nothing bound");
            return Ok(false);
        };
        let numlock = session.numlock_mask()?;

        if let Some(previous) = self.binding.take() {
            release(session, &previous);
        }

        let binding = HotkeyBinding::new(parsed, keycode, numlock);
        for mask in binding.grab_masks() {
            session.grab(keycode, mask)?;
        }

        info!(binding = %binding, keycode, "hotkey grabbed");
        self.binding = Some(binding);
        Ok(true)
    }

    pub fn binding(&self) -> Option<&HotkeyBinding> {
        self.binding.as_ref()
    }

    /// Start the listener
    ///
    /// Spawns the dedicated event thread; the session moves with it.
    pub fn start(&mut self) -> Result<(), HotkeyError> {
        if self.worker.state() != ListenerState::NotStarted {
            return Err(WorkerError::AlreadyRunning(THREAD_NAME).into());
        }
        let session = self.session.take().ok_or(HotkeyError::SessionInUse)?;

        let binding = self.binding;
        let notifier = self.notifier.clone();
        let poll_interval = self.poll_interval;

        self.worker.spawn(move |token| {
            run_event_loop(session, binding, &notifier, poll_interval, &token);
        })?;
        Ok(())
    }

    /// Request the loop to exit. Does not block.
    pub fn stop(&self) {
        self.worker.stop();
    }

    /// Request stop and wait for the loop thread to exit
    pub fn join(&mut self) {
        self.worker.join();
    }

    pub fn state(&self) -> ListenerState {
        self.worker.state()
    }

    pub fn state_handle(&self) -> StateHandle {
        self.worker.state_handle()
    }
}

fn release<S: KeySession>(session: &mut S, binding: &HotkeyBinding) {
    for mask in binding.grab_masks() {
        if let Err(e) = session.ungrab(binding.keycode, mask) {
            debug!(error = %e, "failed to release key grab");
            return;
        }
    }
    debug!(binding = %binding, "hotkey released");
}

fn run_event_loop<S: KeySession>(
    mut session: S,
    binding: Option<HotkeyBinding>,
    notifier: &Notifier,
    poll_interval: Duration,
    token: &StopToken,
) {
    while !token.is_stop_requested() {
        match session.poll_event() {
            Ok(Some(InputEvent::KeyPress { keycode, state })) => {
                debug!(keycode, state = state.bits(), "hotkey pressed");
                notifier.notify(MonitorEvent::Activated);
            }
            Ok(Some(InputEvent::Other)) => {}
            Ok(None) => thread::sleep(poll_interval),
            Err(e) => {
                error!(error = %e, "hotkey event loop failed");
                notifier.failed(ListenerKind::Hotkey, e.to_string());
                break;
            }
        }
    }

    if let Some(binding) = binding {
        release(&mut session, &binding);
    }
}
