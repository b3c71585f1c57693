//! Dedicated background thread with a cooperative stop flag
//!
//! Both listeners run on a `Worker`. The loop polls its `StopToken`
//! between bounded waits; `Worker` joins the thread on `join()` or drop.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Lifecycle of a background listener loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerState {
    NotStarted,
    Running,
    StopRequested,
    Stopped,
}

impl ListenerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ListenerState::NotStarted,
            1 => ListenerState::Running,
            2 => ListenerState::StopRequested,
            _ => ListenerState::Stopped,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            ListenerState::NotStarted => 0,
            ListenerState::Running => 1,
            ListenerState::StopRequested => 2,
            ListenerState::Stopped => 3,
        }
    }
}

impl std::fmt::Display for ListenerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerState::NotStarted => write!(f, "NotStarted"),
            ListenerState::Running => write!(f, "Running"),
            ListenerState::StopRequested => write!(f, "StopRequested"),
            ListenerState::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Read-only view of a worker's state, cheap to clone
#[derive(Debug, Clone)]
pub struct StateHandle(Arc<AtomicU8>);

impl StateHandle {
    pub fn get(&self) -> ListenerState {
        ListenerState::from_u8(self.0.load(Ordering::SeqCst))
    }
}

/// Handed to the loop so it can observe stop requests
#[derive(Debug, Clone)]
pub struct StopToken(Arc<AtomicU8>);

impl StopToken {
    pub fn is_stop_requested(&self) -> bool {
        ListenerState::from_u8(self.0.load(Ordering::SeqCst)) != ListenerState::Running
    }
}

/// Errors that can occur when starting a worker
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("{0} is already running")]
    AlreadyRunning(&'static str),

    #[error("failed to spawn {name} thread: {source}")]
    ThreadSpawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Owns one background thread
pub struct Worker {
    name: &'static str,
    state: Arc<AtomicU8>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Arc::new(AtomicU8::new(ListenerState::NotStarted.as_u8())),
            handle: None,
        }
    }

    pub fn state(&self) -> ListenerState {
        ListenerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn state_handle(&self) -> StateHandle {
        StateHandle(Arc::clone(&self.state))
    }

    /// Spawn the loop. Only valid from `NotStarted`.
    pub fn spawn<F>(&mut self, body: F) -> Result<(), WorkerError>
    where
        F: FnOnce(StopToken) + Send + 'static,
    {
        if self
            .state
            .compare_exchange(
                ListenerState::NotStarted.as_u8(),
                ListenerState::Running.as_u8(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_err()
        {
            return Err(WorkerError::AlreadyRunning(self.name));
        }

        let token = StopToken(Arc::clone(&self.state));
        let state = Arc::clone(&self.state);
        let name = self.name;

        let spawned = thread::Builder::new().name(name.to_string()).spawn(move || {
            info!(thread = name, "listener thread started");
            body(token);
            state.store(ListenerState::Stopped.as_u8(), Ordering::SeqCst);
            info!(thread = name, "listener thread stopped");
        });

        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                Ok(())
            }
            Err(source) => {
                self.state
                    .store(ListenerState::NotStarted.as_u8(), Ordering::SeqCst);
                Err(WorkerError::ThreadSpawn { name, source })
            }
        }
    }

    /// Request the loop to exit. Does not block; safe to call repeatedly.
    pub fn stop(&self) {
        let requested = self
            .state
            .compare_exchange(
                ListenerState::Running.as_u8(),
                ListenerState::StopRequested.as_u8(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok();
        if requested {
            debug!(thread = self.name, "stop requested");
        }
    }

    /// Request stop and wait for the thread to exit
    pub fn join(&mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!(thread = self.name, "listener thread panicked");
            }
            self.state
                .store(ListenerState::Stopped.as_u8(), Ordering::SeqCst);
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn polling_body(token: StopToken) {
        while !token.is_stop_requested() {
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_initial_state() {
        let worker = Worker::new("test-worker");
        assert_eq!(worker.state(), ListenerState::NotStarted);
    }

    #[test]
    fn test_start_stop_join() {
        let mut worker = Worker::new("test-worker");
        worker.spawn(polling_body).unwrap();
        assert_eq!(worker.state(), ListenerState::Running);

        worker.stop();
        assert!(matches!(
            worker.state(),
            ListenerState::StopRequested | ListenerState::Stopped
        ));

        worker.join();
        assert_eq!(worker.state(), ListenerState::Stopped);
    }

    #[test]
    fn test_stop_is_idempotent_and_bounded() {
        let mut worker = Worker::new("test-worker");
        worker.spawn(polling_body).unwrap();

        let started = Instant::now();
        for _ in 0..5 {
            worker.stop();
        }
        worker.join();
        worker.stop();
        worker.join();

        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(worker.state(), ListenerState::Stopped);
    }

    #[test]
    fn test_stop_before_start_is_noop() {
        let worker = Worker::new("test-worker");
        worker.stop();
        assert_eq!(worker.state(), ListenerState::NotStarted);
    }

    #[test]
    fn test_double_spawn_rejected() {
        let mut worker = Worker::new("test-worker");
        worker.spawn(polling_body).unwrap();
        let result = worker.spawn(polling_body);
        assert!(matches!(result, Err(WorkerError::AlreadyRunning(_))));
    }

    #[test]
    fn test_loop_exit_marks_stopped() {
        let mut worker = Worker::new("test-worker");
        let handle = worker.state_handle();
        worker.spawn(|_token| {}).unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while handle.get() != ListenerState::Stopped && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(handle.get(), ListenerState::Stopped);
        worker.join();
    }

    #[test]
    fn test_drop_joins_thread() {
        let finished = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = Arc::clone(&finished);
        {
            let mut worker = Worker::new("test-worker");
            worker
                .spawn(move |token| {
                    polling_body(token);
                    flag.store(true, Ordering::SeqCst);
                })
                .unwrap();
        }
        assert!(finished.load(Ordering::SeqCst));
    }
}
