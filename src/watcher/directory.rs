//! Directory watcher keeping the path index in sync with the filesystem.
//!
//! Watches are installed non-recursively on every registered directory.
//! A dedicated thread waits for `notify` events with a bounded timeout,
//! drains everything available, applies the whole batch to the index
//! under one lock and raises a single `PathsChanged`.

use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, error, info, warn};

use crate::events::{ListenerKind, MonitorEvent, Notifier};
use crate::index::{list_directory, PathIndex};
use crate::lifecycle::{ListenerState, StateHandle, StopToken, Worker};

use super::error::Result;
use super::event::{changes_from_event, WatchSet};

type EventReceiver = Receiver<notify::Result<notify::Event>>;

/// Watches a fixed set of directories and maintains their listings.
///
/// Directories can only be registered before `start()`. Dropping the
/// watcher stops the loop and joins its thread.
pub struct DirectoryWatcher {
    index: PathIndex,
    watch_set: WatchSet,
    notifier: Notifier,
    poll_interval: Duration,
    worker: Worker,
}

impl DirectoryWatcher {
    pub fn new(index: PathIndex, notifier: Notifier, poll_interval: Duration) -> Self {
        Self {
            index,
            watch_set: WatchSet::new(),
            notifier,
            poll_interval,
            worker: Worker::new("directory-watcher"),
        }
    }

    /// Add a directory and take its initial listing.
    ///
    /// Returns false if `path` is not a directory or the loop has already
    /// been started.
    pub fn register(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();

        if self.worker.state() != ListenerState::NotStarted {
            warn!(path = %path.display(), "cannot register directory after watcher start");
            return false;
        }
        if !path.is_dir() {
            debug!(path = %path.display(), "not a directory, skipping");
            return false;
        }

        let canonical = match std::fs::canonicalize(path) {
            Ok(canonical) => canonical,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to resolve directory");
                return false;
            }
        };

        let key = path.to_string_lossy().into_owned();
        if !self.watch_set.insert(canonical.clone(), key.clone()) {
            debug!(path = %path.display(), "directory already registered");
            return true;
        }
        if canonical != path {
            debug!(path = %path.display(), canonical = %canonical.display(), "directory resolved");
        }

        let names = match list_directory(&canonical) {
            Ok(names) => names,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to list directory");
                Vec::new()
            }
        };
        debug!(path = %path.display(), files = names.len(), "directory registered");
        self.index.insert_listing(key, names);

        true
    }

    pub fn index(&self) -> &PathIndex {
        &self.index
    }

    pub fn directory_count(&self) -> usize {
        self.watch_set.len()
    }

    pub fn state(&self) -> ListenerState {
        self.worker.state()
    }

    pub fn state_handle(&self) -> StateHandle {
        self.worker.state_handle()
    }

    /// Install watches and start the background loop.
    ///
    /// Returns the number of directories actually being watched. Keys that
    /// resolve to the same directory share one watch. A directory whose
    /// watch cannot be installed is logged and skipped.
    pub fn start(&mut self) -> Result<usize> {
        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(tx)?;

        let mut installed = 0;
        for (path, _) in self.watch_set.iter() {
            match watcher.watch(path, RecursiveMode::NonRecursive) {
                Ok(()) => {
                    debug!(path = %path.display(), "watching directory");
                    installed += 1;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to watch directory, skipping");
                }
            }
        }

        self.spawn_loop(Some(watcher), rx)?;
        info!(
            watched = installed,
            registered = self.watch_set.len(),
            "directory watcher started"
        );
        Ok(installed)
    }

    /// Request the loop to exit. Does not block.
    pub fn stop(&self) {
        self.worker.stop();
    }

    /// Request stop and wait for the loop thread to exit
    pub fn join(&mut self) {
        self.worker.join();
    }

    fn spawn_loop(&mut self, watcher: Option<RecommendedWatcher>, events: EventReceiver) -> Result<()> {
        let watch_loop = WatchLoop {
            index: self.index.clone(),
            watch_set: self.watch_set.clone(),
            notifier: self.notifier.clone(),
            poll_interval: self.poll_interval,
        };

        self.worker.spawn(move |token| {
            // Dropping the watcher closes the inotify handle.
            let _watcher = watcher;
            watch_loop.run(&events, &token);
        })?;
        Ok(())
    }
}

struct WatchLoop {
    index: PathIndex,
    watch_set: WatchSet,
    notifier: Notifier,
    poll_interval: Duration,
}

impl WatchLoop {
    fn run(&self, events: &EventReceiver, token: &StopToken) {
        while !token.is_stop_requested() {
            let first = match events.recv_timeout(self.poll_interval) {
                Ok(event) => event,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    error!("filesystem notification channel closed, watcher exiting");
                    self.notifier.failed(
                        ListenerKind::Watcher,
                        "filesystem notification channel closed",
                    );
                    return;
                }
            };

            let mut batch = vec![first];
            batch.extend(events.try_iter());

            if self.process_batch(batch) {
                self.notifier.notify(MonitorEvent::PathsChanged);
            }
        }
    }

    /// Apply one drained batch. Returns true if the batch was relevant to the index.
    fn process_batch(&self, batch: Vec<notify::Result<notify::Event>>) -> bool {
        let mut changes = Vec::new();
        let mut rescan = false;

        for item in batch {
            match item {
                Ok(event) => {
                    if event.need_rescan() {
                        rescan = true;
                    }
                    changes.extend(changes_from_event(&event, &self.watch_set));
                }
                Err(e) => warn!(error = %e, "filesystem notification error"),
            }
        }

        if rescan {
            self.rescan();
            return true;
        }
        if changes.is_empty() {
            return false;
        }

        let applied = self.index.apply_batch(&changes);
        debug!(events = changes.len(), applied, "applied filesystem batch");
        true
    }

    /// Events were dropped by the transport; re-read every listing.
    fn rescan(&self) {
        warn!("filesystem events were dropped, rescanning watched directories");
        let listings = self
            .watch_set
            .iter()
            .flat_map(|(path, keys)| match list_directory(path) {
                Ok(names) => keys
                    .iter()
                    .map(|key| (key.clone(), names.clone()))
                    .collect(),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "rescan failed");
                    Vec::new()
                }
            })
            .collect();
        self.index.replace_listings(listings);
    }
}
