//! Watcher module for keeping executable directory listings fresh
//!
//! Uses `notify` (inotify on Linux) to observe create, delete and rename
//! events in each registered directory and folds them into the `PathIndex`.

mod directory;
mod error;
mod event;

pub use directory::DirectoryWatcher;
