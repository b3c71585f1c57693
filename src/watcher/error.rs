//! Error types for the directory watcher.

use thiserror::Error;

use crate::lifecycle::WorkerError;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, WatchError>;

/// Errors that can occur in the directory watcher.
#[derive(Error, Debug)]
pub enum WatchError {
    /// The filesystem notification transport could not be created.
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    /// The watcher thread could not be started.
    #[error(transparent)]
    Worker(#[from] WorkerError),
}
