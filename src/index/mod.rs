//! Path index module
//!
//! Holds the directory -> filenames mapping shared between the directory
//! watcher thread and the consumer.

mod path_index;

pub use path_index::{list_directory, Change, ChangeKind, PathIndex, Snapshot};
