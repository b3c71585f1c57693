//! Mutex-guarded mapping of directory path to the filenames it contains
//!
//! Filenames keep discovery/event order, not sorted order. Every access,
//! reads included, goes through the same lock; callers only ever receive
//! owned copies.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

/// Owned copy of the whole index
pub type Snapshot = BTreeMap<String, Vec<String>>;

/// Direction of a single filename change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Created or renamed into the directory
    Added,
    /// Deleted or renamed out of the directory
    Removed,
}

/// One filename change inside one registered directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub dir: String,
    pub name: String,
    pub kind: ChangeKind,
}

impl Change {
    pub fn added(dir: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            name: name.into(),
            kind: ChangeKind::Added,
        }
    }

    pub fn removed(dir: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            name: name.into(),
            kind: ChangeKind::Removed,
        }
    }
}

/// What happened when a change was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ApplyOutcome {
    Applied,
    /// Name was already listed; append skipped
    Duplicate,
    /// Name was not listed; removal skipped
    Missing,
    /// Directory was never registered
    UnknownDirectory,
}

/// Shared handle to the path index. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct PathIndex {
    inner: Arc<Mutex<Snapshot>>,
}

impl PathIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install (or replace) the listing for a directory
    pub fn insert_listing(&self, dir: impl Into<String>, names: Vec<String>) {
        let mut names = names;
        dedup_preserving_order(&mut names);
        self.inner.lock().insert(dir.into(), names);
    }

    /// Replace several listings under one lock acquisition
    pub fn replace_listings(&self, listings: Vec<(String, Vec<String>)>) {
        let mut map = self.inner.lock();
        for (dir, mut names) in listings {
            dedup_preserving_order(&mut names);
            map.insert(dir, names);
        }
    }

    /// Copy of one directory's filenames
    pub fn get(&self, dir: &str) -> Option<Vec<String>> {
        self.inner.lock().get(dir).cloned()
    }

    /// Copy of the whole index
    pub fn snapshot(&self) -> Snapshot {
        self.inner.lock().clone()
    }

    pub fn directory_count(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn file_count(&self) -> usize {
        self.inner.lock().values().map(Vec::len).sum()
    }

    /// Apply a whole batch atomically with respect to readers.
    ///
    /// Returns the number of changes that actually modified the index.
    pub fn apply_batch(&self, changes: &[Change]) -> usize {
        let mut map = self.inner.lock();
        let mut applied = 0;

        for change in changes {
            match apply_change(&mut map, change) {
                ApplyOutcome::Applied => applied += 1,
                ApplyOutcome::Duplicate => {
                    debug!(dir = %change.dir, name = %change.name, "name already indexed, skipping append");
                }
                ApplyOutcome::Missing => {
                    warn!(
                        dir = %change.dir,
                        name = %change.name,
                        "index inconsistency: removal for a name that is not indexed, skipping"
                    );
                }
                ApplyOutcome::UnknownDirectory => {
                    debug!(dir = %change.dir, "change for unregistered directory ignored");
                }
            }
        }

        applied
    }

    /// Filenames starting with `prefix`, as `(directory, filename)` pairs in index order
    pub fn candidates(&self, prefix: &str, limit: usize) -> Vec<(String, String)> {
        let map = self.inner.lock();
        map.iter()
            .flat_map(|(dir, names)| {
                names
                    .iter()
                    .filter(|name| name.starts_with(prefix))
                    .map(move |name| (dir.clone(), name.clone()))
            })
            .take(limit)
            .collect()
    }
}

/// Apply a single change to an index map
fn apply_change(map: &mut Snapshot, change: &Change) -> ApplyOutcome {
    let Some(names) = map.get_mut(&change.dir) else {
        return ApplyOutcome::UnknownDirectory;
    };

    match change.kind {
        ChangeKind::Added => {
            if names.iter().any(|n| n == &change.name) {
                ApplyOutcome::Duplicate
            } else {
                names.push(change.name.clone());
                ApplyOutcome::Applied
            }
        }
        ChangeKind::Removed => match names.iter().position(|n| n == &change.name) {
            Some(pos) => {
                names.remove(pos);
                ApplyOutcome::Applied
            }
            None => ApplyOutcome::Missing,
        },
    }
}

/// Read a directory's entry names in the order the filesystem returns them
pub fn list_directory(path: &Path) -> std::io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    Ok(names)
}

fn dedup_preserving_order(names: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    names.retain(|n| seen.insert(n.clone()));
}
