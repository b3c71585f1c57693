//! Translation of raw `notify` events into path index changes.

use std::path::{Path, PathBuf};

use notify::event::{ModifyKind, RenameMode};
use notify::EventKind;

use crate::index::{Change, ChangeKind};

/// The subset of filesystem event kinds the index cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsEventKind {
    Created,
    Deleted,
    RenamedFrom,
    RenamedTo,
    /// Both halves of a rename in one notice. The halves arrive separately too.
    RenamedBoth,
    /// Rename with unknown direction.
    RenamedAny,
    /// Anything else (content writes, metadata, access).
    Other,
}

impl From<&EventKind> for FsEventKind {
    fn from(kind: &EventKind) -> Self {
        match kind {
            EventKind::Create(_) => Self::Created,
            EventKind::Remove(_) => Self::Deleted,
            EventKind::Modify(ModifyKind::Name(rename)) => match rename {
                RenameMode::From => Self::RenamedFrom,
                RenameMode::To => Self::RenamedTo,
                RenameMode::Both => Self::RenamedBoth,
                _ => Self::RenamedAny,
            },
            _ => Self::Other,
        }
    }
}

/// Directories under observation.
///
/// Each entry is a canonical directory with every index key registered for
/// it. Two search path entries that resolve to the same directory (`/bin`
/// and `/usr/bin` on a merged-usr system) share one watch and one entry.
#[derive(Debug, Clone, Default)]
pub struct WatchSet {
    entries: Vec<(PathBuf, Vec<String>)>,
}

impl WatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `key` under the canonical directory `dir`.
    ///
    /// Returns false if `key` was already registered.
    pub fn insert(&mut self, dir: PathBuf, key: String) -> bool {
        if self.entries.iter().any(|(_, keys)| keys.contains(&key)) {
            return false;
        }
        match self.entries.iter_mut().find(|(p, _)| *p == dir) {
            Some((_, keys)) => keys.push(key),
            None => self.entries.push((dir, vec![key])),
        }
        true
    }

    /// Number of registered keys
    pub fn len(&self) -> usize {
        self.entries.iter().map(|(_, keys)| keys.len()).sum()
    }

    /// Canonical directories with their keys, one item per directory to watch
    pub fn iter(&self) -> impl Iterator<Item = (&Path, &[String])> {
        self.entries
            .iter()
            .map(|(p, keys)| (p.as_path(), keys.as_slice()))
    }

    /// Index keys registered for a canonical directory
    pub fn keys_for(&self, dir: &Path) -> &[String] {
        self.entries
            .iter()
            .find(|(p, _)| p == dir)
            .map(|(_, keys)| keys.as_slice())
            .unwrap_or_default()
    }

    fn route<'a>(&'a self, path: &Path, kind: ChangeKind) -> impl Iterator<Item = Change> + 'a {
        let target = path
            .parent()
            .zip(path.file_name())
            .map(|(dir, name)| (self.keys_for(dir), name.to_string_lossy().into_owned()));
        target.into_iter().flat_map(move |(keys, name)| {
            keys.iter().map(move |key| Change {
                dir: key.clone(),
                name: name.clone(),
                kind,
            })
        })
    }
}

/// Index changes implied by one notify event, in delivery order
pub fn changes_from_event(event: &notify::Event, watch_set: &WatchSet) -> Vec<Change> {
    let kind = FsEventKind::from(&event.kind);

    event
        .paths
        .iter()
        .flat_map(|path| {
            let change_kind = match kind {
                FsEventKind::Created | FsEventKind::RenamedTo => ChangeKind::Added,
                FsEventKind::Deleted | FsEventKind::RenamedFrom => ChangeKind::Removed,
                FsEventKind::RenamedAny => {
                    if path.symlink_metadata().is_ok() {
                        ChangeKind::Added
                    } else {
                        ChangeKind::Removed
                    }
                }
                FsEventKind::RenamedBoth | FsEventKind::Other => return Vec::new(),
            };
            watch_set.route(path, change_kind).collect::<Vec<_>>()
        })
        .collect()
}
