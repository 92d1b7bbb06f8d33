//! The recently-opened-files list: an MRU deque capped at a fixed size,
//! persisted between runs. Grounded in the original implementation's
//! `io::load_file_history`/`add_file_to_history` (`app/io/persist/history.cpp`):
//! paths are stored as forward-slash strings, the most recently used entry
//! moves to the front, and the deque is capped rather than grown unbounded.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::external::FileSystem;

/// Entries beyond this count are dropped, oldest first.
pub const MAX_ENTRIES: usize = 10;

fn to_forward_slashes(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// The recently-opened-document list plus the last file closed, persisted
/// as JSON (§6: "Persisted state").
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileHistory {
    entries: VecDeque<String>,
    last_closed: Option<String>,
}

impl FileHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every entry, most recently used first.
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn last_closed_file(&self) -> Option<&str> {
        self.last_closed.as_deref()
    }

    /// Moves `path` to the front if already present, otherwise inserts it
    /// there, then truncates to [`MAX_ENTRIES`].
    pub fn add(&mut self, path: &Path) {
        let converted = to_forward_slashes(path);
        if let Some(position) = self.entries.iter().position(|p| *p == converted) {
            self.entries.remove(position);
        }
        log::debug!("adding '{converted}' to file history");
        self.entries.push_front(converted);
        self.entries.truncate(MAX_ENTRIES);
    }

    /// Records `path` as the last closed file and adds it to the history.
    pub fn set_last_closed(&mut self, path: &Path) {
        let converted = to_forward_slashes(path);
        log::trace!("last closed file is now '{converted}'");
        self.add(path);
        self.last_closed = Some(converted);
    }

    pub fn clear(&mut self) {
        log::debug!("clearing file history");
        self.entries.clear();
    }

    /// Drops every entry whose path doesn't exist on `fs`, e.g. a moved or
    /// deleted map file from a previous run.
    pub fn retain_existing(&mut self, fs: &dyn FileSystem) {
        self.entries.retain(|entry| fs.exists(Path::new(entry)));
        if let Some(last) = &self.last_closed {
            if !fs.exists(Path::new(last)) {
                self.last_closed = None;
            }
        }
    }

    pub fn save(&self, path: &Path, fs: &dyn FileSystem) -> Result<()> {
        let text = serde_json::to_string_pretty(self).map_err(|e| crate::error::TactileError::parse(crate::error::ParseErrorKind::MissingField(e.to_string()), crate::error::SourceLocation::new(path)))?;
        fs.write(path, text.as_bytes()).map_err(|_| crate::error::TactileError::io(crate::error::IoErrorKind::WriteFailed(path.to_path_buf())))
    }

    /// Loads the history from `path`, returning an empty history if the file
    /// doesn't exist yet — the normal state on a first run.
    pub fn load(path: &Path, fs: &dyn FileSystem) -> Result<Self> {
        if !fs.exists(path) {
            log::debug!("no file history at '{}', starting fresh", path.display());
            return Ok(Self::default());
        }
        let bytes = fs.read(path).map_err(|_| crate::error::TactileError::io(crate::error::IoErrorKind::FileNotFound(path.to_path_buf())))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| crate::error::TactileError::parse(crate::error::ParseErrorKind::MissingField(e.to_string()), crate::error::SourceLocation::new(path)))
    }
}

/// Absolute persisted location of the history file, mirroring the original
/// implementation's `persistent_file_dir() / "history.bin"` (here JSON, to
/// match this crate's other persisted-state files).
pub fn default_path(config_dir: &Path) -> PathBuf {
    config_dir.join("history.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::MemoryFileSystem;

    #[test]
    fn adding_an_existing_entry_moves_it_to_front() {
        let mut history = FileHistory::new();
        history.add(Path::new("a.tactile"));
        history.add(Path::new("b.tactile"));
        history.add(Path::new("a.tactile"));
        assert_eq!(history.entries().collect::<Vec<_>>(), vec!["a.tactile", "b.tactile"]);
    }

    #[test]
    fn caps_at_max_entries() {
        let mut history = FileHistory::new();
        for i in 0..MAX_ENTRIES + 5 {
            history.add(Path::new(&format!("map-{i}.tactile")));
        }
        assert_eq!(history.entries().count(), MAX_ENTRIES);
        assert_eq!(history.entries().next(), Some(format!("map-{}.tactile", MAX_ENTRIES + 4)).as_deref());
    }

    #[test]
    fn round_trips_through_json() {
        let mut history = FileHistory::new();
        history.set_last_closed(Path::new("last.tactile"));
        let fs = MemoryFileSystem::new();
        let path = Path::new("history.json");
        history.save(path, &fs).unwrap();
        let reloaded = FileHistory::load(path, &fs).unwrap();
        assert_eq!(reloaded, history);
    }

    #[test]
    fn retain_existing_drops_missing_paths() {
        let fs = MemoryFileSystem::new();
        fs.write(Path::new("kept.tactile"), b"data").unwrap();
        let mut history = FileHistory::new();
        history.add(Path::new("kept.tactile"));
        history.add(Path::new("gone.tactile"));
        history.retain_existing(&fs);
        assert_eq!(history.entries().collect::<Vec<_>>(), vec!["kept.tactile"]);
    }
}
