//! The session file: which documents were open, and which one was active,
//! so the next launch can restore them. Grounded in the original
//! implementation's `RestoreLastSession`/`SaveSession` (`src/io/session.cpp`):
//! a flat list of absolute document paths plus the active one, persisted as
//! JSON next to the file history (§6: "Session file").

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ParseErrorKind, Result, SourceLocation, TactileError};
use crate::external::FileSystem;

const FORMAT_VERSION: u32 = 1;

/// The set of documents to reopen on the next launch, and which one was
/// active when the session was saved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    format_version: u32,
    open_documents: Vec<PathBuf>,
    active_document: Option<PathBuf>,
}

impl SessionState {
    pub fn new(open_documents: Vec<PathBuf>, active_document: Option<PathBuf>) -> Self {
        Self { format_version: FORMAT_VERSION, open_documents, active_document }
    }

    pub fn open_documents(&self) -> &[PathBuf] {
        &self.open_documents
    }

    pub fn active_document(&self) -> Option<&Path> {
        self.active_document.as_deref()
    }

    pub fn save(&self, path: &Path, fs: &dyn FileSystem) -> Result<()> {
        let text = serde_json::to_string_pretty(self).map_err(|e| TactileError::parse(ParseErrorKind::MissingField(e.to_string()), SourceLocation::new(path)))?;
        fs.write(path, text.as_bytes()).map_err(|_| TactileError::io(crate::error::IoErrorKind::WriteFailed(path.to_path_buf())))
    }

    /// Loads the session from `path`. Returns an empty session (no
    /// documents to reopen) if no session file exists yet, matching the
    /// original implementation's "could not locate a session file" case,
    /// which is a warning rather than a hard failure.
    pub fn load(path: &Path, fs: &dyn FileSystem) -> Result<Self> {
        if !fs.exists(path) {
            log::warn!("could not locate a session file at '{}'", path.display());
            return Ok(Self::default());
        }
        let bytes = fs.read(path).map_err(|_| TactileError::io(crate::error::IoErrorKind::FileNotFound(path.to_path_buf())))?;
        serde_json::from_slice(&bytes).map_err(|e| TactileError::parse(ParseErrorKind::MissingField(e.to_string()), SourceLocation::new(path)))
    }
}

/// Absolute persisted location of the session file, alongside [`crate::history::default_path`].
pub fn default_path(config_dir: &Path) -> PathBuf {
    config_dir.join("session.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::MemoryFileSystem;

    #[test]
    fn round_trips_open_documents_and_active_one() {
        let state = SessionState::new(vec![PathBuf::from("a.tactile"), PathBuf::from("b.tactile")], Some(PathBuf::from("b.tactile")));
        let fs = MemoryFileSystem::new();
        let path = Path::new("session.json");
        state.save(path, &fs).unwrap();
        let reloaded = SessionState::load(path, &fs).unwrap();
        assert_eq!(reloaded, state);
    }

    #[test]
    fn missing_session_file_loads_as_empty() {
        let fs = MemoryFileSystem::new();
        let state = SessionState::load(Path::new("session.json"), &fs).unwrap();
        assert!(state.open_documents().is_empty());
        assert!(state.active_document().is_none());
    }
}
