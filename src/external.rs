//! External collaborators the core depends on but never implements itself:
//! texture loading and filesystem access. Grounded in the teacher's
//! `ResourceCache`/`DefaultResourceCache` pattern (`src/cache.rs`) — a trait
//! plus one obvious in-memory implementation, so the core stays testable
//! without a real windowing/rendering backend or disk.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// An opaque handle to a texture uploaded by a [`TextureLoader`]. The core
/// never inspects its value; it only threads handles through to the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u64);

/// Loads image files into renderable textures. Implemented by the shell
/// (e.g. against a GPU backend); the core only calls through this trait so
/// it never depends on a windowing or rendering crate.
pub trait TextureLoader {
    fn load(&mut self, path: &Path) -> Result<TextureHandle>;
    fn unload(&mut self, handle: TextureHandle);
    fn size_of(&self, handle: TextureHandle) -> Option<(u32, u32)>;
}

/// A [`TextureLoader`] that hands out monotonically increasing handles
/// without touching the filesystem, for tests and headless batch operations
/// that never render a map.
#[derive(Debug, Default)]
pub struct NullTextureLoader {
    next: u64,
    sizes: HashMap<TextureHandle, (u32, u32)>,
}

impl NullTextureLoader {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TextureLoader for NullTextureLoader {
    fn load(&mut self, _path: &Path) -> Result<TextureHandle> {
        let handle = TextureHandle(self.next);
        self.next += 1;
        self.sizes.insert(handle, (0, 0));
        Ok(handle)
    }

    fn unload(&mut self, handle: TextureHandle) {
        self.sizes.remove(&handle);
    }

    fn size_of(&self, handle: TextureHandle) -> Option<(u32, u32)> {
        self.sizes.get(&handle).copied()
    }
}

/// Filesystem access, abstracted so the core's serialization code can be
/// exercised against an in-memory filesystem in tests instead of real
/// paths on disk.
pub trait FileSystem {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;
    fn exists(&self, path: &Path) -> bool;
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;
}

/// The shell's real filesystem, delegating directly to [`std::fs`].
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        std::fs::write(path, bytes)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        std::fs::canonicalize(path)
    }
}

/// An in-memory [`FileSystem`], backed by a `HashMap<PathBuf, Vec<u8>>` —
/// the teacher's `DefaultResourceCache` texture: a `HashMap`-backed stand-in
/// usable from tests without touching real disk.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: HashMap<PathBuf, Vec<u8>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FileSystem for MemoryFileSystem {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.files.get(path).cloned().ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        self.files.insert(path.to_path_buf(), bytes.to_vec());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        if self.files.contains_key(path) {
            Ok(path.to_path_buf())
        } else {
            Err(io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_texture_loader_hands_out_distinct_handles() {
        let mut loader = NullTextureLoader::new();
        let a = loader.load(Path::new("a.png")).unwrap();
        let b = loader.load(Path::new("b.png")).unwrap();
        assert_ne!(a, b);
        loader.unload(a);
        assert!(loader.size_of(a).is_none());
    }

    #[test]
    fn memory_filesystem_round_trips_written_files() {
        let mut fs = MemoryFileSystem::new();
        let path = PathBuf::from("map.tactile");
        assert!(!fs.exists(&path));
        fs.write(&path, b"hello").unwrap();
        assert!(fs.exists(&path));
        assert_eq!(fs.read(&path).unwrap(), b"hello");
    }

    #[test]
    fn memory_filesystem_read_missing_file_errors() {
        let fs = MemoryFileSystem::new();
        assert!(fs.read(Path::new("missing.txt")).is_err());
    }
}
