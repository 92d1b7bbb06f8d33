//! Path policy for texture and file-property paths: stored relative to the
//! map file's directory with forward slashes, resolved against that
//! directory and canonicalized on load (§4.7).

use std::path::{Path, PathBuf};

use crate::error::{ParseErrorKind, Result, SourceLocation, TactileError};
use crate::external::FileSystem;

/// Renders `target` relative to `base_dir`, using forward slashes
/// regardless of platform — the on-disk format is platform-independent.
pub fn to_relative(base_dir: &Path, target: &Path) -> PathBuf {
    let relative = pathdiff(base_dir, target).unwrap_or_else(|| target.to_path_buf());
    let as_forward_slash = relative.components().map(|c| c.as_os_str().to_string_lossy().into_owned()).collect::<Vec<_>>().join("/");
    PathBuf::from(as_forward_slash)
}

fn pathdiff(base: &Path, target: &Path) -> Option<PathBuf> {
    let base: Vec<_> = base.components().collect();
    let target: Vec<_> = target.components().collect();
    let common = base.iter().zip(target.iter()).take_while(|(a, b)| a == b).count();

    let mut result = PathBuf::new();
    for _ in common..base.len() {
        result.push("..");
    }
    for component in &target[common..] {
        result.push(component.as_os_str());
    }
    Some(result)
}

/// Resolves a path stored relative to `base_dir` back to a real, existing
/// file, canonicalizing it through `fs`. A texture/file path that does not
/// resolve is a hard error — callers for Tiled dialects that want the
/// "recoverable warning, fall back to placeholder" behavior from §4.7
/// should catch this themselves rather than propagate it.
pub fn resolve(base_dir: &Path, relative: &Path, fs: &dyn FileSystem, map_path: &Path) -> Result<PathBuf> {
    let joined = base_dir.join(relative);
    if !fs.exists(&joined) {
        return Err(TactileError::parse(ParseErrorKind::ImageNotFound(joined), SourceLocation::new(map_path)));
    }
    fs.canonicalize(&joined).map_err(|_| TactileError::parse(ParseErrorKind::ImageNotFound(joined), SourceLocation::new(map_path)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::MemoryFileSystem;

    #[test]
    fn relative_path_uses_forward_slashes_and_parent_refs() {
        let base = Path::new("/maps/world");
        let target = Path::new("/maps/tilesets/grass.png");
        assert_eq!(to_relative(base, target), PathBuf::from("../tilesets/grass.png"));
    }

    #[test]
    fn resolve_rejects_missing_files() {
        let fs = MemoryFileSystem::new();
        let result = resolve(Path::new("/maps"), Path::new("tiles.png"), &fs, Path::new("/maps/world.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn resolve_succeeds_for_existing_files() {
        let mut fs = MemoryFileSystem::new();
        fs.write(Path::new("/maps/tiles.png"), b"png").unwrap();
        let resolved = resolve(Path::new("/maps"), Path::new("tiles.png"), &fs, Path::new("/maps/world.yaml")).unwrap();
        assert_eq!(resolved, PathBuf::from("/maps/tiles.png"));
    }
}
