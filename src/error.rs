//! Error types for the map-editing core.
//!
//! Parsing and I/O failures are ordinary [`Result`]s; invalid entity ids and
//! other programmer mistakes are assertions (see [`LogicError`]) rather than
//! values threaded through `Result`, per the split described in the crate's
//! design notes.

use std::fmt;
use std::path::PathBuf;

/// The result type returned by fallible core operations.
pub type Result<T> = std::result::Result<T, TactileError>;

/// Where a parse error occurred, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// The file being parsed.
    pub path: PathBuf,
    /// The line number, if the underlying format reports one.
    pub line: Option<u32>,
}

impl SourceLocation {
    /// Creates a location with no line information.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), line: None }
    }

    /// Creates a location with an associated line number.
    pub fn with_line(path: impl Into<PathBuf>, line: u32) -> Self {
        Self { path: path.into(), line: Some(line) }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{line}", self.path.display()),
            None => write!(f, "{}", self.path.display()),
        }
    }
}

/// The specific kind of parse failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("missing field `{0}`")]
    MissingField(String),
    #[error("field `{field}` had the wrong type, expected {expected}")]
    WrongType { field: String, expected: &'static str },
    #[error("invalid value for enum `{name}`: `{value}`")]
    InvalidEnum { name: &'static str, value: String },
    #[error("external tileset not found: {0}")]
    ExternalTilesetNotFound(PathBuf),
    #[error("external tileset could not be read: {0}")]
    ExternalTilesetUnreadable(PathBuf),
    #[error("image not found: {0}")]
    ImageNotFound(PathBuf),
    #[error("corrupt tile data")]
    CorruptTileData,
    #[error("unknown compression scheme: `{0}`")]
    UnknownCompression(String),
    #[error("unknown tile encoding: `{0}`")]
    UnknownEncoding(String),
    #[error("unsupported format version: `{0}`")]
    UnsupportedVersion(String),
}

/// The specific kind of I/O failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IoErrorKind {
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("write failed: {0}")]
    WriteFailed(PathBuf),
}

/// The specific kind of (de)compression failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompressionErrorKind {
    #[error("zlib round-trip failed: {0}")]
    Zlib(String),
    #[error("zstd round-trip failed: {0}")]
    Zstd(String),
}

/// The top-level error type returned by serialization and I/O operations.
///
/// Logic errors (invalid ids, wrong entity kind, bounds violations) are
/// deliberately absent from this enum: per the core's error design, those are
/// programmer mistakes that the dispatcher is responsible for preventing
/// before a command is pushed, and surface as assertions (see
/// [`assert_logic`]) instead of recoverable results.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TactileError {
    /// A parse failure, with the location it was encountered at.
    #[error("parse error at {location}: {kind}")]
    Parse { kind: ParseErrorKind, location: SourceLocation },
    /// A filesystem failure.
    #[error("I/O error: {kind}")]
    Io { kind: IoErrorKind },
    /// A compression or decompression failure.
    #[error("compression error: {kind}")]
    Compression { kind: CompressionErrorKind },
}

impl TactileError {
    /// Builds a [`TactileError::Parse`].
    pub fn parse(kind: ParseErrorKind, location: SourceLocation) -> Self {
        Self::Parse { kind, location }
    }

    /// Builds a [`TactileError::Io`].
    pub fn io(kind: IoErrorKind) -> Self {
        Self::Io { kind }
    }

    /// Builds a [`TactileError::Compression`].
    pub fn compression(kind: CompressionErrorKind) -> Self {
        Self::Compression { kind }
    }
}

/// A fatal precondition violation: invalid entity id, wrong entity kind for
/// an operation, a layer moved out of bounds, a duplicate tile-range
/// allocation, and similar programmer errors.
///
/// These never flow through [`Result`]. The dispatcher is required to check
/// preconditions (e.g. "can this layer move down?") before pushing a command;
/// a [`LogicError`] reaching runtime means that contract was violated.
/// [`assert_logic`] panics in debug builds; in release builds the condition
/// is simply assumed to hold, matching `TACTILE_ASSERT`'s semantics in the
/// original implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicError(pub &'static str);

impl fmt::Display for LogicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "logic error: {}", self.0)
    }
}

/// Asserts a core invariant, panicking with a [`LogicError`] message in debug
/// builds. In release builds the check is skipped entirely: violating it is
/// undefined behavior at the level of document consistency, not a condition
/// the core attempts to recover from.
#[macro_export]
macro_rules! assert_logic {
    ($cond:expr, $msg:expr) => {
        debug_assert!($cond, "{}", $crate::error::LogicError($msg));
    };
}
