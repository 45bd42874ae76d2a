//! Error handling types and utilities.

use std::path::PathBuf;

/// A specialized Result type for capldoc-mcp operations.
///
/// This is an alias for `anyhow::Result` with context added via `.context()`
/// and `.with_context()` methods throughout the codebase.
pub type Result<T> = anyhow::Result<T>;

/// Errors that cross component boundaries.
///
/// Structural extraction anomalies (missing sections, unrecognized headings)
/// are deliberately not represented here: they degrade a record to empty
/// fields instead of failing the parse.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DocError {
    /// Document bytes are not valid UTF-8 text. Fatal for that single
    /// document; the rest of the corpus load continues.
    #[error("{}: content is not valid UTF-8 text", path.display())]
    Decode { path: PathBuf },

    /// Exact lookup miss. A normal negative result, not a failure.
    #[error("function '{name}' not found in corpus")]
    NotFound { name: String },

    /// No markdown documents discovered under the given paths.
    #[error("no markdown documents found under the given corpus paths")]
    CorpusEmpty,

    /// Persisted blob unreadable or built for a different corpus. Treated as
    /// a cache miss and never surfaced to callers.
    #[error("{}: cached index is unreadable", path.display())]
    CacheCorrupt { path: PathBuf },
}
