//! Error types for archive merging.

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Errors raised while building the output archive.
///
/// Unreadable input parts never surface here; they fall back to flat files.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// Writing an entry into the output archive failed.
    #[error("failed to write archive entry '{name}': {source}")]
    Write {
        name: String,
        source: zip::result::ZipError,
    },

    /// Finalizing the central directory failed.
    #[error("failed to finalize archive: {0}")]
    Finish(zip::result::ZipError),

    /// Unknown collision policy name.
    #[error("unknown collision policy '{0}' (expected 'rename' or 'skip')")]
    UnknownPolicy(String),
}
