//! Archive aggregation for converted outputs.
//!
//! The backend answers every conversion request with either a single file or
//! a zip holding several files. This crate folds any number of those answers
//! into one flat zip the user can save.
//!
//! # Components
//!
//! - [`merge`]: [`ArchiveMerger`], signature sniffing, collision handling
//! - [`error`]: writer failures (per-part failures are recovered, not raised)

pub mod error;
pub mod merge;

pub use error::{ArchiveError, Result};
pub use merge::{
    ArchiveMerger, ArchivePart, CollisionPolicy, MergeSummary, PartOutcome, is_zip_signature,
    numbered,
};
