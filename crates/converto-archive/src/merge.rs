//! Merging of raw files and nested zip archives into one flat zip.

use std::collections::HashSet;
use std::fmt;
use std::io::{self, Cursor, Write};
use std::str::FromStr;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{ArchiveError, Result};

/// Local file header magic ("PK").
const ZIP_MAGIC: [u8; 2] = [0x50, 0x4B];

/// Deflate level for entries the merger writes itself.
const FASTEST_LEVEL: i64 = 1;

/// Returns true when `data` looks like a zip archive.
///
/// Only the two magic bytes are checked, so false positives are expected and
/// handled by [`ArchiveMerger`] falling back to a flat file.
pub fn is_zip_signature(data: &[u8]) -> bool {
    data.len() > 4 && data.starts_with(&ZIP_MAGIC)
}

/// One unit of server output: a single file or a zip of files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivePart {
    pub file_name: String,
    pub data: Vec<u8>,
}

impl ArchivePart {
    pub fn new(file_name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            data: data.into(),
        }
    }

    /// Whether the payload carries a zip signature.
    pub fn is_nested_archive(&self) -> bool {
        is_zip_signature(&self.data)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// What to do when two entries end up with the same name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CollisionPolicy {
    /// Suffix later entries with a counter: `a.png`, `a (1).png`, ...
    #[default]
    Rename,
    /// Keep the first entry, drop later ones.
    Skip,
}

impl FromStr for CollisionPolicy {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "rename" => Ok(Self::Rename),
            "skip" => Ok(Self::Skip),
            other => Err(ArchiveError::UnknownPolicy(other.to_string())),
        }
    }
}

impl fmt::Display for CollisionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rename => write!(f, "rename"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

/// How a single input part was folded into the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartOutcome {
    /// The part had no data.
    Skipped,
    /// Written as one file under its own name.
    Flat,
    /// Nested archive whose entries were copied.
    Nested { entries: usize },
    /// Looked like a zip but could not be read; written as one file instead.
    Fallback { reason: String },
}

/// Bookkeeping returned by [`ArchiveMerger::merge_with_summary`].
#[derive(Debug, Clone, Default)]
pub struct MergeSummary {
    /// Final entry names in write order.
    pub entries: Vec<String>,
    /// One outcome per input part, in input order.
    pub outcomes: Vec<PartOutcome>,
    /// Entries written under a suffixed name.
    pub renamed: usize,
    /// Entries dropped because of [`CollisionPolicy::Skip`].
    pub dropped: usize,
    /// Nested entries hidden by a later entry of the same name in the same archive.
    pub shadowed: usize,
}

impl MergeSummary {
    /// Number of parts that needed the flat-file fallback.
    pub fn fallbacks(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, PartOutcome::Fallback { .. }))
            .count()
    }
}

/// Flattens archive parts into a single zip.
#[derive(Debug, Clone, Default)]
pub struct ArchiveMerger {
    collision: CollisionPolicy,
}

impl ArchiveMerger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collision_policy(collision: CollisionPolicy) -> Self {
        Self { collision }
    }

    pub fn collision_policy(&self) -> CollisionPolicy {
        self.collision
    }

    /// Merge `parts` into one archive and return its bytes.
    pub fn merge(&self, parts: &[ArchivePart]) -> Result<Vec<u8>> {
        self.merge_with_summary(parts).map(|(bytes, _)| bytes)
    }

    /// Merge `parts` and report what happened to each of them.
    pub fn merge_with_summary(&self, parts: &[ArchivePart]) -> Result<(Vec<u8>, MergeSummary)> {
        let mut output = OutputArchive::new(self.collision);
        let mut outcomes = Vec::with_capacity(parts.len());

        for (index, part) in parts.iter().enumerate() {
            // A trailing slash would turn the part into a directory entry.
            let name = match part.file_name.trim_end_matches('/') {
                "" => format!("part-{}", index + 1),
                trimmed => trimmed.to_string(),
            };

            let outcome = if part.is_empty() {
                tracing::debug!(part = index, "Skipping empty part");
                PartOutcome::Skipped
            } else if part.is_nested_archive() {
                match read_nested(&part.data) {
                    Ok(archive) => {
                        let hidden = central_directory_len(&part.data)
                            .map_or(0, |listed| listed.saturating_sub(archive.len()));
                        if hidden > 0 {
                            tracing::warn!(
                                part = index,
                                file = %name,
                                hidden,
                                "Nested archive repeats entry names, only the last copy is kept"
                            );
                            output.summary.shadowed += hidden;
                        }
                        let entries = output.copy_nested(archive)?;
                        PartOutcome::Nested { entries }
                    }
                    Err(e) => {
                        tracing::warn!(
                            part = index,
                            file = %name,
                            error = %e,
                            "Part has a zip signature but is not readable, storing as file"
                        );
                        output.add_file(&name, &part.data)?;
                        PartOutcome::Fallback {
                            reason: e.to_string(),
                        }
                    }
                }
            } else {
                output.add_file(&name, &part.data)?;
                PartOutcome::Flat
            };
            outcomes.push(outcome);
        }

        let (bytes, mut summary) = output.finish()?;
        summary.outcomes = outcomes;
        tracing::debug!(
            parts = parts.len(),
            entries = summary.entries.len(),
            fallbacks = summary.fallbacks(),
            "Merged archive parts"
        );
        Ok((bytes, summary))
    }
}

/// Open a nested archive and read every entry once.
///
/// Nothing is copied until the whole archive proved readable, so a corrupt
/// part never leaves half of its entries behind.
fn read_nested(data: &[u8]) -> zip::result::ZipResult<ZipArchive<Cursor<&[u8]>>> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;
    for i in 0..archive.len() {
        let mut entry = archive.by_index_raw(i)?;
        io::copy(&mut entry, &mut io::sink())?;
    }
    Ok(archive)
}

/// Entry count recorded in the end of central directory record.
///
/// The reader collapses entries sharing a name, so this can exceed
/// `ZipArchive::len`. `None` for zip64 archives or a missing record.
fn central_directory_len(data: &[u8]) -> Option<usize> {
    const EOCD_SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x05, 0x06];
    const EOCD_MIN_LEN: usize = 22;

    if data.len() < EOCD_MIN_LEN {
        return None;
    }
    let search_from = data.len().saturating_sub(EOCD_MIN_LEN + u16::MAX as usize);
    let start = (search_from..=data.len() - EOCD_MIN_LEN)
        .rev()
        .find(|&i| data[i..i + 4] == EOCD_SIGNATURE)?;
    let total = u16::from_le_bytes([data[start + 10], data[start + 11]]);
    (total != u16::MAX).then_some(total as usize)
}

/// In-memory output archive plus name bookkeeping.
struct OutputArchive {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    names: EntryNames,
    summary: MergeSummary,
}

impl OutputArchive {
    fn new(policy: CollisionPolicy) -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            names: EntryNames::new(policy),
            summary: MergeSummary::default(),
        }
    }

    fn options() -> SimpleFileOptions {
        SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(FASTEST_LEVEL))
    }

    fn add_file(&mut self, name: &str, data: &[u8]) -> Result<()> {
        let Some(final_name) = self.claim(name) else {
            return Ok(());
        };

        self.writer
            .start_file(final_name.as_str(), Self::options())
            .map_err(|e| write_error(&final_name, e))?;
        self.writer
            .write_all(data)
            .map_err(|e| write_error(&final_name, e.into()))?;

        self.summary.entries.push(final_name);
        Ok(())
    }

    /// Copy every entry of `archive` without recompressing it.
    fn copy_nested(&mut self, mut archive: ZipArchive<Cursor<&[u8]>>) -> Result<usize> {
        let mut copied = 0;
        for i in 0..archive.len() {
            let entry = archive
                .by_index_raw(i)
                .map_err(|e| write_error(&format!("#{}", i), e))?;
            let name = entry.name().to_string();

            if entry.is_dir() {
                if self.names.reserve(&name) {
                    self.writer
                        .raw_copy_file(entry)
                        .map_err(|e| write_error(&name, e))?;
                    self.summary.entries.push(name);
                    copied += 1;
                }
                continue;
            }

            let Some(final_name) = self.claim(&name) else {
                continue;
            };
            if final_name == name {
                self.writer
                    .raw_copy_file(entry)
                    .map_err(|e| write_error(&name, e))?;
            } else {
                self.writer
                    .raw_copy_file_rename(entry, final_name.clone())
                    .map_err(|e| write_error(&final_name, e))?;
            }
            self.summary.entries.push(final_name);
            copied += 1;
        }
        Ok(copied)
    }

    fn claim(&mut self, name: &str) -> Option<String> {
        match self.names.claim(name) {
            Some(final_name) => {
                if final_name != name {
                    self.summary.renamed += 1;
                    tracing::debug!(original = %name, renamed = %final_name, "Renamed duplicate entry");
                }
                Some(final_name)
            }
            None => {
                self.summary.dropped += 1;
                tracing::debug!(name = %name, "Dropped duplicate entry");
                None
            }
        }
    }

    fn finish(self) -> Result<(Vec<u8>, MergeSummary)> {
        let cursor = self.writer.finish().map_err(ArchiveError::Finish)?;
        Ok((cursor.into_inner(), self.summary))
    }
}

fn write_error(name: &str, source: zip::result::ZipError) -> ArchiveError {
    ArchiveError::Write {
        name: name.to_string(),
        source,
    }
}

/// Tracks taken entry names and resolves collisions.
struct EntryNames {
    policy: CollisionPolicy,
    taken: HashSet<String>,
}

impl EntryNames {
    fn new(policy: CollisionPolicy) -> Self {
        Self {
            policy,
            taken: HashSet::new(),
        }
    }

    /// Reserve `name` exactly; false when it is already taken.
    fn reserve(&mut self, name: &str) -> bool {
        self.taken.insert(name.to_string())
    }

    /// Reserve `name`, or a suffixed variant of it under [`CollisionPolicy::Rename`].
    fn claim(&mut self, name: &str) -> Option<String> {
        if self.taken.insert(name.to_string()) {
            return Some(name.to_string());
        }

        match self.policy {
            CollisionPolicy::Skip => None,
            CollisionPolicy::Rename => {
                let mut n = 1;
                loop {
                    let candidate = numbered(name, n);
                    if self.taken.insert(candidate.clone()) {
                        return Some(candidate);
                    }
                    n += 1;
                }
            }
        }
    }
}

/// `dir/photo.png` + 2 → `dir/photo (2).png`.
pub fn numbered(name: &str, n: usize) -> String {
    let (dir, file) = match name.rfind('/') {
        Some(i) => name.split_at(i + 1),
        None => ("", name),
    };
    match file.rfind('.') {
        Some(i) if i > 0 => format!("{}{} ({}){}", dir, &file[..i], n, &file[i..]),
        _ => format!("{}{} ({})", dir, file, n),
    }
}
