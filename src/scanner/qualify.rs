//! Qualification rule: may this directory be swept?
//!
//! A directory qualifies when it has no live subdirectories, no entries we
//! cannot snapshot, and every direct file is zero bytes long. A file whose
//! size could not be read counts as empty.

#![allow(missing_docs)]

use std::collections::HashSet;
use std::path::PathBuf;

use crate::scanner::walker::DirectoryListing;

/// Outcome of evaluating one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// No children at all.
    Empty,
    /// Only files, all zero bytes (or of unknown size).
    ZeroByteFiles { files: usize },
    /// A subdirectory survived the pass.
    LiveSubdirectory(PathBuf),
    /// A symlink or special file that cannot be snapshotted.
    SpecialEntry(PathBuf),
    /// At least one file has content.
    NonEmptyFile { path: PathBuf, size: u64 },
}

impl Verdict {
    /// Whether the directory should be snapshotted and removed.
    pub const fn qualifies(&self) -> bool {
        matches!(self, Self::Empty | Self::ZeroByteFiles { .. })
    }
}

/// Evaluate `listing` against the sweep rule.
///
/// `removed` holds subdirectories that count as gone even though they are
/// still on disk (dry runs).
pub fn qualify(listing: &DirectoryListing, removed: &HashSet<PathBuf>) -> Verdict {
    if let Some(live) = listing.subdirs.iter().find(|d| !removed.contains(*d)) {
        return Verdict::LiveSubdirectory(live.clone());
    }
    if let Some(special) = listing.other.first() {
        return Verdict::SpecialEntry(special.clone());
    }
    if let Some(file) = listing.files.iter().find(|f| f.size.unwrap_or(0) > 0) {
        return Verdict::NonEmptyFile {
            path: file.path.clone(),
            size: file.size.unwrap_or(0),
        };
    }
    if listing.files.is_empty() {
        Verdict::Empty
    } else {
        Verdict::ZeroByteFiles {
            files: listing.files.len(),
        }
    }
}
