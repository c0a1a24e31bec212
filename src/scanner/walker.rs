//! Bottom-up directory walker.
//!
//! The walker lists a tree once, depth-first, and hands back its directories
//! in post-order: every directory appears after all of its descendants. The
//! sweep then re-reads each directory at visit time with
//! [`DirectoryListing::read`], so a parent sees the tree as its children left
//! it.
//!
//! Safety invariants:
//! - Symlinks are never followed below the root
//! - Unreadable directories are reported and left out of the order
//! - Children are visited in byte-wise name order

#![allow(missing_docs)]

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::errors::{Result, SweepError};

/// A directory that could not be listed during the walk.
#[derive(Debug)]
pub struct WalkError {
    pub path: PathBuf,
    pub error: SweepError,
}

/// Result of a full walk.
#[derive(Debug, Default)]
pub struct WalkOutcome {
    /// Directories in bottom-up order, root last.
    pub directories: Vec<PathBuf>,
    /// Directories skipped because they could not be read.
    pub errors: Vec<WalkError>,
}

/// A regular file found directly inside a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedFile {
    pub name: OsString,
    pub path: PathBuf,
    /// `None` when the size could not be determined.
    pub size: Option<u64>,
}

/// Direct children of one directory, split by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryListing {
    pub files: Vec<ListedFile>,
    pub subdirs: Vec<PathBuf>,
    /// Symlinks, sockets, FIFOs, devices: anything we cannot snapshot.
    pub other: Vec<PathBuf>,
}

impl DirectoryListing {
    /// List the current direct children of `dir`.
    pub fn read(dir: &Path) -> Result<Self> {
        let mut listing = Self::default();
        for entry in sorted_entries(dir)? {
            let path = entry.path();
            match entry.file_type() {
                Ok(ft) if ft.is_dir() => listing.subdirs.push(path),
                Ok(ft) if ft.is_file() => {
                    let size = entry.metadata().ok().map(|m| m.len());
                    listing.files.push(ListedFile {
                        name: entry.file_name(),
                        path,
                        size,
                    });
                }
                Ok(_) => listing.other.push(path),
                // Type unknown: stat by path, and if that fails too count it
                // as a file of unknown size.
                Err(_) => match fs::symlink_metadata(&path) {
                    Ok(meta) if meta.is_dir() => listing.subdirs.push(path),
                    Ok(meta) if !meta.is_file() => listing.other.push(path),
                    stat => listing.files.push(ListedFile {
                        name: entry.file_name(),
                        path,
                        size: stat.ok().map(|m| m.len()),
                    }),
                },
            }
        }
        Ok(listing)
    }

    /// Whether the directory has no children at all.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.subdirs.is_empty() && self.other.is_empty()
    }
}

/// Walk `root` and return its directories in bottom-up order.
///
/// The root itself is included (last) when it is a directory. A missing root
/// yields an empty outcome.
pub fn walk_bottom_up(root: &Path) -> WalkOutcome {
    let mut outcome = WalkOutcome::default();
    if !fs::metadata(root).is_ok_and(|m| m.is_dir()) {
        return outcome;
    }

    // (directory, children already pushed)
    let mut stack: Vec<(PathBuf, bool)> = vec![(root.to_path_buf(), false)];
    while let Some((dir, expanded)) = stack.pop() {
        if expanded {
            outcome.directories.push(dir);
            continue;
        }

        let children = match child_directories(&dir) {
            Ok(children) => children,
            Err(error) => {
                outcome.errors.push(WalkError { path: dir, error });
                continue;
            }
        };

        stack.push((dir, true));
        for child in children.into_iter().rev() {
            stack.push((child, false));
        }
    }
    outcome
}

fn child_directories(dir: &Path) -> Result<Vec<PathBuf>> {
    Ok(sorted_entries(dir)?
        .into_iter()
        .filter(|entry| entry.file_type().is_ok_and(|ft| ft.is_dir()))
        .map(|entry| entry.path())
        .collect())
}

fn sorted_entries(dir: &Path) -> Result<Vec<fs::DirEntry>> {
    let read = fs::read_dir(dir).map_err(|e| SweepError::io(dir, e))?;
    let mut entries = Vec::new();
    for entry in read {
        entries.push(entry.map_err(|e| SweepError::io(dir, e))?);
    }
    entries.sort_by_key(fs::DirEntry::file_name);
    Ok(entries)
}
