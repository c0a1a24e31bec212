//! Sweep executor: bottom-up snapshot-and-delete with a recovery log.
//!
//! Pipeline: probe log location -> walk bottom-up -> for each directory,
//! re-list and qualify -> snapshot files -> delete files then directory ->
//! collect record -> write the full run list as the recovery log.
//!
//! Failures are contained per directory: a directory that cannot be
//! snapshotted or removed is left on disk with no record and the sweep moves
//! on. Only the recovery log itself can end a run.

#![allow(missing_docs)]

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::core::config::DEFAULT_RECOVERY_LOG;
use crate::core::errors::{Result, SweepError};
use crate::core::paths::absolutize;
use crate::recovery::log::{
    DeletionRecord, FileSnapshot, decode_discarding_invalid, probe_writable, write_log,
};
use crate::scanner::qualify::qualify;
use crate::scanner::walker::{DirectoryListing, ListedFile, walk_bottom_up};

// ──────────────────── configuration ────────────────────

/// Configuration for one sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionConfig {
    /// Where the recovery log is written.
    pub recovery_log: PathBuf,
    /// Qualify and snapshot, but delete nothing and write no log.
    pub dry_run: bool,
}

impl Default for DeletionConfig {
    fn default() -> Self {
        Self {
            recovery_log: PathBuf::from(DEFAULT_RECOVERY_LOG),
            dry_run: false,
        }
    }
}

// ──────────────────── report types ────────────────────

/// A directory that qualified but could not be removed, or could not be read.
#[derive(Debug)]
pub struct DeletionFailure {
    pub path: PathBuf,
    pub error: SweepError,
}

/// Summary of a sweep.
#[derive(Debug)]
pub struct SweepReport {
    /// Absolute base directory that was swept.
    pub base_dir: PathBuf,
    /// Records of removed (or, in a dry run, removable) directories in order.
    pub records: Vec<DeletionRecord>,
    /// Qualifying directories left on disk because removal failed.
    pub failures: Vec<DeletionFailure>,
    /// Directories that could not be listed during the walk.
    pub unreadable: Vec<DeletionFailure>,
    pub directories_scanned: usize,
    pub dry_run: bool,
    /// Set once the recovery log has been written.
    pub log_path: Option<PathBuf>,
    pub duration: Duration,
}

impl SweepReport {
    /// Whether anything was (or would be) removed.
    pub fn deleted_anything(&self) -> bool {
        !self.records.is_empty()
    }
}

/// Progress notifications emitted while sweeping.
#[derive(Debug)]
pub enum SweepEvent<'a> {
    Scanning { base_dir: &'a Path },
    Deleted(&'a DeletionRecord),
    WouldDelete(&'a DeletionRecord),
    Failed { path: &'a Path, error: &'a SweepError },
    Unreadable { path: &'a Path, error: &'a SweepError },
}

type Observer<'o> = Box<dyn FnMut(&SweepEvent<'_>) + 'o>;

// ──────────────────── executor ────────────────────

/// Runs the scan-delete-log cycle.
pub struct Sweeper<'o> {
    config: DeletionConfig,
    observer: Option<Observer<'o>>,
}

impl<'o> Sweeper<'o> {
    pub fn new(config: DeletionConfig) -> Self {
        Self {
            config,
            observer: None,
        }
    }

    /// Receive a [`SweepEvent`] as each directory is handled.
    #[must_use]
    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: FnMut(&SweepEvent<'_>) + 'o,
    {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn config(&self) -> &DeletionConfig {
        &self.config
    }

    /// Full cycle: check the log is writable, sweep, then write the log.
    ///
    /// If the log cannot be written after folders were removed, the error is
    /// [`SweepError::RecordsNotLogged`] carrying the run's records.
    pub fn run(&mut self, base_dir: &Path) -> Result<SweepReport> {
        self.preflight()?;
        let mut report = self.sweep(base_dir);
        match self.persist(&mut report) {
            Ok(()) => Ok(report),
            Err(source) => Err(SweepError::RecordsNotLogged {
                path: self.config.recovery_log.clone(),
                records: report.records,
                source: Box::new(source),
            }),
        }
    }

    /// Refuse to start if the recovery log could not be written afterwards.
    pub fn preflight(&self) -> Result<()> {
        if self.config.dry_run {
            return Ok(());
        }
        probe_writable(&self.config.recovery_log)
    }

    /// Walk and delete. The returned report owns the run's records; nothing
    /// is written to the recovery log yet.
    pub fn sweep(&mut self, base_dir: &Path) -> SweepReport {
        let start = Instant::now();
        let base_dir = absolutize(base_dir);
        self.emit(&SweepEvent::Scanning {
            base_dir: &base_dir,
        });

        let walk = walk_bottom_up(&base_dir);
        let mut report = SweepReport {
            base_dir: base_dir.clone(),
            records: Vec::new(),
            failures: Vec::new(),
            unreadable: Vec::new(),
            directories_scanned: 0,
            dry_run: self.config.dry_run,
            log_path: None,
            duration: Duration::ZERO,
        };

        for err in walk.errors {
            self.emit(&SweepEvent::Unreadable {
                path: &err.path,
                error: &err.error,
            });
            report.unreadable.push(DeletionFailure {
                path: err.path,
                error: err.error,
            });
        }

        // Only populated in dry runs; real deletions disappear from listings.
        let mut removed: HashSet<PathBuf> = HashSet::new();

        for dir in walk.directories {
            report.directories_scanned += 1;

            let listing = match DirectoryListing::read(&dir) {
                Ok(listing) => listing,
                Err(error) => {
                    self.emit(&SweepEvent::Unreadable { path: &dir, error: &error });
                    report.unreadable.push(DeletionFailure { path: dir, error });
                    continue;
                }
            };

            if !qualify(&listing, &removed).qualifies() {
                continue;
            }

            match self.remove_directory(&dir, &listing) {
                Ok(record) => {
                    if self.config.dry_run {
                        self.emit(&SweepEvent::WouldDelete(&record));
                        removed.insert(dir);
                    } else {
                        self.emit(&SweepEvent::Deleted(&record));
                    }
                    report.records.push(record);
                }
                Err(error) => {
                    self.emit(&SweepEvent::Failed { path: &dir, error: &error });
                    report.failures.push(DeletionFailure { path: dir, error });
                }
            }
        }

        report.duration = start.elapsed();
        report
    }

    /// Write the run's records as the recovery log, replacing any previous
    /// one. Nothing is written for a dry run or an empty run.
    pub fn persist(&self, report: &mut SweepReport) -> Result<()> {
        if report.dry_run || report.records.is_empty() {
            return Ok(());
        }
        write_log(&self.config.recovery_log, &report.records)?;
        report.log_path = Some(self.config.recovery_log.clone());
        Ok(())
    }

    // ──────────────────── deletion ────────────────────

    fn remove_directory(&self, dir: &Path, listing: &DirectoryListing) -> Result<DeletionRecord> {
        let path = utf8(dir)?.to_string();
        let snapshots = snapshot_files(dir, &listing.files)?;
        let record = DeletionRecord::now(path, snapshots);
        if self.config.dry_run {
            return Ok(record);
        }

        for (removed, file) in listing.files.iter().enumerate() {
            if let Err(e) = fs::remove_file(&file.path) {
                roll_back(&listing.files[..removed], &record.files);
                return Err(SweepError::io(&file.path, e));
            }
        }
        if let Err(e) = fs::remove_dir(dir) {
            roll_back(&listing.files, &record.files);
            return Err(SweepError::io(dir, e));
        }

        Ok(record)
    }

    fn emit(&mut self, event: &SweepEvent<'_>) {
        if let Some(observer) = self.observer.as_mut() {
            observer(event);
        }
    }
}

/// Sweep `base_dir` with `config`: delete every qualifying directory and write
/// the recovery log.
pub fn delete_empty_folders(base_dir: &Path, config: DeletionConfig) -> Result<SweepReport> {
    Sweeper::new(config).run(base_dir)
}

// ──────────────────── snapshots ────────────────────

fn snapshot_files(dir: &Path, files: &[ListedFile]) -> Result<Vec<FileSnapshot>> {
    let mut snapshots = Vec::with_capacity(files.len());
    for file in files {
        let name = file
            .name
            .to_str()
            .ok_or_else(|| SweepError::NonUtf8Path {
                path: file.path.clone(),
            })?
            .to_string();
        let bytes = fs::read(&file.path).map_err(|e| SweepError::io(&file.path, e))?;
        if file.size == Some(0) && !bytes.is_empty() {
            return Err(SweepError::ChangedDuringSweep {
                path: dir.to_path_buf(),
                details: format!("{name} grew to {} bytes", bytes.len()),
            });
        }
        snapshots.push(FileSnapshot {
            name,
            data: decode_discarding_invalid(&bytes),
        });
    }
    Ok(snapshots)
}

/// Put back files already removed from a directory whose deletion failed.
fn roll_back(removed: &[ListedFile], snapshots: &[FileSnapshot]) {
    for (file, snapshot) in removed.iter().zip(snapshots) {
        if let Err(e) = fs::write(&file.path, snapshot.data.as_bytes()) {
            eprintln!(
                "[DSW-SWEEP] could not put back {}: {e}",
                file.path.display()
            );
        }
    }
}

fn utf8(path: &Path) -> Result<&str> {
    path.to_str().ok_or_else(|| SweepError::NonUtf8Path {
        path: path.to_path_buf(),
    })
}

// ──────────────────── tests ────────────────────
