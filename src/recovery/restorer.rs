//! Restorer: recreate swept directories and files from the recovery log.
//!
//! Restoration is additive. Directories are created with their parents, files
//! are written (overwriting same-named files) and nothing is ever deleted, so
//! running it twice leaves the same tree as running it once. The log is read
//! and never modified.

#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::core::errors::{Result, SweepError};
use crate::core::paths::is_single_component;
use crate::recovery::log::{DeletionRecord, RecoveryLog, read_log};

/// A folder or file that could not be restored.
#[derive(Debug)]
pub struct RestoreFailure {
    pub path: PathBuf,
    /// File name within `path`, or `None` when the folder itself failed.
    pub file: Option<String>,
    pub error: SweepError,
}

/// Summary of a restore.
#[derive(Debug)]
pub struct RestoreReport {
    pub log_path: PathBuf,
    pub records_in_log: usize,
    pub folders_restored: usize,
    pub files_written: usize,
    pub failures: Vec<RestoreFailure>,
    pub duration: Duration,
}

impl RestoreReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Progress notifications emitted while restoring.
#[derive(Debug)]
pub enum RestoreEvent<'a> {
    Restored { path: &'a str, files: usize },
    FolderFailed { path: &'a str, error: &'a SweepError },
    FileFailed {
        path: &'a str,
        file: &'a str,
        error: &'a SweepError,
    },
}

type Observer<'o> = Box<dyn FnMut(&RestoreEvent<'_>) + 'o>;

/// Replays a recovery log onto the filesystem.
pub struct Restorer<'o> {
    log_path: PathBuf,
    observer: Option<Observer<'o>>,
}

impl<'o> Restorer<'o> {
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
            observer: None,
        }
    }

    /// Receive a [`RestoreEvent`] per folder and per failed file.
    #[must_use]
    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: FnMut(&RestoreEvent<'_>) + 'o,
    {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Read the log and restore every record in log order.
    pub fn run(&mut self) -> Result<RestoreReport> {
        let log = read_log(&self.log_path)?;
        Ok(self.restore_log(log))
    }

    /// Restore a parsed log; entries rejected while parsing count as failed
    /// folders.
    pub fn restore_log(&mut self, log: RecoveryLog) -> RestoreReport {
        let RecoveryLog { records, rejected } = log;
        let mut report = self.restore_records(&records);
        report.records_in_log += rejected.len();
        for entry in rejected {
            self.emit(&RestoreEvent::FolderFailed {
                path: &entry.path,
                error: &entry.error,
            });
            report.failures.push(RestoreFailure {
                path: PathBuf::from(entry.path),
                file: None,
                error: entry.error,
            });
        }
        report
    }

    /// Restore already-parsed records.
    pub fn restore_records(&mut self, records: &[DeletionRecord]) -> RestoreReport {
        let start = Instant::now();
        let mut report = RestoreReport {
            log_path: self.log_path.clone(),
            records_in_log: records.len(),
            folders_restored: 0,
            files_written: 0,
            failures: Vec::new(),
            duration: Duration::ZERO,
        };

        for record in records {
            let dir = Path::new(&record.path);
            if let Err(error) = create_folder(dir) {
                self.emit(&RestoreEvent::FolderFailed {
                    path: &record.path,
                    error: &error,
                });
                report.failures.push(RestoreFailure {
                    path: dir.to_path_buf(),
                    file: None,
                    error,
                });
                continue;
            }

            let mut written = 0;
            for snapshot in &record.files {
                match write_file(dir, &snapshot.name, &snapshot.data) {
                    Ok(()) => written += 1,
                    Err(error) => {
                        self.emit(&RestoreEvent::FileFailed {
                            path: &record.path,
                            file: &snapshot.name,
                            error: &error,
                        });
                        report.failures.push(RestoreFailure {
                            path: dir.to_path_buf(),
                            file: Some(snapshot.name.clone()),
                            error,
                        });
                    }
                }
            }

            report.folders_restored += 1;
            report.files_written += written;
            self.emit(&RestoreEvent::Restored {
                path: &record.path,
                files: written,
            });
        }

        report.duration = start.elapsed();
        report
    }

    fn emit(&mut self, event: &RestoreEvent<'_>) {
        if let Some(observer) = self.observer.as_mut() {
            observer(event);
        }
    }
}

/// Restore everything recorded in the log at `log_path`.
pub fn restore_from_log(log_path: &Path) -> Result<RestoreReport> {
    Restorer::new(log_path).run()
}

fn create_folder(dir: &Path) -> Result<()> {
    if !dir.is_absolute() {
        return Err(SweepError::UnsafeEntry {
            entry: dir.to_string_lossy().into_owned(),
            reason: "recorded folder path is not absolute",
        });
    }
    fs::create_dir_all(dir).map_err(|e| SweepError::io(dir, e))
}

fn write_file(dir: &Path, name: &str, data: &str) -> Result<()> {
    if !is_single_component(name) {
        return Err(SweepError::UnsafeEntry {
            entry: name.to_string(),
            reason: "file name must be a single path component",
        });
    }
    let path = dir.join(name);
    fs::write(&path, data.as_bytes()).map_err(|e| SweepError::io(&path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recovery::log::{FileSnapshot, write_log};

    fn record(path: &Path, files: &[(&str, &str)]) -> DeletionRecord {
        DeletionRecord {
            path: path.to_string_lossy().into_owned(),
            files: files
                .iter()
                .map(|(name, data)| FileSnapshot {
                    name: (*name).to_string(),
                    data: (*data).to_string(),
                })
                .collect(),
            timestamp: 1_700_000_000.0,
        }
    }

    #[test]
    fn restores_folder_with_file_content() {
        let work = tempfile::tempdir().unwrap();
        let x = work.path().join("x");
        let log = work.path().join("delete_log.json");
        write_log(&log, &[record(&x, &[("a.txt", "hello")])]).unwrap();

        let report = restore_from_log(&log).unwrap();

        assert!(report.is_complete());
        assert_eq!(report.folders_restored, 1);
        assert_eq!(report.files_written, 1);
        assert_eq!(fs::read_to_string(x.join("a.txt")).unwrap(), "hello");
    }

    #[test]
    fn creates_missing_parents_and_leaves_log_untouched() {
        let work = tempfile::tempdir().unwrap();
        let deep = work.path().join("A/B/C");
        let log = work.path().join("delete_log.json");
        write_log(&log, &[record(&deep, &[])]).unwrap();
        let before = fs::read(&log).unwrap();

        restore_from_log(&log).unwrap();

        assert!(deep.is_dir());
        assert_eq!(fs::read(&log).unwrap(), before);
    }

    #[test]
    fn restore_twice_is_idempotent() {
        let work = tempfile::tempdir().unwrap();
        let a = work.path().join("A");
        let log = work.path().join("delete_log.json");
        write_log(
            &log,
            &[
                record(&a.join("B"), &[]),
                record(&a.join("C"), &[("empty.txt", "")]),
                record(&a, &[]),
            ],
        )
        .unwrap();

        let first = restore_from_log(&log).unwrap();
        fs::write(a.join("C/empty.txt"), "edited").unwrap();
        let second = restore_from_log(&log).unwrap();

        assert!(first.is_complete() && second.is_complete());
        assert_eq!(fs::read_to_string(a.join("C/empty.txt")).unwrap(), "");
        let mut entries: Vec<String> = fs::read_dir(&a)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        entries.sort();
        assert_eq!(entries, vec!["B", "C"]);
    }

    #[test]
    fn never_deletes_extra_files() {
        let work = tempfile::tempdir().unwrap();
        let x = work.path().join("x");
        fs::create_dir(&x).unwrap();
        fs::write(x.join("newer.txt"), "keep me").unwrap();
        let log = work.path().join("delete_log.json");
        write_log(&log, &[record(&x, &[("a.txt", "")])]).unwrap();

        restore_from_log(&log).unwrap();

        assert_eq!(fs::read_to_string(x.join("newer.txt")).unwrap(), "keep me");
        assert!(x.join("a.txt").exists());
    }

    #[test]
    fn missing_log_is_reported_not_panicked() {
        let work = tempfile::tempdir().unwrap();
        let err = restore_from_log(&work.path().join("delete_log.json")).unwrap_err();
        assert!(matches!(err, SweepError::LogMissing { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn corrupt_log_is_fatal() {
        let work = tempfile::tempdir().unwrap();
        let log = work.path().join("delete_log.json");
        fs::write(&log, "[{\"path\": ").unwrap();
        let err = restore_from_log(&log).unwrap_err();
        assert!(matches!(err, SweepError::LogParse { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn file_failure_does_not_stop_other_records() {
        let work = tempfile::tempdir().unwrap();
        let first = work.path().join("first");
        let second = work.path().join("second");
        let records = vec![
            record(&first, &[("../escape.txt", "x"), ("ok.txt", "fine")]),
            record(&second, &[("b.txt", "b")]),
        ];

        let mut events = Vec::new();
        let mut restorer =
            Restorer::new(work.path().join("unused.json")).with_observer(|event| {
                events.push(match event {
                    RestoreEvent::Restored { files, .. } => format!("restored {files}"),
                    RestoreEvent::FileFailed { file, .. } => format!("failed {file}"),
                    RestoreEvent::FolderFailed { path, .. } => format!("folder {path}"),
                });
            });
        let report = restorer.restore_records(&records);
        drop(restorer);

        assert_eq!(report.folders_restored, 2);
        assert_eq!(report.files_written, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].error.code(), "DSW-2006");
        assert!(!work.path().join("escape.txt").exists());
        assert_eq!(
            events,
            vec!["failed ../escape.txt", "restored 1", "restored 1"]
        );
    }

    #[test]
    fn surrogate_escaped_entry_does_not_block_its_neighbours() {
        let work = tempfile::tempdir().unwrap();
        let good = work.path().join("good");
        let log = work.path().join("delete_log.json");
        let text = format!(
            r#"[{{"path": "{bad}", "files": [], "timestamp": 1.0}},
{{"path": "{good}", "files": [{{"name": "a.txt", "data": "hi"}}], "timestamp": 2.0}}]"#,
            bad = format!("{}/bad\\udcffname", work.path().display()),
            good = good.display(),
        );
        fs::write(&log, text).unwrap();

        let mut failed = Vec::new();
        let report = Restorer::new(&log)
            .with_observer(|event| {
                if let RestoreEvent::FolderFailed { error, .. } = event {
                    failed.push(error.code());
                }
            })
            .run()
            .unwrap();

        assert_eq!(report.records_in_log, 2);
        assert_eq!(report.folders_restored, 1);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].file.is_none());
        assert_eq!(failed, vec!["DSW-2005"]);
        assert_eq!(fs::read_to_string(good.join("a.txt")).unwrap(), "hi");
    }

    #[test]
    fn relative_record_path_is_refused() {
        let work = tempfile::tempdir().unwrap();
        let records = vec![DeletionRecord {
            path: "relative/dir".to_string(),
            files: Vec::new(),
            timestamp: 0.0,
        }];
        let report = Restorer::new(work.path().join("unused.json")).restore_records(&records);

        assert_eq!(report.folders_restored, 0);
        assert_eq!(report.failures[0].error.code(), "DSW-2006");
        assert!(report.failures[0].file.is_none());
    }
}
