//! JSONL activity log: append-only audit trail of sweeps and restores.
//!
//! Each line is a self-contained JSON object assembled in memory and written
//! with a single `write_all`, so a reader tailing the file never sees a
//! partial line.
//!
//! The activity log is separate from the recovery log. Losing it never loses
//! data, so every failure here degrades instead of propagating:
//! 1. Primary file path (rotated at `max_size_bytes`)
//! 2. Silent discard after one `[DSW-JSONL]` warning on stderr

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions, rename};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::config::Config;
use crate::core::errors::{Result, SweepError};

/// Severity level for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    /// Log-level failures are critical; everything else only cost one item.
    pub const fn for_error(error: &SweepError) -> Self {
        if error.is_fatal() {
            Self::Critical
        } else {
            Self::Warning
        }
    }
}

/// Activity event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    SweepStart,
    FolderDeleted,
    FolderSkipped,
    SweepComplete,
    RestoreStart,
    FolderRestored,
    RestoreFailed,
    RestoreComplete,
    Error,
}

/// A single JSONL log entry; only `ts`, `event` and `severity` are always present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// RFC 3339 UTC timestamp.
    pub ts: String,
    pub event: EventType,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Number of files snapshotted or restored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LogEntry {
    /// Create a new entry stamped with the current UTC time.
    pub fn new(event: EventType, severity: Severity) -> Self {
        Self {
            ts: format_utc_now(),
            event,
            severity,
            path: None,
            files: None,
            ok: None,
            error_code: None,
            error_message: None,
            details: None,
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub const fn with_files(mut self, files: usize) -> Self {
        self.files = Some(files);
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Attach an error and mark the entry as failed.
    #[must_use]
    pub fn with_error(mut self, error: &SweepError) -> Self {
        self.ok = Some(false);
        self.error_code = Some(error.code().to_string());
        self.error_message = Some(error.to_string());
        self
    }
}

/// Configuration for the JSONL writer.
#[derive(Debug, Clone)]
pub struct JsonlConfig {
    pub path: PathBuf,
    /// Rotate once the file would grow past this many bytes.
    pub max_size_bytes: u64,
    /// Number of rotated files to keep (`.1` newest).
    pub max_rotated_files: u32,
}

impl JsonlConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            path: config.paths.activity_log.clone(),
            max_size_bytes: config.activity.max_size_bytes,
            max_rotated_files: config.activity.max_rotated_files,
        }
    }
}

/// Append-only JSONL writer with size-based rotation.
pub struct JsonlWriter {
    config: JsonlConfig,
    file: Option<File>,
    bytes_written: u64,
}

impl JsonlWriter {
    /// Open the log file, degrading to discard on failure.
    pub fn open(config: JsonlConfig) -> Self {
        let mut w = Self {
            config,
            file: None,
            bytes_written: 0,
        };
        w.reopen();
        w
    }

    /// A writer that drops everything.
    pub fn disabled() -> Self {
        Self {
            config: JsonlConfig {
                path: PathBuf::new(),
                max_size_bytes: u64::MAX,
                max_rotated_files: 1,
            },
            file: None,
            bytes_written: 0,
        }
    }

    /// Write a single log entry as one JSONL line.
    pub fn write_entry(&mut self, entry: &LogEntry) {
        let line = match serde_json::to_string(entry) {
            Ok(json) => format!("{json}\n"),
            Err(e) => {
                let _ = writeln!(io::stderr(), "[DSW-JSONL] serialize error: {e}");
                return;
            }
        };

        if self.file.is_some()
            && self.bytes_written + line.len() as u64 > self.config.max_size_bytes
        {
            self.rotate();
        }

        let Some(file) = self.file.as_mut() else {
            return;
        };
        if let Err(e) = file.write_all(line.as_bytes()) {
            let _ = writeln!(
                io::stderr(),
                "[DSW-JSONL] write to {} failed, activity logging disabled: {e}",
                self.config.path.display()
            );
            self.file = None;
            return;
        }
        self.bytes_written += line.len() as u64;
    }

    /// Whether entries are reaching a file.
    pub fn is_active(&self) -> bool {
        self.file.is_some()
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    // ──────────────────────── internals ────────────────────────

    fn reopen(&mut self) {
        match open_append(&self.config.path) {
            Ok((file, size)) => {
                self.file = Some(file);
                self.bytes_written = size;
            }
            Err(e) => {
                self.file = None;
                let _ = writeln!(
                    io::stderr(),
                    "[DSW-JSONL] activity log unavailable, discarding events: {e}"
                );
            }
        }
    }

    fn rotate(&mut self) {
        self.file = None;
        let base = self.config.path.clone();

        // .N is dropped, .N-1 -> .N, ..., .1 -> .2, current -> .1
        let _ = fs::remove_file(rotated_name(&base, self.config.max_rotated_files));
        for i in (1..self.config.max_rotated_files).rev() {
            let _ = rename(rotated_name(&base, i), rotated_name(&base, i + 1));
        }
        let _ = rename(&base, rotated_name(&base, 1));

        self.reopen();
    }
}

// ──────────────────────── helpers ────────────────────────

/// Open or create a file for appending. Returns `(File, current_size)`.
fn open_append(path: &Path) -> Result<(File, u64)> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| SweepError::io(parent, e))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| SweepError::io(path, e))?;
    let size = file.metadata().map(|m| m.len()).unwrap_or(0);
    Ok((file, size))
}

/// Build a rotated filename: `foo.jsonl` → `foo.jsonl.3`.
fn rotated_name(base: &Path, index: u32) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

fn format_utc_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

// ──────────────────────── tests ────────────────────────
