//! Recovery log: the JSON document a sweep writes and a restore reads.
//!
//! The log is a single pretty-printed JSON array of [`DeletionRecord`]s in
//! deletion order. It is rewritten wholesale by every sweep that removes at
//! least one directory and is never modified by a restore.
//!
//! Writes go to a `.tmp` sibling first and are renamed into place, so a crash
//! mid-write never leaves a truncated log behind.
//!
//! Older logs may carry lone UTF-16 surrogate escapes (`\udcff`) standing in
//! for bytes of non-UTF-8 file names. Those records are rejected one by one
//! instead of failing the whole log.

#![allow(missing_docs)]
#![allow(clippy::cast_precision_loss)]

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SweepError};
use crate::core::paths::with_name_suffix;

/// Snapshot of one file taken just before it was deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSnapshot {
    /// Base name inside the deleted directory.
    pub name: String,
    /// Content decoded as UTF-8 with invalid sequences dropped.
    pub data: String,
}

/// One deleted directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletionRecord {
    /// Absolute path of the directory at deletion time.
    pub path: String,
    /// Direct files of the directory, in the order they were snapshotted.
    #[serde(default)]
    pub files: Vec<FileSnapshot>,
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
}

impl DeletionRecord {
    /// Build a record stamped with the current time.
    pub fn now(path: String, files: Vec<FileSnapshot>) -> Self {
        Self {
            path,
            files,
            timestamp: epoch_seconds_now(),
        }
    }
}

/// Current wall-clock time as fractional seconds since the Unix epoch.
pub fn epoch_seconds_now() -> f64 {
    let now = chrono::Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1_000_000.0
}

/// Decode bytes as UTF-8, silently dropping every invalid sequence.
pub fn decode_discarding_invalid(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    out
}

/// Serialize `records` as the recovery log at `path`, replacing any previous log.
pub fn write_log(path: &Path, records: &[DeletionRecord]) -> Result<()> {
    let mut bytes = serde_json::to_vec_pretty(records)?;
    bytes.push(b'\n');

    let tmp = with_name_suffix(path, ".tmp");
    let written = write_bytes(&tmp, &bytes).and_then(|()| fs::rename(&tmp, path));
    if let Err(source) = written {
        let _ = fs::remove_file(&tmp);
        return Err(SweepError::LogWrite {
            path: path.to_path_buf(),
            source,
        });
    }
    Ok(())
}

fn write_bytes(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(bytes)?;
    writer.flush()?;
    writer.get_ref().sync_all()
}

// ──────────────────── reading ────────────────────

/// A log entry that parsed but cannot be restored.
#[derive(Debug)]
pub struct RejectedRecord {
    /// Position in the log array.
    pub index: usize,
    /// Recorded path, with undecodable parts shown as U+FFFD.
    pub path: String,
    pub error: SweepError,
}

/// Parsed recovery log.
#[derive(Debug, Default)]
pub struct RecoveryLog {
    /// Restorable records in log order.
    pub records: Vec<DeletionRecord>,
    pub rejected: Vec<RejectedRecord>,
}

impl RecoveryLog {
    /// Number of entries in the log, restorable or not.
    pub fn len(&self) -> usize {
        self.records.len() + self.rejected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read and parse the recovery log.
///
/// A missing file is [`SweepError::LogMissing`]; a file that exists but is not
/// a valid log is [`SweepError::LogParse`]. Entries holding lone surrogate
/// escapes land in [`RecoveryLog::rejected`] as [`SweepError::NonUtf8Path`].
pub fn read_log(path: &Path) -> Result<RecoveryLog> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(SweepError::LogMissing {
                path: path.to_path_buf(),
            });
        }
        Err(e) if e.kind() == ErrorKind::InvalidData => {
            return Err(SweepError::LogParse {
                path: path.to_path_buf(),
                details: "log is not UTF-8 text".to_string(),
            });
        }
        Err(e) => return Err(SweepError::io(path, e)),
    };

    let parse_error = |details: String| SweepError::LogParse {
        path: path.to_path_buf(),
        details,
    };

    let (text, tainted) = replace_lone_surrogates(&raw);
    let entries: Vec<serde_json::Value> =
        serde_json::from_str(&text).map_err(|e| parse_error(e.to_string()))?;

    let mut log = RecoveryLog::default();
    for (index, entry) in entries.into_iter().enumerate() {
        let record: DeletionRecord = serde_json::from_value(entry)
            .map_err(|e| parse_error(format!("entry {index}: {e}")))?;
        if tainted.contains(&index) {
            log.rejected.push(RejectedRecord {
                index,
                error: SweepError::NonUtf8Path {
                    path: PathBuf::from(&record.path),
                },
                path: record.path,
            });
        } else {
            log.records.push(record);
        }
    }
    Ok(log)
}

/// Replace every `\uXXXX` escape that is an unpaired UTF-16 surrogate with
/// `\ufffd`, returning the indices of the top-level array elements touched.
///
/// Tracks string and nesting state only; anything else malformed is left for
/// the JSON parser to report.
fn replace_lone_surrogates(raw: &str) -> (Cow<'_, str>, BTreeSet<usize>) {
    let bytes = raw.as_bytes();
    let mut out = String::new();
    let mut copied = 0;
    let mut tainted = BTreeSet::new();
    let mut in_string = false;
    let mut depth = 0usize;
    let mut element = 0usize;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if !in_string {
            match b {
                b'"' => in_string = true,
                b'[' | b'{' => depth += 1,
                b']' | b'}' => depth = depth.saturating_sub(1),
                b',' if depth == 1 => element += 1,
                _ => {}
            }
            i += 1;
            continue;
        }

        match b {
            b'"' => {
                in_string = false;
                i += 1;
            }
            b'\\' if bytes.get(i + 1) == Some(&b'u') => {
                let Some(unit) = hex_unit(raw, i + 2) else {
                    i += 2;
                    continue;
                };
                let paired = (0xD800..=0xDBFF).contains(&unit)
                    && bytes.get(i + 6) == Some(&b'\\')
                    && bytes.get(i + 7) == Some(&b'u')
                    && hex_unit(raw, i + 8).is_some_and(|low| (0xDC00..=0xDFFF).contains(&low));
                if paired {
                    i += 12;
                } else if (0xD800..=0xDFFF).contains(&unit) {
                    out.push_str(&raw[copied..i]);
                    out.push_str("\\ufffd");
                    copied = i + 6;
                    tainted.insert(element);
                    i += 6;
                } else {
                    i += 6;
                }
            }
            b'\\' => i += 2,
            _ => i += 1,
        }
    }

    if copied == 0 {
        return (Cow::Borrowed(raw), tainted);
    }
    out.push_str(&raw[copied..]);
    (Cow::Owned(out), tainted)
}

/// The four hex digits at `at`, if present.
fn hex_unit(raw: &str, at: usize) -> Option<u16> {
    let digits = raw.get(at..at + 4)?;
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u16::from_str_radix(digits, 16).ok()
}

// ──────────────────── preflight ────────────────────

/// Confirm the log can be written at `path` before anything is deleted.
///
/// The target itself is opened for append (never truncated) and a `.probe`
/// sibling is created and removed, covering both the final rename and an
/// existing log. A target that did not exist is removed again.
pub fn probe_writable(path: &Path) -> Result<()> {
    let fail = |source: io::Error| SweepError::LogWrite {
        path: path.to_path_buf(),
        source,
    };

    let existed = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => {
            return Err(fail(io::Error::new(
                ErrorKind::IsADirectory,
                "recovery log path is a directory",
            )));
        }
        Ok(_) => true,
        Err(_) => false,
    };

    let target = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .map_err(fail)?;
    drop(target);
    if !existed {
        let _ = fs::remove_file(path);
    }

    let probe = with_name_suffix(path, ".probe");
    let sibling = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&probe)
        .map_err(fail)?;
    drop(sibling);
    let _ = fs::remove_file(&probe);
    Ok(())
}
