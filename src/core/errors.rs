//! DSW-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::recovery::log::DeletionRecord;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, SweepError>;

/// Top-level error type for dirsweep.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("[DSW-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[DSW-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[DSW-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[DSW-2001] no recovery log found at {path}")]
    LogMissing { path: PathBuf },

    #[error("[DSW-2002] recovery log {path} is not valid: {details}")]
    LogParse { path: PathBuf, details: String },

    #[error("[DSW-2003] recovery log {path} could not be written: {source}")]
    LogWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[DSW-2004] {path} changed during sweep: {details}")]
    ChangedDuringSweep { path: PathBuf, details: String },

    #[error("[DSW-2005] path is not valid UTF-8 and cannot be logged or restored: {path}")]
    NonUtf8Path { path: PathBuf },

    #[error("[DSW-2006] refusing unsafe log entry {entry:?}: {reason}")]
    UnsafeEntry { entry: String, reason: &'static str },

    /// Folders were deleted but the log write failed; `records` is the only
    /// remaining copy of what was removed.
    #[error(
        "[DSW-2007] {} deleted folder(s) missing from recovery log {path}: {source}",
        .records.len()
    )]
    RecordsNotLogged {
        path: PathBuf,
        records: Vec<DeletionRecord>,
        #[source]
        source: Box<SweepError>,
    },

    #[error("[DSW-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[DSW-3001] permission denied for {path}")]
    PermissionDenied { path: PathBuf },

    #[error("[DSW-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SweepError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "DSW-1001",
            Self::MissingConfig { .. } => "DSW-1002",
            Self::ConfigParse { .. } => "DSW-1003",
            Self::LogMissing { .. } => "DSW-2001",
            Self::LogParse { .. } => "DSW-2002",
            Self::LogWrite { .. } => "DSW-2003",
            Self::ChangedDuringSweep { .. } => "DSW-2004",
            Self::NonUtf8Path { .. } => "DSW-2005",
            Self::UnsafeEntry { .. } => "DSW-2006",
            Self::RecordsNotLogged { .. } => "DSW-2007",
            Self::Serialization { .. } => "DSW-2101",
            Self::PermissionDenied { .. } => "DSW-3001",
            Self::Io { .. } => "DSW-3002",
        }
    }

    /// Whether the failure concerns the recovery log itself rather than a
    /// single directory or file. These end the run.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::LogParse { .. }
                | Self::LogWrite { .. }
                | Self::RecordsNotLogged { .. }
                | Self::Serialization { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    ///
    /// `PermissionDenied` gets its own variant so reports can say so plainly.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            return Self::PermissionDenied {
                path: path.as_ref().to_path_buf(),
            };
        }
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for SweepError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for SweepError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
