//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use dirsweep::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{Result, SweepError};

// Scanner
pub use crate::scanner::deletion::{
    DeletionConfig, SweepEvent, SweepReport, Sweeper, delete_empty_folders,
};

// Recovery
pub use crate::recovery::log::{DeletionRecord, FileSnapshot, RecoveryLog, RejectedRecord};
pub use crate::recovery::restorer::{RestoreEvent, RestoreReport, Restorer, restore_from_log};
