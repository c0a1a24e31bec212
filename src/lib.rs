#![forbid(unsafe_code)]

//! dirsweep: removes empty directories and keeps a recovery log.
//!
//! A sweep walks a tree bottom-up and deletes every directory that is empty
//! or holds only zero-byte files, so a parent emptied by the pass goes in the
//! same pass. Each removed directory is written to a JSON recovery log that a
//! restore replays to bring the folders and files back.
//!
//! # Library usage
//!
//! ```rust,no_run
//! use dirsweep::prelude::*;
//! use std::path::Path;
//!
//! let report = delete_empty_folders(Path::new("downloads"), DeletionConfig::default())?;
//! println!("removed {} folders", report.records.len());
//!
//! let restored = restore_from_log(Path::new("delete_log.json"))?;
//! println!("restored {} folders", restored.folders_restored);
//! # Ok::<(), dirsweep::core::errors::SweepError>(())
//! ```

pub mod prelude;

pub mod core;
pub mod logger;
pub mod recovery;
pub mod scanner;
