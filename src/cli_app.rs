//! Top-level CLI definition and dispatch.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use dirsweep::core::config::Config;
use dirsweep::core::errors::SweepError;
use dirsweep::logger::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, Severity};
use dirsweep::recovery::log::{DeletionRecord, read_log};
use dirsweep::recovery::restorer::{RestoreEvent, RestoreReport, Restorer};
use dirsweep::scanner::deletion::{DeletionConfig, SweepEvent, SweepReport, Sweeper};

/// Remove empty folders and undo the removal from the recovery log.
///
/// Run without a subcommand for the interactive menu.
#[derive(Debug, Parser)]
#[command(
    name = "dirsweep",
    author,
    version,
    about = "Empty Folder Cleaner & Restorer",
    long_about = None
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Recovery log location (default: delete_log.json in the working directory).
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Subcommand to execute; omit for the interactive menu.
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Delete empty folders under a base directory and write the recovery log.
    Sweep(SweepArgs),
    /// Recreate folders and files recorded in the recovery log.
    Restore,
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args, Default)]
struct SweepArgs {
    /// Base directory to sweep (falls back to the configured default).
    #[arg(value_name = "PATH")]
    path: Option<PathBuf>,
    /// Show what would be deleted without deleting or writing a log.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Target shell.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input or configuration.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// Operation partially succeeded.
    #[error("{0}")]
    Partial(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Json(_) => 3,
            Self::Partial(_) => 4,
        }
    }
}

impl From<SweepError> for CliError {
    fn from(value: SweepError) -> Self {
        match value {
            SweepError::InvalidConfig { .. }
            | SweepError::MissingConfig { .. }
            | SweepError::ConfigParse { .. } => Self::User(value.to_string()),
            other => Self::Runtime(other.to_string()),
        }
    }
}

/// State shared by every command in one invocation.
struct Session {
    config: Config,
    recovery_log: PathBuf,
    mode: OutputMode,
    activity: JsonlWriter,
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    if let Some(Command::Completions(args)) = &cli.command {
        let mut command = Cli::command();
        let binary_name = command.get_name().to_string();
        generate(args.shell, &mut command, binary_name, &mut io::stdout());
        return Ok(());
    }

    let config = Config::load(cli.config.as_deref())?;
    let activity = if config.activity.enabled {
        JsonlWriter::open(JsonlConfig::from_config(&config))
    } else {
        JsonlWriter::disabled()
    };
    let mut session = Session {
        recovery_log: cli
            .log_file
            .clone()
            .unwrap_or_else(|| config.paths.recovery_log.clone()),
        mode: output_mode(cli),
        config,
        activity,
    };

    match &cli.command {
        Some(Command::Sweep(args)) => {
            let base = args
                .path
                .clone()
                .unwrap_or_else(|| session.config.sweep.default_base_dir.clone());
            let dry_run = args.dry_run || session.config.sweep.dry_run;
            run_sweep(&mut session, &base, dry_run)
        }
        Some(Command::Restore) => run_restore(&mut session),
        Some(Command::Completions(_)) => Ok(()),
        None => {
            session.mode = OutputMode::Human;
            let stdin = io::stdin();
            run_interactive(&mut session, &mut stdin.lock(), &mut io::stdout())
        }
    }
}

// ---------------------------------------------------------------------------
// Interactive menu
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuChoice {
    Sweep,
    Restore,
}

fn parse_choice(raw: &str) -> Option<MenuChoice> {
    match raw.trim() {
        "1" => Some(MenuChoice::Sweep),
        "2" => Some(MenuChoice::Restore),
        _ => None,
    }
}

fn run_interactive<R: BufRead, W: Write>(
    session: &mut Session,
    input: &mut R,
    out: &mut W,
) -> Result<(), CliError> {
    writeln!(out, "{}", "=== Empty Folder Cleaner & Restorer ===".cyan())?;
    writeln!(out, "1) Delete empty folders")?;
    writeln!(out, "2) Restore from log")?;
    let choice = prompt(input, out, "Choose (1/2): ")?;

    match parse_choice(&choice) {
        Some(MenuChoice::Sweep) => {
            let base = prompt(input, out, "Enter base directory (default=current): ")?;
            let base = if base.is_empty() {
                session.config.sweep.default_base_dir.clone()
            } else {
                PathBuf::from(base)
            };
            let dry_run = session.config.sweep.dry_run;
            run_sweep(session, &base, dry_run)
        }
        Some(MenuChoice::Restore) => run_restore(session),
        None => {
            writeln!(out, "{}", "Invalid choice.".red())?;
            Ok(())
        }
    }
}

/// Print `question`, read one line, return it trimmed. EOF reads as empty.
fn prompt<R: BufRead, W: Write>(input: &mut R, out: &mut W, question: &str) -> io::Result<String> {
    write!(out, "{question}")?;
    out.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

// ---------------------------------------------------------------------------
// Sweep
// ---------------------------------------------------------------------------

fn run_sweep(session: &mut Session, base_dir: &Path, dry_run: bool) -> Result<(), CliError> {
    let mode = session.mode;
    session.activity.write_entry(
        &LogEntry::new(EventType::SweepStart, Severity::Info)
            .with_path(base_dir.to_string_lossy())
            .with_details(if dry_run { "dry run" } else { "live" }),
    );

    let activity = &mut session.activity;
    let mut sweeper = Sweeper::new(DeletionConfig {
        recovery_log: session.recovery_log.clone(),
        dry_run,
    })
    .with_observer(|event| report_sweep_event(event, mode, activity));
    let outcome = sweeper.run(base_dir);
    drop(sweeper);

    let report = match outcome {
        Ok(report) => report,
        Err(e) => {
            let unlogged = match &e {
                SweepError::RecordsNotLogged { records, .. } => Some(records.as_slice()),
                _ => None,
            };
            let mut entry = LogEntry::new(EventType::Error, Severity::for_error(&e)).with_error(&e);
            entry = match unlogged {
                Some(records) => entry
                    .with_files(records.len())
                    .with_details("folders deleted but recovery log not written"),
                None => entry.with_details("sweep aborted before deleting anything"),
            };
            session.activity.write_entry(&entry);

            if let Some(records) = unlogged {
                dump_unlogged_records(records);
                return Err(e.into());
            }
            return Err(CliError::Runtime(format!("{e}; nothing was deleted")));
        }
    };

    session.activity.write_entry(
        &LogEntry::new(EventType::SweepComplete, Severity::Info)
            .with_path(report.base_dir.to_string_lossy())
            .with_files(report.records.len())
            .with_details(format!(
                "scanned={} failed={} dry_run={}",
                report.directories_scanned,
                report.failures.len(),
                report.dry_run
            )),
    );

    match mode {
        OutputMode::Human => print_sweep_summary(&report),
        OutputMode::Json => write_json_line(&sweep_summary_json(&report, &session.activity))?,
    }

    if report.failures.is_empty() {
        Ok(())
    } else {
        Err(CliError::Partial(format!(
            "{} folder(s) could not be deleted",
            report.failures.len()
        )))
    }
}

fn report_sweep_event(event: &SweepEvent<'_>, mode: OutputMode, activity: &mut JsonlWriter) {
    match event {
        SweepEvent::Scanning { base_dir } => {
            if mode == OutputMode::Human {
                println!("\n{} {}\n", "Scanning:".cyan(), base_dir.display());
            }
        }
        SweepEvent::Deleted(record) => {
            activity.write_entry(
                &LogEntry::new(EventType::FolderDeleted, Severity::Info)
                    .with_path(record.path.as_str())
                    .with_files(record.files.len()),
            );
            if mode == OutputMode::Human {
                println!("Deleted folder: {}", record.path);
            }
        }
        SweepEvent::WouldDelete(record) => {
            if mode == OutputMode::Human {
                println!("Would delete folder: {}", record.path);
            }
        }
        SweepEvent::Failed { path, error } => {
            activity.write_entry(
                &LogEntry::new(EventType::FolderSkipped, Severity::for_error(error))
                    .with_path(path.to_string_lossy())
                    .with_error(error),
            );
            eprintln!("{} {}: {error}", "Error deleting".yellow(), path.display());
        }
        SweepEvent::Unreadable { path, error } => {
            activity.write_entry(
                &LogEntry::new(EventType::FolderSkipped, Severity::Info)
                    .with_path(path.to_string_lossy())
                    .with_error(error),
            );
            eprintln!("Skipped unreadable folder {}: {error}", path.display());
        }
    }
}

fn print_sweep_summary(report: &SweepReport) {
    println!();
    if !report.deleted_anything() {
        println!("{}", "No empty folders found. Nothing deleted.".green());
    } else if report.dry_run {
        println!(
            "Dry run: {} folder(s) would be deleted. No log written.",
            report.records.len()
        );
    } else if let Some(log_path) = &report.log_path {
        println!(
            "{} {} folder(s) deleted. Log saved to: {}",
            "Operation complete.".green(),
            report.records.len(),
            log_path.display()
        );
    }
    if !report.failures.is_empty() {
        println!(
            "{}",
            format!("  Failed: {} folder(s) left in place", report.failures.len()).yellow()
        );
    }
    if !report.unreadable.is_empty() {
        println!("  Unreadable: {} folder(s) skipped", report.unreadable.len());
    }
}

fn sweep_summary_json(report: &SweepReport, activity: &JsonlWriter) -> Value {
    json!({
        "command": "sweep",
        "base_dir": report.base_dir.to_string_lossy(),
        "dry_run": report.dry_run,
        "directories_scanned": report.directories_scanned,
        "deleted": report.records.iter().map(|r| r.path.as_str()).collect::<Vec<_>>(),
        "failed": report
            .failures
            .iter()
            .map(|f| json!({"path": f.path.to_string_lossy(), "error_code": f.error.code(), "error": f.error.to_string()}))
            .collect::<Vec<_>>(),
        "unreadable": report.unreadable.len(),
        "log_path": report.log_path.as_deref().map(Path::to_string_lossy),
        "activity_log": activity_log_json(activity),
        "elapsed_seconds": report.duration.as_secs_f64(),
    })
}

/// Last resort when the recovery log cannot be written after deleting:
/// put the records on stderr so the user can save them by hand.
fn dump_unlogged_records(records: &[DeletionRecord]) {
    eprintln!(
        "{}",
        "WARNING: folders were deleted but the recovery log could not be written."
            .red()
            .bold()
    );
    eprintln!("Save the following JSON as your recovery log to be able to restore them:");
    match serde_json::to_string_pretty(records) {
        Ok(text) => eprintln!("{text}"),
        Err(e) => eprintln!("[DSW-SWEEP] could not serialize records: {e}"),
    }
}

// ---------------------------------------------------------------------------
// Restore
// ---------------------------------------------------------------------------

fn run_restore(session: &mut Session) -> Result<(), CliError> {
    let mode = session.mode;
    let log_path = session.recovery_log.clone();
    session.activity.write_entry(
        &LogEntry::new(EventType::RestoreStart, Severity::Info).with_path(log_path.to_string_lossy()),
    );

    let log = match read_log(&log_path) {
        Ok(log) => log,
        Err(e @ SweepError::LogMissing { .. }) => {
            session.activity.write_entry(
                &LogEntry::new(EventType::RestoreFailed, Severity::Warning).with_error(&e),
            );
            match mode {
                OutputMode::Human => println!(
                    "{} {}",
                    "No log file found to restore from:".red(),
                    log_path.display()
                ),
                OutputMode::Json => write_json_line(&json!({
                    "command": "restore",
                    "log_path": log_path.to_string_lossy(),
                    "error_code": e.code(),
                    "restored": [],
                }))?,
            }
            return Ok(());
        }
        Err(e) => {
            session.activity.write_entry(
                &LogEntry::new(EventType::RestoreFailed, Severity::for_error(&e)).with_error(&e),
            );
            return Err(e.into());
        }
    };

    if mode == OutputMode::Human {
        println!("\n{}", "Restoring deleted folders...".cyan());
    }

    let replayed: Vec<String> = log.records.iter().map(|r| r.path.clone()).collect();
    let activity = &mut session.activity;
    let mut restorer =
        Restorer::new(&log_path).with_observer(|event| report_restore_event(event, mode, activity));
    let report = restorer.restore_log(log);
    drop(restorer);

    session.activity.write_entry(
        &LogEntry::new(EventType::RestoreComplete, Severity::Info)
            .with_path(log_path.to_string_lossy())
            .with_files(report.files_written)
            .with_details(format!(
                "folders={} failed={}",
                report.folders_restored,
                report.failures.len()
            )),
    );

    match mode {
        OutputMode::Human => print_restore_summary(&report),
        OutputMode::Json => write_json_line(&restore_summary_json(
            &report,
            &replayed,
            &session.activity,
        ))?,
    }

    if report.is_complete() {
        Ok(())
    } else {
        Err(CliError::Partial(format!(
            "{} item(s) could not be restored",
            report.failures.len()
        )))
    }
}

fn report_restore_event(event: &RestoreEvent<'_>, mode: OutputMode, activity: &mut JsonlWriter) {
    match event {
        RestoreEvent::Restored { path, files } => {
            activity.write_entry(
                &LogEntry::new(EventType::FolderRestored, Severity::Info)
                    .with_path(*path)
                    .with_files(*files),
            );
            if mode == OutputMode::Human {
                println!("Restored folder: {path}");
            }
        }
        RestoreEvent::FolderFailed { path, error } => {
            activity.write_entry(
                &LogEntry::new(EventType::RestoreFailed, Severity::Warning)
                    .with_path(*path)
                    .with_error(error),
            );
            eprintln!("{} {path}: {error}", "Error restoring folder".yellow());
        }
        RestoreEvent::FileFailed { path, file, error } => {
            activity.write_entry(
                &LogEntry::new(EventType::RestoreFailed, Severity::Warning)
                    .with_path(format!("{path}/{file}"))
                    .with_error(error),
            );
            eprintln!(
                "{} {file} in {path}: {error}",
                "Error restoring file".yellow()
            );
        }
    }
}

fn print_restore_summary(report: &RestoreReport) {
    println!(
        "\n{} {} folder(s), {} file(s).",
        "Restore complete!".green(),
        report.folders_restored,
        report.files_written
    );
    if !report.is_complete() {
        println!(
            "{}",
            format!("  Failed: {} item(s)", report.failures.len()).yellow()
        );
    }
}

fn restore_summary_json(report: &RestoreReport, replayed: &[String], activity: &JsonlWriter) -> Value {
    json!({
        "command": "restore",
        "log_path": report.log_path.to_string_lossy(),
        "records": report.records_in_log,
        "restored": replayed,
        "folders_restored": report.folders_restored,
        "files_written": report.files_written,
        "failed": report
            .failures
            .iter()
            .map(|f| json!({
                "path": f.path.to_string_lossy(),
                "file": f.file,
                "error_code": f.error.code(),
                "error": f.error.to_string(),
            }))
            .collect::<Vec<_>>(),
        "activity_log": activity_log_json(activity),
        "elapsed_seconds": report.duration.as_secs_f64(),
    })
}

// ---------------------------------------------------------------------------
// Output helpers
// ---------------------------------------------------------------------------

/// Where activity events went, or `null` when they are being discarded.
fn activity_log_json(activity: &JsonlWriter) -> Value {
    if activity.is_active() {
        json!(activity.path().to_string_lossy())
    } else {
        Value::Null
    }
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("DIRSWEEP_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}
