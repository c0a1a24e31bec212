#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

impl CmdResult {
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }
}

/// Everything a CLI case may vary besides its arguments.
#[derive(Default)]
pub struct CaseOptions<'a> {
    /// Working directory; the default recovery log lands here.
    pub cwd: Option<&'a Path>,
    /// Bytes fed to stdin (interactive menu).
    pub stdin: Option<&'a str>,
    pub env: Vec<(&'a str, &'a str)>,
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_bin_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_dirsweep") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) {
        "dirsweep.exe"
    } else {
        "dirsweep"
    };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve dirsweep binary path for integration test"),
    }
}

pub fn run_cli_case(case_name: &str, args: &[&str]) -> CmdResult {
    run_cli_case_with(case_name, args, &CaseOptions::default())
}

/// Run the binary isolated from the user's config and activity log.
///
/// `HOME` points at a scratch directory so neither the default config file
/// nor the default activity log of the machine running the tests is touched.
pub fn run_cli_case_with(case_name: &str, args: &[&str], opts: &CaseOptions<'_>) -> CmdResult {
    let root = std::env::temp_dir().join("dirsweep-test-logs");
    fs::create_dir_all(&root).expect("create temp test log dir");

    let stamp = format!("{}-{}", sanitize(case_name), now_millis());
    let log_path = root.join(format!("{stamp}.log"));
    let home = root.join(format!("{stamp}-home"));
    fs::create_dir_all(&home).expect("create scratch home");
    let bin_path = resolve_bin_path();

    let mut command = Command::new(&bin_path);
    command
        .args(args)
        .env("HOME", &home)
        .env("DIRSWEEP_ACTIVITY_LOG", home.join("activity.jsonl"))
        .env_remove("DIRSWEEP_RECOVERY_LOG")
        .env_remove("DIRSWEEP_BASE_DIR")
        .env_remove("DIRSWEEP_DRY_RUN")
        .env_remove("DIRSWEEP_OUTPUT_FORMAT")
        .env("RUST_BACKTRACE", "1")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for (key, value) in &opts.env {
        command.env(key, value);
    }
    if let Some(cwd) = opts.cwd {
        command.current_dir(cwd);
    }

    let mut child = command.spawn().expect("spawn dirsweep command");
    {
        let mut stdin = child.stdin.take().expect("child stdin");
        if let Some(input) = opts.stdin {
            stdin.write_all(input.as_bytes()).expect("write stdin");
        }
    }
    let output = child.wait_with_output().expect("execute dirsweep command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let mut log_content = String::new();
    log_content.push_str(&format!("case={case_name}\n"));
    log_content.push_str(&format!("bin={}\n", bin_path.display()));
    log_content.push_str(&format!("args={args:?}\n"));
    log_content.push_str(&format!("stdin={:?}\n", opts.stdin));
    log_content.push_str(&format!("status={}\n", output.status));
    log_content.push_str("----- stdout -----\n");
    log_content.push_str(&stdout);
    log_content.push('\n');
    log_content.push_str("----- stderr -----\n");
    log_content.push_str(&stderr);
    log_content.push('\n');
    fs::write(&log_path, log_content).expect("write test log");

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}

/// Create every directory in `dirs` and every `(path, contents)` file under `root`.
pub fn build_tree(root: &Path, dirs: &[&str], files: &[(&str, &str)]) {
    for dir in dirs {
        fs::create_dir_all(root.join(dir)).expect("create tree dir");
    }
    for (path, contents) in files {
        let full = root.join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).expect("create file parent");
        }
        fs::write(full, contents).expect("write tree file");
    }
}
