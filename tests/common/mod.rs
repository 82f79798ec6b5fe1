#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use filetime::{FileTime, set_file_atime};

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
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
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_stp") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) { "stp.exe" } else { "stp" };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve stp binary path for integration test"),
    }
}

/// Run `stp` with no stdin.
pub fn run_cli_case(case_name: &str, args: &[&str]) -> CmdResult {
    run_cli_case_with_input(case_name, args, "")
}

/// Run `stp`, feeding `input` on stdin, and keep a per-case log of the exchange.
pub fn run_cli_case_with_input(case_name: &str, args: &[&str], input: &str) -> CmdResult {
    run_cli_case_inner(case_name, args, Stdio::piped(), Some(input))
}

/// Run `stp` with a caller-supplied stdin handle.
pub fn run_cli_case_with_stdin(case_name: &str, args: &[&str], stdin: Stdio) -> CmdResult {
    run_cli_case_inner(case_name, args, stdin, None)
}

fn run_cli_case_inner(
    case_name: &str,
    args: &[&str],
    stdin: Stdio,
    input: Option<&str>,
) -> CmdResult {
    let root = std::env::temp_dir().join("stp-test-logs");
    fs::create_dir_all(&root).expect("create temp test log dir");

    let log_path = root.join(format!("{}-{}.log", sanitize(case_name), now_millis()));
    let bin_path = resolve_bin_path();

    let mut child = Command::new(&bin_path)
        .args(args)
        // Keep a developer's own config out of the run.
        .env("HOME", &root)
        .env("RUST_BACKTRACE", "1")
        .stdin(stdin)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn stp command");
    if let Some(input) = input {
        child
            .stdin
            .take()
            .expect("stdin handle")
            .write_all(input.as_bytes())
            .expect("write stdin");
    }
    let output = child.wait_with_output().expect("wait for stp");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let mut log_content = String::new();
    log_content.push_str(&format!("case={case_name}\n"));
    log_content.push_str(&format!("bin={}\n", bin_path.display()));
    log_content.push_str(&format!("args={args:?}\n"));
    log_content.push_str(&format!("stdin={input:?}\n"));
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

/// Create a file last accessed `days` days ago.
pub fn aged_file(path: &Path, days: u64) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, b"payload").expect("write file");
    let when = SystemTime::now() - Duration::from_secs(days * 86_400);
    set_file_atime(path, FileTime::from_system_time(when)).expect("set atime");
}

pub fn path_arg(path: &Path) -> &str {
    path.to_str().expect("utf-8 temp path")
}
