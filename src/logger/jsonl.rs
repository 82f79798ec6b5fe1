//! JSONL activity log: one self-contained JSON object per line, appended as a
//! single `write_all` so a concurrent `tail -f` never sees a partial line.
//!
//! Degradation chain:
//! 1. Configured file path
//! 2. stderr with `[STP-JSONL]` prefix
//! 3. Silent discard (a logging failure must never abort a walk)

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions, rename};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{PruneError, Result};
use crate::pruner::report::{WalkEvent, WalkResult};

/// Severity level for log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Entry kinds written to the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    WalkStart,
    Entered,
    RemovedFile,
    RemovedDir,
    RemoveDirFailed,
    Notified,
    DepthLimitHit,
    WalkComplete,
    Error,
}

/// A single JSONL log entry; everything but `ts`, `event`, `severity` is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// RFC 3339 UTC timestamp.
    pub ts: String,
    pub event: EventType,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files_removed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directories_removed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
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
            depth: None,
            files_removed: None,
            directories_removed: None,
            error_code: None,
            details: None,
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: &Path) -> Self {
        self.path = Some(path.to_string_lossy().into_owned());
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Entry for one walk event.
    pub fn from_event(event: &WalkEvent) -> Self {
        let (kind, severity) = match event {
            WalkEvent::Entered { .. } => (EventType::Entered, Severity::Info),
            WalkEvent::RemovedFile { .. } => (EventType::RemovedFile, Severity::Info),
            WalkEvent::RemovedDir { .. } => (EventType::RemovedDir, Severity::Info),
            WalkEvent::RemoveDirFailed { .. } => (EventType::RemoveDirFailed, Severity::Warning),
            WalkEvent::Notified { .. } => (EventType::Notified, Severity::Info),
            WalkEvent::DepthLimitHit { .. } => (EventType::DepthLimitHit, Severity::Warning),
        };
        let mut entry = Self::new(kind, severity).with_path(event.path());
        match event {
            WalkEvent::DepthLimitHit { depth, .. } => entry.depth = Some(*depth),
            WalkEvent::RemoveDirFailed { reason, .. } => entry.details = Some(reason.clone()),
            _ => {}
        }
        entry
    }

    /// Closing entry carrying the run totals.
    pub fn walk_complete(root: &Path, result: &WalkResult) -> Self {
        let mut entry = Self::new(EventType::WalkComplete, Severity::Info).with_path(root);
        entry.files_removed = Some(result.files_removed);
        entry.directories_removed = Some(result.directories_removed);
        entry
    }

    /// Entry for a walk-aborting failure.
    pub fn error(err: &PruneError) -> Self {
        let mut entry = Self::new(EventType::Error, Severity::Critical);
        entry.error_code = Some(err.code().to_string());
        entry.details = Some(err.to_string());
        entry
    }
}

/// Degradation state of the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Normal,
    Stderr,
    Discard,
}

/// Configuration for the JSONL writer.
#[derive(Debug, Clone)]
pub struct JsonlConfig {
    pub path: PathBuf,
    /// Size at which the current file is rotated to `<path>.1`.
    pub max_size_bytes: u64,
    /// Number of rotated files kept.
    pub max_rotated_files: u32,
}

impl JsonlConfig {
    /// Writer settings from the `[log]` config section, if a path is set.
    pub fn from_log_config(log: &crate::core::config::LogConfig) -> Option<Self> {
        log.jsonl_path.as_ref().map(|path| Self {
            path: path.clone(),
            max_size_bytes: log.max_size_bytes,
            max_rotated_files: log.max_rotated_files,
        })
    }
}

/// Append-only JSONL writer with size-based rotation.
pub struct JsonlWriter {
    config: JsonlConfig,
    writer: Option<BufWriter<File>>,
    state: WriterState,
    bytes_written: u64,
}

impl JsonlWriter {
    /// Open the log file, falling back to stderr if it cannot be opened.
    pub fn open(config: JsonlConfig) -> Self {
        let mut w = Self {
            config,
            writer: None,
            state: WriterState::Discard,
            bytes_written: 0,
        };
        match open_append(&w.config.path) {
            Ok((file, size)) => {
                w.writer = Some(BufWriter::new(file));
                w.state = WriterState::Normal;
                w.bytes_written = size;
            }
            Err(e) => {
                let _ = writeln!(io::stderr(), "[STP-JSONL] {e}; logging to stderr");
                w.state = WriterState::Stderr;
            }
        }
        w
    }

    /// Write a single log entry as one JSONL line.
    pub fn write_entry(&mut self, entry: &LogEntry) {
        let line = match serde_json::to_string(entry) {
            Ok(json) => format!("{json}\n"),
            Err(e) => {
                let _ = writeln!(io::stderr(), "[STP-JSONL] serialize error: {e}");
                return;
            }
        };
        self.write_line(&line);
    }

    pub fn flush(&mut self) {
        if let Some(w) = self.writer.as_mut() {
            let _ = w.flush();
        }
    }

    /// Current degradation state.
    pub fn state(&self) -> &str {
        match self.state {
            WriterState::Normal => "normal",
            WriterState::Stderr => "stderr",
            WriterState::Discard => "discard",
        }
    }

    fn write_line(&mut self, line: &str) {
        if self.state == WriterState::Normal
            && self.bytes_written + line.len() as u64 > self.config.max_size_bytes
        {
            self.rotate();
        }

        match self.state {
            WriterState::Normal => {
                let written = self
                    .writer
                    .as_mut()
                    .is_some_and(|w| w.write_all(line.as_bytes()).is_ok());
                if written {
                    self.bytes_written += line.len() as u64;
                } else {
                    self.degrade();
                    self.write_line(line);
                }
            }
            WriterState::Stderr => {
                if write!(io::stderr(), "[STP-JSONL] {line}").is_err() {
                    self.degrade();
                }
            }
            WriterState::Discard => {}
        }
    }

    fn degrade(&mut self) {
        self.writer = None;
        self.state = match self.state {
            WriterState::Normal => {
                let _ = writeln!(io::stderr(), "[STP-JSONL] write failed, using stderr");
                WriterState::Stderr
            }
            WriterState::Stderr | WriterState::Discard => WriterState::Discard,
        };
    }

    fn rotate(&mut self) {
        if let Some(w) = self.writer.as_mut() {
            let _ = w.flush();
        }
        self.writer = None;

        let base = self.config.path.clone();
        // .N is dropped, .N-1 → .N, …, current → .1
        let _ = fs::remove_file(rotated_name(&base, self.config.max_rotated_files));
        for i in (1..self.config.max_rotated_files).rev() {
            let _ = rename(rotated_name(&base, i), rotated_name(&base, i + 1));
        }
        let _ = rename(&base, rotated_name(&base, 1));

        match open_append(&base) {
            Ok((file, _)) => {
                self.writer = Some(BufWriter::new(file));
                self.bytes_written = 0;
            }
            Err(_) => self.degrade(),
        }
    }
}

impl Drop for JsonlWriter {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Open or create a file for appending. Returns `(File, current_size)`.
fn open_append(path: &Path) -> Result<(File, u64)> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| PruneError::io(parent, source))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| PruneError::io(path, source))?;
    let size = file.metadata().map(|m| m.len()).unwrap_or(0);
    Ok((file, size))
}

/// `foo.jsonl` → `foo.jsonl.3`.
fn rotated_name(base: &Path, index: u32) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

fn format_utc_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(path: PathBuf, max_size_bytes: u64) -> JsonlConfig {
        JsonlConfig {
            path,
            max_size_bytes,
            max_rotated_files: 3,
        }
    }

    fn read_lines(path: &Path) -> Vec<serde_json::Value> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn write_entry_produces_valid_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.jsonl");
        let mut writer = JsonlWriter::open(config(path.clone(), 1024 * 1024));

        writer.write_entry(&LogEntry::new(EventType::WalkStart, Severity::Info));
        writer.flush();

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["event"], "walk_start");
        assert_eq!(lines[0]["severity"], "info");
        assert!(lines[0]["ts"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn walk_events_map_to_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("walk.jsonl");
        let mut writer = JsonlWriter::open(config(path.clone(), 1024 * 1024));

        writer.write_entry(&LogEntry::from_event(&WalkEvent::DepthLimitHit {
            path: PathBuf::from("/r/deep"),
            depth: 3,
        }));
        writer.write_entry(&LogEntry::from_event(&WalkEvent::RemoveDirFailed {
            path: PathBuf::from("/r/full"),
            reason: "Directory not empty".to_string(),
        }));
        writer.flush();

        let lines = read_lines(&path);
        assert_eq!(lines[0]["event"], "depth_limit_hit");
        assert_eq!(lines[0]["depth"], 3);
        assert_eq!(lines[0]["severity"], "warning");
        assert_eq!(lines[1]["event"], "remove_dir_failed");
        assert_eq!(lines[1]["details"], "Directory not empty");
    }

    #[test]
    fn walk_complete_carries_totals() {
        let result = WalkResult {
            files_removed: 3,
            directories_removed: 1,
            ..WalkResult::default()
        };
        let entry = LogEntry::walk_complete(Path::new("/r"), &result);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["files_removed"], 3);
        assert_eq!(json["directories_removed"], 1);
        assert_eq!(json["path"], "/r");
    }

    #[test]
    fn appends_across_writers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("append.jsonl");
        for _ in 0..2 {
            let mut writer = JsonlWriter::open(config(path.clone(), 1024 * 1024));
            writer.write_entry(&LogEntry::new(EventType::WalkComplete, Severity::Info));
        }
        assert_eq!(read_lines(&path).len(), 2);
    }

    #[test]
    fn rotation_shifts_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rot.jsonl");
        let mut writer = JsonlWriter::open(config(path.clone(), 100));

        for _ in 0..10 {
            writer.write_entry(&LogEntry::new(EventType::WalkComplete, Severity::Info));
        }
        writer.flush();

        assert!(path.exists());
        assert!(rotated_name(&path, 1).exists());
        assert!(!rotated_name(&path, 4).exists());
    }

    #[cfg(unix)]
    #[test]
    fn unwritable_path_degrades_to_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"").unwrap();
        // A regular file cannot be a parent directory.
        let writer = JsonlWriter::open(config(blocker.join("log.jsonl"), 1024));
        assert_eq!(writer.state(), "stderr");
    }

    #[test]
    fn optional_fields_omitted_when_none() {
        let line = serde_json::to_string(&LogEntry::new(EventType::WalkStart, Severity::Info))
            .unwrap();
        assert!(!line.contains("\"path\""));
        assert!(!line.contains("\"depth\""));
        assert!(!line.contains("\"error_code\""));
    }

    #[test]
    fn error_entry_carries_code() {
        let err = PruneError::io("/r/x", std::io::Error::other("boom"));
        let entry = LogEntry::error(&err);
        assert_eq!(entry.error_code.as_deref(), Some("STP-3002"));
        assert_eq!(entry.severity, Severity::Critical);
    }
}
