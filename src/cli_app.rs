//! Top-level CLI definition and dispatch.

use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use clap::{CommandFactory, Parser};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde::Serialize;
use thiserror::Error;

use stale_tree_pruner::core::config::Config;
use stale_tree_pruner::core::errors::PruneError;
use stale_tree_pruner::core::paths::{display_path, resolve_absolute_path, serialize_path_lossy};
use stale_tree_pruner::logger::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, Severity};
use stale_tree_pruner::pruner::age::cutoff_from;
use stale_tree_pruner::pruner::policy::{PolicyConfig, PromptConfirmer};
use stale_tree_pruner::pruner::report::{WalkEvent, WalkResult};
use stale_tree_pruner::pruner::walker::Pruner;

/// Multi-letter single-dash flags accepted for compatibility, and their long forms.
const LEGACY_FLAGS: [(&str, &str); 3] = [
    ("-nd", "--no-dirs"),
    ("-nf", "--no-files"),
    ("-abs", "--abs"),
];

/// Stale Tree Pruner: clears out files not accessed within LIMIT days.
#[derive(Debug, Parser)]
#[command(
    name = "stp",
    author,
    version,
    about = "A utility for clearing out old files in a tree like structure.",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Parent node of the directory tree.
    #[arg(value_name = "ROOT", required_unless_present = "completions")]
    root: Option<PathBuf>,
    /// Remove entries not accessed within this many days.
    #[arg(value_name = "LIMIT", required_unless_present = "completions")]
    limit: Option<u32>,
    /// Maximum recursion depth below the root (unlimited if omitted).
    #[arg(short = 'd', long = "depth", value_name = "N")]
    depth: Option<usize>,
    /// Force removal (no prompts).
    #[arg(short = 'f', long)]
    force: bool,
    /// Report every operation and print final stats.
    #[arg(short = 'v', long)]
    verbose: bool,
    /// Do not remove (or descend into) directories. Also `-nd`.
    #[arg(long = "no-dirs")]
    no_dirs: bool,
    /// Do not remove any files. Also `-nf`.
    #[arg(long = "no-files")]
    no_files: bool,
    /// Remove the root directory as well.
    #[arg(short = 'c', long = "complete")]
    complete: bool,
    /// Only report stale files; delete nothing.
    #[arg(short = 'n', long = "notify")]
    notify: bool,
    /// Show absolute paths in reports. Also `-abs`.
    #[arg(long = "abs")]
    abs: bool,
    /// Override config file path.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Append a JSONL activity log to PATH.
    #[arg(long, value_name = "PATH")]
    log: Option<PathBuf>,
    /// Print a JSON report instead of human output.
    #[arg(long)]
    json: bool,
    /// Disable colored output.
    #[arg(long)]
    no_color: bool,
    /// Print a shell completion script and exit.
    #[arg(long, value_enum, value_name = "SHELL")]
    completions: Option<CompletionShell>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input (bad root, bad config).
    #[error("{0}")]
    User(String),
    /// Filesystem or environment failure during the walk.
    #[error("{0}")]
    Runtime(String),
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
        }
    }
}

impl From<PruneError> for CliError {
    fn from(err: PruneError) -> Self {
        match err {
            PruneError::InvalidRoot { path, details } => Self::User(format!(
                "Please enter a valid directory: {} ({details})",
                path.display()
            )),
            err if err.is_user_error() => Self::User(err.to_string()),
            err => Self::Runtime(err.to_string()),
        }
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(serialize_with = "serialize_path_lossy")]
    root: &'a Path,
    cutoff: String,
    policy: &'a PolicyConfig,
    #[serde(flatten)]
    result: &'a WalkResult,
}

/// Rewrite legacy `-nd`/`-nf`/`-abs` tokens to their long forms so clap can
/// parse them. Tokens after a bare `--` are left alone.
pub fn normalize_legacy_flags<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut passthrough = false;
    args.into_iter()
        .map(|arg| {
            if passthrough {
                return arg;
            }
            if arg == "--" {
                passthrough = true;
                return arg;
            }
            LEGACY_FLAGS
                .iter()
                .find(|(legacy, _)| arg == *legacy)
                .map_or(arg, |(_, long)| OsString::from(long))
        })
        .collect()
}

/// Dispatch the CLI.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    if let Some(shell) = cli.completions {
        let mut command = Cli::command();
        let binary_name = command.get_name().to_string();
        generate(shell, &mut command, binary_name, &mut io::stdout());
        return Ok(());
    }

    let (Some(root), Some(limit)) = (cli.root.as_deref(), cli.limit) else {
        return Err(CliError::User("ROOT and LIMIT are required".to_string()));
    };

    let config = Config::load(cli.config.as_deref())?;
    let policy = build_policy(cli, &config, limit, SystemTime::now());
    let mode = output_mode(cli);

    let mut log = cli
        .log
        .clone()
        .map(|path| JsonlConfig {
            path,
            max_size_bytes: config.log.max_size_bytes,
            max_rotated_files: config.log.max_rotated_files,
        })
        .or_else(|| JsonlConfig::from_log_config(&config.log))
        .map(JsonlWriter::open);

    if let Some(writer) = log.as_mut() {
        writer.write_entry(
            &LogEntry::new(EventType::WalkStart, Severity::Info)
                .with_path(root)
                .with_details(format!("cutoff={}", format_cutoff(policy.cutoff))),
        );
    }

    // Prompts go to stderr in JSON mode so stdout stays one document.
    let prompt_out: Box<dyn Write> = match mode {
        OutputMode::Human => Box::new(io::stdout()),
        OutputMode::Json => Box::new(io::stderr()),
    };
    let confirmer = PromptConfirmer::new(io::stdin().lock(), prompt_out);

    let printer = EventPrinter {
        root: root.to_path_buf(),
        root_abs: resolve_absolute_path(root),
        absolute: policy.use_absolute_paths,
        verbose: policy.verbose,
        mode,
    };

    let outcome = Pruner::new(policy.clone(), confirmer)
        .with_observer(|event| {
            printer.print(event);
            if let Some(writer) = log.as_mut() {
                writer.write_entry(&LogEntry::from_event(event));
            }
        })
        .run(root);

    let result = match outcome {
        Ok(result) => result,
        Err(err) => {
            if let Some(writer) = log.as_mut() {
                writer.write_entry(&LogEntry::error(&err));
            }
            return Err(err.into());
        }
    };

    if let Some(writer) = log.as_mut() {
        writer.write_entry(&LogEntry::walk_complete(&printer.root_abs, &result));
    }

    match mode {
        OutputMode::Human => {
            if policy.verbose {
                println!("====== REMOVE STATS ======");
                for line in result.summary_lines() {
                    println!("{line}");
                }
            }
        }
        OutputMode::Json => {
            let report = JsonReport {
                root: &printer.root_abs,
                cutoff: format_cutoff(policy.cutoff),
                policy: &policy,
                result: &result,
            };
            let document = serde_json::to_string_pretty(&report)?;
            writeln!(io::stdout().lock(), "{document}")?;
        }
    }
    Ok(())
}

/// Merge config defaults with command-line flags. A set flag always wins.
fn build_policy(cli: &Cli, config: &Config, limit_days: u32, now: SystemTime) -> PolicyConfig {
    let defaults = &config.defaults;
    PolicyConfig {
        cutoff: cutoff_from(now, f64::from(limit_days)),
        max_depth: cli.depth.or_else(|| defaults.depth_limit()),
        remove_files: defaults.remove_files && !cli.no_files,
        remove_directories: defaults.remove_directories && !cli.no_dirs,
        force: cli.force || defaults.force,
        notify_only: cli.notify,
        use_absolute_paths: cli.abs || defaults.absolute_paths,
        remove_root: cli.complete,
        verbose: cli.verbose || defaults.verbose,
    }
}

const fn output_mode(cli: &Cli) -> OutputMode {
    if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    }
}

fn format_cutoff(cutoff: SystemTime) -> String {
    chrono::DateTime::<chrono::Utc>::from(cutoff)
        .to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// Live human output for walk events.
struct EventPrinter {
    root: PathBuf,
    root_abs: PathBuf,
    absolute: bool,
    verbose: bool,
    mode: OutputMode,
}

impl EventPrinter {
    fn print(&self, event: &WalkEvent) {
        if self.mode == OutputMode::Json {
            return;
        }
        // Notifications are the point of notify-only mode; everything else is progress.
        let is_notice = matches!(event, WalkEvent::Notified { .. });
        if !self.verbose && !is_notice {
            return;
        }

        let text = event.render(&self.shown_path(event));
        let line = match event {
            WalkEvent::RemovedFile { .. } | WalkEvent::RemovedDir { .. } => text.as_str().green(),
            WalkEvent::Notified { .. } => text.as_str().cyan(),
            _ if event.is_warning() => text.as_str().yellow(),
            _ => text.as_str().normal(),
        };
        println!("{line}");
    }

    fn shown_path(&self, event: &WalkEvent) -> PathBuf {
        let path = event.path();
        if path == self.root_abs {
            return if self.absolute {
                self.root_abs.clone()
            } else {
                self.root.clone()
            };
        }
        // Removed files are always reported in full.
        let absolute = self.absolute || matches!(event, WalkEvent::RemovedFile { .. });
        display_path(path, &self.root_abs, absolute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    fn parse(args: &[&str]) -> Cli {
        let argv = std::iter::once("stp")
            .chain(args.iter().copied())
            .map(OsString::from);
        Cli::try_parse_from(normalize_legacy_flags(argv)).unwrap()
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn legacy_flags_are_rewritten() {
        let out = normalize_legacy_flags(
            ["stp", "-nd", "/r", "-nf", "-abs", "--", "-nd"].map(OsString::from),
        );
        assert_eq!(
            out,
            ["stp", "--no-dirs", "/r", "--no-files", "--abs", "--", "-nd"].map(OsString::from)
        );
    }

    #[test]
    fn parses_full_flag_set() {
        let cli = parse(&["/srv/tmp", "14", "-d", "2", "-f", "-v", "-nd", "-nf", "-c", "-n", "-abs"]);
        assert_eq!(cli.root.as_deref(), Some(Path::new("/srv/tmp")));
        assert_eq!(cli.limit, Some(14));
        assert_eq!(cli.depth, Some(2));
        assert!(cli.force && cli.verbose && cli.no_dirs && cli.no_files);
        assert!(cli.complete && cli.notify && cli.abs);
    }

    #[test]
    fn root_and_limit_are_required() {
        assert!(Cli::try_parse_from(["stp", "/srv/tmp"]).is_err());
        assert!(Cli::try_parse_from(["stp", "/srv/tmp", "ten"]).is_err());
    }

    #[test]
    fn completions_do_not_need_positionals() {
        let cli = Cli::try_parse_from(["stp", "--completions", "bash"]).unwrap();
        assert!(cli.completions.is_some());
        assert!(cli.root.is_none());
    }

    #[test]
    fn policy_layers_flags_over_config() {
        let now = UNIX_EPOCH + Duration::from_secs(100 * 86_400);
        let mut config = Config::default();
        config.defaults.max_depth = 4;
        config.defaults.verbose = true;

        let cli = parse(&["/r", "10", "-nf"]);
        let policy = build_policy(&cli, &config, 10, now);
        assert_eq!(policy.cutoff, UNIX_EPOCH + Duration::from_secs(90 * 86_400));
        assert_eq!(policy.max_depth, Some(4));
        assert!(policy.verbose);
        assert!(!policy.remove_files);
        assert!(policy.remove_directories);
        assert!(!policy.force);

        let cli = parse(&["/r", "10", "-d", "0", "-f"]);
        let policy = build_policy(&cli, &config, 10, now);
        assert_eq!(policy.max_depth, Some(0));
        assert!(policy.force);
    }

    #[test]
    fn invalid_root_maps_to_user_exit_code() {
        let err: CliError = PruneError::InvalidRoot {
            path: PathBuf::from("/missing"),
            details: "No such file or directory".to_string(),
        }
        .into();
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("Please enter a valid directory"));

        let err: CliError = PruneError::io("/x", io::Error::other("boom")).into();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn walk_aborting_errors_map_to_runtime_exit_code() {
        let gone = || io::Error::from(io::ErrorKind::NotFound);
        for err in [
            PruneError::DeletionFailed {
                path: PathBuf::from("/r/a"),
                source: gone(),
            },
            PruneError::MetadataUnreadable {
                path: PathBuf::from("/r/b"),
                source: gone(),
            },
        ] {
            let code = err.code();
            let err = CliError::from(err);
            assert_eq!(err.exit_code(), 2);
            assert!(err.to_string().contains(code));
        }
    }

    #[cfg(unix)]
    #[test]
    fn json_report_renders_cutoff_once() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let policy = PolicyConfig::new(UNIX_EPOCH + Duration::from_secs(30 * 86_400), 7.0);
        let root = Path::new("/r").join(OsStr::from_bytes(b"\xff"));
        let result = WalkResult::default();
        let report = JsonReport {
            root: &root,
            cutoff: format_cutoff(policy.cutoff),
            policy: &policy,
            result: &result,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["cutoff"], "1970-01-24T00:00:00Z");
        assert!(json["policy"].get("cutoff").is_none());
        assert_eq!(json["root"], "/r/\u{fffd}");
    }

    #[test]
    fn printer_shows_root_relative_paths() {
        let printer = EventPrinter {
            root: PathBuf::from("tree"),
            root_abs: PathBuf::from("/work/tree"),
            absolute: false,
            verbose: true,
            mode: OutputMode::Human,
        };
        let entered = WalkEvent::Entered {
            path: PathBuf::from("/work/tree/a"),
        };
        assert_eq!(printer.shown_path(&entered), PathBuf::from("a"));

        let removed = WalkEvent::RemovedFile {
            path: PathBuf::from("/work/tree/a/f"),
        };
        assert_eq!(printer.shown_path(&removed), PathBuf::from("/work/tree/a/f"));

        let root = WalkEvent::RemovedDir {
            path: PathBuf::from("/work/tree"),
        };
        assert_eq!(printer.shown_path(&root), PathBuf::from("tree"));
    }
}
