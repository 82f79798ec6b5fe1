//! Action policy: the immutable walk configuration and the per-file decision
//! it implies, plus the confirmation strategy used in interactive mode.

#![allow(missing_docs)]

use std::io::{BufRead, Write};
use std::path::Path;
use std::time::SystemTime;

use serde::Serialize;

use crate::core::errors::{PruneError, Result};
use crate::pruner::age::cutoff_from;

/// Walk policy, fixed for the duration of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyConfig {
    /// Entries last accessed before this instant are stale.
    #[serde(skip)]
    pub cutoff: SystemTime,
    /// Per-path depth limit below the root; `None` is unlimited.
    pub max_depth: Option<usize>,
    pub remove_files: bool,
    pub remove_directories: bool,
    pub force: bool,
    pub notify_only: bool,
    pub use_absolute_paths: bool,
    pub remove_root: bool,
    pub verbose: bool,
}

impl PolicyConfig {
    /// Policy with the cutoff `limit_days` before `now` and every other knob at
    /// its default: both removal kinds on, interactive, unlimited depth.
    #[must_use]
    pub fn new(now: SystemTime, limit_days: f64) -> Self {
        Self {
            cutoff: cutoff_from(now, limit_days),
            max_depth: None,
            remove_files: true,
            remove_directories: true,
            force: false,
            notify_only: false,
            use_absolute_paths: false,
            remove_root: false,
            verbose: false,
        }
    }

    /// Resolve what happens to a stale file under this policy.
    ///
    /// Precedence: file removal disabled, then notify-only, then force, then
    /// interactive confirmation.
    #[must_use]
    pub const fn file_action(&self) -> FileAction {
        if !self.remove_files {
            FileAction::Skip
        } else if self.notify_only {
            FileAction::Notify
        } else if self.force {
            FileAction::Delete
        } else {
            FileAction::Confirm
        }
    }

    /// Whether the walker may delete anything at all.
    #[must_use]
    pub const fn mutates(&self) -> bool {
        !self.notify_only
    }
}

/// Outcome of the action policy for one stale file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    /// Leave the file, emit nothing.
    Skip,
    /// Report the file, never delete it.
    Notify,
    /// Delete without asking.
    Delete,
    /// Ask the [`Confirmer`]; delete only on an affirmative answer.
    Confirm,
}

/// Answers the per-file removal question in interactive mode.
pub trait Confirmer {
    /// Return `true` to delete `path`.
    fn confirm(&mut self, path: &Path) -> Result<bool>;
}

/// True only for the literal answers `y` and `yes`.
///
/// One trailing `\n` or `\r\n` is stripped; no other trimming or case folding happens.
#[must_use]
pub fn is_affirmative(answer: &str) -> bool {
    let answer = answer
        .strip_suffix("\r\n")
        .or_else(|| answer.strip_suffix('\n'))
        .unwrap_or(answer);
    answer == "y" || answer == "yes"
}

/// Console confirmer: writes `Remove <path>? (y/n) ` and reads one line.
pub struct PromptConfirmer<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> PromptConfirmer<R, W> {
    pub const fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }
}

impl<R: BufRead, W: Write> Confirmer for PromptConfirmer<R, W> {
    fn confirm(&mut self, path: &Path) -> Result<bool> {
        write!(self.writer, "Remove {}? (y/n) ", path.display())
            .and_then(|()| self.writer.flush())
            .map_err(|source| PruneError::Prompt { source })?;

        let mut line = String::new();
        // EOF reads zero bytes and leaves `line` empty, which is a "no".
        self.reader
            .read_line(&mut line)
            .map_err(|source| PruneError::Prompt { source })?;
        Ok(is_affirmative(&line))
    }
}

/// Confirmer that replays a fixed list of answers, then declines.
#[derive(Debug, Clone, Default)]
pub struct ScriptedConfirmer {
    answers: std::collections::VecDeque<String>,
    asked: Vec<std::path::PathBuf>,
}

impl ScriptedConfirmer {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
        }
    }

    /// Paths the walker asked about, in order.
    pub fn asked(&self) -> &[std::path::PathBuf] {
        &self.asked
    }
}

impl Confirmer for ScriptedConfirmer {
    fn confirm(&mut self, path: &Path) -> Result<bool> {
        self.asked.push(path.to_path_buf());
        Ok(self
            .answers
            .pop_front()
            .is_some_and(|answer| is_affirmative(&answer)))
    }
}

impl<C: Confirmer + ?Sized> Confirmer for &mut C {
    fn confirm(&mut self, path: &Path) -> Result<bool> {
        (**self).confirm(path)
    }
}
