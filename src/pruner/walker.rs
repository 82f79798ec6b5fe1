//! Depth-bounded recursive pruner.
//!
//! The walk is single-threaded and depth-first. Each directory is drained
//! before its own removal is attempted, so removal is bottom-up and only
//! succeeds for directories that ended up empty. Child paths are joined onto
//! the parent path; the process working directory is never touched.
//!
//! Safety invariants:
//! - Fresh files are never deleted and produce no event
//! - Nothing is deleted in notify-only mode
//! - Symlinks are neither followed nor deleted
//! - Entry order is whatever `read_dir` yields; no sorting is applied

#![allow(missing_docs)]

use std::fs;
use std::path::Path;

use crate::core::errors::{PruneError, Result};
use crate::core::paths::resolve_absolute_path;
use crate::pruner::age::{is_stale, last_access};
use crate::pruner::policy::{Confirmer, FileAction, PolicyConfig};
use crate::pruner::report::{WalkEvent, WalkResult};

type Observer<'a> = Box<dyn FnMut(&WalkEvent) + 'a>;

/// Recursive tree pruner bound to one policy and one confirmation strategy.
pub struct Pruner<'a> {
    policy: PolicyConfig,
    confirmer: Box<dyn Confirmer + 'a>,
    observer: Option<Observer<'a>>,
}

impl<'a> Pruner<'a> {
    pub fn new(policy: PolicyConfig, confirmer: impl Confirmer + 'a) -> Self {
        Self {
            policy,
            confirmer: Box::new(confirmer),
            observer: None,
        }
    }

    /// Observe events live, before they are appended to the result.
    ///
    /// Interactive prompts are issued between events, so an observer that
    /// prints keeps prompts and progress lines in walk order.
    #[must_use]
    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: FnMut(&WalkEvent) + 'a,
    {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Validate `root`, prune everything below it, then optionally the root.
    ///
    /// An unlistable root fails with [`PruneError::InvalidRoot`] before any
    /// mutation. Failed directory removals are recorded and the walk goes on;
    /// any other I/O failure aborts and is returned.
    pub fn run(&mut self, root: &Path) -> Result<WalkResult> {
        let root = resolve_absolute_path(root);
        let entries = list_root(&root)?;

        let mut result = WalkResult::default();
        self.walk_entries(entries, &root, 0, &mut result)?;

        if self.policy.remove_root && self.policy.mutates() {
            self.remove_directory(&root, &mut result)?;
        }
        Ok(result)
    }

    fn walk_dir(&mut self, dir: &Path, depth: usize, result: &mut WalkResult) -> Result<()> {
        let entries = fs::read_dir(dir).map_err(|e| PruneError::io(dir, e))?;
        self.walk_entries(entries, dir, depth, result)
    }

    fn walk_entries(
        &mut self,
        entries: fs::ReadDir,
        dir: &Path,
        depth: usize,
        result: &mut WalkResult,
    ) -> Result<()> {
        for entry in entries {
            let entry = entry.map_err(|e| PruneError::io(dir, e))?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(|e| PruneError::io(&path, e))?;

            if file_type.is_file() {
                if self.policy.remove_files {
                    self.visit_file(&path, result)?;
                }
            } else if file_type.is_dir() && self.policy.remove_directories {
                if self.policy.max_depth.is_some_and(|max| depth >= max) {
                    self.emit(WalkEvent::DepthLimitHit { path, depth }, result);
                    // Remaining siblings of `dir` are left unvisited.
                    break;
                }
                self.emit(WalkEvent::Entered { path: path.clone() }, result);
                self.walk_dir(&path, depth + 1, result)?;
                if self.policy.mutates() {
                    self.remove_directory(&path, result)?;
                }
            }
        }
        Ok(())
    }

    fn visit_file(&mut self, path: &Path, result: &mut WalkResult) -> Result<()> {
        if !is_stale(last_access(path)?, self.policy.cutoff) {
            return Ok(());
        }
        result.stale_files += 1;

        match self.policy.file_action() {
            FileAction::Skip => {}
            FileAction::Notify => {
                self.emit(
                    WalkEvent::Notified {
                        path: path.to_path_buf(),
                    },
                    result,
                );
            }
            FileAction::Delete => self.delete_file(path, result)?,
            FileAction::Confirm => {
                if self.confirmer.confirm(path)? {
                    self.delete_file(path, result)?;
                } else {
                    result.files_declined += 1;
                }
            }
        }
        Ok(())
    }

    fn delete_file(&mut self, path: &Path, result: &mut WalkResult) -> Result<()> {
        fs::remove_file(path).map_err(|source| PruneError::DeletionFailed {
            path: path.to_path_buf(),
            source,
        })?;
        self.emit(
            WalkEvent::RemovedFile {
                path: path.to_path_buf(),
            },
            result,
        );
        Ok(())
    }

    /// Empty-directory removal; recoverable failures are recorded as events.
    fn remove_directory(&mut self, path: &Path, result: &mut WalkResult) -> Result<()> {
        let event = match remove_empty_dir(path) {
            Ok(()) => WalkEvent::RemovedDir {
                path: path.to_path_buf(),
            },
            Err(err) if err.is_recoverable() => WalkEvent::RemoveDirFailed {
                path: path.to_path_buf(),
                reason: err.to_string(),
            },
            Err(err) => return Err(err),
        };
        self.emit(event, result);
        Ok(())
    }

    fn emit(&mut self, event: WalkEvent, result: &mut WalkResult) {
        if let Some(observer) = self.observer.as_mut() {
            observer(&event);
        }
        result.record(event);
    }
}

fn remove_empty_dir(path: &Path) -> Result<()> {
    fs::remove_dir(path).map_err(|source| PruneError::DirectoryNotEmpty {
        path: path.to_path_buf(),
        source,
    })
}

fn list_root(root: &Path) -> Result<fs::ReadDir> {
    fs::read_dir(root).map_err(|e| PruneError::InvalidRoot {
        path: root.to_path_buf(),
        details: e.to_string(),
    })
}
