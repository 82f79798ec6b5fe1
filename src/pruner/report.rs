//! Walk accounting: the event stream and counters produced by one run.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::paths::serialize_path_lossy;

/// One observable step of a walk, in the order it happened.
///
/// Paths are absolute; [`WalkEvent::render`] picks the operator-facing form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WalkEvent {
    /// Descending into a directory.
    Entered {
        #[serde(serialize_with = "serialize_path_lossy")]
        path: PathBuf,
    },
    /// A stale file was deleted.
    RemovedFile {
        #[serde(serialize_with = "serialize_path_lossy")]
        path: PathBuf,
    },
    /// A drained directory (or the root) was removed.
    RemovedDir {
        #[serde(serialize_with = "serialize_path_lossy")]
        path: PathBuf,
    },
    /// A directory survived its removal attempt, usually because it is not empty.
    RemoveDirFailed {
        #[serde(serialize_with = "serialize_path_lossy")]
        path: PathBuf,
        reason: String,
    },
    /// A stale file was reported and left in place.
    Notified {
        #[serde(serialize_with = "serialize_path_lossy")]
        path: PathBuf,
    },
    /// The depth limit stopped iteration of the remaining siblings.
    DepthLimitHit {
        #[serde(serialize_with = "serialize_path_lossy")]
        path: PathBuf,
        depth: usize,
    },
}

impl WalkEvent {
    /// Absolute path the event refers to.
    pub fn path(&self) -> &Path {
        match self {
            Self::Entered { path }
            | Self::RemovedFile { path }
            | Self::RemovedDir { path }
            | Self::RemoveDirFailed { path, .. }
            | Self::Notified { path }
            | Self::DepthLimitHit { path, .. } => path,
        }
    }

    /// Stable snake_case label, matching the serialized `event` tag.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Entered { .. } => "entered",
            Self::RemovedFile { .. } => "removed_file",
            Self::RemovedDir { .. } => "removed_dir",
            Self::RemoveDirFailed { .. } => "remove_dir_failed",
            Self::Notified { .. } => "notified",
            Self::DepthLimitHit { .. } => "depth_limit_hit",
        }
    }

    /// Warnings are the only events shown in a distinct colour by the CLI.
    pub const fn is_warning(&self) -> bool {
        matches!(
            self,
            Self::RemoveDirFailed { .. } | Self::DepthLimitHit { .. }
        )
    }

    /// Human-readable line with `shown` substituted for the path.
    pub fn render(&self, shown: &Path) -> String {
        let shown = shown.display();
        match self {
            Self::Entered { .. } => format!("Entering directory: {shown}."),
            Self::RemovedFile { .. } => format!("Removed {shown}."),
            Self::RemovedDir { .. } => format!("Removed directory: {shown}."),
            Self::RemoveDirFailed { .. } => {
                format!("WARNING: Couldn't remove directory: {shown}.")
            }
            Self::Notified { .. } => format!("Stale: {shown}"),
            Self::DepthLimitHit { depth, .. } => {
                format!("Depth limit {depth} reached at {shown}; skipping remaining entries.")
            }
        }
    }
}

impl fmt::Display for WalkEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(self.path()))
    }
}

/// Counters and event log for a single walk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WalkResult {
    pub files_removed: usize,
    pub directories_removed: usize,
    /// Stale files reported in notify-only mode.
    pub files_notified: usize,
    /// Stale files the operator declined to remove.
    pub files_declined: usize,
    /// Every stale file seen, whatever happened to it.
    pub stale_files: usize,
    pub events: Vec<WalkEvent>,
}

impl WalkResult {
    pub(crate) fn record(&mut self, event: WalkEvent) {
        match &event {
            WalkEvent::RemovedFile { .. } => self.files_removed += 1,
            WalkEvent::RemovedDir { .. } => self.directories_removed += 1,
            WalkEvent::Notified { .. } => self.files_notified += 1,
            WalkEvent::Entered { .. }
            | WalkEvent::RemoveDirFailed { .. }
            | WalkEvent::DepthLimitHit { .. } => {}
        }
        self.events.push(event);
    }

    /// Nothing was deleted.
    pub const fn is_noop(&self) -> bool {
        self.files_removed == 0 && self.directories_removed == 0
    }

    /// Events of one kind, in walk order.
    pub fn events_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a WalkEvent> + 'a {
        self.events.iter().filter(move |e| e.kind() == kind)
    }

    /// The two-line stats block printed in verbose mode.
    pub fn summary_lines(&self) -> [String; 2] {
        [
            format!("FILES: {}", self.files_removed),
            format!("DIRECTORIES: {}", self.directories_removed),
        ]
    }
}
