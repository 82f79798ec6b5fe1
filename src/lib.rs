#![forbid(unsafe_code)]

//! Stale Tree Pruner (stp): removes files and directories whose last access
//! is older than an age limit.
//!
//! The walk is depth-first and bottom-up: stale files are deleted (or reported,
//! or offered for confirmation), then each drained directory is removed if it
//! ended up empty.
//!
//! # Library usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::time::SystemTime;
//!
//! use stale_tree_pruner::prelude::*;
//!
//! let policy = PolicyConfig {
//!     force: true,
//!     ..PolicyConfig::new(SystemTime::now(), 30.0)
//! };
//! let result = Pruner::new(policy, ScriptedConfirmer::default())
//!     .run(Path::new("/var/cache/builds"))?;
//! println!("{} files removed", result.files_removed);
//! # Ok::<(), PruneError>(())
//! ```

pub mod prelude;

pub mod core;
pub mod logger;
pub mod pruner;
