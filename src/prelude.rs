//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use stale_tree_pruner::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{PruneError, Result};

// Logger
pub use crate::logger::jsonl::{JsonlConfig, JsonlWriter, LogEntry};

// Pruner
pub use crate::pruner::age::{cutoff_from, is_stale};
pub use crate::pruner::policy::{
    Confirmer, FileAction, PolicyConfig, PromptConfirmer, ScriptedConfirmer,
};
pub use crate::pruner::report::{WalkEvent, WalkResult};
pub use crate::pruner::walker::Pruner;
