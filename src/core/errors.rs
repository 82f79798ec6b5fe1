//! STP-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, PruneError>;

/// Top-level error type for the pruner.
#[derive(Debug, Error)]
pub enum PruneError {
    #[error("[STP-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[STP-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[STP-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[STP-2001] not a listable directory: {path}: {details}")]
    InvalidRoot { path: PathBuf, details: String },

    #[error("[STP-2002] could not remove directory {path}: {source}")]
    DirectoryNotEmpty {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[STP-2003] cannot read access time of {path}: {source}")]
    MetadataUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[STP-2004] failed to delete {path}: {source}")]
    DeletionFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[STP-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[STP-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[STP-3003] confirmation prompt failed: {source}")]
    Prompt {
        #[source]
        source: std::io::Error,
    },
}

impl PruneError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "STP-1001",
            Self::MissingConfig { .. } => "STP-1002",
            Self::ConfigParse { .. } => "STP-1003",
            Self::InvalidRoot { .. } => "STP-2001",
            Self::DirectoryNotEmpty { .. } => "STP-2002",
            Self::MetadataUnreadable { .. } => "STP-2003",
            Self::DeletionFailed { .. } => "STP-2004",
            Self::Serialization { .. } => "STP-2101",
            Self::Io { .. } => "STP-3002",
            Self::Prompt { .. } => "STP-3003",
        }
    }

    /// Whether the walk can continue past this failure.
    ///
    /// Only a failed directory removal is absorbed by the walker; everything
    /// else aborts the run.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::DirectoryNotEmpty { .. })
    }

    /// Whether the failure stems from operator input rather than the environment.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig { .. }
                | Self::MissingConfig { .. }
                | Self::ConfigParse { .. }
                | Self::InvalidRoot { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for PruneError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for PruneError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
