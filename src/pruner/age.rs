//! Age predicate: turns a day limit into a cutoff instant and compares access
//! times against it.

use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::core::errors::{PruneError, Result};

const SECS_PER_DAY: f64 = 86_400.0;

/// Compute `now - limit_days`, clamped to the Unix epoch.
///
/// Fractional days are ordinary duration arithmetic. Negative or NaN limits
/// are treated as zero so the cutoff never moves into the future.
#[must_use]
pub fn cutoff_from(now: SystemTime, limit_days: f64) -> SystemTime {
    let secs = if limit_days.is_finite() {
        (limit_days * SECS_PER_DAY).max(0.0)
    } else if limit_days.is_infinite() && limit_days.is_sign_positive() {
        return UNIX_EPOCH;
    } else {
        0.0
    };
    Duration::try_from_secs_f64(secs)
        .ok()
        .and_then(|age| now.checked_sub(age))
        .map_or(UNIX_EPOCH, |cutoff| cutoff.max(UNIX_EPOCH))
}

/// True iff `last_access` is strictly older than `cutoff`.
#[must_use]
pub fn is_stale(last_access: SystemTime, cutoff: SystemTime) -> bool {
    last_access < cutoff
}

/// Read the last-access time of `path`.
///
/// Any failure (missing entry, permissions, platform without atime support) is
/// a [`PruneError::MetadataUnreadable`]; it is never interpreted as fresh.
pub fn last_access(path: &Path) -> Result<SystemTime> {
    fs::metadata(path)
        .and_then(|meta| meta.accessed())
        .map_err(|source| PruneError::MetadataUnreadable {
            path: path.to_path_buf(),
            source,
        })
}
