//! Deterministic, coarse-grained cache key derivation.
//!
//! The key deliberately never depends on the exact commit list: the commit
//! count is rounded to the nearest bucket of 10 and the date to day
//! granularity, so re-analysing a repository with a handful of new commits on
//! the same day reuses the existing cache entry. Precision is traded for hit
//! rate on purpose.

use chrono::{DateTime, Utc};

/// Bucket width for commit counts. Counts within ±4 of a multiple of 10
/// round to the same bucket.
pub const COMMIT_COUNT_BUCKET: usize = 10;

const KEY_SEPARATOR: char = ':';

/// Round a commit count to the nearest multiple of the bucket width.
pub fn commit_count_bucket(count: usize, bucket: usize) -> usize {
    if bucket == 0 {
        return count;
    }
    (count + bucket / 2) / bucket * bucket
}

/// Derive the cache key for an analysis request.
///
/// The repository id must not contain `:` (or the caller must escape it);
/// otherwise the key fields become ambiguous.
pub fn derive_cache_key(
    repository_id: &str,
    timeframe: &str,
    now: DateTime<Utc>,
    commit_count: usize,
    bucket: usize,
) -> String {
    let day = now.format("%Y-%m-%d");
    let count_bucket = commit_count_bucket(commit_count, bucket);
    format!(
        "{}{sep}{}{sep}{}{sep}{}",
        repository_id.trim(),
        timeframe.trim(),
        day,
        count_bucket,
        sep = KEY_SEPARATOR
    )
}
