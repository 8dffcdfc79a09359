//! Persistence for cached analysis results.
//!
//! The engine only needs four operations from its store: a freshness-bounded
//! lookup, a last-writer-wins upsert, an ordered history scan, and age-based
//! pruning. Both implementations here are safe to share across concurrent
//! analyses; two concurrent misses for the same key may both compute and
//! upsert, and the later write wins.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use crate::models::{CacheRecord, QualityAnalysisResult};

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(String),
}

/// Trait abstracting how analysis results are persisted between runs.
pub trait AnalysisStore: Send + Sync {
    /// Find the record for `cache_key` if one exists and was created within
    /// `max_age`. A stale record is reported as absent.
    fn find_fresh(
        &self,
        repository_id: &str,
        cache_key: &str,
        max_age: Duration,
    ) -> Result<Option<CacheRecord>, StoreError>;

    /// Insert or replace the record for `cache_key`.
    fn upsert(
        &self,
        repository_id: &str,
        date: DateTime<Utc>,
        cache_key: &str,
        payload: &QualityAnalysisResult,
    ) -> Result<CacheRecord, StoreError>;

    /// All records for a repository dated on or after `since`, ordered by date.
    fn find_history(
        &self,
        repository_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<CacheRecord>, StoreError>;

    /// Delete records created before `cutoff`. Returns the number removed.
    fn delete_older_than(
        &self,
        repository_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<usize, StoreError>;
}

fn make_record(
    repository_id: &str,
    date: DateTime<Utc>,
    cache_key: &str,
    payload: &QualityAnalysisResult,
) -> CacheRecord {
    CacheRecord {
        cache_key: cache_key.to_string(),
        repository_id: repository_id.to_string(),
        date,
        payload: payload.clone(),
        created_at: Utc::now(),
    }
}

fn is_fresh(record: &CacheRecord, max_age: Duration) -> bool {
    Utc::now() - record.created_at <= max_age
}

/// Filesystem-backed store keeping one JSON file per repository.
pub struct JsonFileStore {
    base_dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    /// Map a repository id onto a safe file name.
    fn file_for(&self, repository_id: &str) -> PathBuf {
        let sanitized: String = repository_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.base_dir.join(format!("{}.json", sanitized))
    }

    fn load(&self, repository_id: &str) -> Result<Vec<CacheRecord>, StoreError> {
        let path = self.file_for(repository_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| StoreError::Json(e.to_string()))
    }

    fn save(&self, repository_id: &str, records: &[CacheRecord]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.base_dir)?;
        let json =
            serde_json::to_string_pretty(records).map_err(|e| StoreError::Json(e.to_string()))?;
        fs::write(self.file_for(repository_id), json)?;
        Ok(())
    }
}

impl AnalysisStore for JsonFileStore {
    fn find_fresh(
        &self,
        repository_id: &str,
        cache_key: &str,
        max_age: Duration,
    ) -> Result<Option<CacheRecord>, StoreError> {
        let records = self.load(repository_id)?;
        Ok(records
            .into_iter()
            .find(|r| r.cache_key == cache_key && is_fresh(r, max_age)))
    }

    fn upsert(
        &self,
        repository_id: &str,
        date: DateTime<Utc>,
        cache_key: &str,
        payload: &QualityAnalysisResult,
    ) -> Result<CacheRecord, StoreError> {
        let mut records = self.load(repository_id)?;
        let record = make_record(repository_id, date, cache_key, payload);

        match records.iter_mut().find(|r| r.cache_key == cache_key) {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }

        self.save(repository_id, &records)?;
        Ok(record)
    }

    fn find_history(
        &self,
        repository_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<CacheRecord>, StoreError> {
        let mut records: Vec<_> = self
            .load(repository_id)?
            .into_iter()
            .filter(|r| r.date >= since)
            .collect();
        records.sort_by_key(|r| r.date);
        Ok(records)
    }

    fn delete_older_than(
        &self,
        repository_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let mut records = self.load(repository_id)?;
        let before = records.len();
        records.retain(|r| r.created_at >= cutoff);
        let removed = before - records.len();
        if removed > 0 {
            self.save(repository_id, &records)?;
        }
        Ok(removed)
    }
}

/// In-memory store, useful for tests and embedding without a filesystem.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, Vec<CacheRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AnalysisStore for MemoryStore {
    fn find_fresh(
        &self,
        repository_id: &str,
        cache_key: &str,
        max_age: Duration,
    ) -> Result<Option<CacheRecord>, StoreError> {
        let records = self.records.lock().unwrap();
        Ok(records.get(repository_id).and_then(|rs| {
            rs.iter()
                .find(|r| r.cache_key == cache_key && is_fresh(r, max_age))
                .cloned()
        }))
    }

    fn upsert(
        &self,
        repository_id: &str,
        date: DateTime<Utc>,
        cache_key: &str,
        payload: &QualityAnalysisResult,
    ) -> Result<CacheRecord, StoreError> {
        let mut records = self.records.lock().unwrap();
        let repo_records = records.entry(repository_id.to_string()).or_default();
        let record = make_record(repository_id, date, cache_key, payload);

        match repo_records.iter_mut().find(|r| r.cache_key == cache_key) {
            Some(existing) => *existing = record.clone(),
            None => repo_records.push(record.clone()),
        }
        Ok(record)
    }

    fn find_history(
        &self,
        repository_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<CacheRecord>, StoreError> {
        let records = self.records.lock().unwrap();
        let mut history: Vec<_> = records
            .get(repository_id)
            .map(|rs| rs.iter().filter(|r| r.date >= since).cloned().collect())
            .unwrap_or_default();
        history.sort_by_key(|r| r.date);
        Ok(history)
    }

    fn delete_older_than(
        &self,
        repository_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let mut records = self.records.lock().unwrap();
        let Some(repo_records) = records.get_mut(repository_id) else {
            return Ok(0);
        };
        let before = repo_records.len();
        repo_records.retain(|r| r.created_at >= cutoff);
        Ok(before - repo_records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisMetadata, AnalysisMethod, AnalysisMetrics};

    fn sample_payload(score: f64) -> QualityAnalysisResult {
        QualityAnalysisResult {
            quality_score: score,
            issues: vec![],
            insights: vec![],
            recommendations: vec![],
            metrics: AnalysisMetrics::default(),
            code_diff_analysis: None,
            analysis_method: AnalysisMethod::Basic,
            metadata: AnalysisMetadata {
                commits_analyzed: 3,
                analysis_date: Utc::now(),
            },
        }
    }

    #[test]
    fn memory_store_upsert_and_find_fresh() {
        let store = MemoryStore::new();
        store
            .upsert("owner/repo", Utc::now(), "key-1", &sample_payload(0.7))
            .unwrap();

        let found = store
            .find_fresh("owner/repo", "key-1", Duration::hours(4))
            .unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().payload.quality_score, 0.7);

        let missing = store
            .find_fresh("owner/repo", "key-2", Duration::hours(4))
            .unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn memory_store_upsert_replaces_same_key() {
        let store = MemoryStore::new();
        store
            .upsert("r", Utc::now(), "key", &sample_payload(0.4))
            .unwrap();
        store
            .upsert("r", Utc::now(), "key", &sample_payload(0.9))
            .unwrap();

        let found = store.find_fresh("r", "key", Duration::hours(4)).unwrap();
        assert_eq!(found.unwrap().payload.quality_score, 0.9);

        let history = store.find_history("r", Utc::now() - Duration::days(1)).unwrap();
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn memory_store_stale_record_is_absent() {
        let store = MemoryStore::new();
        store
            .upsert("r", Utc::now(), "key", &sample_payload(0.5))
            .unwrap();

        // Zero-width freshness window makes any record stale.
        let found = store.find_fresh("r", "key", Duration::seconds(-1)).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn memory_store_history_is_date_ordered() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store
            .upsert("r", now, "key-b", &sample_payload(0.8))
            .unwrap();
        store
            .upsert("r", now - Duration::days(2), "key-a", &sample_payload(0.6))
            .unwrap();

        let history = store.find_history("r", now - Duration::days(30)).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].cache_key, "key-a");
        assert_eq!(history[1].cache_key, "key-b");
    }

    #[test]
    fn memory_store_delete_older_than() {
        let store = MemoryStore::new();
        store
            .upsert("r", Utc::now(), "key", &sample_payload(0.5))
            .unwrap();

        assert_eq!(
            store
                .delete_older_than("r", Utc::now() - Duration::days(1))
                .unwrap(),
            0
        );
        assert_eq!(
            store
                .delete_older_than("r", Utc::now() + Duration::days(1))
                .unwrap(),
            1
        );
        assert!(store
            .find_fresh("r", "key", Duration::hours(4))
            .unwrap()
            .is_none());
    }

    #[test]
    fn file_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());

        store
            .upsert("owner/repo", Utc::now(), "key-1", &sample_payload(0.65))
            .unwrap();

        let found = store
            .find_fresh("owner/repo", "key-1", Duration::hours(4))
            .unwrap();
        assert_eq!(found.unwrap().payload.quality_score, 0.65);
    }

    #[test]
    fn file_store_sanitizes_repository_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());

        store
            .upsert("owner/repo", Utc::now(), "key", &sample_payload(0.5))
            .unwrap();

        assert!(dir.path().join("owner_repo.json").exists());
    }

    #[test]
    fn file_store_prunes_by_creation_time() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        store
            .upsert("r", Utc::now(), "key", &sample_payload(0.5))
            .unwrap();

        let removed = store
            .delete_older_than("r", Utc::now() + Duration::seconds(5))
            .unwrap();
        assert_eq!(removed, 1);
        assert!(store.load("r").unwrap().is_empty());
    }
}
