//! Quality-analysis orchestration.
//!
//! [`QualityAnalyzer`] composes the cache key derivation, the AI and diff
//! collaborators, the defensive validator, and the heuristic fallbacks into
//! one request/response cycle:
//!
//! cache check -> strategy select -> message analysis -> (diff selection ->
//! per-commit diff loop) -> combine -> score -> persist.
//!
//! Its external contract is strict: [`QualityAnalyzer::analyze_quality`]
//! always returns a well-formed result and never fails. Collaborator
//! failures degrade the analysis (heuristic fallback, skipped commits,
//! unpersisted results) instead of propagating.

pub mod cache_key;
pub mod limits;
pub mod metrics;
pub mod trends;
pub mod validator;

pub use validator::MessageAnalysis;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::thread;

use chrono::{Duration, Utc};
use log::{debug, info, warn};

use crate::cancel;
use crate::diff::DiffSource;
use crate::llm::LlmClient;
use crate::models::{
    AnalysisMetadata, AnalysisMethod, CodeDiffAnalysis, CommitDiffAnalysis, CommitRecord, Issue,
    QualityAnalysisResult, Severity, TrendDirection, TrendReport,
};
use crate::prompt;
use crate::store::AnalysisStore;
use crate::utils::{clamp_unit, short_sha};

/// Tunable policy. The defaults are deliberate: they trade precision for
/// cache hit rate (bucket of 10, 4h TTL) and weight diff evidence over
/// message evidence (0.6 vs 0.4).
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Freshness window for cached results.
    pub cache_ttl: Duration,
    /// Weight of the message-level score in the combined score.
    pub message_weight: f64,
    /// Weight of the diff-level score in the combined score.
    pub code_weight: f64,
    /// Commit-count bucket width for cache keys.
    pub commit_count_bucket: usize,
    /// Model identifier; drives the diff truncation budget.
    pub model: String,
    /// Maximum parallel diff reviews.
    pub max_parallel: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::hours(4),
            message_weight: 0.4,
            code_weight: 0.6,
            commit_count_bucket: cache_key::COMMIT_COUNT_BUCKET,
            model: "sonnet".to_string(),
            max_parallel: 4,
        }
    }
}

/// Per-request options.
#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    /// Skip the cache and recompute even when a fresh record exists.
    pub force_refresh: bool,
    /// Override the configured model for this request.
    pub model: Option<String>,
}

/// Policy choosing which commits receive the expensive diff review.
///
/// Kept pluggable so cost-based selection can replace the default without
/// touching the orchestrator.
pub trait DiffSelector: Send + Sync {
    fn select<'a>(&self, commits: &'a [CommitRecord]) -> Vec<&'a CommitRecord>;
}

/// Default policy: review every commit.
pub struct AllCommits;

impl DiffSelector for AllCommits {
    fn select<'a>(&self, commits: &'a [CommitRecord]) -> Vec<&'a CommitRecord> {
        commits.iter().collect()
    }
}

/// The analysis engine. Stateless between requests; all shared state lives
/// behind the store collaborator.
pub struct QualityAnalyzer {
    llm: Arc<dyn LlmClient>,
    store: Arc<dyn AnalysisStore>,
    diff_source: Option<Arc<dyn DiffSource>>,
    selector: Arc<dyn DiffSelector>,
    config: AnalyzerConfig,
}

impl QualityAnalyzer {
    pub fn new(llm: Arc<dyn LlmClient>, store: Arc<dyn AnalysisStore>) -> Self {
        Self {
            llm,
            store,
            diff_source: None,
            selector: Arc::new(AllCommits),
            config: AnalyzerConfig::default(),
        }
    }

    /// Enable the enhanced path by providing a diff source.
    pub fn with_diff_source(mut self, diff_source: Arc<dyn DiffSource>) -> Self {
        self.diff_source = Some(diff_source);
        self
    }

    /// Replace the diff selection policy.
    pub fn with_selector(mut self, selector: Arc<dyn DiffSelector>) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_config(mut self, config: AnalyzerConfig) -> Self {
        self.config = config;
        self
    }

    /// Derive the cache key for a request. Pure; exposed for cache
    /// administration.
    pub fn generate_cache_key(
        &self,
        commits: &[CommitRecord],
        repository_id: &str,
        timeframe: &str,
    ) -> String {
        cache_key::derive_cache_key(
            repository_id,
            timeframe,
            Utc::now(),
            commits.len(),
            self.config.commit_count_bucket,
        )
    }

    /// Analyze the quality of a commit batch. Never fails: any unhandled
    /// problem yields a neutral result with a diagnostic issue.
    pub fn analyze_quality(
        &self,
        commits: &[CommitRecord],
        repository_id: &str,
        timeframe: &str,
        repository_full_name: Option<&str>,
        options: &AnalysisOptions,
    ) -> QualityAnalysisResult {
        let key = self.generate_cache_key(commits, repository_id, timeframe);

        // Cache check: a fresh hit short-circuits everything, including the
        // AI calls. A lookup failure is treated as a miss.
        if !options.force_refresh {
            match self.store.find_fresh(repository_id, &key, self.config.cache_ttl) {
                Ok(Some(record)) => {
                    debug!("cache hit for {} ({})", repository_id, key);
                    return record.payload;
                }
                Ok(None) => debug!("cache miss for {} ({})", repository_id, key),
                Err(e) => warn!("cache lookup failed, treating as miss: {}", e),
            }
        }

        // A panicking collaborator must not take the request down with it.
        // The neutral fallback is returned but never cached, so the next
        // request retries.
        let result = match catch_unwind(AssertUnwindSafe(|| {
            self.compute(commits, repository_full_name, options)
        })) {
            Ok(result) => result,
            Err(_) => {
                warn!("analysis panicked, returning neutral fallback result");
                return fallback_result(commits);
            }
        };

        if cancel::is_cancelled() {
            // Partial work is returned but never persisted.
            info!("analysis cancelled; skipping persistence");
            return result;
        }

        if let Err(e) = self.store.upsert(repository_id, Utc::now(), &key, &result) {
            warn!("failed to persist analysis for {}: {}", repository_id, e);
        }

        result
    }

    /// Summarize the persisted score history for a repository.
    pub fn quality_trends(&self, repository_id: &str, days: i64) -> TrendReport {
        let since = Utc::now() - Duration::days(days);
        match self.store.find_history(repository_id, since) {
            Ok(records) => {
                let scores: Vec<f64> =
                    records.iter().map(|r| r.payload.quality_score).collect();
                trends::analyze_trend(&scores)
            }
            Err(e) => {
                warn!("history lookup failed for {}: {}", repository_id, e);
                TrendReport {
                    direction: TrendDirection::InsufficientData,
                    score_change: 0.0,
                    average_score: 0.5,
                    insights: vec!["Score history is unavailable".to_string()],
                    recommendations: vec![],
                }
            }
        }
    }

    /// Delete cached records older than the given age. Exposed operation;
    /// the engine never prunes on its own.
    pub fn prune_cache(&self, repository_id: &str, older_than_days: i64) -> usize {
        let cutoff = Utc::now() - Duration::days(older_than_days);
        match self.store.delete_older_than(repository_id, cutoff) {
            Ok(count) => count,
            Err(e) => {
                warn!("cache pruning failed for {}: {}", repository_id, e);
                0
            }
        }
    }

    fn compute(
        &self,
        commits: &[CommitRecord],
        repository_full_name: Option<&str>,
        options: &AnalysisOptions,
    ) -> QualityAnalysisResult {
        // Strategy select: enhanced needs both a repository identity and a
        // diff source.
        let enhanced_target = match (repository_full_name, &self.diff_source) {
            (Some(repo), Some(source)) => Some((repo, Arc::clone(source))),
            _ => None,
        };

        // Message analysis always runs.
        let message = self.message_analysis(commits);

        let code = match enhanced_target {
            Some((repo, source)) if !cancel::is_cancelled() => {
                let selected = self.selector.select(commits);
                debug!(
                    "diff review: {} of {} commits selected",
                    selected.len(),
                    commits.len()
                );
                let model = options.model.as_deref().unwrap_or(&self.config.model);
                let analyses = self.review_diffs(repo, &selected, model, &source);
                if analyses.is_empty() {
                    None
                } else {
                    Some(CodeDiffAnalysis {
                        code_score: metrics::code_quality_score(&analyses),
                        commits_reviewed: analyses.len(),
                        commit_analyses: analyses,
                    })
                }
            }
            _ => None,
        };

        self.combine(commits, message, code)
    }

    /// Message-level analysis via the AI collaborator, with the heuristic
    /// computation as fallback. Both paths produce the same shape.
    fn message_analysis(&self, commits: &[CommitRecord]) -> MessageAnalysis {
        let prompt = prompt::build_categorization_prompt(commits);
        match self.llm.complete(&prompt) {
            Ok(response) => match validator::validate_message_analysis(&response) {
                Some(analysis) => analysis,
                None => {
                    info!("AI categorization response unusable, using heuristics");
                    metrics::heuristic_message_analysis(commits)
                }
            },
            Err(e) => {
                info!("AI categorization failed ({}), using heuristics", e);
                metrics::heuristic_message_analysis(commits)
            }
        }
    }

    /// Per-commit diff review loop. Runs in parallel batches; each commit's
    /// failure is isolated and logged. Results come back in commit order
    /// regardless of completion timing.
    fn review_diffs(
        &self,
        repo: &str,
        commits: &[&CommitRecord],
        model: &str,
        diff_source: &Arc<dyn DiffSource>,
    ) -> Vec<CommitDiffAnalysis> {
        let budget = limits::diff_budget_for(model);
        let results: Arc<Mutex<Vec<(usize, CommitDiffAnalysis)>>> =
            Arc::new(Mutex::new(Vec::new()));

        let indexed: Vec<(usize, CommitRecord)> = commits
            .iter()
            .enumerate()
            .map(|(i, c)| (i, (*c).clone()))
            .collect();

        for chunk in indexed.chunks(self.config.max_parallel.max(1)) {
            if cancel::is_cancelled() {
                info!("cancellation requested, stopping diff review loop");
                break;
            }

            let handles: Vec<_> = chunk
                .iter()
                .map(|(position, commit)| {
                    let llm = Arc::clone(&self.llm);
                    let diff_source = Arc::clone(diff_source);
                    let results = Arc::clone(&results);
                    let repo = repo.to_string();
                    let position = *position;
                    let commit = commit.clone();

                    thread::spawn(move || {
                        if let Some(analysis) =
                            review_one_commit(&*llm, &*diff_source, &repo, &commit, budget)
                        {
                            results.lock().unwrap().push((position, analysis));
                        }
                    })
                })
                .collect();

            for handle in handles {
                let _ = handle.join();
            }
        }

        let mut analyses = Arc::try_unwrap(results)
            .map(|m| m.into_inner().unwrap())
            .unwrap_or_default();
        analyses.sort_by_key(|(position, _)| *position);
        analyses.into_iter().map(|(_, a)| a).collect()
    }

    /// Combine message and diff evidence into the final result.
    fn combine(
        &self,
        commits: &[CommitRecord],
        message: MessageAnalysis,
        code: Option<CodeDiffAnalysis>,
    ) -> QualityAnalysisResult {
        let mut issues = message.issues;
        let mut insights = message.insights;
        let recommendations = message.recommendations;

        let (quality_score, analysis_method, code_diff_analysis) = match code {
            Some(code) => {
                let combined = self.config.message_weight * message.score
                    + self.config.code_weight * code.code_score;
                for analysis in &code.commit_analyses {
                    issues.extend(analysis.issues.iter().cloned());
                }
                insights.push(format!(
                    "Reviewed diffs for {} of {} commits",
                    code.commits_reviewed,
                    commits.len()
                ));
                (combined, AnalysisMethod::Enhanced, Some(code))
            }
            None => (message.score, AnalysisMethod::Basic, None),
        };

        QualityAnalysisResult {
            quality_score: clamp_unit(quality_score),
            issues,
            insights,
            recommendations,
            metrics: metrics::metrics_for(commits),
            code_diff_analysis,
            analysis_method,
            metadata: AnalysisMetadata {
                commits_analyzed: commits.len(),
                analysis_date: Utc::now(),
            },
        }
    }
}

/// Review a single commit's diff. Returns `None` when the commit is skipped,
/// for any reason; the caller never aborts the batch because of it.
fn review_one_commit(
    llm: &dyn LlmClient,
    diff_source: &dyn DiffSource,
    repo: &str,
    commit: &CommitRecord,
    budget: usize,
) -> Option<CommitDiffAnalysis> {
    if cancel::is_cancelled() {
        return None;
    }

    let diff = match diff_source.diff_for(repo, &commit.sha) {
        Ok(Some(diff)) => diff,
        Ok(None) => {
            debug!("{}: no diff content (merge commit?), skipping", short_sha(&commit.sha));
            return None;
        }
        Err(e) => {
            warn!("{}: diff fetch failed: {}", short_sha(&commit.sha), e);
            return None;
        }
    };

    let truncated = limits::truncate_diff(&diff, budget);
    let prompt = prompt::build_diff_review_prompt(commit, &truncated);

    match llm.complete(&prompt) {
        Ok(response) => Some(validator::validate_diff_analysis(&commit.sha, &response)),
        Err(e) => {
            warn!("{}: diff review failed: {}", short_sha(&commit.sha), e);
            None
        }
    }
}

/// Build the minimal, neutral result returned when the compute path panics.
pub fn fallback_result(commits: &[CommitRecord]) -> QualityAnalysisResult {
    QualityAnalysisResult {
        quality_score: 0.5,
        issues: vec![Issue::new(
            "analysis_error",
            Severity::Medium,
            "Quality analysis could not be completed",
            "Re-run the analysis; results fall back to heuristics under AI outage",
        )],
        insights: vec![],
        recommendations: vec![],
        metrics: metrics::metrics_for(commits),
        code_diff_analysis: None,
        analysis_method: AnalysisMethod::Basic,
        metadata: AnalysisMetadata {
            commits_analyzed: commits.len(),
            analysis_date: Utc::now(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::DiffError;
    use crate::llm::test_support::MockLlmClient;
    use crate::llm::LlmError;
    use crate::store::{MemoryStore, StoreError};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn commits(n: usize) -> Vec<CommitRecord> {
        (0..n)
            .map(|i| {
                CommitRecord::new(
                    format!("{:040x}", i + 1),
                    format!("feat(mod{}): add feature number {}", i, i),
                    "dev",
                    Utc::now(),
                )
            })
            .collect()
    }

    /// LLM mock that routes on prompt kind and counts calls.
    struct RoutedLlm {
        message_response: String,
        diff_response: String,
        calls: AtomicUsize,
    }

    impl RoutedLlm {
        fn new(message_response: &str, diff_response: &str) -> Self {
            Self {
                message_response: message_response.to_string(),
                diff_response: diff_response.to_string(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl LlmClient for RoutedLlm {
        fn complete(&self, prompt: &str) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if prompt.contains("single commit's code changes") {
                Ok(self.diff_response.clone())
            } else {
                Ok(self.message_response.clone())
            }
        }
    }

    /// Diff source with canned diffs; missing shas error out.
    struct MapDiffSource {
        diffs: HashMap<String, Option<String>>,
    }

    impl DiffSource for MapDiffSource {
        fn diff_for(&self, _repo: &str, sha: &str) -> Result<Option<String>, DiffError> {
            match self.diffs.get(sha) {
                Some(diff) => Ok(diff.clone()),
                None => Err(DiffError::CommandFailed(format!("no such commit {}", sha))),
            }
        }
    }

    /// Store whose writes always fail.
    struct BrokenStore;

    impl AnalysisStore for BrokenStore {
        fn find_fresh(
            &self,
            _: &str,
            _: &str,
            _: Duration,
        ) -> Result<Option<crate::models::CacheRecord>, StoreError> {
            Err(StoreError::Json("broken".to_string()))
        }
        fn upsert(
            &self,
            _: &str,
            _: chrono::DateTime<Utc>,
            _: &str,
            _: &QualityAnalysisResult,
        ) -> Result<crate::models::CacheRecord, StoreError> {
            Err(StoreError::Json("broken".to_string()))
        }
        fn find_history(
            &self,
            _: &str,
            _: chrono::DateTime<Utc>,
        ) -> Result<Vec<crate::models::CacheRecord>, StoreError> {
            Err(StoreError::Json("broken".to_string()))
        }
        fn delete_older_than(
            &self,
            _: &str,
            _: chrono::DateTime<Utc>,
        ) -> Result<usize, StoreError> {
            Err(StoreError::Json("broken".to_string()))
        }
    }

    fn basic_analyzer(llm: Arc<dyn LlmClient>) -> QualityAnalyzer {
        QualityAnalyzer::new(llm, Arc::new(MemoryStore::new()))
    }

    #[test]
    fn basic_path_uses_ai_message_analysis() {
        cancel::reset();
        let llm = Arc::new(MockLlmClient::new(r#"{"quality_score": 0.8, "issues": []}"#));
        let analyzer = basic_analyzer(llm.clone());

        let result = analyzer.analyze_quality(
            &commits(3),
            "owner/repo",
            "30d",
            None,
            &AnalysisOptions::default(),
        );

        assert_eq!(result.quality_score, 0.8);
        assert_eq!(result.analysis_method, AnalysisMethod::Basic);
        assert_eq!(result.metadata.commits_analyzed, 3);
        assert_eq!(llm.call_count(), 1);
    }

    #[test]
    fn cache_hit_makes_zero_ai_calls() {
        cancel::reset();
        let llm = Arc::new(MockLlmClient::new(r#"{"quality_score": 0.8}"#));
        let analyzer = basic_analyzer(llm.clone());
        let batch = commits(3);

        let first = analyzer.analyze_quality(
            &batch,
            "owner/repo",
            "30d",
            None,
            &AnalysisOptions::default(),
        );
        assert_eq!(llm.call_count(), 1);

        let second = analyzer.analyze_quality(
            &batch,
            "owner/repo",
            "30d",
            None,
            &AnalysisOptions::default(),
        );
        // Hit: payload returned unchanged, no further AI invocation.
        assert_eq!(llm.call_count(), 1);
        assert_eq!(second.quality_score, first.quality_score);
    }

    #[test]
    fn force_refresh_bypasses_cache() {
        cancel::reset();
        let llm = Arc::new(MockLlmClient::new(r#"{"quality_score": 0.8}"#));
        let analyzer = basic_analyzer(llm.clone());
        let batch = commits(3);
        let options = AnalysisOptions {
            force_refresh: true,
            ..Default::default()
        };

        analyzer.analyze_quality(&batch, "owner/repo", "30d", None, &options);
        analyzer.analyze_quality(&batch, "owner/repo", "30d", None, &options);
        assert_eq!(llm.call_count(), 2);
    }

    #[test]
    fn total_ai_outage_falls_back_to_heuristics() {
        cancel::reset();
        let llm = Arc::new(MockLlmClient::failing());
        let analyzer = basic_analyzer(llm);

        let result = analyzer.analyze_quality(
            &commits(4),
            "owner/repo",
            "30d",
            None,
            &AnalysisOptions::default(),
        );

        assert_eq!(result.analysis_method, AnalysisMethod::Basic);
        assert!(result.quality_score >= 0.0 && result.quality_score <= 1.0);
        // Heuristic path still fills the metrics block.
        assert!(result.metrics.message_quality.conventional_percent > 0);
    }

    #[test]
    fn unusable_ai_payload_falls_back_to_heuristics() {
        cancel::reset();
        let llm = Arc::new(MockLlmClient::new("I'd rather not produce JSON today."));
        let analyzer = basic_analyzer(llm);

        let result = analyzer.analyze_quality(
            &commits(4),
            "owner/repo",
            "30d",
            None,
            &AnalysisOptions::default(),
        );
        assert!(result.quality_score >= 0.0 && result.quality_score <= 1.0);
    }

    #[test]
    fn enhanced_combines_with_documented_weights() {
        cancel::reset();
        // Message score 0.8; diff issues deduct 0.8 - 0.2*2 = 0.4 code score.
        let llm = Arc::new(RoutedLlm::new(
            r#"{"quality_score": 0.8, "issues": []}"#,
            r#"{"score": 0.4, "issues": [
                {"type": "a", "severity": "high", "description": "d", "suggestion": "s"},
                {"type": "b", "severity": "high", "description": "d", "suggestion": "s"}
            ]}"#,
        ));
        let batch = commits(1);
        let diffs: HashMap<_, _> = batch
            .iter()
            .map(|c| (c.sha.clone(), Some("+line".to_string())))
            .collect();

        let analyzer = basic_analyzer(llm)
            .with_diff_source(Arc::new(MapDiffSource { diffs }));

        let result = analyzer.analyze_quality(
            &batch,
            "owner/repo",
            "30d",
            Some("owner/repo"),
            &AnalysisOptions::default(),
        );

        assert_eq!(result.analysis_method, AnalysisMethod::Enhanced);
        // 0.4 * 0.8 + 0.6 * 0.4 = 0.56 exactly.
        assert!((result.quality_score - 0.56).abs() < 1e-9);
        let code = result.code_diff_analysis.unwrap();
        assert_eq!(code.commits_reviewed, 1);
        assert!((code.code_score - 0.4).abs() < 1e-9);
    }

    #[test]
    fn per_commit_failures_are_isolated() {
        cancel::reset();
        let llm = Arc::new(RoutedLlm::new(
            r#"{"quality_score": 0.7}"#,
            r#"{"score": 0.9, "summary": "fine"}"#,
        ));
        let batch = commits(5);
        // Commit 3 has no entry: its diff fetch errors out.
        let diffs: HashMap<_, _> = batch
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != 2)
            .map(|(_, c)| (c.sha.clone(), Some("+x".to_string())))
            .collect();

        let analyzer = basic_analyzer(llm)
            .with_diff_source(Arc::new(MapDiffSource { diffs }));

        let result = analyzer.analyze_quality(
            &batch,
            "owner/repo",
            "30d",
            Some("owner/repo"),
            &AnalysisOptions::default(),
        );

        let code = result.code_diff_analysis.unwrap();
        assert_eq!(code.commits_reviewed, 4);
        // Order follows commit positions, not completion timing.
        let shas: Vec<_> = code.commit_analyses.iter().map(|a| a.sha.clone()).collect();
        let expected: Vec<_> = batch
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != 2)
            .map(|(_, c)| c.sha.clone())
            .collect();
        assert_eq!(shas, expected);
    }

    #[test]
    fn merge_commits_without_diffs_are_skipped_quietly() {
        cancel::reset();
        let llm = Arc::new(RoutedLlm::new(
            r#"{"quality_score": 0.7}"#,
            r#"{"score": 0.9}"#,
        ));
        let batch = commits(2);
        let mut diffs = HashMap::new();
        diffs.insert(batch[0].sha.clone(), Some("+x".to_string()));
        diffs.insert(batch[1].sha.clone(), None); // merge commit

        let analyzer = basic_analyzer(llm)
            .with_diff_source(Arc::new(MapDiffSource { diffs }));

        let result = analyzer.analyze_quality(
            &batch,
            "owner/repo",
            "30d",
            Some("owner/repo"),
            &AnalysisOptions::default(),
        );

        assert_eq!(result.code_diff_analysis.unwrap().commits_reviewed, 1);
    }

    #[test]
    fn no_repository_identity_stays_basic() {
        cancel::reset();
        let llm = Arc::new(RoutedLlm::new(r#"{"quality_score": 0.7}"#, r#"{"score": 0.9}"#));
        let batch = commits(2);
        let diffs: HashMap<_, _> = batch
            .iter()
            .map(|c| (c.sha.clone(), Some("+x".to_string())))
            .collect();

        let analyzer = basic_analyzer(llm)
            .with_diff_source(Arc::new(MapDiffSource { diffs }));

        let result = analyzer.analyze_quality(
            &batch,
            "owner/repo",
            "30d",
            None,
            &AnalysisOptions::default(),
        );
        assert_eq!(result.analysis_method, AnalysisMethod::Basic);
        assert!(result.code_diff_analysis.is_none());
    }

    #[test]
    fn broken_store_never_fails_the_request() {
        cancel::reset();
        let llm = Arc::new(MockLlmClient::new(r#"{"quality_score": 0.6}"#));
        let analyzer = QualityAnalyzer::new(llm, Arc::new(BrokenStore));

        let result = analyzer.analyze_quality(
            &commits(2),
            "owner/repo",
            "30d",
            None,
            &AnalysisOptions::default(),
        );
        assert_eq!(result.quality_score, 0.6);
    }

    #[test]
    fn trends_read_persisted_history() {
        cancel::reset();
        let store = Arc::new(MemoryStore::new());
        let llm = Arc::new(MockLlmClient::new(r#"{"quality_score": 0.9}"#));
        let analyzer = QualityAnalyzer::new(llm, store.clone());

        // Two analyses on distinct keys give two history points.
        analyzer.analyze_quality(&commits(3), "r", "30d", None, &AnalysisOptions::default());
        analyzer.analyze_quality(&commits(9), "r", "30d", None, &AnalysisOptions::default());

        let report = analyzer.quality_trends("r", 30);
        assert_eq!(report.direction, TrendDirection::Stable);
        assert_eq!(report.average_score, 0.9);
    }

    #[test]
    fn trends_with_broken_store_are_insufficient_data() {
        let llm = Arc::new(MockLlmClient::new("{}"));
        let analyzer = QualityAnalyzer::new(llm, Arc::new(BrokenStore));
        let report = analyzer.quality_trends("r", 30);
        assert_eq!(report.direction, TrendDirection::InsufficientData);
    }

    #[test]
    fn prune_with_broken_store_reports_zero() {
        let llm = Arc::new(MockLlmClient::new("{}"));
        let analyzer = QualityAnalyzer::new(llm, Arc::new(BrokenStore));
        assert_eq!(analyzer.prune_cache("r", 30), 0);
    }

    /// LLM client whose every call panics instead of returning an error.
    struct PanickingLlm;

    impl LlmClient for PanickingLlm {
        fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
            panic!("client blew up");
        }
    }

    #[test]
    fn panicking_collaborator_yields_neutral_fallback() {
        cancel::reset();
        let store = Arc::new(MemoryStore::new());
        let analyzer = QualityAnalyzer::new(Arc::new(PanickingLlm), store.clone());
        let batch = commits(2);

        let result = analyzer.analyze_quality(
            &batch,
            "owner/repo",
            "30d",
            None,
            &AnalysisOptions::default(),
        );

        assert_eq!(result.quality_score, 0.5);
        assert_eq!(result.issues[0].issue_type, "analysis_error");
        assert_eq!(result.analysis_method, AnalysisMethod::Basic);
        assert_eq!(result.metadata.commits_analyzed, 2);

        // The fallback is never cached, so the next request retries.
        let key = analyzer.generate_cache_key(&batch, "owner/repo", "30d");
        assert!(store
            .find_fresh("owner/repo", &key, Duration::hours(4))
            .unwrap()
            .is_none());
    }

    #[test]
    fn fallback_result_is_well_formed() {
        let result = fallback_result(&commits(2));
        assert_eq!(result.quality_score, 0.5);
        assert_eq!(result.issues[0].issue_type, "analysis_error");
        assert_eq!(result.analysis_method, AnalysisMethod::Basic);
        assert_eq!(result.metadata.commits_analyzed, 2);
    }
}
