use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of a detected quality issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Coerce an arbitrary string to a valid severity.
    ///
    /// Unrecognized or empty input normalizes to `Medium`, so untrusted
    /// payloads always map onto one of the four levels.
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "low" => Self::Low,
            "medium" => Self::Medium,
            "high" => Self::High,
            "critical" => Self::Critical,
            _ => Self::Medium,
        }
    }
}

impl Default for Severity {
    fn default() -> Self {
        Self::Medium
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// A commit read from repository history.
///
/// The diff is not loaded with the commit; it is fetched lazily through a
/// [`crate::diff::DiffSource`] when the enhanced analysis path needs it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRecord {
    pub sha: String,
    pub message: String,
    pub author: String,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

impl CommitRecord {
    pub fn new(
        sha: impl Into<String>,
        message: impl Into<String>,
        author: impl Into<String>,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            sha: sha.into(),
            message: message.into(),
            author: author.into(),
            date,
            category: None,
            confidence: None,
            diff: None,
        }
    }
}

/// A single quality issue surfaced by message or diff analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "type")]
    pub issue_type: String,
    pub severity: Severity,
    pub description: String,
    pub suggestion: String,
    /// Number of commits exhibiting this issue (message-level issues).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_count: Option<usize>,
    /// Line number in the diff (diff-level issues).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl Issue {
    pub fn new(
        issue_type: impl Into<String>,
        severity: Severity,
        description: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            issue_type: issue_type.into(),
            severity,
            description: description.into(),
            suggestion: suggestion.into(),
            commit_count: None,
            line: None,
        }
    }

    pub fn with_commit_count(mut self, count: usize) -> Self {
        self.commit_count = Some(count);
        self
    }
}

/// Percentages describing how commit messages are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageQualityMetrics {
    /// Percent following the conventional `type(scope): description` format.
    pub conventional_percent: u32,
    /// Percent longer than 20 chars and not a stock phrase.
    pub descriptive_percent: u32,
    /// Inverse of descriptive.
    pub vague_percent: u32,
    pub average_length: f64,
}

/// Per-category commit counts from keyword pattern detection.
///
/// Each commit is counted at most once per category, even when its message
/// matches several keywords of that category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternCounts {
    pub quick_fixes: usize,
    pub technical_debt: usize,
    pub security: usize,
    pub testing: usize,
    pub documentation: usize,
    pub refactoring: usize,
    pub performance: usize,
}

/// Heuristic metrics attached to every analysis result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisMetrics {
    pub commit_patterns: PatternCounts,
    pub message_quality: MessageQualityMetrics,
    /// Pattern health score in [0, 1].
    pub pattern_health: f64,
}

/// Diff review of a single commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitDiffAnalysis {
    pub sha: String,
    /// Score in [0, 1] for this commit's diff.
    pub score: f64,
    pub issues: Vec<Issue>,
    pub positive_practices: Vec<String>,
    pub summary: String,
}

/// Aggregated diff-level analysis across the reviewed commits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeDiffAnalysis {
    /// Combined code score in [0.1, 1.0].
    pub code_score: f64,
    /// Commits that produced a usable diff review (failures are excluded).
    pub commits_reviewed: usize,
    /// Raw per-commit reviews, kept for detail views.
    pub commit_analyses: Vec<CommitDiffAnalysis>,
}

/// Which analysis path produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMethod {
    /// Message-level analysis only.
    Basic,
    /// Message analysis combined with per-commit diff review.
    Enhanced,
}

impl std::fmt::Display for AnalysisMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic => write!(f, "basic"),
            Self::Enhanced => write!(f, "enhanced"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub commits_analyzed: usize,
    pub analysis_date: DateTime<Utc>,
}

/// The complete result of one quality analysis.
///
/// `quality_score` is always clamped to [0, 1], whichever path produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityAnalysisResult {
    pub quality_score: f64,
    pub issues: Vec<Issue>,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
    pub metrics: AnalysisMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_diff_analysis: Option<CodeDiffAnalysis>,
    pub analysis_method: AnalysisMethod,
    pub metadata: AnalysisMetadata,
}

/// A cached analysis result as persisted by an [`crate::store::AnalysisStore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRecord {
    pub cache_key: String,
    pub repository_id: String,
    /// Analysis date (the day bucket the record belongs to).
    pub date: DateTime<Utc>,
    pub payload: QualityAnalysisResult,
    pub created_at: DateTime<Utc>,
}

/// Direction of a historical score trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Declining,
    Stable,
    InsufficientData,
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Improving => write!(f, "improving"),
            Self::Declining => write!(f, "declining"),
            Self::Stable => write!(f, "stable"),
            Self::InsufficientData => write!(f, "insufficient_data"),
        }
    }
}

/// Summary of how quality scores moved over a history window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendReport {
    pub direction: TrendDirection,
    /// Recent average minus older average, rounded to 3 decimals.
    pub score_change: f64,
    pub average_score: f64,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_normalizes_known_values() {
        assert_eq!(Severity::normalize("low"), Severity::Low);
        assert_eq!(Severity::normalize("  HIGH "), Severity::High);
        assert_eq!(Severity::normalize("Critical"), Severity::Critical);
        assert_eq!(Severity::normalize("medium"), Severity::Medium);
    }

    #[test]
    fn severity_normalizes_garbage_to_medium() {
        assert_eq!(Severity::normalize("severe"), Severity::Medium);
        assert_eq!(Severity::normalize(""), Severity::Medium);
        assert_eq!(Severity::normalize("3"), Severity::Medium);
    }

    #[test]
    fn severity_orders_by_impact() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn result_serialization_round_trips() {
        let result = QualityAnalysisResult {
            quality_score: 0.56,
            issues: vec![Issue::new(
                "vague_messages",
                Severity::Medium,
                "Many vague messages",
                "Describe what changed and why",
            )
            .with_commit_count(4)],
            insights: vec!["Mostly conventional commits".to_string()],
            recommendations: vec![],
            metrics: AnalysisMetrics::default(),
            code_diff_analysis: None,
            analysis_method: AnalysisMethod::Basic,
            metadata: AnalysisMetadata {
                commits_analyzed: 10,
                analysis_date: Utc::now(),
            },
        };

        let json = serde_json::to_string(&result).unwrap();
        let restored: QualityAnalysisResult = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.quality_score, 0.56);
        assert_eq!(restored.issues[0].commit_count, Some(4));
        assert_eq!(restored.analysis_method, AnalysisMethod::Basic);
    }

    #[test]
    fn issue_type_serializes_as_type() {
        let issue = Issue::new("quick_fixes", Severity::High, "desc", "sugg");
        let json = serde_json::to_string(&issue).unwrap();
        assert!(json.contains(r#""type":"quick_fixes""#));
        assert!(json.contains(r#""severity":"high""#));
    }
}
