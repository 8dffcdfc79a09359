//! Pure heuristics over commit metadata.
//!
//! Everything here is deterministic and side-effect free: message quality
//! percentages, keyword pattern detection, the pattern health score, the
//! diff-based code quality score, and the heuristic message analysis used
//! when the AI collaborator is unavailable.

use crate::analysis::validator::MessageAnalysis;
use crate::models::{
    AnalysisMetrics, CommitDiffAnalysis, CommitRecord, Issue, MessageQualityMetrics,
    PatternCounts, Severity,
};
use crate::utils::clamp_unit;

const QUICK_FIX_KEYWORDS: &[&str] = &[
    "quick fix",
    "quickfix",
    "hotfix",
    "hot fix",
    "band-aid",
    "bandaid",
    "workaround",
    "temp fix",
];

const TECH_DEBT_KEYWORDS: &[&str] = &[
    "todo",
    "fixme",
    "hack",
    "tech debt",
    "technical debt",
    "cleanup later",
    "will fix later",
];

const SECURITY_KEYWORDS: &[&str] = &[
    "security",
    "vulnerability",
    "cve-",
    "sanitize",
    "injection",
    "xss",
    "csrf",
    "auth",
];

const TESTING_KEYWORDS: &[&str] = &["test", "spec", "coverage"];

const DOCUMENTATION_KEYWORDS: &[&str] = &["doc", "readme", "changelog", "comment"];

const REFACTOR_KEYWORDS: &[&str] = &["refactor", "restructure", "simplify", "extract", "rename"];

const PERFORMANCE_KEYWORDS: &[&str] = &["performance", "perf", "optimize", "optimise", "speed up"];

/// First lines that say nothing about the change.
const STOCK_PHRASES: &[&str] = &[
    "fix",
    "fixes",
    "fix bug",
    "bugfix",
    "update",
    "updates",
    "update code",
    "wip",
    "stuff",
    "changes",
    "minor changes",
    "misc",
    "cleanup",
    "more work",
    "temp",
];

/// Does the first line follow the conventional `type(scope): description`
/// format? Scope and the `!` breaking marker are optional.
pub fn is_conventional(message: &str) -> bool {
    let first = message.lines().next().unwrap_or("").trim();
    let Some(colon) = first.find(':') else {
        return false;
    };
    if first[colon + 1..].trim().is_empty() {
        return false;
    }

    let prefix = first[..colon].trim_end();
    let prefix = prefix.strip_suffix('!').unwrap_or(prefix);

    let (commit_type, scope) = match prefix.find('(') {
        Some(open) => {
            if !prefix.ends_with(')') {
                return false;
            }
            (&prefix[..open], Some(&prefix[open + 1..prefix.len() - 1]))
        }
        None => (prefix, None),
    };

    if commit_type.is_empty() || !commit_type.chars().all(|c| c.is_ascii_alphanumeric()) {
        return false;
    }

    match scope {
        Some(s) => {
            !s.is_empty()
                && s.chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/' | '.'))
        }
        None => true,
    }
}

/// Is this message descriptive: longer than 20 chars and not a stock phrase?
pub fn is_descriptive(message: &str) -> bool {
    let first = message.lines().next().unwrap_or("").trim();
    first.len() > 20 && !STOCK_PHRASES.contains(&first.to_lowercase().as_str())
}

/// Message-quality percentages over a commit collection.
pub fn message_quality(commits: &[CommitRecord]) -> MessageQualityMetrics {
    if commits.is_empty() {
        return MessageQualityMetrics::default();
    }
    let total = commits.len();

    let conventional = commits
        .iter()
        .filter(|c| is_conventional(&c.message))
        .count();
    let descriptive = commits
        .iter()
        .filter(|c| is_descriptive(&c.message))
        .count();
    let total_length: usize = commits.iter().map(|c| c.message.chars().count()).sum();

    let descriptive_percent = percent(descriptive, total);
    MessageQualityMetrics {
        conventional_percent: percent(conventional, total),
        descriptive_percent,
        vague_percent: 100 - descriptive_percent,
        average_length: total_length as f64 / total as f64,
    }
}

fn percent(count: usize, total: usize) -> u32 {
    ((count as f64 / total as f64) * 100.0).round() as u32
}

/// Count commits per keyword category. Each commit counts at most once per
/// category regardless of how many of its keywords match.
pub fn detect_patterns(commits: &[CommitRecord]) -> PatternCounts {
    let mut counts = PatternCounts::default();

    for commit in commits {
        let message = commit.message.to_lowercase();
        let matches = |keywords: &[&str]| keywords.iter().any(|k| message.contains(k));

        if matches(QUICK_FIX_KEYWORDS) {
            counts.quick_fixes += 1;
        }
        if matches(TECH_DEBT_KEYWORDS) {
            counts.technical_debt += 1;
        }
        if matches(SECURITY_KEYWORDS) {
            counts.security += 1;
        }
        if matches(TESTING_KEYWORDS) {
            counts.testing += 1;
        }
        if matches(DOCUMENTATION_KEYWORDS) {
            counts.documentation += 1;
        }
        if matches(REFACTOR_KEYWORDS) {
            counts.refactoring += 1;
        }
        if matches(PERFORMANCE_KEYWORDS) {
            counts.performance += 1;
        }
    }

    counts
}

/// Pattern health score in [0, 1].
///
/// Base 0.7; +0.1 each for testing/documentation/security signals; +0.05 each
/// for refactor/performance; -0.2 when quick fixes exceed 30% of commits;
/// -0.1 when technical-debt markers exceed 20%.
pub fn pattern_health(counts: &PatternCounts, total_commits: usize) -> f64 {
    let mut score: f64 = 0.7;

    if counts.testing > 0 {
        score += 0.1;
    }
    if counts.documentation > 0 {
        score += 0.1;
    }
    if counts.security > 0 {
        score += 0.1;
    }
    if counts.refactoring > 0 {
        score += 0.05;
    }
    if counts.performance > 0 {
        score += 0.05;
    }

    if total_commits > 0 {
        let quick_fix_ratio = counts.quick_fixes as f64 / total_commits as f64;
        let debt_ratio = counts.technical_debt as f64 / total_commits as f64;
        if quick_fix_ratio > 0.3 {
            score -= 0.2;
        }
        if debt_ratio > 0.2 {
            score -= 0.1;
        }
    }

    clamp_unit(score)
}

/// Combined code quality score over all per-commit diff analyses.
///
/// Base 0.8; each issue deducts by severity (critical 0.3, high 0.2,
/// medium 0.1, low 0.05); each noted positive practice adds 0.05. The result
/// clamps to [0.1, 1.0] so even a disastrous batch keeps a nonzero score.
pub fn code_quality_score(analyses: &[CommitDiffAnalysis]) -> f64 {
    let mut score: f64 = 0.8;

    for analysis in analyses {
        for issue in &analysis.issues {
            score -= match issue.severity {
                Severity::Critical => 0.3,
                Severity::High => 0.2,
                Severity::Medium => 0.1,
                Severity::Low => 0.05,
            };
        }
        score += 0.05 * analysis.positive_practices.len() as f64;
    }

    score.clamp(0.1, 1.0)
}

/// Assemble the metrics block attached to every result.
pub fn metrics_for(commits: &[CommitRecord]) -> AnalysisMetrics {
    let commit_patterns = detect_patterns(commits);
    let pattern_health = pattern_health(&commit_patterns, commits.len());
    AnalysisMetrics {
        commit_patterns,
        message_quality: message_quality(commits),
        pattern_health,
    }
}

/// Heuristic message analysis, used when the AI collaborator fails or returns
/// an unusable payload. Produces the same shape as the AI path so downstream
/// logic never branches on provenance.
pub fn heuristic_message_analysis(commits: &[CommitRecord]) -> MessageAnalysis {
    if commits.is_empty() {
        return MessageAnalysis {
            score: 0.5,
            issues: Vec::new(),
            insights: vec!["No commits in the analyzed window".to_string()],
            recommendations: Vec::new(),
        };
    }

    let total = commits.len();
    let quality = message_quality(commits);
    let patterns = detect_patterns(commits);

    let conventional_ratio = quality.conventional_percent as f64 / 100.0;
    let descriptive_ratio = quality.descriptive_percent as f64 / 100.0;
    let vague_ratio = quality.vague_percent as f64 / 100.0;

    let score = clamp_unit(0.5 + 0.25 * conventional_ratio + 0.15 * descriptive_ratio
        - 0.25 * vague_ratio);

    let mut issues = Vec::new();
    let mut recommendations = Vec::new();

    if quality.vague_percent > 50 {
        let vague_count = total - total * quality.descriptive_percent as usize / 100;
        issues.push(
            Issue::new(
                "vague_messages",
                Severity::Medium,
                format!("{}% of commit messages are vague", quality.vague_percent),
                "Describe what changed and why, not just that something changed",
            )
            .with_commit_count(vague_count),
        );
        recommendations
            .push("Write commit subjects longer than 20 characters that name the change".to_string());
    }

    if patterns.quick_fixes as f64 / total as f64 > 0.3 {
        issues.push(
            Issue::new(
                "quick_fixes",
                Severity::High,
                "High ratio of quick fixes and hotfixes",
                "Track recurring hotfix areas and schedule proper fixes",
            )
            .with_commit_count(patterns.quick_fixes),
        );
    }

    if patterns.technical_debt as f64 / total as f64 > 0.2 {
        issues.push(
            Issue::new(
                "technical_debt",
                Severity::Medium,
                "Frequent technical-debt markers in commit messages",
                "Turn TODO/FIXME notes into tracked issues",
            )
            .with_commit_count(patterns.technical_debt),
        );
    }

    let mut insights = vec![format!(
        "{}% of commits follow the conventional format",
        quality.conventional_percent
    )];
    if patterns.testing > 0 {
        insights.push(format!("{} commits touch tests", patterns.testing));
    }
    if patterns.documentation > 0 {
        insights.push(format!("{} commits touch documentation", patterns.documentation));
    }

    if quality.conventional_percent < 50 {
        recommendations.push("Adopt the conventional `type(scope): description` format".to_string());
    }

    MessageAnalysis {
        score,
        issues,
        insights,
        recommendations,
    }
}
