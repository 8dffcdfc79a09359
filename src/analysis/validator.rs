//! Defensive validation of untrusted AI responses.
//!
//! Responses come from an LLM and may be malformed in any way: missing
//! fields, wrong types, scores out of range, JSON wrapped in prose or code
//! fences, or nested JSON encoded as a string. Everything here normalizes at
//! this boundary so the rest of the pipeline only ever sees well-formed,
//! clamped, fully-typed values.
//!
//! [`validate_message_analysis`] returns `None` only when no JSON object can
//! be extracted at all - the orchestrator substitutes the heuristic analysis
//! in that case. [`validate_diff_analysis`] is total: it always produces a
//! usable [`CommitDiffAnalysis`], falling back to neutral defaults.

use serde_json::Value;

use crate::models::{CommitDiffAnalysis, Issue, Severity};
use crate::utils::{clamp_unit, extract_json_str};

/// Score assumed when a payload carries no usable score.
const DEFAULT_SCORE: f64 = 0.5;

/// Message-level analysis, whether produced by the AI path or the heuristic
/// fallback. Downstream code never branches on which path built it.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageAnalysis {
    /// Score in [0, 1].
    pub score: f64,
    pub issues: Vec<Issue>,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Parse an AI categorization response into a [`MessageAnalysis`].
///
/// Returns `None` when the response contains no parseable JSON object;
/// any structural problem short of that is repaired field by field.
pub fn validate_message_analysis(raw: &str) -> Option<MessageAnalysis> {
    let json_str = extract_json_str(raw)?;
    let value: Value = serde_json::from_str(json_str).ok()?;
    let obj = unnest(value);
    if !obj.is_object() {
        return None;
    }

    Some(MessageAnalysis {
        score: read_score(&obj, &["quality_score", "qualityScore", "score"]),
        issues: read_issues(&obj, "issues"),
        insights: read_string_array(&obj, &["insights"]),
        recommendations: read_string_array(&obj, &["recommendations"]),
    })
}

/// Parse an AI diff-review response for one commit.
///
/// Always returns a well-formed analysis; an unusable response produces the
/// neutral default (score 0.5, empty lists).
pub fn validate_diff_analysis(sha: &str, raw: &str) -> CommitDiffAnalysis {
    let parsed = extract_json_str(raw)
        .and_then(|s| serde_json::from_str::<Value>(s).ok())
        .map(unnest)
        .filter(|v| v.is_object());

    let Some(obj) = parsed else {
        return default_diff_analysis(sha);
    };

    CommitDiffAnalysis {
        sha: sha.to_string(),
        score: read_score(&obj, &["score", "quality_score", "qualityScore"]),
        issues: read_issues(&obj, "issues"),
        positive_practices: read_string_array(
            &obj,
            &["positive_practices", "positivePractices", "good_practices"],
        ),
        summary: read_string(&obj, "summary").unwrap_or_default(),
    }
}

/// The documented default for an unusable diff review.
pub fn default_diff_analysis(sha: &str) -> CommitDiffAnalysis {
    CommitDiffAnalysis {
        sha: sha.to_string(),
        score: DEFAULT_SCORE,
        issues: Vec::new(),
        positive_practices: Vec::new(),
        summary: String::new(),
    }
}

/// Re-parse one level of string-encoded JSON. Anything that is not a string,
/// or a string that does not parse, passes through unchanged.
fn unnest(value: Value) -> Value {
    match value {
        Value::String(s) => serde_json::from_str(&s).unwrap_or(Value::String(s)),
        other => other,
    }
}

fn read_score(obj: &Value, keys: &[&str]) -> f64 {
    for key in keys {
        if let Some(v) = obj.get(key) {
            if let Some(n) = coerce_f64(v) {
                return clamp_unit(n);
            }
        }
    }
    DEFAULT_SCORE
}

fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn read_string(obj: &Value, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(|s| s.to_string())
}

/// Read the first matching key as a vec of strings. Non-arrays (after one
/// unnest pass) coerce to empty; non-string elements are dropped.
fn read_string_array(obj: &Value, keys: &[&str]) -> Vec<String> {
    for key in keys {
        if let Some(v) = obj.get(key) {
            let v = unnest(v.clone());
            if let Value::Array(items) = v {
                return items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::String(s) => Some(s),
                        _ => None,
                    })
                    .collect();
            }
        }
    }
    Vec::new()
}

/// Read the issues array, repairing each element. Elements that are not
/// objects (after one unnest pass) are dropped; missing fields inside an
/// object get defaults and the severity is normalized.
fn read_issues(obj: &Value, key: &str) -> Vec<Issue> {
    let Some(v) = obj.get(key) else {
        return Vec::new();
    };
    let v = unnest(v.clone());
    let Value::Array(items) = v else {
        return Vec::new();
    };

    items
        .into_iter()
        .map(unnest)
        .filter(|item| item.is_object())
        .map(|item| {
            let severity = item
                .get("severity")
                .and_then(Value::as_str)
                .map(Severity::normalize)
                .unwrap_or_default();

            Issue {
                issue_type: read_string(&item, "type").unwrap_or_else(|| "unknown".to_string()),
                severity,
                description: read_string(&item, "description").unwrap_or_default(),
                suggestion: read_string(&item, "suggestion").unwrap_or_default(),
                commit_count: item
                    .get("commit_count")
                    .or_else(|| item.get("commitCount"))
                    .and_then(coerce_f64)
                    .map(|n| n.max(0.0) as usize),
                line: item.get("line").and_then(coerce_f64).map(|n| n.max(0.0) as u32),
            }
        })
        .collect()
}
