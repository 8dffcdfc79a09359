//! Model-aware diff truncation budgets for cost control.
//!
//! Budgets are in characters, not tokens. The table is deliberately static:
//! an unknown model identifier maps to the smallest budget so a typo can only
//! make an analysis cheaper, never more expensive.

/// Marker appended when a diff had to be cut at the budget.
pub const TRUNCATION_MARKER: &str = "\n... [diff truncated]";

/// Character budgets per model identifier. Matching is by substring, so
/// "claude-3-5-haiku-20241022" picks up the "haiku" budget.
const MODEL_BUDGETS: &[(&str, usize)] = &[
    ("opus", 60_000),
    ("sonnet", 40_000),
    ("haiku", 12_000),
    ("gpt-4", 24_000),
    ("gpt-3.5", 8_000),
];

const MIN_BUDGET: usize = 8_000;

/// Look up the diff character budget for a model. Never fails.
pub fn diff_budget_for(model: &str) -> usize {
    let model = model.to_lowercase();
    MODEL_BUDGETS
        .iter()
        .find(|(name, _)| model.contains(name))
        .map(|(_, budget)| *budget)
        .unwrap_or(MIN_BUDGET)
}

/// Hard-truncate a diff to `budget` characters, appending the truncation
/// marker when anything was cut. The kept portion is exactly `budget`
/// characters; the result is never longer than budget + marker.
pub fn truncate_diff(diff: &str, budget: usize) -> String {
    if diff.chars().count() <= budget {
        return diff.to_string();
    }

    let mut truncated: String = diff.chars().take(budget).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}
