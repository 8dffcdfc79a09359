/// Truncate a SHA to its first 8 characters for display
pub fn short_sha(sha: &str) -> &str {
    &sha[..8.min(sha.len())]
}

/// Clamp a score into [0, 1].
pub fn clamp_unit(score: f64) -> f64 {
    score.clamp(0.0, 1.0)
}

/// Round to 3 decimal places (used for trend deltas and averages).
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Extract JSON content from an LLM response.
///
/// Handles three formats:
/// 1. JSON in a ```json code fence
/// 2. JSON in a generic ``` code fence
/// 3. Raw JSON starting with `{`
///
/// Returns the extracted JSON string slice, or None if no JSON found.
pub fn extract_json_str(response: &str) -> Option<&str> {
    // Try ```json fence
    if let Some(start) = response.find("```json") {
        let content_start = start + 7;
        let end = response[content_start..]
            .find("```")
            .map(|e| content_start + e)?;
        return Some(response[content_start..end].trim());
    }

    // Try generic ``` fence
    if let Some(start) = response.find("```") {
        let content_start = start + 3;
        // Skip language identifier on same line
        let line_end = response[content_start..]
            .find('\n')
            .map(|n| content_start + n + 1)
            .unwrap_or(content_start);
        let end = response[line_end..].find("```").map(|e| line_end + e)?;
        return Some(response[line_end..end].trim());
    }

    // Try raw JSON
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if start <= end {
        Some(response[start..=end].trim())
    } else {
        None
    }
}
