//! Trend summarization over historical quality scores.

use crate::models::{TrendDirection, TrendReport};
use crate::utils::round3;

/// Window of most recent points compared against everything before them.
const RECENT_WINDOW: usize = 7;

/// Delta beyond which a trend counts as moving rather than stable.
const STABILITY_THRESHOLD: f64 = 0.05;

/// Summarize a chronologically ordered score series into a trend report.
///
/// Fewer than two points cannot express a direction and yield
/// `insufficient_data` with the single score (or 0.5 for an empty series) as
/// the average. Otherwise the last `RECENT_WINDOW` points are averaged
/// against all preceding points; the delta picks the direction.
pub fn analyze_trend(scores: &[f64]) -> TrendReport {
    if scores.len() < 2 {
        let average = scores.first().copied().unwrap_or(0.5);
        return TrendReport {
            direction: TrendDirection::InsufficientData,
            score_change: 0.0,
            average_score: round3(average),
            insights: vec![
                "Not enough history to compute a trend; at least two analyses are needed"
                    .to_string(),
            ],
            recommendations: vec![
                "Run analyses regularly to build up trend history".to_string()
            ],
        };
    }

    // Recent window is the last <=7 points; older keeps at least one point.
    let split = scores.len().saturating_sub(RECENT_WINDOW).max(1);
    let (older, recent) = scores.split_at(split);

    let recent_avg = mean(recent);
    let older_avg = mean(older);
    let delta = recent_avg - older_avg;

    let direction = if delta > STABILITY_THRESHOLD {
        TrendDirection::Improving
    } else if delta < -STABILITY_THRESHOLD {
        TrendDirection::Declining
    } else {
        TrendDirection::Stable
    };

    let average = mean(scores);
    let mut insights = vec![format!(
        "Average quality over {} analyses: {}%",
        scores.len(),
        (average * 100.0).round() as i64
    )];
    let mut recommendations = Vec::new();

    match direction {
        TrendDirection::Improving => {
            insights.push(format!(
                "Quality improved by {} points over the recent window",
                round3(delta)
            ));
        }
        TrendDirection::Declining => {
            insights.push(format!(
                "Quality declined by {} points over the recent window",
                round3(-delta)
            ));
            recommendations
                .push("Review recent commits for the source of the decline".to_string());
        }
        TrendDirection::Stable => {
            insights.push("Quality has been stable over the recent window".to_string());
        }
        TrendDirection::InsufficientData => unreachable!(),
    }

    TrendReport {
        direction,
        score_change: round3(delta),
        average_score: round3(average),
        insights,
        recommendations,
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
