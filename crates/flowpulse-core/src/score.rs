//! Engagement-score policy.
//!
//! Each platform's raw metrics live on wildly different scales (a video
//! with 10M views vs. a forum thread with 40 replies), so every metric is
//! log-compressed into `[0, 1]` before weighting and the final score lands
//! on a common 0–100 scale. The trend platform's `search_interest` is
//! already 0–100 at the source and passes through unscaled.
//!
//! Contract the rest of the system relies on:
//! - monotone non-decreasing in each metric, holding the others fixed;
//! - deterministic for a given metric set and weights;
//! - missing metrics read as zero and never fail.

use serde::{Deserialize, Serialize};

use crate::metrics::{
    MetricSet, METRIC_COMMENTS, METRIC_LIKES, METRIC_REPLIES, METRIC_SEARCH_INTEREST, METRIC_VIEWS,
};
use crate::platform::Platform;

/// Weighting policy for the engagement score.
///
/// The exact weights are a policy choice, so they are configuration rather
/// than constants; [`ScoreWeights::default`] carries the documented
/// defaults. Weights within a platform should sum to 1.0 for the score to
/// stay on the 0-100 scale, but nothing enforces it; monotonicity holds
/// for any non-negative weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub video_views: f64,
    pub video_likes: f64,
    pub video_comments: f64,
    pub forum_replies: f64,
    pub forum_views: f64,
    pub forum_likes: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            video_views: 0.5,
            video_likes: 0.3,
            video_comments: 0.2,
            forum_replies: 1.0 / 3.0,
            forum_views: 1.0 / 3.0,
            forum_likes: 1.0 / 3.0,
        }
    }
}

/// Log-compresses a raw count into `[0, 1]`, saturating at `10^decades`.
///
/// `log10(value + 1) / decades`, clamped. Monotone in `value`.
fn saturating_log_scale(value: f64, decades: f64) -> f64 {
    if value <= 0.0 {
        return 0.0;
    }
    ((value + 1.0).log10() / decades).min(1.0)
}

/// Computes the engagement score for a metric set on a common 0–100 scale.
///
/// Defaults per platform:
/// - video: `0.5·views + 0.3·likes + 0.2·comments`, each log-scaled
///   (views saturate at 10^7, likes at 10^5, comments at 10^4);
/// - trend: raw `search_interest`, already 0–100 at the source;
/// - forum: equal-weight `replies` (saturating at 10^3), `views` (10^5)
///   and `likes` (10^3).
#[must_use]
pub fn engagement_score(platform: Platform, metrics: &MetricSet, weights: &ScoreWeights) -> f64 {
    match platform {
        Platform::Video => {
            let views = saturating_log_scale(metrics.get(METRIC_VIEWS), 7.0);
            let likes = saturating_log_scale(metrics.get(METRIC_LIKES), 5.0);
            let comments = saturating_log_scale(metrics.get(METRIC_COMMENTS), 4.0);
            100.0
                * (weights.video_views * views
                    + weights.video_likes * likes
                    + weights.video_comments * comments)
        }
        Platform::Trend => metrics.get(METRIC_SEARCH_INTEREST).max(0.0),
        Platform::Forum => {
            let replies = saturating_log_scale(metrics.get(METRIC_REPLIES), 3.0);
            let views = saturating_log_scale(metrics.get(METRIC_VIEWS), 5.0);
            let likes = saturating_log_scale(metrics.get(METRIC_LIKES), 3.0);
            100.0
                * (weights.forum_replies * replies
                    + weights.forum_views * views
                    + weights.forum_likes * likes)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video_metrics(views: f64, likes: f64, comments: f64) -> MetricSet {
        MetricSet::from([
            (METRIC_VIEWS, views),
            (METRIC_LIKES, likes),
            (METRIC_COMMENTS, comments),
        ])
    }

    #[test]
    fn all_zero_metrics_score_zero() {
        let weights = ScoreWeights::default();
        assert_eq!(
            engagement_score(Platform::Video, &video_metrics(0.0, 0.0, 0.0), &weights),
            0.0
        );
        assert_eq!(
            engagement_score(Platform::Forum, &MetricSet::new(), &weights),
            0.0
        );
    }

    #[test]
    fn missing_metrics_default_to_zero_without_failing() {
        let weights = ScoreWeights::default();
        let only_views = MetricSet::from([(METRIC_VIEWS, 5_000.0)]);
        let score = engagement_score(Platform::Video, &only_views, &weights);
        assert!(score > 0.0);
        assert!(score < 100.0);
    }

    #[test]
    fn score_is_deterministic() {
        let weights = ScoreWeights::default();
        let metrics = video_metrics(10_000.0, 500.0, 50.0);
        let first = engagement_score(Platform::Video, &metrics, &weights);
        let second = engagement_score(Platform::Video, &metrics, &weights);
        assert_eq!(first, second);
    }

    #[test]
    fn score_is_monotone_in_each_video_metric() {
        let weights = ScoreWeights::default();
        let base = video_metrics(10_000.0, 500.0, 50.0);
        let base_score = engagement_score(Platform::Video, &base, &weights);

        for bumped in [
            video_metrics(20_000.0, 500.0, 50.0),
            video_metrics(10_000.0, 1_000.0, 50.0),
            video_metrics(10_000.0, 500.0, 100.0),
        ] {
            let bumped_score = engagement_score(Platform::Video, &bumped, &weights);
            assert!(
                bumped_score >= base_score,
                "increasing a metric must not decrease the score \
                 ({bumped_score} < {base_score})"
            );
        }
    }

    #[test]
    fn score_never_decreases_past_saturation() {
        let weights = ScoreWeights::default();
        let huge = video_metrics(1e12, 1e9, 1e8);
        let huger = video_metrics(1e13, 1e9, 1e8);
        assert!(
            engagement_score(Platform::Video, &huger, &weights)
                >= engagement_score(Platform::Video, &huge, &weights)
        );
    }

    #[test]
    fn trend_score_passes_interest_through() {
        let weights = ScoreWeights::default();
        let metrics = MetricSet::from([(METRIC_SEARCH_INTEREST, 73.0)]);
        let score = engagement_score(Platform::Trend, &metrics, &weights);
        assert!((score - 73.0).abs() < f64::EPSILON);
    }

    #[test]
    fn forum_score_is_monotone_in_replies() {
        let weights = ScoreWeights::default();
        let quiet = MetricSet::from([(METRIC_REPLIES, 3.0), (METRIC_VIEWS, 800.0)]);
        let busy = MetricSet::from([(METRIC_REPLIES, 30.0), (METRIC_VIEWS, 800.0)]);
        assert!(
            engagement_score(Platform::Forum, &busy, &weights)
                > engagement_score(Platform::Forum, &quiet, &weights)
        );
    }

    #[test]
    fn default_video_score_stays_within_scale() {
        let weights = ScoreWeights::default();
        let maxed = video_metrics(1e9, 1e7, 1e6);
        let score = engagement_score(Platform::Video, &maxed, &weights);
        assert!(score <= 100.0 + 1e-9);
    }
}
