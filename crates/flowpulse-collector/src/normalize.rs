//! Normalization from raw source items to [`flowpulse_core::NewWorkflowRecord`].
//!
//! Scoring is delegated to [`flowpulse_core::engagement_score`]; this module
//! focuses on identity derivation and text cleanup.

use flowpulse_core::{engagement_score, record_key, NewWorkflowRecord, Platform, RawItem, ScoreWeights};
use thiserror::Error;

/// Placeholder title for items whose title is empty after cleanup.
pub const UNTITLED: &str = "Untitled";

/// Maximum stored title length in characters.
const MAX_TITLE_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum NormalizeError {
    /// The source returned an item without a usable identifier. Such an
    /// item has no stable key and can never be merged.
    #[error("{platform} item has no source id")]
    MissingSourceId { platform: Platform },
}

/// Normalizes a raw source item into a canonical record.
///
/// Derives the stable record key, cleans up the title and description, and
/// computes the engagement score. Pure: the same item and weights always
/// produce the same record.
///
/// # Errors
///
/// Returns [`NormalizeError::MissingSourceId`] if `source_item_id` is empty
/// or whitespace.
pub fn normalize_item(
    platform: Platform,
    item: &RawItem,
    weights: &ScoreWeights,
) -> Result<NewWorkflowRecord, NormalizeError> {
    let source_item_id = item.source_item_id.trim();
    if source_item_id.is_empty() {
        return Err(NormalizeError::MissingSourceId { platform });
    }

    let title = sanitize_title(&item.title);
    let description = item
        .description
        .as_deref()
        .map(clean_text)
        .filter(|s| !s.is_empty());

    Ok(NewWorkflowRecord {
        record_key: record_key(platform, source_item_id),
        platform,
        country: item.country,
        title,
        description,
        evidence_url: item.evidence_url.clone(),
        metrics: item.metrics.clone(),
        engagement_score: engagement_score(platform, &item.metrics, weights),
    })
}

/// Cleans a title: strip control characters, collapse whitespace, cap the
/// length, and fall back to [`UNTITLED`] when nothing remains.
fn sanitize_title(raw: &str) -> String {
    let cleaned = clean_text(raw);
    if cleaned.is_empty() {
        return UNTITLED.to_string();
    }
    cleaned.chars().take(MAX_TITLE_CHARS).collect()
}

/// Strips control characters and collapses runs of whitespace to single
/// spaces.
fn clean_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;
    for ch in raw.chars() {
        if ch.is_whitespace() {
            pending_space = !out.is_empty();
        } else if !ch.is_control() {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use flowpulse_core::{Country, MetricSet};

    fn raw(source_item_id: &str, title: &str) -> RawItem {
        RawItem {
            source_item_id: source_item_id.to_string(),
            title: title.to_string(),
            description: Some("An example description".to_string()),
            metrics: MetricSet::from([("views", 10_000.0), ("likes", 500.0), ("comments", 50.0)]),
            evidence_url: "https://www.youtube.com/watch?v=abc".to_string(),
            observed_at: Utc::now(),
            country: Some(Country::Us),
        }
    }

    #[test]
    fn normalizes_a_typical_video_item() {
        let weights = ScoreWeights::default();
        let item = raw("abc", "n8n automation tutorial");
        let record = normalize_item(Platform::Video, &item, &weights).expect("normalize failed");

        assert_eq!(record.record_key, record_key(Platform::Video, "abc"));
        assert_eq!(record.platform, Platform::Video);
        assert_eq!(record.title, "n8n automation tutorial");
        assert_eq!(record.country, Some(Country::Us));
        assert!(record.engagement_score > 0.0);
        assert!(record.engagement_score <= 100.0);
    }

    #[test]
    fn empty_source_id_is_rejected() {
        let weights = ScoreWeights::default();
        let item = raw("   ", "title");
        let err = normalize_item(Platform::Forum, &item, &weights).expect_err("should fail");
        assert!(matches!(
            err,
            NormalizeError::MissingSourceId {
                platform: Platform::Forum
            }
        ));
    }

    #[test]
    fn source_id_is_trimmed_before_keying() {
        let weights = ScoreWeights::default();
        let padded = normalize_item(Platform::Video, &raw(" abc ", "t"), &weights)
            .expect("normalize failed");
        let bare = normalize_item(Platform::Video, &raw("abc", "t"), &weights)
            .expect("normalize failed");
        assert_eq!(padded.record_key, bare.record_key);
    }

    #[test]
    fn blank_title_becomes_untitled() {
        let weights = ScoreWeights::default();
        let record = normalize_item(Platform::Video, &raw("abc", " \t\n "), &weights)
            .expect("normalize failed");
        assert_eq!(record.title, UNTITLED);
    }

    #[test]
    fn title_whitespace_is_collapsed_and_controls_stripped() {
        let weights = ScoreWeights::default();
        let record = normalize_item(
            Platform::Video,
            &raw("abc", "  big\u{0000}   title\twith\nnoise  "),
            &weights,
        )
        .expect("normalize failed");
        assert_eq!(record.title, "big title with noise");
    }

    #[test]
    fn long_title_is_capped_at_200_chars() {
        let weights = ScoreWeights::default();
        let long = "x".repeat(500);
        let record =
            normalize_item(Platform::Video, &raw("abc", &long), &weights).expect("normalize failed");
        assert_eq!(record.title.chars().count(), 200);
    }

    #[test]
    fn cap_respects_char_boundaries() {
        let weights = ScoreWeights::default();
        let long = "é".repeat(300);
        let record =
            normalize_item(Platform::Video, &raw("abc", &long), &weights).expect("normalize failed");
        assert_eq!(record.title.chars().count(), 200);
    }

    #[test]
    fn empty_description_becomes_none() {
        let weights = ScoreWeights::default();
        let mut item = raw("abc", "title");
        item.description = Some("   ".to_string());
        let record = normalize_item(Platform::Video, &item, &weights).expect("normalize failed");
        assert!(record.description.is_none());
    }

    #[test]
    fn normalization_is_deterministic() {
        let weights = ScoreWeights::default();
        let item = raw("abc", "title");
        let a = normalize_item(Platform::Video, &item, &weights).expect("normalize failed");
        let b = normalize_item(Platform::Video, &item, &weights).expect("normalize failed");
        assert_eq!(a.record_key, b.record_key);
        assert_eq!(a.engagement_score.to_bits(), b.engagement_score.to_bits());
    }
}
