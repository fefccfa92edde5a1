//! Raw source items and the canonical record shape they normalize into.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::metrics::MetricSet;
use crate::platform::{Country, Platform};

/// A source-specific item as returned by one adapter invocation.
///
/// Never persisted; it exists only between the adapter's fetch and the
/// normalizer.
#[derive(Debug, Clone)]
pub struct RawItem {
    /// Identifier scoped to the source (video id, keyword:geo, topic id).
    pub source_item_id: String,
    pub title: String,
    pub description: Option<String>,
    pub metrics: MetricSet,
    /// URL pointing at the evidence for this item on the source platform.
    pub evidence_url: String,
    pub observed_at: DateTime<Utc>,
    pub country: Option<Country>,
}

/// A canonical record ready for the merge layer.
///
/// The database assigns `first_seen_at`/`last_updated_at` and the run id
/// at insert time; everything else is derived deterministically from the
/// raw item.
#[derive(Debug, Clone)]
pub struct NewWorkflowRecord {
    pub record_key: String,
    pub platform: Platform,
    pub country: Option<Country>,
    pub title: String,
    pub description: Option<String>,
    pub evidence_url: String,
    pub metrics: MetricSet,
    pub engagement_score: f64,
}

/// Derives the stable record key for a `(platform, source_item_id)` pair.
///
/// First 16 hex characters of SHA-256 over `"{platform}:{source_item_id}"`.
/// The same logical item always maps to the same key across runs, which is
/// what makes the merge upsert idempotent.
#[must_use]
pub fn record_key(platform: Platform, source_item_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(platform.as_str().as_bytes());
    hasher.update(b":");
    hasher.update(source_item_id.as_bytes());
    let digest = hasher.finalize();

    let mut key = String::with_capacity(16);
    for byte in &digest[..8] {
        use std::fmt::Write;
        // Writing to a String cannot fail.
        let _ = write!(key, "{byte:02x}");
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_key_is_deterministic() {
        let a = record_key(Platform::Video, "abc");
        let b = record_key(Platform::Video, "abc");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn record_key_distinguishes_platforms() {
        assert_ne!(
            record_key(Platform::Video, "abc"),
            record_key(Platform::Forum, "abc")
        );
    }

    #[test]
    fn record_key_distinguishes_items() {
        assert_ne!(
            record_key(Platform::Trend, "n8n automation:US"),
            record_key(Platform::Trend, "n8n automation:IN")
        );
    }
}
