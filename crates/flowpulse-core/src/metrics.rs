//! The canonical metric map carried by every record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Metric names used by the video adapter.
pub const METRIC_VIEWS: &str = "views";
pub const METRIC_LIKES: &str = "likes";
pub const METRIC_COMMENTS: &str = "comments";
/// Metric name used by the trend adapter (already 0–100 scaled by source).
pub const METRIC_SEARCH_INTEREST: &str = "search_interest";
/// Metric name used by the forum adapter.
pub const METRIC_REPLIES: &str = "replies";

/// Mapping from metric name to numeric value.
///
/// The schema varies by platform; missing metrics are simply absent and
/// read as zero. A `BTreeMap` keeps JSON serialization ordered, so two
/// metric sets with equal contents serialize identically; the merge
/// layer relies on that for its `IS DISTINCT FROM` comparison.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricSet(BTreeMap<String, f64>);

impl MetricSet {
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Sets a metric, replacing any previous value under the same name.
    pub fn set(&mut self, name: &str, value: f64) {
        self.0.insert(name.to_owned(), value);
    }

    /// Reads a metric, treating absence as zero.
    #[must_use]
    pub fn get(&self, name: &str) -> f64 {
        self.0.get(name).copied().unwrap_or(0.0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<const N: usize> From<[(&str, f64); N]> for MetricSet {
    fn from(entries: [(&str, f64); N]) -> Self {
        let mut set = MetricSet::new();
        for (name, value) in entries {
            set.set(name, value);
        }
        set
    }
}
