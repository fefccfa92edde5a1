//! Keyword catalog: what the collectors go looking for.
//!
//! Loaded from a YAML file (default `./config/keywords.yaml`) so the set of
//! video search queries, trend keywords and forum categories can change
//! without a redeploy. Score weights live here too, since the weighting is
//! a policy choice rather than code.

use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::platform::Country;
use crate::score::ScoreWeights;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordCatalog {
    /// Search queries for the video platform.
    pub video_queries: Vec<String>,
    /// Keywords for the trend platform's interest-over-time lookups.
    pub trend_keywords: Vec<String>,
    /// Forum category slugs to pull top topics from.
    pub forum_categories: Vec<String>,
    /// Countries to scope video and trend queries by.
    #[serde(default = "default_countries")]
    pub countries: Vec<String>,
    #[serde(default)]
    pub score_weights: Option<ScoreWeights>,
}

fn default_countries() -> Vec<String> {
    vec!["us".to_owned(), "in".to_owned()]
}

impl KeywordCatalog {
    /// Parses the configured country codes, skipping any that are unknown.
    #[must_use]
    pub fn parsed_countries(&self) -> Vec<Country> {
        self.countries
            .iter()
            .filter_map(|c| Country::from_str(c).ok())
            .collect()
    }

    /// The score weights to use: from the file when present, else defaults.
    #[must_use]
    pub fn weights(&self) -> ScoreWeights {
        self.score_weights.unwrap_or_default()
    }
}

/// Load and validate the keyword catalog from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_keyword_catalog(path: &Path) -> Result<KeywordCatalog, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::KeywordsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let catalog: KeywordCatalog = serde_yaml::from_str(&content)?;
    validate_catalog(&catalog)?;

    Ok(catalog)
}

fn validate_catalog(catalog: &KeywordCatalog) -> Result<(), ConfigError> {
    if catalog.video_queries.is_empty()
        && catalog.trend_keywords.is_empty()
        && catalog.forum_categories.is_empty()
    {
        return Err(ConfigError::Validation(
            "keyword catalog is empty: no queries, keywords, or categories".to_string(),
        ));
    }

    for list in [
        &catalog.video_queries,
        &catalog.trend_keywords,
        &catalog.forum_categories,
    ] {
        let mut seen = HashSet::new();
        for entry in list {
            if entry.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "keyword catalog entries must be non-empty".to_string(),
                ));
            }
            if !seen.insert(entry.to_lowercase()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate catalog entry: '{entry}'"
                )));
            }
        }
    }

    for country in &catalog.countries {
        if Country::from_str(country).is_err() {
            return Err(ConfigError::Validation(format!(
                "unknown country code in catalog: '{country}'"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog_from(yaml: &str) -> Result<KeywordCatalog, ConfigError> {
        let catalog: KeywordCatalog = serde_yaml::from_str(yaml)?;
        validate_catalog(&catalog)?;
        Ok(catalog)
    }

    #[test]
    fn parses_minimal_catalog() {
        let catalog = catalog_from(
            "video_queries: [\"n8n automation workflow\"]\n\
             trend_keywords: [\"n8n automation\"]\n\
             forum_categories: [\"workflows\"]\n",
        )
        .unwrap();
        assert_eq!(catalog.video_queries.len(), 1);
        assert_eq!(catalog.countries, vec!["us", "in"]);
        assert_eq!(catalog.weights(), ScoreWeights::default());
    }

    #[test]
    fn rejects_empty_catalog() {
        let result = catalog_from(
            "video_queries: []\ntrend_keywords: []\nforum_categories: []\n",
        );
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_duplicate_entries() {
        let result = catalog_from(
            "video_queries: [\"n8n tutorial\", \"N8N Tutorial\"]\n\
             trend_keywords: []\n\
             forum_categories: [\"workflows\"]\n",
        );
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_unknown_country() {
        let result = catalog_from(
            "video_queries: [\"n8n tutorial\"]\n\
             trend_keywords: []\n\
             forum_categories: []\n\
             countries: [\"atlantis\"]\n",
        );
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn custom_weights_override_defaults() {
        let catalog = catalog_from(
            "video_queries: [\"n8n tutorial\"]\n\
             trend_keywords: []\n\
             forum_categories: []\n\
             score_weights:\n\
             \x20 video_views: 0.6\n\
             \x20 video_likes: 0.3\n\
             \x20 video_comments: 0.1\n\
             \x20 forum_replies: 0.5\n\
             \x20 forum_views: 0.25\n\
             \x20 forum_likes: 0.25\n",
        )
        .unwrap();
        assert!((catalog.weights().video_views - 0.6).abs() < f64::EPSILON);
    }
}
