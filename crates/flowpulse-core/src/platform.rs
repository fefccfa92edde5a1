//! Platform and geography enums shared across the pipeline.
//!
//! Both enums are stored as lowercase text in Postgres and round-trip
//! through [`std::str::FromStr`]; the database layer binds the string
//! form directly.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The external platform a record was collected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Video platform (YouTube Data API).
    Video,
    /// Search-trend platform (interest-over-time API).
    Trend,
    /// Community forum (Discourse JSON API).
    Forum,
}

impl Platform {
    /// All platforms in collection order.
    pub const ALL: [Platform; 3] = [Platform::Video, Platform::Trend, Platform::Forum];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Video => "video",
            Platform::Trend => "trend",
            Platform::Forum => "forum",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown platform: {0}")]
pub struct ParsePlatformError(String);

impl std::str::FromStr for Platform {
    type Err = ParsePlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "video" => Ok(Platform::Video),
            "trend" => Ok(Platform::Trend),
            "forum" => Ok(Platform::Forum),
            other => Err(ParsePlatformError(other.to_owned())),
        }
    }
}

/// Query geography for platforms where it is meaningful.
///
/// Only the trend and video adapters scope queries by country; forum
/// records leave it unset. An unset incoming country never overwrites
/// a stored one (see the merge contract in `flowpulse-db`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Country {
    Us,
    In,
    Global,
}

impl Country {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Country::Us => "us",
            Country::In => "in",
            Country::Global => "global",
        }
    }

    /// Geo code for the trend platform's query parameter; global maps to
    /// the empty string, which the trend API treats as worldwide.
    #[must_use]
    pub fn geo_code(self) -> &'static str {
        match self {
            Country::Us => "US",
            Country::In => "IN",
            Country::Global => "",
        }
    }
}

impl std::fmt::Display for Country {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown country: {0}")]
pub struct ParseCountryError(String);

impl std::str::FromStr for Country {
    type Err = ParseCountryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "us" | "US" => Ok(Country::Us),
            "in" | "IN" => Ok(Country::In),
            "global" => Ok(Country::Global),
            other => Err(ParseCountryError(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_round_trips_through_str() {
        for platform in Platform::ALL {
            assert_eq!(platform.as_str().parse::<Platform>().unwrap(), platform);
        }
    }

    #[test]
    fn unknown_platform_is_an_error() {
        assert!("mastodon".parse::<Platform>().is_err());
    }

    #[test]
    fn country_accepts_upper_and_lower_case() {
        assert_eq!("US".parse::<Country>().unwrap(), Country::Us);
        assert_eq!("in".parse::<Country>().unwrap(), Country::In);
    }

    #[test]
    fn global_geo_code_is_empty() {
        assert_eq!(Country::Global.geo_code(), "");
        assert_eq!(Country::Us.geo_code(), "US");
    }
}
