mod app_config;
mod config;
pub mod keywords;
pub mod metrics;
pub mod platform;
pub mod record;
pub mod score;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env, ConfigError};
pub use keywords::{load_keyword_catalog, KeywordCatalog};
pub use metrics::{
    MetricSet, METRIC_COMMENTS, METRIC_LIKES, METRIC_REPLIES, METRIC_SEARCH_INTEREST, METRIC_VIEWS,
};
pub use platform::{Country, Platform};
pub use record::{record_key, NewWorkflowRecord, RawItem};
pub use score::{engagement_score, ScoreWeights};
