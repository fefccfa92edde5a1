//! Collection pipeline: normalizes raw source items into canonical records
//! and orchestrates full multi-platform collection runs.

pub mod normalize;
pub mod orchestrator;

pub use normalize::{normalize_item, NormalizeError};
pub use orchestrator::{CollectError, Collector, PlatformReport, RunPermit, RunReport};
