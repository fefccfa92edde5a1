//! Run orchestration: fans out over the configured platforms, merges every
//! normalized item, and records per-platform accounting for the run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use std::time::Duration;

use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};

use flowpulse_core::{AppConfig, KeywordCatalog, Platform, RawItem, ScoreWeights};
use flowpulse_db::{
    complete_collection_run, create_collection_run, insert_trend_snapshot, merge_workflow_record,
    upsert_run_platform, DbError, MergeOutcome, NewRunPlatform, RunStatus,
};
use flowpulse_sources::{ForumClient, SourceConfig, SourceError, TrendClient, VideoClient};

use crate::normalize::normalize_item;

const STORAGE_WRITE_ATTEMPTS: u32 = 3;
const STORAGE_RETRY_BASE_MS: u64 = 100;

/// Bounded retry for per-item storage writes. A transient pool error must
/// not cost the item; an error that survives every attempt does.
async fn with_storage_retry<T, F, Fut>(mut op: F) -> Result<T, DbError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, DbError>>,
{
    let mut attempt: u32 = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < STORAGE_WRITE_ATTEMPTS => {
                tracing::warn!(attempt, error = %e, "storage write failed, retrying");
                tokio::time::sleep(Duration::from_millis(
                    STORAGE_RETRY_BASE_MS * u64::from(attempt),
                ))
                .await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[derive(Debug, Error)]
pub enum CollectError {
    /// Another run is already in progress; at most one runs at a time.
    #[error("a collection run is already in progress")]
    Busy,
    #[error(transparent)]
    Db(#[from] DbError),
}

/// Per-platform accounting for one finished run.
#[derive(Debug, Clone)]
pub struct PlatformReport {
    pub platform: Platform,
    pub fetched: i32,
    pub created: i32,
    pub updated: i32,
    pub unchanged: i32,
    pub failed: i32,
    pub error_message: Option<String>,
}

impl PlatformReport {
    fn new(platform: Platform) -> Self {
        Self {
            platform,
            fetched: 0,
            created: 0,
            updated: 0,
            unchanged: 0,
            failed: 0,
            error_message: None,
        }
    }

    fn succeeded(&self) -> bool {
        self.failed == 0 && self.error_message.is_none()
    }

    fn note_error(&mut self, message: String) {
        // Keep the first error; later ones are usually repeats.
        if self.error_message.is_none() {
            self.error_message = Some(message);
        }
    }

    fn to_counts(&self) -> NewRunPlatform {
        NewRunPlatform {
            fetched: self.fetched,
            created: self.created,
            updated: self.updated,
            unchanged: self.unchanged,
            failed: self.failed,
            error_message: self.error_message.clone(),
        }
    }
}

/// Summary of one finished collection run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: i64,
    pub public_id: uuid::Uuid,
    pub status: RunStatus,
    pub platforms: Vec<PlatformReport>,
}

/// Exclusive claim on the run slot, obtained from [`Collector::begin`].
/// Holding one guarantees the next [`Collector::run_with_permit`] call
/// will actually execute; dropping it releases the slot.
pub struct RunPermit {
    _guard: OwnedMutexGuard<()>,
}

/// Drives collection runs over the configured source adapters.
///
/// One collector instance is shared by the API, scheduler, and CLI; the
/// internal lock guarantees at most one run executes at a time.
pub struct Collector {
    pool: PgPool,
    video: Option<VideoClient>,
    trends: TrendClient,
    forum: ForumClient,
    catalog: KeywordCatalog,
    weights: ScoreWeights,
    video_max_items: usize,
    run_lock: Arc<Mutex<()>>,
    cancel: AtomicBool,
}

impl Collector {
    /// Builds a collector from app config, constructing one HTTP client per
    /// source. When no API key is configured the video adapter stays
    /// disabled and every run records the platform as failed with a
    /// missing-key reason; the other adapters need no key.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if an HTTP client cannot be constructed or a
    /// configured base URL is invalid.
    pub fn from_config(
        pool: PgPool,
        config: &AppConfig,
        catalog: KeywordCatalog,
    ) -> Result<Self, SourceError> {
        let source_config = SourceConfig::from_app_config(config);

        let video = match config.youtube_api_key.as_deref() {
            Some(key) => Some(VideoClient::with_base_url(
                key,
                source_config.clone(),
                &config.video_api_base_url,
            )?),
            None => {
                tracing::warn!(
                    "YOUTUBE_API_KEY is not set; runs will record the video platform as failed"
                );
                None
            }
        };

        let trends = TrendClient::new(&config.trends_base_url, source_config.clone())?;
        let forum = ForumClient::new(&config.forum_base_url, source_config)?;

        let weights = catalog.weights();
        Ok(Self {
            pool,
            video,
            trends,
            forum,
            catalog,
            weights,
            video_max_items: config.video_max_items_per_query,
            run_lock: Arc::new(Mutex::new(())),
            cancel: AtomicBool::new(false),
        })
    }

    /// Builds a collector from explicit clients (used by tests).
    #[must_use]
    pub fn with_clients(
        pool: PgPool,
        video: Option<VideoClient>,
        trends: TrendClient,
        forum: ForumClient,
        catalog: KeywordCatalog,
        video_max_items: usize,
    ) -> Self {
        let weights = catalog.weights();
        Self {
            pool,
            video,
            trends,
            forum,
            catalog,
            weights,
            video_max_items,
            run_lock: Arc::new(Mutex::new(())),
            cancel: AtomicBool::new(false),
        }
    }

    /// Asks the in-flight run (if any) to stop after its current platform.
    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Whether a run currently holds the lock. Advisory only: the answer
    /// can be stale by the time the caller acts on it, and [`Self::run`]
    /// re-checks under the lock.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.run_lock.try_lock().is_err()
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Executes one full collection run.
    ///
    /// Platforms run sequentially; an adapter failure is confined to its
    /// platform and the run continues. The run ends `completed` only when
    /// every platform finished without item failures, otherwise
    /// `partially_failed`.
    ///
    /// # Errors
    ///
    /// - [`CollectError::Busy`] if another run holds the lock.
    /// - [`CollectError::Db`] if the run record itself cannot be created or
    ///   finalized. Per-item storage failures are counted, not raised.
    pub async fn run(&self, trigger_source: &str) -> Result<RunReport, CollectError> {
        let permit = self.begin()?;
        self.run_with_permit(permit, trigger_source).await
    }

    /// Reserves the exclusive run slot without starting any work.
    ///
    /// Callers that acknowledge a trigger before the run finishes (the API
    /// does) reserve the slot first, so a positive acknowledgement always
    /// corresponds to a run that will execute.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::Busy`] if a run or another permit already
    /// holds the slot.
    pub fn begin(&self) -> Result<RunPermit, CollectError> {
        let guard = self
            .run_lock
            .clone()
            .try_lock_owned()
            .map_err(|_| CollectError::Busy)?;
        Ok(RunPermit { _guard: guard })
    }

    /// Executes one full collection run under a previously reserved permit.
    /// See [`Self::run`] for the failure semantics.
    ///
    /// # Errors
    ///
    /// [`CollectError::Db`] if the run record itself cannot be created or
    /// finalized.
    pub async fn run_with_permit(
        &self,
        permit: RunPermit,
        trigger_source: &str,
    ) -> Result<RunReport, CollectError> {
        // Held until the run reaches a terminal status.
        let _permit = permit;
        self.cancel.store(false, Ordering::SeqCst);

        let run = create_collection_run(&self.pool, trigger_source).await?;
        tracing::info!(run_id = run.id, public_id = %run.public_id, trigger_source, "collection run started");

        let mut platforms: Vec<PlatformReport> = Vec::with_capacity(Platform::ALL.len());
        let mut cancelled = false;

        for platform in Platform::ALL {
            if self.cancelled() {
                cancelled = true;
                let mut report = PlatformReport::new(platform);
                report.note_error("cancelled".to_string());
                platforms.push(report);
                continue;
            }

            let report = match platform {
                Platform::Video => self.collect_video(run.id).await,
                Platform::Trend => self.collect_trends(run.id).await,
                Platform::Forum => self.collect_forum(run.id).await,
            };

            tracing::info!(
                run_id = run.id,
                platform = %platform,
                fetched = report.fetched,
                created = report.created,
                updated = report.updated,
                unchanged = report.unchanged,
                failed = report.failed,
                "platform collection finished"
            );
            platforms.push(report);
        }

        // Accounting writes are best-effort: the run must still reach a
        // terminal status even if one of them fails.
        let mut accounting_failed = false;
        for report in &platforms {
            if let Err(e) = upsert_run_platform(
                &self.pool,
                run.id,
                report.platform.as_str(),
                &report.to_counts(),
            )
            .await
            {
                tracing::error!(run_id = run.id, platform = %report.platform, error = %e, "failed to record platform accounting");
                accounting_failed = true;
            }
        }

        let status = if !cancelled && !accounting_failed && platforms.iter().all(PlatformReport::succeeded) {
            RunStatus::Completed
        } else {
            RunStatus::PartiallyFailed
        };
        complete_collection_run(&self.pool, run.id, status).await?;

        tracing::info!(run_id = run.id, status = status.as_str(), "collection run finished");
        Ok(RunReport {
            run_id: run.id,
            public_id: run.public_id,
            status,
            platforms,
        })
    }

    async fn collect_video(&self, run_id: i64) -> PlatformReport {
        let mut report = PlatformReport::new(Platform::Video);

        // A permanent adapter failure: the platform is configured but
        // cannot run, so the run surfaces it instead of quietly skipping.
        let Some(video) = &self.video else {
            report.note_error(SourceError::MissingApiKey.to_string());
            return report;
        };

        for query in &self.catalog.video_queries {
            for country in self.catalog.parsed_countries() {
                match video.search_videos(query, country, self.video_max_items).await {
                    Ok(items) => {
                        self.merge_items(run_id, Platform::Video, &items, &mut report)
                            .await;
                    }
                    Err(e) => {
                        tracing::error!(query, country = %country, error = %e, "video search failed");
                        report.failed += 1;
                        report.note_error(format!("query '{query}' ({country}): {e}"));
                    }
                }
            }
        }
        report
    }

    async fn collect_trends(&self, run_id: i64) -> PlatformReport {
        let mut report = PlatformReport::new(Platform::Trend);

        for keyword in &self.catalog.trend_keywords {
            for country in self.catalog.parsed_countries() {
                match self.trends.interest_over_time(keyword, country).await {
                    // No data points for this keyword/geo; nothing to record.
                    Ok(None) => {}
                    Ok(Some(item)) => {
                        self.merge_items(
                            run_id,
                            Platform::Trend,
                            std::slice::from_ref(&item),
                            &mut report,
                        )
                        .await;
                    }
                    Err(e) => {
                        tracing::error!(keyword, country = %country, error = %e, "trend lookup failed");
                        report.failed += 1;
                        report.note_error(format!("keyword '{keyword}' ({country}): {e}"));
                    }
                }
            }
        }
        report
    }

    async fn collect_forum(&self, run_id: i64) -> PlatformReport {
        let mut report = PlatformReport::new(Platform::Forum);

        for category in &self.catalog.forum_categories {
            match self.forum.top_topics(category).await {
                Ok(items) => {
                    self.merge_items(run_id, Platform::Forum, &items, &mut report)
                        .await;
                }
                Err(e) => {
                    tracing::error!(category, error = %e, "forum fetch failed");
                    report.failed += 1;
                    report.note_error(format!("category '{category}': {e}"));
                }
            }
        }
        report
    }

    /// Normalizes and merges a batch of raw items, updating the report
    /// counters. Item-level failures are logged and counted; they never
    /// abort the batch.
    async fn merge_items(
        &self,
        run_id: i64,
        platform: Platform,
        items: &[RawItem],
        report: &mut PlatformReport,
    ) {
        for item in items {
            report.fetched += 1;

            let record = match normalize_item(platform, item, &self.weights) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(platform = %platform, error = %e, "skipping unnormalizable item");
                    report.failed += 1;
                    continue;
                }
            };

            match with_storage_retry(|| merge_workflow_record(&self.pool, &record, run_id)).await {
                Ok(MergeOutcome::Created) => report.created += 1,
                Ok(MergeOutcome::Updated) => report.updated += 1,
                Ok(MergeOutcome::Unchanged) => report.unchanged += 1,
                Err(e) => {
                    tracing::error!(
                        record_key = %record.record_key,
                        error = %e,
                        "failed to merge record"
                    );
                    report.failed += 1;
                    report.note_error(format!("merge '{}': {e}", record.record_key));
                    continue;
                }
            }

            // Trend records additionally append to the interest history.
            if platform == Platform::Trend {
                let interest = item.metrics.get(flowpulse_core::METRIC_SEARCH_INTEREST);
                if let Err(e) = with_storage_retry(|| {
                    insert_trend_snapshot(&self.pool, &record.record_key, item.observed_at, interest)
                })
                .await
                {
                    tracing::warn!(record_key = %record.record_key, error = %e, "failed to append trend snapshot");
                }
            }
        }
    }
}
