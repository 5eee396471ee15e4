//! District-by-district collection run.
//!
//! One logical worker: districts in configured order, pages in order, one
//! fetch in flight at a time with a fixed pause between fetches. A failed
//! page is logged and counted; it never aborts the district or the run.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use ub_realty_aggregate::{
    AggregationBuckets, ValidityRules, fallback_documents, render_district_documents,
    summarize_run, validate,
};
use ub_realty_property_models::{DistrictDocument, PropertyLookup};
use ub_realty_scraper::{
    HttpFetcher, PageFetcher, ScrapeError, parse_search_results, retrieve_property_details,
};

use crate::cancel::CancellationFlag;
use crate::config::{DistrictConfig, RetrievalConfig};
use crate::estimate;
use crate::progress::{ProgressCallback, null_progress};
use crate::stats::{CollectionStats, DistrictStats};

/// Where the documents of a [`CollectionReport`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DocumentOrigin {
    /// Aggregated from listings collected in this run.
    Live,
    /// Static seed documents; the run produced no usable data.
    Fallback,
}

/// Result of a collection run.
#[derive(Debug, Clone)]
pub struct CollectionReport {
    pub documents: Vec<DistrictDocument>,
    pub origin: DocumentOrigin,
    pub stats: CollectionStats,
}

impl CollectionReport {
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.origin == DocumentOrigin::Live
    }
}

/// Drives collection runs against the configured marketplace.
pub struct PropertyRetriever {
    config: RetrievalConfig,
    rules: ValidityRules,
    fetcher: Arc<dyn PageFetcher>,
    progress: Arc<dyn ProgressCallback>,
    cancellation: CancellationFlag,
}

impl PropertyRetriever {
    /// Creates a retriever with silent progress and a fresh cancellation
    /// flag.
    #[must_use]
    pub fn new(config: RetrievalConfig, fetcher: Arc<dyn PageFetcher>) -> Self {
        let rules = config.validity_rules();
        Self {
            config,
            rules,
            fetcher,
            progress: null_progress(),
            cancellation: CancellationFlag::new(),
        }
    }

    /// Creates a retriever backed by an [`HttpFetcher`] using the
    /// configured request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError`] if the HTTP client cannot be built.
    pub fn with_http(config: RetrievalConfig) -> Result<Self, ScrapeError> {
        let fetcher = HttpFetcher::new(config.request_timeout())?;
        Ok(Self::new(config, Arc::new(fetcher)))
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Uses an externally owned flag so callers can stop the run.
    #[must_use]
    pub fn with_cancellation(mut self, cancellation: CancellationFlag) -> Self {
        self.cancellation = cancellation;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    #[must_use]
    pub fn cancellation(&self) -> CancellationFlag {
        self.cancellation.clone()
    }

    /// Runs a full collection and reports whether the documents are live or
    /// the static fallback set.
    pub async fn collect(&self) -> CollectionReport {
        let mut buckets = AggregationBuckets::new();
        let mut stats = CollectionStats::default();

        let total_pages =
            self.config.districts.len() as u64 * u64::from(self.config.max_pages_per_district);
        self.progress.set_total(total_pages);

        log::info!(
            "Starting collection across {} districts",
            self.config.districts.len()
        );

        let mut first_fetch = true;
        for district in &self.config.districts {
            if self.cancellation.is_cancelled() {
                stats.cancelled = true;
                break;
            }

            let district_stats = stats.district_mut(&district.name);
            self.collect_district(district, &mut buckets, district_stats, &mut first_fetch)
                .await;
            log::info!("Finished {}: {district_stats}", district.name);
            if !district_stats.rejection_reasons.is_empty() {
                log::debug!(
                    "Rejections in {}: {:?}",
                    district.name,
                    district_stats.rejection_reasons
                );
            }

            if self.cancellation.is_cancelled() {
                stats.cancelled = true;
                break;
            }
        }

        if stats.cancelled {
            log::warn!("Collection cancelled");
        }

        summarize_run(&buckets);
        let documents =
            render_district_documents(&buckets, &self.config.descriptions(), Utc::now());

        let totals = stats.totals();
        let report = if documents.is_empty() {
            log::warn!("No live district documents ({totals}); using fallback data");
            CollectionReport {
                documents: fallback_documents(Utc::now()),
                origin: DocumentOrigin::Fallback,
                stats,
            }
        } else {
            log::info!("Collected {} district documents ({totals})", documents.len());
            CollectionReport {
                documents,
                origin: DocumentOrigin::Live,
                stats,
            }
        };

        self.progress.finish(format!(
            "{} documents ({})",
            report.documents.len(),
            report.origin
        ));
        report
    }

    /// Runs a full collection and returns only the documents: live when
    /// any district produced data, otherwise the fallback set.
    pub async fn collect_all_districts(&self) -> Vec<DistrictDocument> {
        self.collect().await.documents
    }

    async fn collect_district(
        &self,
        district: &DistrictConfig,
        buckets: &mut AggregationBuckets,
        stats: &mut DistrictStats,
        first_fetch: &mut bool,
    ) {
        log::info!("Collecting district {}", district.name);

        for page in 1..=self.config.max_pages_per_district {
            if self.cancellation.is_cancelled() {
                return;
            }

            if !*first_fetch {
                tokio::time::sleep(self.config.request_delay()).await;
            }
            *first_fetch = false;

            let url = self.config.page_url(district, page);
            self.progress
                .set_message(format!("{} page {page}", district.name));
            log::info!("  Fetching page {page} for {}: {url}", district.name);

            let html = match self.fetcher.fetch_text(&url).await {
                Ok(html) => html,
                Err(e) => {
                    log::warn!("  Page {page} for {} failed: {e}", district.name);
                    stats.page_errors += 1;
                    self.progress.inc(1);
                    continue;
                }
            };
            stats.pages_fetched += 1;

            let records = parse_search_results(&html, &url, self.config.listings_per_page);
            log::info!("  Found {} listings on page {page}", records.len());

            for record in records {
                let record = record.with_scraped_district(district.name.clone());
                stats.processed += 1;

                if record.title.is_none() {
                    log::debug!("  Listing without title on {url}");
                    stats.parse_errors += 1;
                    continue;
                }

                match validate(&record, &self.rules) {
                    Ok(listing) => {
                        log::debug!(
                            "  Accepted: {}",
                            record.title.as_deref().unwrap_or_default()
                        );
                        buckets.add(&listing);
                        stats.accepted += 1;
                    }
                    Err(reason) => {
                        log::debug!(
                            "  Excluded {reason}: {}",
                            record.title.as_deref().unwrap_or_default()
                        );
                        stats.record_rejection(reason.kind());
                    }
                }
            }

            self.progress.inc(1);
        }
    }

    /// Looks up a single listing by URL. Never fails; errors come back as
    /// [`PropertyLookup::Failed`].
    pub async fn retrieve_single(&self, url: &str) -> PropertyLookup {
        retrieve_property_details(self.fetcher.as_ref(), &self.config.marketplace_host, url).await
    }

    /// Multiplier-based price estimate text for a district.
    #[must_use]
    pub fn estimate_price_for_district(&self, district: &str) -> String {
        estimate::estimate_price_for_district(&self.config, district)
    }
}
