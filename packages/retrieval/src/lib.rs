#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Listing collection across the configured districts.
//!
//! [`PropertyRetriever`] fetches each district's listing index page by page
//! through a [`PageFetcher`](ub_realty_scraper::PageFetcher), runs every
//! listing through the extractor and the validity filter, aggregates the
//! survivors and renders district documents. When a run yields nothing the
//! static fallback documents are returned instead, flagged as such in the
//! [`CollectionReport`].

pub mod cancel;
pub mod config;
pub mod estimate;
pub mod progress;
pub mod retriever;
pub mod stats;

pub use cancel::CancellationFlag;
pub use config::{ConfigError, DistrictConfig, RetrievalConfig};
pub use progress::{NullProgress, ProgressCallback, null_progress};
pub use retriever::{CollectionReport, DocumentOrigin, PropertyRetriever};
pub use stats::{CollectionStats, DistrictStats};
