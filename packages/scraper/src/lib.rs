#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Listing page scraping for real-estate marketplaces.
//!
//! Provides the leaf field parsers ([`parsing`]), ordered selector cascades
//! ([`selectors`]), extraction of listing records from search-result pages
//! ([`listing`]) and from single listing pages ([`detail`]), plus the
//! [`PageFetcher`] seam with a retrying HTTP implementation ([`fetch`]).
//!
//! `scraper::Html` is not `Send`, so every function that touches a parsed
//! document is synchronous and takes the raw HTML string. Async callers
//! fetch first and parse afterwards.

pub mod detail;
pub mod fetch;
pub mod listing;
pub mod parsing;
pub mod selectors;

pub use detail::{
    check_marketplace_url, extract_from_detail_page, parse_detail_page, retrieve_property_details,
};
pub use fetch::{HttpFetcher, PageFetcher};
pub use listing::{extract_from_search_result, parse_search_results};

/// Errors that can occur while fetching or parsing listing pages.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    /// An HTTP request failed (connection, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status} for {url}")]
    Status {
        /// Requested URL.
        url: String,
        /// Response status code.
        status: u16,
    },

    /// The markup did not contain what the extractor expected.
    #[error("Error parsing: {0}")]
    Parse(String),

    /// The URL does not belong to the configured marketplace. Carries the
    /// rejected URL.
    #[error("Not a Unegui.mn URL")]
    UnsupportedUrl(String),
}
