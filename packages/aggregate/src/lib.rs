#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Residential validity filtering and district price aggregation.
//!
//! Scraped [`PropertyRecord`](ub_realty_property_models::PropertyRecord)s
//! are checked by [`is_valid_residential`] against [`ValidityRules`],
//! accumulated into [`AggregationBuckets`], and rendered into
//! [`DistrictDocument`](ub_realty_property_models::DistrictDocument)s.
//! When nothing survives a run, [`fallback_documents`] supplies static
//! seed data.

pub mod buckets;
pub mod fallback;
pub mod filter;
pub mod render;
pub mod rules;

pub use buckets::{AggregationBuckets, Bucket, DistrictBuckets, aggregate};
pub use fallback::fallback_documents;
pub use filter::{
    RejectionReason, ValidatedListing, classify_rejection_reason, is_valid_residential, validate,
};
pub use render::{generic_description, render_district_documents, summarize_run};
pub use rules::{CategoryRule, KeywordCategory, NumericRanges, ValidityRules};
