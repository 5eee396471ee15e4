//! Rendering of filled buckets into district documents.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use ub_realty_property_models::DistrictDocument;

use crate::buckets::AggregationBuckets;

/// Description used for a district missing from the description table.
#[must_use]
pub fn generic_description(district: &str) -> String {
    format!("{district} дүүргийн тухай нэмэлт мэдээлэл байхгүй.")
}

/// Builds one document per district with at least one observation.
///
/// Averages are computed only for non-empty buckets. `descriptions` maps
/// district names to their free-text description. Returns an empty vector
/// when no district produced data; the caller decides on a fallback.
#[must_use]
pub fn render_district_documents(
    buckets: &AggregationBuckets,
    descriptions: &BTreeMap<String, String>,
    generated_at: DateTime<Utc>,
) -> Vec<DistrictDocument> {
    let documents: Vec<DistrictDocument> = buckets
        .iter()
        .filter_map(|(district, district_buckets)| {
            let overall = district_buckets.overall.average()?;

            let mut per_room_count_averages = BTreeMap::new();
            let mut per_room_sample_counts = BTreeMap::new();
            for (rooms, bucket) in &district_buckets.by_rooms {
                if let Some(average) = bucket.average() {
                    per_room_count_averages.insert(*rooms, average);
                    per_room_sample_counts.insert(*rooms, bucket.count);
                }
            }

            Some(DistrictDocument {
                district_name: district.to_string(),
                overall_average_price_per_sqm: overall,
                per_room_count_averages,
                per_room_sample_counts,
                sample_count: district_buckets.overall.count,
                generated_at,
                description: descriptions
                    .get(district)
                    .cloned()
                    .unwrap_or_else(|| generic_description(district)),
            })
        })
        .collect();

    if documents.is_empty() {
        log::warn!("No data aggregated for any district");
    } else {
        log::debug!("Rendered {} district documents", documents.len());
    }

    documents
}

/// Logs a per-district summary of a finished run: listing counts, average
/// price per m² and the 2- and 3-room sample sizes.
pub fn summarize_run(buckets: &AggregationBuckets) {
    if buckets.is_empty() {
        log::warn!("No valid residential apartment data was collected");
        return;
    }

    let districts = buckets.iter().filter(|(_, d)| d.overall.count > 0).count();
    log::info!(
        "Collected {} residential apartments across {districts} districts",
        buckets.total_count()
    );

    for (district, district_buckets) in buckets.iter() {
        let Some(average) = district_buckets.overall.average() else {
            continue;
        };
        log::info!(
            "  {district}: {} apartments, avg {average:.0} ₮/m², 2-room: {}, 3-room: {}",
            district_buckets.overall.count,
            district_buckets.room_count_samples(2),
            district_buckets.room_count_samples(3),
        );
    }
}
