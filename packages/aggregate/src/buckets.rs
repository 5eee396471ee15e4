//! Running per-district price statistics for one collection run.

use std::collections::BTreeMap;

use ub_realty_property_models::PropertyRecord;

use crate::filter::ValidatedListing;

/// Sum and count of price-per-m² observations.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bucket {
    pub total_price_per_sqm: f64,
    pub count: u64,
}

impl Bucket {
    fn add(&mut self, price_per_sqm: f64) {
        self.total_price_per_sqm += price_per_sqm;
        self.count += 1;
    }

    /// Mean price per m², or `None` for an empty bucket.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average(&self) -> Option<f64> {
        if self.count > 0 {
            Some(self.total_price_per_sqm / self.count as f64)
        } else {
            None
        }
    }
}

/// Buckets for one district: an overall bucket plus one per room count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistrictBuckets {
    pub overall: Bucket,
    pub by_rooms: BTreeMap<u32, Bucket>,
}

impl DistrictBuckets {
    fn add(&mut self, room_count: u32, price_per_sqm: f64) {
        self.overall.add(price_per_sqm);
        self.by_rooms.entry(room_count).or_default().add(price_per_sqm);
    }

    /// Number of observations for the given room count.
    #[must_use]
    pub fn room_count_samples(&self, room_count: u32) -> u64 {
        self.by_rooms.get(&room_count).map_or(0, |bucket| bucket.count)
    }
}

/// All buckets of one run, keyed by district name. Owned by the run that
/// fills it; nothing is carried between runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationBuckets {
    districts: BTreeMap<String, DistrictBuckets>,
}

impl AggregationBuckets {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a validated listing to its district's overall and room-count
    /// buckets.
    pub fn add(&mut self, listing: &ValidatedListing) {
        self.districts
            .entry(listing.district.clone())
            .or_default()
            .add(listing.room_count, listing.price_per_sqm);
    }

    /// Buckets of one district.
    #[must_use]
    pub fn district(&self, name: &str) -> Option<&DistrictBuckets> {
        self.districts.get(name)
    }

    /// Iterates districts in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DistrictBuckets)> {
        self.districts.iter().map(|(name, buckets)| (name.as_str(), buckets))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.districts.values().all(|d| d.overall.count == 0)
    }

    /// Total observations across all districts.
    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.districts.values().map(|d| d.overall.count).sum()
    }
}

/// Adds a record's price per m² to the buckets.
///
/// The record must already have passed the validity filter. Records
/// missing a district, room count or price per m² are skipped. Returns
/// whether the record was added.
pub fn aggregate(record: &PropertyRecord, buckets: &mut AggregationBuckets) -> bool {
    let (Some(district), Some(room_count), Some(price_per_sqm), Some(area_sqm)) = (
        record.aggregation_district(),
        record.room_count,
        record.price_per_sqm,
        record.area_sqm,
    ) else {
        log::debug!(
            "Skipping aggregation, missing data: district={:?} rooms={:?} price/m2={:?}",
            record.aggregation_district(),
            record.room_count,
            record.price_per_sqm,
        );
        return false;
    };

    buckets.add(&ValidatedListing {
        district: district.to_string(),
        room_count,
        area_sqm,
        price_per_sqm,
    });
    log::debug!("Aggregated {district}: {room_count} rooms at {price_per_sqm:.0} ₮/m²");
    true
}
