//! Static seed documents used when live collection produces nothing.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use ub_realty_property_models::DistrictDocument;

/// `(district, overall, 2-room, 3-room, description)` with prices in
/// tugrik per m².
const SEED_DISTRICTS: &[(&str, f64, f64, f64, &str)] = &[
    (
        "Хан-Уул",
        4_000_000.0,
        4_100_000.0,
        3_900_000.0,
        "Хан-Уул дүүрэг нь баруун урд байрладаг, үнэ өндөр дүүрэг.",
    ),
    (
        "Баянгол",
        3_500_000.0,
        3_600_000.0,
        3_400_000.0,
        "Баянгол дүүрэг нь төвтэй ойр, дундаж үнэтэй дүүрэг.",
    ),
    (
        "Сүхбаатар",
        4_500_000.0,
        4_600_000.0,
        4_400_000.0,
        "Сүхбаатар дүүрэг нь хамгийн үнэтэй, төвийн дүүрэг.",
    ),
    (
        "Чингэлтэй",
        3_800_000.0,
        3_900_000.0,
        3_700_000.0,
        "Чингэлтэй дүүрэг нь төв хэсэгтэй ойр байрладаг.",
    ),
    (
        "Баянзүрх",
        3_200_000.0,
        3_300_000.0,
        3_100_000.0,
        "Баянзүрх дүүрэг нь хамгийн том, дундаж үнэтэй дүүрэг.",
    ),
    (
        "Сонгинохайрхан",
        2_800_000.0,
        2_900_000.0,
        2_700_000.0,
        "Сонгинохайрхан дүүрэг нь баруун хэсэгт байрладаг том дүүрэг.",
    ),
];

/// The six seed district documents. They carry no samples.
#[must_use]
pub fn fallback_documents(generated_at: DateTime<Utc>) -> Vec<DistrictDocument> {
    SEED_DISTRICTS
        .iter()
        .map(
            |(name, overall, two_rooms, three_rooms, description)| DistrictDocument {
                district_name: (*name).to_string(),
                overall_average_price_per_sqm: *overall,
                per_room_count_averages: BTreeMap::from([(2, *two_rooms), (3, *three_rooms)]),
                per_room_sample_counts: BTreeMap::new(),
                sample_count: 0,
                generated_at,
                description: (*description).to_string(),
            },
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use ub_realty_property_models::DistrictSummary;

    use super::*;

    #[test]
    fn six_documents_with_positive_averages() {
        let documents = fallback_documents(Utc::now());
        assert_eq!(documents.len(), 6);

        for document in &documents {
            let summary = DistrictSummary::parse(&document.render_text()).unwrap();
            assert_eq!(summary.name, document.district_name);
            assert!(summary.overall_average > 0.0);
            assert!(summary.room_average(2).unwrap() > 0.0);
            assert!(summary.room_average(3).unwrap() > 0.0);
        }

        let names: Vec<&str> = documents.iter().map(|d| d.district_name.as_str()).collect();
        assert_eq!(
            names,
            ["Хан-Уул", "Баянгол", "Сүхбаатар", "Чингэлтэй", "Баянзүрх", "Сонгинохайрхан"]
        );
    }
}
