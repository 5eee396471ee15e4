#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Property listing records and district document types.
//!
//! A [`PropertyRecord`] is produced once per scraped listing and never
//! mutated afterwards. District-level price summaries are represented by
//! [`DistrictDocument`], whose text rendering is a stable, label-anchored
//! grammar that downstream consumers re-parse via [`DistrictSummary`].

pub mod document;
pub mod summary;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

pub use document::{DistrictDocument, format_tugrik};
pub use summary::DistrictSummary;

/// Separator between the city and the district in a listing location
/// string (e.g. `"УБ — Сүхбаатар, 100 айл"`).
pub const LOCATION_SEPARATOR: char = '—';

/// A single scraped listing.
///
/// Fields that could not be found in the markup are `None`. The
/// `price_per_sqm` field is derived and kept consistent by the builder
/// methods: it is `Some` iff both `price_numeric` and a positive
/// `area_sqm` are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    /// Listing page URL.
    pub url: Option<String>,
    /// Listing headline.
    pub title: Option<String>,
    /// Raw location text (e.g. `"УБ — Хан-Уул, 19-р хороолол"`).
    pub full_location: Option<String>,
    /// District parsed out of [`Self::full_location`].
    pub district: Option<String>,
    /// Configured district the listing was collected under.
    pub scraped_district: Option<String>,
    /// Price text exactly as found on the page.
    pub price_raw: Option<String>,
    /// Total asking price in tugrik.
    pub price_numeric: Option<f64>,
    /// Floor area in square metres.
    pub area_sqm: Option<f64>,
    /// Number of rooms.
    pub room_count: Option<u32>,
    /// `price_numeric / area_sqm`.
    pub price_per_sqm: Option<f64>,
    /// Labelled technical attributes from the detail page.
    #[serde(flatten)]
    pub characteristics: Characteristics,
    /// Free-text listing description.
    pub description: Option<String>,
    /// Publish date text.
    pub published_date: Option<String>,
    /// Marketplace ad identifier.
    pub ad_number: Option<String>,
    /// Number of views reported by the marketplace.
    pub view_count: Option<u64>,
}

impl PropertyRecord {
    /// Creates an empty record for the given title.
    #[must_use]
    pub fn new(title: Option<String>) -> Self {
        Self {
            title,
            ..Self::default()
        }
    }

    /// Sets the listing URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the raw location and derives [`Self::district`] from it.
    #[must_use]
    pub fn with_location(mut self, full_location: Option<String>) -> Self {
        self.district = full_location.as_deref().and_then(district_from_location);
        self.full_location = full_location;
        self
    }

    /// Sets the configured district this listing was collected under.
    #[must_use]
    pub fn with_scraped_district(mut self, district: impl Into<String>) -> Self {
        self.scraped_district = Some(district.into());
        self
    }

    /// Sets the raw and parsed price and recomputes the price per m².
    #[must_use]
    pub fn with_price(mut self, raw: Option<String>, numeric: Option<f64>) -> Self {
        self.price_raw = raw;
        self.price_numeric = numeric;
        self.recompute_price_per_sqm();
        self
    }

    /// Sets area and room count and recomputes the price per m².
    #[must_use]
    pub fn with_area_and_rooms(mut self, area_sqm: Option<f64>, room_count: Option<u32>) -> Self {
        self.area_sqm = area_sqm;
        self.room_count = room_count;
        self.recompute_price_per_sqm();
        self
    }

    /// Sets the labelled characteristics.
    #[must_use]
    pub fn with_characteristics(mut self, characteristics: Characteristics) -> Self {
        self.characteristics = characteristics;
        self
    }

    /// Title lowercased for keyword matching. Empty when absent.
    #[must_use]
    pub fn title_lowercase(&self) -> String {
        self.title.as_deref().unwrap_or_default().to_lowercase()
    }

    /// The district used as aggregation key: the configured district when
    /// the listing was collected under one, otherwise the parsed district.
    #[must_use]
    pub fn aggregation_district(&self) -> Option<&str> {
        self.scraped_district
            .as_deref()
            .or(self.district.as_deref())
            .filter(|d| !d.is_empty())
    }

    /// Whether every field required for aggregation is present.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.title.is_some()
            && self.price_per_sqm.is_some()
            && self.area_sqm.is_some()
            && self.room_count.is_some()
    }

    fn recompute_price_per_sqm(&mut self) {
        self.price_per_sqm = price_per_sqm(self.price_numeric, self.area_sqm);
    }
}

/// Computes the price per m² when both inputs are present and the area is
/// positive.
#[must_use]
pub fn price_per_sqm(price: Option<f64>, area_sqm: Option<f64>) -> Option<f64> {
    match (price, area_sqm) {
        (Some(price), Some(area)) if area > 0.0 && price > 0.0 => Some(price / area),
        _ => None,
    }
}

/// Extracts the district from a location string of the form
/// `"УБ — Сүхбаатар, 100 айл"`.
///
/// Takes the segment after the first [`LOCATION_SEPARATOR`] and trims it at
/// the first comma.
#[must_use]
pub fn district_from_location(location: &str) -> Option<String> {
    let (_, after) = location.split_once(LOCATION_SEPARATOR)?;
    let district = after.split(',').next()?.trim();
    if district.is_empty() {
        None
    } else {
        Some(district.to_string())
    }
}

/// Result of looking up a single listing by URL.
///
/// Serializes as the flat record on success and as `{url, error}` on
/// failure. `Failed` is declared first so that untagged deserialization
/// only picks it when an `error` field is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyLookup {
    /// Fetching or parsing failed.
    Failed {
        /// The requested URL.
        url: String,
        /// Human-readable failure description.
        error: String,
    },
    /// The listing was fetched and parsed.
    Found(Box<PropertyRecord>),
}

impl PropertyLookup {
    /// Creates a failed lookup.
    #[must_use]
    pub fn failed(url: &str, error: impl Into<String>) -> Self {
        Self::Failed {
            url: url.to_string(),
            error: error.into(),
        }
    }

    /// Returns the record if the lookup succeeded.
    #[must_use]
    pub fn record(&self) -> Option<&PropertyRecord> {
        match self {
            Self::Found(record) => Some(record),
            Self::Failed { .. } => None,
        }
    }

    /// Returns the error message if the lookup failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Found(_) => None,
            Self::Failed { error, .. } => Some(error),
        }
    }
}

/// Keys of the labelled characteristics list on a listing detail page.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CharacteristicKey {
    Floor,
    Balcony,
    YearBuilt,
    Garage,
    WindowType,
    BuildingFloors,
    DoorType,
    Area,
    FloorNumber,
    PaymentTerms,
    WindowCount,
    ConstructionStatus,
    HasElevator,
    Rooms,
}

impl CharacteristicKey {
    /// The Mongolian label used for this characteristic on the marketplace.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Floor => "Шал",
            Self::Balcony => "Тагт",
            Self::YearBuilt => "Ашиглалтанд орсон он",
            Self::Garage => "Гараж",
            Self::WindowType => "Цонх",
            Self::BuildingFloors => "Барилгын давхар",
            Self::DoorType => "Хаалга",
            Self::Area => "Талбай",
            Self::FloorNumber => "Хэдэн давхарт",
            Self::PaymentTerms => "Төлбөрийн нөхцөл",
            Self::WindowCount => "Цонхны тоо",
            Self::ConstructionStatus => "Барилгын явц",
            Self::HasElevator => "Цахилгаан шаттай эсэх",
            Self::Rooms => "Өрөөний тоо",
        }
    }
}

/// Labelled technical attributes of a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Characteristics {
    pub floor: Option<String>,
    pub balcony: Option<String>,
    pub year_built: Option<String>,
    pub garage: Option<String>,
    pub window_type: Option<String>,
    pub building_floors: Option<String>,
    pub door_type: Option<String>,
    pub area: Option<String>,
    pub floor_number: Option<String>,
    pub payment_terms: Option<String>,
    pub window_count: Option<String>,
    pub construction_status: Option<String>,
    pub has_elevator: Option<String>,
    pub rooms: Option<String>,
}

impl Characteristics {
    /// Stores a value under the given key, replacing any previous value.
    pub fn set(&mut self, key: CharacteristicKey, value: String) {
        *self.slot(key) = Some(value);
    }

    /// Returns the value stored under the given key.
    #[must_use]
    pub fn get(&self, key: CharacteristicKey) -> Option<&str> {
        match key {
            CharacteristicKey::Floor => self.floor.as_deref(),
            CharacteristicKey::Balcony => self.balcony.as_deref(),
            CharacteristicKey::YearBuilt => self.year_built.as_deref(),
            CharacteristicKey::Garage => self.garage.as_deref(),
            CharacteristicKey::WindowType => self.window_type.as_deref(),
            CharacteristicKey::BuildingFloors => self.building_floors.as_deref(),
            CharacteristicKey::DoorType => self.door_type.as_deref(),
            CharacteristicKey::Area => self.area.as_deref(),
            CharacteristicKey::FloorNumber => self.floor_number.as_deref(),
            CharacteristicKey::PaymentTerms => self.payment_terms.as_deref(),
            CharacteristicKey::WindowCount => self.window_count.as_deref(),
            CharacteristicKey::ConstructionStatus => self.construction_status.as_deref(),
            CharacteristicKey::HasElevator => self.has_elevator.as_deref(),
            CharacteristicKey::Rooms => self.rooms.as_deref(),
        }
    }

    fn slot(&mut self, key: CharacteristicKey) -> &mut Option<String> {
        match key {
            CharacteristicKey::Floor => &mut self.floor,
            CharacteristicKey::Balcony => &mut self.balcony,
            CharacteristicKey::YearBuilt => &mut self.year_built,
            CharacteristicKey::Garage => &mut self.garage,
            CharacteristicKey::WindowType => &mut self.window_type,
            CharacteristicKey::BuildingFloors => &mut self.building_floors,
            CharacteristicKey::DoorType => &mut self.door_type,
            CharacteristicKey::Area => &mut self.area,
            CharacteristicKey::FloorNumber => &mut self.floor_number,
            CharacteristicKey::PaymentTerms => &mut self.payment_terms,
            CharacteristicKey::WindowCount => &mut self.window_count,
            CharacteristicKey::ConstructionStatus => &mut self.construction_status,
            CharacteristicKey::HasElevator => &mut self.has_elevator,
            CharacteristicKey::Rooms => &mut self.rooms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_per_sqm_requires_positive_area() {
        assert_eq!(price_per_sqm(Some(100_000_000.0), Some(0.0)), None);
        assert_eq!(price_per_sqm(None, Some(50.0)), None);
        assert_eq!(price_per_sqm(Some(100_000_000.0), None), None);
        let value = price_per_sqm(Some(165_000_000.0), Some(55.0)).unwrap();
        assert!((value - 3_000_000.0).abs() < 1e-6);
    }

    #[test]
    fn builder_keeps_price_per_sqm_consistent() {
        let record = PropertyRecord::new(Some("2 өрөө".to_string()))
            .with_price(Some("150 сая ₮".to_string()), Some(150_000_000.0))
            .with_area_and_rooms(Some(60.0), Some(2));
        let ppsqm = record.price_per_sqm.unwrap();
        assert!((ppsqm - 2_500_000.0).abs() < 1e-6);

        let without_area = record.with_area_and_rooms(None, Some(2));
        assert!(without_area.price_per_sqm.is_none());
    }

    #[test]
    fn parses_district_from_location() {
        assert_eq!(
            district_from_location("УБ — Сүхбаатар, 100 айл").as_deref(),
            Some("Сүхбаатар")
        );
        assert_eq!(
            district_from_location("УБ — Хан-Уул").as_deref(),
            Some("Хан-Уул")
        );
        assert_eq!(district_from_location("Улаанбаатар"), None);
        assert_eq!(district_from_location("УБ — , 3-р хороо"), None);
    }

    #[test]
    fn scraped_district_takes_precedence() {
        let record = PropertyRecord::new(None)
            .with_location(Some("УБ — Баянгол, 3-р хороо".to_string()))
            .with_scraped_district("Хан-Уул");
        assert_eq!(record.district.as_deref(), Some("Баянгол"));
        assert_eq!(record.aggregation_district(), Some("Хан-Уул"));
    }

    #[test]
    fn failed_lookup_serializes_flat() {
        let lookup = PropertyLookup::failed("https://example.com/a", "boom");
        let json = serde_json::to_value(&lookup).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"url": "https://example.com/a", "error": "boom"})
        );
    }

    #[test]
    fn record_serializes_characteristics_flat() {
        let mut characteristics = Characteristics::default();
        characteristics.set(CharacteristicKey::YearBuilt, "2015".to_string());
        let record = PropertyRecord::new(Some("x".to_string())).with_characteristics(characteristics);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["year_built"], "2015");
        assert!(json["price_per_sqm"].is_null());
    }
}
