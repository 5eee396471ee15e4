//! Residential apartment validity filter and rejection diagnostics.

use std::fmt;

use ub_realty_property_models::PropertyRecord;

use crate::rules::{KeywordCategory, ValidityRules, contains_any};

/// Why a listing was left out of the aggregation.
///
/// Diagnostic only; the filter decision itself is
/// [`is_valid_residential`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RejectionReason {
    /// The title matched a diagnostic keyword group.
    Category(KeywordCategory),
    NoTitle,
    NoRoomCount,
    NoArea,
    NoPricePerSqm,
    NoDistrict,
    PriceTooLow(f64),
    PriceTooHigh(f64),
    AreaTooSmall(f64),
    AreaTooLarge(f64),
    TooManyRooms(u32),
    /// Rejected by a keyword rule that has no diagnostic group.
    Other,
}

impl RejectionReason {
    /// The reason without its measured value, e.g. `"price too low"`.
    /// Used as a counter key.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Category(category) => match category {
                KeywordCategory::ParkingGarage => "parking/garage",
                KeywordCategory::Land => "land",
                KeywordCategory::House => "house/compound",
                KeywordCategory::WarehouseFactory => "warehouse/factory",
                KeywordCategory::OfficeBuilding => "office/commercial building",
                KeywordCategory::ShopService => "shop/service",
                KeywordCategory::CommercialProperty => "commercial property",
            },
            Self::NoTitle => "no title",
            Self::NoRoomCount => "no room count",
            Self::NoArea => "no area data",
            Self::NoPricePerSqm => "no price per sqm",
            Self::NoDistrict => "no district",
            Self::PriceTooLow(_) => "price too low",
            Self::PriceTooHigh(_) => "price too high",
            Self::AreaTooSmall(_) => "area too small",
            Self::AreaTooLarge(_) => "area too large",
            Self::TooManyRooms(_) => "too many rooms",
            Self::Other => "other validation criteria",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.kind();
        match self {
            Self::PriceTooLow(value) | Self::PriceTooHigh(value) => {
                write!(f, "{kind} ({value:.0} ₮/m²)")
            }
            Self::AreaTooSmall(value) | Self::AreaTooLarge(value) => write!(f, "{kind} ({value} m²)"),
            Self::TooManyRooms(value) => write!(f, "{kind} ({value})"),
            _ => f.write_str(kind),
        }
    }
}

/// A record that passed the filter, with every aggregation field present.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedListing {
    pub district: String,
    pub room_count: u32,
    pub area_sqm: f64,
    pub price_per_sqm: f64,
}

/// Whether the record is a residential apartment with plausible numbers.
///
/// Checks, in order: room count within `1..=max_rooms`, no definite
/// exclusion keyword, no house or commercial keyword unless an apartment
/// indicator is present, area within bounds, price per m² positive and
/// within bounds.
#[must_use]
pub fn is_valid_residential(record: &PropertyRecord, rules: &ValidityRules) -> bool {
    let title = record.title_lowercase();
    let ranges = &rules.ranges;

    match record.room_count {
        Some(rooms) if (1..=ranges.max_rooms).contains(&rooms) => {}
        rooms => {
            log::debug!("Invalid room count {rooms:?} for '{title}'");
            return false;
        }
    }

    if contains_any(&title, &rules.definite_exclusions) {
        log::debug!("Excluded by keyword: '{title}'");
        return false;
    }

    if !contains_any(&title, &rules.apartment_indicators) {
        if contains_any(&title, &rules.house_indicators) {
            log::debug!("Excluded house: '{title}'");
            return false;
        }
        if contains_any(&title, &rules.commercial_indicators) {
            log::debug!("Excluded commercial property: '{title}'");
            return false;
        }
    }

    match record.area_sqm {
        Some(area) if (ranges.min_area_sqm..=ranges.max_area_sqm).contains(&area) => {}
        area => {
            log::debug!("Invalid area {area:?} for '{title}'");
            return false;
        }
    }

    match record.price_per_sqm {
        Some(price)
            if price > 0.0
                && (ranges.min_price_per_sqm..=ranges.max_price_per_sqm).contains(&price) => {}
        price => {
            log::debug!("Price per m² {price:?} out of range for '{title}'");
            return false;
        }
    }

    true
}

/// Runs the filter and, on success, returns the fields the aggregator
/// needs.
///
/// # Errors
///
/// Returns the diagnostic [`RejectionReason`] when the record is rejected
/// or lacks a title or a district to aggregate under.
pub fn validate(
    record: &PropertyRecord,
    rules: &ValidityRules,
) -> Result<ValidatedListing, RejectionReason> {
    if !is_valid_residential(record, rules) {
        return Err(classify_rejection_reason(record, rules));
    }
    if !record.is_complete() {
        return Err(RejectionReason::NoTitle);
    }

    let district = record
        .aggregation_district()
        .ok_or(RejectionReason::NoDistrict)?;

    match (record.room_count, record.area_sqm, record.price_per_sqm) {
        (Some(room_count), Some(area_sqm), Some(price_per_sqm)) => Ok(ValidatedListing {
            district: district.to_string(),
            room_count,
            area_sqm,
            price_per_sqm,
        }),
        _ => Err(RejectionReason::Other),
    }
}

/// Labels the most likely reason a record was rejected.
///
/// Keyword groups are checked first, then missing fields, then numeric
/// bounds.
#[must_use]
pub fn classify_rejection_reason(record: &PropertyRecord, rules: &ValidityRules) -> RejectionReason {
    let title = record.title_lowercase();
    let ranges = &rules.ranges;

    if let Some(rule) = rules.categories.iter().find(|rule| rule.matches(&title)) {
        return RejectionReason::Category(rule.reason);
    }

    let Some(rooms) = record.room_count.filter(|rooms| *rooms >= 1) else {
        return RejectionReason::NoRoomCount;
    };
    let Some(area) = record.area_sqm else {
        return RejectionReason::NoArea;
    };
    let Some(price) = record.price_per_sqm.filter(|price| *price > 0.0) else {
        return RejectionReason::NoPricePerSqm;
    };

    if price < ranges.min_price_per_sqm {
        RejectionReason::PriceTooLow(price)
    } else if price > ranges.max_price_per_sqm {
        RejectionReason::PriceTooHigh(price)
    } else if area < ranges.min_area_sqm {
        RejectionReason::AreaTooSmall(area)
    } else if area > ranges.max_area_sqm {
        RejectionReason::AreaTooLarge(area)
    } else if rooms > ranges.max_rooms {
        RejectionReason::TooManyRooms(rooms)
    } else {
        RejectionReason::Other
    }
}
