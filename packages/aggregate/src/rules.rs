//! Keyword lists and numeric bounds for the validity filter.
//!
//! The defaults live in `rules/validity.toml`, baked into the binary at
//! compile time via [`include_str!`]. A runtime configuration file may
//! supply a complete replacement table.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Default rules, embedded at compile time.
const VALIDITY_TOML: &str = include_str!("../rules/validity.toml");

/// Keyword marking that a listing title talks about rooms.
pub const ROOMS_KEYWORD: &str = "өрөө";

/// Property kinds recognized from title keywords.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum KeywordCategory {
    ParkingGarage,
    Land,
    House,
    WarehouseFactory,
    OfficeBuilding,
    ShopService,
    CommercialProperty,
}

/// A diagnostic keyword group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    /// Category reported when the group matches.
    pub reason: KeywordCategory,
    /// Lowercase title substrings.
    pub keywords: Vec<String>,
    /// Skip this group when the title mentions rooms.
    #[serde(default)]
    pub unless_rooms_mentioned: bool,
}

impl CategoryRule {
    /// Whether this group applies to an already lowercased title.
    #[must_use]
    pub fn matches(&self, title: &str) -> bool {
        if self.unless_rooms_mentioned && title.contains(ROOMS_KEYWORD) {
            return false;
        }
        contains_any(title, &self.keywords)
    }
}

/// Numeric acceptance bounds. All bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericRanges {
    pub min_area_sqm: f64,
    pub max_area_sqm: f64,
    pub min_price_per_sqm: f64,
    pub max_price_per_sqm: f64,
    pub max_rooms: u32,
}

impl Default for NumericRanges {
    fn default() -> Self {
        Self {
            min_area_sqm: 15.0,
            max_area_sqm: 500.0,
            min_price_per_sqm: 500_000.0,
            max_price_per_sqm: 20_000_000.0,
            max_rooms: 10,
        }
    }
}

/// Everything the validity filter and the rejection classifier consult.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidityRules {
    /// Any match rejects the listing.
    pub definite_exclusions: Vec<String>,
    /// Any match marks the listing as an apartment.
    pub apartment_indicators: Vec<String>,
    /// Rejected unless an apartment indicator is present.
    pub house_indicators: Vec<String>,
    /// Rejected unless an apartment indicator is present.
    pub commercial_indicators: Vec<String>,
    #[serde(default)]
    pub ranges: NumericRanges,
    /// Diagnostic groups for [`crate::classify_rejection_reason`], in order.
    #[serde(default)]
    pub categories: Vec<CategoryRule>,
}

impl ValidityRules {
    /// Parses rules from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or a required list is
    /// missing.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// The rules shipped with the crate.
    ///
    /// # Panics
    ///
    /// Panics if the embedded `validity.toml` is malformed (this is a
    /// compile-time guarantee since the file is embedded).
    #[must_use]
    pub fn embedded() -> Self {
        Self::from_toml(VALIDITY_TOML)
            .unwrap_or_else(|e| panic!("Failed to parse validity.toml: {e}"))
    }
}

impl Default for ValidityRules {
    fn default() -> Self {
        Self::embedded()
    }
}

/// Whether `haystack` contains any of `needles`.
pub(crate) fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle.as_str()))
}
