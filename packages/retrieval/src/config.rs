//! Collection configuration.
//!
//! The default configuration lives in `config/unegui.toml`, baked into the
//! binary at compile time via [`include_str!`]. A runtime file with the
//! same layout can replace it.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use ub_realty_aggregate::ValidityRules;

/// Default configuration, embedded at compile time.
const UNEGUI_TOML: &str = include_str!("../config/unegui.toml");

/// Errors that can occur while loading a runtime configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML for this layout.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The file parsed but its values are unusable.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// One district to collect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictConfig {
    /// Display name, also the aggregation key.
    pub name: String,
    /// Path appended to the base listing URL, including its query string.
    pub path: String,
    /// Free-text description rendered into the district document.
    #[serde(default)]
    pub description: Option<String>,
    /// Multiplier over the base price used by the estimator.
    #[serde(default = "default_price_factor")]
    pub price_factor: f64,
}

const fn default_price_factor() -> f64 {
    1.0
}

/// Everything the orchestrator needs to run a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Listing index URL; district paths are appended to it.
    pub base_listing_url: String,
    /// Host accepted by single-listing lookups.
    pub marketplace_host: String,
    /// Pages fetched per district.
    pub max_pages_per_district: u32,
    /// Listings extracted per page.
    pub listings_per_page: usize,
    /// Pause between consecutive page fetches.
    pub request_delay_ms: u64,
    /// Per-request timeout.
    pub request_timeout_secs: u64,
    /// Base price per m² for the estimator.
    pub estimate_base_price_per_sqm: f64,
    /// Districts in collection order.
    pub districts: Vec<DistrictConfig>,
    /// Replacement validity rules; the embedded rules are used when absent.
    #[serde(default)]
    pub validity: Option<ValidityRules>,
}

impl RetrievalConfig {
    /// Parses and validates a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the TOML is malformed or a value is
    /// unusable (no districts, zero pages, zero listings per page).
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.check()?;
        Ok(config)
    }

    /// Loads a runtime configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        log::info!("Loading configuration from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// The configuration shipped with the crate.
    ///
    /// # Panics
    ///
    /// Panics if the embedded `unegui.toml` is malformed (this is a
    /// compile-time guarantee since the file is embedded).
    #[must_use]
    pub fn embedded() -> Self {
        Self::from_toml(UNEGUI_TOML).unwrap_or_else(|e| panic!("Failed to parse unegui.toml: {e}"))
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.districts.is_empty() {
            return Err(ConfigError::Invalid("no districts configured".to_string()));
        }
        if self.max_pages_per_district == 0 {
            return Err(ConfigError::Invalid(
                "max_pages_per_district must be at least 1".to_string(),
            ));
        }
        if self.listings_per_page == 0 {
            return Err(ConfigError::Invalid(
                "listings_per_page must be at least 1".to_string(),
            ));
        }
        if let Some(district) = self.districts.iter().find(|d| d.name.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "district with path '{}' has an empty name",
                district.path
            )));
        }
        Ok(())
    }

    /// URL of one page of a district's listing index. Page 1 is the bare
    /// district URL; later pages append `&page=N`.
    #[must_use]
    pub fn page_url(&self, district: &DistrictConfig, page: u32) -> String {
        let url = format!("{}{}", self.base_listing_url, district.path);
        if page > 1 {
            let separator = if url.contains('?') { '&' } else { '?' };
            format!("{url}{separator}page={page}")
        } else {
            url
        }
    }

    /// District descriptions keyed by district name.
    #[must_use]
    pub fn descriptions(&self) -> BTreeMap<String, String> {
        self.districts
            .iter()
            .filter_map(|d| d.description.clone().map(|text| (d.name.clone(), text)))
            .collect()
    }

    /// Looks up a district by name, ignoring case and surrounding
    /// whitespace.
    #[must_use]
    pub fn district(&self, name: &str) -> Option<&DistrictConfig> {
        let wanted = name.trim().to_lowercase();
        self.districts
            .iter()
            .find(|d| d.name.to_lowercase() == wanted)
    }

    /// The validity rules in effect.
    #[must_use]
    pub fn validity_rules(&self) -> ValidityRules {
        self.validity.clone().unwrap_or_else(ValidityRules::embedded)
    }

    #[must_use]
    pub const fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self::embedded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_config_parses() {
        let config = RetrievalConfig::embedded();
        assert_eq!(config.marketplace_host, "unegui.mn");
        assert_eq!(config.districts.len(), 9);
        assert_eq!(config.districts[0].name, "Баянзүрх");
        assert!(config.validity.is_none());
        assert_eq!(config.descriptions().len(), 9);
    }

    #[test]
    fn builds_page_urls() {
        let config = RetrievalConfig::embedded();
        let district = config.district("хан-уул").unwrap();
        assert_eq!(
            config.page_url(district, 1),
            "https://www.unegui.mn/l-hdlh/l-hdlh-zarna/oron-suuts-zarna/ub-hanuul/?type_view=line"
        );
        assert_eq!(
            config.page_url(district, 3),
            "https://www.unegui.mn/l-hdlh/l-hdlh-zarna/oron-suuts-zarna/ub-hanuul/?type_view=line&page=3"
        );
    }

    #[test]
    fn rejects_unusable_values() {
        let toml = r#"
            base_listing_url = "https://example.com/"
            marketplace_host = "example.com"
            max_pages_per_district = 0
            listings_per_page = 5
            request_delay_ms = 0
            request_timeout_secs = 5
            estimate_base_price_per_sqm = 1.0
            [[districts]]
            name = "A"
            path = "a/"
        "#;
        assert!(matches!(
            RetrievalConfig::from_toml(toml),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            RetrievalConfig::from_toml("base_listing_url = 1"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn validity_override_replaces_embedded_rules() {
        let toml = r#"
            base_listing_url = "https://example.com/"
            marketplace_host = "example.com"
            max_pages_per_district = 1
            listings_per_page = 5
            request_delay_ms = 0
            request_timeout_secs = 5
            estimate_base_price_per_sqm = 1.0
            [[districts]]
            name = "A"
            path = "a/"
            [validity]
            definite_exclusions = ["x"]
            apartment_indicators = []
            house_indicators = []
            commercial_indicators = []
            [validity.ranges]
            min_area_sqm = 1.0
            max_area_sqm = 2.0
            min_price_per_sqm = 1.0
            max_price_per_sqm = 2.0
            max_rooms = 3
        "#;
        let config = RetrievalConfig::from_toml(toml).unwrap();
        let rules = config.validity_rules();
        assert_eq!(rules.definite_exclusions, vec!["x".to_string()]);
        assert_eq!(rules.ranges.max_rooms, 3);
        assert!((config.districts[0].price_factor - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let path = std::env::temp_dir().join("ub_realty_missing_config.toml");
        assert!(matches!(
            RetrievalConfig::load(&path),
            Err(ConfigError::Io(_))
        ));
    }
}
