//! Rough multiplier-based price estimate for a district.

use ub_realty_property_models::document::group_thousands;

use crate::config::RetrievalConfig;

/// Typical apartment sizes quoted in the estimate, in m².
const TYPICAL_AREAS: [f64; 2] = [55.0, 75.0];

/// Factor used for districts missing from the configuration.
const GENERIC_FACTOR: f64 = 1.0;

/// Estimated price per m² for a district: the configured base price times
/// the district's factor.
#[must_use]
pub fn estimated_price_per_sqm(config: &RetrievalConfig, district: &str) -> f64 {
    let factor = config
        .district(district)
        .map_or(GENERIC_FACTOR, |d| d.price_factor);
    config.estimate_base_price_per_sqm * factor
}

/// Human-readable estimate for a district. Deterministic; used only when
/// no collected data is available.
#[must_use]
pub fn estimate_price_for_district(config: &RetrievalConfig, district: &str) -> String {
    let name = config
        .district(district)
        .map_or_else(|| district.trim().to_string(), |d| d.name.clone());
    let per_sqm = estimated_price_per_sqm(config, district);

    let typical = TYPICAL_AREAS
        .iter()
        .map(|area| {
            format!(
                "{area:.0} м² байр: ойролцоогоор {} төгрөг",
                group_thousands(per_sqm * area)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{name} дүүргийн 1м2 үнийн тооцоолол: {} төгрөг\n{typical}\nЭнэ нь бодит зарын мэдээлэлд үндэслээгүй ойролцоо тооцоо юм.",
        group_thousands(per_sqm)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_district_factor() {
        let config = RetrievalConfig::embedded();
        let value = estimated_price_per_sqm(&config, "Сүхбаатар");
        assert!((value - 4_500_000.0).abs() < 1e-6);

        let text = estimate_price_for_district(&config, "сүхбаатар");
        assert!(text.starts_with("Сүхбаатар дүүргийн 1м2 үнийн тооцоолол: 4 500 000 төгрөг"));
        assert!(text.contains("55 м² байр: ойролцоогоор 247 500 000 төгрөг"));
        assert!(text.contains("75 м² байр: ойролцоогоор 337 500 000 төгрөг"));
    }

    #[test]
    fn unknown_district_uses_generic_factor() {
        let config = RetrievalConfig::embedded();
        let value = estimated_price_per_sqm(&config, "Дархан");
        assert!((value - 3_000_000.0).abs() < 1e-6);
        assert!(estimate_price_for_district(&config, " Дархан ").starts_with("Дархан дүүргийн"));
    }

    #[test]
    fn is_deterministic() {
        let config = RetrievalConfig::embedded();
        assert_eq!(
            estimate_price_for_district(&config, "Налайх"),
            estimate_price_for_district(&config, "Налайх")
        );
    }
}
