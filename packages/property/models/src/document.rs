//! District summary documents and their text grammar.
//!
//! The rendered text is consumed both by the knowledge store and by
//! external report builders, which locate values by the labels below. The
//! labels are therefore part of the public contract.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Label of the district name line.
pub const DISTRICT_LABEL: &str = "Дүүрэг:";
/// Label of the overall average line.
pub const OVERALL_LABEL: &str = "Нийт байрны 1м2 дундаж үнэ:";
/// Label suffix of a per-room-count average line (`"{k} өрөө ..."`).
pub const ROOM_LABEL_SUFFIX: &str = "өрөө байрны 1м2 дундаж үнэ:";
/// Label of the sample-count line.
pub const SAMPLE_LABEL: &str = "Цуглуулсан өгөгдөл:";
/// Label of the generation timestamp line.
pub const GENERATED_LABEL: &str = "Дата цуглуулсан огноо:";
/// Currency unit appended to rendered prices.
pub const CURRENCY_UNIT: &str = "төгрөг";
/// Placeholder for an average that has no samples.
pub const NO_DATA: &str = "мэдээлэл байхгүй";
/// Timestamp format of the generation line.
pub const GENERATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Aggregated pricing for one district.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictDocument {
    /// District display name.
    pub district_name: String,
    /// Mean price per m² across all accepted listings.
    pub overall_average_price_per_sqm: f64,
    /// Mean price per m² keyed by room count.
    pub per_room_count_averages: BTreeMap<u32, f64>,
    /// Number of accepted listings keyed by room count.
    pub per_room_sample_counts: BTreeMap<u32, u64>,
    /// Number of accepted listings.
    pub sample_count: u64,
    /// When the aggregation was rendered.
    pub generated_at: DateTime<Utc>,
    /// Free-text description of the district.
    pub description: String,
}

impl DistrictDocument {
    /// Renders the label-anchored text form of this document.
    #[must_use]
    pub fn render_text(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for DistrictDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{DISTRICT_LABEL} {}", self.district_name)?;
        writeln!(
            f,
            "{OVERALL_LABEL} {}",
            format_average(self.overall_average_price_per_sqm)
        )?;
        for (rooms, average) in &self.per_room_count_averages {
            writeln!(f, "{rooms} {ROOM_LABEL_SUFFIX} {}", format_average(*average))?;
        }
        writeln!(f, "{}", self.description)?;

        write!(f, "{SAMPLE_LABEL} {} орон сууц", self.sample_count)?;
        if !self.per_room_sample_counts.is_empty() {
            let parts: Vec<String> = self
                .per_room_sample_counts
                .iter()
                .map(|(rooms, count)| format!("{rooms} өрөө: {count}"))
                .collect();
            write!(f, " ({})", parts.join(", "))?;
        }
        writeln!(f)?;

        write!(
            f,
            "{GENERATED_LABEL} {}",
            self.generated_at.format(GENERATED_AT_FORMAT)
        )
    }
}

fn format_average(value: f64) -> String {
    if value > 0.0 {
        format_tugrik(value)
    } else {
        NO_DATA.to_string()
    }
}

/// Formats an amount as whole tugrik with space-separated thousands, e.g.
/// `3200000.4` → `"3 200 000 төгрөг"`.
#[must_use]
pub fn format_tugrik(value: f64) -> String {
    format!("{} {CURRENCY_UNIT}", group_thousands(value))
}

/// Rounds to a whole number and inserts a space between thousands groups.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn group_thousands(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }

    if rounded < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    fn sample_document() -> DistrictDocument {
        DistrictDocument {
            district_name: "Хан-Уул".to_string(),
            overall_average_price_per_sqm: 3_200_000.0,
            per_room_count_averages: BTreeMap::from([(3, 3_400_000.0), (2, 3_100_000.0)]),
            per_room_sample_counts: BTreeMap::from([(2, 2), (3, 1)]),
            sample_count: 3,
            generated_at: Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap(),
            description: "Хан-Уул дүүрэг нь хотын баруун урд байрладаг.".to_string(),
        }
    }

    #[test]
    fn groups_thousands_with_spaces() {
        assert_eq!(group_thousands(0.0), "0");
        assert_eq!(group_thousands(999.0), "999");
        assert_eq!(group_thousands(1_000.0), "1 000");
        assert_eq!(group_thousands(3_200_000.4), "3 200 000");
        assert_eq!(group_thousands(12_345_678.0), "12 345 678");
    }

    #[test]
    fn renders_lines_in_grammar_order() {
        let text = sample_document().render_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Дүүрэг: Хан-Уул",
                "Нийт байрны 1м2 дундаж үнэ: 3 200 000 төгрөг",
                "2 өрөө байрны 1м2 дундаж үнэ: 3 100 000 төгрөг",
                "3 өрөө байрны 1м2 дундаж үнэ: 3 400 000 төгрөг",
                "Хан-Уул дүүрэг нь хотын баруун урд байрладаг.",
                "Цуглуулсан өгөгдөл: 3 орон сууц (2 өрөө: 2, 3 өрөө: 1)",
                "Дата цуглуулсан огноо: 2025-03-01 09:30",
            ]
        );
    }

    #[test]
    fn omits_room_breakdown_when_empty() {
        let mut document = sample_document();
        document.per_room_count_averages.clear();
        document.per_room_sample_counts.clear();
        let text = document.render_text();
        assert!(text.contains("Цуглуулсан өгөгдөл: 3 орон сууц\n"));
        assert!(!text.contains("өрөө байрны"));
    }
}
