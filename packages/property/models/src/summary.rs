//! Label-anchored re-parsing of rendered district documents.
//!
//! Stored documents are plain text; values are recovered by scanning each
//! line for the labels defined in [`crate::document`]. Lines that do not
//! start with a known label are ignored, so free-text descriptions never
//! interfere.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::document::{DISTRICT_LABEL, DistrictDocument, SAMPLE_LABEL};

/// `"Нийт байрны 1м2 дундаж үнэ: ..."`. Accepts a Latin `m` in `1м2`,
/// which appears in older hand-written seed documents.
static OVERALL_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Нийт байрны 1[мm]2 дундаж үнэ:\s*(.*)$").unwrap_or_else(|_| unreachable!())
});

/// `"{k} өрөө байрны 1м2 дундаж үнэ: ..."`.
static ROOM_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\s*өрөө байрны 1[мm]2 дундаж үнэ:\s*(.*)$")
        .unwrap_or_else(|_| unreachable!())
});

/// First run of digits possibly broken up by spaces or commas.
static GROUPED_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[\d\s,]*").unwrap_or_else(|_| unreachable!()));

static LEADING_INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").unwrap_or_else(|_| unreachable!()));

/// Values recovered from a district document's text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictSummary {
    /// District display name.
    pub name: String,
    /// Overall average price per m².
    pub overall_average: f64,
    /// Average price per m² keyed by room count.
    pub room_averages: BTreeMap<u32, f64>,
    /// Number of listings the averages were computed from, when stated.
    pub sample_count: Option<u64>,
}

impl DistrictSummary {
    /// Scans `text` for the labelled lines of a district document.
    ///
    /// Returns `None` unless both the district name and a positive overall
    /// average are found.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let mut name: Option<String> = None;
        let mut overall_average: Option<f64> = None;
        let mut room_averages = BTreeMap::new();
        let mut sample_count = None;

        for line in text.lines().map(str::trim) {
            if let Some(rest) = line.strip_prefix(DISTRICT_LABEL) {
                let rest = rest.trim();
                if !rest.is_empty() {
                    name = Some(rest.to_string());
                }
            } else if let Some(caps) = OVERALL_LINE.captures(line) {
                overall_average = parse_grouped_number(&caps[1]);
            } else if let Some(caps) = ROOM_LINE.captures(line) {
                if let (Ok(rooms), Some(average)) =
                    (caps[1].parse::<u32>(), parse_grouped_number(&caps[2]))
                {
                    room_averages.insert(rooms, average);
                }
            } else if let Some(rest) = line.strip_prefix(SAMPLE_LABEL) {
                sample_count = LEADING_INTEGER
                    .find(rest)
                    .and_then(|m| m.as_str().parse().ok());
            }
        }

        let name = name?;
        let overall_average = overall_average.filter(|v| *v > 0.0)?;

        Some(Self {
            name,
            overall_average,
            room_averages,
            sample_count,
        })
    }

    /// Average for the given room count, if present.
    #[must_use]
    pub fn room_average(&self, rooms: u32) -> Option<f64> {
        self.room_averages.get(&rooms).copied()
    }
}

impl From<&DistrictDocument> for DistrictSummary {
    fn from(document: &DistrictDocument) -> Self {
        Self {
            name: document.district_name.clone(),
            overall_average: document.overall_average_price_per_sqm,
            room_averages: document.per_room_count_averages.clone(),
            sample_count: Some(document.sample_count),
        }
    }
}

/// Parses `"3 200 000 төгрөг"` or `"3,200,000"` into `3200000.0`. Returns
/// `None` for placeholders without digits.
fn parse_grouped_number(text: &str) -> Option<f64> {
    let matched = GROUPED_NUMBER.find(text)?;
    let digits: String = matched
        .as_str()
        .chars()
        .filter(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn parses_hand_written_seed_text() {
        let text = "
            Дүүрэг: Чингэлтэй
            Нийт байрны 1м2 дундаж үнэ: 3 800 000 төгрөг
            2 өрөө байрны 1м2 дундаж үнэ: 3 900 000 төгрөг
            3 өрөө байрны 1m2 дундаж үнэ: 3 700 000 төгрөг
            Чингэлтэй дүүрэг нь төв хэсэгтэй ойр байрладаг.
        ";
        let summary = DistrictSummary::parse(text).unwrap();
        assert_eq!(summary.name, "Чингэлтэй");
        assert!((summary.overall_average - 3_800_000.0).abs() < f64::EPSILON);
        assert_eq!(summary.room_average(2), Some(3_900_000.0));
        assert_eq!(summary.room_average(3), Some(3_700_000.0));
        assert_eq!(summary.sample_count, None);
    }

    #[test]
    fn rejects_text_without_overall_average() {
        let text = "Дүүрэг: Налайх\nНийт байрны 1м2 дундаж үнэ: мэдээлэл байхгүй";
        assert!(DistrictSummary::parse(text).is_none());
        assert!(DistrictSummary::parse("Тодорхой мэдээлэл алга").is_none());
    }

    #[test]
    fn round_trips_rendered_document() {
        let document = DistrictDocument {
            district_name: "Баянгол".to_string(),
            overall_average_price_per_sqm: 3_510_645.4,
            per_room_count_averages: BTreeMap::from([
                (1, 3_900_000.0),
                (2, 3_610_645.0),
                (4, 3_100_000.6),
            ]),
            per_room_sample_counts: BTreeMap::from([(1, 1), (2, 5), (4, 2)]),
            sample_count: 8,
            generated_at: Utc::now(),
            description: "Баянгол дүүрэг нь хотын төв хэсэгт ойр байрладаг.".to_string(),
        };

        let summary = DistrictSummary::parse(&document.render_text()).unwrap();
        assert_eq!(summary.name, document.district_name);
        assert!((summary.overall_average - document.overall_average_price_per_sqm).abs() <= 0.5);
        assert_eq!(summary.room_averages.len(), 3);
        for (rooms, average) in &document.per_room_count_averages {
            let parsed = summary.room_average(*rooms).unwrap();
            assert!((parsed - average).abs() <= 0.5, "room {rooms}: {parsed} vs {average}");
        }
        assert_eq!(summary.sample_count, Some(8));
    }
}
