//! Field parsers for noisy listing text.
//!
//! Every function here is pure and total: malformed input yields `None`,
//! never a panic or an error.

use std::sync::LazyLock;

use regex::Regex;

/// Placeholder the marketplace (and older exports) use for missing values.
pub const PLACEHOLDER: &str = "N/A";

/// Plausible floor area range for a parsed value, in m².
const AREA_RANGE: std::ops::RangeInclusive<f64> = 10.0..=1000.0;

/// Plausible room count range for a parsed value.
const ROOM_RANGE: std::ops::RangeInclusive<u32> = 1..=10;

const MILLION: f64 = 1_000_000.0;
const BILLION: f64 = 1_000_000_000.0;

/// Mongolian word for "million" used in prices (`"350 сая ₮"`).
const MILLION_WORD: &str = "сая";
/// Mongolian word for "billion" used in prices (`"1.2 тэрбум ₮"`).
const BILLION_WORD: &str = "тэрбум";

/// Unit markers stripped before falling back to the first number.
const AREA_UNIT_MARKERS: &[&str] = &["м²", "мкв", "мк2", "мк", "m²", "sqm"];

/// A decimal number followed by an area unit. Longer markers come first so
/// that `мкв` is not read as `мк`. The trailing group requires the marker
/// to end at a non-alphanumeric character.
static AREA_WITH_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(\d+(?:[.,]\d+)?)\s*(?:мкв|мк2|м\.кв|кв\.?м|квм|м²|м2|мк|m²|m2|mkv|sqm|м)(?:[^\p{L}\p{N}]|$)",
    )
    .unwrap_or_else(|_| unreachable!())
});

static DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:[.,]\d+)?").unwrap_or_else(|_| unreachable!()));

static INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").unwrap_or_else(|_| unreachable!()));

/// `"3 өрөө"`, `"2+ өрөөтэй"`.
static ROOMS_NATIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\+?\s*өрөө").unwrap_or_else(|_| unreachable!()));

/// `"3 room"`, `"2 oroo"`, `"4р"`.
static ROOMS_SHORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\s*(?:oroo|rooms?|р)(?:[^\p{L}\p{N}]|$)").unwrap_or_else(|_| unreachable!())
});

fn is_placeholder(text: &str) -> bool {
    let text = text.trim();
    text.is_empty() || text.eq_ignore_ascii_case(PLACEHOLDER)
}

/// Parses `"55,5"` or `"55.5"` into `55.5`.
fn parse_decimal(text: &str) -> Option<f64> {
    text.replace(',', ".").parse().ok()
}

fn plausible_area(value: f64) -> Option<f64> {
    if AREA_RANGE.contains(&value) {
        Some(value)
    } else {
        log::debug!("Area value {value} outside plausible range");
        None
    }
}

fn plausible_rooms(value: u32) -> Option<u32> {
    if ROOM_RANGE.contains(&value) {
        Some(value)
    } else {
        log::debug!("Room count {value} outside plausible range");
        None
    }
}

/// Parses a floor area such as `"55.5 м²"` or `"72,3"`.
///
/// Prefers a number directly followed by an area unit, otherwise strips
/// the unit markers and takes the first decimal number. Values outside
/// 10–1000 m² are discarded.
#[must_use]
pub fn parse_area(text: &str) -> Option<f64> {
    if is_placeholder(text) {
        return None;
    }

    let lowered = text.to_lowercase();

    if let Some(caps) = AREA_WITH_UNIT.captures(&lowered) {
        return parse_decimal(&caps[1]).and_then(plausible_area);
    }

    let mut cleaned = lowered;
    for marker in AREA_UNIT_MARKERS {
        cleaned = cleaned.replace(marker, "");
    }

    let value = DECIMAL
        .find(&cleaned)
        .and_then(|m| parse_decimal(m.as_str()))?;
    plausible_area(value)
}

/// Parses a room count such as `"3"` or `"3 өрөө"`: the first integer in
/// the text, kept only within 1–10.
#[must_use]
pub fn parse_room_count(text: &str) -> Option<u32> {
    if is_placeholder(text) {
        return None;
    }

    let value = INTEGER.find(text)?.as_str().parse().ok()?;
    plausible_rooms(value)
}

/// Parses a price such as `"3,500,000 ₮"`, `"350 сая ₮"` or `"1.2 тэрбум"`.
///
/// Currency signs, whitespace and thousands separators are stripped. When a
/// magnitude word is present the leading decimal number is multiplied by
/// it.
#[must_use]
pub fn parse_price(text: &str) -> Option<f64> {
    if is_placeholder(text) {
        return None;
    }

    let compact: String = text
        .replace('₮', "")
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    let multiplier = if compact.contains(BILLION_WORD) {
        Some(BILLION)
    } else if compact.contains(MILLION_WORD) {
        Some(MILLION)
    } else {
        None
    };

    if let Some(multiplier) = multiplier
        && let Some(m) = DECIMAL.find(&compact)
        && let Some(value) = parse_magnitude_number(m.as_str())
    {
        return Some(value * multiplier);
    }

    let digits_only = compact.replace(',', "");
    INTEGER.find(&digits_only)?.as_str().parse().ok()
}

/// A comma followed by exactly three digits is a thousands separator,
/// anything else is a decimal comma.
fn parse_magnitude_number(text: &str) -> Option<f64> {
    match text.split_once(',') {
        Some((_, fraction)) if fraction.len() == 3 => text.replace(',', "").parse().ok(),
        _ => parse_decimal(text),
    }
}

/// Extracts a floor area from a free-text title such as
/// `"2 өрөө 55 м² байр зарна"`.
#[must_use]
pub fn extract_area_from_title(title: &str) -> Option<f64> {
    let lowered = title.to_lowercase();

    AREA_WITH_UNIT
        .captures_iter(&lowered)
        .filter_map(|caps| parse_decimal(&caps[1]))
        .find_map(plausible_area)
}

/// Extracts a room count from a free-text title such as `"3 өрөө байр"`.
#[must_use]
pub fn extract_room_count_from_title(title: &str) -> Option<u32> {
    let lowered = title.to_lowercase();

    [&*ROOMS_NATIVE, &*ROOMS_SHORT]
        .into_iter()
        .flat_map(|re| re.captures_iter(&lowered).collect::<Vec<_>>())
        .filter_map(|caps| caps[1].parse::<u32>().ok())
        .find_map(plausible_rooms)
}

/// Finds the value for `label` in a list of `(label, value)` pairs taken
/// from a characteristics list. Trailing colons on either side are ignored.
#[must_use]
pub fn find_characteristic<'a>(items: &'a [(String, String)], label: &str) -> Option<&'a str> {
    let wanted = label.trim().trim_end_matches(':').trim_end();

    items
        .iter()
        .find(|(key, _)| key.trim().trim_end_matches(':').trim_end() == wanted)
        .map(|(_, value)| value.as_str())
        .filter(|value| !is_placeholder(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(actual: Option<f64>, expected: f64) {
        let actual = actual.unwrap_or_else(|| panic!("expected {expected}, got None"));
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn parses_area_with_unit() {
        approx(parse_area("55 м²"), 55.0);
        approx(parse_area("72,5 мкв"), 72.5);
        approx(parse_area("48.3"), 48.3);
        approx(parse_area("Талбай 64 sqm"), 64.0);
    }

    #[test]
    fn area_placeholders_and_absurd_values_are_none() {
        assert_eq!(parse_area(""), None);
        assert_eq!(parse_area("N/A"), None);
        assert_eq!(parse_area("тодорхойгүй"), None);
        assert_eq!(parse_area("200000 м²"), None);
    }

    #[test]
    fn parses_room_count() {
        assert_eq!(parse_room_count("3"), Some(3));
        assert_eq!(parse_room_count("4 өрөө"), Some(4));
        assert_eq!(parse_room_count("N/A"), None);
        assert_eq!(parse_room_count("олон"), None);
        assert_eq!(parse_room_count("25"), None);
    }

    #[test]
    fn parses_price_with_thousands_separators() {
        approx(parse_price("3,500,000 ₮"), 3_500_000.0);
        approx(parse_price("185 000 000₮"), 185_000_000.0);
        approx(parse_price("\u{a0}99\u{a0}000\u{a0}000 ₮"), 99_000_000.0);
    }

    #[test]
    fn parses_price_with_magnitude_words() {
        approx(parse_price("350 сая ₮"), 350_000_000.0);
        approx(parse_price("3.5 сая"), 3_500_000.0);
        approx(parse_price("3,5 сая ₮"), 3_500_000.0);
        approx(parse_price("1.2 тэрбум ₮"), 1_200_000_000.0);
        approx(parse_price("1,200 сая"), 1_200_000_000.0);
    }

    #[test]
    fn price_without_digits_is_none() {
        assert_eq!(parse_price(""), None);
        assert_eq!(parse_price("Үнэ тохиролцоно"), None);
    }

    #[test]
    fn extracts_area_and_rooms_from_title() {
        let title = "2 өрөө 55 м² байр зарна";
        approx(extract_area_from_title(title), 55.0);
        assert_eq!(extract_room_count_from_title(title), Some(2));
    }

    #[test]
    fn extracts_from_latin_titles() {
        approx(extract_area_from_title("3 room apartment 84.5 sqm"), 84.5);
        assert_eq!(extract_room_count_from_title("3 room apartment 84.5 sqm"), Some(3));
        assert_eq!(extract_room_count_from_title("2 oroo bair"), Some(2));
    }

    #[test]
    fn title_extraction_ignores_unrelated_numbers() {
        assert_eq!(extract_area_from_title("19-р хороолол 3 өрөө байр"), None);
        assert_eq!(extract_room_count_from_title("19-р хороолол байр"), None);
        approx(extract_area_from_title("Зайсан 120мкв пентхаус"), 120.0);
    }

    #[test]
    fn finds_characteristic_ignoring_colons() {
        let items = vec![
            ("Талбай:".to_string(), "64 м²".to_string()),
            ("Өрөөний тоо".to_string(), "3".to_string()),
            ("Тагт:".to_string(), "N/A".to_string()),
        ];
        assert_eq!(find_characteristic(&items, "Талбай"), Some("64 м²"));
        assert_eq!(find_characteristic(&items, "Өрөөний тоо:"), Some("3"));
        assert_eq!(find_characteristic(&items, "Тагт"), None);
        assert_eq!(find_characteristic(&items, "Гараж"), None);
    }
}
