//! Extraction of a full listing record from a single listing page.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;
use scraper::Html;
use strum::IntoEnumIterator as _;
use ub_realty_property_models::{CharacteristicKey, Characteristics, PropertyLookup, PropertyRecord};

use crate::ScrapeError;
use crate::fetch::PageFetcher;
use crate::parsing::{
    extract_area_from_title, extract_room_count_from_title, find_characteristic, parse_area,
    parse_price, parse_room_count,
};
use crate::selectors::{FieldCascade, LabelledListCascade, element_text, normalize_text};

/// Error message returned for URLs outside the marketplace host; the
/// rendering of [`ScrapeError::UnsupportedUrl`].
pub const FOREIGN_URL_ERROR: &str = "Not a Unegui.mn URL";

static TITLE: LazyLock<FieldCascade> = LazyLock::new(|| {
    FieldCascade::new(&["h1.title-announcement", "h1.announcement__title", "h1"])
});

static LOCATION: LazyLock<FieldCascade> = LazyLock::new(|| {
    FieldCascade::new(&[
        "span[itemprop=address]",
        "div.announcement__location",
        "div.advert__content-place",
    ])
});

static PRICE_ATTRIBUTE: LazyLock<FieldCascade> =
    LazyLock::new(|| FieldCascade::new(&["section[data-price]", "[data-price]"]));

static PRICE_CONTAINER: LazyLock<FieldCascade> = LazyLock::new(|| {
    FieldCascade::new(&[
        "div.announcement-price__cost",
        "span.announcement-price",
        "div.price-container",
        "div.announcement__content-price",
        "span.advert__content-price",
    ])
});

static PRICE_META: LazyLock<FieldCascade> = LazyLock::new(|| {
    FieldCascade::new(&[
        "meta[itemprop=price]",
        "meta[property='product:price:amount']",
    ])
});

static CHARACTERISTICS: LazyLock<LabelledListCascade> = LazyLock::new(|| {
    LabelledListCascade::new(&[
        (
            "ul.chars-column li",
            "span.key-chars",
            "span.value-chars, a.value-chars",
        ),
        (
            "ul.announcement-characteristics li",
            "span.char-key",
            "span.char-value, a.char-value",
        ),
    ])
});

static DESCRIPTION: LazyLock<FieldCascade> = LazyLock::new(|| {
    FieldCascade::new(&[
        "div.announcement-description",
        "div.js-description",
        "div[itemprop=description]",
    ])
});

static PUBLISHED_DATE: LazyLock<FieldCascade> =
    LazyLock::new(|| FieldCascade::new(&["span.date-meta", "div.announcement__date"]));

static AD_NUMBER: LazyLock<FieldCascade> = LazyLock::new(|| {
    FieldCascade::new(&["span[itemprop=sku]", "span.announcement__number"])
});

static VIEW_COUNT: LazyLock<FieldCascade> = LazyLock::new(|| {
    FieldCascade::new(&["span.counter-views", "span.announcement__views"])
});

/// Price patterns searched in the full page text when no element carries
/// the price. Magnitude words first.
static PAGE_TEXT_PRICES: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        r"(?i)\d+(?:[.,]\d+)?\s*сая\s*₮",
        r"(?i)\d+(?:[.,]\d+)?\s*тэрбум\s*₮",
        r"\d[\d\s,]*₮",
    ]
    .map(|pattern| Regex::new(pattern).unwrap_or_else(|_| unreachable!()))
});

/// Extracts a listing record from the HTML of a single listing page.
///
/// Returns [`PropertyLookup::Failed`] when the page has none of the
/// expected content (no title, no price and no characteristics).
#[must_use]
pub fn extract_from_detail_page(url: &str, html: &str) -> PropertyLookup {
    match parse_detail_page(url, html) {
        Ok(record) => PropertyLookup::Found(Box::new(record)),
        Err(e) => PropertyLookup::failed(url, e.to_string()),
    }
}

/// Parses a single listing page into a record.
///
/// # Errors
///
/// Returns [`ScrapeError::Parse`] when the page has no title, no price and
/// no characteristics list.
pub fn parse_detail_page(url: &str, html: &str) -> Result<PropertyRecord, ScrapeError> {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let title = TITLE.first_text(root);
    let location = LOCATION.first_text(root);
    let (price_raw, price_numeric) = extract_price(&document);
    let items = CHARACTERISTICS.collect(root);

    if title.is_none() && price_numeric.is_none() && items.is_empty() {
        log::warn!("No listing content found on {url}");
        return Err(ScrapeError::Parse(
            "no listing content found on page".to_string(),
        ));
    }
    if items.is_empty() {
        log::debug!("No characteristics list on {url}");
    }

    let mut characteristics = Characteristics::default();
    for key in CharacteristicKey::iter() {
        if let Some(value) = find_characteristic(&items, key.label()) {
            characteristics.set(key, value.to_string());
        }
    }

    let title_text = title.as_deref().unwrap_or_default();
    let area_sqm = characteristics
        .get(CharacteristicKey::Area)
        .and_then(parse_area)
        .or_else(|| extract_area_from_title(title_text));
    let room_count = characteristics
        .get(CharacteristicKey::Rooms)
        .and_then(parse_room_count)
        .or_else(|| extract_room_count_from_title(title_text));

    let mut record = PropertyRecord::new(title)
        .with_url(url)
        .with_location(location)
        .with_characteristics(characteristics)
        .with_price(price_raw, price_numeric)
        .with_area_and_rooms(area_sqm, room_count);

    record.description = DESCRIPTION.first_text(root);
    record.published_date = PUBLISHED_DATE.first_text(root);
    record.ad_number = AD_NUMBER.first_text(root);
    record.view_count = VIEW_COUNT.first_text(root).and_then(|text| {
        let digits: String = text.chars().filter(char::is_ascii_digit).collect();
        digits.parse().ok()
    });

    log::debug!(
        "Extracted {url}: price={:?} area={:?} rooms={:?} price/m2={:?}",
        record.price_numeric,
        record.area_sqm,
        record.room_count,
        record.price_per_sqm,
    );

    Ok(record)
}

/// Price from the first strategy that yields a number: `data-price`
/// attribute, price container text, price meta tag, then page text.
fn extract_price(document: &Html) -> (Option<String>, Option<f64>) {
    let root = document.root_element();

    if let Some(raw) = PRICE_ATTRIBUTE.first_attr(root, "data-price")
        && let Ok(value) = raw.parse::<f64>()
    {
        return (Some(raw), Some(value));
    }

    if let Some(container) = PRICE_CONTAINER.first(root) {
        let text = element_text(container);
        if let Some(value) = parse_price(&text) {
            return (Some(text), Some(value));
        }
    }

    if let Some(raw) = PRICE_META.first_attr(root, "content")
        && let Some(value) = parse_price(&raw)
    {
        return (Some(raw), Some(value));
    }

    let page_text = normalize_text(&root.text().collect::<Vec<_>>().join(" "));
    for pattern in PAGE_TEXT_PRICES.iter() {
        if let Some(m) = pattern.find(&page_text)
            && let Some(value) = parse_price(m.as_str())
        {
            return (Some(m.as_str().trim().to_string()), Some(value));
        }
    }

    (None, None)
}

/// Whether `url` points at `host` or one of its subdomains.
#[must_use]
pub fn is_marketplace_url(url: &str, host: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_ascii_lowercase))
        .is_some_and(|actual| {
            let host = host.to_ascii_lowercase();
            actual == host || actual.ends_with(&format!(".{host}"))
        })
}

/// Rejects URLs that do not point at `host` or one of its subdomains.
///
/// # Errors
///
/// Returns [`ScrapeError::UnsupportedUrl`] carrying the rejected URL.
pub fn check_marketplace_url(url: &str, host: &str) -> Result<(), ScrapeError> {
    if is_marketplace_url(url, host) {
        Ok(())
    } else {
        Err(ScrapeError::UnsupportedUrl(url.to_string()))
    }
}

/// Fetches a single listing page and extracts its record.
///
/// Never fails: foreign URLs, fetch errors and parse failures all come back
/// as [`PropertyLookup::Failed`].
pub async fn retrieve_property_details(
    fetcher: &dyn PageFetcher,
    host: &str,
    url: &str,
) -> PropertyLookup {
    if let Err(e) = check_marketplace_url(url, host) {
        log::warn!("Rejecting lookup of foreign URL {url}");
        return PropertyLookup::failed(url, e.to_string());
    }

    log::info!("Fetching listing details from {url}");

    match fetcher.fetch_text(url).await {
        Ok(html) => extract_from_detail_page(url, &html),
        Err(e) => {
            log::error!("Failed to fetch {url}: {e}");
            PropertyLookup::failed(url, format!("Failed to fetch page: {e}"))
        }
    }
}
