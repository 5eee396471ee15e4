//! Extraction of listing records from search-result pages.

use std::sync::LazyLock;

use reqwest::Url;
use scraper::{ElementRef, Html};
use ub_realty_property_models::PropertyRecord;

use crate::parsing::{extract_area_from_title, extract_room_count_from_title, parse_price};
use crate::selectors::FieldCascade;

/// One search result per matched element.
static CONTAINER: LazyLock<FieldCascade> = LazyLock::new(|| {
    FieldCascade::new(&[
        "div.advert.js-item-listing",
        "div.announcement-container",
        "li.announcement-container",
    ])
});

static TITLE: LazyLock<FieldCascade> = LazyLock::new(|| {
    FieldCascade::new(&["a.advert__content-title", "a.announcement-block__title"])
});

static PRICE: LazyLock<FieldCascade> = LazyLock::new(|| {
    FieldCascade::new(&[
        "span.advert__content-price",
        "a.advert__content-price",
        "div.announcement-block__price",
    ])
});

static LOCATION: LazyLock<FieldCascade> = LazyLock::new(|| {
    FieldCascade::new(&[
        "div.advert__content-place",
        "div.announcement-block__breadcrumbs",
    ])
});

/// Parses a search-result page and extracts at most `limit` listings.
///
/// `page_url` is used to resolve relative listing links. Listings whose
/// title could not be found are still returned (with `title: None`) so
/// that callers can count them as parse failures.
#[must_use]
pub fn parse_search_results(html: &str, page_url: &str, limit: usize) -> Vec<PropertyRecord> {
    let document = Html::parse_document(html);
    let base = Url::parse(page_url).ok();

    let containers = CONTAINER.all(document.root_element());
    log::debug!(
        "Found {} listing containers on {page_url}, keeping at most {limit}",
        containers.len()
    );

    containers
        .into_iter()
        .take(limit)
        .map(|fragment| extract_from_search_result(fragment, base.as_ref()))
        .collect()
}

/// Extracts one listing from a search-result fragment.
///
/// Area and room count come from the title only; search results carry no
/// characteristics list.
#[must_use]
pub fn extract_from_search_result(fragment: ElementRef<'_>, base: Option<&Url>) -> PropertyRecord {
    let title = TITLE.first_text(fragment);
    let link = TITLE
        .first_attr(fragment, "href")
        .and_then(|href| resolve_link(base, &href));

    let price_raw = PRICE.first_text(fragment);
    let price_numeric = price_raw.as_deref().and_then(parse_price);

    let location = LOCATION.first_text(fragment);

    let (area_sqm, room_count) = title.as_deref().map_or((None, None), |title| {
        (
            extract_area_from_title(title),
            extract_room_count_from_title(title),
        )
    });

    let mut record = PropertyRecord::new(title)
        .with_location(location)
        .with_price(price_raw, price_numeric)
        .with_area_and_rooms(area_sqm, room_count);

    if let Some(link) = link {
        record = record.with_url(link);
    }

    record
}

fn resolve_link(base: Option<&Url>, href: &str) -> Option<String> {
    match base {
        Some(base) => base.join(href).ok().map(String::from),
        None => Url::parse(href).ok().map(String::from),
    }
}
