//! Ordered selector cascades.
//!
//! Marketplace markup has changed class names over time, so each field is
//! located by trying several CSS selectors in order. The first selector
//! that yields a usable match wins.

use scraper::{ElementRef, Selector};

/// Parses a CSS selector, logging and skipping invalid ones.
fn parse_selector(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            log::warn!("Ignoring invalid CSS selector '{selector}': {e}");
            None
        }
    }
}

/// Collapses runs of whitespace (including non-breaking spaces) into a
/// single space and trims the ends.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalized text content of an element.
#[must_use]
pub fn element_text(element: ElementRef<'_>) -> String {
    normalize_text(&element.text().collect::<String>())
}

/// An ordered list of selectors for one field.
#[derive(Debug, Clone)]
pub struct FieldCascade {
    selectors: Vec<Selector>,
}

impl FieldCascade {
    /// Builds a cascade from selector strings, in priority order.
    #[must_use]
    pub fn new(candidates: &[&str]) -> Self {
        Self {
            selectors: candidates.iter().filter_map(|s| parse_selector(s)).collect(),
        }
    }

    /// First element matched by the highest-priority selector that matches
    /// anything inside `scope`.
    #[must_use]
    pub fn first<'a>(&self, scope: ElementRef<'a>) -> Option<ElementRef<'a>> {
        self.selectors
            .iter()
            .find_map(|selector| scope.select(selector).next())
    }

    /// All elements matched by the highest-priority selector that matches
    /// anything inside `scope`.
    #[must_use]
    pub fn all<'a>(&self, scope: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        self.selectors
            .iter()
            .map(|selector| scope.select(selector).collect::<Vec<_>>())
            .find(|matches| !matches.is_empty())
            .unwrap_or_default()
    }

    /// Normalized text of the first match with non-empty text.
    #[must_use]
    pub fn first_text(&self, scope: ElementRef<'_>) -> Option<String> {
        self.selectors.iter().find_map(|selector| {
            scope
                .select(selector)
                .map(element_text)
                .find(|text| !text.is_empty())
        })
    }

    /// Value of `attr` on the first match that carries it.
    #[must_use]
    pub fn first_attr(&self, scope: ElementRef<'_>, attr: &str) -> Option<String> {
        self.selectors.iter().find_map(|selector| {
            scope
                .select(selector)
                .find_map(|el| el.value().attr(attr))
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        })
    }
}

/// One markup scheme for a labelled key/value list.
#[derive(Debug, Clone)]
pub struct LabelledListScheme {
    item: Selector,
    key: Selector,
    value: Selector,
}

impl LabelledListScheme {
    /// Builds a scheme from item, key and value selectors. Returns `None`
    /// when any selector is invalid.
    #[must_use]
    pub fn new(item: &str, key: &str, value: &str) -> Option<Self> {
        Some(Self {
            item: parse_selector(item)?,
            key: parse_selector(key)?,
            value: parse_selector(value)?,
        })
    }

    fn collect(&self, scope: ElementRef<'_>) -> Vec<(String, String)> {
        scope
            .select(&self.item)
            .filter_map(|item| {
                let key = item.select(&self.key).next().map(element_text)?;
                let value = item.select(&self.value).next().map(element_text)?;
                Some((key, value))
            })
            .collect()
    }
}

/// Ordered schemes for a labelled list; the first scheme producing any
/// pairs wins.
#[derive(Debug, Clone)]
pub struct LabelledListCascade {
    schemes: Vec<LabelledListScheme>,
}

impl LabelledListCascade {
    /// Builds a cascade from `(item, key, value)` selector triples.
    #[must_use]
    pub fn new(schemes: &[(&str, &str, &str)]) -> Self {
        Self {
            schemes: schemes
                .iter()
                .filter_map(|(item, key, value)| LabelledListScheme::new(item, key, value))
                .collect(),
        }
    }

    /// `(label, value)` pairs from the first scheme that matches.
    #[must_use]
    pub fn collect(&self, scope: ElementRef<'_>) -> Vec<(String, String)> {
        self.schemes
            .iter()
            .map(|scheme| scheme.collect(scope))
            .find(|pairs| !pairs.is_empty())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use scraper::Html;

    use super::*;

    #[test]
    fn first_matching_selector_wins() {
        let html = Html::parse_fragment(
            r#"<div><span class="new-price">  5 000 000 ₮ </span><span class="old-price">1 ₮</span></div>"#,
        );
        let cascade = FieldCascade::new(&["span.missing", "span.new-price", "span.old-price"]);
        assert_eq!(
            cascade.first_text(html.root_element()).as_deref(),
            Some("5 000 000 ₮")
        );
    }

    #[test]
    fn skips_empty_text_matches() {
        let html = Html::parse_fragment(
            r#"<div><h1 class="title"> </h1><h1 class="alt">2 өрөө байр</h1></div>"#,
        );
        let cascade = FieldCascade::new(&["h1.title", "h1.alt"]);
        assert_eq!(
            cascade.first_text(html.root_element()).as_deref(),
            Some("2 өрөө байр")
        );
    }

    #[test]
    fn invalid_selectors_are_ignored() {
        let html = Html::parse_fragment(r#"<div><a class="x" href="/a">A</a></div>"#);
        let cascade = FieldCascade::new(&["[[[", "a.x"]);
        assert_eq!(
            cascade.first_attr(html.root_element(), "href").as_deref(),
            Some("/a")
        );
    }

    #[test]
    fn labelled_list_falls_back_to_second_scheme() {
        let html = Html::parse_fragment(
            r#"<ul class="features"><li><b>Талбай:</b><i>55 м²</i></li><li><b>Тагт:</b><i>2</i></li></ul>"#,
        );
        let cascade = LabelledListCascade::new(&[
            ("ul.chars-column li", "span.key-chars", "span.value-chars"),
            ("ul.features li", "b", "i"),
        ]);
        let pairs = cascade.collect(html.root_element());
        assert_eq!(
            pairs,
            vec![
                ("Талбай:".to_string(), "55 м²".to_string()),
                ("Тагт:".to_string(), "2".to_string()),
            ]
        );
    }
}
