//! Resolves the district a free-form query is about.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::{ConfigError, DistrictVariations, KnowledgeConfig};

/// Captures the word right before "дүүрэг" and its inflections.
static DISTRICT_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\S+)\s*дүүр").unwrap_or_else(|_| unreachable!()));

struct Variation {
    spelling: String,
    whole_word: Regex,
    canonical: usize,
}

/// Maps spelling variants ("хануул", "khan uul", "сухбаатар") to the
/// canonical district name.
pub struct DistrictMatcher {
    names: Vec<String>,
    variations: Vec<Variation>,
}

impl DistrictMatcher {
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a variation cannot be turned into
    /// a pattern.
    pub fn new(districts: &[DistrictVariations]) -> Result<Self, ConfigError> {
        let mut names = Vec::with_capacity(districts.len());
        let mut variations = Vec::new();
        for (canonical, district) in districts.iter().enumerate() {
            names.push(district.name.clone());
            for spelling in &district.variations {
                let spelling = spelling.trim().to_lowercase();
                let whole_word = Regex::new(&format!(r"\b{}\b", regex::escape(&spelling)))
                    .map_err(|e| ConfigError::Invalid(format!("variation '{spelling}': {e}")))?;
                variations.push(Variation {
                    spelling,
                    whole_word,
                    canonical,
                });
            }
        }
        Ok(Self { names, variations })
    }

    /// Matcher over the districts of the embedded configuration.
    ///
    /// # Panics
    ///
    /// Panics if the embedded `knowledge.toml` is malformed.
    #[must_use]
    pub fn embedded() -> Self {
        Self::new(&KnowledgeConfig::embedded().districts)
            .unwrap_or_else(|e| panic!("Invalid districts in knowledge.toml: {e}"))
    }

    /// Canonical district named in `query`, if any.
    ///
    /// Tries whole-word spellings first, then spellings anywhere in the
    /// text, then the word in front of "дүүрэг" when it is a prefix or part
    /// of a spelling.
    #[must_use]
    pub fn canonical(&self, query: &str) -> Option<&str> {
        let lowered = query.to_lowercase();

        let found = self
            .variations
            .iter()
            .find(|v| v.whole_word.is_match(&lowered))
            .or_else(|| {
                self.variations
                    .iter()
                    .find(|v| lowered.contains(&v.spelling))
            })
            .or_else(|| {
                let part = DISTRICT_SUFFIX.captures(&lowered)?.get(1)?.as_str().trim();
                self.variations
                    .iter()
                    .find(|v| v.spelling.contains(part))
            })?;

        let name = self.names[found.canonical].as_str();
        log::debug!("Query '{query}' names district {name}");
        Some(name)
    }
}

impl Default for DistrictMatcher {
    fn default() -> Self {
        Self::embedded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_spelling_variants() {
        let matcher = DistrictMatcher::embedded();
        assert_eq!(matcher.canonical("khan uul 2 өрөө"), Some("Хан-Уул"));
        assert_eq!(matcher.canonical("Хануул дүүргийн үнэ"), Some("Хан-Уул"));
        assert_eq!(matcher.canonical("сухбаатар"), Some("Сүхбаатар"));
        assert_eq!(matcher.canonical("Баянзурх хаана вэ"), Some("Баянзүрх"));
        assert_eq!(matcher.canonical("ЧИНГЭЛТЭЙ"), Some("Чингэлтэй"));
    }

    #[test]
    fn falls_back_to_partial_and_suffix_matches() {
        let matcher = DistrictMatcher::embedded();
        assert_eq!(matcher.canonical("налайхын байр"), Some("Налайх"));
        assert_eq!(matcher.canonical("сонгино дүүрэгт"), Some("Сонгинохайрхан"));
        assert_eq!(matcher.canonical("Зайсан орчим"), None);
        assert_eq!(matcher.canonical(""), None);
    }
}
