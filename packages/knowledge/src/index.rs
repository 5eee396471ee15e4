//! In-memory vector index over document texts.

use ub_realty_property_models::DistrictDocument;

use crate::embedder::cosine_similarity;

/// One indexed text.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    /// Searchable text.
    pub text: String,
    /// Structured source of [`Self::text`], when it was rendered from one.
    pub document: Option<DistrictDocument>,
    vector: Vec<f32>,
}

/// A search hit.
#[derive(Debug, Clone, Copy)]
pub struct Hit<'a> {
    pub entry: &'a IndexEntry,
    pub similarity: f32,
}

/// Flat index; search is a linear scan, which is plenty for a few dozen
/// district documents.
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Adds `text` with its embedding. `document` is the structured source
    /// the text was rendered from, if any.
    pub fn insert(&mut self, text: String, document: Option<DistrictDocument>, vector: Vec<f32>) {
        self.entries.push(IndexEntry {
            text,
            document,
            vector,
        });
    }

    /// The `k` entries most similar to `query_vector`, best first.
    #[must_use]
    pub fn search(&self, query_vector: &[f32], k: usize) -> Vec<Hit<'_>> {
        let mut hits: Vec<Hit<'_>> = self
            .entries
            .iter()
            .map(|entry| Hit {
                entry,
                similarity: cosine_similarity(query_vector, &entry.vector),
            })
            .collect();
        hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        hits.truncate(k);
        hits
    }

    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.iter()
    }

    /// Structured documents in insertion order.
    pub fn district_documents(&self) -> impl Iterator<Item = &DistrictDocument> {
        self.entries.iter().filter_map(|entry| entry.document.as_ref())
    }

    /// Raw texts that were inserted without a structured document.
    pub fn extra_texts(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|entry| entry.document.is_none())
            .map(|entry| entry.text.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use ub_realty_aggregate::fallback_documents;

    use super::*;
    use crate::embedder::HashingEmbedder;

    fn seed_index(embedder: &HashingEmbedder, count: usize) -> VectorIndex {
        let mut index = VectorIndex::default();
        for document in fallback_documents(Utc::now()).into_iter().take(count) {
            let text = document.render_text();
            let vector = embedder.embed_text(&text);
            index.insert(text, Some(document), vector);
        }
        index
    }

    #[test]
    fn search_returns_best_first_and_respects_k() {
        let embedder = HashingEmbedder::default();
        let index = seed_index(&embedder, usize::MAX);
        assert_eq!(index.len(), 6);

        let hits = index.search(&embedder.embed_text("Сонгинохайрхан дүүрэг"), 3);
        assert_eq!(hits.len(), 3);
        assert!(hits[0].similarity >= hits[1].similarity);
        assert!(hits[1].similarity >= hits[2].similarity);
        assert!(hits[0].entry.text.contains("Сонгинохайрхан"));
    }

    #[test]
    fn separates_documents_from_raw_texts() {
        let embedder = HashingEmbedder::default();
        let mut index = seed_index(&embedder, 2);
        let text = "Зайсан орчмын зарын тойм";
        index.insert(text.to_string(), None, embedder.embed_text(text));

        assert_eq!(index.district_documents().count(), 2);
        assert_eq!(index.extra_texts().collect::<Vec<_>>(), vec![text]);
        assert_eq!(index.entries().count(), 3);
    }
}
