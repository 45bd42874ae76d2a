//! Query vectorization, cosine ranking and exact lookup.

use crate::record::FunctionRecord;
use crate::search::index::{IndexEntry, SearchIndex};
use crate::search::tokenize::tokenize;
use std::collections::BTreeMap;

/// One ranked chunk match.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Index into [`SearchIndex::records`].
    pub record: usize,
    /// Index into [`SearchIndex::entries`].
    pub entry: usize,
    /// Cosine similarity between query and chunk, in [0, 1].
    pub score: f32,
}

impl SearchIndex {
    /// Ranks every indexed chunk against a free-text query.
    ///
    /// The query is vectorized against this index's existing vocabulary and
    /// IDF weights; terms unseen in the corpus contribute zero weight and
    /// never expand the vocabulary. Results are sorted by descending score;
    /// exactly equal scores keep corpus discovery order (the tie policy lives
    /// in this one comparator, swap it here to change the policy). Scores
    /// below `min_score` are dropped and the remainder truncated to `top_k`.
    /// The index itself is never mutated.
    pub fn search(&self, query: &str, top_k: usize, min_score: f32) -> Vec<SearchHit> {
        let query_vector = self.vectorize(query);
        if query_vector.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<SearchHit> = self
            .entries
            .iter()
            .enumerate()
            .map(|(entry_idx, entry)| SearchHit {
                record: entry.record,
                entry: entry_idx,
                score: dot(&query_vector, &entry.weights),
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.retain(|hit| hit.score > 0.0 && hit.score >= min_score);
        hits.truncate(top_k);
        hits
    }

    /// Exact, case-sensitive lookup by function name. No fuzzy fallback:
    /// discovering the exact name is what [`SearchIndex::search`] is for.
    pub fn lookup(&self, name: &str) -> Option<&FunctionRecord> {
        self.records.iter().find(|record| record.name == name)
    }

    /// The chunk a hit refers to.
    pub fn entry(&self, hit: &SearchHit) -> &IndexEntry {
        &self.entries[hit.entry]
    }

    /// Builds the L2-normalized query vector over terms known to this index.
    fn vectorize(&self, query: &str) -> BTreeMap<String, f32> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for token in tokenize(query) {
            *counts.entry(token).or_insert(0) += 1;
        }

        let mut vector: BTreeMap<String, f32> = counts
            .into_iter()
            .filter_map(|(term, count)| {
                self.idf.get(&term).map(|idf| {
                    let weight = (1.0 + (count as f32).ln()) * idf;
                    (term, weight)
                })
            })
            .collect();

        let norm = vector.values().map(|w| w * w).sum::<f32>().sqrt();
        if norm > 0.0 {
            for weight in vector.values_mut() {
                *weight /= norm;
            }
        }
        vector
    }
}

/// Dot product of two sparse vectors; cosine similarity for L2-normalized
/// inputs.
fn dot(query: &BTreeMap<String, f32>, weights: &BTreeMap<String, f32>) -> f32 {
    query
        .iter()
        .filter_map(|(term, qw)| weights.get(term).map(|ew| qw * ew))
        .sum()
}
