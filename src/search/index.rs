//! TF-IDF index construction over per-record text chunks.
//!
//! Each record is decomposed into thematically coherent chunks (overview,
//! parameters + return values, example) that are vectorized and scored
//! independently, so a parameter-name match is not diluted by an unrelated
//! example and results can say which part of a function's docs matched.

use crate::record::FunctionRecord;
use crate::search::tokenize::tokenize;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Which part of a record a chunk covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChunkKind {
    /// Name, syntax forms, description and applicability tag.
    Overview,
    /// Parameters and return values.
    Parameters,
    /// The example code block.
    Example,
}

impl fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Overview => "overview",
            Self::Parameters => "parameters",
            Self::Example => "example",
        })
    }
}

/// One indexed chunk: a reference to its record, the chunk text, and the
/// L2-normalized sparse term-weight vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Index into [`SearchIndex::records`].
    pub record: usize,
    pub kind: ChunkKind,
    pub text: String,
    /// Sparse TF-IDF vector. Kept as a `BTreeMap` so iteration, float
    /// accumulation order and serialized bytes are stable across builds.
    pub weights: BTreeMap<String, f32>,
}

impl IndexEntry {
    /// Short single-line excerpt for result listings.
    pub fn excerpt(&self) -> String {
        const MAX_CHARS: usize = 160;
        let flat = self.text.split_whitespace().collect::<Vec<_>>().join(" ");
        if flat.chars().count() > MAX_CHARS {
            let mut truncated: String = flat.chars().take(MAX_CHARS).collect();
            truncated.push('…');
            truncated
        } else {
            flat
        }
    }
}

/// The complete searchable index for one corpus. Built wholesale, never
/// mutated incrementally; any corpus change produces a fresh instance.
///
/// Records are embedded so a deserialized cache blob serves exact lookups
/// without re-parsing any document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchIndex {
    /// Fingerprint of the corpus this index was built from.
    pub corpus_signature: String,
    /// All records, in corpus discovery order.
    pub records: Vec<FunctionRecord>,
    /// Term → number of chunks containing it.
    pub vocabulary: BTreeMap<String, u32>,
    /// Term → smoothed inverse document frequency.
    pub idf: BTreeMap<String, f32>,
    /// All chunks, in discovery order of their records.
    pub entries: Vec<IndexEntry>,
}

/// Builds a [`SearchIndex`] from extracted records.
///
/// Deterministic: identical records always yield bit-identical vectors. Term
/// frequency is log-dampened, and IDF is smoothed as
/// `ln((1 + N) / (1 + df)) + 1` over N total chunks so no term is zero- or
/// infinitely weighted. Per-chunk vectors are L2-normalized, reducing cosine
/// similarity to a plain dot product at query time.
pub fn build(records: Vec<FunctionRecord>, corpus_signature: String) -> SearchIndex {
    let start = std::time::Instant::now();

    let mut chunks: Vec<(usize, ChunkKind, String)> = Vec::new();
    for (idx, record) in records.iter().enumerate() {
        chunks.push((idx, ChunkKind::Overview, overview_text(record)));
        if !record.parameters.is_empty() || !record.return_values.is_empty() {
            chunks.push((idx, ChunkKind::Parameters, parameters_text(record)));
        }
        if let Some(example) = &record.example {
            chunks.push((
                idx,
                ChunkKind::Example,
                format!("{} example:\n{example}", record.name),
            ));
        }
    }

    let mut vocabulary: BTreeMap<String, u32> = BTreeMap::new();
    let mut chunk_counts: Vec<AHashMap<String, usize>> = Vec::with_capacity(chunks.len());
    for (_, _, text) in &chunks {
        let mut counts: AHashMap<String, usize> = AHashMap::new();
        for token in tokenize(text) {
            *counts.entry(token).or_insert(0) += 1;
        }
        for term in counts.keys() {
            *vocabulary.entry(term.clone()).or_insert(0) += 1;
        }
        chunk_counts.push(counts);
    }

    let total_chunks = chunks.len() as f32;
    let idf: BTreeMap<String, f32> = vocabulary
        .iter()
        .map(|(term, df)| {
            let weight = ((1.0 + total_chunks) / (1.0 + *df as f32)).ln() + 1.0;
            (term.clone(), weight)
        })
        .collect();

    let entries: Vec<IndexEntry> = chunks
        .into_iter()
        .zip(chunk_counts)
        .map(|((record, kind, text), counts)| {
            let mut weights: BTreeMap<String, f32> = counts
                .into_iter()
                .map(|(term, count)| {
                    let weight = (1.0 + (count as f32).ln()) * idf[&term];
                    (term, weight)
                })
                .collect();
            // norm over the sorted map keeps float accumulation order stable
            let norm = weights.values().map(|w| w * w).sum::<f32>().sqrt();
            if norm > 0.0 {
                for weight in weights.values_mut() {
                    *weight /= norm;
                }
            }
            IndexEntry {
                record,
                kind,
                text,
                weights,
            }
        })
        .collect();

    let index = SearchIndex {
        corpus_signature,
        records,
        vocabulary,
        idf,
        entries,
    };

    tracing::info!(
        "Built search index: {} terms, {} chunks, {} records in {:?}",
        index.vocabulary.len(),
        index.entries.len(),
        index.records.len(),
        start.elapsed()
    );

    index
}

fn overview_text(record: &FunctionRecord) -> String {
    let mut text = format!("{}\n", record.name);
    if !record.syntax_forms.is_empty() {
        text.push_str(&format!("Syntax: {}\n", record.syntax_forms.join(" | ")));
    }
    if !record.description.is_empty() {
        text.push_str(&format!("Description: {}\n", record.description));
    }
    if let Some(valid_for) = &record.valid_for {
        text.push_str(&format!("Valid for: {valid_for}\n"));
    }
    text
}

fn parameters_text(record: &FunctionRecord) -> String {
    let mut text = String::new();
    if !record.parameters.is_empty() {
        text.push_str(&format!("{} parameters:\n", record.name));
        for parameter in &record.parameters {
            text.push_str(&format!("- {}: {}\n", parameter.name, parameter.description));
        }
    }
    if !record.return_values.is_empty() {
        text.push_str(&format!("{} returns:\n", record.name));
        for value in &record.return_values {
            text.push_str(&format!("- {value}\n"));
        }
    }
    text
}
