//! Free-text relevance search over a documentation corpus.

use crate::error::DocError;
use crate::search::index::SearchIndex;
use crate::state::SearchState;
use rmcp::schemars;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SemanticSearchRequest {
    /// Free-text query, e.g. "send data over udp"
    pub query: String,
    /// Directories (or single files) containing CAPL reference markdown
    pub corpus_paths: Vec<String>,
    /// Maximum number of functions to return (default: 5)
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Minimum cosine similarity in [0, 1] for a result to qualify (default: 0.1)
    #[serde(default = "default_min_score")]
    pub min_score: f32,
    /// Discard any cached index and rebuild from the documents
    #[serde(default)]
    pub force_rebuild: bool,
}

fn default_top_k() -> usize {
    5
}

fn default_min_score() -> f32 {
    0.1
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResultItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResultItem {
    pub name: String,
    pub excerpt: String,
    pub score: f32,
    /// Which part of the function's documentation matched best
    pub section: String,
}

/// Executes the search operation against the (cached or rebuilt) index.
pub async fn handle_semantic_search(
    state: &Arc<SearchState>,
    request: SemanticSearchRequest,
) -> Result<SearchResponse, String> {
    if request.top_k == 0 {
        return Err("top_k must be at least 1".to_string());
    }
    if !(0.0..=1.0).contains(&request.min_score) {
        return Err("min_score must be within [0, 1]".to_string());
    }

    let roots = resolve_roots(&request.corpus_paths)?;
    let index = state.index_for(&roots, request.force_rebuild).await?;

    if index.records.is_empty() {
        return Ok(SearchResponse {
            results: Vec::new(),
            message: Some(DocError::CorpusEmpty.to_string()),
        });
    }

    Ok(SearchResponse {
        results: rank_functions(&index, &request),
        message: None,
    })
}

/// Folds chunk-level hits into one row per function, keeping each function's
/// best-scoring chunk. Chunk hits are over-fetched threefold so the fold can
/// still fill `top_k` distinct functions.
fn rank_functions(index: &SearchIndex, request: &SemanticSearchRequest) -> Vec<SearchResultItem> {
    let hits = index.search(
        &request.query,
        request.top_k.saturating_mul(3),
        request.min_score,
    );

    // hits are sorted descending, so the first hit per record is its best
    let mut best: HashMap<usize, usize> = HashMap::new();
    let mut ranked: Vec<usize> = Vec::new();
    for (hit_idx, hit) in hits.iter().enumerate() {
        best.entry(hit.record).or_insert_with(|| {
            ranked.push(hit.record);
            hit_idx
        });
    }

    ranked
        .into_iter()
        .take(request.top_k)
        .map(|record_idx| {
            let hit = &hits[best[&record_idx]];
            let entry = index.entry(hit);
            SearchResultItem {
                name: index.records[record_idx].name.clone(),
                excerpt: entry.excerpt(),
                score: hit.score,
                section: entry.kind.to_string(),
            }
        })
        .collect()
}

/// Expands and validates the request's corpus paths.
pub(crate) fn resolve_roots(paths: &[String]) -> Result<Vec<PathBuf>, String> {
    if paths.is_empty() {
        return Err("corpus_paths must name at least one directory".to_string());
    }
    Ok(paths
        .iter()
        .map(|path| PathBuf::from(crate::server::expand_tilde(path).as_ref()))
        .collect())
}
