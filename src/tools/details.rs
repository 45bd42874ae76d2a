//! Exact-name lookup of one function's full structured record.

use crate::error::DocError;
use crate::record::FunctionRecord;
use crate::state::SearchState;
use crate::tools::search::resolve_roots;
use rmcp::schemars;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct FunctionDetailsRequest {
    /// Exact function name, matched case-sensitively, e.g. "UdpSend"
    pub function_name: String,
    /// Directories (or single files) containing CAPL reference markdown
    pub corpus_paths: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct FunctionDetailsResponse {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<FunctionRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Executes the lookup operation. A miss is a normal negative result, not an
/// error: no fuzzy fallback is attempted, `semantic_search` is the discovery
/// path when the exact name is unknown.
pub async fn handle_function_details(
    state: &Arc<SearchState>,
    request: FunctionDetailsRequest,
) -> Result<FunctionDetailsResponse, String> {
    let roots = resolve_roots(&request.corpus_paths)?;
    let index = state.index_for(&roots, false).await?;

    if index.records.is_empty() {
        return Ok(FunctionDetailsResponse {
            found: false,
            record: None,
            message: Some(DocError::CorpusEmpty.to_string()),
        });
    }

    match index.lookup(&request.function_name) {
        Some(record) => Ok(FunctionDetailsResponse {
            found: true,
            record: Some(record.clone()),
            message: None,
        }),
        None => Ok(FunctionDetailsResponse {
            found: false,
            record: None,
            message: Some(format!(
                "{}; names match case-sensitively, use semantic_search to discover the exact name",
                DocError::NotFound {
                    name: request.function_name.clone(),
                }
            )),
        }),
    }
}
