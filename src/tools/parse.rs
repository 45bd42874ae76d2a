//! Single-document extraction, bypassing the index entirely.

use crate::corpus;
use crate::record::FunctionRecord;
use rmcp::schemars;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ParseDocumentRequest {
    /// Path to one markdown reference page
    pub file_path: String,
}

/// Parses one file into a structured record. Missing or undecodable files
/// are the only failure modes; malformed markdown still yields a (possibly
/// sparse) record.
pub async fn handle_parse_document(
    request: ParseDocumentRequest,
) -> Result<FunctionRecord, String> {
    let path = PathBuf::from(crate::server::expand_tilde(&request.file_path).as_ref());
    if !path.is_file() {
        return Err(format!("File not found: {}", path.display()));
    }

    tokio::task::spawn_blocking(move || {
        corpus::parse_single(&path).map_err(|err| format!("{err:#}"))
    })
    .await
    .map_err(|err| format!("parse task panicked: {err}"))?
}
