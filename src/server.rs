//! MCP server wiring: tool router over the shared search state.

use crate::cache::CacheManager;
use crate::state::SearchState;
use crate::tools::details::{FunctionDetailsRequest, handle_function_details};
use crate::tools::parse::{ParseDocumentRequest, handle_parse_document};
use crate::tools::search::{SemanticSearchRequest, handle_semantic_search};
use rmcp::{
    ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    tool, tool_handler, tool_router,
};
use std::borrow::Cow;
use std::sync::Arc;

/// MCP server for CAPL function reference queries.
#[derive(Clone)]
pub struct DocServer {
    /// Shared search state (snapshot cache, in-flight builds, disk cache)
    state: Arc<SearchState>,

    /// Tool router for handling MCP tool calls
    tool_router: ToolRouter<Self>,
}

impl std::fmt::Debug for DocServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocServer").field("state", &self.state).finish()
    }
}

#[tool_router]
impl DocServer {
    /// Create a new server around the given cache manager.
    pub fn new(cache: CacheManager) -> Self {
        Self {
            state: Arc::new(SearchState::new(cache)),
            tool_router: Self::tool_router(),
        }
    }

    /// Get the shared search state.
    pub fn state(&self) -> &Arc<SearchState> {
        &self.state
    }

    #[tool(
        description = "Search CAPL function reference documentation by free text. Ranks functions by TF-IDF cosine relevance over name, syntax, description, parameter and example chunks, and returns scored excerpts. The index is built once per corpus and reused until the documents change."
    )]
    async fn semantic_search(
        &self,
        Parameters(request): Parameters<SemanticSearchRequest>,
    ) -> std::result::Result<String, String> {
        let response = handle_semantic_search(&self.state, request).await?;
        serde_json::to_string_pretty(&response).map_err(|err| err.to_string())
    }

    #[tool(
        description = "Look up one CAPL function by exact, case-sensitive name and return its full structured record: syntax forms, description, parameters, return values and example. Use semantic_search first when the exact name is unknown."
    )]
    async fn get_function_details(
        &self,
        Parameters(request): Parameters<FunctionDetailsRequest>,
    ) -> std::result::Result<String, String> {
        let response = handle_function_details(&self.state, request).await?;
        serde_json::to_string_pretty(&response).map_err(|err| err.to_string())
    }

    #[tool(
        description = "Parse a single CAPL reference markdown file into a structured function record without building or touching the search index."
    )]
    async fn parse_single_document(
        &self,
        Parameters(request): Parameters<ParseDocumentRequest>,
    ) -> std::result::Result<String, String> {
        let record = handle_parse_document(request).await?;
        serde_json::to_string_pretty(&record).map_err(|err| err.to_string())
    }
}

#[tool_handler]
impl ServerHandler for DocServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo::new(ServerCapabilities::builder().enable_tools().build())
            .with_protocol_version(ProtocolVersion::V_2024_11_05)
            .with_server_info(Implementation::from_build_env())
            .with_instructions(
                "capldoc-mcp: structured search over Vector CAPL function reference markdown. \
                 Point the tools at one or more documentation directories; the TF-IDF index is \
                 built once per corpus and cached on disk until the documents change. \
                 Use semantic_search to discover functions and get_function_details for exact records.",
            )
    }
}

/// Expands tilde (`~`) in a path to the user's home directory.
///
/// - `~/foo` becomes `/home/user/foo`
/// - `~` becomes `/home/user`
/// - Other paths are returned unchanged
///
/// Returns `Cow::Borrowed` if no expansion needed, `Cow::Owned` if expanded.
pub fn expand_tilde(path: &str) -> Cow<'_, str> {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return Cow::Owned(home.join(stripped).display().to_string());
        }
    } else if path == "~"
        && let Some(home) = dirs::home_dir()
    {
        return Cow::Owned(home.display().to_string());
    }
    Cow::Borrowed(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;

    #[test]
    fn expand_tilde_leaves_plain_paths_alone() {
        check!(expand_tilde("/tmp/docs") == "/tmp/docs");
        check!(expand_tilde("relative/docs") == "relative/docs");
    }

    #[test]
    fn expand_tilde_resolves_home() {
        if let Some(home) = dirs::home_dir() {
            let expanded = expand_tilde("~/docs");
            check!(expanded.starts_with(&home.display().to_string()));
            check!(expand_tilde("~") == home.display().to_string());
        }
    }
}
