use capldoc_mcp::cache::CacheManager;
use capldoc_mcp::server::DocServer;
use rmcp::{ServiceExt, transport::stdio};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    capldoc_mcp::tracing::init();

    let cache_dir = CacheManager::default_dir();
    tracing::info!(
        "Starting capldoc-mcp MCP server (cache: {})",
        cache_dir.display()
    );

    // Create and serve the MCP server over stdio
    let server = DocServer::new(CacheManager::new(cache_dir));
    let service = server.serve(stdio()).await.inspect_err(|e| {
        tracing::error!("Error serving MCP server: {:?}", e);
    })?;

    // Wait for the service to complete
    service.waiting().await?;

    Ok(())
}
