//! Server startup for stdio and streamable-HTTP transports.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use rmcp::ServiceExt;

use crate::config::QuillConfig;
use crate::db;
use crate::tools::QuillTools;
use crate::vector::VectorManager;

/// Open the journal and build the shared state every transport needs.
fn setup_shared_state(
    config: QuillConfig,
) -> Result<(
    Arc<Mutex<rusqlite::Connection>>,
    Arc<VectorManager>,
    Arc<QuillConfig>,
)> {
    let db_path = config.resolved_db_path();
    let conn = db::open_database(&db_path)?;
    tracing::info!(db = %db_path.display(), "journal ready");

    let db = Arc::new(Mutex::new(conn));
    // The embedding model loads on the first semantic operation, so the
    // journal works without model files present.
    let vectors = Arc::new(VectorManager::new(&config));
    let config = Arc::new(config);

    Ok((db, vectors, config))
}

/// Serve MCP over stdio.
pub async fn serve_stdio(config: QuillConfig) -> Result<()> {
    tracing::info!("starting quill MCP server on stdio");

    let (db, vectors, config) = setup_shared_state(config)?;
    let tools = QuillTools::new(db, vectors, config);
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running, waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");
    Ok(())
}

/// Serve MCP over streamable HTTP.
pub async fn serve_http(config: QuillConfig) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!(addr = %bind_addr, "starting quill MCP server on HTTP");

    let (db, vectors, config) = setup_shared_state(config)?;

    let service = rmcp::transport::streamable_http_server::StreamableHttpService::new(
        move || Ok(QuillTools::new(db.clone(), vectors.clone(), config.clone())),
        rmcp::transport::streamable_http_server::session::local::LocalSessionManager::default()
            .into(),
        Default::default(),
    );

    let router = axum::Router::new().nest_service("/mcp", service);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("MCP server listening at http://{bind_addr}/mcp");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down HTTP server");
        })
        .await?;

    Ok(())
}
