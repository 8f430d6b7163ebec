//! Process bootstrap: load configuration, wire the provider/tool/store
//! singletons, and serve the HTTP surface (§6).
//!
//! Grounded on the teacher's `llmspell-cli/src/main.rs` bootstrap shape:
//! parse CLI flags, set up tracing from `RUST_LOG` (falling back to a
//! default level), load configuration, then hand off to the rest of the
//! process.

use std::sync::Arc;

use clap::Parser;
use scholarly_agent::AgentService;
use scholarly_config::ProcessConfig;
use scholarly_core::error::Result;
use scholarly_providers::{FakeProvider, ProviderRegistry};
use scholarly_search::InMemorySearchIndex;
use scholarly_server::cli::Args;
use scholarly_server::embedder::HashEmbedder;
use scholarly_server::state::AppState;
use scholarly_store::{ConversationStore, InMemoryConversationStore, PostgresConversationStore};
use scholarly_tools::{HttpWebSearchClient, ListPapersTool, RetrieveChunksTool, ToolRegistry, WebSearchTool};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    setup_tracing();

    let args = Args::parse();
    let mut config = ProcessConfig::load()?;
    if let Some(port) = args.port {
        config.http_port = port;
    }
    if let Some(database_url) = args.database_url {
        config.database_url = database_url;
    }
    let config = Arc::new(config);

    tracing::info!(port = config.http_port, "starting scholarly-server");

    let store: Arc<dyn ConversationStore> = if args.in_memory_store {
        Arc::new(InMemoryConversationStore::new())
    } else {
        Arc::new(PostgresConversationStore::connect(&config.database_url).await?)
    };

    let embedder = Arc::new(HashEmbedder::new(config.embedding_dimension));
    let index = Arc::new(InMemorySearchIndex::new(embedder));

    let mut tools = ToolRegistry::new();
    tools.register(Arc::new(RetrieveChunksTool::new(index.clone())));
    tools.register(Arc::new(ListPapersTool::new(index)));
    let web_search_client = Box::new(HttpWebSearchClient::new(
        std::env::var("SCHOLARLY_WEB_SEARCH_ENDPOINT")
            .unwrap_or_else(|_| "https://example-search.invalid/search".to_string()),
        std::env::var("SCHOLARLY_WEB_SEARCH_API_KEY").ok(),
    ));
    tools.register(Arc::new(WebSearchTool::new(web_search_client)));

    let mut providers = ProviderRegistry::new();
    providers.register(Arc::new(FakeProvider::new("fake")));
    providers.set_default("fake");

    let agent = AgentService::new(Arc::new(providers), Arc::new(tools), store.clone());

    let state = AppState {
        agent,
        store,
        config: config.clone(),
    };
    let app = scholarly_server::routes::router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.http_port))
        .await
        .map_err(|e| scholarly_core::error::Error::Configuration(e.to_string()))?;
    let addr = listener
        .local_addr()
        .map_err(|e| scholarly_core::error::Error::Internal(e.to_string()))?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| scholarly_core::error::Error::Internal(e.to_string()))?;

    Ok(())
}

/// Tracing via `RUST_LOG`, falling back to `info` (§1 ambient stack:
/// "structured logging via `tracing` spans").
fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();
}
