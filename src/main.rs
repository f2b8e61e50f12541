//! `codeqa` service entrypoint (§6.1), grounded on the
//! `rag-api-server` example's `main.rs`: load configuration, wire the
//! shared `AppState`, build the router, and serve.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use config::Config;
use llm::LlmClient;
use react::ReactAgent;
use retriever::HybridRetriever;
use server::AppState;
use session::ConversationService;
use store::MemoryStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,codeqa=debug".to_string()),
        )
        .init();

    info!("starting codeqa");

    let config = Config::load()?;
    info!(
        chat_model = %config.chat_model,
        embedding_model = %config.embedding_model,
        "configuration loaded"
    );

    let model: Arc<dyn llm::LanguageModel> = Arc::new(LlmClient::new(llm::LlmConfig {
        api_base: config.provider_endpoint.clone(),
        api_key: config.provider_key.clone().unwrap_or_default(),
        chat_model: config.chat_model.clone(),
        embedding_model: config.embedding_model.clone(),
        ..llm::LlmConfig::default()
    })?);

    // The store connection string selects the backing engine; only the
    // in-process reference store is implemented here (§4.2/§E4). A
    // networked store is a drop-in behind the same `Store` trait.
    let store: Arc<dyn store::Store> = Arc::new(MemoryStore::new());

    let embedding = Arc::new(embedding::EmbeddingService::new(model.clone()));
    let retriever = Arc::new(HybridRetriever::new(store.clone(), embedding.clone()));
    let tools = Arc::new(tools::default_registry());
    let conversations = Arc::new(ConversationService::new(store.clone()));
    let agent = Arc::new(ReactAgent::new(
        model.clone(),
        store.clone(),
        retriever.clone(),
        tools,
        conversations.clone(),
    ));

    let state = AppState {
        config: Arc::new(config.clone()),
        store,
        model,
        retriever,
        embedding,
        agent,
        conversations,
    };

    let app = server::build_router(state);

    let addr: SocketAddr = std::env::var("CODEQA_BIND_ADDR")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8080)));

    info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
