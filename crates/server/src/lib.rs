//! HTTP+SSE transport (§6.1/§6.2), enriched from the `rag-api-server`
//! example since the teacher has no matching axum surface: its own
//! `server` module is JSON-RPC shaped, not HTTP+JSON/SSE.

mod api_error;
mod handlers;
mod state;

pub use api_error::ApiError;
pub use state::AppState;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Builds the full router: `/api/agent/*` and `/api/ingestion/*`, with
/// CORS (scoped to the configured frontend origin) and request tracing
/// layered the way `rag-api-server`'s `build_router` does.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(
            state
                .config
                .frontend_origin
                .parse::<axum::http::HeaderValue>()
                .unwrap_or_else(|_| axum::http::HeaderValue::from_static("*")),
        )
        .allow_methods(Any)
        .allow_headers(Any);

    let agent_routes = Router::new()
        .route("/api/agent/chat", post(handlers::agent::chat))
        .route("/api/agent/chat/stream", post(handlers::agent::chat_stream))
        .route(
            "/api/agent/conversations/{id}",
            get(handlers::agent::get_conversation).delete(handlers::agent::delete_conversation),
        );

    let ingestion_routes = Router::new()
        .route(
            "/api/ingestion/repositories",
            get(handlers::ingestion::list_repositories).post(handlers::ingestion::create_repository),
        )
        .route(
            "/api/ingestion/repositories/{id}",
            get(handlers::ingestion::get_repository).delete(handlers::ingestion::delete_repository),
        )
        .route(
            "/api/ingestion/repositories/{id}/stats",
            get(handlers::ingestion::repository_stats),
        );

    Router::new()
        .merge(agent_routes)
        .merge(ingestion_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
