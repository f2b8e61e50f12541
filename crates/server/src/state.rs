use std::sync::Arc;

use config::Config;
use embedding::EmbeddingService;
use llm::LanguageModel;
use react::ReactAgent;
use retriever::HybridRetriever;
use session::ConversationService;
use store::Store;

/// Shared application state (grounded on the `rag-api-server` example's
/// `AppState`), built once at startup and cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn Store>,
    pub model: Arc<dyn LanguageModel>,
    pub retriever: Arc<HybridRetriever>,
    pub embedding: Arc<EmbeddingService>,
    pub agent: Arc<ReactAgent>,
    pub conversations: Arc<ConversationService>,
}
