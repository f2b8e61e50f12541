use serde::{Deserialize, Serialize};

/// Provider connection settings (§6.4, `LlmConfig`). Generalizes the
/// teacher's `LLMConfig` with an embedding model name and an endpoint
/// path split, since one provider base URL serves both chat and embed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub api_base: String,
    pub api_key: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub temperature: f32,
    pub max_tokens: Option<usize>,
    pub timeout_secs: u64,
    pub max_retries: usize,
    pub retry_delay_ms: u64,
    /// Provider caps the number of inputs per embed request; batches
    /// larger than this are split transparently (§4.1).
    pub embed_batch_limit: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            chat_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            temperature: 0.2,
            max_tokens: None,
            timeout_secs: 120,
            max_retries: 3,
            retry_delay_ms: 1000,
            embed_batch_limit: 96,
        }
    }
}

impl LlmConfig {
    pub fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }

    pub fn embeddings_url(&self) -> String {
        format!("{}/embeddings", self.api_base.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_retry_and_batch_limits() {
        let cfg = LlmConfig::default();
        assert!(cfg.max_retries >= 1);
        assert!(cfg.embed_batch_limit > 0);
    }

    #[test]
    fn urls_strip_trailing_slash() {
        let mut cfg = LlmConfig::default();
        cfg.api_base = "https://example.com/v1/".to_string();
        assert_eq!(cfg.chat_url(), "https://example.com/v1/chat/completions");
        assert_eq!(cfg.embeddings_url(), "https://example.com/v1/embeddings");
    }
}
