//! Unified error taxonomy for codeqa
//!
//! Every component-boundary `Result` in the workspace resolves to
//! `CodeqaError`. Internal helpers may use `anyhow::Result` the way the
//! lower layers of the corpus this crate is built from do; they get
//! normalized to `CodeqaError` at the crate boundary.

/// Unified error type for the codeqa service.
#[derive(thiserror::Error, Debug)]
pub enum CodeqaError {
    /// Client-supplied input failed a pre-condition. Maps to HTTP 400.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A requested id was not present in the store. Maps to HTTP 404 / null.
    #[error("not found: {resource}")]
    NotFound { resource: String },

    /// The LLM/embedding provider failed. Propagated, not swallowed.
    #[error("provider error: {message}")]
    Provider { message: String },

    /// Persistence failure. Maps to a 5xx.
    #[error("store error: {message}")]
    Store { message: String },

    /// A tool threw during execution. Converted into an `Error:` tool
    /// result and fed back to the model; never surfaced to the caller
    /// directly.
    #[error("tool error: {message}")]
    Tool { message: String },

    /// The agent loop exhausted `MaxIterations` without a final answer.
    #[error("iteration budget exhausted after {iterations} iterations")]
    IterationBudgetExhausted { iterations: usize },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CodeqaError {
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found<S: Into<String>>(resource: S) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn provider<S: Into<String>>(message: S) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }

    pub fn store<S: Into<String>>(message: S) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    pub fn tool<S: Into<String>>(message: S) -> Self {
        Self::Tool {
            message: message.into(),
        }
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this error should be surfaced to the HTTP caller as-is
    /// (as opposed to folded into an `Error:` tool-result string).
    pub fn is_fatal_to_request(&self) -> bool {
        matches!(
            self,
            Self::Provider { .. } | Self::Store { .. } | Self::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CodeqaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_build_expected_variants() {
        assert!(matches!(CodeqaError::validation("x"), CodeqaError::Validation { .. }));
        assert!(matches!(CodeqaError::not_found("x"), CodeqaError::NotFound { .. }));
        assert!(matches!(CodeqaError::tool("x"), CodeqaError::Tool { .. }));
    }

    #[test]
    fn tool_and_validation_are_not_fatal_to_request() {
        assert!(!CodeqaError::tool("boom").is_fatal_to_request());
        assert!(!CodeqaError::validation("bad input").is_fatal_to_request());
        assert!(CodeqaError::provider("down").is_fatal_to_request());
        assert!(CodeqaError::store("down").is_fatal_to_request());
    }

    #[test]
    fn iteration_budget_exhausted_message_contains_count() {
        let e = CodeqaError::IterationBudgetExhausted { iterations: 10 };
        assert!(e.to_string().contains("10"));
    }
}
