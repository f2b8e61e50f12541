//! Agent orchestrator (C7, §4.7).
//!
//! Drives the bounded tool-calling loop over C1/C6, grounding the final
//! answer through the citation service (C8) before returning it.

mod orchestrator;
mod types;

pub use orchestrator::ReactAgent;
pub use types::{AgentResponse, AskMode, EventType, ReasoningStep, StreamEvent, MAX_ITERATIONS, MAX_STREAM_CITATIONS};
