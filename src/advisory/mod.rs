//! AI agronomist advice: prompt construction, text generation and parsing
//! of the reply into advice sections.

pub mod parser;
pub mod prompt;

#[cfg(feature = "api")]
pub mod gateway;
#[cfg(feature = "api")]
pub mod gemini;

pub use parser::{parse_advice, Advice, AdviceSection};
pub use prompt::build_prompt;

#[cfg(feature = "api")]
pub use gateway::AdvisoryGateway;
#[cfg(feature = "api")]
pub use gemini::GeminiClient;

/// External text-generation backend
#[cfg(feature = "api")]
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, crate::error::GenerationError>;
}
