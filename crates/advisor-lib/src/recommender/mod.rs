//! Recommendation engine
//!
//! Builds the model request, interprets the answer, and falls back to the
//! threshold classifier whenever the answer is missing or unusable.

mod classify;
mod interpret;
mod pipeline;
mod prompt;

pub use classify::{classify, Classification, ClassificationRule, Classifier, Finding};
pub use interpret::{
    decode_response, extract_first_object, InterpretContext, Interpretation, Interpreter,
    ModelRecommendation,
};
pub use pipeline::{
    AnalysisPipeline, BatchOutcome, PipelineConfig, DEFAULT_MAX_CONCURRENCY, DEFAULT_MODEL_TIMEOUT,
};
pub use prompt::{build_prompt, PromptBuilder, PromptPayload, ResponseSchema, PROMPT_VERSION};

use async_trait::async_trait;

/// External text-generation model
///
/// Implementations may fail or hang; the pipeline bounds every call with a
/// timeout and routes failures to the rule-based fallback.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate free text answering the payload
    async fn generate(&self, payload: &PromptPayload) -> anyhow::Result<String>;

    /// Identifier used in logs
    fn name(&self) -> &str;
}
