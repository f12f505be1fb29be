use crate::error::MetacogResult;
use crate::types::ConversationHistory;

/// Core LLM adapter trait: the only way steps and the context model reach a
/// language model.
///
/// Both calls may suspend; failures surface as provider errors and are never
/// retried by the pipeline.
#[async_trait::async_trait]
pub trait LlmAdapter: Send + Sync {
    /// Single-shot inference: `prompt` is sent as one system message.
    async fn inference(&self, prompt: &str) -> MetacogResult<String>;

    /// Chat inference over a whole conversation, with an optional system
    /// prompt prepended.
    async fn chat_inference(
        &self,
        history: &ConversationHistory,
        system_prompt: Option<&str>,
    ) -> MetacogResult<String>;
}
