//! Closure-backed LLM adapter, for hosts that already own a model client,
//! and for scripted models in tests.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::MetacogResult;
use crate::types::{ConversationHistory, Message};

use super::LlmAdapter;

/// A request handed to an [`LlmFn`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmRequest {
    pub system_prompt: Option<String>,
    pub messages: Vec<Message>,
}

/// Function type for LLM delegation.
pub type LlmFn = Arc<
    dyn Fn(LlmRequest) -> Pin<Box<dyn Future<Output = MetacogResult<String>> + Send>>
        + Send
        + Sync,
>;

/// Adapter that forwards every call to an [`LlmFn`].
#[derive(Clone)]
pub struct FnLlm {
    llm_fn: LlmFn,
}

impl FnLlm {
    pub fn new(llm_fn: LlmFn) -> Self {
        Self { llm_fn }
    }

    /// Wrap a plain async closure.
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(LlmRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = MetacogResult<String>> + Send + 'static,
    {
        Self::new(Arc::new(move |req| Box::pin(f(req))))
    }
}

#[async_trait::async_trait]
impl LlmAdapter for FnLlm {
    async fn inference(&self, prompt: &str) -> MetacogResult<String> {
        let request = LlmRequest {
            system_prompt: Some(prompt.to_string()),
            messages: Vec::new(),
        };
        (self.llm_fn)(request).await
    }

    async fn chat_inference(
        &self,
        history: &ConversationHistory,
        system_prompt: Option<&str>,
    ) -> MetacogResult<String> {
        let request = LlmRequest {
            system_prompt: system_prompt.map(str::to_string),
            messages: history.messages.clone(),
        };
        (self.llm_fn)(request).await
    }
}
