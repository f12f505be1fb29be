use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::error::{MetacogError, MetacogResult};
use crate::types::{ConversationHistory, Role};

use super::traits::LlmAdapter;

const DEFAULT_MODEL: &str = "gpt-4";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Chat Completions adapter (non-streaming).
pub struct OpenAiAdapter {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout_secs: u64,
}

impl OpenAiAdapter {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: "https://api.openai.com".into(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Read the key from `OPENAI_API_KEY`.
    pub fn from_env() -> MetacogResult<Self> {
        let key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| MetacogError::Config("OPENAI_API_KEY is not set".into()))?;
        Ok(Self::new(key))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_body(&self, messages: Vec<serde_json::Value>) -> serde_json::Value {
        json!({
            "model": self.model,
            "messages": messages,
        })
    }

    fn history_to_api(
        history: &ConversationHistory,
        system_prompt: Option<&str>,
    ) -> Vec<serde_json::Value> {
        let mut api_messages = Vec::with_capacity(history.len() + 1);
        if let Some(system) = system_prompt.filter(|s| !s.is_empty()) {
            api_messages.push(json!({"role": "system", "content": system}));
        }
        for msg in &history.messages {
            let role = match msg.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            api_messages.push(json!({"role": role, "content": msg.content}));
        }
        api_messages
    }

    fn extract_content(data: &serde_json::Value) -> MetacogResult<String> {
        data.get("choices")
            .and_then(|v| v.as_array())
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|content| content.as_str())
            .map(str::to_string)
            .ok_or_else(|| MetacogError::Provider("OpenAI response has no message content".into()))
    }

    async fn complete(&self, messages: Vec<serde_json::Value>) -> MetacogResult<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = self.build_body(messages);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .timeout(Duration::from_secs(self.timeout_secs))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, model = %self.model, "OpenAI API error");
            return Err(MetacogError::Provider(format!(
                "OpenAI API error {status}: {body}"
            )));
        }

        let data: serde_json::Value = response.json().await.map_err(|e| self.map_send_error(e))?;
        Self::extract_content(&data)
    }

    fn map_send_error(&self, err: reqwest::Error) -> MetacogError {
        if err.is_timeout() {
            MetacogError::Timeout {
                seconds: self.timeout_secs,
            }
        } else {
            MetacogError::Http(err)
        }
    }
}

#[async_trait]
impl LlmAdapter for OpenAiAdapter {
    async fn inference(&self, prompt: &str) -> MetacogResult<String> {
        self.complete(vec![json!({"role": "system", "content": prompt})])
            .await
    }

    async fn chat_inference(
        &self,
        history: &ConversationHistory,
        system_prompt: Option<&str>,
    ) -> MetacogResult<String> {
        self.complete(Self::history_to_api(history, system_prompt))
            .await
    }
}
