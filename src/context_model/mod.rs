//! Per-user context model: a slowly evolving paragraph describing what the
//! agent knows about a user.
//!
//! Storage is pluggable through [`ContextStore`]; the paragraph itself is
//! revised and queried through an LLM by [`ContextModel`].

mod memory;
pub use memory::InMemoryContextStore;

#[cfg(feature = "native")]
mod file;
#[cfg(feature = "native")]
pub use file::FileContextStore;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::MetacogResult;
use crate::llm::LlmAdapter;
use crate::template::PromptTemplate;

/// Value returned for users with no stored context yet
pub const DEFAULT_USER_CONTEXT: &str = "none, new user";

/// Where context paragraphs live.
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Current paragraph for `user_id`, or [`DEFAULT_USER_CONTEXT`].
    async fn get(&self, user_id: &str) -> MetacogResult<String>;

    /// Replace the paragraph for `user_id`.
    async fn set(&self, user_id: &str, text: &str) -> MetacogResult<()>;
}

const REVISION_PROMPT: &str = r#"You are trying to optimize the behaviour of an AI agent that is interacting with a user.
You are trying to do so by maintaining a paragraph of context describing the user's goals in their interaction with the agent, in order to provide the agent the context it needs to most effectively help the user.

Here is your current user context description:
"{user_context}"

Here is an insight about the user:
"{insight}"

Respond with a revised paragraph describing the user's goals and context based on this insight. Try not to remove content when possible."#;

const QUERY_PROMPT: &str = r#"You are trying to optimize the behaviour of an AI agent that is interacting with a user.
You are trying to do so by maintaining a paragraph of context describing the user's goals in their interaction with the agent, in order to provide the agent the context it needs to most effectively help the user.

Here is your current user context description:
"{user_context}"

You have been given this query about the user:
"{query}"

(If the current user context paragraph doesn't contain the information you need, stating that it might be helpful to ask the user a particular question to gain that information would be acceptable!)

Now write a concise response to the query using the information in the user context description.
"#;

/// LLM-maintained paragraph model over a [`ContextStore`].
pub struct ContextModel {
    llm: Arc<dyn LlmAdapter>,
    store: Arc<dyn ContextStore>,
    revision_prompt: PromptTemplate,
    query_prompt: PromptTemplate,
}

impl ContextModel {
    pub fn new(llm: Arc<dyn LlmAdapter>, store: Arc<dyn ContextStore>) -> MetacogResult<Self> {
        Ok(Self {
            llm,
            store,
            revision_prompt: PromptTemplate::parse(REVISION_PROMPT)?,
            query_prompt: PromptTemplate::parse(QUERY_PROMPT)?,
        })
    }

    /// Override the revision prompt. It may reference `{user_context}` and `{insight}`.
    pub fn with_revision_prompt(mut self, template: &str) -> MetacogResult<Self> {
        self.revision_prompt = PromptTemplate::parse(template)?;
        Ok(self)
    }

    /// Override the query prompt. It may reference `{user_context}` and `{query}`.
    pub fn with_query_prompt(mut self, template: &str) -> MetacogResult<Self> {
        self.query_prompt = PromptTemplate::parse(template)?;
        Ok(self)
    }

    /// Raw paragraph for a user
    pub async fn current(&self, user_id: &str) -> MetacogResult<String> {
        self.store.get(user_id).await
    }

    /// Fold `insight` into the user's paragraph.
    pub async fn revise(&self, user_id: &str, insight: &str) -> MetacogResult<()> {
        let user_context = self.store.get(user_id).await?;
        let prompt = self.revision_prompt.render(
            |key| match key {
                "user_context" => Some(user_context.as_str()),
                "insight" => Some(insight),
                _ => None,
            },
            true,
        )?;

        let revised = self.llm.inference(&prompt).await?;
        self.store.set(user_id, &revised).await?;
        tracing::debug!(user_id, len = revised.len(), "context model revised");
        Ok(())
    }

    /// Answer `query` from the user's paragraph.
    pub async fn query(&self, user_id: &str, query: &str) -> MetacogResult<String> {
        let user_context = self.store.get(user_id).await?;
        let prompt = self.query_prompt.render(
            |key| match key {
                "user_context" => Some(user_context.as_str()),
                "query" => Some(query),
                _ => None,
            },
            true,
        )?;
        self.llm.inference(&prompt).await
    }

    /// Handle bound to one user
    pub fn for_user(self: &Arc<Self>, user_id: impl Into<String>) -> UserModel {
        UserModel {
            user_id: user_id.into(),
            model: Arc::clone(self),
        }
    }
}

/// A [`ContextModel`] scoped to a single user. Steps are built with these.
#[derive(Clone)]
pub struct UserModel {
    user_id: String,
    model: Arc<ContextModel>,
}

impl UserModel {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub async fn current(&self) -> MetacogResult<String> {
        self.model.current(&self.user_id).await
    }

    pub async fn revise(&self, insight: &str) -> MetacogResult<()> {
        self.model.revise(&self.user_id, insight).await
    }

    pub async fn query(&self, query: &str) -> MetacogResult<String> {
        self.model.query(&self.user_id, query).await
    }
}
