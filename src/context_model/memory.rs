//! In-memory context store for tests and single-process hosts.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::MetacogResult;

use super::{ContextStore, DEFAULT_USER_CONTEXT};

/// Context paragraphs held in a concurrent map; lost on restart.
#[derive(Default)]
pub struct InMemoryContextStore {
    paragraphs: DashMap<String, String>,
}

impl InMemoryContextStore {
    pub fn new() -> Self {
        Self {
            paragraphs: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.paragraphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }
}

#[async_trait]
impl ContextStore for InMemoryContextStore {
    async fn get(&self, user_id: &str) -> MetacogResult<String> {
        Ok(self
            .paragraphs
            .get(user_id)
            .map(|r| r.value().clone())
            .unwrap_or_else(|| DEFAULT_USER_CONTEXT.to_string()))
    }

    async fn set(&self, user_id: &str, text: &str) -> MetacogResult<()> {
        self.paragraphs.insert(user_id.to_string(), text.to_string());
        Ok(())
    }
}
