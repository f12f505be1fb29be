//! File-backed context store using `tokio::fs`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::MetacogResult;

use super::{ContextStore, DEFAULT_USER_CONTEXT};

#[derive(Debug, Serialize, Deserialize)]
struct StoredContext {
    user_id: String,
    text: String,
}

/// Longest user id, in bytes, that is hex-encoded verbatim into a file name.
/// Longer ids are named by their SHA-256 digest.
const MAX_ENCODED_ID_BYTES: usize = 96;

/// One JSON document per user under `base_dir`.
///
/// User ids are hex-encoded into file names so arbitrary ids map to safe paths.
/// Long ids use a `sha256-` prefixed digest instead, which keeps every name
/// within common file-name limits.
pub struct FileContextStore {
    base_dir: PathBuf,
}

impl FileContextStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn user_path(&self, user_id: &str) -> PathBuf {
        let encoded: String = if user_id.len() <= MAX_ENCODED_ID_BYTES {
            user_id.bytes().map(|b| format!("{b:02x}")).collect()
        } else {
            let digest = Sha256::digest(user_id.as_bytes());
            let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
            format!("sha256-{hex}")
        };
        self.base_dir.join(format!("user_context_{encoded}.json"))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

#[async_trait]
impl ContextStore for FileContextStore {
    async fn get(&self, user_id: &str) -> MetacogResult<String> {
        let path = self.user_path(user_id);
        if !path.exists() {
            return Ok(DEFAULT_USER_CONTEXT.to_string());
        }
        let content = tokio::fs::read_to_string(&path).await?;
        let stored: StoredContext = serde_json::from_str(&content)?;
        Ok(stored.text)
    }

    async fn set(&self, user_id: &str, text: &str) -> MetacogResult<()> {
        tokio::fs::create_dir_all(&self.base_dir).await?;
        let stored = StoredContext {
            user_id: user_id.to_string(),
            text: text.to_string(),
        };
        let json = serde_json::to_string_pretty(&stored)?;

        // Renamed into place; readers never observe a partial document.
        let path = self.user_path(user_id);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}
