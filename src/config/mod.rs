//! Pipeline documents.
//!
//! Format:
//! ```text
//! chains:
//!   voe:
//!     event: on_user_message
//!     output: agent_context
//!     min_completed_turns: 1
//!     default_output: ""
//!     steps:
//!       thought:
//!         type: inference
//!         prompt: "..."
//! ```
//! The `chains` mapping may also be nested under a top-level `metacognition`
//! key. Chain and step order is declaration order.

#[cfg(feature = "native")]
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{MetacogError, MetacogResult};

/// A whole pipeline document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub chains: IndexMap<String, ChainConfig>,
}

/// One chain as written in the document. Tags are validated when the chain
/// is loaded, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub event: String,
    pub output: String,
    #[serde(default)]
    pub min_completed_turns: usize,
    #[serde(default)]
    pub default_output: String,
    pub steps: IndexMap<String, serde_json::Value>,
}

impl PipelineConfig {
    pub fn from_yaml_str(content: &str) -> MetacogResult<Self> {
        let doc: serde_json::Value = serde_yaml::from_str(content)?;
        Self::from_value(doc)
    }

    pub fn from_json_str(content: &str) -> MetacogResult<Self> {
        let doc: serde_json::Value = serde_json::from_str(content)
            .map_err(|e| MetacogError::Config(format!("Invalid JSON pipeline document: {e}")))?;
        Self::from_value(doc)
    }

    /// Load a document from disk; `.json` files are read as JSON, anything
    /// else as YAML.
    #[cfg(feature = "native")]
    pub async fn from_file(path: impl AsRef<Path>) -> MetacogResult<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    pub fn from_value(doc: serde_json::Value) -> MetacogResult<Self> {
        let doc = match doc {
            serde_json::Value::Object(mut map)
                if !map.contains_key("chains") && map.contains_key("metacognition") =>
            {
                map.remove("metacognition").unwrap_or_default()
            }
            other => other,
        };

        serde_json::from_value(doc)
            .map_err(|e| MetacogError::Config(format!("Invalid pipeline document: {e}")))
    }

    pub fn chain_names(&self) -> Vec<&str> {
        self.chains.keys().map(|k| k.as_str()).collect()
    }
}

/// Configuration for one step: its `type` tag plus string fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepConfig {
    step_type: String,
    fields: IndexMap<String, String>,
}

impl StepConfig {
    pub fn new(step_type: impl Into<String>) -> Self {
        Self {
            step_type: step_type.into(),
            fields: IndexMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Parse the raw mapping for step `step_name`. Scalars are stringified;
    /// nested sequences and mappings are rejected. A field with no value is
    /// left out, so schema validation treats it as missing.
    pub fn from_value(step_name: &str, raw: &serde_json::Value) -> MetacogResult<Self> {
        let map = raw.as_object().ok_or_else(|| MetacogError::InvalidStepField {
            step: step_name.to_string(),
            field: "type".into(),
            message: "step config must be a mapping".into(),
        })?;

        let step_type = match map.get("type") {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(_) => {
                return Err(MetacogError::InvalidStepField {
                    step: step_name.to_string(),
                    field: "type".into(),
                    message: "must be a string".into(),
                })
            }
            None => {
                return Err(MetacogError::MissingStepField {
                    step: step_name.to_string(),
                    field: "type".into(),
                })
            }
        };

        let mut fields = IndexMap::new();
        for (key, value) in map.iter().filter(|(k, _)| k.as_str() != "type") {
            let text = match value {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                serde_json::Value::Null => continue,
                serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                    return Err(MetacogError::InvalidStepField {
                        step: step_name.to_string(),
                        field: key.clone(),
                        message: "must be a scalar".into(),
                    })
                }
            };
            fields.insert(key.clone(), text);
        }

        Ok(Self { step_type, fields })
    }

    pub fn step_type(&self) -> &str {
        &self.step_type
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(|v| v.as_str())
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }
}
