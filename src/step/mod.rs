//! Steps, the unit of pipeline work.
//!
//! A [`Step`] is built once, at chain-load time, by the [`StepType`] registered
//! under its config's `type` tag. Built-in types:
//! - `inference`: render `prompt` and send it to the LLM
//! - `tool`: render `input` and pass it to a registered tool
//! - `user_model_revision`: render `insight` and fold it into the user's context model
//! - `user_model_query`: render `query` and answer it from the user's context model

mod inference;
mod registry;
mod tool;
mod user_model;

pub use inference::{InferenceStep, InferenceStepType};
pub use registry::{StepBuildFn, StepRegistry};
pub use tool::{ToolStep, ToolStepType};
pub use user_model::{ModelQueryStep, ModelQueryStepType, ModelRevisionStep, ModelRevisionStepType};

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::StepConfig;
use crate::context_model::UserModel;
use crate::error::{MetacogError, MetacogResult};
use crate::llm::LlmAdapter;
use crate::template::PromptTemplate;
use crate::tool::ToolRegistry;
use crate::types::Inputs;

/// A constructed step, owned by its chain.
#[async_trait]
pub trait Step: Send + Sync {
    /// Key the step's output is recorded under in the chain inputs
    fn name(&self) -> &str;

    /// Type tag the step was built from
    fn type_tag(&self) -> &str;

    async fn execute(&self, inputs: &Inputs) -> MetacogResult<String>;
}

/// Fields a step type accepts, besides `type`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepSchema {
    pub required: Vec<String>,
    pub optional: Vec<String>,
}

impl StepSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, field: impl Into<String>) -> Self {
        self.required.push(field.into());
        self
    }

    pub fn optional(mut self, field: impl Into<String>) -> Self {
        self.optional.push(field.into());
        self
    }

    /// Check `config` for missing required fields and fields the schema
    /// does not know.
    pub fn validate(&self, step_name: &str, config: &StepConfig) -> MetacogResult<()> {
        if let Some(missing) = self.required.iter().find(|f| config.get(f).is_none()) {
            return Err(MetacogError::MissingStepField {
                step: step_name.to_string(),
                field: missing.clone(),
            });
        }

        let known = |f: &str| self.required.iter().chain(&self.optional).any(|k| k == f);
        if let Some(unknown) = config.field_names().find(|f| !known(*f)) {
            return Err(MetacogError::InvalidStepField {
                step: step_name.to_string(),
                field: unknown.to_string(),
                message: format!("not accepted by step type '{}'", config.step_type()),
            });
        }

        Ok(())
    }
}

/// Everything a step type may bind into a step it builds.
pub struct StepBuildArgs<'a> {
    pub name: &'a str,
    pub config: &'a StepConfig,
    pub llm: &'a Arc<dyn LlmAdapter>,
    pub user_model: &'a UserModel,
    pub tools: &'a ToolRegistry,
}

impl StepBuildArgs<'_> {
    /// A required field, already checked by the schema.
    pub fn field(&self, field: &str) -> MetacogResult<&str> {
        self.config
            .get(field)
            .ok_or_else(|| MetacogError::MissingStepField {
                step: self.name.to_string(),
                field: field.to_string(),
            })
    }

    /// Parse a required field as a prompt template.
    pub fn template(&self, field: &str) -> MetacogResult<PromptTemplate> {
        PromptTemplate::parse(self.field(field)?)
    }
}

/// Constructor and schema for one step type tag.
pub trait StepType: Send + Sync {
    fn type_tag(&self) -> &str;

    fn schema(&self) -> StepSchema;

    /// Build a step. Called only after `schema().validate(..)` has passed.
    fn build(&self, args: StepBuildArgs<'_>) -> MetacogResult<Box<dyn Step>>;
}
