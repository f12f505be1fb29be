use std::sync::Arc;

use async_trait::async_trait;

use super::{Step, StepBuildArgs, StepSchema, StepType};
use crate::error::MetacogResult;
use crate::llm::LlmAdapter;
use crate::template::PromptTemplate;
use crate::types::Inputs;

/// Renders a prompt and returns the LLM's raw response.
pub struct InferenceStep {
    name: String,
    prompt: PromptTemplate,
    llm: Arc<dyn LlmAdapter>,
}

impl InferenceStep {
    pub fn new(name: impl Into<String>, prompt: PromptTemplate, llm: Arc<dyn LlmAdapter>) -> Self {
        Self {
            name: name.into(),
            prompt,
            llm,
        }
    }
}

#[async_trait]
impl Step for InferenceStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_tag(&self) -> &str {
        InferenceStepType::TAG
    }

    async fn execute(&self, inputs: &Inputs) -> MetacogResult<String> {
        let prompt = self.prompt.format(inputs)?;
        self.llm.inference(&prompt).await
    }
}

pub struct InferenceStepType;

impl InferenceStepType {
    pub const TAG: &'static str = "inference";
}

impl StepType for InferenceStepType {
    fn type_tag(&self) -> &str {
        Self::TAG
    }

    fn schema(&self) -> StepSchema {
        StepSchema::new().required("prompt")
    }

    fn build(&self, args: StepBuildArgs<'_>) -> MetacogResult<Box<dyn Step>> {
        Ok(Box::new(InferenceStep::new(
            args.name,
            args.template("prompt")?,
            Arc::clone(args.llm),
        )))
    }
}
