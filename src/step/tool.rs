use std::sync::Arc;

use async_trait::async_trait;

use super::{Step, StepBuildArgs, StepSchema, StepType};
use crate::error::{MetacogError, MetacogResult};
use crate::template::PromptTemplate;
use crate::tool::Tool;
use crate::types::Inputs;

/// Renders its input template and hands the result to a tool.
pub struct ToolStep {
    name: String,
    input: PromptTemplate,
    tool: Arc<dyn Tool>,
}

impl ToolStep {
    pub fn new(name: impl Into<String>, input: PromptTemplate, tool: Arc<dyn Tool>) -> Self {
        Self {
            name: name.into(),
            input,
            tool,
        }
    }

    pub fn tool_name(&self) -> &str {
        self.tool.name()
    }
}

#[async_trait]
impl Step for ToolStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_tag(&self) -> &str {
        ToolStepType::TAG
    }

    async fn execute(&self, inputs: &Inputs) -> MetacogResult<String> {
        let input = self.input.format(inputs)?;
        self.tool.call(&input).await
    }
}

/// `tool` steps. The tool is looked up by the optional `tool` field, falling
/// back to the step name.
pub struct ToolStepType;

impl ToolStepType {
    pub const TAG: &'static str = "tool";
}

impl StepType for ToolStepType {
    fn type_tag(&self) -> &str {
        Self::TAG
    }

    fn schema(&self) -> StepSchema {
        StepSchema::new().required("input").optional("tool")
    }

    fn build(&self, args: StepBuildArgs<'_>) -> MetacogResult<Box<dyn Step>> {
        let tool_name = args.config.get("tool").unwrap_or(args.name);
        let tool = args
            .tools
            .get(tool_name)
            .ok_or_else(|| MetacogError::ToolNotRegistered {
                step: args.name.to_string(),
                tool: tool_name.to_string(),
            })?;

        Ok(Box::new(ToolStep::new(args.name, args.template("input")?, tool)))
    }
}
