use async_trait::async_trait;

use super::{Step, StepBuildArgs, StepSchema, StepType};
use crate::context_model::UserModel;
use crate::error::MetacogResult;
use crate::template::PromptTemplate;
use crate::types::Inputs;

// ─── Revision ───────────────────────────────────────────────────────────────

/// Folds a rendered insight into the user's context model and returns the
/// insight unchanged.
pub struct ModelRevisionStep {
    name: String,
    insight: PromptTemplate,
    user_model: UserModel,
}

impl ModelRevisionStep {
    pub fn new(name: impl Into<String>, insight: PromptTemplate, user_model: UserModel) -> Self {
        Self {
            name: name.into(),
            insight,
            user_model,
        }
    }
}

#[async_trait]
impl Step for ModelRevisionStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_tag(&self) -> &str {
        ModelRevisionStepType::TAG
    }

    async fn execute(&self, inputs: &Inputs) -> MetacogResult<String> {
        let insight = self.insight.format(inputs)?;
        self.user_model.revise(&insight).await?;
        Ok(insight)
    }
}

pub struct ModelRevisionStepType;

impl ModelRevisionStepType {
    pub const TAG: &'static str = "user_model_revision";
}

impl StepType for ModelRevisionStepType {
    fn type_tag(&self) -> &str {
        Self::TAG
    }

    fn schema(&self) -> StepSchema {
        StepSchema::new().required("insight")
    }

    fn build(&self, args: StepBuildArgs<'_>) -> MetacogResult<Box<dyn Step>> {
        Ok(Box::new(ModelRevisionStep::new(
            args.name,
            args.template("insight")?,
            args.user_model.clone(),
        )))
    }
}

// ─── Query ──────────────────────────────────────────────────────────────────

/// Answers a rendered query from the user's context model.
pub struct ModelQueryStep {
    name: String,
    query: PromptTemplate,
    user_model: UserModel,
}

impl ModelQueryStep {
    pub fn new(name: impl Into<String>, query: PromptTemplate, user_model: UserModel) -> Self {
        Self {
            name: name.into(),
            query,
            user_model,
        }
    }
}

#[async_trait]
impl Step for ModelQueryStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_tag(&self) -> &str {
        ModelQueryStepType::TAG
    }

    async fn execute(&self, inputs: &Inputs) -> MetacogResult<String> {
        let query = self.query.format(inputs)?;
        self.user_model.query(&query).await
    }
}

pub struct ModelQueryStepType;

impl ModelQueryStepType {
    pub const TAG: &'static str = "user_model_query";
}

impl StepType for ModelQueryStepType {
    fn type_tag(&self) -> &str {
        Self::TAG
    }

    fn schema(&self) -> StepSchema {
        StepSchema::new().required("query")
    }

    fn build(&self, args: StepBuildArgs<'_>) -> MetacogResult<Box<dyn Step>> {
        Ok(Box::new(ModelQueryStep::new(
            args.name,
            args.template("query")?,
            args.user_model.clone(),
        )))
    }
}
