//! Chains: ordered steps bound to one event.

use std::sync::Arc;

use crate::config::{ChainConfig, StepConfig};
use crate::context_model::UserModel;
use crate::error::{MetacogError, MetacogResult};
use crate::llm::LlmAdapter;
use crate::step::{Step, StepBuildArgs, StepRegistry};
use crate::tool::ToolRegistry;
use crate::types::{Event, Inputs, OutputKind};

/// Dependencies a chain's steps are built with.
#[derive(Clone, Copy)]
pub struct ChainDeps<'a> {
    pub registry: &'a StepRegistry,
    pub llm: &'a Arc<dyn LlmAdapter>,
    pub user_model: &'a UserModel,
    pub tools: &'a ToolRegistry,
}

/// An ordered sequence of steps, gated by conversation progress.
pub struct Chain {
    name: String,
    event: Event,
    output: OutputKind,
    min_completed_turns: usize,
    default_output: String,
    steps: Vec<Box<dyn Step>>,
}

impl Chain {
    pub fn new(
        name: impl Into<String>,
        event: Event,
        output: OutputKind,
        min_completed_turns: usize,
        default_output: impl Into<String>,
        steps: Vec<Box<dyn Step>>,
    ) -> Self {
        Self {
            name: name.into(),
            event,
            output,
            min_completed_turns,
            default_output: default_output.into(),
            steps,
        }
    }

    /// Build a chain from its document entry, constructing every step.
    pub fn from_config(
        name: &str,
        config: &ChainConfig,
        deps: ChainDeps<'_>,
    ) -> MetacogResult<Self> {
        let event: Event = config.event.parse()?;
        let output: OutputKind = config.output.parse()?;

        if config.steps.is_empty() {
            return Err(MetacogError::Config(format!("Chain '{name}' has no steps")));
        }

        let mut steps = Vec::with_capacity(config.steps.len());
        for (step_name, raw) in &config.steps {
            let step_config = StepConfig::from_value(step_name, raw)?;
            let step = deps.registry.construct(StepBuildArgs {
                name: step_name,
                config: &step_config,
                llm: deps.llm,
                user_model: deps.user_model,
                tools: deps.tools,
            })?;
            steps.push(step);
        }

        Ok(Self::new(
            name,
            event,
            output,
            config.min_completed_turns,
            config.default_output.clone(),
            steps,
        ))
    }

    /// Run the chain against `inputs`, recording each step's output under the
    /// step's name. Returns the last step's output, or the default output when
    /// the conversation has not reached `min_completed_turns`.
    pub async fn run(&self, inputs: &mut Inputs) -> MetacogResult<String> {
        if inputs.turns_completed() < self.min_completed_turns {
            tracing::debug!(
                chain = %self.name,
                turns_completed = inputs.turns_completed(),
                min_completed_turns = self.min_completed_turns,
                "chain gated"
            );
            return Ok(self.default_output.clone());
        }

        tracing::debug!(chain = %self.name, steps = self.steps.len(), "chain started");

        let mut result = String::new();
        for step in &self.steps {
            let output = step.execute(inputs).await.map_err(|e| {
                tracing::warn!(chain = %self.name, step = step.name(), error = %e, "step failed");
                e
            })?;
            tracing::debug!(
                chain = %self.name,
                step = step.name(),
                len = output.len(),
                "step completed"
            );
            inputs.insert(step.name(), output.clone());
            result = output;
        }

        Ok(result)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn event(&self) -> Event {
        self.event
    }

    pub fn output(&self) -> OutputKind {
        self.output
    }

    pub fn min_completed_turns(&self) -> usize {
        self.min_completed_turns
    }

    pub fn default_output(&self) -> &str {
        &self.default_output
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
