use std::collections::HashMap;
use std::sync::Arc;

use super::{
    InferenceStepType, ModelQueryStepType, ModelRevisionStepType, Step, StepBuildArgs, StepSchema,
    StepType, ToolStepType,
};
use crate::error::{MetacogError, MetacogResult};

/// Closure form of [`StepType::build`].
pub type StepBuildFn =
    Arc<dyn Fn(StepBuildArgs<'_>) -> MetacogResult<Box<dyn Step>> + Send + Sync>;

struct FnStepType {
    type_tag: String,
    schema: StepSchema,
    build_fn: StepBuildFn,
}

impl StepType for FnStepType {
    fn type_tag(&self) -> &str {
        &self.type_tag
    }

    fn schema(&self) -> StepSchema {
        self.schema.clone()
    }

    fn build(&self, args: StepBuildArgs<'_>) -> MetacogResult<Box<dyn Step>> {
        (self.build_fn)(args)
    }
}

/// Registry of step types, keyed by `type` tag.
///
/// Consulted when chains are loaded; every step config is validated against
/// its type's schema before the step is built.
pub struct StepRegistry {
    types: HashMap<String, Arc<dyn StepType>>,
}

impl StepRegistry {
    /// An empty registry. Most callers want [`StepRegistry::with_builtins`].
    pub fn new() -> Self {
        Self {
            types: HashMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(InferenceStepType));
        registry.register(Arc::new(ToolStepType));
        registry.register(Arc::new(ModelRevisionStepType));
        registry.register(Arc::new(ModelQueryStepType));
        registry
    }

    /// Register a step type; an existing type with the same tag is replaced.
    pub fn register(&mut self, step_type: Arc<dyn StepType>) {
        self.types
            .insert(step_type.type_tag().to_string(), step_type);
    }

    /// Register a step type from a schema and a build closure.
    pub fn register_fn<F>(&mut self, type_tag: impl Into<String>, schema: StepSchema, build: F)
    where
        F: Fn(StepBuildArgs<'_>) -> MetacogResult<Box<dyn Step>> + Send + Sync + 'static,
    {
        self.register(Arc::new(FnStepType {
            type_tag: type_tag.into(),
            schema,
            build_fn: Arc::new(build),
        }));
    }

    /// Validate `args.config` against its type's schema and build the step.
    pub fn construct(&self, args: StepBuildArgs<'_>) -> MetacogResult<Box<dyn Step>> {
        let type_tag = args.config.step_type();
        let step_type = self
            .types
            .get(type_tag)
            .ok_or_else(|| MetacogError::UnknownStepType {
                step: args.name.to_string(),
                type_tag: type_tag.to_string(),
            })?;

        step_type.schema().validate(args.name, args.config)?;
        step_type.build(args)
    }

    pub fn has(&self, type_tag: &str) -> bool {
        self.types.contains_key(type_tag)
    }

    pub fn schema(&self, type_tag: &str) -> Option<StepSchema> {
        self.types.get(type_tag).map(|t| t.schema())
    }

    pub fn type_tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.types.keys().map(|k| k.as_str()).collect();
        tags.sort_unstable();
        tags
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for StepRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
