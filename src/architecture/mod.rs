//! Architecture: a validated pipeline plus everything needed to build a
//! [`Manager`] for any user.

#[cfg(feature = "native")]
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::chain::ChainDeps;
use crate::config::PipelineConfig;
use crate::context_model::{ContextModel, ContextStore, InMemoryContextStore};
use crate::error::MetacogResult;
use crate::llm::LlmAdapter;
use crate::manager::Manager;
use crate::step::StepRegistry;
use crate::tool::ToolRegistry;

/// Run-wide settings outside the chain document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchitectureSettings {
    /// Returned by `get_context` when no chain produced agent context
    #[serde(default)]
    pub default_agent_context: String,
}

const VALIDATION_USER: &str = "__validation__";

pub struct Architecture {
    config: PipelineConfig,
    registry: Arc<StepRegistry>,
    llm: Arc<dyn LlmAdapter>,
    tools: Arc<ToolRegistry>,
    context_model: Arc<ContextModel>,
    settings: ArchitectureSettings,
}

impl std::fmt::Debug for Architecture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Architecture")
            .field("chains", &self.config.chain_names())
            .field("step_types", &self.registry.type_tags())
            .field("tools", &self.tools.names())
            .field("settings", &self.settings)
            .finish()
    }
}

impl Architecture {
    pub fn builder(llm: Arc<dyn LlmAdapter>) -> ArchitectureBuilder {
        ArchitectureBuilder::new(llm)
    }

    /// A fresh manager whose steps are bound to `user_id`.
    pub fn manager_for(&self, user_id: &str) -> MetacogResult<Manager> {
        let user_model = self.context_model.for_user(user_id);
        let deps = ChainDeps {
            registry: &self.registry,
            llm: &self.llm,
            user_model: &user_model,
            tools: &self.tools,
        };
        Manager::load_from_config(
            user_id,
            &self.config,
            deps,
            self.settings.default_agent_context.clone(),
        )
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn context_model(&self) -> &Arc<ContextModel> {
        &self.context_model
    }

    pub fn settings(&self) -> &ArchitectureSettings {
        &self.settings
    }
}

/// Assembles an [`Architecture`]. Every chain is built once during
/// `build*`, so configuration errors surface there.
pub struct ArchitectureBuilder {
    llm: Arc<dyn LlmAdapter>,
    registry: Option<StepRegistry>,
    tools: ToolRegistry,
    store: Option<Arc<dyn ContextStore>>,
    context_model: Option<Arc<ContextModel>>,
    settings: ArchitectureSettings,
}

impl ArchitectureBuilder {
    pub fn new(llm: Arc<dyn LlmAdapter>) -> Self {
        Self {
            llm,
            registry: None,
            tools: ToolRegistry::new(),
            store: None,
            context_model: None,
            settings: ArchitectureSettings::default(),
        }
    }

    /// Replace the step registry (defaults to the built-in step types).
    pub fn registry(mut self, registry: StepRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    /// Storage for the default context model (in-memory if unset).
    pub fn store(mut self, store: Arc<dyn ContextStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use a prepared context model; takes precedence over [`Self::store`].
    pub fn context_model(mut self, model: Arc<ContextModel>) -> Self {
        self.context_model = Some(model);
        self
    }

    pub fn default_agent_context(mut self, text: impl Into<String>) -> Self {
        self.settings.default_agent_context = text.into();
        self
    }

    pub fn settings(mut self, settings: ArchitectureSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self, config: PipelineConfig) -> MetacogResult<Architecture> {
        let context_model = match self.context_model {
            Some(model) => model,
            None => {
                let store: Arc<dyn ContextStore> = match self.store {
                    Some(store) => store,
                    None => Arc::new(InMemoryContextStore::new()),
                };
                Arc::new(ContextModel::new(Arc::clone(&self.llm), store)?)
            }
        };

        let architecture = Architecture {
            config,
            registry: Arc::new(self.registry.unwrap_or_else(StepRegistry::with_builtins)),
            llm: self.llm,
            tools: Arc::new(self.tools),
            context_model,
            settings: self.settings,
        };

        let probe = architecture.manager_for(VALIDATION_USER)?;
        tracing::debug!(chains = probe.len(), "pipeline validated");
        Ok(architecture)
    }

    pub fn build_from_yaml(self, content: &str) -> MetacogResult<Architecture> {
        let config = PipelineConfig::from_yaml_str(content)?;
        self.build(config)
    }

    #[cfg(feature = "native")]
    pub async fn build_from_file(self, path: impl AsRef<Path>) -> MetacogResult<Architecture> {
        let config = PipelineConfig::from_file(path).await?;
        self.build(config)
    }
}
