//! Manager: runs a user's chains for each event and holds the derived
//! agent context until it is consumed.

use std::collections::HashMap;

use crate::chain::{Chain, ChainDeps};
use crate::config::PipelineConfig;
use crate::error::MetacogResult;
use crate::types::{ConversationHistory, Event, Inputs, OutputKind};

pub struct Manager {
    user_id: String,
    chains: HashMap<Event, Vec<Chain>>,
    agent_context: Option<String>,
    default_agent_context: String,
}

impl Manager {
    pub fn new(user_id: impl Into<String>, default_agent_context: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            chains: HashMap::new(),
            agent_context: None,
            default_agent_context: default_agent_context.into(),
        }
    }

    /// Build every chain in `config`. Any invalid chain fails the whole load.
    pub fn load_from_config(
        user_id: impl Into<String>,
        config: &PipelineConfig,
        deps: ChainDeps<'_>,
        default_agent_context: impl Into<String>,
    ) -> MetacogResult<Self> {
        let mut manager = Self::new(user_id, default_agent_context);
        for (name, chain_config) in &config.chains {
            manager.add_chain(Chain::from_config(name, chain_config, deps)?);
        }
        Ok(manager)
    }

    /// Append a chain after those already registered for its event.
    pub fn add_chain(&mut self, chain: Chain) {
        self.chains.entry(chain.event()).or_default().push(chain);
    }

    /// Run every chain registered for `event`, in declaration order.
    ///
    /// Each chain gets its own copy of the seed inputs. Agent-context chains
    /// overwrite the held context; the last one to finish wins. The first
    /// failing chain aborts the rest.
    pub async fn on_event(
        &mut self,
        event: Event,
        history: &ConversationHistory,
    ) -> MetacogResult<()> {
        let Some(chains) = self.chains.get(&event) else {
            tracing::debug!(user_id = %self.user_id, %event, "no chains for event");
            return Ok(());
        };

        let seed = Inputs::from_conversation(event, history)?;
        tracing::info!(
            user_id = %self.user_id,
            %event,
            chains = chains.len(),
            turns_completed = seed.turns_completed(),
            "running chains"
        );

        for chain in chains {
            let mut inputs = seed.clone();
            let result = chain.run(&mut inputs).await?;
            if chain.output() == OutputKind::AgentContext {
                tracing::debug!(
                    user_id = %self.user_id,
                    chain = chain.name(),
                    "agent context updated"
                );
                self.agent_context = Some(result);
            }
        }

        Ok(())
    }

    /// Take the derived context, or the default if none was produced. The
    /// held value is cleared.
    pub fn get_context(&mut self) -> String {
        self.agent_context
            .take()
            .unwrap_or_else(|| self.default_agent_context.clone())
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn default_agent_context(&self) -> &str {
        &self.default_agent_context
    }

    /// Chains registered for `event`, in run order
    pub fn chains_for(&self, event: Event) -> &[Chain] {
        self.chains.get(&event).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn chain_names(&self, event: Event) -> Vec<&str> {
        self.chains_for(event).iter().map(|c| c.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.chains.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
