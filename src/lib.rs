//! # metacog-core
//!
//! Background metacognition for conversational agents: after each message, a
//! config-driven pipeline of steps runs beside the main conversation loop and
//! produces supplementary context for the agent's next reply.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use metacog_core::architecture::Architecture;
//! use metacog_core::llm::OpenAiAdapter;
//! use metacog_core::tracker::RunTracker;
//! use metacog_core::ConversationHistory;
//!
//! # async fn run() -> metacog_core::MetacogResult<()> {
//! let llm = Arc::new(OpenAiAdapter::from_env()?);
//! let architecture = Architecture::builder(llm)
//!     .build_from_file("demos/voe.yaml")
//!     .await?;
//! let tracker = RunTracker::new(Arc::new(architecture));
//!
//! let mut history = ConversationHistory::default();
//! history.add_user_message("I want to get better at chess");
//!
//! // Fire the pipeline, do other work, then rendezvous before replying.
//! tracker.start_run("user-42", history)?;
//! let context = tracker.await_context("user-42").await?;
//! # let _ = context;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`types`] | Conversation types, `Event`, `OutputKind`, chain `Inputs` |
//! | [`config`] | Pipeline documents (YAML/JSON): chains and step configs |
//! | [`template`] | `{variable}` prompt templates, parsed at load time |
//! | [`step`] | `Step` trait, step type registry, built-in step types |
//! | [`chain`] | Ordered, turn-gated step sequences |
//! | [`manager`] | Per-user chains by event, consume-once agent context |
//! | [`architecture`] | Validated pipeline + dependencies; builds managers per user |
//! | [`tracker`] | Background runs: one in flight per user, consumed once |
//! | [`context_model`] | LLM-maintained per-user paragraph over a pluggable store |
//! | [`llm`] | LLM adapter trait, closure adapter, OpenAI adapter |
//! | [`tool`] | Tool trait and registry for tool steps |
//! | [`error`] | Error types with thiserror, classified by `ErrorKind` |
//!
//! ## Pipeline documents
//!
//! ```yaml
//! metacognition:
//!   chains:
//!     voe:
//!       event: on_user_message
//!       output: agent_context
//!       min_completed_turns: 1
//!       steps:
//!         insight:
//!           type: user_model_revision
//!           insight: "note: {user_message}"
//!         summary:
//!           type: user_model_query
//!           query: "what do we know?"
//! ```
//!
//! Every step sees the seed inputs (`conversation_history`,
//! `prev_conversation_history`, `user_message`, `turns_completed`) plus the
//! outputs of earlier steps in its chain, keyed by step name.

pub mod architecture;
pub mod chain;
pub mod config;
pub mod context_model;
pub mod error;
pub mod llm;
pub mod manager;
pub mod step;
pub mod template;
pub mod tool;
pub mod tracker;
pub mod types;

pub use error::{MetacogError, MetacogResult};
pub use types::*;
