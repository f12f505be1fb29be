use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use metacog_core::architecture::Architecture;
#[cfg(feature = "native")]
use metacog_core::context_model::FileContextStore;
use metacog_core::context_model::{ContextModel, InMemoryContextStore};
use metacog_core::llm::{FnLlm, LlmAdapter, LlmRequest};
use metacog_core::step::{Step, StepRegistry, StepSchema};
use metacog_core::tool::ToolRegistry;
use metacog_core::tracker::RunTracker;
use metacog_core::*;

const VOE_DEMO: &str = include_str!("../demos/voe.yaml");

// ─── Scripted LLM ───────────────────────────────────────────────────────────

/// Text between `marker` and the next double quote.
fn quoted_after<'a>(prompt: &'a str, marker: &str) -> &'a str {
    prompt
        .split(marker)
        .nth(1)
        .and_then(|rest| rest.split('"').next())
        .unwrap_or_default()
}

/// Deterministic stand-in for a model:
/// - context revisions store `Profile: <insight>`
/// - context queries answer `Remember: <current paragraph>`
/// - every other prompt is answered by `respond`
fn scripted_llm<F>(respond: F) -> Arc<dyn LlmAdapter>
where
    F: Fn(&str) -> String + Send + Sync + 'static,
{
    let respond = Arc::new(respond);
    Arc::new(FnLlm::from_fn(move |req: LlmRequest| {
        let respond = Arc::clone(&respond);
        async move {
            let prompt = req.system_prompt.unwrap_or_default();
            let paragraph = quoted_after(&prompt, "Here is your current user context description:\n\"");
            if prompt.contains("Here is an insight about the user") {
                let insight = quoted_after(&prompt, "Here is an insight about the user:\n\"");
                Ok(format!("Profile: {insight}"))
            } else if prompt.contains("You have been given this query") {
                Ok(format!("Remember: {paragraph}"))
            } else {
                Ok(respond(&prompt))
            }
        }
    }))
}

fn voe_llm() -> Arc<dyn LlmAdapter> {
    scripted_llm(|prompt| {
        if prompt.contains("Predict") {
            "They will ask about openings.".to_string()
        } else if prompt.contains("what does the difference reveal") {
            "They care more about endgames than openings.".to_string()
        } else {
            format!("unexpected prompt: {prompt}")
        }
    })
}

fn conversation(records: &[(bool, &str)]) -> ConversationHistory {
    ConversationHistory::from_flagged(records.iter().map(|(is_user, text)| (*is_user, *text)))
}

// ─── Demo Pipeline ──────────────────────────────────────────────────────────

#[tokio::test]
async fn voe_demo_end_to_end() {
    let llm = voe_llm();
    let model = Arc::new(
        ContextModel::new(Arc::clone(&llm), Arc::new(InMemoryContextStore::new())).unwrap(),
    );
    let architecture = Architecture::builder(llm)
        .context_model(Arc::clone(&model))
        .build_from_yaml(VOE_DEMO)
        .unwrap();
    let tracker = RunTracker::new(Arc::new(architecture));

    // First message: both chains are gated.
    let mut history = conversation(&[(true, "hi, can you help me with chess?")]);
    assert!(tracker.start_run("alice", history.clone()).unwrap());
    assert_eq!(
        tracker.await_context("alice").await.unwrap().as_deref(),
        Some("none, new user")
    );
    assert_eq!(model.current("alice").await.unwrap(), "none, new user");

    // Agent reply: nothing listens to on_ai_message.
    history.add_ai_message("Of course! What would you like to work on?");
    assert!(!tracker.start_run("alice", history.clone()).unwrap());
    assert_eq!(tracker.await_context("alice").await.unwrap(), None);

    // Second user message: the VOE chain revises the model, then the context
    // chain queries it.
    history.add_user_message("Mostly rook endgames, I keep losing them.");
    assert!(tracker.start_run("alice", history).unwrap());
    let context = tracker.await_context("alice").await.unwrap().unwrap();
    assert_eq!(
        context,
        "Remember: Profile: They care more about endgames than openings."
    );
    assert_eq!(
        model.current("alice").await.unwrap(),
        "Profile: They care more about endgames than openings."
    );
    assert_eq!(model.current("bob").await.unwrap(), "none, new user");
}

// ─── Manager Semantics ──────────────────────────────────────────────────────

#[tokio::test]
async fn revision_then_query_gated_by_turns() {
    let doc = r#"
chains:
  profile:
    event: ON_USER_MESSAGE
    output: agent_context
    min_completed_turns: 1
    default_output: ""
    steps:
      insight:
        type: user_model_revision
        insight: "note: {user_message}"
      summary:
        type: user_model_query
        query: "what do we know?"
"#;
    let llm = scripted_llm(|p| p.to_string());
    let model = Arc::new(
        ContextModel::new(Arc::clone(&llm), Arc::new(InMemoryContextStore::new())).unwrap(),
    );
    let architecture = Architecture::builder(llm)
        .context_model(Arc::clone(&model))
        .build_from_yaml(doc)
        .unwrap();
    let mut manager = architecture.manager_for("u1").unwrap();

    // Turn 0: gated, and the context model is untouched.
    let mut history = conversation(&[(true, "hello")]);
    manager.on_event(Event::OnUserMessage, &history).await.unwrap();
    assert_eq!(manager.get_context(), "");
    assert_eq!(model.current("u1").await.unwrap(), "none, new user");

    // Turn 1
    history.add_ai_message("hi there");
    history.add_user_message("I like chess");
    manager.on_event(Event::OnUserMessage, &history).await.unwrap();
    assert_eq!(model.current("u1").await.unwrap(), "Profile: note: I like chess");
    assert_eq!(manager.get_context(), "Remember: Profile: note: I like chess");
    assert_eq!(manager.get_context(), "");
}

#[tokio::test]
async fn later_agent_context_chain_wins() {
    let doc = r#"
chains:
  early:
    event: on_user_message
    output: agent_context
    steps:
      a:
        type: inference
        prompt: "early"
  late:
    event: on_user_message
    output: agent_context
    steps:
      b:
        type: inference
        prompt: "late"
  side_effect:
    event: on_user_message
    output: void
    steps:
      c:
        type: inference
        prompt: "ignored"
"#;
    let architecture = Architecture::builder(scripted_llm(|p| format!("<{p}>")))
        .build_from_yaml(doc)
        .unwrap();
    let mut manager = architecture.manager_for("u").unwrap();
    manager
        .on_event(Event::OnUserMessage, &conversation(&[(true, "x")]))
        .await
        .unwrap();
    assert_eq!(manager.get_context(), "<late>");
}

#[tokio::test]
async fn later_step_sees_earlier_output() {
    let doc = r#"
chains:
  c:
    event: on_user_message
    output: agent_context
    steps:
      A:
        type: inference
        prompt: "first"
      B:
        type: tool
        tool: record
        input: "got {A} at turn {turns_completed}"
"#;
    let mut tools = ToolRegistry::new();
    tools.register_fn("record", |input| async move { Ok(format!("recorded: {input}")) });
    let architecture = Architecture::builder(scripted_llm(|_| "alpha".to_string()))
        .tools(tools)
        .build_from_yaml(doc)
        .unwrap();

    let mut manager = architecture.manager_for("u").unwrap();
    manager
        .on_event(Event::OnUserMessage, &conversation(&[(true, "x")]))
        .await
        .unwrap();
    assert_eq!(manager.get_context(), "recorded: got alpha at turn 0");
}

#[tokio::test]
async fn missing_template_key_aborts_chain() {
    let doc = r#"
chains:
  c:
    event: on_user_message
    output: agent_context
    steps:
      a:
        type: inference
        prompt: "needs {nonexistent}"
"#;
    let architecture = Architecture::builder(scripted_llm(|p| p.to_string()))
        .default_agent_context("fallback")
        .build_from_yaml(doc)
        .unwrap();
    let mut manager = architecture.manager_for("u").unwrap();
    let err = manager
        .on_event(Event::OnUserMessage, &conversation(&[(true, "x")]))
        .await
        .unwrap_err();
    assert!(matches!(err, MetacogError::MissingTemplateKey { ref key } if key == "nonexistent"));
    assert_eq!(manager.get_context(), "fallback");
}

// ─── Registry Extensibility ─────────────────────────────────────────────────

struct ReverseStep {
    name: String,
    key: String,
}

#[async_trait]
impl Step for ReverseStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_tag(&self) -> &str {
        "reverse"
    }

    async fn execute(&self, inputs: &Inputs) -> MetacogResult<String> {
        let value = inputs.get(&self.key).ok_or_else(|| MetacogError::MissingTemplateKey {
            key: self.key.clone(),
        })?;
        Ok(value.chars().rev().collect())
    }
}

const REVERSE_DOC: &str = r#"
chains:
  c:
    event: on_user_message
    output: agent_context
    steps:
      backwards:
        type: reverse
        key: user_message
"#;

#[test]
fn unknown_step_type_rejected_at_load() {
    let err = Architecture::builder(scripted_llm(|p| p.to_string()))
        .build_from_yaml(REVERSE_DOC)
        .unwrap_err();
    assert!(err.is_config());
    assert!(matches!(err, MetacogError::UnknownStepType { ref type_tag, .. } if type_tag == "reverse"));
}

#[tokio::test]
async fn custom_step_type_registered_before_load() {
    let mut registry = StepRegistry::with_builtins();
    registry.register_fn("reverse", StepSchema::new().required("key"), |args| {
        Ok(Box::new(ReverseStep {
            name: args.name.to_string(),
            key: args.field("key")?.to_string(),
        }) as Box<dyn Step>)
    });

    let architecture = Architecture::builder(scripted_llm(|p| p.to_string()))
        .registry(registry)
        .build_from_yaml(REVERSE_DOC)
        .unwrap();
    let mut manager = architecture.manager_for("u").unwrap();
    manager
        .on_event(Event::OnUserMessage, &conversation(&[(true, "stressed")]))
        .await
        .unwrap();
    assert_eq!(manager.get_context(), "desserts");
}

#[test]
fn config_errors_fail_the_whole_load() {
    let cases = [
        // unknown event
        "chains:\n  c:\n    event: on_tuesday\n    output: void\n    steps:\n      s:\n        type: inference\n        prompt: p\n",
        // unknown output
        "chains:\n  c:\n    event: on_user_message\n    output: email\n    steps:\n      s:\n        type: inference\n        prompt: p\n",
        // missing required field
        "chains:\n  c:\n    event: on_user_message\n    output: void\n    steps:\n      s:\n        type: user_model_query\n",
        // required field with no value
        "chains:\n  c:\n    event: on_user_message\n    output: void\n    steps:\n      s:\n        type: inference\n        prompt:\n",
        // unexpected field
        "chains:\n  c:\n    event: on_user_message\n    output: void\n    steps:\n      s:\n        type: inference\n        prompt: p\n        temperature: 0.2\n",
        // malformed template
        "chains:\n  c:\n    event: on_user_message\n    output: void\n    steps:\n      s:\n        type: inference\n        prompt: \"{oops\"\n",
    ];
    for doc in cases {
        let err = Architecture::builder(scripted_llm(|p| p.to_string()))
            .build_from_yaml(doc)
            .unwrap_err();
        assert!(err.is_config(), "expected config error for:\n{doc}\ngot: {err}");
    }
}

// ─── Run Tracker ────────────────────────────────────────────────────────────

#[tokio::test]
async fn users_run_independently() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let llm: Arc<dyn LlmAdapter> = Arc::new(FnLlm::from_fn(move |req: LlmRequest| {
        counter.fetch_add(1, Ordering::SeqCst);
        async move {
            tokio::task::yield_now().await;
            Ok(req.system_prompt.unwrap_or_default())
        }
    }));
    let doc = "chains:\n  c:\n    event: on_user_message\n    output: agent_context\n    steps:\n      echo:\n        type: inference\n        prompt: \"{user_message}\"\n";
    let architecture = Architecture::builder(llm).build_from_yaml(doc).unwrap();
    let tracker = RunTracker::new(Arc::new(architecture));

    for user in ["u1", "u2", "u3"] {
        let history = conversation(&[(true, user)]);
        assert!(tracker.start_run(user, history).unwrap());
    }
    assert_eq!(tracker.len(), 3);

    for user in ["u3", "u1", "u2"] {
        assert_eq!(
            tracker.await_context(user).await.unwrap().as_deref(),
            Some(user)
        );
    }
    assert!(tracker.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn explicit_event_start() {
    let doc = "chains:\n  after_reply:\n    event: on_ai_message\n    output: agent_context\n    steps:\n      critique:\n        type: inference\n        prompt: \"critique: {ai_message}\"\n";
    let architecture = Architecture::builder(scripted_llm(|p| p.to_string()))
        .build_from_yaml(doc)
        .unwrap();
    let tracker = RunTracker::new(Arc::new(architecture));

    let history = conversation(&[(true, "2+2?"), (false, "5")]);
    assert!(!tracker
        .start_event("u", Event::OnUserMessage, history.clone())
        .unwrap());
    assert!(tracker.start_event("u", Event::OnAiMessage, history).unwrap());
    assert_eq!(
        tracker.await_context("u").await.unwrap().as_deref(),
        Some("critique: 5")
    );
}

// ─── Persistence ────────────────────────────────────────────────────────────

#[cfg(feature = "native")]
#[tokio::test]
async fn file_store_survives_rebuild() {
    let dir = tempfile::tempdir().unwrap();
    let doc = "chains:\n  learn:\n    event: on_user_message\n    output: void\n    steps:\n      note:\n        type: user_model_revision\n        insight: \"{user_message}\"\n";

    let first = Architecture::builder(scripted_llm(|p| p.to_string()))
        .store(Arc::new(FileContextStore::new(dir.path())))
        .build_from_yaml(doc)
        .unwrap();
    let mut manager = first.manager_for("carol").unwrap();
    manager
        .on_event(Event::OnUserMessage, &conversation(&[(true, "prefers Python")]))
        .await
        .unwrap();
    drop(first);

    let second = Architecture::builder(scripted_llm(|p| p.to_string()))
        .store(Arc::new(FileContextStore::new(dir.path())))
        .build_from_yaml(doc)
        .unwrap();
    assert_eq!(
        second.context_model().current("carol").await.unwrap(),
        "Profile: prefers Python"
    );
}

#[cfg(feature = "native")]
#[tokio::test]
async fn pipeline_file_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("voe.yaml");
    tokio::fs::write(&path, VOE_DEMO).await.unwrap();

    let architecture = Architecture::builder(voe_llm())
        .build_from_file(&path)
        .await
        .unwrap();
    assert_eq!(architecture.config().chain_names(), vec!["voe", "user_context"]);
    let manager = architecture.manager_for("x").unwrap();
    assert_eq!(manager.chain_names(Event::OnUserMessage), vec!["voe", "user_context"]);
    assert!(manager.chains_for(Event::OnAiMessage).is_empty());
}
