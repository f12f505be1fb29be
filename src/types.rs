use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MetacogError;

// ─── Message Types ──────────────────────────────────────────────────────────

/// Author of a conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "User"),
            Role::Assistant => write!(f, "Assistant"),
        }
    }
}

/// A single message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered transcript of a conversation.
///
/// Renders as one `Role: content` line per message, which is the form every
/// step template sees under `conversation_history`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationHistory {
    pub messages: Vec<Message>,
}

impl ConversationHistory {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// Build from `(is_user, content)` records, the shape the session store keeps.
    pub fn from_flagged<I, S>(records: I) -> Self
    where
        I: IntoIterator<Item = (bool, S)>,
        S: Into<String>,
    {
        let messages = records
            .into_iter()
            .map(|(is_user, content)| {
                if is_user {
                    Message::user(content)
                } else {
                    Message::assistant(content)
                }
            })
            .collect();
        Self { messages }
    }

    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    pub fn add_ai_message(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Most recent user-authored message
    pub fn last_user_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::User)
    }

    /// History with the final message dropped
    pub fn without_last(&self) -> ConversationHistory {
        let end = self.messages.len().saturating_sub(1);
        ConversationHistory::new(self.messages[..end].to_vec())
    }

    /// Completed user/assistant exchanges before the latest message
    pub fn turns_completed(&self) -> usize {
        self.messages.len().saturating_sub(1) / 2
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl fmt::Display for ConversationHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self
            .messages
            .iter()
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect();
        write!(f, "{}", lines.join("\n").trim())
    }
}

// ─── Events & Outputs ───────────────────────────────────────────────────────

/// Conversation event that triggers chains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    OnUserMessage,
    OnAiMessage,
}

impl Event {
    pub const ALL: [Event; 2] = [Event::OnUserMessage, Event::OnAiMessage];

    pub fn as_str(&self) -> &'static str {
        match self {
            Event::OnUserMessage => "on_user_message",
            Event::OnAiMessage => "on_ai_message",
        }
    }

    /// Event implied by the author of the latest message
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::User => Event::OnUserMessage,
            Role::Assistant => Event::OnAiMessage,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Event {
    type Err = MetacogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on_user_message" => Ok(Event::OnUserMessage),
            "on_ai_message" => Ok(Event::OnAiMessage),
            _ => Err(MetacogError::UnknownEvent(s.to_string())),
        }
    }
}

/// What a chain's final output is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    /// Result is produced and discarded; the chain runs for its side effects.
    Void,
    /// Result becomes the agent's derived context.
    AgentContext,
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputKind::Void => write!(f, "void"),
            OutputKind::AgentContext => write!(f, "agent_context"),
        }
    }
}

impl FromStr for OutputKind {
    type Err = MetacogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "void" => Ok(OutputKind::Void),
            "agent_context" => Ok(OutputKind::AgentContext),
            _ => Err(MetacogError::UnknownOutput(s.to_string())),
        }
    }
}

// ─── Chain Inputs ───────────────────────────────────────────────────────────

pub const CONVERSATION_HISTORY: &str = "conversation_history";
pub const PREV_CONVERSATION_HISTORY: &str = "prev_conversation_history";
pub const USER_MESSAGE: &str = "user_message";
pub const AI_MESSAGE: &str = "ai_message";
pub const TURNS_COMPLETED: &str = "turns_completed";

/// Named string values threaded through one chain invocation.
///
/// Seeded from the conversation, then grows by one `step name -> output`
/// entry per executed step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inputs {
    values: HashMap<String, String>,
    turns_completed: usize,
}

impl Inputs {
    pub fn new(turns_completed: usize) -> Self {
        let mut values = HashMap::new();
        values.insert(TURNS_COMPLETED.to_string(), turns_completed.to_string());
        Self {
            values,
            turns_completed,
        }
    }

    /// Seed inputs for `event` from the conversation state
    pub fn from_conversation(
        event: Event,
        history: &ConversationHistory,
    ) -> Result<Self, MetacogError> {
        let last = history.last().ok_or(MetacogError::EmptyConversation)?;

        let mut inputs = Self::new(history.turns_completed());
        inputs.insert(CONVERSATION_HISTORY, history.to_string());
        inputs.insert(PREV_CONVERSATION_HISTORY, history.without_last().to_string());

        let user_message = history
            .last_user_message()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        inputs.insert(USER_MESSAGE, user_message);

        if event == Event::OnAiMessage {
            inputs.insert(AI_MESSAGE, last.content.clone());
        }

        Ok(inputs)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|v| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn turns_completed(&self) -> usize {
        self.turns_completed
    }

    pub fn values(&self) -> &HashMap<String, String> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_history() -> ConversationHistory {
        let mut history = ConversationHistory::default();
        history.add_user_message("hi");
        history.add_ai_message("hello, what are we learning?");
        history.add_user_message("I like chess");
        history
    }

    #[test]
    fn history_renders_role_lines() {
        let history = sample_history();
        assert_eq!(
            history.to_string(),
            "User: hi\nAssistant: hello, what are we learning?\nUser: I like chess"
        );
        assert_eq!(
            history.without_last().to_string(),
            "User: hi\nAssistant: hello, what are we learning?"
        );
    }

    #[test]
    fn empty_history_renders_empty() {
        let history = ConversationHistory::default();
        assert_eq!(history.to_string(), "");
        assert!(history.without_last().is_empty());
        assert_eq!(history.turns_completed(), 0);
    }

    #[test]
    fn turns_completed_counts_exchanges() {
        let mut history = ConversationHistory::default();
        history.add_user_message("a");
        assert_eq!(history.turns_completed(), 0);
        history.add_ai_message("b");
        assert_eq!(history.turns_completed(), 0);
        history.add_user_message("c");
        assert_eq!(history.turns_completed(), 1);
        history.add_ai_message("d");
        history.add_user_message("e");
        assert_eq!(history.turns_completed(), 2);
    }

    #[test]
    fn from_flagged_maps_roles() {
        let history = ConversationHistory::from_flagged(vec![(true, "q"), (false, "a")]);
        assert_eq!(history.messages[0], Message::user("q"));
        assert_eq!(history.messages[1], Message::assistant("a"));
    }

    #[test]
    fn event_parses_case_insensitively() {
        assert_eq!("ON_USER_MESSAGE".parse::<Event>().unwrap(), Event::OnUserMessage);
        assert_eq!("on_ai_message".parse::<Event>().unwrap(), Event::OnAiMessage);
        assert!(matches!(
            "on_tuesday".parse::<Event>(),
            Err(MetacogError::UnknownEvent(_))
        ));
    }

    #[test]
    fn output_parses_case_insensitively() {
        assert_eq!("VOID".parse::<OutputKind>().unwrap(), OutputKind::Void);
        assert_eq!(
            "Agent_Context".parse::<OutputKind>().unwrap(),
            OutputKind::AgentContext
        );
        assert!(matches!(
            "stdout".parse::<OutputKind>(),
            Err(MetacogError::UnknownOutput(_))
        ));
    }

    #[test]
    fn seed_inputs_for_user_message() {
        let inputs = Inputs::from_conversation(Event::OnUserMessage, &sample_history()).unwrap();
        assert_eq!(inputs.get(USER_MESSAGE), Some("I like chess"));
        assert_eq!(inputs.get(TURNS_COMPLETED), Some("1"));
        assert_eq!(inputs.turns_completed(), 1);
        assert!(inputs.get(CONVERSATION_HISTORY).unwrap().ends_with("I like chess"));
        assert!(!inputs
            .get(PREV_CONVERSATION_HISTORY)
            .unwrap()
            .contains("chess"));
        assert!(!inputs.contains(AI_MESSAGE));
    }

    #[test]
    fn seed_inputs_for_ai_message() {
        let mut history = sample_history();
        history.add_ai_message("Which openings do you play?");
        let inputs = Inputs::from_conversation(Event::OnAiMessage, &history).unwrap();
        assert_eq!(inputs.get(AI_MESSAGE), Some("Which openings do you play?"));
        assert_eq!(inputs.get(USER_MESSAGE), Some("I like chess"));
    }

    #[test]
    fn seed_inputs_rejects_empty_history() {
        let result = Inputs::from_conversation(Event::OnUserMessage, &ConversationHistory::default());
        assert!(matches!(result, Err(MetacogError::EmptyConversation)));
    }

    #[test]
    fn history_serializes() {
        let history = sample_history();
        let json = serde_json::to_string(&history).unwrap();
        assert!(json.contains("\"role\":\"User\""));
        let back: ConversationHistory = serde_json::from_str(&json).unwrap();
        assert_eq!(back, history);
    }
}
