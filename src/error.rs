use thiserror::Error;

/// Coarse classification of a [`MetacogError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Load-time failure: the pipeline document or a step config is invalid.
    Config,
    /// A step template referenced an input that was not present.
    Template,
    /// An LLM or tool call failed.
    Provider,
    /// Orchestration or I/O failure outside the three categories above.
    Runtime,
}

#[derive(Error, Debug)]
pub enum MetacogError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Unknown event type: {0}")]
    UnknownEvent(String),

    #[error("Unknown output type: {0}")]
    UnknownOutput(String),

    #[error("Unknown step type: '{type_tag}' (step '{step}')")]
    UnknownStepType { step: String, type_tag: String },

    #[error("Missing required field '{field}' in step '{step}'")]
    MissingStepField { step: String, field: String },

    #[error("Invalid field '{field}' in step '{step}': {message}")]
    InvalidStepField {
        step: String,
        field: String,
        message: String,
    },

    #[error("Tool not registered: tool={tool}, step={step}")]
    ToolNotRegistered { step: String, tool: String },

    #[error("Invalid template: {message} in {template:?}")]
    InvalidTemplate { template: String, message: String },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Missing template key: '{key}'")]
    MissingTemplateKey { key: String },

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Tool execution error: tool={tool_name}, {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("A pipeline run is already in flight for user '{user_id}'")]
    RunInFlight { user_id: String },

    #[error("Background task failed: {0}")]
    TaskFailed(String),

    #[error("Conversation history is empty")]
    EmptyConversation,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl MetacogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MetacogError::Config(_)
            | MetacogError::UnknownEvent(_)
            | MetacogError::UnknownOutput(_)
            | MetacogError::UnknownStepType { .. }
            | MetacogError::MissingStepField { .. }
            | MetacogError::InvalidStepField { .. }
            | MetacogError::ToolNotRegistered { .. }
            | MetacogError::InvalidTemplate { .. }
            | MetacogError::Yaml(_) => ErrorKind::Config,
            MetacogError::MissingTemplateKey { .. } => ErrorKind::Template,
            MetacogError::Provider(_)
            | MetacogError::Http(_)
            | MetacogError::ToolExecution { .. }
            | MetacogError::Timeout { .. } => ErrorKind::Provider,
            MetacogError::RunInFlight { .. }
            | MetacogError::TaskFailed(_)
            | MetacogError::EmptyConversation
            | MetacogError::Serialization(_)
            | MetacogError::Io(_)
            | MetacogError::Other(_) => ErrorKind::Runtime,
        }
    }

    pub fn is_config(&self) -> bool {
        self.kind() == ErrorKind::Config
    }

    pub fn is_template(&self) -> bool {
        self.kind() == ErrorKind::Template
    }

    pub fn is_provider(&self) -> bool {
        self.kind() == ErrorKind::Provider
    }
}

pub type MetacogResult<T> = Result<T, MetacogError>;
