use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::MetacogResult;

/// A named callback a tool step can invoke: one string in, one string out.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name tool steps refer to this tool by
    fn name(&self) -> &str;

    /// Run the tool on an already-formatted input
    async fn call(&self, input: &str) -> MetacogResult<String>;
}

/// Function type backing a [`FnTool`].
pub type ToolFn = Arc<
    dyn Fn(String) -> Pin<Box<dyn Future<Output = MetacogResult<String>> + Send>> + Send + Sync,
>;

/// Tool backed by an async closure
pub struct FnTool {
    name: String,
    tool_fn: ToolFn,
}

impl FnTool {
    pub fn new<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = MetacogResult<String>> + Send + 'static,
    {
        Self {
            name: name.into(),
            tool_fn: Arc::new(move |input| Box::pin(f(input))),
        }
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, input: &str) -> MetacogResult<String> {
        (self.tool_fn)(input.to_string()).await
    }
}

/// Tools available to pipeline steps, keyed by name.
///
/// Tools must be registered before any chain that references them is loaded.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool; a tool with the same name is replaced.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Register an async closure under `name`.
    pub fn register_fn<F, Fut>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = MetacogResult<String>> + Send + 'static,
    {
        self.register(Arc::new(FnTool::new(name, f)));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
