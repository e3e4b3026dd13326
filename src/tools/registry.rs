use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::errors::ToolError;
use super::types::ToolDescriptor;

/// An executable operation the reasoning step can ask for
#[async_trait]
pub trait Tool: Send + Sync {
    /// Descriptor published to the reasoning step
    fn descriptor(&self) -> ToolDescriptor;

    /// Run the tool; arguments have already passed descriptor validation
    async fn call(&self, arguments: Value) -> Result<String, ToolError>;
}

/// A registered tool as returned by [`ToolRegistry::resolve`]
pub struct ResolvedTool<'a> {
    pub descriptor: &'a ToolDescriptor,
    pub executor: &'a Arc<dyn Tool>,
}

/// Fixed set of tools, keyed by unique name, in registration order
#[derive(Default, Clone)]
pub struct ToolRegistry {
    descriptors: Vec<ToolDescriptor>,
    executors: Vec<Arc<dyn Tool>>,
    by_name: HashMap<String, usize>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under the descriptor's name
    pub fn register(
        &mut self,
        mut descriptor: ToolDescriptor,
        executor: Arc<dyn Tool>,
    ) -> Result<(), ToolError> {
        let name = descriptor.name.trim().to_string();
        descriptor.name = name.clone();
        if name.is_empty() {
            return Err(ToolError::InvalidInput(
                "Tool name must not be empty".to_string(),
            ));
        }
        if self.by_name.contains_key(&name) {
            return Err(ToolError::DuplicateTool(name));
        }

        debug!("Registered tool '{}'", name);
        self.by_name.insert(name, self.descriptors.len());
        self.descriptors.push(descriptor);
        self.executors.push(executor);
        Ok(())
    }

    /// Register a tool using its own descriptor
    pub fn register_tool<T: Tool + 'static>(&mut self, tool: T) -> Result<(), ToolError> {
        let descriptor = tool.descriptor();
        self.register(descriptor, Arc::new(tool))
    }

    pub fn resolve(&self, name: &str) -> Result<ResolvedTool<'_>, ToolError> {
        let idx = *self
            .by_name
            .get(name.trim())
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        Ok(ResolvedTool {
            descriptor: &self.descriptors[idx],
            executor: &self.executors[idx],
        })
    }

    /// Resolve, validate, then execute
    pub async fn invoke(&self, name: &str, arguments: &Value) -> Result<String, ToolError> {
        let tool = self.resolve(name)?;
        tool.descriptor.validate(arguments)?;
        tool.executor.call(arguments.clone()).await
    }

    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    pub fn names(&self) -> Vec<&str> {
        self.descriptors.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
