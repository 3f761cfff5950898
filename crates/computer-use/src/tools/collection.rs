use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use super::base::Tool;
use super::bash::BashTool;
use super::edit::EditTool;
use super::result::ToolResult;
use crate::errors::{AgentError, AgentResult, ToolError};
use crate::models::tool::ToolParam;

lazy_static! {
    static ref TOOL_NAME: Regex = Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap();
}

/// An ordered registry of the tools offered to the model
#[derive(Default)]
pub struct ToolCollection {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolCollection {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// The shell and file editor tools
    pub fn default_tools() -> Self {
        Self {
            tools: vec![Box::new(BashTool::new()), Box::new(EditTool::new())],
        }
    }

    /// Register a tool. Names must be unique and use only `[a-zA-Z0-9_-]`.
    pub fn add(&mut self, tool: Box<dyn Tool>) -> AgentResult<()> {
        let name = tool.name();
        if !TOOL_NAME.is_match(name) {
            return Err(AgentError::InvalidConfig(format!(
                "The tool name '{}' had invalid characters, it must match [a-zA-Z0-9_-]+",
                name
            )));
        }
        if self.get(name).is_some() {
            return Err(AgentError::InvalidConfig(format!(
                "Duplicate tool name: {}",
                name
            )));
        }
        self.tools.push(tool);
        Ok(())
    }

    pub fn with_tool(mut self, tool: Box<dyn Tool>) -> AgentResult<Self> {
        self.add(tool)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|tool| tool.name() == name)
            .map(|tool| &**tool)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|tool| tool.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Declarations for every registered tool, in registration order
    pub fn to_params(&self) -> Vec<ToolParam> {
        self.tools.iter().map(|tool| tool.to_params()).collect()
    }

    /// Run the named tool. An unknown name is reported as `ToolError::ToolNotFound`,
    /// distinct from failures of the tool itself.
    pub async fn run(&self, name: &str, input: Value) -> Result<ToolResult, ToolError> {
        let tool = self.get(name).ok_or_else(|| {
            warn!(tool = name, "model requested an unknown tool");
            ToolError::ToolNotFound(name.to_string())
        })?;

        debug!(tool = name, "running tool");
        let result = tool.call(input).await;
        if let Err(err) = &result {
            debug!(tool = name, error = %err, "tool call failed");
        }
        result
    }
}
