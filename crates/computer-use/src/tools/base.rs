use async_trait::async_trait;
use serde_json::Value;

use super::result::ToolResult;
use crate::errors::ToolError;
use crate::models::tool::ToolParam;

/// A capability the model can invoke by name
#[async_trait]
pub trait Tool: Send + Sync {
    /// The name the model uses to call this tool
    fn name(&self) -> &str;

    /// The declaration advertised to the model
    fn to_params(&self) -> ToolParam;

    /// Run the tool. Execution failures that the model should see can be returned either
    /// as `Ok(ToolResult { error: Some(..), .. })` or as a `ToolError`; the loop encodes
    /// both as error results.
    async fn call(&self, input: Value) -> Result<ToolResult, ToolError>;
}
