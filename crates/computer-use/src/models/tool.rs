use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The declaration of a tool as it is advertised to the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolParam {
    /// The name of the tool
    pub name: String,
    /// A description of what the tool does
    pub description: String,
    /// JSON schema for the input the tool accepts
    pub input_schema: Value,
}

impl ToolParam {
    /// Create a new tool declaration with the given name and description
    pub fn new<N, D>(name: N, description: D, input_schema: Value) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        ToolParam {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}
