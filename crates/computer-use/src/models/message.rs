use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::content::{CacheControl, Content, ImageContent, TextContent};
use super::role::Role;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A tool invocation requested by the model
pub struct ToolUse {
    pub id: String,
    pub name: String,
    pub input: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<CacheControl>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// The encoded outcome of a tool invocation, keyed by the id of the request
pub struct ToolResultBlock {
    pub tool_use_id: String,
    #[serde(default)]
    pub content: Vec<Content>,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<CacheControl>,
}

impl ToolResultBlock {
    pub fn image_count(&self) -> usize {
        self.content.iter().filter(|c| c.is_image()).count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
/// Content passed inside a message, which can be both simple content and tool content
pub enum MessageContent {
    Text(TextContent),
    Image(ImageContent),
    ToolUse(ToolUse),
    ToolResult(ToolResultBlock),
}

impl MessageContent {
    pub fn text<S: Into<String>>(text: S) -> Self {
        MessageContent::Text(TextContent {
            text: text.into(),
            cache_control: None,
        })
    }

    pub fn image<S: Into<String>, T: Into<String>>(data: S, media_type: T) -> Self {
        MessageContent::Image(ImageContent::base64(data, media_type))
    }

    pub fn tool_use<S: Into<String>, N: Into<String>>(id: S, name: N, input: Value) -> Self {
        MessageContent::ToolUse(ToolUse {
            id: id.into(),
            name: name.into(),
            input,
            cache_control: None,
        })
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(text) => Some(&text.text),
            _ => None,
        }
    }

    pub fn as_tool_use(&self) -> Option<&ToolUse> {
        if let MessageContent::ToolUse(ref tool_use) = self {
            Some(tool_use)
        } else {
            None
        }
    }

    pub fn as_tool_result(&self) -> Option<&ToolResultBlock> {
        if let MessageContent::ToolResult(ref result) = self {
            Some(result)
        } else {
            None
        }
    }

    pub fn as_tool_result_mut(&mut self) -> Option<&mut ToolResultBlock> {
        if let MessageContent::ToolResult(ref mut result) = self {
            Some(result)
        } else {
            None
        }
    }

    pub fn cache_control(&self) -> Option<CacheControl> {
        match self {
            MessageContent::Text(text) => text.cache_control,
            MessageContent::Image(image) => image.cache_control,
            MessageContent::ToolUse(tool_use) => tool_use.cache_control,
            MessageContent::ToolResult(result) => result.cache_control,
        }
    }

    pub fn set_cache_control(&mut self, cache_control: Option<CacheControl>) {
        let slot = match self {
            MessageContent::Text(text) => &mut text.cache_control,
            MessageContent::Image(image) => &mut image.cache_control,
            MessageContent::ToolUse(tool_use) => &mut tool_use.cache_control,
            MessageContent::ToolResult(result) => &mut result.cache_control,
        };
        *slot = cache_control;
    }
}

impl From<ToolResultBlock> for MessageContent {
    fn from(result: ToolResultBlock) -> Self {
        MessageContent::ToolResult(result)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A message to or from the model
pub struct Message {
    pub role: Role,
    pub content: Vec<MessageContent>,
}

impl Message {
    pub fn user() -> Self {
        Message {
            role: Role::User,
            content: Vec::new(),
        }
    }

    pub fn assistant() -> Self {
        Message {
            role: Role::Assistant,
            content: Vec::new(),
        }
    }

    /// Add any MessageContent to the message
    pub fn with_content(mut self, content: MessageContent) -> Self {
        self.content.push(content);
        self
    }

    pub fn with_text<S: Into<String>>(self, text: S) -> Self {
        self.with_content(MessageContent::text(text))
    }

    pub fn with_image<S: Into<String>, T: Into<String>>(self, data: S, media_type: T) -> Self {
        self.with_content(MessageContent::image(data, media_type))
    }

    pub fn with_tool_use<S: Into<String>, N: Into<String>>(
        self,
        id: S,
        name: N,
        input: Value,
    ) -> Self {
        self.with_content(MessageContent::tool_use(id, name, input))
    }

    pub fn with_tool_result(self, result: ToolResultBlock) -> Self {
        self.with_content(MessageContent::ToolResult(result))
    }

    /// All tool use requests in this message, in order
    pub fn tool_uses(&self) -> impl Iterator<Item = &ToolUse> {
        self.content.iter().filter_map(MessageContent::as_tool_use)
    }
}
