use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::factory::ApiProvider;
use crate::errors::ProviderError;
use crate::models::content::Content;
use crate::models::message::Message;
use crate::models::tool::ToolParam;

/// The most cache breakpoints the backend accepts in a single request
pub const MAX_CACHE_BREAKPOINTS: usize = 4;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
    pub cache_creation_input_tokens: Option<u32>,
    pub cache_read_input_tokens: Option<u32>,
}

/// A content block of a model response. Any other block type fails to parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseBlock {
    Text { text: String },
    ToolUse { id: String, name: String, input: Value },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub id: String,
    pub model: String,
    pub content: Vec<ResponseBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub usage: Usage,
}

/// One call to the messages endpoint. Borrowed from the loop's state so the
/// conversation is not copied on every iteration.
#[derive(Debug, Clone, Serialize)]
pub struct MessagesRequest<'a> {
    pub model: &'a str,
    pub max_tokens: u32,
    pub system: &'a [Content],
    pub tools: &'a [ToolParam],
    pub messages: &'a [Message],
    #[serde(skip)]
    pub betas: &'a [&'static str],
}

impl MessagesRequest<'_> {
    /// Number of cache-control markers carried anywhere in the request
    pub fn cache_breakpoints(&self) -> usize {
        let system = self
            .system
            .iter()
            .filter(|block| match block {
                Content::Text(text) => text.cache_control.is_some(),
                Content::Image(image) => image.cache_control.is_some(),
            })
            .count();
        let messages = self
            .messages
            .iter()
            .flat_map(|message| &message.content)
            .filter(|block| block.cache_control().is_some())
            .count();
        system + messages
    }
}

/// The request as it went over the wire, with credentials redacted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawResponse {
    pub status: u16,
    pub body: Value,
}

/// A request and, when one arrived, the response to it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HttpExchange {
    pub request: RawRequest,
    pub response: Option<RawResponse>,
}

#[derive(Debug, Clone)]
pub struct Completion {
    pub exchange: HttpExchange,
    pub response: ApiResponse,
}

#[derive(Debug, Clone)]
pub struct CompletionError {
    pub exchange: HttpExchange,
    pub error: ProviderError,
}

/// The backend that turns a conversation into the next assistant turn
#[async_trait]
pub trait Provider: Send + Sync {
    /// Which backend variant this provider talks to
    fn kind(&self) -> ApiProvider;

    /// Send one messages request. Both outcomes carry the raw exchange so callers can
    /// trace it.
    async fn complete(&self, request: &MessagesRequest<'_>) -> Result<Completion, CompletionError>;
}
