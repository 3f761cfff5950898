//! Side channels through which the sampling loop reports progress.
//!
//! Each sink is called synchronously at a fixed point of the loop and cannot influence
//! control flow.
use crate::errors::ProviderError;
use crate::models::message::MessageContent;
use crate::providers::base::{RawRequest, RawResponse};
use crate::tools::ToolResult;

/// Receives every content block of each assistant response
pub trait ContentSink: Send + Sync {
    fn on_content(&self, block: &MessageContent);
}

/// Receives each tool's raw result along with the id of the request it answers
pub trait ToolResultSink: Send + Sync {
    fn on_tool_result(&self, result: &ToolResult, tool_use_id: &str);
}

/// Receives every backend exchange, successful or not
pub trait ApiTraceSink: Send + Sync {
    fn on_api_response(
        &self,
        request: &RawRequest,
        response: Option<&RawResponse>,
        error: Option<&ProviderError>,
    );
}

impl<F> ContentSink for F
where
    F: Fn(&MessageContent) + Send + Sync,
{
    fn on_content(&self, block: &MessageContent) {
        self(block)
    }
}

impl<F> ToolResultSink for F
where
    F: Fn(&ToolResult, &str) + Send + Sync,
{
    fn on_tool_result(&self, result: &ToolResult, tool_use_id: &str) {
        self(result, tool_use_id)
    }
}

impl<F> ApiTraceSink for F
where
    F: Fn(&RawRequest, Option<&RawResponse>, Option<&ProviderError>) + Send + Sync,
{
    fn on_api_response(
        &self,
        request: &RawRequest,
        response: Option<&RawResponse>,
        error: Option<&ProviderError>,
    ) {
        self(request, response, error)
    }
}

/// A sink that discards everything
pub struct Discard;

impl ContentSink for Discard {
    fn on_content(&self, _block: &MessageContent) {}
}

impl ToolResultSink for Discard {
    fn on_tool_result(&self, _result: &ToolResult, _tool_use_id: &str) {}
}

impl ApiTraceSink for Discard {
    fn on_api_response(
        &self,
        _request: &RawRequest,
        _response: Option<&RawResponse>,
        _error: Option<&ProviderError>,
    ) {
    }
}

/// The three sinks held by the loop for the duration of one run
#[derive(Clone, Copy)]
pub struct Callbacks<'a> {
    pub content: &'a dyn ContentSink,
    pub tool_result: &'a dyn ToolResultSink,
    pub api_response: &'a dyn ApiTraceSink,
}

impl<'a> Callbacks<'a> {
    pub fn new(
        content: &'a dyn ContentSink,
        tool_result: &'a dyn ToolResultSink,
        api_response: &'a dyn ApiTraceSink,
    ) -> Self {
        Self {
            content,
            tool_result,
            api_response,
        }
    }
}

impl Default for Callbacks<'static> {
    fn default() -> Self {
        Self::new(&Discard, &Discard, &Discard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_closures_are_sinks() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let content = {
            let seen = seen.clone();
            move |block: &MessageContent| {
                seen.lock().unwrap().push(block.as_text().unwrap_or("").to_string())
            }
        };
        let tool_result = {
            let seen = seen.clone();
            move |_: &ToolResult, id: &str| seen.lock().unwrap().push(id.to_string())
        };

        let callbacks = Callbacks::new(&content, &tool_result, &Discard);
        callbacks.content.on_content(&MessageContent::text("hello"));
        callbacks
            .tool_result
            .on_tool_result(&ToolResult::output("ok"), "t1");

        assert_eq!(*seen.lock().unwrap(), vec!["hello", "t1"]);
    }
}
