//! Conversion between the backend's content blocks and the loop's own representation
use crate::models::content::{Content, IMAGE_MEDIA_TYPE};
use crate::models::message::{MessageContent, ToolResultBlock};
use crate::providers::base::{ApiResponse, ResponseBlock};
use crate::tools::ToolResult;

/// Convert each response block into message content, preserving order.
pub fn response_to_params(response: &ApiResponse) -> Vec<MessageContent> {
    response
        .content
        .iter()
        .map(|block| match block {
            ResponseBlock::Text { text } => MessageContent::text(text.clone()),
            ResponseBlock::ToolUse { id, name, input } => {
                MessageContent::tool_use(id.clone(), name.clone(), input.clone())
            }
        })
        .collect()
}

/// Encode a tool's outcome as the result block answering `tool_use_id`.
pub fn make_tool_result(result: &ToolResult, tool_use_id: &str) -> ToolResultBlock {
    let mut content = Vec::new();
    let is_error = result.error.is_some();

    let text = match (&result.error, &result.output) {
        (Some(error), _) => Some(error),
        (None, Some(output)) => Some(output),
        (None, None) => None,
    };
    if let Some(text) = text {
        content.push(Content::text(maybe_prepend_system(result, text)));
    }
    if let Some(image) = &result.base64_image {
        content.push(Content::image(image.clone(), IMAGE_MEDIA_TYPE));
    }

    ToolResultBlock {
        tool_use_id: tool_use_id.to_string(),
        content,
        is_error,
        cache_control: None,
    }
}

fn maybe_prepend_system(result: &ToolResult, text: &str) -> String {
    match &result.system {
        Some(system) => format!("<system_warning>\n{}</system_warning>\n{}", system, text),
        None => text.to_string(),
    }
}
