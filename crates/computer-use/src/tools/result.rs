use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};

use crate::errors::ToolError;

/// The raw outcome of a tool invocation, before it is encoded for the model.
///
/// `output` and `error` are alternative text channels; `system` is a note that
/// accompanies either one. A failed tool is represented by `error` being set, not by a
/// raised fault, so the model can see what went wrong and decide how to proceed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

impl ToolResult {
    pub fn output<S: Into<String>>(output: S) -> Self {
        Self {
            output: Some(output.into()),
            ..Default::default()
        }
    }

    pub fn error<S: Into<String>>(error: S) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn with_image<S: Into<String>>(mut self, base64_image: S) -> Self {
        self.base64_image = Some(base64_image.into());
        self
    }

    /// Attach raw image bytes, base64 encoding them
    pub fn with_image_bytes(self, bytes: &[u8]) -> Self {
        self.with_image(BASE64.encode(bytes))
    }

    pub fn with_system<S: Into<String>>(mut self, system: S) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.output.is_none()
            && self.error.is_none()
            && self.base64_image.is_none()
            && self.system.is_none()
    }

    /// Merge two results produced by consecutive steps of one tool call.
    /// Text channels are concatenated; two images cannot be merged.
    pub fn combine(self, other: ToolResult) -> Result<ToolResult, ToolError> {
        fn concat(a: Option<String>, b: Option<String>) -> Option<String> {
            match (a, b) {
                (Some(a), Some(b)) => Some(a + &b),
                (a, b) => a.or(b),
            }
        }

        let base64_image = match (self.base64_image, other.base64_image) {
            (Some(_), Some(_)) => {
                return Err(ToolError::Internal("Cannot combine tool results".into()))
            }
            (a, b) => a.or(b),
        };

        Ok(ToolResult {
            output: concat(self.output, other.output),
            error: concat(self.error, other.error),
            base64_image,
            system: concat(self.system, other.system),
        })
    }
}

impl From<ToolError> for ToolResult {
    fn from(err: ToolError) -> Self {
        ToolResult::error(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let result = ToolResult::output("done").with_system("tool was restarted");
        assert_eq!(result.output.as_deref(), Some("done"));
        assert_eq!(result.system.as_deref(), Some("tool was restarted"));
        assert!(!result.is_error());
        assert!(ToolResult::default().is_empty());
    }

    #[test]
    fn test_image_bytes_are_base64_encoded() {
        let result = ToolResult::default().with_image_bytes(b"hello");
        assert_eq!(result.base64_image.as_deref(), Some("aGVsbG8="));
    }

    #[test]
    fn test_combine_concatenates_text() {
        let combined = ToolResult::output("a")
            .combine(ToolResult::output("b").with_image("img"))
            .unwrap();
        assert_eq!(combined.output.as_deref(), Some("ab"));
        assert_eq!(combined.base64_image.as_deref(), Some("img"));
        assert_eq!(combined.error, None);
    }

    #[test]
    fn test_combine_rejects_two_images() {
        let err = ToolResult::default()
            .with_image("a")
            .combine(ToolResult::default().with_image("b"))
            .unwrap_err();
        assert!(matches!(err, ToolError::Internal(_)));
    }

    #[test]
    fn test_from_tool_error() {
        let result: ToolResult = ToolError::ToolNotFound("zoom".into()).into();
        assert_eq!(result.error.as_deref(), Some("Tool zoom is invalid"));
        assert!(result.is_error());
    }
}
